//! Failure strategies
//!
//! `on.failure` accepts either a single handler or a list of handlers:
//!
//! ```yaml
//! on:
//!   failure: { type: abort }
//! ```
//!
//! ```yaml
//! on:
//!   failure:
//!     - errors: [timeout]
//!       type: retry
//!       spec: { attempts: 3 }
//!     - type: fail
//! ```
//!
//! Both shapes decode to a list.

use crate::schema::Tagged;
use pipeshift_core::{UnionError, VariantRegistry, one_or_many};
use serde::{Deserialize, Serialize, Serializer};

/// Strategy hooks for a stage or step
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct On {
    /// Failure handlers, evaluated in order
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub failure: Vec<Failure>,
}

/// A single failure handler
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawFailure")]
pub struct Failure {
    /// Error classes this handler matches (empty = all)
    pub errors: Vec<String>,

    /// Action taken when the handler matches
    pub action: FailureAction,
}

/// Failure handler actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureAction {
    /// Abort the pipeline
    Abort(Abort),
    /// Mark the step failed
    Fail(Fail),
    /// Ignore the failure and continue
    Ignore(Ignore),
    /// Retry the step
    Retry(Retry),
    /// Mark the step successful
    Success(Success),
}

impl FailureAction {
    /// Discriminator written as `type`
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Abort(_) => "abort",
            Self::Fail(_) => "fail",
            Self::Ignore(_) => "ignore",
            Self::Retry(_) => "retry",
            Self::Success(_) => "success",
        }
    }
}

/// Registry of failure action discriminators
pub static FAILURE_ACTIONS: VariantRegistry<FailureAction> = VariantRegistry::new(
    "failure",
    &[
        ("abort", |v| serde_yaml::from_value(v).map(FailureAction::Abort)),
        ("fail", |v| serde_yaml::from_value(v).map(FailureAction::Fail)),
        ("ignore", |v| serde_yaml::from_value(v).map(FailureAction::Ignore)),
        ("retry", |v| serde_yaml::from_value(v).map(FailureAction::Retry)),
        ("success", |v| serde_yaml::from_value(v).map(FailureAction::Success)),
    ],
);

/// Abort action (no settings)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Abort {}

/// Fail action (no settings)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fail {}

/// Ignore action (no settings)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ignore {}

/// Success action (no settings)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Success {}

/// Retry action settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Retry {
    /// Number of attempts
    pub attempts: u32,

    /// Delay between attempts
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interval: Vec<String>,
}

#[derive(Deserialize)]
struct RawFailure {
    #[serde(default)]
    errors: Vec<String>,
    #[serde(flatten)]
    tagged: Tagged,
}

impl TryFrom<RawFailure> for Failure {
    type Error = UnionError;

    fn try_from(raw: RawFailure) -> Result<Self, Self::Error> {
        Ok(Self {
            errors: raw.errors,
            action: FAILURE_ACTIONS.resolve(&raw.tagged.kind, raw.tagged.spec)?,
        })
    }
}

#[derive(Serialize)]
struct FailureRef<'a> {
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    errors: &'a [String],
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    spec: Option<&'a Retry>,
}

impl Serialize for Failure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let spec = match &self.action {
            FailureAction::Retry(retry) => Some(retry),
            _ => None,
        };
        FailureRef {
            errors: &self.errors,
            kind: self.action.kind(),
            spec,
        }
        .serialize(serializer)
    }
}
