//! Harness step types
//!
//! A step is `{ name, type, timeout?, on?, spec }` where `type` selects the
//! spec variant through [`STEP_SPECS`].

use crate::on::On;
use crate::schema::{Tagged, is_false};
use pipeshift_core::{UnionError, VariantRegistry};
use serde::{Deserialize, Serialize, Serializer};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// A step in a Harness stage
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawStep")]
pub struct Step {
    /// Step name, unique within its parent
    pub name: String,

    /// Step timeout as a duration string (e.g. `10m0s`)
    pub timeout: Option<String>,

    /// Failure handling
    pub on: Option<On>,

    /// Variant-specific settings
    pub spec: StepSpec,
}

impl Step {
    /// Create a step with no timeout or failure strategy
    pub fn new(name: impl Into<String>, spec: StepSpec) -> Self {
        Self {
            name: name.into(),
            timeout: None,
            on: None,
            spec,
        }
    }

    /// Set the step timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<String>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Discriminator written as `type`
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.spec.kind()
    }
}

/// Step spec variants
#[derive(Debug, Clone, PartialEq)]
pub enum StepSpec {
    /// Run a shell script in a container
    Run(StepRun),
    /// Run a packaged plugin image
    Plugin(StepPlugin),
    /// Start a long-running service container
    Background(StepBackground),
    /// Run sub-steps sequentially
    Group(StepGroup),
    /// Run sub-steps concurrently
    Parallel(StepParallel),
}

impl StepSpec {
    /// Discriminator written as `type`
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Plugin(_) => "plugin",
            Self::Background(_) => "background",
            Self::Group(_) => "group",
            Self::Parallel(_) => "parallel",
        }
    }
}

/// Registry of step discriminators
pub static STEP_SPECS: VariantRegistry<StepSpec> = VariantRegistry::new(
    "step",
    &[
        ("run", |v| serde_yaml::from_value(v).map(StepSpec::Run)),
        ("plugin", |v| serde_yaml::from_value(v).map(StepSpec::Plugin)),
        ("background", |v| {
            serde_yaml::from_value(v).map(StepSpec::Background)
        }),
        ("group", |v| serde_yaml::from_value(v).map(StepSpec::Group)),
        ("parallel", |v| {
            serde_yaml::from_value(v).map(StepSpec::Parallel)
        }),
    ],
);

/// Run step settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StepRun {
    /// Container image
    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,

    /// User the script runs as
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Script body
    pub run: String,

    /// Shell used to run the script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// Environment variables
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub envs: BTreeMap<String, String>,
}

/// Plugin step settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StepPlugin {
    /// Plugin image
    pub image: String,

    /// Plugin parameters
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, Value>,

    /// Environment variables
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub envs: BTreeMap<String, String>,
}

/// Background service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StepBackground {
    /// Service image
    pub image: String,

    /// Exposed ports
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,

    /// Run the container in privileged mode
    #[serde(skip_serializing_if = "is_false")]
    pub privileged: bool,

    /// Environment variables
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub envs: BTreeMap<String, String>,
}

/// Sequential group settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StepGroup {
    /// Sub-steps, in execution order
    pub steps: Vec<Step>,
}

/// Parallel group settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StepParallel {
    /// Sub-steps, executed concurrently
    pub steps: Vec<Step>,
}

#[derive(Deserialize)]
struct RawStep {
    #[serde(default)]
    name: String,
    #[serde(default)]
    timeout: Option<String>,
    #[serde(default)]
    on: Option<On>,
    #[serde(flatten)]
    tagged: Tagged,
}

impl TryFrom<RawStep> for Step {
    type Error = UnionError;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        Ok(Self {
            name: raw.name,
            timeout: raw.timeout,
            on: raw.on,
            spec: STEP_SPECS.resolve(&raw.tagged.kind, raw.tagged.spec)?,
        })
    }
}

#[derive(Serialize)]
struct StepRef<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<&'a String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    on: Option<&'a On>,
    spec: StepSpecRef<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum StepSpecRef<'a> {
    Run(&'a StepRun),
    Plugin(&'a StepPlugin),
    Background(&'a StepBackground),
    Group(&'a StepGroup),
    Parallel(&'a StepParallel),
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let spec = match &self.spec {
            StepSpec::Run(spec) => StepSpecRef::Run(spec),
            StepSpec::Plugin(spec) => StepSpecRef::Plugin(spec),
            StepSpec::Background(spec) => StepSpecRef::Background(spec),
            StepSpec::Group(spec) => StepSpecRef::Group(spec),
            StepSpec::Parallel(spec) => StepSpecRef::Parallel(spec),
        };
        StepRef {
            name: &self.name,
            kind: self.kind(),
            timeout: self.timeout.as_ref(),
            on: self.on.as_ref(),
            spec,
        }
        .serialize(serializer)
    }
}
