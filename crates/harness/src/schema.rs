//! Harness CI Pipeline Schema Types
//!
//! Defines the document envelope and the stage-level settings blocks of a
//! Harness CI v1 pipeline. Tag-dispatched types live in [`crate::stage`],
//! [`crate::step`] and [`crate::on`].

use crate::stage::Stage;
use pipeshift_core::{ConvertError, ConvertResult, VariantRegistry};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;

/// Schema version written to every converted document
pub const SCHEMA_VERSION: u32 = 1;

/// Root Harness document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Schema version (always 1)
    pub version: u32,

    /// Document kind
    pub kind: String,

    /// Pipeline definition
    pub spec: Pipeline,
}

impl Config {
    /// Wrap a pipeline in a versioned document envelope
    #[must_use]
    pub fn pipeline(spec: Pipeline) -> Self {
        Self {
            version: SCHEMA_VERSION,
            kind: "pipeline".to_string(),
            spec,
        }
    }

    /// Serialize the document as YAML
    ///
    /// # Errors
    /// Returns `ConvertError::Serialization` if serialization fails
    pub fn to_yaml(&self) -> ConvertResult<String> {
        serde_yaml::to_string(self).map_err(|e| ConvertError::Serialization(e.to_string()))
    }

    /// Serialize the document as pretty-printed JSON
    ///
    /// # Errors
    /// Returns `ConvertError::Serialization` if serialization fails
    pub fn to_json(&self) -> ConvertResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConvertError::Serialization(e.to_string()))
    }
}

/// A Harness pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Pipeline {
    /// Pipeline-wide defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Defaults>,

    /// Pipeline stages, executed in order
    #[serde(default)]
    pub stages: Vec<Stage>,
}

/// Pipeline-wide default settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Defaults {
    /// Clone settings shared by all stages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone: Option<CloneSettings>,
}

/// Source checkout settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloneSettings {
    /// Skip the checkout entirely
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,

    /// Fetch depth (0 = full history)
    #[serde(default, skip_serializing_if = "is_zero")]
    pub depth: u32,

    /// Skip TLS verification when fetching
    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure: bool,

    /// Enable git trace output
    #[serde(default, skip_serializing_if = "is_false")]
    pub trace: bool,
}

/// Stage cache settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cache {
    /// Enable intelligent caching
    #[serde(default)]
    pub enabled: bool,

    /// Paths to persist between runs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,

    /// Explicit cache key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Cache policy (pull, push, pull-push)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

/// Runner selectors constraining where a stage executes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Delegate {
    /// Delegate selector labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<String>,
}

/// Stage runtime, dispatched on `type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runtime {
    /// Harness-hosted cloud machines
    Cloud(RuntimeCloud),
    /// Self-hosted machine runner
    Machine(RuntimeMachine),
}

impl Runtime {
    /// Cloud runtime with the given size label
    #[must_use]
    pub fn cloud(size: impl Into<String>) -> Self {
        Self::Cloud(RuntimeCloud {
            size: size.into(),
            image: None,
        })
    }

    /// Discriminator written as `type`
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Cloud(_) => "cloud",
            Self::Machine(_) => "machine",
        }
    }
}

/// Registry of runtime discriminators
pub static RUNTIMES: VariantRegistry<Runtime> = VariantRegistry::new(
    "runtime",
    &[
        ("cloud", |v| serde_yaml::from_value(v).map(Runtime::Cloud)),
        ("machine", |v| serde_yaml::from_value(v).map(Runtime::Machine)),
    ],
);

/// Cloud runtime settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeCloud {
    /// Machine size label (standard, large, xlarge, xxlarge)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub size: String,

    /// Machine image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Self-hosted machine runtime settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeMachine {
    /// Machine pool name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,
}

#[derive(Serialize)]
struct RuntimeRef<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    spec: RuntimeSpecRef<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RuntimeSpecRef<'a> {
    Cloud(&'a RuntimeCloud),
    Machine(&'a RuntimeMachine),
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let spec = match self {
            Self::Cloud(spec) => RuntimeSpecRef::Cloud(spec),
            Self::Machine(spec) => RuntimeSpecRef::Machine(spec),
        };
        RuntimeRef {
            kind: self.kind(),
            spec,
        }
        .serialize(serializer)
    }
}

/// Raw `{ type, spec }` pair before variant resolution
#[derive(Deserialize)]
pub(crate) struct Tagged {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub spec: Option<Value>,
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Tagged::deserialize(deserializer)?;
        RUNTIMES.resolve(&raw.kind, raw.spec).map_err(D::Error::custom)
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) const fn is_false(value: &bool) -> bool {
    !*value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &u32) -> bool {
    *value == 0
}
