//! Harness stage types
//!
//! A stage is `{ name, type, on?, spec }` where `type` selects the spec
//! variant through [`STAGE_SPECS`].

use crate::on::On;
use crate::schema::{Cache, CloneSettings, Delegate, Runtime, Tagged};
use crate::step::Step;
use pipeshift_core::{UnionError, VariantRegistry};
use serde::{Deserialize, Serialize, Serializer};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// A stage in a Harness pipeline
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawStage")]
pub struct Stage {
    /// Stage name, unique within the pipeline
    pub name: String,

    /// Failure handling
    pub on: Option<On>,

    /// Variant-specific settings
    pub spec: StageSpec,
}

impl Stage {
    /// Create a CI stage
    pub fn ci(name: impl Into<String>, spec: StageCi) -> Self {
        Self {
            name: name.into(),
            on: None,
            spec: StageSpec::Ci(spec),
        }
    }

    /// Discriminator written as `type`
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.spec.kind()
    }

    /// Steps of the stage, if the variant carries any
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        match &self.spec {
            StageSpec::Ci(spec) => &spec.steps,
            StageSpec::Custom(spec) => &spec.steps,
            StageSpec::Template(_) => &[],
        }
    }
}

/// Stage spec variants
#[derive(Debug, Clone, PartialEq)]
pub enum StageSpec {
    /// Continuous integration stage
    Ci(StageCi),
    /// Custom stage without CI-specific settings
    Custom(StageCustom),
    /// Stage expanded from a template
    Template(StageTemplate),
}

impl StageSpec {
    /// Discriminator written as `type`
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Ci(_) => "ci",
            Self::Custom(_) => "custom",
            Self::Template(_) => "template",
        }
    }
}

/// Registry of stage discriminators
pub static STAGE_SPECS: VariantRegistry<StageSpec> = VariantRegistry::new(
    "stage",
    &[
        ("ci", |v| serde_yaml::from_value(v).map(StageSpec::Ci)),
        ("custom", |v| serde_yaml::from_value(v).map(StageSpec::Custom)),
        ("template", |v| {
            serde_yaml::from_value(v).map(StageSpec::Template)
        }),
    ],
);

/// CI stage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StageCi {
    /// Clone settings for this stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone: Option<CloneSettings>,

    /// Execution runtime
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,

    /// Cache settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<Cache>,

    /// Runner selectors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate: Option<Delegate>,

    /// Stage environment variables
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub envs: BTreeMap<String, String>,

    /// Stage steps
    pub steps: Vec<Step>,
}

/// Custom stage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StageCustom {
    /// Runner selectors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegate: Option<Delegate>,

    /// Stage environment variables
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub envs: BTreeMap<String, String>,

    /// Stage steps
    pub steps: Vec<Step>,
}

/// Template stage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StageTemplate {
    /// Template reference
    pub uses: String,

    /// Template inputs
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct RawStage {
    #[serde(default)]
    name: String,
    #[serde(default)]
    on: Option<On>,
    #[serde(flatten)]
    tagged: Tagged,
}

impl TryFrom<RawStage> for Stage {
    type Error = UnionError;

    fn try_from(raw: RawStage) -> Result<Self, Self::Error> {
        Ok(Self {
            name: raw.name,
            on: raw.on,
            spec: STAGE_SPECS.resolve(&raw.tagged.kind, raw.tagged.spec)?,
        })
    }
}

#[derive(Serialize)]
struct StageRef<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    on: Option<&'a On>,
    spec: StageSpecRef<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum StageSpecRef<'a> {
    Ci(&'a StageCi),
    Custom(&'a StageCustom),
    Template(&'a StageTemplate),
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let spec = match &self.spec {
            StageSpec::Ci(spec) => StageSpecRef::Ci(spec),
            StageSpec::Custom(spec) => StageSpecRef::Custom(spec),
            StageSpec::Template(spec) => StageSpecRef::Template(spec),
        };
        StageRef {
            name: &self.name,
            kind: self.kind(),
            on: self.on.as_ref(),
            spec,
        }
        .serialize(serializer)
    }
}
