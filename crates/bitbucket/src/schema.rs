//! Bitbucket Pipelines Schema Types
//!
//! Typed tree of a `bitbucket-pipelines.yml` document. Only the fields the
//! converter reads are declared; everything else is ignored on decode.
//! See: <https://support.atlassian.com/bitbucket-cloud/docs/bitbucket-pipelines-configuration-reference/>

use pipeshift_core::{UnionError, VariantRegistry, one_or_many};
use serde::Deserialize;
use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Root `bitbucket-pipelines.yml` document
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Global default image
    pub image: Option<Image>,

    /// Global clone settings
    pub clone: Option<CloneSettings>,

    /// Global options
    pub options: Option<Options>,

    /// Reusable cache and service definitions
    pub definitions: Option<Definitions>,

    /// Pipeline sets
    pub pipelines: Pipelines,
}

/// Container image, given as a bare name or a mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    /// Image reference, optionally prefixed with `docker://`
    pub name: String,
    /// Registry username
    pub username: Option<String>,
    /// Registry password
    pub password: Option<String>,
    /// Registry email
    pub email: Option<String>,
    /// UID the container runs as (0 = image default)
    pub run_as_user: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ImageFields {
    name: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    run_as_user: u32,
}

impl From<ImageFields> for Image {
    fn from(fields: ImageFields) -> Self {
        Self {
            name: fields.name,
            username: fields.username,
            password: fields.password,
            email: fields.email,
            run_as_user: fields.run_as_user,
        }
    }
}

impl<'de> Deserialize<'de> for Image {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ImageVisitor;

        impl<'de> Visitor<'de> for ImageVisitor {
            type Value = Image;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an image name or a mapping with `name`")
            }

            fn visit_str<E: de::Error>(self, name: &str) -> Result<Image, E> {
                Ok(Image {
                    name: name.to_string(),
                    ..Image::default()
                })
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Image, A::Error> {
                ImageFields::deserialize(MapAccessDeserializer::new(map)).map(Image::from)
            }
        }

        deserializer.deserialize_any(ImageVisitor)
    }
}

/// Clone settings, global or per step
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct CloneSettings {
    /// Fetch depth
    pub depth: Option<Depth>,
    /// Explicit enable/disable override
    pub enabled: Option<bool>,
    /// Fetch Git LFS objects
    pub lfs: Option<bool>,
    /// Skip TLS verification
    pub skip_ssl_verify: bool,
}

/// Clone depth: a commit count or `full`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "DepthRepr")]
pub enum Depth {
    /// Full history
    Full,
    /// Last N commits
    Commits(u32),
}

impl Depth {
    /// Numeric depth, 0 meaning full history
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Full => 0,
            Self::Commits(n) => n,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DepthRepr {
    Number(u32),
    Text(String),
}

impl TryFrom<DepthRepr> for Depth {
    type Error = String;

    fn try_from(repr: DepthRepr) -> Result<Self, Self::Error> {
        match repr {
            DepthRepr::Number(n) => Ok(Self::Commits(n)),
            DepthRepr::Text(s) if s == "full" => Ok(Self::Full),
            DepthRepr::Text(s) => Err(format!("invalid clone depth `{s}` (expected a number or `full`)")),
        }
    }
}

/// Global options
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Options {
    /// Enable the Docker service for every step
    pub docker: bool,
    /// Default step timeout in minutes
    pub max_time: u32,
    /// Default compute size
    pub size: Size,
}

/// Compute size tier, totally ordered `None < 1x < 2x < 4x < 8x`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum Size {
    /// No size configured
    #[default]
    #[serde(skip)]
    None,
    /// 4GB
    #[serde(rename = "1x")]
    X1,
    /// 8GB
    #[serde(rename = "2x")]
    X2,
    /// 16GB
    #[serde(rename = "4x")]
    X4,
    /// 32GB
    #[serde(rename = "8x")]
    X8,
}

/// Reusable definitions
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Definitions {
    /// Named cache definitions
    pub caches: BTreeMap<String, CacheDefinition>,
    /// Named service containers
    pub services: BTreeMap<String, ServiceDefinition>,
}

/// Named cache: a bare path or `{ path, key: { files } }`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheDefinition {
    /// Directory to cache
    pub path: String,
    /// Files whose contents key the cache
    pub key_files: Vec<String>,
}

#[derive(Deserialize)]
struct CacheFields {
    path: String,
    #[serde(default)]
    key: Option<CacheKey>,
}

#[derive(Deserialize)]
struct CacheKey {
    #[serde(default)]
    files: Vec<String>,
}

impl<'de> Deserialize<'de> for CacheDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CacheVisitor;

        impl<'de> Visitor<'de> for CacheVisitor {
            type Value = CacheDefinition;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a cache path or a mapping with `path`")
            }

            fn visit_str<E: de::Error>(self, path: &str) -> Result<CacheDefinition, E> {
                Ok(CacheDefinition {
                    path: path.to_string(),
                    key_files: Vec::new(),
                })
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<CacheDefinition, A::Error> {
                let fields = CacheFields::deserialize(MapAccessDeserializer::new(map))?;
                Ok(CacheDefinition {
                    path: fields.path,
                    key_files: fields.key.map(|k| k.files).unwrap_or_default(),
                })
            }
        }

        deserializer.deserialize_any(CacheVisitor)
    }
}

/// Named service container
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceDefinition {
    /// Service image
    pub image: Option<Image>,
    /// Service environment
    pub variables: BTreeMap<String, String>,
    /// Memory limit in MB
    pub memory: Option<u32>,
}

/// Pipeline sets
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Pipelines {
    /// The pipeline run for every push without a more specific match
    #[serde(default)]
    pub default: Vec<PipelineItem>,

    /// Branch, tag, bookmark, pull-request and custom pipeline sets
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Top-level pipeline entry: `- step:`, `- parallel:` or `- stage:`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Mapping")]
pub enum PipelineItem {
    /// A single step
    Step(Step),
    /// Concurrent steps
    Parallel(Parallel),
    /// A named group of steps
    Stage(Stage),
}

/// Registry of top-level pipeline entry keys
pub static PIPELINE_ITEMS: VariantRegistry<PipelineItem> = VariantRegistry::new(
    "pipeline item",
    &[
        ("step", |v| serde_yaml::from_value(v).map(PipelineItem::Step)),
        ("parallel", |v| {
            serde_yaml::from_value(v).map(PipelineItem::Parallel)
        }),
        ("stage", |v| serde_yaml::from_value(v).map(PipelineItem::Stage)),
    ],
);

impl TryFrom<Mapping> for PipelineItem {
    type Error = UnionError;

    fn try_from(item: Mapping) -> Result<Self, Self::Error> {
        PIPELINE_ITEMS.resolve_keyed(item)
    }
}

/// Stage-level entry: `- step:` or `- parallel:`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Mapping")]
pub enum StepItem {
    /// A single step
    Step(Step),
    /// Concurrent steps
    Parallel(Parallel),
}

/// Registry of stage-level entry keys
pub static STEP_ITEMS: VariantRegistry<StepItem> = VariantRegistry::new(
    "stage item",
    &[
        ("step", |v| serde_yaml::from_value(v).map(StepItem::Step)),
        ("parallel", |v| serde_yaml::from_value(v).map(StepItem::Parallel)),
    ],
);

impl TryFrom<Mapping> for StepItem {
    type Error = UnionError;

    fn try_from(item: Mapping) -> Result<Self, Self::Error> {
        STEP_ITEMS.resolve_keyed(item)
    }
}

/// A named group of steps sharing a deployment environment
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Stage {
    /// Stage name
    pub name: Option<String>,
    /// Stage steps
    pub steps: Vec<StepItem>,
}

/// Concurrent steps: a list of `- step:` items or `{ fail-fast, steps }`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parallel {
    /// Stop all steps when one fails
    pub fail_fast: bool,
    /// Steps run concurrently
    pub steps: Vec<Step>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ParallelFields {
    #[serde(default)]
    fail_fast: bool,
    #[serde(default)]
    steps: Vec<StepEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StepEntry {
    step: Step,
}

fn unwrap_entries(entries: Vec<StepEntry>) -> Vec<Step> {
    entries.into_iter().map(|entry| entry.step).collect()
}

impl<'de> Deserialize<'de> for Parallel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParallelVisitor;

        impl<'de> Visitor<'de> for ParallelVisitor {
            type Value = Parallel;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of `step` entries or a mapping with `steps`")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Parallel, A::Error> {
                let entries = Vec::<StepEntry>::deserialize(SeqAccessDeserializer::new(seq))?;
                Ok(Parallel {
                    fail_fast: false,
                    steps: unwrap_entries(entries),
                })
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Parallel, A::Error> {
                let fields = ParallelFields::deserialize(MapAccessDeserializer::new(map))?;
                Ok(Parallel {
                    fail_fast: fields.fail_fast,
                    steps: unwrap_entries(fields.steps),
                })
            }
        }

        deserializer.deserialize_any(ParallelVisitor)
    }
}

/// A build step
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Step {
    /// Step name
    pub name: Option<String>,
    /// Image override
    pub image: Option<Image>,
    /// Compute size override
    pub size: Size,
    /// Runner selector labels
    #[serde(deserialize_with = "one_or_many")]
    pub runs_on: Vec<String>,
    /// Cache identifiers
    pub caches: Vec<String>,
    /// Service identifiers
    pub services: Vec<String>,
    /// Clone override
    pub clone: Option<CloneSettings>,
    /// Timeout in minutes
    pub max_time: u32,
    /// Commands and pipes
    pub script: Vec<Script>,
    /// Commands and pipes run after the script, even on failure
    pub after_script: Vec<Script>,
}

/// Script entry: an inline command or a pipe
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Script {
    /// Inline shell command
    Text(String),
    /// Packaged pipe
    Pipe(Pipe),
}

/// Reference to an externally packaged action
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Pipe {
    /// Pipe image
    #[serde(rename = "pipe")]
    pub image: String,
    /// Pipe parameters
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}
