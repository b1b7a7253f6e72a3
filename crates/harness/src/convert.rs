//! Source-to-Harness Converter Trait
//!
//! Defines the interface implemented by each source schema converter
//! (e.g. Bitbucket Pipelines). Converters are pure: one call decodes one
//! document and returns one Harness [`Config`], holding no state between calls.
//!
//! The `--from` value of the CLI is resolved against a [`ConverterRegistry`].

use crate::schema::Config;
use pipeshift_core::{ConvertError, ConvertResult};
use std::collections::BTreeMap;

/// Trait for CI configuration converters
///
/// # Example
///
/// ```ignore
/// use pipeshift_harness::{Config, Converter, Pipeline};
/// use pipeshift_core::ConvertResult;
///
/// struct NullConverter;
///
/// impl Converter for NullConverter {
///     fn convert_str(&self, _source: &str) -> ConvertResult<Config> {
///         Ok(Config::pipeline(Pipeline::default()))
///     }
///
///     fn format_name(&self) -> &'static str {
///         "null"
///     }
/// }
/// ```
pub trait Converter: Send + Sync {
    /// Decode a source document and convert it to a Harness document.
    ///
    /// # Errors
    /// Returns `ConvertError::Decode` if the source cannot be decoded.
    /// Unmappable source fields are dropped, not reported.
    fn convert_str(&self, source: &str) -> ConvertResult<Config>;

    /// Get the format identifier for this converter
    ///
    /// Used for CLI flag matching (e.g., "bitbucket")
    fn format_name(&self) -> &'static str;

    /// Get a human-readable description of this converter
    fn description(&self) -> &'static str {
        "CI configuration converter"
    }

    /// Convert a source document straight to Harness YAML.
    ///
    /// # Errors
    /// Returns the errors of [`Self::convert_str`] and
    /// `ConvertError::Serialization` if the result cannot be serialized.
    fn convert_to_yaml(&self, source: &str) -> ConvertResult<String> {
        self.convert_str(source)?.to_yaml()
    }
}

/// Source formats the CLI can convert from, keyed by `format_name()`.
///
/// Iteration order is the format name order, so `pipeshift formats` output
/// and the `UnknownFormat` list are stable.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: BTreeMap<&'static str, Box<dyn Converter>>,
}

impl ConverterRegistry {
    /// An empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source format. A later converter for the same format wins.
    pub fn register(&mut self, converter: impl Converter + 'static) {
        self.converters
            .insert(converter.format_name(), Box::new(converter));
    }

    /// Whether `format` can be converted
    #[must_use]
    pub fn supports(&self, format: &str) -> bool {
        self.converters.contains_key(format)
    }

    /// Supported source formats, in name order
    #[must_use]
    pub fn formats(&self) -> Vec<&'static str> {
        self.converters.keys().copied().collect()
    }

    /// Format and description of each supported source, in name order
    #[must_use]
    pub fn info(&self) -> Vec<ConverterInfo> {
        self.converters
            .values()
            .map(|converter| ConverterInfo::from_converter(converter.as_ref()))
            .collect()
    }

    /// The converter for `format`.
    ///
    /// # Errors
    /// Returns `ConvertError::UnknownFormat`, listing the supported formats,
    /// when `format` has no converter.
    pub fn require(&self, format: &str) -> ConvertResult<&dyn Converter> {
        self.converters
            .get(format)
            .map(|converter| &**converter)
            .ok_or_else(|| ConvertError::UnknownFormat {
                format: format.to_string(),
                available: self.formats().join(", "),
            })
    }

    /// Convert `source`, written in `format`, to a Harness document.
    ///
    /// # Errors
    /// Returns `ConvertError::UnknownFormat` for an unsupported format and
    /// the converter's decode error otherwise.
    pub fn convert(&self, format: &str, source: &str) -> ConvertResult<Config> {
        let converter = self.require(format)?;
        tracing::debug!(format, bytes = source.len(), "Converting document");
        converter.convert_str(source)
    }
}

/// One line of `pipeshift formats` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterInfo {
    /// Value accepted by `--from`
    pub format: &'static str,
    /// Short description of the source format
    pub description: &'static str,
}

impl ConverterInfo {
    /// Describe `converter`
    #[must_use]
    pub fn from_converter(converter: &dyn Converter) -> Self {
        Self {
            format: converter.format_name(),
            description: converter.description(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Pipeline;

    struct TestConverter(&'static str);

    impl Converter for TestConverter {
        fn convert_str(&self, source: &str) -> ConvertResult<Config> {
            if source.is_empty() {
                return Err(ConvertError::Decode {
                    format: self.0,
                    path: ".".to_string(),
                    message: "empty document".to_string(),
                });
            }
            Ok(Config::pipeline(Pipeline::default()))
        }

        fn format_name(&self) -> &'static str {
            self.0
        }
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = ConverterRegistry::new();
        assert!(registry.formats().is_empty());

        registry.register(TestConverter("zeta"));
        registry.register(TestConverter("alpha"));
        registry.register(TestConverter("alpha"));

        assert!(registry.supports("alpha"));
        assert!(!registry.supports("gitlab"));
        assert_eq!(registry.formats(), vec!["alpha", "zeta"]);
        assert_eq!(registry.info()[0].description, "CI configuration converter");
    }

    #[test]
    fn test_registry_convert() {
        let mut registry = ConverterRegistry::new();
        registry.register(TestConverter("test"));

        let config = registry.convert("test", "x").unwrap();
        assert_eq!(config.kind, "pipeline");

        let yaml = registry.require("test").unwrap().convert_to_yaml("x").unwrap();
        assert!(yaml.contains("version: 1"));

        assert!(matches!(
            registry.convert("test", ""),
            Err(ConvertError::Decode { .. })
        ));
    }

    #[test]
    fn test_registry_unknown_format() {
        let mut registry = ConverterRegistry::new();
        registry.register(TestConverter("bitbucket"));

        let err = registry.convert("gitlab", "x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown format 'gitlab'. Available: bitbucket"
        );
    }
}
