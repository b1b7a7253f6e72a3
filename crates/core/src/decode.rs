//! Typed decoding of raw pipeline documents

use crate::error::{ConvertError, ConvertResult};
use serde::de::DeserializeOwned;

/// Decode a YAML (or JSON) document into its typed tree.
///
/// Errors carry the path of the offending field, e.g.
/// `pipelines.default[2].step.size`.
///
/// # Errors
/// Returns `ConvertError::Decode` if the document is not valid YAML or a
/// field has the wrong shape.
pub fn from_yaml_str<T: DeserializeOwned>(format: &'static str, source: &str) -> ConvertResult<T> {
    let deserializer = serde_yaml::Deserializer::from_str(source);
    serde_path_to_error::deserialize(deserializer).map_err(|err| {
        let path = err.path().to_string();
        let message = err.into_inner().to_string();
        tracing::debug!(format, %path, %message, "Document decoding failed");
        ConvertError::Decode {
            format,
            path,
            message,
        }
    })
}
