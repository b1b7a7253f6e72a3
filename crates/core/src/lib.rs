//! Shared building blocks for pipeshift converters.
//!
//! - [`union`]: tag-dispatched and shape-based union resolution
//! - [`decode`]: typed document decoding with field paths in errors
//! - [`error`]: the [`ConvertError`] taxonomy

pub mod decode;
pub mod error;
pub mod union;

pub use decode::from_yaml_str;
pub use error::{ConvertError, ConvertResult};
pub use union::{Decoder, UnionError, VariantRegistry, one_or_many};
