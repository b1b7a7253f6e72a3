//! Discriminated-union resolution
//!
//! Pipeline documents use two kinds of unions:
//!
//! - **Tagged**: an explicit discriminator selects the concrete variant. The
//!   discriminator is either a field (`type: run`) or the single key of an item
//!   (`- step: {...}`). A [`VariantRegistry`] maps each discriminator to a
//!   decoder, and an unknown discriminator is a fatal
//!   [`UnionError::UnknownVariant`]. There is never a fallback variant.
//! - **Shaped**: a field accepts one object or a list of objects.
//!   [`one_or_many`] inspects the raw shape before committing and always
//!   yields a list.

use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Error types for variant resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnionError {
    /// The discriminator is not present in the registry
    #[error("unknown {kind} type `{tag}` (expected one of: {expected})")]
    UnknownVariant {
        kind: &'static str,
        tag: String,
        expected: String,
    },

    /// The discriminator is known but its payload has the wrong shape
    #[error("invalid {kind} `{tag}`: {message}")]
    Malformed {
        kind: &'static str,
        tag: String,
        message: String,
    },

    /// A keyed item did not carry exactly one discriminator key
    #[error("expected exactly one {kind} key, found [{found}]")]
    AmbiguousKey { kind: &'static str, found: String },
}

/// Decodes the payload of a single variant.
pub type Decoder<T> = fn(Value) -> Result<T, serde_yaml::Error>;

/// Fixed registry mapping a discriminator string to a variant decoder.
///
/// Registries are immutable `static` tables, safe to share across threads.
///
/// # Example
///
/// ```ignore
/// static SHAPES: VariantRegistry<Shape> = VariantRegistry::new(
///     "shape",
///     &[
///         ("circle", |v| serde_yaml::from_value(v).map(Shape::Circle)),
///         ("square", |v| serde_yaml::from_value(v).map(Shape::Square)),
///     ],
/// );
///
/// let shape = SHAPES.resolve("circle", None)?;
/// ```
pub struct VariantRegistry<T: 'static> {
    kind: &'static str,
    variants: &'static [(&'static str, Decoder<T>)],
}

impl<T: 'static> VariantRegistry<T> {
    /// Create a registry for the union named `kind`.
    #[must_use]
    pub const fn new(kind: &'static str, variants: &'static [(&'static str, Decoder<T>)]) -> Self {
        Self { kind, variants }
    }

    /// Name of the union, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// All registered discriminators, in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.variants.iter().map(|(tag, _)| *tag)
    }

    /// Check if a discriminator is registered.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.variants.iter().any(|(t, _)| *t == tag)
    }

    /// Resolve `tag` and decode `spec` into the selected variant.
    ///
    /// An absent or null `spec` decodes as the variant's zero value.
    ///
    /// # Errors
    /// Returns `UnionError::UnknownVariant` if `tag` is not registered and
    /// `UnionError::Malformed` if the payload does not fit the variant.
    pub fn resolve(&self, tag: &str, spec: Option<Value>) -> Result<T, UnionError> {
        let Some((_, decode)) = self.variants.iter().find(|(t, _)| *t == tag) else {
            return Err(UnionError::UnknownVariant {
                kind: self.kind,
                tag: tag.to_string(),
                expected: self.tags().collect::<Vec<_>>().join(", "),
            });
        };

        let spec = match spec {
            None | Some(Value::Null) => Value::Mapping(Mapping::new()),
            Some(value) => value,
        };

        decode(spec).map_err(|e| UnionError::Malformed {
            kind: self.kind,
            tag: tag.to_string(),
            message: e.to_string(),
        })
    }

    /// Resolve a keyed item of the form `{ tag: spec }`.
    ///
    /// # Errors
    /// Returns `UnionError::AmbiguousKey` unless the mapping has exactly one
    /// string key, otherwise the errors of [`Self::resolve`].
    pub fn resolve_keyed(&self, item: Mapping) -> Result<T, UnionError> {
        if item.len() != 1 {
            return Err(UnionError::AmbiguousKey {
                kind: self.kind,
                found: describe_keys(&item),
            });
        }

        let found = describe_keys(&item);
        match item.into_iter().next() {
            Some((Value::String(tag), spec)) => self.resolve(&tag, Some(spec)),
            _ => Err(UnionError::AmbiguousKey {
                kind: self.kind,
                found,
            }),
        }
    }
}

fn describe_keys(item: &Mapping) -> String {
    item.iter()
        .map(|(key, _)| match key {
            Value::String(s) => s.clone(),
            other => format!("{other:?}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Deserialize a field that accepts either one object or a list of objects.
///
/// A missing or null value yields an empty list. Use with
/// `#[serde(default, deserialize_with = "one_or_many")]`.
///
/// # Errors
/// Returns the decoder's error if any element has the wrong shape.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .into_iter()
            .map(serde_yaml::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(D::Error::custom),
        other => serde_yaml::from_value(other)
            .map(|one| vec![one])
            .map_err(D::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Circle {
        radius: u32,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Square {
        side: u32,
    }

    #[derive(Debug, PartialEq)]
    enum Shape {
        Circle(Circle),
        Square(Square),
    }

    static SHAPES: VariantRegistry<Shape> = VariantRegistry::new(
        "shape",
        &[
            ("circle", |v| serde_yaml::from_value(v).map(Shape::Circle)),
            ("square", |v| serde_yaml::from_value(v).map(Shape::Square)),
        ],
    );

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_resolve_known_tag() {
        let shape = SHAPES.resolve("circle", Some(yaml("radius: 3"))).unwrap();
        assert_eq!(shape, Shape::Circle(Circle { radius: 3 }));
    }

    #[test]
    fn test_resolve_missing_spec_is_zero_value() {
        let shape = SHAPES.resolve("square", None).unwrap();
        assert_eq!(shape, Shape::Square(Square::default()));

        let shape = SHAPES.resolve("square", Some(Value::Null)).unwrap();
        assert_eq!(shape, Shape::Square(Square::default()));
    }

    #[test]
    fn test_resolve_unknown_tag() {
        let err = SHAPES.resolve("triangle", None).unwrap_err();
        assert_eq!(
            err,
            UnionError::UnknownVariant {
                kind: "shape",
                tag: "triangle".to_string(),
                expected: "circle, square".to_string(),
            }
        );
        assert!(err.to_string().contains("unknown shape type `triangle`"));
    }

    #[test]
    fn test_resolve_malformed_payload() {
        let err = SHAPES
            .resolve("circle", Some(yaml("radius: [1, 2]")))
            .unwrap_err();
        assert!(matches!(err, UnionError::Malformed { tag, .. } if tag == "circle"));
    }

    #[test]
    fn test_resolve_keyed() {
        let item: Mapping = serde_yaml::from_str("square: { side: 2 }").unwrap();
        let shape = SHAPES.resolve_keyed(item).unwrap();
        assert_eq!(shape, Shape::Square(Square { side: 2 }));
    }

    #[test]
    fn test_resolve_keyed_rejects_multiple_keys() {
        let item: Mapping = serde_yaml::from_str("{ square: {}, circle: {} }").unwrap();
        let err = SHAPES.resolve_keyed(item).unwrap_err();
        assert!(matches!(err, UnionError::AmbiguousKey { found, .. } if found == "square, circle"));

        let err = SHAPES.resolve_keyed(Mapping::new()).unwrap_err();
        assert!(matches!(err, UnionError::AmbiguousKey { .. }));
    }

    #[test]
    fn test_registry_tags() {
        assert_eq!(SHAPES.kind(), "shape");
        assert_eq!(SHAPES.tags().collect::<Vec<_>>(), vec!["circle", "square"]);
        assert!(SHAPES.contains("circle"));
        assert!(!SHAPES.contains("hexagon"));
    }

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "one_or_many")]
        items: Vec<Circle>,
    }

    #[test]
    fn test_one_or_many_accepts_single_object() {
        let holder: Holder = serde_yaml::from_str("items: { radius: 1 }").unwrap();
        assert_eq!(holder.items, vec![Circle { radius: 1 }]);
    }

    #[test]
    fn test_one_or_many_accepts_list() {
        let holder: Holder = serde_yaml::from_str("items: [{ radius: 1 }, { radius: 2 }]").unwrap();
        assert_eq!(holder.items, vec![Circle { radius: 1 }, Circle { radius: 2 }]);
    }

    #[test]
    fn test_one_or_many_missing_or_null() {
        let holder: Holder = serde_yaml::from_str("{}").unwrap();
        assert!(holder.items.is_empty());

        let holder: Holder = serde_yaml::from_str("items: ~").unwrap();
        assert!(holder.items.is_empty());
    }
}
