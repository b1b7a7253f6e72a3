//! Cache and machine size mapping

use crate::schema::{Definitions, Size};
use pipeshift_harness as harness;
use std::collections::HashSet;

/// Paths for the caches Bitbucket predefines, keyed by cache name
pub static BUILTIN_CACHES: &[(&str, &[&str])] = &[
    ("composer", &["composer", "~/.composer/cache"]),
    ("dotnetcore", &["dotnetcore", "~/.nuget/packages"]),
    ("gradle", &["gradle", "~/.gradle/caches"]),
    ("ivy2", &["ivy2", "~/.ivy2/cache"]),
    ("maven", &["maven", "~/.m2/repository"]),
    ("node", &["node", "node_modules"]),
    ("pip", &["pip", "~/.cache/pip"]),
    ("sbt", &["sbt", "ivy2", "~/.ivy2/cache"]),
];

/// Look up the paths of a predefined cache
#[must_use]
pub fn builtin_cache_paths(name: &str) -> Option<&'static [&'static str]> {
    BUILTIN_CACHES
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, paths)| *paths)
}

/// Build the stage cache block for a sorted set of cache names.
///
/// Paths from `definitions.caches` come first, then predefined cache paths,
/// with duplicates removed. Names matching neither are dropped. Returns
/// `None` when no name resolves.
#[must_use]
pub fn convert_cache(definitions: Option<&Definitions>, names: &[String]) -> Option<harness::Cache> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();
    let mut push = |path: &str| {
        if seen.insert(path.to_string()) {
            paths.push(path.to_string());
        }
    };

    if let Some(definitions) = definitions {
        for name in names {
            if let Some(cache) = definitions.caches.get(name) {
                push(&cache.path);
            }
        }
    }

    for name in names {
        for &path in builtin_cache_paths(name).unwrap_or_default() {
            push(path);
        }
    }

    for name in names {
        let defined = definitions.is_some_and(|d| d.caches.contains_key(name));
        if !defined && builtin_cache_paths(name).is_none() {
            tracing::debug!(cache = %name, "Dropping unresolved cache");
        }
    }

    if paths.is_empty() {
        return None;
    }

    Some(harness::Cache {
        enabled: true,
        paths,
        ..harness::Cache::default()
    })
}

/// Harness cloud machine size for a Bitbucket size tier
#[must_use]
pub const fn convert_size(size: Size) -> &'static str {
    match size {
        Size::X1 => "standard",
        Size::X2 => "large",
        Size::X4 => "xlarge",
        Size::X8 => "xxlarge",
        Size::None => "",
    }
}
