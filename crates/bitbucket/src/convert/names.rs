//! Deterministic name generation for converted stages and steps

use std::collections::HashSet;

/// Generates unique names within one scope (a pipeline or a stage).
///
/// Names are `slug(base)_role`, or just `role` when the base is empty or
/// equal to the role. A name already handed out gets a `_2`, `_3`, ...
/// suffix. The same sequence of requests always yields the same names.
#[derive(Debug, Default)]
pub struct Namer {
    used: HashSet<String>,
}

impl Namer {
    /// Create an empty scope
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a name from an optional source name and a role suffix
    pub fn generate(&mut self, base: Option<&str>, role: &str) -> String {
        let candidate = match base.map(slugify) {
            Some(base) if !base.is_empty() && base != role => format!("{base}_{role}"),
            _ => role.to_string(),
        };
        self.unique(&candidate)
    }

    /// Claim `candidate`, disambiguating it if it is already taken
    pub fn unique(&mut self, candidate: &str) -> String {
        if self.used.insert(candidate.to_string()) {
            return candidate.to_string();
        }

        let mut n = 2;
        loop {
            let name = format!("{candidate}_{n}");
            if self.used.insert(name.clone()) {
                return name;
            }
            n += 1;
        }
    }
}

/// Lowercase `name`, replacing runs of non-alphanumerics with `_`
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}
