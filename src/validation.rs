//! Structured configuration errors.
//!
//! Every error raised while validating a configuration document carries a
//! dotted path locating the offending object. Paths accumulate from the
//! innermost scope outwards: a probe validator anchors the path at
//! `service.probe`, and the config loader prepends the instance name as the
//! error bubbles up, so the final message reads `instance.service.probe`.

use std::collections::BTreeMap;

use thiserror::Error;

/// A map of field name to a human readable explanation of what is wrong.
/// An empty map means the object is valid.
pub type Problems = BTreeMap<String, String>;

/// An error describing why a configuration document was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more fields of a config object fail validation rules.
    #[error("validation errors found in '{path}': {}", render_problems(.problems))]
    Validation {
        /// Dotted path to the offending object.
        path: String,
        /// Field name to problem description.
        problems: Problems,
    },

    /// A config object in a positional list lacks a `name`. The index is
    /// attached by the enclosing iterator.
    #[error("entity in '{}' has no name", render_indexed(.path, .index))]
    NoName {
        /// Dotted path to the enclosing scope.
        path: String,
        /// Position of the nameless object within its list, if known.
        index: Option<usize>,
    },

    /// Two sibling config entries produce the same canonical ID. The path
    /// ends with the position of the second entry.
    #[error("duplicate entity in '{path}'")]
    Duplicate {
        /// Dotted path including the offending entry's position.
        path: String,
    },
}

fn render_problems(problems: &Problems) -> String {
    problems
        .iter()
        .map(|(field, problem)| format!("{field}={problem}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_indexed(path: &str, index: &Option<usize>) -> String {
    match index {
        Some(i) => format!("{path}[{i}]"),
        None => path.to_string(),
    }
}

fn join_path<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments.into_iter().map(|s| s.as_ref().to_string()).collect::<Vec<_>>().join(".")
}

impl ConfigError {
    /// A field-problems error at the given path segments.
    pub fn validation<I, S>(problems: Problems, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ConfigError::Validation { path: join_path(path), problems }
    }

    /// A missing-name error at the given path segments, with no index yet.
    pub fn no_name<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ConfigError::NoName { path: join_path(path), index: None }
    }

    /// A duplicate-entity error at the given path segments.
    pub fn duplicate<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ConfigError::Duplicate { path: join_path(path) }
    }

    /// Adds a segment at the front of the path, used as the error propagates
    /// from inner schedulers out to the top-level loader.
    pub fn prepend_path(&mut self, segment: &str) {
        let path = match self {
            ConfigError::Validation { path, .. } => path,
            ConfigError::NoName { path, .. } => path,
            ConfigError::Duplicate { path } => path,
        };
        *path = if path.is_empty() {
            segment.to_string()
        } else {
            format!("{segment}.{path}")
        };
    }

    /// Records the positional index of a nameless object. No-op for other
    /// variants.
    pub fn set_index(&mut self, i: usize) {
        if let ConfigError::NoName { index, .. } = self {
            *index = Some(i);
        }
    }

    /// The accumulated dotted path.
    pub fn path(&self) -> &str {
        match self {
            ConfigError::Validation { path, .. } => path,
            ConfigError::NoName { path, .. } => path,
            ConfigError::Duplicate { path } => path,
        }
    }
}
