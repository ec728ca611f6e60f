//! Canonical entity identities.
//!
//! Every observable thing in the system — a service, a monitor, a metric —
//! is addressed by an [`EntityID`]: a kind plus a set of labels. Its
//! canonical string form is the primary key everywhere an identity crosses a
//! boundary (database rows, API paths, scheduler maps).

use std::{collections::BTreeMap, fmt, str::FromStr};

use thiserror::Error;

/// Separator between `key=value` pairs in the canonical form.
pub const ID_SEPARATOR: char = '|';

/// The kind of entity an [`EntityID`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A named service grouping monitors and metrics.
    Service,
    /// A health probe.
    Monitor,
    /// A sampled metric.
    Metric,
}

impl EntityKind {
    /// Returns the canonical lowercase name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Service => "service",
            EntityKind::Monitor => "monitor",
            EntityKind::Metric => "metric",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ParseEntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "service" => Ok(EntityKind::Service),
            "monitor" => Ok(EntityKind::Monitor),
            "metric" => Ok(EntityKind::Metric),
            other => Err(ParseEntityIdError::UnknownKind(other.to_string())),
        }
    }
}

/// Errors produced when parsing a canonical ID string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseEntityIdError {
    /// The string contains no `kind=` pair.
    #[error("canonical id has no 'kind' pair")]
    MissingKind,

    /// The `kind=` pair names a kind the system does not produce.
    #[error("unknown entity kind: {0}")]
    UnknownKind(String),
}

/// A stable logical identifier for an observable entity.
///
/// Two IDs built from the same kind and label mapping always produce the
/// same canonical string, regardless of label insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityID {
    kind: EntityKind,
    labels: BTreeMap<String, String>,
}

impl EntityID {
    /// Builds an ID from a kind and an arbitrary label mapping.
    pub fn new<K, V>(kind: EntityKind, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            kind,
            labels: labels.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Builds the ID of a service belonging to the named instance.
    pub fn service(instance: &str, name: &str) -> Self {
        Self::new(EntityKind::Service, [("instance", instance), ("name", name)])
    }

    /// Derives a monitor or metric ID from its parent service ID.
    ///
    /// The child inherits `instance` from the parent's `instance` label and
    /// `service` from the parent's `name` label, then overlays its own
    /// `type` and `name`.
    pub fn probe(kind: EntityKind, service: &EntityID, probe_type: &str, name: &str) -> Self {
        Self::new(
            kind,
            [
                ("instance", service.label("instance").unwrap_or_default()),
                ("service", service.label("name").unwrap_or_default()),
                ("type", probe_type),
                ("name", name),
            ],
        )
    }

    /// The entity kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Looks up a label value.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Renders the canonical form: all label keys plus the synthetic `kind`
    /// key sorted ascending, each formatted `key=value`, joined by `|`.
    pub fn canonical(&self) -> String {
        let mut pairs: Vec<(&str, &str)> = self
            .labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(std::iter::once(("kind", self.kind.as_str())))
            .collect();
        pairs.sort();

        let mut out = String::new();
        for (i, (key, value)) in pairs.iter().enumerate() {
            if i > 0 {
                out.push(ID_SEPARATOR);
            }
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out
    }

    /// Parses a canonical string back into an ID.
    ///
    /// Tokens without a `=` are dropped silently; the `kind=` pair is lifted
    /// into the kind field; every other key becomes a label. Lossless for
    /// the set of IDs the system produces (no separator or `=` ever appears
    /// in a value).
    pub fn parse(s: &str) -> Result<Self, ParseEntityIdError> {
        let mut kind = None;
        let mut labels = BTreeMap::new();

        for token in s.split(ID_SEPARATOR) {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            if key == "kind" {
                kind = Some(value.parse()?);
            } else {
                labels.insert(key.to_string(), value.to_string());
            }
        }

        Ok(Self { kind: kind.ok_or(ParseEntityIdError::MissingKind)?, labels })
    }
}

impl fmt::Display for EntityID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
