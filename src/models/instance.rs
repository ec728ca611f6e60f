use serde::Deserialize;
use serde_json::value::RawValue;

use crate::validation::Problems;

/// The top-level configuration document: an instance name and an ordered
/// sequence of service sub-documents, kept raw so each scheduler can decode
/// the parts it owns.
#[derive(Debug, Deserialize)]
pub struct InstanceConfig {
    /// Instance name, required and non-empty.
    #[serde(default)]
    pub name: String,
    /// Service documents in declaration order.
    #[serde(default)]
    pub services: Vec<Box<RawValue>>,
}

impl InstanceConfig {
    /// Validates the document header. An empty map means valid.
    pub fn validate(&self) -> Problems {
        let mut problems = Problems::new();

        if self.name.is_empty() {
            problems.insert("name".to_string(), "'name' is required".to_string());
        }

        if self.services.is_empty() {
            problems.insert("services".to_string(), "services cannot be empty".to_string());
        }

        problems
    }
}
