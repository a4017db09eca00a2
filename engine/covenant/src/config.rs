use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;
use crate::error::{CovenantError, CovenantResult};
use crate::registry::{self, Edge, SubtypeRegistry};

/// Startup configuration: the inheritance table and the calendar offset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub inheritance: Vec<Edge>,
    pub utc_offset_seconds: i32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigDocument {
    Full(RuntimeConfig),
    Table(Vec<Edge>),
}

impl RuntimeConfig {
    /// Parse either a full config object or a bare array of edges.
    pub fn from_json_str(text: &str) -> CovenantResult<Self> {
        let document: ConfigDocument = serde_json::from_str(text)
            .map_err(|error| CovenantError::Config(error.to_string()))?;
        let config = match document {
            ConfigDocument::Full(config) => config,
            ConfigDocument::Table(inheritance) => RuntimeConfig {
                inheritance,
                ..RuntimeConfig::default()
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> CovenantResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> CovenantResult<()> {
        if self.utc_offset_seconds.unsigned_abs() >= 86_400 {
            return Err(CovenantError::Config(format!(
                "utc_offset_seconds {} is outside (-86400, 86400)",
                self.utc_offset_seconds
            )));
        }
        if let Some(edge) = self
            .inheritance
            .iter()
            .find(|edge| edge.sub.is_empty() || edge.sup.is_empty())
        {
            return Err(CovenantError::Config(format!(
                "inheritance edge {:?} -> {:?} has an empty type name",
                edge.sub, edge.sup
            )));
        }
        Ok(())
    }

    pub fn registry(&self) -> SubtypeRegistry {
        SubtypeRegistry::from_edges(self.inheritance.clone())
    }

    pub fn calendar(&self) -> CovenantResult<Calendar> {
        Calendar::with_offset_seconds(self.utc_offset_seconds)
    }

    /// Install the inheritance table as the process-wide registry.
    pub fn install(&self) -> CovenantResult<&'static SubtypeRegistry> {
        registry::install(self.registry())
    }
}
