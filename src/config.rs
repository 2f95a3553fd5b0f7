// ⚙️ Resolver Configuration
//
// Loaded from a JSON file; every field has a default so an empty object
// ({}) is a valid configuration.

use crate::county::CountyProfile;
use crate::error::{ResolveError, Result};
use crate::person_parser::{NameOrderTie, ParserSettings};
use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// County profile name ("generic", "surname_first")
    pub county: String,

    /// Overrides the profile's tie rule when set
    pub name_order_tie: Option<NameOrderTie>,

    pub shared_surname_min_tokens: usize,

    /// Fill a sale's missing grantor from the previous sale's grantee
    pub infer_missing_grantors: bool,

    /// JSON vocabulary replacing the built-in tables
    pub vocabulary_path: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            county: "generic".to_string(),
            name_order_tie: None,
            shared_surname_min_tokens: 4,
            infer_missing_grantors: true,
            vocabulary_path: None,
        }
    }
}

impl ResolverConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ResolveError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: ResolverConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.shared_surname_min_tokens < 3 {
            return Err(ResolveError::Config(format!(
                "shared_surname_min_tokens must be at least 3, got {}",
                self.shared_surname_min_tokens
            )));
        }
        Ok(())
    }

    pub fn load_vocabulary(&self) -> Result<Vocabulary> {
        match &self.vocabulary_path {
            Some(path) => Vocabulary::from_file(path),
            None => Ok(Vocabulary::default()),
        }
    }

    /// Explicit tie setting > profile tie rule > FirstLast
    pub fn parser_settings(&self, profile: &dyn CountyProfile) -> ParserSettings {
        ParserSettings {
            tie: self
                .name_order_tie
                .or_else(|| profile.tie_break())
                .unwrap_or_default(),
            shared_surname_min_tokens: self.shared_surname_min_tokens,
        }
    }
}
