//! Core configuration

use serde::{Deserialize, Serialize};

/// Settings the core needs at request time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Maximum documents a free account may own per resource collection
    #[serde(default = "default_free_tier_limit")]
    pub free_tier_limit: u64,

    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_free_tier_limit() -> u64 {
    5
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            free_tier_limit: default_free_tier_limit(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl StudyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_free_tier_limit(mut self, limit: u64) -> Self {
        self.free_tier_limit = limit;
        self
    }
}
