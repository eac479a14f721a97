use kindred_layout::LayoutConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CACHE_KEY_PREFIX: &str = "family_tree_layout_";

/// Engine-wide settings. Deserializes from partial JSON; missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    /// Cached layouts older than this are ignored.
    pub cache_expiry_secs: i64,
    /// Quiet period before a drag is written to the cache.
    pub autosave_delay_ms: i64,
    pub cache_key_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            cache_expiry_secs: 7 * 24 * 60 * 60,
            autosave_delay_ms: 2_000,
            cache_key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.layout.validate()?;
        Ok(config)
    }

    pub fn cache_expiry(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_expiry_secs.max(0))
    }

    pub fn autosave_delay(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.autosave_delay_ms.max(0))
    }
}
