use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// JSON document on disk
    File,
    /// process memory only
    #[default]
    Memory,
    /// no medium available, every operation is a no-op
    None,
}

/// The top-level token store configuration block.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(rename = "type", default)]
    pub store_type: StoreType,

    /// Session file location.
    /// Invariant: required when `type = file`.
    pub path: Option<String>,
}
