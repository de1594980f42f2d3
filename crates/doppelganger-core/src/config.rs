use config::{Config, ConfigError, File as ConfigFile};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Glob patterns excluded from every tree, in addition to each tree's own
    /// pattern file.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// File name of the per-tree catalogue, relative to the tree root.
    #[serde(default)]
    pub catalogue_name: Option<String>,
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Doppelganger").required(false))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
