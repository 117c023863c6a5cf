use std::path::PathBuf;

/// Widget data directory (~/.chat-widget)
pub fn widget_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".chat-widget")
}

/// config.json path
pub fn config_json_path() -> PathBuf {
    widget_dir().join("config.json")
}

/// Default location of the persisted credential pair
pub fn default_storage_dir() -> PathBuf {
    widget_dir().join("storage")
}
