use thiserror::Error;
use widget_client::ApiError;
use widget_core::ConfigError;
use widget_state::NavigationError;

use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API client error: {0}")]
    Api(#[from] ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Widget has been torn down")]
    TornDown,
}

pub type Result<T> = std::result::Result<T, EngineError>;
