//! Configuration loading and raw file-config types.

mod file_config;
mod loader;

pub use file_config::{
    FileCiConfig, FileConfig, FileContextConfig, FileEventsConfig, FileMemoryConfig,
    FileOrchestratorConfig, FileQueueConfig, FileSpecialistConfig,
};
pub use loader::ConfigLoader;
