mod background_tasks;
mod config;
mod error;
mod log_files;
mod source;
pub mod watcher;

pub use background_tasks::BackgroundTasks;
pub use config::{
    AppConfig, AppConfigExt, Column, Flag, SinkSettings, TrackingFlags, default_log_directory,
};
pub use error::{ConfigError, WatcherError};
pub use log_files::{LogFile, find_newest_log, is_combat_log};
pub use source::LogSource;
