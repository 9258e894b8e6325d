//! User configuration.
//!
//! `~/.pagewarm/config.ini` is loaded into a [`ConfigFile`]; the runtime
//! configs ([`ProcessorConfig`](crate::prefetch::ProcessorConfig),
//! [`CancellationConfig`](crate::cancel::CancellationConfig),
//! [`NavigationConfig`](crate::navigation::NavigationConfig)) convert from
//! its sections.
//!
//! # Example
//!
//! ```
//! use pagewarm::config::ConfigFile;
//! use pagewarm::prefetch::ProcessorConfig;
//!
//! let config = ConfigFile::default();
//! let processor = ProcessorConfig::from(&config.prefetch);
//! assert_eq!(processor.max_concurrent, 3);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{CancellationSettings, ConfigFile, LoggingSettings, PrefetchSettings};
