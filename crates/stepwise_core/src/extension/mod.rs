//! Extension module contracts and the composition pipeline.
//!
//! # Responsibility
//! - Define the `configure` / `load` / `process` lifecycle every module
//!   implements.
//! - Run the lifecycle for all modules with a barrier between phases.
//!
//! # Invariants
//! - No module's `process` runs before every module's `load` finished.
//! - Modules only see each other through the registry.
//! - Any phase failure aborts composition; there is no partial registry.

pub mod config;
pub mod manager;

use crate::container::{ContainerError, Registry};
use config::{ConfigError, ConfigSchema, ExtensionConfig};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Unit of composition contributing services to the shared registry.
pub trait Extension {
    /// Key of this module's section in the configuration mapping.
    fn config_key(&self) -> &str;

    /// Declares accepted options. The default accepts none.
    fn configure(&self, _schema: &mut ConfigSchema) {}

    /// Registers this module's definitions and tags.
    fn load(&self, registry: &mut Registry, config: &ExtensionConfig) -> Result<(), ContainerError>;

    /// Wires contributors of owned extension points into their consumers.
    fn process(&self, registry: &mut Registry) -> Result<(), ContainerError>;
}

/// Lifecycle phase, used to label failures and log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionPhase {
    Configure,
    Load,
    Process,
}

impl ExtensionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Load => "load",
            Self::Process => "process",
        }
    }
}

/// Extension registration and composition errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    InvalidConfigKey(String),
    DuplicateConfigKey(String),
    InvalidConfigRoot,
    UnknownConfigSection(String),
    Config {
        extension: String,
        source: ConfigError,
    },
    Phase {
        extension: String,
        phase: ExtensionPhase,
        source: ContainerError,
    },
}

impl Display for ExtensionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfigKey(value) => write!(f, "extension config key is invalid: {value}"),
            Self::DuplicateConfigKey(value) => {
                write!(f, "extension config key already registered: {value}")
            }
            Self::InvalidConfigRoot => write!(f, "configuration root must be a mapping"),
            Self::UnknownConfigSection(value) => {
                write!(f, "configuration section has no matching extension: {value}")
            }
            Self::Config { extension, source } => {
                write!(f, "invalid `{extension}` configuration: {source}")
            }
            Self::Phase {
                extension,
                phase,
                source,
            } => write!(
                f,
                "extension `{extension}` failed during {}: {source}",
                phase.as_str()
            ),
        }
    }
}

impl Error for ExtensionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config { source, .. } => Some(source),
            Self::Phase { source, .. } => Some(source),
            _ => None,
        }
    }
}
