//! Extension manager and phased composition pipeline.

use crate::container::{ContainerError, Registry};
use crate::definition::DefinitionExtension;
use crate::exception::ExceptionExtension;
use crate::extension::config::{ConfigSchema, ExtensionConfig};
use crate::extension::{Extension, ExtensionError, ExtensionPhase};
use log::{error, info};
use serde_json::{Map, Value};
use std::time::Instant;

/// Ordered set of extension modules keyed by config key.
#[derive(Default)]
pub struct ExtensionManager {
    extensions: Vec<Box<dyn Extension>>,
}

impl ExtensionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager with the built-in definition and exception modules.
    pub fn with_builtin_extensions() -> Result<Self, ExtensionError> {
        let mut manager = Self::new();
        manager.register(Box::new(ExceptionExtension::new()))?;
        manager.register(Box::new(DefinitionExtension::new()))?;
        Ok(manager)
    }

    /// Adds one module after all previously registered ones.
    ///
    /// # Errors
    /// - `InvalidConfigKey` unless the key is lowercase `[a-z0-9_]`.
    /// - `DuplicateConfigKey` when another module already uses the key.
    pub fn register(&mut self, extension: Box<dyn Extension>) -> Result<(), ExtensionError> {
        let key = extension.config_key().to_string();
        if !is_valid_config_key(&key) {
            return Err(ExtensionError::InvalidConfigKey(key));
        }
        if self.get(&key).is_some() {
            return Err(ExtensionError::DuplicateConfigKey(key));
        }

        self.extensions.push(extension);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn get(&self, config_key: &str) -> Option<&dyn Extension> {
        self.extensions
            .iter()
            .find(|extension| extension.config_key() == config_key)
            .map(Box::as_ref)
    }

    /// Config keys in registration order.
    pub fn config_keys(&self) -> Vec<&str> {
        self.extensions
            .iter()
            .map(|extension| extension.config_key())
            .collect()
    }

    /// Runs configure, load and process for every module.
    ///
    /// `config` is a mapping from config key to that module's section; `null`
    /// means every module uses its defaults. Each phase completes for all
    /// modules before the next phase starts.
    ///
    /// # Errors
    /// - `InvalidConfigRoot` / `UnknownConfigSection` for malformed input.
    /// - `Config` when a section fails its module's schema.
    /// - `Phase` when a module's `load` or `process` fails.
    ///
    /// # Side effects
    /// - Emits `extension_*` and `compose` logging events.
    pub fn compose(&self, registry: &mut Registry, config: &Value) -> Result<(), ExtensionError> {
        let started_at = Instant::now();
        let result = self.run_phases(registry, config);
        match &result {
            Ok(()) => info!(
                "event=compose module=extension status=ok extensions={} services={} duration_ms={}",
                self.len(),
                registry.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=compose module=extension status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn run_phases(&self, registry: &mut Registry, config: &Value) -> Result<(), ExtensionError> {
        let sections = self.config_sections(config)?;

        let mut resolved: Vec<ExtensionConfig> = Vec::with_capacity(self.len());
        for extension in &self.extensions {
            let key = extension.config_key();
            let mut schema = ConfigSchema::new();
            extension.configure(&mut schema);
            let section = sections.and_then(|sections| sections.get(key));
            let extension_config =
                schema
                    .resolve(section)
                    .map_err(|source| ExtensionError::Config {
                        extension: key.to_string(),
                        source,
                    })?;
            log_phase(key, ExtensionPhase::Configure);
            resolved.push(extension_config);
        }

        for (extension, extension_config) in self.extensions.iter().zip(&resolved) {
            extension
                .load(registry, extension_config)
                .map_err(|source| phase_error(extension.as_ref(), ExtensionPhase::Load, source))?;
            log_phase(extension.config_key(), ExtensionPhase::Load);
        }

        for extension in &self.extensions {
            extension
                .process(registry)
                .map_err(|source| phase_error(extension.as_ref(), ExtensionPhase::Process, source))?;
            log_phase(extension.config_key(), ExtensionPhase::Process);
        }
        Ok(())
    }

    fn config_sections<'a>(
        &self,
        config: &'a Value,
    ) -> Result<Option<&'a Map<String, Value>>, ExtensionError> {
        let sections = match config {
            Value::Null => return Ok(None),
            Value::Object(sections) => sections,
            _ => return Err(ExtensionError::InvalidConfigRoot),
        };

        if let Some(unknown) = sections.keys().find(|key| self.get(key).is_none()) {
            return Err(ExtensionError::UnknownConfigSection(unknown.clone()));
        }
        Ok(Some(sections))
    }
}

fn phase_error(
    extension: &dyn Extension,
    phase: ExtensionPhase,
    source: ContainerError,
) -> ExtensionError {
    ExtensionError::Phase {
        extension: extension.config_key().to_string(),
        phase,
        source,
    }
}

fn log_phase(key: &str, phase: ExtensionPhase) {
    info!(
        "event=extension_{} module=extension status=ok extension={}",
        phase.as_str(),
        key
    );
}

fn is_valid_config_key(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
