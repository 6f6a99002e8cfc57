//! Exception extension module.

use crate::container::{
    ContainerError, Definition, ExtensionPoint, Registry, ServiceProcessor, PATHS_BASE_PARAMETER,
};
use crate::exception::{ExceptionPresenter, Verbosity};
use crate::extension::config::{ConfigSchema, ExtensionConfig, OptionKind};
use crate::extension::Extension;
use serde_json::json;

/// Provides the exception presenter and owns the stringer extension point.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExceptionExtension {
    processor: ServiceProcessor,
}

impl ExceptionExtension {
    pub const CONFIG_KEY: &'static str = "exception";
    pub const PRESENTER_ID: &'static str = "exception.presenter";
    pub const STRINGER_POINT: ExtensionPoint = ExtensionPoint::ExceptionStringer;
    /// Built-in stringer rendering an error with its `source()` chain.
    pub const DEFAULT_STRINGER_ID: &'static str = "exception.stringer.source_chain";
    pub const DEFAULT_STRINGER_FACTORY: &'static str = "SourceChainStringer";
    pub const DEFAULT_STRINGER_PRIORITY: i32 = 50;

    pub fn new() -> Self {
        Self::default()
    }

    fn load_presenter(&self, registry: &mut Registry, config: &ExtensionConfig) {
        let verbosity = config
            .integer("verbosity")
            .unwrap_or(Verbosity::Normal.level());
        registry.define(
            Self::PRESENTER_ID,
            Definition::new(ExceptionPresenter::FACTORY)
                .with_argument(json!(format!("%{PATHS_BASE_PARAMETER}%")))
                .with_argument(json!(verbosity)),
        );
    }

    fn load_default_stringers(&self, registry: &mut Registry) {
        registry.define(
            Self::DEFAULT_STRINGER_ID,
            Definition::new(Self::DEFAULT_STRINGER_FACTORY)
                .with_tag(Self::STRINGER_POINT, Self::DEFAULT_STRINGER_PRIORITY),
        );
    }

    fn process_stringers(&self, registry: &mut Registry) -> Result<(), ContainerError> {
        self.processor
            .wire_tagged_services(
                registry,
                &Self::STRINGER_POINT,
                Self::PRESENTER_ID,
                ExceptionPresenter::REGISTER_METHOD,
            )
            .map(|_| ())
    }
}

impl Extension for ExceptionExtension {
    fn config_key(&self) -> &str {
        Self::CONFIG_KEY
    }

    fn configure(&self, schema: &mut ConfigSchema) {
        schema.option(
            "verbosity",
            OptionKind::Integer,
            Verbosity::Normal.level(),
        );
    }

    fn load(&self, registry: &mut Registry, config: &ExtensionConfig) -> Result<(), ContainerError> {
        registry.declare_extension_point(Self::STRINGER_POINT);
        self.load_presenter(registry, config);
        self.load_default_stringers(registry);
        Ok(())
    }

    fn process(&self, registry: &mut Registry) -> Result<(), ContainerError> {
        self.process_stringers(registry)
    }
}
