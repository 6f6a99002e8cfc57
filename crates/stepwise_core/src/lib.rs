//! Extension-composition core for the stepwise test runner.
//!
//! Extension modules register tagged services into a shared [`Registry`];
//! priority resolution turns each extension point into an ordered handler
//! chain that is wired into its consumer before construction.

pub mod chain;
pub mod container;
pub mod definition;
pub mod exception;
pub mod extension;
pub mod logging;

pub use chain::{ConsumerChain, HandlerChain};
pub use container::{
    Argument, Container, ContainerError, ContainerResult, Definition, ExtensionPoint,
    FactoryCatalog, Reference, Registry, ServiceId, ServiceProcessor, TagIndex, TaggedService,
    PATHS_BASE_PARAMETER,
};
pub use definition::{DefinitionExtension, DefinitionFinder, DefinitionSearchEngine, SearchResult};
pub use exception::{ExceptionExtension, ExceptionPresenter, ExceptionStringer, Verbosity};
pub use extension::config::{ConfigError, ConfigSchema, ExtensionConfig, OptionKind};
pub use extension::manager::ExtensionManager;
pub use extension::{Extension, ExtensionError, ExtensionPhase};
pub use logging::{default_log_level, init_logging, init_logging_from_env, logging_status};

/// Factory catalog with every consumer this crate implements.
///
/// Contributors owned by other modules (search engines, controllers, ...)
/// still need their own factories before they can be built.
pub fn builtin_factories() -> FactoryCatalog {
    let mut catalog = FactoryCatalog::new();
    definition::register_factories(&mut catalog);
    exception::register_factories(&mut catalog);
    catalog
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{builtin_factories, core_version, DefinitionFinder, ExceptionPresenter};

    #[test]
    fn builtin_factories_cover_consumers() {
        let catalog = builtin_factories();
        assert!(catalog.contains(DefinitionFinder::FACTORY));
        assert!(catalog.contains(ExceptionPresenter::FACTORY));
        assert!(catalog.contains("SourceChainStringer"));
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
