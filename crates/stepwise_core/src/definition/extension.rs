//! Definition extension module.

use crate::container::{
    ContainerError, Definition, ExtensionPoint, Reference, Registry, ServiceProcessor,
};
use crate::definition::DefinitionFinder;
use crate::extension::config::ExtensionConfig;
use crate::extension::Extension;

/// Provides the definition finder and owns the search-engine extension point.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefinitionExtension {
    processor: ServiceProcessor,
}

impl DefinitionExtension {
    pub const CONFIG_KEY: &'static str = "definition";
    pub const FINDER_ID: &'static str = "definition.finder";
    pub const REPOSITORY_ID: &'static str = "definition.repository";
    pub const WRITER_ID: &'static str = "definition.writer";
    pub const PATTERN_TRANSFORMER_ID: &'static str = "definition.pattern_transformer";
    pub const SEARCH_ENGINE_POINT: ExtensionPoint = ExtensionPoint::SearchEngine;
    pub const DEFAULT_SEARCH_ENGINE_ID: &'static str = "definition.search_engine.repository";
    pub const DEFAULT_SEARCH_ENGINE_PRIORITY: i32 = 50;
    pub const ANNOTATION_READER_ID: &'static str = "context.annotation_reader.definition";
    pub const ANNOTATION_READER_PRIORITY: i32 = 50;
    pub const CONTROLLER_ID: &'static str = "cli.controller.available_definitions";
    pub const CONTROLLER_PRIORITY: i32 = 500;

    /// Owned by the environment module; absent in a definition-only setup.
    pub const ENVIRONMENT_MANAGER_ID: &'static str = "environment.manager";
    /// Owned by the translator module.
    pub const TRANSLATOR_ID: &'static str = "translator";

    pub fn new() -> Self {
        Self::default()
    }

    fn load_finder(&self, registry: &mut Registry) {
        registry.define(Self::FINDER_ID, Definition::new(DefinitionFinder::FACTORY));
    }

    fn load_repository(&self, registry: &mut Registry) {
        registry.define(
            Self::REPOSITORY_ID,
            Definition::new("DefinitionRepository")
                .with_argument(Reference::optional(Self::ENVIRONMENT_MANAGER_ID)),
        );
    }

    fn load_writer(&self, registry: &mut Registry) {
        registry.define(
            Self::WRITER_ID,
            Definition::new("DefinitionWriter")
                .with_argument(Reference::optional(Self::ENVIRONMENT_MANAGER_ID))
                .with_argument(Reference::new(Self::REPOSITORY_ID)),
        );
    }

    fn load_pattern_transformer(&self, registry: &mut Registry) {
        registry.define(
            Self::PATTERN_TRANSFORMER_ID,
            Definition::new("PatternTransformer"),
        );
    }

    fn load_default_search_engines(&self, registry: &mut Registry) {
        registry.define(
            Self::DEFAULT_SEARCH_ENGINE_ID,
            Definition::new("RepositorySearchEngine")
                .with_argument(Reference::new(Self::REPOSITORY_ID))
                .with_argument(Reference::new(Self::PATTERN_TRANSFORMER_ID))
                .with_argument(Reference::optional(Self::TRANSLATOR_ID))
                .with_tag(
                    Self::SEARCH_ENGINE_POINT,
                    Self::DEFAULT_SEARCH_ENGINE_PRIORITY,
                ),
        );
    }

    fn load_annotation_reader(&self, registry: &mut Registry) {
        registry.define(
            Self::ANNOTATION_READER_ID,
            Definition::new("DefinitionAnnotationReader")
                .with_tag(ExtensionPoint::AnnotationReader, Self::ANNOTATION_READER_PRIORITY),
        );
    }

    fn load_controller(&self, registry: &mut Registry) {
        registry.define(
            Self::CONTROLLER_ID,
            Definition::new("AvailableDefinitionsController")
                .with_argument(Reference::new(Self::WRITER_ID))
                .with_tag(ExtensionPoint::CliController, Self::CONTROLLER_PRIORITY),
        );
    }

    fn process_search_engines(&self, registry: &mut Registry) -> Result<(), ContainerError> {
        self.processor
            .wire_tagged_services(
                registry,
                &Self::SEARCH_ENGINE_POINT,
                Self::FINDER_ID,
                DefinitionFinder::REGISTER_METHOD,
            )
            .map(|_| ())
    }
}

impl Extension for DefinitionExtension {
    fn config_key(&self) -> &str {
        Self::CONFIG_KEY
    }

    fn load(&self, registry: &mut Registry, _config: &ExtensionConfig) -> Result<(), ContainerError> {
        registry.declare_extension_point(Self::SEARCH_ENGINE_POINT);
        self.load_finder(registry);
        self.load_repository(registry);
        self.load_writer(registry);
        self.load_pattern_transformer(registry);
        self.load_default_search_engines(registry);
        self.load_annotation_reader(registry);
        self.load_controller(registry);
        Ok(())
    }

    fn process(&self, registry: &mut Registry) -> Result<(), ContainerError> {
        self.process_search_engines(registry)
    }
}
