//! Definition lookup services.
//!
//! # Responsibility
//! - Define the search-engine contract contributed through
//!   `ExtensionPoint::SearchEngine`.
//! - Provide the finder consumer that asks engines in priority order.
//!
//! Matching step text against definitions is left to the engines.

mod extension;

pub use extension::DefinitionExtension;

use crate::chain::{ConsumerChain, HandlerChain};
use crate::container::{
    downcast_instance, Arguments, ContainerError, ContainerResult, FactoryCatalog, Instance,
    ServiceFactory,
};
use serde::Serialize;
use std::sync::Arc;

/// Match produced by a search engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Identifier of the matched definition, e.g. `FeatureContext::iHaveCukes`.
    pub definition: String,
    pub matched_text: String,
    pub arguments: Vec<String>,
}

/// Finds the definition for one step, or declines with `None`.
pub trait DefinitionSearchEngine: Send + Sync {
    fn search_definition(&self, step_text: &str) -> Option<SearchResult>;
}

/// Consumer of the search-engine chain.
#[derive(Default)]
pub struct DefinitionFinder {
    engines: HandlerChain<dyn DefinitionSearchEngine>,
}

impl DefinitionFinder {
    pub const FACTORY: &'static str = "DefinitionFinder";
    pub const REGISTER_METHOD: &'static str = "register_search_engine";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_search_engine(&mut self, engine: Arc<dyn DefinitionSearchEngine>) {
        self.engines.append_handler(engine);
    }

    pub fn search_engine_count(&self) -> usize {
        self.engines.len()
    }

    /// Result of the first engine that finds a match.
    pub fn find_definition(&self, step_text: &str) -> Option<SearchResult> {
        self.engines
            .first_map(|engine| engine.search_definition(step_text))
    }
}

impl ConsumerChain for DefinitionFinder {
    type Handler = dyn DefinitionSearchEngine;

    fn append_handler(&mut self, handler: Arc<dyn DefinitionSearchEngine>) {
        self.register_search_engine(handler);
    }
}

struct DefinitionFinderFactory;

impl ServiceFactory for DefinitionFinderFactory {
    fn create(&self, _arguments: &Arguments) -> ContainerResult<Instance> {
        Ok(Box::new(DefinitionFinder::new()))
    }

    fn call(
        &self,
        instance: &mut Instance,
        method: &str,
        arguments: &Arguments,
    ) -> ContainerResult<()> {
        if method != DefinitionFinder::REGISTER_METHOD {
            return Err(ContainerError::UnsupportedMethodCall {
                service: arguments.service_id().clone(),
                method: method.to_string(),
            });
        }
        let engine = arguments.service::<Arc<dyn DefinitionSearchEngine>>(0)?;
        downcast_instance::<DefinitionFinder>(instance, arguments.service_id())?
            .register_search_engine(engine);
        Ok(())
    }
}

/// Registers the finder factory. Engine factories come from the caller.
pub fn register_factories(catalog: &mut FactoryCatalog) {
    catalog.register(DefinitionFinder::FACTORY, DefinitionFinderFactory);
}
