//! Exception presentation services.
//!
//! # Responsibility
//! - Define the stringer contract contributed through
//!   `ExtensionPoint::ExceptionStringer`.
//! - Provide the presenter consumer that tries stringers in priority order.
//!
//! # Invariants
//! - The first stringer that supports an error renders it; later ones are
//!   not consulted.
//! - Without a capable stringer the error's `Display` output is used.

mod extension;

pub use extension::ExceptionExtension;

use crate::chain::{handler_instance, ConsumerChain, HandlerChain};
use crate::container::{
    downcast_instance, Arguments, ContainerError, ContainerResult, FactoryCatalog, Instance,
    ServiceFactory,
};
use std::error::Error;
use std::path::MAIN_SEPARATOR;
use std::sync::Arc;

/// Output detail level, ordered from least to most detailed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Normal,
    Verbose,
    VeryVerbose,
    Debug,
}

impl Verbosity {
    /// Maps a configured level (`1..=4`) to a verbosity, clamping outliers.
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=1 => Self::Normal,
            2 => Self::Verbose,
            3 => Self::VeryVerbose,
            _ => Self::Debug,
        }
    }

    pub fn level(self) -> i64 {
        match self {
            Self::Normal => 1,
            Self::Verbose => 2,
            Self::VeryVerbose => 3,
            Self::Debug => 4,
        }
    }
}

/// Renders errors it recognizes.
pub trait ExceptionStringer: Send + Sync {
    fn supports_exception(&self, error: &(dyn Error + 'static)) -> bool;

    fn stringify_exception(&self, error: &(dyn Error + 'static), verbosity: Verbosity) -> String;
}

/// Consumer of the exception stringer chain.
pub struct ExceptionPresenter {
    base_path: String,
    default_verbosity: Verbosity,
    stringers: HandlerChain<dyn ExceptionStringer>,
}

impl ExceptionPresenter {
    /// Factory name definitions use for the presenter.
    pub const FACTORY: &'static str = "ExceptionPresenter";
    /// Method call wiring one stringer.
    pub const REGISTER_METHOD: &'static str = "register_exception_stringer";

    pub fn new(base_path: impl Into<String>, default_verbosity: Verbosity) -> Self {
        Self {
            base_path: base_path.into(),
            default_verbosity,
            stringers: HandlerChain::new(),
        }
    }

    pub fn register_exception_stringer(&mut self, stringer: Arc<dyn ExceptionStringer>) {
        self.stringers.append_handler(stringer);
    }

    pub fn stringer_count(&self) -> usize {
        self.stringers.len()
    }

    pub fn default_verbosity(&self) -> Verbosity {
        self.default_verbosity
    }

    /// Renders `error` with the first capable stringer, base path stripped.
    pub fn present_exception(
        &self,
        error: &(dyn Error + 'static),
        verbosity: Option<Verbosity>,
    ) -> String {
        let verbosity = verbosity.unwrap_or(self.default_verbosity);
        let message = self
            .stringers
            .first_map(|stringer| {
                stringer
                    .supports_exception(error)
                    .then(|| stringer.stringify_exception(error, verbosity))
            })
            .unwrap_or_else(|| error.to_string());
        self.relativize(message)
    }

    fn relativize(&self, message: String) -> String {
        if self.base_path.is_empty() {
            return message;
        }
        message.replace(&format!("{}{}", self.base_path, MAIN_SEPARATOR), "")
    }
}

impl ConsumerChain for ExceptionPresenter {
    type Handler = dyn ExceptionStringer;

    fn append_handler(&mut self, handler: Arc<dyn ExceptionStringer>) {
        self.register_exception_stringer(handler);
    }
}

/// Renders an error followed by its `source()` chain.
///
/// Supports only errors that have a source; plain errors fall through to the
/// presenter's `Display` fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceChainStringer;

impl ExceptionStringer for SourceChainStringer {
    fn supports_exception(&self, error: &(dyn Error + 'static)) -> bool {
        error.source().is_some()
    }

    fn stringify_exception(&self, error: &(dyn Error + 'static), verbosity: Verbosity) -> String {
        let mut rendered = error.to_string();
        let mut source = error.source();
        let mut depth = 0;
        while let Some(cause) = source {
            if verbosity == Verbosity::Normal && depth > 0 {
                rendered.push_str("\n  ...");
                break;
            }
            rendered.push_str(&format!("\n  caused by: {cause}"));
            source = cause.source();
            depth += 1;
        }
        rendered
    }
}

struct ExceptionPresenterFactory;

impl ServiceFactory for ExceptionPresenterFactory {
    fn create(&self, arguments: &Arguments) -> ContainerResult<Instance> {
        let base_path = arguments.str(0)?;
        let verbosity = Verbosity::from_level(arguments.i64(1)?);
        Ok(Box::new(ExceptionPresenter::new(base_path, verbosity)))
    }

    fn call(
        &self,
        instance: &mut Instance,
        method: &str,
        arguments: &Arguments,
    ) -> ContainerResult<()> {
        if method != ExceptionPresenter::REGISTER_METHOD {
            return Err(ContainerError::UnsupportedMethodCall {
                service: arguments.service_id().clone(),
                method: method.to_string(),
            });
        }
        let stringer = arguments.service::<Arc<dyn ExceptionStringer>>(0)?;
        downcast_instance::<ExceptionPresenter>(instance, arguments.service_id())?
            .register_exception_stringer(stringer);
        Ok(())
    }
}

/// Registers the presenter and default stringer factories.
pub fn register_factories(catalog: &mut FactoryCatalog) {
    catalog.register(ExceptionPresenter::FACTORY, ExceptionPresenterFactory);
    catalog.register_fn(ExceptionExtension::DEFAULT_STRINGER_FACTORY, |_| {
        let stringer: Arc<dyn ExceptionStringer> = Arc::new(SourceChainStringer);
        Ok(handler_instance(stringer))
    });
}
