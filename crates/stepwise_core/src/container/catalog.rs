//! Factories that turn planned services into live instances.

use crate::container::definition::ServiceId;
use crate::container::error::{ContainerError, ContainerResult};
use serde_json::Value;
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Instance owned by its factory until every method call has run.
pub type Instance = Box<dyn Any + Send + Sync>;
/// Instance after construction, shared through the container.
pub type SharedInstance = Arc<dyn Any + Send + Sync>;

/// Argument after placeholder and reference resolution.
#[derive(Clone)]
pub enum ResolvedArgument {
    Value(Value),
    Service(SharedInstance),
}

/// Resolved arguments of one constructor or method call.
pub struct Arguments {
    service: ServiceId,
    values: Vec<ResolvedArgument>,
}

impl Arguments {
    pub fn new(service: ServiceId, values: Vec<ResolvedArgument>) -> Self {
        Self { service, values }
    }

    /// Id of the service being constructed.
    pub fn service_id(&self) -> &ServiceId {
        &self.service
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> ContainerResult<&Value> {
        match self.values.get(index) {
            Some(ResolvedArgument::Value(value)) => Ok(value),
            _ => Err(self.mismatch(index, "a literal value")),
        }
    }

    pub fn str(&self, index: usize) -> ContainerResult<&str> {
        self.value(index)?
            .as_str()
            .ok_or_else(|| self.mismatch(index, "a string"))
    }

    pub fn i64(&self, index: usize) -> ContainerResult<i64> {
        self.value(index)?
            .as_i64()
            .ok_or_else(|| self.mismatch(index, "an integer"))
    }

    /// Clones the referenced instance out as `T`.
    ///
    /// Chain handlers are stored as `Arc<dyn Trait>`, so consumers ask for
    /// exactly that type here.
    pub fn service<T: Any + Clone>(&self, index: usize) -> ContainerResult<T> {
        match self.values.get(index) {
            Some(ResolvedArgument::Service(instance)) => {
                let instance: &(dyn Any + Send + Sync) = &**instance;
                instance
                    .downcast_ref::<T>()
                    .cloned()
                    .ok_or_else(|| self.mismatch(index, type_name::<T>()))
            }
            _ => Err(self.mismatch(index, type_name::<T>())),
        }
    }

    /// Like [`Arguments::service`], but a `null` argument (an optional
    /// reference to an undefined service) yields `None`.
    pub fn optional_service<T: Any + Clone>(&self, index: usize) -> ContainerResult<Option<T>> {
        match self.values.get(index) {
            Some(ResolvedArgument::Value(Value::Null)) | None => Ok(None),
            _ => self.service(index).map(Some),
        }
    }

    fn mismatch(&self, index: usize, expected: &'static str) -> ContainerError {
        ContainerError::ArgumentMismatch {
            service: self.service.clone(),
            index,
            expected,
        }
    }
}

/// Builds instances of one service kind and applies method calls to them.
pub trait ServiceFactory: Send + Sync {
    fn create(&self, arguments: &Arguments) -> ContainerResult<Instance>;

    /// Applies one post-construction method call.
    ///
    /// Factories without method calls keep the default, which rejects all.
    fn call(
        &self,
        _instance: &mut Instance,
        method: &str,
        arguments: &Arguments,
    ) -> ContainerResult<()> {
        Err(ContainerError::UnsupportedMethodCall {
            service: arguments.service_id().clone(),
            method: method.to_string(),
        })
    }
}

struct FnFactory<F>(F);

impl<F> ServiceFactory for FnFactory<F>
where
    F: Fn(&Arguments) -> ContainerResult<Instance> + Send + Sync,
{
    fn create(&self, arguments: &Arguments) -> ContainerResult<Instance> {
        (self.0)(arguments)
    }
}

/// Borrows the concrete value inside an instance for a method call.
pub fn downcast_instance<'a, T: Any>(
    instance: &'a mut Instance,
    service: &ServiceId,
) -> ContainerResult<&'a mut T> {
    (**instance)
        .downcast_mut::<T>()
        .ok_or_else(|| ContainerError::InstanceType {
            service: service.clone(),
            expected: type_name::<T>(),
        })
}

/// Factory lookup by the name definitions refer to.
#[derive(Default)]
pub struct FactoryCatalog {
    factories: BTreeMap<String, Box<dyn ServiceFactory>>,
}

impl FactoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the factory for `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: impl ServiceFactory + 'static) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Registers a factory for services that take no method calls.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, create: F)
    where
        F: Fn(&Arguments) -> ContainerResult<Instance> + Send + Sync + 'static,
    {
        self.register(name, FnFactory(create));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ServiceFactory> {
        self.factories.get(name).map(Box::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
