//! Live service graph built from a compiled registry.
//!
//! # Responsibility
//! - Instantiate planned services in dependency order.
//! - Apply method calls while each instance is still uniquely owned.
//! - Hand out shared, typed instances afterwards.
//!
//! # Invariants
//! - An instance is shared only after all its method calls ran.
//! - Services outside the requested closure are never constructed.

use crate::container::catalog::{Arguments, FactoryCatalog, ResolvedArgument, SharedInstance};
use crate::container::compiler::{ConstructionPlan, PlannedService};
use crate::container::definition::{Argument, ServiceId};
use crate::container::error::{ContainerError, ContainerResult};
use crate::container::registry::Registry;
use log::{error, info};
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Constructed services keyed by id.
#[derive(Debug, Default)]
pub struct Container {
    services: BTreeMap<ServiceId, SharedInstance>,
    order: Vec<ServiceId>,
}

impl Container {
    /// Compiles `registry` and builds every service it defines.
    pub fn build(registry: Registry, catalog: &FactoryCatalog) -> ContainerResult<Self> {
        Self::instantiate(ConstructionPlan::compile(registry)?, catalog)
    }

    /// Compiles `registry` and builds `roots` with their dependencies only.
    pub fn build_for(
        registry: Registry,
        catalog: &FactoryCatalog,
        roots: &[&str],
    ) -> ContainerResult<Self> {
        Self::instantiate(ConstructionPlan::compile_for(registry, roots)?, catalog)
    }

    /// Builds every planned service in plan order.
    ///
    /// # Side effects
    /// - Emits `container_build` logging events with duration and status.
    pub fn instantiate(plan: ConstructionPlan, catalog: &FactoryCatalog) -> ContainerResult<Self> {
        let started_at = Instant::now();
        let mut container = Self::default();

        for service in plan.into_services() {
            if let Err(err) = container.construct(service, catalog) {
                error!(
                    "event=container_build module=container status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        }

        info!(
            "event=container_build module=container status=ok services={} duration_ms={}",
            container.len(),
            started_at.elapsed().as_millis()
        );
        Ok(container)
    }

    /// Returns the instance for `id` as `T`.
    ///
    /// # Errors
    /// - `UnknownService` when `id` was not built.
    /// - `InstanceType` when the instance is not a `T`.
    pub fn get<T: Any + Send + Sync>(&self, id: &str) -> ContainerResult<Arc<T>> {
        let instance = self
            .services
            .get(id)
            .ok_or_else(|| ContainerError::UnknownService(id.into()))?;
        Arc::clone(instance)
            .downcast::<T>()
            .map_err(|_| ContainerError::InstanceType {
                service: id.into(),
                expected: type_name::<T>(),
            })
    }

    pub fn has(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    /// Built ids in construction order.
    pub fn ids(&self) -> &[ServiceId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    fn construct(&mut self, service: PlannedService, catalog: &FactoryCatalog) -> ContainerResult<()> {
        let factory =
            catalog
                .get(&service.factory)
                .ok_or_else(|| ContainerError::UnknownFactory {
                    service: service.id.clone(),
                    factory: service.factory.clone(),
                })?;

        let arguments = self.resolve(&service.id, &service.arguments)?;
        let mut instance = factory.create(&arguments)?;
        for call in &service.method_calls {
            let arguments = self.resolve(&service.id, call.arguments())?;
            factory.call(&mut instance, call.method(), &arguments)?;
        }

        self.order.push(service.id.clone());
        self.services.insert(service.id, Arc::from(instance));
        Ok(())
    }

    fn resolve(&self, service: &ServiceId, arguments: &[Argument]) -> ContainerResult<Arguments> {
        let values = arguments
            .iter()
            .map(|argument| match argument {
                Argument::Value(value) => Ok(ResolvedArgument::Value(value.clone())),
                Argument::Reference(reference) => self
                    .services
                    .get(reference.id())
                    .cloned()
                    .map(ResolvedArgument::Service)
                    .ok_or_else(|| ContainerError::MissingReference {
                        service: service.clone(),
                        reference: reference.id().clone(),
                    }),
            })
            .collect::<ContainerResult<Vec<_>>>()?;
        Ok(Arguments::new(service.clone(), values))
    }
}
