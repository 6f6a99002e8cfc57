//! Helpers extension modules use during their `process` phase.

use crate::container::definition::{Reference, ServiceId};
use crate::container::error::{ContainerError, ContainerResult};
use crate::container::extension_point::ExtensionPoint;
use crate::container::registry::Registry;
use log::debug;

/// Resolves tagged contributors into references ready to be wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceProcessor;

impl ServiceProcessor {
    pub fn new() -> Self {
        Self
    }

    /// References to every service tagged with `point`, highest priority first.
    pub fn find_and_sort_tagged_services(
        &self,
        registry: &Registry,
        point: &ExtensionPoint,
    ) -> Vec<Reference> {
        registry
            .sorted_by_priority(point)
            .into_iter()
            .map(Reference::new)
            .collect()
    }

    /// Appends one `method` call per tagged contributor to `consumer`, in
    /// priority order. Returns the number of calls appended.
    ///
    /// # Errors
    /// - `UnknownService` when `consumer` is not defined.
    pub fn wire_tagged_services(
        &self,
        registry: &mut Registry,
        point: &ExtensionPoint,
        consumer: &str,
        method: &str,
    ) -> ContainerResult<usize> {
        let references = self.find_and_sort_tagged_services(registry, point);
        let consumer_definition = registry.get_mut(consumer)?;
        for reference in &references {
            consumer_definition.add_method_call(method, vec![reference.clone().into()]);
        }

        debug!(
            "event=chain_wire module=container status=ok point={} consumer={} handlers={}",
            point,
            consumer,
            references.len()
        );
        Ok(references.len())
    }

    /// Decorates `target` with every service tagged `wrapper_point`.
    ///
    /// Wrappers are applied highest priority first, so the highest priority
    /// wrapper ends up closest to the original service. For each wrapper the
    /// current `target` definition moves to `<wrapper>.inner`, the wrapper's
    /// first argument becomes a reference to it, and the wrapper takes over
    /// the `target` id. Tags stay with the `target` id: the wrapper drops its
    /// own bindings and inherits the target's, and the inner entry keeps none.
    /// Nothing happens when `target` is not defined.
    pub fn process_wrapper_services(
        &self,
        registry: &mut Registry,
        target: &str,
        wrapper_point: &ExtensionPoint,
    ) -> ContainerResult<()> {
        if !registry.has(target) {
            debug!(
                "event=wrap_services module=container status=skipped target={target} reason=undefined"
            );
            return Ok(());
        }

        for wrapper_id in registry.sorted_by_priority(wrapper_point) {
            if wrapper_id.as_str() == target {
                continue;
            }

            let inner_id = ServiceId::new(format!("{wrapper_id}.inner"));
            let mut wrapped = registry
                .remove(target)
                .ok_or_else(|| ContainerError::UnknownService(target.into()))?;
            let target_tags = wrapped.take_tags();
            registry.define(inner_id.clone(), wrapped);

            let mut wrapper = registry
                .remove(wrapper_id.as_str())
                .ok_or_else(|| ContainerError::UnknownService(wrapper_id.clone()))?;
            wrapper.take_tags();
            for binding in target_tags {
                wrapper.add_tag(binding.point, binding.priority);
            }
            wrapper.set_argument(0, Reference::new(inner_id));
            registry.define(target, wrapper);

            debug!(
                "event=wrap_services module=container status=ok target={target} wrapper={wrapper_id}"
            );
        }
        Ok(())
    }
}
