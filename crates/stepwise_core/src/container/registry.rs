//! Composition-time service registry.
//!
//! # Responsibility
//! - Hold every service definition declared by extension modules.
//! - Hold named parameters used by `%placeholder%` arguments.
//!
//! # Invariants
//! - Service ids are unique; redefining an id replaces its entry in place and
//!   keeps the original registration position.
//! - Iteration is always in registration order.
//! - The registry lives only for one composition pipeline; it is consumed by
//!   compilation.

use crate::container::definition::{Argument, Definition, MethodCall, ServiceId};
use crate::container::error::{ContainerError, ContainerResult};
use crate::container::extension_point::ExtensionPoint;
use log::debug;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
struct Slot {
    id: ServiceId,
    definition: Definition,
}

/// Arena of service definitions keyed by id.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    slots: Vec<Option<Slot>>,
    index: BTreeMap<ServiceId, usize>,
    parameters: BTreeMap<String, Value>,
    extension_points: BTreeSet<ExtensionPoint>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the definition for `id`.
    ///
    /// Replacement is the documented override mechanism and is not reported
    /// as a warning.
    pub fn define(&mut self, id: impl Into<ServiceId>, definition: Definition) -> &mut Definition {
        let id = id.into();
        let position = match self.index.get(&id).copied() {
            Some(position) => {
                debug!("event=service_redefine module=container status=ok id={id}");
                position
            }
            None => {
                let position = self.slots.len();
                self.slots.push(None);
                self.index.insert(id.clone(), position);
                position
            }
        };

        &mut self.slots[position].insert(Slot { id, definition }).definition
    }

    /// Removes one definition, returning it when present.
    pub fn remove(&mut self, id: &str) -> Option<Definition> {
        let position = self.index.remove(id)?;
        let slot = self.slots.get_mut(position)?.take()?;
        debug!("event=service_remove module=container status=ok id={id}");
        Some(slot.definition)
    }

    pub fn has(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the definition for `id`.
    ///
    /// # Errors
    /// - `UnknownService` when `id` was never defined.
    pub fn get(&self, id: &str) -> ContainerResult<&Definition> {
        self.position(id)
            .and_then(|position| self.slots[position].as_ref())
            .map(|slot| &slot.definition)
            .ok_or_else(|| ContainerError::UnknownService(id.into()))
    }

    /// Returns the definition for `id` for further mutation.
    ///
    /// # Errors
    /// - `UnknownService` when `id` was never defined.
    pub fn get_mut(&mut self, id: &str) -> ContainerResult<&mut Definition> {
        match self.position(id) {
            Some(position) => self.slots[position]
                .as_mut()
                .map(|slot| &mut slot.definition)
                .ok_or_else(|| ContainerError::UnknownService(id.into())),
            None => Err(ContainerError::UnknownService(id.into())),
        }
    }

    /// Appends a post-construction method call to an existing definition.
    ///
    /// # Errors
    /// - `UnknownService` when `id` was never defined.
    pub fn add_method_call(
        &mut self,
        id: &str,
        method: impl Into<String>,
        arguments: Vec<Argument>,
    ) -> ContainerResult<()> {
        self.get_mut(id)?.add_method_call(method, arguments);
        Ok(())
    }

    /// Method calls recorded for `id`, in append order.
    pub fn method_calls(&self, id: &str) -> ContainerResult<&[MethodCall]> {
        Ok(self.get(id)?.method_calls())
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = (&ServiceId, &Definition)> {
        self.slots
            .iter()
            .flatten()
            .map(|slot| (&slot.id, &slot.definition))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.parameters.insert(name.into(), value.into());
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }

    /// Records that some module owns `point`, so it shows up in the tag index
    /// even without contributors. Returns `false` when already declared.
    pub fn declare_extension_point(&mut self, point: ExtensionPoint) -> bool {
        self.extension_points.insert(point)
    }

    pub fn extension_points(&self) -> impl Iterator<Item = &ExtensionPoint> {
        self.extension_points.iter()
    }

    /// Splits the registry into ordered entries and parameters.
    pub(crate) fn into_parts(self) -> (Vec<(ServiceId, Definition)>, BTreeMap<String, Value>) {
        let entries = self
            .slots
            .into_iter()
            .flatten()
            .map(|slot| (slot.id, slot.definition))
            .collect();
        (entries, self.parameters)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }
}
