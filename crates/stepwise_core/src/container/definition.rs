//! Service entries held by the registry.
//!
//! # Responsibility
//! - Describe how one service is constructed without constructing it.
//! - Carry extension point tags and post-construction method calls.
//!
//! # Invariants
//! - References are names only; nothing is resolved while a definition is
//!   being declared.
//! - Method calls keep declaration order.

use crate::container::extension_point::ExtensionPoint;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt::{Display, Formatter};

/// Priority used when a tag is added without one.
pub const DEFAULT_PRIORITY: i32 = 0;

/// Stable service identifier, e.g. `definition.finder`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ServiceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ServiceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&ServiceId> for ServiceId {
    fn from(value: &ServiceId) -> Self {
        value.clone()
    }
}

impl Borrow<str> for ServiceId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for ServiceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// What happens when a referenced service is not defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnMissing {
    /// Construction fails with `MissingReference`.
    Fail,
    /// The argument becomes `null`; a method call carrying it is dropped.
    Ignore,
}

/// Named reference to another service, resolved at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    id: ServiceId,
    on_missing: OnMissing,
}

impl Reference {
    pub fn new(id: impl Into<ServiceId>) -> Self {
        Self {
            id: id.into(),
            on_missing: OnMissing::Fail,
        }
    }

    /// Reference to a service owned by a module that may not be installed.
    pub fn optional(id: impl Into<ServiceId>) -> Self {
        Self {
            id: id.into(),
            on_missing: OnMissing::Ignore,
        }
    }

    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    pub fn on_missing(&self) -> OnMissing {
        self.on_missing
    }

    pub fn is_optional(&self) -> bool {
        self.on_missing == OnMissing::Ignore
    }
}

/// One constructor or method-call argument.
///
/// String literals may embed `%parameter.name%` placeholders; they are
/// resolved when the registry is compiled, not before.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Argument {
    Value(Value),
    Reference(Reference),
}

impl Argument {
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Reference(reference) => Some(reference),
            Self::Value(_) => None,
        }
    }
}

impl From<Reference> for Argument {
    fn from(value: Reference) -> Self {
        Self::Reference(value)
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

/// Extension point membership of one definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagBinding {
    pub point: ExtensionPoint,
    pub priority: i32,
}

/// Method invoked on the constructed instance before it is shared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodCall {
    method: String,
    arguments: Vec<Argument>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    pub fn method(&self) -> &str {
        self.method.as_str()
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub(crate) fn references(&self) -> impl Iterator<Item = &Reference> {
        self.arguments.iter().filter_map(Argument::as_reference)
    }
}

/// Deferred construction recipe for one service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    factory: String,
    arguments: Vec<Argument>,
    tags: Vec<TagBinding>,
    method_calls: Vec<MethodCall>,
}

impl Definition {
    /// Creates a recipe built by the factory registered under `factory`.
    pub fn new(factory: impl Into<String>) -> Self {
        Self {
            factory: factory.into(),
            arguments: Vec::new(),
            tags: Vec::new(),
            method_calls: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: impl Into<Argument>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn with_tag(mut self, point: ExtensionPoint, priority: i32) -> Self {
        self.add_tag(point, priority);
        self
    }

    /// Tags with [`DEFAULT_PRIORITY`].
    pub fn tagged(self, point: ExtensionPoint) -> Self {
        self.with_tag(point, DEFAULT_PRIORITY)
    }

    pub fn add_tag(&mut self, point: ExtensionPoint, priority: i32) {
        self.tags.push(TagBinding { point, priority });
    }

    pub fn add_method_call(&mut self, method: impl Into<String>, arguments: Vec<Argument>) {
        self.method_calls.push(MethodCall::new(method, arguments));
    }

    /// Replaces argument `index`, appending when the list is shorter.
    pub fn set_argument(&mut self, index: usize, argument: impl Into<Argument>) {
        let argument = argument.into();
        match self.arguments.get_mut(index) {
            Some(slot) => *slot = argument,
            None => self.arguments.push(argument),
        }
    }

    pub fn factory(&self) -> &str {
        self.factory.as_str()
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn tags(&self) -> &[TagBinding] {
        &self.tags
    }

    pub fn method_calls(&self) -> &[MethodCall] {
        &self.method_calls
    }

    /// Priority of the first binding for `point`, if tagged with it.
    pub fn priority_for(&self, point: &ExtensionPoint) -> Option<i32> {
        self.tags
            .iter()
            .find(|binding| &binding.point == point)
            .map(|binding| binding.priority)
    }

    /// Removes and returns every tag binding.
    pub(crate) fn take_tags(&mut self) -> Vec<TagBinding> {
        std::mem::take(&mut self.tags)
    }

    /// Every reference in constructor and method-call arguments.
    pub(crate) fn references(&self) -> impl Iterator<Item = &Reference> {
        self.arguments
            .iter()
            .filter_map(Argument::as_reference)
            .chain(self.method_calls.iter().flat_map(MethodCall::references))
    }
}
