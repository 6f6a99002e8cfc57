//! Tagged-service registry and construction container.
//!
//! # Responsibility
//! - Collect service definitions and extension point tags from modules.
//! - Resolve tag contributors in deterministic priority order.
//! - Compile definitions into a dependency-ordered plan and build it.
//!
//! # Invariants
//! - The registry is an explicit value passed by `&mut` through the
//!   composition pipeline; it is never a process-wide singleton.
//! - References resolve only at construction time.

pub mod catalog;
pub mod compiler;
pub mod definition;
pub mod error;
pub mod extension_point;
pub mod processor;
pub mod registry;
pub mod services;
pub mod tag_index;

/// Parameter holding the project base path.
pub const PATHS_BASE_PARAMETER: &str = "paths.base";

pub use catalog::{
    downcast_instance, Arguments, FactoryCatalog, Instance, ResolvedArgument, ServiceFactory,
    SharedInstance,
};
pub use compiler::{ConstructionPlan, PlannedService};
pub use definition::{
    Argument, Definition, MethodCall, OnMissing, Reference, ServiceId, TagBinding,
    DEFAULT_PRIORITY,
};
pub use error::{ContainerError, ContainerResult};
pub use extension_point::{
    builtin_extension_points, CustomPoint, ExtensionPoint, ExtensionPointError,
};
pub use processor::ServiceProcessor;
pub use registry::Registry;
pub use services::Container;
pub use tag_index::{TagIndex, TaggedService};
