//! Container errors shared by registry, compilation and instantiation.

use crate::container::definition::ServiceId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ContainerResult<T> = Result<T, ContainerError>;

/// Registry and construction errors.
///
/// Every variant is a module authoring defect surfaced at startup; none is
/// meant to be recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    UnknownService(ServiceId),
    UnknownParameter {
        service: ServiceId,
        parameter: String,
    },
    MissingReference {
        service: ServiceId,
        reference: ServiceId,
    },
    CircularReference(Vec<ServiceId>),
    UnknownFactory {
        service: ServiceId,
        factory: String,
    },
    ArgumentMismatch {
        service: ServiceId,
        index: usize,
        expected: &'static str,
    },
    UnsupportedMethodCall {
        service: ServiceId,
        method: String,
    },
    InstanceType {
        service: ServiceId,
        expected: &'static str,
    },
}

impl Display for ContainerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownService(id) => write!(f, "service is not defined: {id}"),
            Self::UnknownParameter { service, parameter } => write!(
                f,
                "service `{service}` uses undefined parameter: %{parameter}%"
            ),
            Self::MissingReference { service, reference } => write!(
                f,
                "service `{service}` references undefined service: {reference}"
            ),
            Self::CircularReference(ids) => {
                let joined = ids
                    .iter()
                    .map(ServiceId::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "circular reference between services: {joined}")
            }
            Self::UnknownFactory { service, factory } => {
                write!(f, "service `{service}` uses unregistered factory: {factory}")
            }
            Self::ArgumentMismatch {
                service,
                index,
                expected,
            } => write!(
                f,
                "service `{service}` argument {index} is not {expected}"
            ),
            Self::UnsupportedMethodCall { service, method } => {
                write!(f, "service `{service}` does not support method call: {method}")
            }
            Self::InstanceType { service, expected } => {
                write!(f, "service `{service}` is not an instance of {expected}")
            }
        }
    }
}

impl Error for ContainerError {}
