//! Extension point identifiers shared between independently shipped modules.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Tag name for definition search engines consulted by the definition finder.
pub const EXTENSION_POINT_SEARCH_ENGINE: &str = "definition.search_engine";
/// Tag name for exception stringers consulted by the exception presenter.
pub const EXTENSION_POINT_EXCEPTION_STRINGER: &str = "exception.stringer";
/// Tag name for CLI controllers.
pub const EXTENSION_POINT_CLI_CONTROLLER: &str = "cli.controller";
/// Tag name for context annotation readers.
pub const EXTENSION_POINT_ANNOTATION_READER: &str = "context.annotation_reader";

static EXTENSION_POINT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)+$").expect("valid extension point regex")
});

/// Named extension point that contributors tag their services with.
///
/// Built-in points are plain variants. Third-party modules get a `Custom`
/// point through [`ExtensionPoint::custom`], which validates the name and maps
/// built-in names back onto their variant so every module agrees on one key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtensionPoint {
    SearchEngine,
    ExceptionStringer,
    CliController,
    AnnotationReader,
    Custom(CustomPoint),
}

/// Name of a third-party extension point.
///
/// Only [`ExtensionPoint::custom`] creates one, so a `Custom` point never
/// carries a built-in name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomPoint(String);

impl CustomPoint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const BUILTIN_EXTENSION_POINTS: &[ExtensionPoint] = &[
    ExtensionPoint::SearchEngine,
    ExtensionPoint::ExceptionStringer,
    ExtensionPoint::CliController,
    ExtensionPoint::AnnotationReader,
];

/// Returns every built-in extension point.
pub fn builtin_extension_points() -> &'static [ExtensionPoint] {
    BUILTIN_EXTENSION_POINTS
}

impl ExtensionPoint {
    /// Registers a third-party extension point by name.
    ///
    /// # Errors
    /// - `Empty` when the trimmed name is empty.
    /// - `InvalidName` unless the name is dot-namespaced lowercase
    ///   (`vendor.point_name`).
    pub fn custom(name: &str) -> Result<Self, ExtensionPointError> {
        let normalized = name.trim();
        if normalized.is_empty() {
            return Err(ExtensionPointError::Empty);
        }

        match normalized {
            EXTENSION_POINT_SEARCH_ENGINE => Ok(Self::SearchEngine),
            EXTENSION_POINT_EXCEPTION_STRINGER => Ok(Self::ExceptionStringer),
            EXTENSION_POINT_CLI_CONTROLLER => Ok(Self::CliController),
            EXTENSION_POINT_ANNOTATION_READER => Ok(Self::AnnotationReader),
            other if EXTENSION_POINT_NAME_RE.is_match(other) => {
                Ok(Self::Custom(CustomPoint(other.to_string())))
            }
            other => Err(ExtensionPointError::InvalidName(other.to_string())),
        }
    }

    /// Stable tag name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::SearchEngine => EXTENSION_POINT_SEARCH_ENGINE,
            Self::ExceptionStringer => EXTENSION_POINT_EXCEPTION_STRINGER,
            Self::CliController => EXTENSION_POINT_CLI_CONTROLLER,
            Self::AnnotationReader => EXTENSION_POINT_ANNOTATION_READER,
            Self::Custom(name) => name.as_str(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }

    /// Short description for diagnostics output.
    pub fn description(&self) -> &'static str {
        match self {
            Self::SearchEngine => "Search engines tried in order until one finds a step definition.",
            Self::ExceptionStringer => {
                "Stringers tried in order until one is capable of rendering an error."
            }
            Self::CliController => "Controllers configuring and handling the command line.",
            Self::AnnotationReader => "Readers turning context method annotations into callees.",
            Self::Custom(_) => "Extension point registered by a third-party module.",
        }
    }
}

impl Display for ExtensionPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ExtensionPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Extension point registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionPointError {
    Empty,
    InvalidName(String),
}

impl Display for ExtensionPointError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "extension point name must not be empty"),
            Self::InvalidName(value) => write!(
                f,
                "extension point name is invalid: {value} (expected namespace.name)"
            ),
        }
    }
}

impl Error for ExtensionPointError {}
