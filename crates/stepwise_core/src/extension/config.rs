//! Extension configuration declaration and validation.
//!
//! # Invariants
//! - Every option an extension reads was declared in its schema.
//! - Missing options take their declared defaults.
//! - Unknown options and type mismatches are rejected, never ignored.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Accepted JSON shape of one option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Boolean,
    Integer,
    String,
    List,
    Map,
    Any,
}

impl OptionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::String => "string",
            Self::List => "list",
            Self::Map => "map",
            Self::Any => "any",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Boolean => value.is_boolean(),
            Self::Integer => value.is_i64(),
            Self::String => value.is_string(),
            Self::List => value.is_array(),
            Self::Map => value.is_object(),
            Self::Any => true,
        }
    }
}

/// One declared option.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub kind: OptionKind,
    pub default: Value,
}

/// Options an extension accepts, filled in during `configure`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSchema {
    options: BTreeMap<String, OptionSpec>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares one option with its kind and default.
    pub fn option(
        &mut self,
        name: impl Into<String>,
        kind: OptionKind,
        default: impl Into<Value>,
    ) -> &mut Self {
        self.options.insert(
            name.into(),
            OptionSpec {
                kind,
                default: default.into(),
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.options.get(name)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Validates one raw config section and fills defaults.
    ///
    /// `None` and `null` both mean "use every default".
    ///
    /// # Errors
    /// - `NotAMapping` when the section is neither `null` nor an object.
    /// - `UnrecognizedOption` for keys the schema does not declare.
    /// - `InvalidType` when a value does not match its declared kind.
    pub fn resolve(&self, raw: Option<&Value>) -> Result<ExtensionConfig, ConfigError> {
        let empty = Map::new();
        let provided = match raw {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(map)) => map,
            Some(_) => return Err(ConfigError::NotAMapping),
        };

        if let Some(unknown) = provided.keys().find(|key| !self.options.contains_key(*key)) {
            return Err(ConfigError::UnrecognizedOption(unknown.clone()));
        }

        let mut values = BTreeMap::new();
        for (name, spec) in &self.options {
            let value = match provided.get(name) {
                Some(value) if spec.kind.accepts(value) => value.clone(),
                Some(_) => {
                    return Err(ConfigError::InvalidType {
                        option: name.clone(),
                        expected: spec.kind,
                    })
                }
                None => spec.default.clone(),
            };
            values.insert(name.clone(), value);
        }
        Ok(ExtensionConfig { values })
    }
}

/// Resolved configuration handed to `load`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionConfig {
    values: BTreeMap<String, Value>,
}

impl ExtensionConfig {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Config section validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    NotAMapping,
    UnrecognizedOption(String),
    InvalidType { option: String, expected: OptionKind },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAMapping => write!(f, "config section must be a mapping"),
            Self::UnrecognizedOption(name) => write!(f, "unrecognized option: {name}"),
            Self::InvalidType { option, expected } => {
                write!(f, "option `{option}` must be {}", expected.as_str())
            }
        }
    }
}

impl Error for ConfigError {}
