//! # Message Payloads
//!
//! Payload objects carried inside routed messages.
//!
//! ## Design Rules
//!
//! - Payloads are immutable once constructed and sent exactly once.
//! - Naming legality is checked by the sender before construction; these
//!   types do not re-validate.
//! - Application data travels as opaque JSON: the control plane never
//!   interprets message contents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::NameError;

// =============================================================================
// EXECUTION ENVIRONMENT COMPONENTS
// =============================================================================

/// Descriptor of a node launched inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Client-chosen tag used in subsequent removal requests.
    pub tag: String,
    /// Package containing the executable.
    pub package: String,
    /// Executable to launch.
    pub executable: String,
    /// Extra launch arguments (`$(find PKG)` / `$(env VAR)` only).
    #[serde(default)]
    pub args: String,
    /// Node name override; empty means the executable's default.
    #[serde(default)]
    pub name: String,
    /// Namespace the node is launched in.
    #[serde(default)]
    pub namespace: String,
}

/// Explicit parameter type requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// Integer parameter.
    Int,
    /// String parameter.
    Str,
    /// Floating point parameter.
    Float,
    /// Boolean parameter.
    Bool,
    /// File parameter; the value is a path whose contents are loaded remotely.
    File,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Int => "int",
            Self::Str => "str",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::File => "file",
        };
        f.write_str(s)
    }
}

impl FromStr for ParameterKind {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(Self::Int),
            "str" => Ok(Self::Str),
            "float" => Ok(Self::Float),
            "bool" => Ok(Self::Bool),
            "file" => Ok(Self::File),
            other => Err(NameError::UnsupportedParameter {
                name: String::new(),
                reason: format!("unknown parameter type '{other}'"),
            }),
        }
    }
}

/// Typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ParameterValue {
    /// Integer value.
    Int(i64),
    /// String value.
    Str(String),
    /// Floating point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// Path of a file to load.
    File(String),
}

impl ParameterValue {
    /// Kind of this value.
    pub fn kind(&self) -> ParameterKind {
        match self {
            Self::Int(_) => ParameterKind::Int,
            Self::Str(_) => ParameterKind::Str,
            Self::Float(_) => ParameterKind::Float,
            Self::Bool(_) => ParameterKind::Bool,
            Self::File(_) => ParameterKind::File,
        }
    }

    /// Build a value from client JSON.
    ///
    /// Without an explicit kind the variant is inferred from the JSON type.
    /// `file` is never inferred. Arrays, objects and null are rejected.
    pub fn from_json(
        name: &str,
        value: &serde_json::Value,
        kind: Option<ParameterKind>,
    ) -> Result<Self, NameError> {
        use serde_json::Value;

        let unsupported = |reason: &str| NameError::UnsupportedParameter {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        match (kind, value) {
            (None, Value::Bool(b)) | (Some(ParameterKind::Bool), Value::Bool(b)) => {
                Ok(Self::Bool(*b))
            }
            (None, Value::String(s)) | (Some(ParameterKind::Str), Value::String(s)) => {
                Ok(Self::Str(s.clone()))
            }
            (Some(ParameterKind::File), Value::String(s)) => Ok(Self::File(s.clone())),
            (None, Value::Number(n)) => match n.as_i64() {
                Some(i) => Ok(Self::Int(i)),
                None => n
                    .as_f64()
                    .map(Self::Float)
                    .ok_or_else(|| unsupported("number out of range")),
            },
            (Some(ParameterKind::Int), Value::Number(n)) => n
                .as_i64()
                .map(Self::Int)
                .ok_or_else(|| unsupported("expected an integer")),
            (Some(ParameterKind::Float), Value::Number(n)) => n
                .as_f64()
                .map(Self::Float)
                .ok_or_else(|| unsupported("expected a float")),
            (_, Value::Array(_)) => Err(unsupported("lists are not supported")),
            (_, Value::Object(_)) => Err(unsupported("objects are not supported")),
            (_, Value::Null) => Err(unsupported("a value is required")),
            (Some(kind), _) => Err(unsupported(&format!("value does not match type '{kind}'"))),
        }
    }
}

/// Named parameter stored in a container's parameter server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Hierarchical parameter name.
    pub name: String,
    /// Typed value.
    pub value: ParameterValue,
}

/// Component type targeted by a removal instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalKind {
    /// Remove a node by tag.
    Node,
    /// Remove a parameter by name.
    Parameter,
}

// =============================================================================
// APPLICATION DATA
// =============================================================================

/// Application message flowing through an interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMessage {
    /// Tag of the interface the message is addressed to or comes from.
    pub interface_tag: String,
    /// Client-chosen message identifier, echoed in replies.
    #[serde(default)]
    pub msg_id: String,
    /// Message type descriptor, `package/Name`.
    pub type_name: String,
    /// Opaque payload.
    pub payload: serde_json::Value,
}

impl InterfaceMessage {
    /// Copy of this message readdressed to another interface.
    pub fn readdressed(&self, interface_tag: &str) -> Self {
        Self {
            interface_tag: interface_tag.to_string(),
            ..self.clone()
        }
    }
}
