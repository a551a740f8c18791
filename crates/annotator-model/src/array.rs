//! Array payloads attached to variables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Element width of a written array. Values are always held as `f64`;
/// the element type only governs how the writer stores them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    #[default]
    Float64,
}

impl ElementType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parsed = match raw.trim().to_lowercase().as_str() {
            "int8" | "byte" => Self::Int8,
            "int16" | "short" => Self::Int16,
            "int32" | "int" => Self::Int32,
            "int64" => Self::Int64,
            "uint8" | "ubyte" => Self::Uint8,
            "uint16" | "ushort" => Self::Uint16,
            "uint32" | "uint" => Self::Uint32,
            "uint64" => Self::Uint64,
            "float32" | "float" => Self::Float32,
            "float64" | "double" => Self::Float64,
            _ => {
                return Err(ModelError::UnknownElementType {
                    name: raw.to_string(),
                });
            }
        };
        Ok(parsed)
    }
}

/// Values of a one-dimensional variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayData {
    #[serde(rename = "type", default)]
    pub element_type: ElementType,
    pub values: Vec<f64>,
}

impl ArrayData {
    pub fn new(element_type: ElementType, values: Vec<f64>) -> Self {
        Self {
            element_type,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }
}
