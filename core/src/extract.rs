/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the tmpljs template compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * 1. OPEN SOURCE: You may use this file under the terms of the GNU Affero
 * General Public License v3.0. If you link to this code, your ENTIRE
 * application must be open-sourced under AGPLv3.
 *
 * 2. COMMERCIAL: For proprietary use, you must obtain a Commercial License
 * from Sovereign Systems.
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

//! Type descriptor extraction.
//!
//! The compiler never introspects host types directly. Callers describe the
//! data a template renders against as a `DataShape` (hand-built, loaded from
//! JSON, or produced through the `Describe` trait) and `extract` turns it
//! into the `Type` the checker works with.

use crate::types::{FunctionType, ObjectType, Type};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("unsupported shape at {path}: {reason}")]
    UnsupportedShape { path: String, reason: String },
    #[error("{path} returns {count} values; at most one is supported")]
    MultipleReturns { path: String, count: usize },
}

/// Host-side description of a data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataShape {
    Bool,
    Int,
    Uint,
    Float,
    String,
    /// Followed transparently; `null` at run time is the caller's concern.
    Pointer { target: Box<DataShape> },
    Sequence { element: Box<DataShape> },
    Record {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        fields: Vec<FieldShape>,
        #[serde(default)]
        methods: Vec<MethodShape>,
    },
    Function(Signature),
    Map {
        key: Box<DataShape>,
        value: Box<DataShape>,
    },
    /// A dynamically typed value.
    Any,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldShape {
    pub name: String,
    pub shape: DataShape,
    /// Serialization annotation, e.g. `name,omitempty`. Only the part before
    /// the first comma matters; `-` means the field is never serialized.
    #[serde(default)]
    pub rename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodShape {
    pub name: String,
    pub signature: Signature,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// When set, `params[0]` is the implicit receiver and is dropped.
    #[serde(default)]
    pub receiver: bool,
    #[serde(default)]
    pub params: Vec<DataShape>,
    #[serde(default)]
    pub results: Vec<DataShape>,
}

impl FieldShape {
    pub fn new(name: impl Into<String>, shape: DataShape) -> Self {
        FieldShape {
            name: name.into(),
            shape,
            rename: None,
        }
    }

    pub fn renamed(name: impl Into<String>, shape: DataShape, rename: impl Into<String>) -> Self {
        FieldShape {
            rename: Some(rename.into()),
            ..FieldShape::new(name, shape)
        }
    }

    /// `None` when the field is not serialized at all.
    fn external_name(&self) -> Option<&str> {
        let annotation = match &self.rename {
            Some(annotation) => annotation,
            None => return Some(&self.name),
        };
        let label = annotation.split(',').next().unwrap_or("");
        match label {
            "-" => None,
            "" => Some(&self.name),
            label => Some(label),
        }
    }
}

impl DataShape {
    pub fn pointer(target: DataShape) -> Self {
        DataShape::Pointer {
            target: Box::new(target),
        }
    }

    pub fn sequence(element: DataShape) -> Self {
        DataShape::Sequence {
            element: Box::new(element),
        }
    }

    pub fn record(fields: Vec<FieldShape>) -> Self {
        DataShape::Record {
            name: None,
            fields,
            methods: Vec::new(),
        }
    }
}

/// Converts a data shape into a type descriptor.
pub fn extract(shape: &DataShape) -> Result<Type, ExtractError> {
    extract_at(shape, "$")
}

/// Converts a function signature, e.g. a function-map entry.
pub fn extract_signature(signature: &Signature, name: &str) -> Result<FunctionType, ExtractError> {
    let params = if signature.receiver {
        signature.params.get(1..).unwrap_or(&[])
    } else {
        &signature.params[..]
    };

    let args = params
        .iter()
        .enumerate()
        .map(|(i, param)| extract_at(param, &format!("{}#{}", name, i)))
        .collect::<Result<Vec<_>, _>>()?;

    let ret = match signature.results.as_slice() {
        [] => None,
        [single] => Some(Box::new(extract_at(single, &format!("{}#ret", name))?)),
        many => {
            return Err(ExtractError::MultipleReturns {
                path: name.to_string(),
                count: many.len(),
            })
        }
    };

    Ok(FunctionType { args, ret })
}

fn extract_at(shape: &DataShape, path: &str) -> Result<Type, ExtractError> {
    match shape {
        DataShape::Bool => Ok(Type::Boolean),
        DataShape::Int | DataShape::Uint | DataShape::Float => Ok(Type::Number),
        DataShape::String => Ok(Type::String),
        DataShape::Pointer { target } => extract_at(target, path),
        DataShape::Sequence { element } => {
            Ok(Type::array(extract_at(element, &format!("{}[]", path))?))
        }
        DataShape::Record {
            fields, methods, ..
        } => {
            let mut object = ObjectType::default();
            for field in fields {
                let external = match field.external_name() {
                    Some(external) => external,
                    None => continue,
                };
                let ty = extract_at(&field.shape, &format!("{}.{}", path, field.name))?;
                object.fields.insert(field.name.clone(), ty);
                if external != field.name {
                    object
                        .labels
                        .insert(field.name.clone(), external.to_string());
                }
            }
            for method in methods {
                let ty = extract_signature(&method.signature, &format!("{}.{}", path, method.name))?;
                object
                    .fields
                    .insert(method.name.clone(), Type::Function(ty));
            }
            Ok(Type::Object(object))
        }
        DataShape::Function(signature) => Ok(Type::Function(extract_signature(signature, path)?)),
        DataShape::Map { .. } => Err(ExtractError::UnsupportedShape {
            path: path.to_string(),
            reason: "maps have no static field set".to_string(),
        }),
        DataShape::Any => Err(ExtractError::UnsupportedShape {
            path: path.to_string(),
            reason: "dynamically typed values cannot be checked".to_string(),
        }),
    }
}

// ─── Host types ──────────────────────────────────────────────────────────────

/// Rust types that can describe their own data shape.
///
/// Implemented for scalars and the standard containers; structs implement it
/// by listing their serialized fields.
pub trait Describe {
    fn describe() -> DataShape;
}

/// Extracts the type descriptor of a host type.
pub fn describe_type<T: Describe + ?Sized>() -> Result<Type, ExtractError> {
    extract(&T::describe())
}

macro_rules! describe_scalar {
    ($shape:expr => $($ty:ty),+) => {
        $(
            impl Describe for $ty {
                fn describe() -> DataShape {
                    $shape
                }
            }
        )+
    };
}

describe_scalar!(DataShape::Bool => bool);
describe_scalar!(DataShape::Int => i8, i16, i32, i64, i128, isize);
describe_scalar!(DataShape::Uint => u8, u16, u32, u64, u128, usize);
describe_scalar!(DataShape::Float => f32, f64);
describe_scalar!(DataShape::String => String, str, char);

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> DataShape {
        DataShape::sequence(T::describe())
    }
}

impl<T: Describe> Describe for [T] {
    fn describe() -> DataShape {
        DataShape::sequence(T::describe())
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> DataShape {
        DataShape::sequence(T::describe())
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> DataShape {
        DataShape::pointer(T::describe())
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe() -> DataShape {
        DataShape::pointer(T::describe())
    }
}

impl<T: Describe + ?Sized> Describe for &T {
    fn describe() -> DataShape {
        T::describe()
    }
}
