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

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Static shape of a value the generated JavaScript will see at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Type {
    Boolean,
    Number,
    String,
    Object(ObjectType),
    Array { element: Box<Type> },
    Function(FunctionType),
}

/// A record with fixed properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectType {
    pub fields: BTreeMap<String, Type>,
    /// Serialization renames: internal field name -> property name in the data.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// A callable. `ret` is `None` for functions returning nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionType {
    pub args: Vec<Type>,
    #[serde(default)]
    pub ret: Option<Box<Type>>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("undefined variable {name} (candidates: {})", .candidates.join(", "))]
    UndefinedVariable {
        name: String,
        candidates: Vec<String>,
    },
    #[error("{subject} has no field {field:?}")]
    NoSuchField { subject: String, field: String },
    #[error("{subject} is not iterable")]
    NotIterable { subject: String },
    #[error("{name} has type {subject} and is not callable")]
    NotCallable { name: String, subject: String },
    #[error("function {name} returns no value")]
    VoidInExpressionPosition { name: String },
    #[error("unsupported: {0}")]
    UnsupportedShape(String),
    #[error("cannot assign {assigned} to {name} of type {declared}")]
    AssignmentMismatch {
        name: String,
        declared: String,
        assigned: String,
    },
    #[error("no template named {name:?}")]
    UndefinedTemplate { name: String },
}

impl Type {
    pub fn array(element: Type) -> Type {
        Type::Array {
            element: Box::new(element),
        }
    }

    pub fn function(args: Vec<Type>, ret: Option<Type>) -> Type {
        Type::Function(FunctionType {
            args,
            ret: ret.map(Box::new),
        })
    }

    /// Returns the external label and type of the named field.
    pub fn field_named(&self, name: &str) -> Result<(String, Type), TypeError> {
        match self {
            Type::Object(object) => object.field_named(name),
            other => Err(TypeError::NoSuchField {
                subject: other.to_string(),
                field: name.to_string(),
            }),
        }
    }

    /// Returns the element type when iterating over a value of this type.
    pub fn iterate(&self) -> Result<Type, TypeError> {
        match self {
            Type::Array { element } => Ok((**element).clone()),
            other => Err(TypeError::NotIterable {
                subject: other.to_string(),
            }),
        }
    }

    /// Boolean, number and string values print natively in JavaScript.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Boolean | Type::Number | Type::String)
    }
}

impl ObjectType {
    pub fn field_named(&self, name: &str) -> Result<(String, Type), TypeError> {
        let ty = self.fields.get(name).ok_or_else(|| TypeError::NoSuchField {
            subject: self.to_string(),
            field: name.to_string(),
        })?;
        Ok((self.label(name).to_string(), ty.clone()))
    }

    pub fn label<'a>(&'a self, name: &'a str) -> &'a str {
        self.labels.get(name).map(String::as_str).unwrap_or(name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean => write!(f, "boolean"),
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::Object(object) => write!(f, "{}", object),
            Type::Array { element } => write!(f, "Array.<{}>", element),
            Type::Function(function) => write!(f, "{}", function),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, ty)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", self.label(name), ty)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function (")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")?;
        if let Some(ret) = &self.ret {
            write!(f, ": {}", ret)?;
        }
        Ok(())
    }
}
