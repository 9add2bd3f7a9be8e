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

use crate::scope::Frame;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Bool(bool),
    String(String),
}

/// A fully resolved expression. Every variant carries its static type.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal {
        value: Literal,
        ty: Type,
    },
    /// `subject.name`, where `name` is the external (serialized) property name.
    Field {
        subject: Box<Expression>,
        name: String,
        ty: Type,
    },
    /// `subject.name(args)`; `ty` is the return type.
    Method {
        subject: Box<Expression>,
        name: String,
        args: Vec<Expression>,
        ty: Type,
    },
    Local {
        name: String,
        ty: Type,
    },
    /// The current context value (`.`).
    Context {
        ty: Type,
    },
    /// Handle to the function table.
    Global {
        ty: Type,
    },
}

impl Expression {
    pub fn literal(value: Literal) -> Self {
        let ty = match &value {
            Literal::Number(_) => Type::Number,
            Literal::Bool(_) => Type::Boolean,
            Literal::String(_) => Type::String,
        };
        Expression::Literal { value, ty }
    }

    pub fn ty(&self) -> &Type {
        match self {
            Expression::Literal { ty, .. }
            | Expression::Field { ty, .. }
            | Expression::Method { ty, .. }
            | Expression::Local { ty, .. }
            | Expression::Context { ty }
            | Expression::Global { ty } => ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    EmitText(String),
    EmitExpr(Expression),
    /// `name` is the generated-code name, which differs from the template
    /// name when the declaration shadows an enclosing block's variable.
    DeclareLocal { name: String, value: Expression },
    AssignLocal { name: String, value: Expression },
    Conditional(Conditional),
    Loop(Loop),
    Include {
        name: String,
        context: Option<Expression>,
    },
}

/// `if` and `with`. Body and else body each run in their own isolated block.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub test: Expression,
    /// `with` makes the test value the body's context.
    pub rebinds_context: bool,
    /// Variable bound to the test value inside the body.
    pub bound: Option<String>,
    pub body: Vec<Statement>,
    pub else_body: Vec<Statement>,
    pub scope: Frame,
    pub else_scope: Frame,
}

/// `range`. The body runs once per element with the element as context.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub subject: Expression,
    pub body: Vec<Statement>,
    /// Runs once, after the loop, when no element was visited.
    pub else_body: Vec<Statement>,
    pub index: Option<String>,
    pub value: Option<String>,
    pub scope: Frame,
    pub else_scope: Frame,
}

/// The checked root of one parse tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub body: Vec<Statement>,
    pub scope: Frame,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_types() {
        assert_eq!(*Expression::literal(Literal::Number(1.0)).ty(), Type::Number);
        assert_eq!(*Expression::literal(Literal::Bool(true)).ty(), Type::Boolean);
        assert_eq!(
            *Expression::literal(Literal::String("x".to_string())).ty(),
            Type::String
        );
    }

    #[test]
    fn test_chain_reports_outer_type() {
        let expr = Expression::Field {
            subject: Box::new(Expression::Context {
                ty: Type::array(Type::String),
            }),
            name: "length".to_string(),
            ty: Type::Number,
        };
        assert_eq!(*expr.ty(), Type::Number);
    }
}
