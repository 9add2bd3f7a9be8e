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

use crate::ast::{Conditional, Expression, Literal, Loop, Statement, Template};
use crate::scope::Frame;
use crate::types::Type;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
}

/// Quotes a string as a JavaScript literal that is also safe inside a
/// `<script>` element.
pub fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string())
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// `.name` when `name` is a plain identifier, `["name"]` otherwise.
pub fn property(name: &str) -> String {
    if IDENTIFIER.is_match(name) {
        format!(".{}", name)
    } else {
        format!("[{}]", quote(name))
    }
}

fn js_number(n: f64) -> String {
    if n < 0.0 {
        format!("({})", n)
    } else {
        format!("{}", n)
    }
}

/// Emits one template as a JavaScript function expression
/// `function(ctx){...}` returning the rendered string.
///
/// Block bodies become immediately invoked closures so every block has its
/// own `var` scope; the fixed temporaries (`v`, `it`, `i`, `any`) never
/// start with `$` and cannot clash with template variables.
pub struct Compiler {
    pub out: String,
}

impl Compiler {
    pub fn new() -> Self {
        Self { out: String::new() }
    }

    pub fn compile(mut self, template: &Template) -> String {
        self.out.push_str("function(ctx){var $=ctx,out=\"\"");
        for name in template.scope.hoisted(&[]) {
            self.out.push(',');
            self.out.push_str(name);
        }
        self.out.push(';');
        for stmt in &template.body {
            self.visit_stmt(stmt);
        }
        self.out.push_str("return out;}");
        log::debug!(
            "[codegen] template {:?}: {} bytes",
            template.name,
            self.out.len()
        );
        self.out
    }

    /// `(function(ctx,params...){body})(args...);`
    fn visit_closure(&mut self, params: &[&str], args: &[&str], body: &[Statement], frame: &Frame) {
        let mut inner = Compiler::new();
        let hoisted: Vec<&str> = frame.hoisted(params).collect();
        if !hoisted.is_empty() {
            inner.out.push_str("var ");
            inner.out.push_str(&hoisted.join(","));
            inner.out.push(';');
        }
        for stmt in body {
            inner.visit_stmt(stmt);
        }

        self.out.push_str("(function(ctx");
        for param in params {
            self.out.push(',');
            self.out.push_str(param);
        }
        self.out.push_str("){");
        self.out.push_str(&inner.out);
        self.out.push_str("})(");
        self.out.push_str(&args.join(","));
        self.out.push_str(");");
    }

    fn visit_stmt(&mut self, stmt: &Statement) {
        match stmt {
            Statement::EmitText(text) => {
                if !text.is_empty() {
                    self.out.push_str("out+=");
                    self.out.push_str(&quote(text));
                    self.out.push(';');
                }
            }
            Statement::EmitExpr(expr) => {
                if expr.ty().is_primitive() {
                    self.out.push_str("out+=");
                    self.visit_expr(expr);
                } else {
                    self.out.push_str("out+=__rt.str(");
                    self.visit_expr(expr);
                    self.out.push(')');
                }
                self.out.push(';');
            }
            Statement::DeclareLocal { name, value } | Statement::AssignLocal { name, value } => {
                self.out.push_str(name);
                self.out.push('=');
                self.visit_expr(value);
                self.out.push(';');
            }
            Statement::Conditional(cond) => self.visit_conditional(cond),
            Statement::Loop(lp) => self.visit_loop(lp),
            Statement::Include { name, context } => {
                self.out.push_str("out+=__rt.include(__tmpls,");
                self.out.push_str(&quote(name));
                self.out.push(',');
                match context {
                    Some(expr) => self.visit_expr(expr),
                    None => self.out.push_str("null"),
                }
                self.out.push_str(");");
            }
        }
    }

    fn visit_conditional(&mut self, cond: &Conditional) {
        self.out.push_str("var v=");
        self.visit_expr(&cond.test);
        self.out.push_str(";if(");
        match cond.test.ty() {
            Type::Array { .. } => self.out.push_str("v&&v.length>0"),
            _ => self.out.push('v'),
        }
        self.out.push_str("){");

        let context = if cond.rebinds_context { "v" } else { "ctx" };
        match &cond.bound {
            Some(bound) => self.visit_closure(&[bound.as_str()], &[context, "v"], &cond.body, &cond.scope),
            None => self.visit_closure(&[], &[context], &cond.body, &cond.scope),
        }
        self.out.push('}');

        if !cond.else_body.is_empty() {
            self.out.push_str("else{");
            self.visit_closure(&[], &["ctx"], &cond.else_body, &cond.else_scope);
            self.out.push('}');
        }
    }

    fn visit_loop(&mut self, lp: &Loop) {
        let has_else = !lp.else_body.is_empty();

        self.out.push_str("var it=");
        self.visit_expr(&lp.subject);
        if has_else {
            self.out.push_str(",any=false");
        }
        self.out.push_str(";for(var i=0;it&&i<it.length;i++){");
        if has_else {
            self.out.push_str("any=true;");
        }

        let mut params = Vec::new();
        let mut args = vec!["it[i]"];
        if let Some(index) = &lp.index {
            params.push(index.as_str());
            args.push("i");
        }
        if let Some(value) = &lp.value {
            params.push(value.as_str());
            args.push("it[i]");
        }
        self.visit_closure(&params, &args, &lp.body, &lp.scope);
        self.out.push('}');

        if has_else {
            self.out.push_str("if(!any){");
            self.visit_closure(&[], &["ctx"], &lp.else_body, &lp.else_scope);
            self.out.push('}');
        }
    }

    fn visit_expr(&mut self, expr: &Expression) {
        match expr {
            Expression::Literal { value, .. } => match value {
                Literal::Number(n) => self.out.push_str(&js_number(*n)),
                Literal::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
                Literal::String(s) => self.out.push_str(&quote(s)),
            },
            Expression::Field { subject, name, .. } => {
                self.visit_expr(subject);
                self.out.push_str(&property(name));
            }
            Expression::Method {
                subject,
                name,
                args,
                ..
            } => {
                self.visit_expr(subject);
                self.out.push_str(&property(name));
                self.out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.visit_expr(arg);
                }
                self.out.push(')');
            }
            Expression::Local { name, .. } => self.out.push_str(name),
            Expression::Context { .. } => self.out.push_str("ctx"),
            Expression::Global { .. } => self.out.push_str("__g"),
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
