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

//! Builds the typed AST from a parse tree, resolving every reference
//! against the scope chain. The first failure aborts checking.

use crate::ast::{Conditional, Expression, Literal, Loop, Statement, Template};
use crate::parse::{self, Arg, Branch, List, Node, Pipe, Pos, Tree, Variable};
use crate::scope::{Frame, Scope};
use crate::types::{Type, TypeError};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// A type error tagged with the node it was found at.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}")]
pub struct CheckError {
    pub kind: TypeError,
    pub pos: Pos,
    /// The offending node, rendered back to template syntax.
    pub context: String,
}

fn at(kind: TypeError, pos: Pos, node: &dyn fmt::Display) -> CheckError {
    CheckError {
        kind,
        pos,
        context: node.to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeChecker {
    /// Names `{{template}}` may refer to. `None` accepts any name.
    templates: Option<BTreeSet<String>>,
}

impl TypeChecker {
    pub fn new() -> Self {
        TypeChecker::default()
    }

    /// Restricts includes to the given template names.
    pub fn with_templates<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.templates = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Checks one tree against a root scope.
    pub fn check(&self, tree: &Tree, root: &Scope<'_>) -> Result<Template, CheckError> {
        log::debug!("[check] template {:?} against {}", tree.name, root.context);
        let mut scope = root.child();
        let body = self.check_list(&tree.root, &mut scope)?;
        Ok(Template {
            name: tree.name.clone(),
            body,
            scope: scope.into_frame(),
        })
    }

    fn check_list(&self, list: &List, scope: &mut Scope<'_>) -> Result<Vec<Statement>, CheckError> {
        let mut body = Vec::with_capacity(list.nodes.len());
        for node in &list.nodes {
            if let Some(stmt) = self.check_node(node, scope)? {
                body.push(stmt);
            }
        }
        Ok(body)
    }

    fn check_node(&self, node: &Node, scope: &mut Scope<'_>) -> Result<Option<Statement>, CheckError> {
        let stmt = match node {
            Node::Text { text, .. } => Statement::EmitText(text.clone()),
            Node::Comment { .. } => return Ok(None),
            Node::Action { pipe, .. } => self.check_action(node, pipe, scope)?,
            Node::If(branch) => Statement::Conditional(self.check_conditional(node, branch, false, scope)?),
            Node::With(branch) => Statement::Conditional(self.check_conditional(node, branch, true, scope)?),
            Node::Range(branch) => Statement::Loop(self.check_loop(node, branch, scope)?),
            Node::Template { pos, name, pipe } => {
                if let Some(templates) = &self.templates {
                    if !templates.contains(name) {
                        return Err(at(
                            TypeError::UndefinedTemplate { name: name.clone() },
                            *pos,
                            node,
                        ));
                    }
                }
                let context = match pipe {
                    Some(pipe) => Some(self.check_pipe(pipe, scope)?),
                    None => None,
                };
                Statement::Include {
                    name: name.clone(),
                    context,
                }
            }
        };
        Ok(Some(stmt))
    }

    fn check_action(&self, node: &Node, pipe: &Pipe, scope: &mut Scope<'_>) -> Result<Statement, CheckError> {
        let target = match declared_name(node, pipe)? {
            Some(target) => target,
            None => return Ok(Statement::EmitExpr(self.check_pipe(pipe, scope)?)),
        };

        // The value is resolved before the target is bound, so `$x := $x`
        // reads the outer variable.
        let value = self.check_pipe(pipe, scope)?;
        let name = target.to_string();

        if pipe.is_assign {
            let (local, declared) = scope
                .field_named(&name)
                .map_err(|kind| at(kind, node.pos(), node))?;
            if declared != *value.ty() {
                return Err(at(
                    TypeError::AssignmentMismatch {
                        name,
                        declared: declared.to_string(),
                        assigned: value.ty().to_string(),
                    },
                    node.pos(),
                    node,
                ));
            }
            log::trace!("[check] assign {} as {}", name, local);
            Ok(Statement::AssignLocal { name: local, value })
        } else {
            let local = scope.declare_local(&name, value.ty().clone());
            log::trace!("[check] declare {} as {}: {}", name, local, value.ty());
            Ok(Statement::DeclareLocal { name: local, value })
        }
    }

    fn check_conditional(
        &self,
        node: &Node,
        branch: &Branch,
        rebinds_context: bool,
        scope: &Scope<'_>,
    ) -> Result<Conditional, CheckError> {
        if branch.pipe.is_assign {
            return Err(at(
                TypeError::UnsupportedShape("assignment in a block test".to_string()),
                branch.pos,
                node,
            ));
        }
        let bound = declared_name(node, &branch.pipe)?.map(str::to_string);

        let mut child = scope.child();
        let test = self.check_pipe(&branch.pipe, &child)?;
        if let Some(name) = &bound {
            child.declare(name.clone(), test.ty().clone());
        }
        if rebinds_context {
            child.context = test.ty().clone();
        }
        let body = self.check_list(&branch.list, &mut child)?;
        let frame = child.into_frame();

        let (else_body, else_scope) = self.check_else(branch, scope)?;

        Ok(Conditional {
            test,
            rebinds_context,
            bound,
            body,
            else_body,
            scope: frame,
            else_scope,
        })
    }

    fn check_loop(&self, node: &Node, branch: &Branch, scope: &Scope<'_>) -> Result<Loop, CheckError> {
        if branch.pipe.is_assign {
            return Err(at(
                TypeError::UnsupportedShape("assignment in a block test".to_string()),
                branch.pos,
                node,
            ));
        }
        let names = branch
            .pipe
            .decl
            .iter()
            .map(|var| single_name(node, var))
            .collect::<Result<Vec<_>, _>>()?;
        let (index, value) = match names.as_slice() {
            [] => (None, None),
            [value] => (None, Some(value.to_string())),
            [index, value] => (Some(index.to_string()), Some(value.to_string())),
            _ => {
                return Err(at(
                    TypeError::UnsupportedShape("range declares at most two variables".to_string()),
                    branch.pos,
                    node,
                ))
            }
        };

        let mut child = scope.child();
        let subject = self.check_pipe(&branch.pipe, &child)?;
        let element = subject
            .ty()
            .iterate()
            .map_err(|kind| at(kind, branch.pos, node))?;

        child.context = element.clone();
        if let Some(index) = &index {
            child.declare(index.clone(), Type::Number);
        }
        if let Some(value) = &value {
            child.declare(value.clone(), element);
        }
        let body = self.check_list(&branch.list, &mut child)?;
        let frame = child.into_frame();

        let (else_body, else_scope) = self.check_else(branch, scope)?;

        Ok(Loop {
            subject,
            body,
            else_body,
            index,
            value,
            scope: frame,
            else_scope,
        })
    }

    /// The else arm sees the enclosing scope only.
    fn check_else(
        &self,
        branch: &Branch,
        scope: &Scope<'_>,
    ) -> Result<(Vec<Statement>, Frame), CheckError> {
        let mut child = scope.child();
        let body = match &branch.else_list {
            Some(list) => self.check_list(list, &mut child)?,
            None => Vec::new(),
        };
        Ok((body, child.into_frame()))
    }

    // ─── Pipelines ───────────────────────────────────────────────────────────

    fn check_pipe(&self, pipe: &Pipe, scope: &Scope<'_>) -> Result<Expression, CheckError> {
        let mut piped = None;
        for cmd in &pipe.cmds {
            let (head, rest) = cmd.args.split_first().ok_or_else(|| {
                at(
                    TypeError::UnsupportedShape("empty command".to_string()),
                    cmd.pos,
                    pipe,
                )
            })?;

            let mut args = rest
                .iter()
                .map(|arg| self.check_arg(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            // The previous stage's value becomes the final argument.
            args.extend(piped.take());

            piped = Some(self.check_command(head, args, scope)?);
        }
        piped.ok_or_else(|| {
            at(
                TypeError::UnsupportedShape("empty pipeline".to_string()),
                pipe.pos,
                pipe,
            )
        })
    }

    fn check_command(&self, head: &Arg, args: Vec<Expression>, scope: &Scope<'_>) -> Result<Expression, CheckError> {
        let located = |kind| at(kind, head.pos(), head);
        match head {
            Arg::Identifier { ident, .. } => call_function(ident, args, scope).map_err(located),
            Arg::Field { ident, .. } => {
                let context = Expression::Context {
                    ty: scope.context.clone(),
                };
                resolve_chain(context, ident, args).map_err(located)
            }
            Arg::Variable(var) => resolve_variable(var, args, scope).map_err(located),
            other => {
                let value = self.check_arg(other, scope)?;
                if args.is_empty() {
                    Ok(value)
                } else {
                    Err(located(TypeError::NotCallable {
                        name: other.to_string(),
                        subject: value.ty().to_string(),
                    }))
                }
            }
        }
    }

    fn check_arg(&self, arg: &Arg, scope: &Scope<'_>) -> Result<Expression, CheckError> {
        let located = |kind| at(kind, arg.pos(), arg);
        match arg {
            Arg::Number { text, .. } => parse::parse_number(text)
                .map(|n| Expression::literal(Literal::Number(n)))
                .ok_or_else(|| located(TypeError::UnsupportedShape(format!("malformed number {}", text)))),
            Arg::String { text, .. } => Ok(Expression::literal(Literal::String(text.clone()))),
            Arg::Bool { value, .. } => Ok(Expression::literal(Literal::Bool(*value))),
            Arg::Dot { .. } => Ok(Expression::Context {
                ty: scope.context.clone(),
            }),
            Arg::Field { ident, .. } => {
                let context = Expression::Context {
                    ty: scope.context.clone(),
                };
                resolve_chain(context, ident, Vec::new()).map_err(located)
            }
            Arg::Identifier { ident, .. } => call_function(ident, Vec::new(), scope).map_err(located),
            Arg::Variable(var) => resolve_variable(var, Vec::new(), scope).map_err(located),
            Arg::Pipe(pipe) => {
                if !pipe.decl.is_empty() {
                    return Err(located(TypeError::UnsupportedShape(
                        "declaration inside a parenthesized pipeline".to_string(),
                    )));
                }
                self.check_pipe(pipe, scope)
            }
        }
    }
}

/// The single declaration target of a pipe, if any.
fn declared_name<'p>(node: &Node, pipe: &'p Pipe) -> Result<Option<&'p str>, CheckError> {
    match pipe.decl.as_slice() {
        [] => Ok(None),
        [var] => single_name(node, var).map(Some),
        _ => Err(at(
            TypeError::UnsupportedShape("multiple declaration targets".to_string()),
            pipe.pos,
            node,
        )),
    }
}

fn single_name<'v>(node: &Node, var: &'v Variable) -> Result<&'v str, CheckError> {
    match var.ident.as_slice() {
        [name] => Ok(name),
        _ => Err(at(
            TypeError::UnsupportedShape(format!("cannot declare {}", var)),
            var.pos,
            node,
        )),
    }
}

fn call_function(ident: &str, args: Vec<Expression>, scope: &Scope<'_>) -> Result<Expression, TypeError> {
    let (name, ty) = scope.function_named(ident)?;
    let global = Expression::Global { ty: scope.globals() };
    invoke(global, name, ty, args)
}

fn resolve_variable(var: &Variable, args: Vec<Expression>, scope: &Scope<'_>) -> Result<Expression, TypeError> {
    let (first, rest) = var
        .ident
        .split_first()
        .ok_or_else(|| TypeError::UnsupportedShape("empty variable".to_string()))?;
    let (name, ty) = scope.field_named(first)?;
    let local = Expression::Local { name, ty };
    if rest.is_empty() && !args.is_empty() {
        return Err(TypeError::NotCallable {
            name: first.clone(),
            subject: local.ty().to_string(),
        });
    }
    resolve_chain(local, rest, args)
}

/// Walks `.A.B.C` from `subject`. Function-typed members along the way are
/// called without arguments; `args` go to the last member only.
fn resolve_chain(subject: Expression, idents: &[String], args: Vec<Expression>) -> Result<Expression, TypeError> {
    let mut expr = subject;
    let mut args = Some(args);
    for (i, ident) in idents.iter().enumerate() {
        let (name, ty) = expr.ty().field_named(ident)?;
        let call_args = if i + 1 == idents.len() {
            args.take().unwrap_or_default()
        } else {
            Vec::new()
        };

        expr = match ty {
            Type::Function(_) => invoke(expr, name, ty, call_args)?,
            ty if call_args.is_empty() => Expression::Field {
                subject: Box::new(expr),
                name,
                ty,
            },
            ty => {
                return Err(TypeError::NotCallable {
                    name: ident.clone(),
                    subject: ty.to_string(),
                })
            }
        };
    }
    Ok(expr)
}

fn invoke(subject: Expression, name: String, ty: Type, args: Vec<Expression>) -> Result<Expression, TypeError> {
    match ty {
        Type::Function(function) => match function.ret {
            Some(ret) => Ok(Expression::Method {
                subject: Box::new(subject),
                name,
                args,
                ty: *ret,
            }),
            None => Err(TypeError::VoidInExpressionPosition { name }),
        },
        other => Err(TypeError::NotCallable {
            name,
            subject: other.to_string(),
        }),
    }
}
