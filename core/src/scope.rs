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

use crate::types::{FunctionType, ObjectType, Type, TypeError};
use lazy_static::lazy_static;
use std::collections::BTreeMap;

/// Functions live under this prefix. Template variables always start with `$`,
/// so a function binding can never be shadowed by a `$variable`.
pub const FUNCTION_PREFIX: char = '#';

lazy_static! {
    static ref BUILTINS: Vec<(&'static str, FunctionType)> = {
        let compare = FunctionType {
            args: vec![Type::Number, Type::Number],
            ret: Some(Box::new(Type::Boolean)),
        };
        let text = FunctionType {
            args: vec![Type::String],
            ret: Some(Box::new(Type::String)),
        };
        let mut table = vec![
            ("eq", compare.clone()),
            ("ne", compare.clone()),
            ("lt", compare.clone()),
            ("le", compare.clone()),
            ("gt", compare.clone()),
            ("ge", compare),
            (
                "not",
                FunctionType {
                    args: vec![Type::Boolean],
                    ret: Some(Box::new(Type::Boolean)),
                },
            ),
            (
                "len",
                FunctionType {
                    args: vec![Type::array(Type::String)],
                    ret: Some(Box::new(Type::Number)),
                },
            ),
            (
                "printf",
                FunctionType {
                    args: vec![Type::String, Type::String],
                    ret: Some(Box::new(Type::String)),
                },
            ),
        ];
        for name in [
            "print",
            "println",
            "html",
            "js",
            "urlquery",
            "json",
            "_html_template_htmlescaper",
            "_html_template_attrescaper",
            "_html_template_rcdataescaper",
            "_html_template_nospaceescaper",
            "_html_template_commentescaper",
            "_html_template_urlescaper",
            "_html_template_urlnormalizer",
            "_html_template_urlfilter",
            "_html_template_jsvalescaper",
            "_html_template_jsstrescaper",
            "_html_template_jsregexpescaper",
        ] {
            table.push((name, text.clone()));
        }
        table
    };
}

/// Names of the functions every root scope starts with.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(name, _)| *name)
}

fn function_key(ident: &str) -> String {
    format!("{}{}", FUNCTION_PREFIX, ident)
}

/// The type of the current context (`.`) plus the variables visible at one
/// block level, chained to the enclosing level.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    pub context: Type,
    variables: BTreeMap<String, Type>,
    /// Generated-code names of variables that shadow an enclosing level.
    renamed: BTreeMap<String, String>,
    depth: usize,
    parent: Option<&'a Scope<'a>>,
}

/// One detached scope level, kept by block statements for code generation.
/// `locals` is keyed by generated-code name.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub context: Type,
    pub locals: BTreeMap<String, Type>,
}

impl Scope<'static> {
    /// Creates a global scope for the given root context: `$` plus builtins.
    pub fn root(context: Type) -> Self {
        let mut variables = BTreeMap::new();
        variables.insert("$".to_string(), context.clone());
        for (name, ty) in BUILTINS.iter() {
            variables.insert(function_key(name), Type::Function(ty.clone()));
        }
        Scope {
            context,
            variables,
            renamed: BTreeMap::new(),
            depth: 0,
            parent: None,
        }
    }
}

impl<'a> Scope<'a> {
    /// Installs user functions next to the builtins. A user function with a
    /// builtin's name replaces it.
    pub fn with_functions<I>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = (String, FunctionType)>,
    {
        for (name, ty) in functions {
            self.variables
                .insert(function_key(&name), Type::Function(ty));
        }
        self
    }

    pub fn child(&self) -> Scope<'_> {
        Scope {
            context: self.context.clone(),
            variables: BTreeMap::new(),
            renamed: BTreeMap::new(),
            depth: self.depth + 1,
            parent: Some(self),
        }
    }

    /// Binds `name` at this level under its own name. Used for block
    /// parameters, which shadow from the start of the block.
    pub fn declare(&mut self, name: impl Into<String>, ty: Type) {
        self.variables.insert(name.into(), ty);
    }

    /// Binds a variable introduced by a declaration statement and returns
    /// its generated-code name. A variable that shadows one from an
    /// enclosing level is renamed `$name$depth`, so statements before the
    /// declaration still reach the outer variable.
    pub fn declare_local(&mut self, name: &str, ty: Type) -> String {
        let shadows = !self.variables.contains_key(name)
            && self.parent.map_or(false, |p| p.lookup(name).is_some());
        if shadows {
            self.renamed
                .insert(name.to_string(), format!("{}${}", name, self.depth));
        }
        self.variables.insert(name.to_string(), ty);
        self.local_name(name)
    }

    fn local_name(&self, name: &str) -> String {
        self.renamed
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Generated-code name and type of `name`, from the nearest level binding it.
    fn lookup(&self, name: &str) -> Option<(String, &Type)> {
        match self.variables.get(name) {
            Some(ty) => Some((self.local_name(name), ty)),
            None => self.parent.and_then(|p| p.lookup(name)),
        }
    }

    /// Names visible from this level, functions or variables depending on `functions`.
    fn candidates(&self, functions: bool) -> Vec<String> {
        let mut names = Vec::new();
        let mut level = Some(self);
        while let Some(scope) = level {
            for name in scope.variables.keys() {
                let is_function = name.starts_with(FUNCTION_PREFIX);
                if is_function == functions {
                    let name = name.trim_start_matches(FUNCTION_PREFIX).to_string();
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
            level = scope.parent;
        }
        names.sort();
        names
    }

    /// Returns the generated-code name and type of the given variable,
    /// searching enclosing levels.
    pub fn field_named(&self, name: &str) -> Result<(String, Type), TypeError> {
        match self.lookup(name) {
            Some((local, ty)) => Ok((local, ty.clone())),
            None => Err(TypeError::UndefinedVariable {
                name: name.to_string(),
                candidates: self.candidates(false),
            }),
        }
    }

    /// Returns the bare identifier and type of a function binding.
    pub fn function_named(&self, ident: &str) -> Result<(String, Type), TypeError> {
        match self.lookup(&function_key(ident)) {
            Some((_, ty)) => Ok((ident.to_string(), ty.clone())),
            None => Err(TypeError::UndefinedVariable {
                name: ident.to_string(),
                candidates: self.candidates(true),
            }),
        }
    }

    /// The global handle is never iterable.
    pub fn iterate(&self) -> Result<Type, TypeError> {
        Err(TypeError::NotIterable {
            subject: "global object".to_string(),
        })
    }

    /// The type of the global handle: an object whose fields are every
    /// function binding visible from here.
    pub fn globals(&self) -> Type {
        let mut object = ObjectType::default();
        let mut level = Some(self);
        while let Some(scope) = level {
            for (name, ty) in &scope.variables {
                if let Some(ident) = name.strip_prefix(FUNCTION_PREFIX) {
                    object
                        .fields
                        .entry(ident.to_string())
                        .or_insert_with(|| ty.clone());
                }
            }
            level = scope.parent;
        }
        Type::Object(object)
    }

    pub fn into_frame(self) -> Frame {
        let renamed = self.renamed;
        let locals = self
            .variables
            .into_iter()
            .map(|(name, ty)| match renamed.get(&name) {
                Some(local) => (local.clone(), ty),
                None => (name, ty),
            })
            .collect();
        Frame {
            context: self.context,
            locals,
        }
    }
}

impl Frame {
    /// Locals declared at this level, excluding the given parameter names.
    pub fn hoisted<'f>(&'f self, params: &'f [&'f str]) -> impl Iterator<Item = &'f str> + 'f {
        self.locals
            .keys()
            .map(String::as_str)
            .filter(move |name| !params.contains(name))
    }
}
