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

//! Compiles a set of templates into one JavaScript bundle.
//!
//! The bundle is a single expression. Its value is a function
//! `(ctx, funcs) -> string` rendering the entry template, with
//! `render(name, ctx, funcs)` and `templates` attached.

use crate::checker::TypeChecker;
use crate::compiler::{quote, Compiler};
use crate::diagnostic::CompileError;
use crate::extract::{extract, DataShape};
use crate::options::{CompileOptions, PreludeMode};
use crate::parse::Tree;
use crate::prelude::{self, PRELUDE_VERSION};
use crate::scope::Scope;

struct Entry {
    tree: Tree,
    /// Context shape for this template alone; the bundle root shape otherwise.
    shape: Option<DataShape>,
}

pub struct Bundle {
    options: CompileOptions,
    entries: Vec<Entry>,
}

impl Bundle {
    pub fn new(options: CompileOptions) -> Self {
        Bundle {
            options,
            entries: Vec::new(),
        }
    }

    /// Adds a template rendered against the bundle's root shape. A template
    /// with the same name replaces the earlier one.
    pub fn add(&mut self, tree: Tree) -> &mut Self {
        self.insert(Entry { tree, shape: None })
    }

    /// Adds a template with its own context shape, for templates that are
    /// only ever included with a narrower context.
    pub fn add_typed(&mut self, tree: Tree, shape: DataShape) -> &mut Self {
        self.insert(Entry {
            tree,
            shape: Some(shape),
        })
    }

    fn insert(&mut self, entry: Entry) -> &mut Self {
        match self
            .entries
            .iter_mut()
            .find(|e| e.tree.name == entry.tree.name)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.tree.name.as_str())
    }

    fn entry_name(&self) -> Result<&str, CompileError> {
        let name = match &self.options.entry {
            Some(name) => name.as_str(),
            None => self
                .names()
                .last()
                .ok_or(CompileError::EmptyBundle)?,
        };
        if self.names().any(|n| n == name) {
            Ok(name)
        } else {
            Err(CompileError::NoSuchTemplate(name.to_string()))
        }
    }

    /// Checks and compiles every template. `root` describes the data the
    /// entry template is called with.
    pub fn compile(&self, root: &DataShape) -> Result<String, CompileError> {
        if self.entries.is_empty() {
            return Err(CompileError::EmptyBundle);
        }
        let entry = self.entry_name()?;
        let root_type = extract(root)?;
        let funcs = self.options.function_types()?;
        let checker = TypeChecker::new().with_templates(self.names());

        log::debug!(
            "[bundle] compiling {} templates, entry {:?}",
            self.entries.len(),
            entry
        );

        let mut out = String::from("(function(){var __rt=");
        match &self.options.prelude {
            PreludeMode::Inline => out.push_str(prelude::source()),
            PreludeMode::Linked { binding } => out.push_str(binding),
        }
        out.push_str(",__tmpls={},__g;\n");
        if let PreludeMode::Linked { .. } = &self.options.prelude {
            out.push_str(&format!(
                "if(!__rt||__rt.version!=={})throw new Error(\"tmpljs: runtime {} required\");\n",
                quote(PRELUDE_VERSION),
                PRELUDE_VERSION
            ));
        }

        for Entry { tree, shape } in &self.entries {
            let context = match shape {
                Some(shape) => extract(shape)?,
                None => root_type.clone(),
            };
            let scope = Scope::root(context).with_functions(funcs.iter().cloned());
            let template = checker
                .check(tree, &scope)
                .map_err(|err| CompileError::check(tree, err))?;
            log::trace!("[bundle] checked {:?}", tree.name);

            out.push_str(&format!(
                "__tmpls[{}]={};\n",
                quote(&tree.name),
                Compiler::new().compile(&template)
            ));
        }

        let names: Vec<String> = self.names().map(quote).collect();
        out.push_str(&format!(
            "var __entry=function(ctx,funcs){{__g=__rt.globals(funcs);return __tmpls[{}](ctx);}};\n",
            quote(entry)
        ));
        out.push_str(
            "__entry.render=function(name,ctx,funcs){__g=__rt.globals(funcs);return __rt.include(__tmpls,name,ctx);};\n",
        );
        out.push_str(&format!("__entry.templates=[{}];\n", names.join(",")));
        out.push_str("return __entry;})()");
        Ok(out)
    }
}
