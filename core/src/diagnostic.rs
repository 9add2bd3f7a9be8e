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

//! User-facing compile errors.
//!
//! Check failures are reported the way the template engine reports its own
//! execution errors: `name:line:col`, followed by a short excerpt of the
//! offending node.

use crate::checker::CheckError;
use crate::extract::ExtractError;
use crate::loader::LoadError;
use crate::parse::{Pos, Tree};
use crate::types::TypeError;
use thiserror::Error;

/// Longest node excerpt shown before truncation.
const CONTEXT_LIMIT: usize = 20;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("tmpljs: {location}: executing {template:?} at <{context}>: {kind}")]
    Check {
        template: String,
        location: String,
        context: String,
        kind: TypeError,
    },
    #[error("tmpljs: {0}")]
    Extract(#[from] ExtractError),
    #[error("tmpljs: no template named {0:?} in bundle")]
    NoSuchTemplate(String),
    #[error("tmpljs: bundle has no templates")]
    EmptyBundle,
    #[error("tmpljs: {0}")]
    Load(#[from] LoadError),
}

impl CompileError {
    /// Attaches the source location of `err` within `tree`.
    pub fn check(tree: &Tree, err: CheckError) -> Self {
        let (line, col) = locate(&tree.text, err.pos);
        CompileError::Check {
            template: tree.name.clone(),
            location: format!("{}:{}:{}", tree.name, line, col),
            context: excerpt(&err.context),
            kind: err.kind,
        }
    }

    /// The underlying type error, for check failures.
    pub fn type_error(&self) -> Option<&TypeError> {
        match self {
            CompileError::Check { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

/// 1-based line and byte column of `pos`. The column counts from 0 after a
/// newline, but equals the byte offset on the first line.
pub fn locate(text: &str, pos: Pos) -> (usize, usize) {
    let before = &text.as_bytes()[..pos.min(text.len())];
    let line = 1 + before.iter().filter(|b| **b == b'\n').count();
    let col = match before.iter().rposition(|b| *b == b'\n') {
        Some(newline) => before.len() - (newline + 1),
        None => before.len(),
    };
    (line, col)
}

fn excerpt(context: &str) -> String {
    match context.char_indices().nth(CONTEXT_LIMIT) {
        Some((cut, _)) => format!("{}...", &context[..cut]),
        None => context.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::List;

    #[test]
    fn test_locate() {
        let text = "ab\ncd{{.X}}\nef";
        assert_eq!(locate(text, 0), (1, 0));
        assert_eq!(locate(text, 2), (1, 2));
        assert_eq!(locate(text, 3), (2, 0));
        assert_eq!(locate(text, 5), (2, 2));
        assert_eq!(locate(text, 13), (3, 1));
        // Positions past the end clamp to it.
        assert_eq!(locate(text, 500), (3, 2));
    }

    #[test]
    fn test_excerpt_truncates() {
        assert_eq!(excerpt("{{.A}}"), "{{.A}}");
        assert_eq!(
            excerpt("{{range .Items}}{{.Name}}{{end}}"),
            "{{range .Items}}{{.N..."
        );
        assert_eq!(excerpt(&"é".repeat(25)), format!("{}...", "é".repeat(20)));
    }

    #[test]
    fn test_check_error_display() {
        let tree = Tree {
            name: "page".to_string(),
            text: "Hi\n  {{.Nope}}".to_string(),
            root: List::default(),
        };
        let err = CompileError::check(
            &tree,
            CheckError {
                kind: TypeError::NoSuchField {
                    subject: "{Name: string}".to_string(),
                    field: "Nope".to_string(),
                },
                pos: 7,
                context: ".Nope".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            r#"tmpljs: page:2:4: executing "page" at <.Nope>: {Name: string} has no field "Nope""#
        );
        assert!(matches!(
            err.type_error(),
            Some(TypeError::NoSuchField { .. })
        ));
    }

    #[test]
    fn test_wrapped_errors() {
        let err: CompileError = ExtractError::MultipleReturns {
            path: "$.Split".to_string(),
            count: 2,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "tmpljs: $.Split returns 2 values; at most one is supported"
        );
        assert!(err.type_error().is_none());
    }
}
