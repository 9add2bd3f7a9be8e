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

use crate::extract::DataShape;
use crate::options::CompileOptions;
use crate::parse::{Arg, List, Node, Pipe, Pos, Tree};
use serde_json::from_str;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("JSON Parse Error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Integrity Error: {node} at offset {pos} lies outside the {len}-byte text of {tree:?}.")]
    PositionOutOfRange {
        tree: String,
        node: String,
        pos: Pos,
        len: usize,
    },
}

/// Loads a parse tree and verifies that its positions point into its text.
pub fn load_tree(json: &str) -> Result<Tree, LoadError> {
    let tree: Tree = from_str(json)?;
    verify_positions(&tree)?;
    Ok(tree)
}

pub fn load_shape(json: &str) -> Result<DataShape, LoadError> {
    Ok(from_str(json)?)
}

pub fn load_options(json: &str) -> Result<CompileOptions, LoadError> {
    Ok(from_str(json)?)
}

/// Trees without source text carry no positions worth checking.
fn verify_positions(tree: &Tree) -> Result<(), LoadError> {
    if tree.text.is_empty() {
        return Ok(());
    }
    let check = |pos: Pos, node: &dyn std::fmt::Display| {
        if pos > tree.text.len() {
            Err(LoadError::PositionOutOfRange {
                tree: tree.name.clone(),
                node: node.to_string(),
                pos,
                len: tree.text.len(),
            })
        } else {
            Ok(())
        }
    };
    verify_list(&tree.root, &check)
}

type Check<'a> = dyn Fn(Pos, &dyn std::fmt::Display) -> Result<(), LoadError> + 'a;

fn verify_list(list: &List, check: &Check<'_>) -> Result<(), LoadError> {
    for node in &list.nodes {
        check(node.pos(), node)?;
        match node {
            Node::Text { .. } | Node::Comment { .. } => {}
            Node::Action { pipe, .. } => verify_pipe(pipe, check)?,
            Node::If(branch) | Node::With(branch) | Node::Range(branch) => {
                verify_pipe(&branch.pipe, check)?;
                verify_list(&branch.list, check)?;
                if let Some(else_list) = &branch.else_list {
                    verify_list(else_list, check)?;
                }
            }
            Node::Template { pipe, .. } => {
                if let Some(pipe) = pipe {
                    verify_pipe(pipe, check)?;
                }
            }
        }
    }
    Ok(())
}

fn verify_pipe(pipe: &Pipe, check: &Check<'_>) -> Result<(), LoadError> {
    check(pipe.pos, pipe)?;
    for var in &pipe.decl {
        check(var.pos, var)?;
    }
    for cmd in &pipe.cmds {
        for arg in &cmd.args {
            check(arg.pos(), arg)?;
            if let Arg::Pipe(inner) = arg {
                verify_pipe(inner, check)?;
            }
        }
    }
    Ok(())
}
