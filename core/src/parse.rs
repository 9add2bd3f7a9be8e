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

//! Template parse trees, as handed over by the template parser.
//!
//! The compiler does not parse template text itself. Trees arrive already
//! built (usually as JSON, see `loader`), with every node carrying its byte
//! offset into the template source so errors can point back at the source.
//! `Display` renders nodes back into template syntax for error context.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte offset into `Tree::text`.
pub type Pos = usize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub name: String,
    /// Source text the positions refer to.
    #[serde(default)]
    pub text: String,
    pub root: List,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct List {
    #[serde(default)]
    pub pos: Pos,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Text {
        #[serde(default)]
        pos: Pos,
        text: String,
    },
    Comment {
        #[serde(default)]
        pos: Pos,
        text: String,
    },
    /// `{{pipeline}}`, including declarations and assignments.
    Action {
        #[serde(default)]
        pos: Pos,
        pipe: Pipe,
    },
    If(Branch),
    With(Branch),
    Range(Branch),
    /// `{{template "name" pipeline}}`
    Template {
        #[serde(default)]
        pos: Pos,
        name: String,
        #[serde(default)]
        pipe: Option<Pipe>,
    },
}

/// Shared body of `if`, `with` and `range`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(default)]
    pub pos: Pos,
    pub pipe: Pipe,
    #[serde(default)]
    pub list: List,
    #[serde(default)]
    pub else_list: Option<List>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    #[serde(default)]
    pub pos: Pos,
    /// `$x = ...` rather than `$x := ...`
    #[serde(default)]
    pub is_assign: bool,
    #[serde(default)]
    pub decl: Vec<Variable>,
    pub cmds: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(default)]
    pub pos: Pos,
    pub args: Vec<Arg>,
}

/// `$x` or `$x.Field.Chain`. The first identifier includes the `$`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(default)]
    pub pos: Pos,
    pub ident: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Arg {
    Number {
        #[serde(default)]
        pos: Pos,
        text: String,
    },
    String {
        #[serde(default)]
        pos: Pos,
        text: String,
    },
    Bool {
        #[serde(default)]
        pos: Pos,
        value: bool,
    },
    Dot {
        #[serde(default)]
        pos: Pos,
    },
    /// `.A.B.C`
    Field {
        #[serde(default)]
        pos: Pos,
        ident: Vec<String>,
    },
    /// A function name such as `printf`.
    Identifier {
        #[serde(default)]
        pos: Pos,
        ident: String,
    },
    Variable(Variable),
    /// A parenthesized pipeline.
    Pipe(Pipe),
}

impl Node {
    pub fn pos(&self) -> Pos {
        match self {
            Node::Text { pos, .. }
            | Node::Comment { pos, .. }
            | Node::Action { pos, .. }
            | Node::Template { pos, .. } => *pos,
            Node::If(branch) | Node::With(branch) | Node::Range(branch) => branch.pos,
        }
    }
}

impl Arg {
    pub fn pos(&self) -> Pos {
        match self {
            Arg::Number { pos, .. }
            | Arg::String { pos, .. }
            | Arg::Bool { pos, .. }
            | Arg::Dot { pos }
            | Arg::Field { pos, .. }
            | Arg::Identifier { pos, .. } => *pos,
            Arg::Variable(var) => var.pos,
            Arg::Pipe(pipe) => pipe.pos,
        }
    }
}

/// Parses a number constant the way template syntax writes them: decimal,
/// float, `0x`/`0o`/`0b`/leading-zero octal integers, `_` separators and
/// character constants like `'a'`.
pub fn parse_number(text: &str) -> Option<f64> {
    if let Some(inner) = text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        return char_constant(inner).map(f64::from);
    }

    let clean: String = text.chars().filter(|c| *c != '_').collect();
    let (negative, body) = match clean.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, clean.strip_prefix('+').unwrap_or(&clean)),
    };

    let radix = |digits: &str, base: u32| i64::from_str_radix(digits, base).ok().map(|v| v as f64);
    let value = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        radix(hex, 16)?
    } else if let Some(oct) = body.strip_prefix("0o").or_else(|| body.strip_prefix("0O")) {
        radix(oct, 8)?
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        radix(bin, 2)?
    } else if body.len() > 1 && body.starts_with('0') && body.bytes().all(|b| b.is_ascii_digit()) {
        radix(&body[1..], 8)?
    } else {
        body.parse::<f64>().ok().filter(|v| v.is_finite())?
    };

    Some(if negative { -value } else { value })
}

/// Code point of the body of a character constant: one character, or one of
/// the escapes `\a \b \f \n \r \t \v \\ \'`, `\xHH`, `\uHHHH`,
/// `\UHHHHHHHH` and three-digit octal `\ooo`.
fn char_constant(inner: &str) -> Option<u32> {
    let mut chars = inner.chars();
    let first = chars.next()?;
    if first != '\\' {
        return match chars.next() {
            None => Some(first as u32),
            Some(_) => None,
        };
    }
    let escape = chars.next()?;
    let rest = chars.as_str();
    let hex = |digits: usize| {
        if rest.len() != digits || !rest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(rest, 16).ok()
    };
    let code = match escape {
        'a' if rest.is_empty() => 0x07,
        'b' if rest.is_empty() => 0x08,
        'f' if rest.is_empty() => 0x0C,
        'n' if rest.is_empty() => 0x0A,
        'r' if rest.is_empty() => 0x0D,
        't' if rest.is_empty() => 0x09,
        'v' if rest.is_empty() => 0x0B,
        '\\' | '\'' if rest.is_empty() => escape as u32,
        'x' => hex(2)?,
        'u' => hex(4)?,
        'U' => hex(8)?,
        '0'..='7' => {
            let digits = format!("{}{}", escape, rest);
            if digits.len() != 3 || !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
                return None;
            }
            let value = u32::from_str_radix(&digits, 8).ok()?;
            if value > 0xFF {
                return None;
            }
            value
        }
        _ => return None,
    };
    // Surrogate halves and values past U+10FFFF are not characters.
    char::from_u32(code).map(u32::from)
}

// ─── Display: back to template syntax ───────────────────────────────────────

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text { text, .. } => write!(f, "{}", text),
            Node::Comment { text, .. } => write!(f, "{{{{{}}}}}", text),
            Node::Action { pipe, .. } => write!(f, "{{{{{}}}}}", pipe),
            Node::If(branch) => branch.fmt_keyword(f, "if"),
            Node::With(branch) => branch.fmt_keyword(f, "with"),
            Node::Range(branch) => branch.fmt_keyword(f, "range"),
            Node::Template { name, pipe, .. } => match pipe {
                Some(pipe) => write!(f, "{{{{template {:?} {}}}}}", name, pipe),
                None => write!(f, "{{{{template {:?}}}}}", name),
            },
        }
    }
}

impl Branch {
    fn fmt_keyword(&self, f: &mut fmt::Formatter<'_>, keyword: &str) -> fmt::Result {
        write!(f, "{{{{{} {}}}}}{}", keyword, self.pipe, self.list)?;
        if let Some(else_list) = &self.else_list {
            write!(f, "{{{{else}}}}{}", else_list)?;
        }
        write!(f, "{{{{end}}}}")
    }
}

impl fmt::Display for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.decl.is_empty() {
            for (i, var) in self.decl.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", var)?;
            }
            write!(f, "{}", if self.is_assign { " = " } else { " := " })?;
        }
        for (i, cmd) in self.cmds.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", cmd)?;
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match arg {
                Arg::Pipe(pipe) => write!(f, "({})", pipe)?,
                other => write!(f, "{}", other)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ident.join("."))
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Number { text, .. } => write!(f, "{}", text),
            Arg::String { text, .. } => write!(f, "{:?}", text),
            Arg::Bool { value, .. } => write!(f, "{}", value),
            Arg::Dot { .. } => write!(f, "."),
            Arg::Field { ident, .. } => {
                for segment in ident {
                    write!(f, ".{}", segment)?;
                }
                Ok(())
            }
            Arg::Identifier { ident, .. } => write!(f, "{}", ident),
            Arg::Variable(var) => write!(f, "{}", var),
            Arg::Pipe(pipe) => write!(f, "({})", pipe),
        }
    }
}

/// Terse constructors for trees in tests. Positions default to zero.
#[cfg(test)]
pub(crate) mod build {
    use super::*;

    pub fn tree(name: &str, nodes: Vec<Node>) -> Tree {
        let root = List { pos: 0, nodes };
        Tree {
            name: name.to_string(),
            text: root.to_string(),
            root,
        }
    }

    pub fn text(s: &str) -> Node {
        Node::Text {
            pos: 0,
            text: s.to_string(),
        }
    }

    pub fn action(pipe: Pipe) -> Node {
        Node::Action { pos: 0, pipe }
    }

    /// `{{arg}}`
    pub fn show(arg: Arg) -> Node {
        action(pipe(vec![cmd(vec![arg])]))
    }

    pub fn pipe(cmds: Vec<Command>) -> Pipe {
        Pipe {
            pos: 0,
            is_assign: false,
            decl: Vec::new(),
            cmds,
        }
    }

    /// `$a, $b := cmd`
    pub fn decl(names: &[&str], cmd: Command) -> Pipe {
        Pipe {
            pos: 0,
            is_assign: false,
            decl: names
                .iter()
                .map(|name| Variable {
                    pos: 0,
                    ident: vec![name.to_string()],
                })
                .collect(),
            cmds: vec![cmd],
        }
    }

    /// `$a = cmd`
    pub fn assign(name: &str, cmd: Command) -> Pipe {
        Pipe {
            is_assign: true,
            ..decl(&[name], cmd)
        }
    }

    pub fn cmd(args: Vec<Arg>) -> Command {
        Command { pos: 0, args }
    }

    /// A single-argument command.
    pub fn one(arg: Arg) -> Command {
        cmd(vec![arg])
    }

    pub fn field(path: &str) -> Arg {
        Arg::Field {
            pos: 0,
            ident: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    pub fn var(path: &str) -> Arg {
        Arg::Variable(Variable {
            pos: 0,
            ident: path.split('.').map(String::from).collect(),
        })
    }

    pub fn ident(name: &str) -> Arg {
        Arg::Identifier {
            pos: 0,
            ident: name.to_string(),
        }
    }

    pub fn string(s: &str) -> Arg {
        Arg::String {
            pos: 0,
            text: s.to_string(),
        }
    }

    pub fn number(text: &str) -> Arg {
        Arg::Number {
            pos: 0,
            text: text.to_string(),
        }
    }

    pub fn boolean(value: bool) -> Arg {
        Arg::Bool { pos: 0, value }
    }

    pub fn dot() -> Arg {
        Arg::Dot { pos: 0 }
    }

    fn branch(pipe: Pipe, list: Vec<Node>, else_list: Option<Vec<Node>>) -> Branch {
        Branch {
            pos: 0,
            pipe,
            list: List { pos: 0, nodes: list },
            else_list: else_list.map(|nodes| List { pos: 0, nodes }),
        }
    }

    pub fn if_(pipe: Pipe, list: Vec<Node>, else_list: Option<Vec<Node>>) -> Node {
        Node::If(branch(pipe, list, else_list))
    }

    pub fn with(pipe: Pipe, list: Vec<Node>, else_list: Option<Vec<Node>>) -> Node {
        Node::With(branch(pipe, list, else_list))
    }

    pub fn range(pipe: Pipe, list: Vec<Node>, else_list: Option<Vec<Node>>) -> Node {
        Node::Range(branch(pipe, list, else_list))
    }

    pub fn template(name: &str, pipe: Option<Pipe>) -> Node {
        Node::Template {
            pos: 0,
            name: name.to_string(),
            pipe,
        }
    }
}
