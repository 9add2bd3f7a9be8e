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

use tmpljs::loader::load_tree;
use tmpljs::{Bundle, CompileOptions, DataShape, Describe, FieldShape};

struct Person;

impl Describe for Person {
    fn describe() -> DataShape {
        DataShape::record(vec![
            FieldShape::renamed("Name", String::describe(), "name"),
            FieldShape::renamed("Powers", Vec::<String>::describe(), "powers"),
        ])
    }
}

// {{.Name}} has {{range $i, $p := .Powers}}{{if $i}}, {{end}}{{$p}}{{else}}no powers{{end}}.
const CARD: &str = r#"{
  "name": "card",
  "text": "{{.Name}} has {{range $i, $p := .Powers}}{{if $i}}, {{end}}{{$p}}{{else}}no powers{{end}}.",
  "root": {"nodes": [
    {"kind": "action", "pos": 2, "pipe": {"pos": 2, "cmds": [
      {"pos": 2, "args": [{"kind": "field", "pos": 2, "ident": ["Name"]}]}]}},
    {"kind": "text", "pos": 9, "text": " has "},
    {"kind": "range", "pos": 16, "pipe": {"pos": 22,
      "decl": [{"pos": 22, "ident": ["$i"]}, {"pos": 26, "ident": ["$p"]}],
      "cmds": [{"pos": 32, "args": [{"kind": "field", "pos": 32, "ident": ["Powers"]}]}]},
     "list": {"pos": 41, "nodes": [
       {"kind": "if", "pos": 43, "pipe": {"pos": 46, "cmds": [
         {"pos": 46, "args": [{"kind": "variable", "pos": 46, "ident": ["$i"]}]}]},
        "list": {"pos": 50, "nodes": [{"kind": "text", "pos": 50, "text": ", "}]}},
       {"kind": "action", "pos": 61, "pipe": {"pos": 61, "cmds": [
         {"pos": 61, "args": [{"kind": "variable", "pos": 61, "ident": ["$p"]}]}]}}
     ]},
     "else_list": {"pos": 73, "nodes": [{"kind": "text", "pos": 73, "text": "no powers"}]}},
    {"kind": "text", "pos": 89, "text": "."}
  ]}
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tree = load_tree(CARD)?;

    let mut bundle = Bundle::new(CompileOptions::default());
    bundle.add(tree);
    let js = bundle.compile(&Person::describe())?;

    println!("var card = {};", js);
    println!("console.log(card({{\"name\": \"Ada\", \"powers\": [\"math\", \"engines\"]}}));");
    Ok(())
}
