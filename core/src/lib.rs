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

//! Compiles text-template parse trees into standalone JavaScript.
//!
//! ```ignore
//! let tree = tmpljs::loader::load_tree(json)?;
//! let js = tmpljs::compile(tree, &Person::describe())?;
//! ```

pub mod ast;
pub mod bundle;
pub mod checker;
pub mod compiler;
pub mod diagnostic;
pub mod extract;
pub mod loader;
pub mod options;
pub mod parse;
pub mod prelude;
pub mod scope;
pub mod types;

pub use bundle::Bundle;
pub use diagnostic::CompileError;
pub use extract::{describe_type, DataShape, Describe, FieldShape, MethodShape, Signature};
pub use options::{CompileOptions, PreludeMode};
pub use parse::Tree;
pub use types::Type;

/// Compiles a single template, with the prelude inlined, into a bundle
/// expression rendering it against data of shape `root`.
pub fn compile(tree: Tree, root: &DataShape) -> Result<String, CompileError> {
    let mut bundle = Bundle::new(CompileOptions::default());
    bundle.add(tree);
    bundle.compile(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::build::*;
    use crate::types::TypeError;

    struct Power;

    impl Describe for Power {
        fn describe() -> DataShape {
            DataShape::record(vec![FieldShape::renamed("Title", String::describe(), "title")])
        }
    }

    struct Hero;

    impl Describe for Hero {
        fn describe() -> DataShape {
            DataShape::record(vec![
                FieldShape::renamed("Name", String::describe(), "name"),
                FieldShape::renamed("Powers", Vec::<Power>::describe(), "powers"),
                FieldShape::new("Sidekick", Option::<Box<Power>>::describe()),
            ])
        }
    }

    fn card() -> Tree {
        tree(
            "card",
            vec![
                text("<h1>"),
                action(pipe(vec![
                    one(field(".Name")),
                    one(ident("_html_template_htmlescaper")),
                ])),
                text("</h1>"),
                range(
                    decl(&["$i", "$p"], one(field(".Powers"))),
                    vec![
                        show(var("$i")),
                        text(". "),
                        action(pipe(vec![
                            one(field(".Title")),
                            one(ident("_html_template_htmlescaper")),
                        ])),
                    ],
                    Some(vec![text("powerless")]),
                ),
                with(pipe(vec![one(field(".Sidekick"))]), vec![show(field(".Title"))], None),
            ],
        )
    }

    #[test]
    fn test_compile_end_to_end() {
        let js = compile(card(), &Hero::describe()).unwrap();
        assert!(js.contains(
            r#"__tmpls["card"]=function(ctx){var $=ctx,out="";out+="\u003ch1\u003e";out+=__g._html_template_htmlescaper(ctx.name);out+="\u003c/h1\u003e";"#
        ));
        assert!(js.contains(
            r#"var it=ctx.powers,any=false;for(var i=0;it&&i<it.length;i++){any=true;(function(ctx,$i,$p){out+=$i;out+=". ";out+=__g._html_template_htmlescaper(ctx.title);})(it[i],i,it[i]);}if(!any){(function(ctx){out+="powerless";})(ctx);}"#
        ));
        assert!(js.contains(
            r#"var v=ctx.Sidekick;if(v){(function(ctx){out+=ctx.title;})(v);}return out;};"#
        ));
        assert!(js.contains(r#"return __tmpls["card"](ctx);"#));
    }

    #[test]
    fn test_compile_reports_location() {
        let t = tree("card", vec![text("x"), show(field(".Nickname"))]);
        let err = compile(t, &Hero::describe()).unwrap_err();
        assert!(matches!(
            err.type_error(),
            Some(TypeError::NoSuchField { field, .. }) if field == "Nickname"
        ));
        assert_eq!(
            err.to_string(),
            r#"tmpljs: card:1:0: executing "card" at <.Nickname>: {name: string, powers: Array.<{title: string}>, Sidekick: {title: string}} has no field "Nickname""#
        );
    }

    #[test]
    fn test_unsupported_root_shape() {
        let root = DataShape::Map {
            key: Box::new(DataShape::String),
            value: Box::new(DataShape::Int),
        };
        let err = compile(tree("t", vec![text("x")]), &root).unwrap_err();
        assert!(matches!(err, CompileError::Extract(_)));
    }

    #[test]
    fn test_tree_loaded_from_json() {
        let json = r#"{
            "name": "hello",
            "text": "Hello, {{.Name}}!",
            "root": {"nodes": [
                {"kind": "text", "pos": 0, "text": "Hello, "},
                {"kind": "action", "pos": 9, "pipe": {"pos": 9, "cmds": [
                    {"pos": 9, "args": [{"kind": "field", "pos": 9, "ident": ["Name"]}]}
                ]}},
                {"kind": "text", "pos": 16, "text": "!"}
            ]}
        }"#;
        let tree = loader::load_tree(json).unwrap();
        let js = compile(tree, &Hero::describe()).unwrap();
        assert!(js.contains(r#"out+="Hello, ";out+=ctx.name;out+="!";"#));
    }

    // ─── Rendering the generated bundle ─────────────────────────────────────

    /// `{a (A): string, B: string, C: [{D: int}], E: [string], Empty: [string],
    /// F: {G: string}, H(): {G: string}}`
    fn page() -> DataShape {
        let g = DataShape::record(vec![FieldShape::new("G", DataShape::String)]);
        DataShape::Record {
            name: Some("Context".to_string()),
            fields: vec![
                FieldShape::renamed("A", DataShape::String, "a"),
                FieldShape::new("B", DataShape::String),
                FieldShape::new(
                    "C",
                    DataShape::sequence(DataShape::record(vec![FieldShape::new("D", DataShape::Int)])),
                ),
                FieldShape::new("E", DataShape::sequence(DataShape::String)),
                FieldShape::new("Empty", DataShape::sequence(DataShape::String)),
                FieldShape::new("F", g.clone()),
            ],
            methods: vec![MethodShape {
                name: "H".to_string(),
                signature: Signature {
                    receiver: false,
                    params: vec![],
                    results: vec![g],
                },
            }],
        }
    }

    const PAGE_DATA: &str =
        r#"{"a":"fieldA","B":"","C":[{"D":4}],"E":["E","E2","E3"],"Empty":[],"F":{"G":"GggGG"}}"#;

    /// Evaluates a compiled bundle against `PAGE_DATA`, with `H` returning `F`.
    fn render(nodes: Vec<crate::parse::Node>) -> String {
        let bundle = compile(tree("index.html", nodes), &page()).unwrap();
        let program = format!(
            "var x={};x.H=function(){{return this.F}};({})(x);",
            PAGE_DATA, bundle
        );
        let mut context = boa_engine::Context::default();
        let value = context
            .eval(boa_engine::Source::from_bytes(program.as_bytes()))
            .unwrap_or_else(|err| panic!("evaluation failed: {}\n{}", err, program));
        value
            .to_string(&mut context)
            .unwrap()
            .to_std_string_escaped()
    }

    #[test]
    fn test_rendered_fixtures() {
        let cases: Vec<(&str, Vec<crate::parse::Node>, &str)> = vec![
            (
                "{{$var := .A}}{{$var}}",
                vec![action(decl(&["$var"], one(field(".A")))), show(var("$var"))],
                "fieldA",
            ),
            (
                "{{range $i, $x := .C}}{{$i}}: {{$x.D}} = {{.D}}{{end}}",
                vec![range(
                    decl(&["$i", "$x"], one(field(".C"))),
                    vec![show(var("$i")), text(": "), show(var("$x.D")), text(" = "), show(field(".D"))],
                    None,
                )],
                "0: 4 = 4",
            ),
            (
                "{{range $i, $x := .E}}{{else}}nop{{end}}",
                vec![range(decl(&["$i", "$x"], one(field(".E"))), vec![], Some(vec![text("nop")]))],
                "",
            ),
            (
                "{{if $x := .A}}{{.A}}{{$x}}{{else}}not{{end}}",
                vec![if_(
                    decl(&["$x"], one(field(".A"))),
                    vec![show(field(".A")), show(var("$x"))],
                    Some(vec![text("not")]),
                )],
                "fieldAfieldA",
            ),
            (
                "{{if $x := .B}}{{.A}}{{$x}}{{else}}not{{end}}",
                vec![if_(
                    decl(&["$x"], one(field(".B"))),
                    vec![show(field(".A")), show(var("$x"))],
                    Some(vec![text("not")]),
                )],
                "not",
            ),
            (
                "{{with $x := .F}}{{.G}}{{$x.G}}{{else}}not{{end}}",
                vec![with(
                    decl(&["$x"], one(field(".F"))),
                    vec![show(field(".G")), show(var("$x.G"))],
                    Some(vec![text("not")]),
                )],
                "GggGGGggGG",
            ),
            (
                "{{with $x := .H}}{{.G}}{{$x.G}}{{end}}",
                vec![with(
                    decl(&["$x"], one(field(".H"))),
                    vec![show(field(".G")), show(var("$x.G"))],
                    None,
                )],
                "GggGGGggGG",
            ),
            ("{{.H.G}}", vec![show(field(".H.G"))], "GggGG"),
        ];
        for (source, nodes, expected) in cases {
            assert_eq!(render(nodes), expected, "rendering {}", source);
        }
    }

    #[test]
    fn test_rendered_empty_arrays_are_false() {
        let cases: Vec<(&str, Vec<crate::parse::Node>, &str)> = vec![
            (
                "{{if .Empty}}yes{{else}}no{{end}}",
                vec![if_(pipe(vec![one(field(".Empty"))]), vec![text("yes")], Some(vec![text("no")]))],
                "no",
            ),
            (
                "{{with .Empty}}yes{{else}}no{{end}}",
                vec![with(pipe(vec![one(field(".Empty"))]), vec![text("yes")], Some(vec![text("no")]))],
                "no",
            ),
            (
                "{{if .E}}yes{{else}}no{{end}}",
                vec![if_(pipe(vec![one(field(".E"))]), vec![text("yes")], Some(vec![text("no")]))],
                "yes",
            ),
            (
                "{{range .Empty}}x{{else}}nop{{end}}",
                vec![range(pipe(vec![one(field(".Empty"))]), vec![text("x")], Some(vec![text("nop")]))],
                "nop",
            ),
            (
                "{{range .E}}{{.}},{{else}}nop{{end}}",
                vec![range(pipe(vec![one(field(".E"))]), vec![show(dot()), text(",")], Some(vec![text("nop")]))],
                "E,E2,E3,",
            ),
            (
                "{{if true}}t{{end}}{{if not .Empty}}!{{end}}",
                vec![
                    if_(pipe(vec![one(boolean(true))]), vec![text("t")], None),
                    if_(
                        pipe(vec![cmd(vec![ident("not"), field(".Empty")])]),
                        vec![text("!")],
                        None,
                    ),
                ],
                "t!",
            ),
        ];
        for (source, nodes, expected) in cases {
            assert_eq!(render(nodes), expected, "rendering {}", source);
        }
    }

    #[test]
    fn test_rendered_shadowing() {
        let cases: Vec<(&str, Vec<crate::parse::Node>, &str)> = vec![
            (
                r#"{{$x := .A}}{{if .A}}{{$x}}|{{$x := "in"}}{{$x}}{{end}}|{{$x}}"#,
                vec![
                    action(decl(&["$x"], one(field(".A")))),
                    if_(
                        pipe(vec![one(field(".A"))]),
                        vec![
                            show(var("$x")),
                            text("|"),
                            action(decl(&["$x"], one(string("in")))),
                            show(var("$x")),
                        ],
                        None,
                    ),
                    text("|"),
                    show(var("$x")),
                ],
                "fieldA|in|fieldA",
            ),
            (
                "{{$x := .A}}{{if .A}}{{$x := $x}}{{$x}}{{end}}",
                vec![
                    action(decl(&["$x"], one(field(".A")))),
                    if_(
                        pipe(vec![one(field(".A"))]),
                        vec![action(decl(&["$x"], one(var("$x")))), show(var("$x"))],
                        None,
                    ),
                ],
                "fieldA",
            ),
            (
                r#"{{$x := .A}}{{if .A}}{{$x = "set"}}{{$x := "in"}}{{$x}}{{end}}|{{$x}}"#,
                vec![
                    action(decl(&["$x"], one(field(".A")))),
                    if_(
                        pipe(vec![one(field(".A"))]),
                        vec![
                            action(assign("$x", one(string("set")))),
                            action(decl(&["$x"], one(string("in")))),
                            show(var("$x")),
                        ],
                        None,
                    ),
                    text("|"),
                    show(var("$x")),
                ],
                "in|set",
            ),
            (
                r#"{{$x := .A}}{{range .E}}{{$x := .}}{{$x}}{{end}}|{{$x}}"#,
                vec![
                    action(decl(&["$x"], one(field(".A")))),
                    range(
                        pipe(vec![one(field(".E"))]),
                        vec![action(decl(&["$x"], one(dot()))), show(var("$x"))],
                        None,
                    ),
                    text("|"),
                    show(var("$x")),
                ],
                "EE2E3|fieldA",
            ),
        ];
        for (source, nodes, expected) in cases {
            assert_eq!(render(nodes), expected, "rendering {}", source);
        }
    }

    #[test]
    fn test_rendered_functions_and_constants() {
        let nodes = vec![
            action(pipe(vec![one(field(".A")), cmd(vec![ident("printf"), string("%s!")])])),
            text(" "),
            action(pipe(vec![one(field(".E")), one(ident("len"))])),
            text(" "),
            action(pipe(vec![one(string("<b>")), one(ident("html"))])),
            text(" "),
            show(number(r"'\n'")),
        ];
        assert_eq!(render(nodes), "fieldA! 3 &lt;b&gt; 10");
    }

    #[test]
    fn test_outputs_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Type>();
        assert_send_sync::<ast::Template>();
        assert_send_sync::<CompileOptions>();
        assert_send_sync::<Tree>();
    }
}
