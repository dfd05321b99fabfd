use codebridge::ast::AstKind;
use codebridge::types::{EdgeType, NodeType};
use codebridge::{CodeGraph, Engine, EngineConfig, EngineError};
use pretty_assertions::assert_eq;
use serde_json::Value;

fn engine() -> Engine {
    Engine::from_config(EngineConfig::default()).unwrap()
}

fn graph_of(engine: &Engine, src: &str) -> CodeGraph {
    engine.ast_to_graph(&engine.parse(src).unwrap().ast).unwrap()
}

#[test]
fn class_with_one_method() {
    let engine = engine();
    let parsed = engine.parse("class Greeter { void greet() { } }").unwrap();
    assert!(parsed.diagnostics.is_empty());
    assert_eq!(parsed.ast.count_kind(AstKind::Class), 1);
    assert_eq!(parsed.ast.count_kind(AstKind::Method), 1);

    let graph = engine.ast_to_graph(&parsed.ast).unwrap();
    assert_eq!(graph.node_count(), 2);
    let edges: Vec<EdgeType> = graph.edges().iter().map(|e| e.edge.kind).collect();
    assert_eq!(edges, vec![EdgeType::Contains]);
}

#[test]
fn abstract_class_becomes_interface() {
    let engine = engine();
    let mut graph = graph_of(
        &engine,
        "abstract class Shape { abstract double area(); abstract double perimeter(); }",
    );
    engine.apply_transformation(&mut graph, "rule-1").unwrap();

    let shape = graph
        .nodes()
        .into_iter()
        .find(|n| n.label == "Shape")
        .unwrap();
    assert_eq!(shape.kind, NodeType::Interface);
    assert!(engine.get_stats(&graph).rules_applied.contains(&"rule-1".to_string()));
    assert_eq!(
        engine.generate_code(&graph).unwrap(),
        "interface Shape {\n  area(): number;\n  perimeter(): number;\n}\n"
    );
}

#[test]
fn inner_class_is_extracted_and_calls_survive() {
    let engine = engine();
    let mut graph = graph_of(
        &engine,
        "class Outer { void run() { helper(); } class Inner { void helper() { } } }",
    );
    engine.apply_transformation(&mut graph, "rule-3").unwrap();

    let classes = graph.nodes_of(NodeType::Class);
    assert_eq!(classes.len(), 2);
    for edge in graph.edges() {
        if edge.edge.kind == EdgeType::Contains {
            assert!(!(edge.source.kind == NodeType::Class && edge.target.kind == NodeType::Class));
        }
    }
    let calls: Vec<(String, String)> = graph
        .edges()
        .into_iter()
        .filter(|e| e.edge.kind == EdgeType::Calls)
        .map(|e| (e.source.label.clone(), e.target.label.clone()))
        .collect();
    assert_eq!(calls, vec![("run".to_string(), "helper".to_string())]);

    let inner = classes.iter().find(|c| c.label == "Inner").unwrap();
    assert_eq!(inner.attr("extractedFrom"), Some("Outer"));
}

#[test]
fn unbalanced_brace_is_recoverable() {
    let engine = engine();
    let parsed = engine.parse("class A { void f() { int x = 1; }").unwrap();
    assert!(!parsed.diagnostics.is_empty());
    assert!(!parsed.ast.children.is_empty());
    // The graph still builds from what was recovered
    assert!(engine.ast_to_graph(&parsed.ast).unwrap().node_count() >= 1);
}

#[test]
fn transforming_a_stable_graph_twice_changes_nothing() {
    let engine = engine();
    let input = graph_of(&engine, "class A { void f() { } }").to_json().unwrap();

    let first = engine.transform_graph_json(&input).unwrap();
    let second = engine.transform_graph_json(&first).unwrap();
    assert_eq!(first, second);

    let before: Value = serde_json::from_str(&input).unwrap();
    let after: Value = serde_json::from_str(&first).unwrap();
    assert_eq!(before, after);
}

#[test]
fn unknown_rule_and_empty_input_are_errors() {
    let engine = engine();
    let mut graph = graph_of(&engine, "class A { }");
    assert!(matches!(
        engine.apply_transformation(&mut graph, "rule-99"),
        Err(EngineError::UnknownRule { .. })
    ));
    assert!(matches!(engine.parse("   \n "), Err(EngineError::EmptyInput)));
}

#[test]
fn dangling_edges_in_graph_json_are_rejected() {
    let engine = engine();
    let json = r#"{"nodes": [{"id": "n0", "label": "A", "type": "class", "attributes": {}}],
                   "edges": [{"id": "e0", "source": "n0", "target": "n7", "label": "contains"}]}"#;
    assert!(matches!(
        engine.transform_graph_json(json),
        Err(EngineError::GraphValidation { .. })
    ));
}

#[test]
fn ui_fields_are_ignored_on_load() {
    let engine = engine();
    let json = r#"{"nodes": [{"id": "n0", "label": "A", "type": "class", "attributes": {}},
                             {"id": "n1", "label": "f", "type": "method", "attributes": {"body": ""}}],
                   "edges": [{"id": "e0", "source": "n0", "target": "n1", "label": "contains",
                              "highlighted": true}]}"#;
    assert_eq!(engine.generate_code_json(json).unwrap(), "class A {\n  f() {}\n}\n");
}

#[test]
fn getters_and_setters_become_accessors() {
    let conversion = engine()
        .convert(
            "public class User {
                 private String name;
                 public String getName() { return name; }
                 public void setName(String name) { this.name = name; }
             }",
        )
        .unwrap();
    assert_eq!(
        conversion.code,
        "export class User {
  private _name: string;

  public get name(): string {
    return this._name;
  }

  public set name(name: string) {
    this._name = name;
  }
}
"
    );
    assert_eq!(conversion.stats.rules_applied, vec!["rule-4"]);
    assert_eq!(conversion.stats.confidence, 85);
    assert_eq!(conversion.stats.transformed_nodes, 3);
}

#[test]
fn static_helpers_become_module_functions() {
    let conversion = engine()
        .convert(
            "public class MathUtils {
                 private static final int BASE = 10;
                 public static int scale(int x) { return x * BASE; }
                 public int twice(int x) { return MathUtils.scale(x) + scale(x); }
             }",
        )
        .unwrap();
    assert_eq!(
        conversion.code,
        "export class MathUtils {
  private static readonly BASE: number = 10;

  public twice(x: number): number {
    return scale(x) + scale(x);
  }
}

export function scale(x: number): number {
  return x * MathUtils.BASE;
}
"
    );
}

#[test]
fn manual_loop_rule_renders_array_method() {
    let engine = engine();
    let mut graph = graph_of(
        &engine,
        "class Printer { void print(List<String> items) { for (String s : items) { System.out.println(s); } } }",
    );
    engine.apply_transformation(&mut graph, "rule-5").unwrap();
    assert_eq!(
        engine.generate_code(&graph).unwrap(),
        "class Printer {
  print(items: string[]): void {
    items.forEach((s) => {
      console.log(s);
    });
  }
}
"
    );
}

#[test]
fn rule_listing_matches_catalog() {
    let rules: Value = serde_json::from_str(&engine().list_rules_json().unwrap()).unwrap();
    let ids: Vec<&str> = rules
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["rule-1", "rule-2", "rule-3", "rule-4", "rule-5"]);
    assert_eq!(rules[4]["automated"], false);
    assert_eq!(rules[0]["confidence"], 95);
}

#[test]
fn labeled_loops_survive_conversion() {
    let conversion = engine()
        .convert("class Search { void scan() { outer: for (int i = 0; i < 3; i++) { break outer; } } }")
        .unwrap();
    assert!(conversion.diagnostics.is_empty());
    assert!(
        conversion.code.contains("outer: for (let i: number = 0; i < 3; i++) {\n      break outer;\n    }"),
        "{}",
        conversion.code
    );
}

#[test]
fn stray_closers_do_not_stall_the_pipeline() {
    let conversion = engine()
        .convert("class A { void f() { ) } void g() { x = 1; ] } }")
        .unwrap();
    assert_eq!(conversion.diagnostics.len(), 2);
    assert!(conversion.code.contains("class A {"));
}
