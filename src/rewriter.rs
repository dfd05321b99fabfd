use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result, Warning};
use crate::graph::CodeGraph;
use crate::matcher::{find_matches, find_matches_for, still_valid, Match};
use crate::partition;
use crate::rules::{RuleRepository, TransformationRule};
use crate::types::{EdgeType, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    SinglePass,
    /// Repeat passes until one applies nothing, at most `max_iterations`
    Fixpoint { max_iterations: usize },
}

/// Result of a bulk transformation.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub graph: CodeGraph,
    /// Passes run, including the final pass that found nothing
    pub passes: usize,
    /// Matches applied over all passes
    pub applied: usize,
    pub warnings: Vec<Warning>,
}

/// Apply `rules` to `graph` in rank order, pass after pass.
///
/// Within one pass a node rewritten by an applied match is consumed: later
/// matches touching it are skipped until the next pass.
pub fn transform(
    mut graph: CodeGraph,
    rules: &[&TransformationRule],
    mode: RewriteMode,
) -> Result<Transformed> {
    let mut passes = 0;
    let mut applied = 0;
    let mut warnings = Vec::new();

    match mode {
        RewriteMode::SinglePass => {
            applied = run_pass(&mut graph, rules)?;
            passes = 1;
        }
        RewriteMode::Fixpoint { max_iterations } => loop {
            if passes >= max_iterations {
                let pending = find_matches(&graph, rules).len();
                if pending > 0 {
                    warn!(iterations = passes, pending, "no fixpoint within the iteration cap");
                    warnings.push(Warning::NonTermination {
                        iterations: passes,
                        pending,
                    });
                }
                break;
            }
            let count = run_pass(&mut graph, rules)?;
            passes += 1;
            applied += count;
            if count == 0 {
                break;
            }
        },
    }

    info!(passes, applied, nodes = graph.node_count(), "transformation finished");
    Ok(Transformed {
        graph,
        passes,
        applied,
        warnings,
    })
}

fn run_pass(graph: &mut CodeGraph, rules: &[&TransformationRule]) -> Result<usize> {
    let matches = find_matches(graph, rules);
    let mut consumed: HashSet<String> = HashSet::new();
    let mut applied = 0;

    for m in &matches {
        let rule = rules[m.rule_index];
        if !still_valid(graph, rule, m, &consumed) {
            debug!(rule = %m.rule_id, root = m.root_seq, "skipping stale match");
            continue;
        }
        apply_match(graph, rule, m)?;
        consumed.extend(m.rewritten().map(|b| b.node_id.clone()));
        applied += 1;
    }

    debug!(found = matches.len(), applied, "rewrite pass");
    Ok(applied)
}

/// Apply the single best match of one rule, automated or not.
///
/// The graph is left untouched when the rule is unknown or does not match.
/// Returns the ids of the created nodes.
pub fn apply_transformation(
    graph: &mut CodeGraph,
    repository: &RuleRepository,
    rule_id: &str,
) -> Result<Vec<String>> {
    let rule = repository
        .get(rule_id)
        .ok_or_else(|| EngineError::UnknownRule {
            rule: rule_id.to_string(),
        })?;
    let matches = find_matches_for(graph, rule);
    let best = matches.first().ok_or_else(|| EngineError::RuleNotApplicable {
        rule: rule_id.to_string(),
    })?;
    apply_match(graph, rule, best)
}

struct EdgeMove {
    id: String,
    source: String,
    target: String,
    kind: EdgeType,
    attributes: BTreeMap<String, String>,
    seq: u64,
}

/// Splice the rule's target fragment in place of the match's rewrite nodes.
///
/// Edges crossing the match boundary keep their id and attributes and are
/// reattached to the boundary-mapped fragment node, or to the fragment root
/// when the rule maps nothing. Matched edges touching rewritten nodes go
/// away with them.
pub fn apply_match(graph: &mut CodeGraph, rule: &TransformationRule, m: &Match) -> Result<Vec<String>> {
    let target = &rule.target_pattern;

    let bound: HashMap<&str, Node> = m
        .bindings
        .iter()
        .filter_map(|b| Some((b.name.as_str(), graph.node(&b.node_id)?.clone())))
        .collect();
    if bound.len() != m.bindings.len() {
        return Err(EngineError::validation(format!(
            "match of '{}' references a missing node",
            rule.id
        )));
    }
    let lookup = |name: &str| bound.get(name);

    // Fragment nodes
    let mut fragment: HashMap<&str, String> = HashMap::new();
    let mut created = Vec::with_capacity(target.nodes.len());
    for template in &target.nodes {
        let (kind, label, attributes) = template.instantiate(lookup).ok_or_else(|| {
            EngineError::validation(format!(
                "rule '{}' cannot build fragment node '{}'",
                rule.id, template.name
            ))
        })?;
        let id = graph.add_node(kind, label, attributes);
        graph.record(&id, &rule.id);
        fragment.insert(template.name.as_str(), id.clone());
        created.push(id);
    }
    let root = target
        .root_name()
        .and_then(|name| fragment.get(name))
        .cloned()
        .ok_or_else(|| EngineError::validation(format!("rule '{}' has no fragment root", rule.id)))?;

    let replacement: HashMap<String, String> = m
        .rewritten()
        .map(|b| {
            let to = target
                .boundary
                .get(&b.name)
                .and_then(|name| fragment.get(name.as_str()))
                .cloned()
                .unwrap_or_else(|| root.clone());
            (b.node_id.clone(), to)
        })
        .collect();

    // Fragment edges, to fragment or context nodes
    for edge in &target.edges {
        let resolve = |name: &str| {
            fragment
                .get(name)
                .cloned()
                .or_else(|| m.node(name).map(str::to_string))
        };
        let (Some(from), Some(to)) = (resolve(&edge.source), resolve(&edge.target)) else {
            return Err(EngineError::validation(format!(
                "rule '{}' has a dangling fragment edge {} -> {}",
                rule.id, edge.source, edge.target
            )));
        };
        graph.add_edge(&from, &to, edge.kind, BTreeMap::new())?;
    }

    // Boundary edges
    let matched: HashSet<&str> = m.edges.iter().map(|e| e.edge_id.as_str()).collect();
    let mut seen = HashSet::new();
    let mut moves = Vec::new();
    for binding in m.rewritten() {
        let incident = graph
            .outgoing(&binding.node_id, None)
            .into_iter()
            .chain(graph.incoming(&binding.node_id, None));
        for view in incident {
            let id = view.edge.id.as_str();
            if matched.contains(id) || !seen.insert(id.to_string()) {
                continue;
            }
            let moved = |end: &Node| {
                replacement
                    .get(&end.id)
                    .cloned()
                    .unwrap_or_else(|| end.id.clone())
            };
            moves.push(EdgeMove {
                id: id.to_string(),
                source: moved(view.source),
                target: moved(view.target),
                kind: view.edge.kind,
                attributes: view.edge.attributes.clone(),
                seq: view.edge.seq,
            });
        }
    }

    for edge in &moves {
        graph.remove_edge(&edge.id);
    }
    for binding in m.rewritten() {
        graph.remove_node(&binding.node_id);
        if let Some(to) = replacement.get(&binding.node_id) {
            graph.forward(&binding.node_id, to);
        }
    }
    for edge in moves {
        if edge.kind == EdgeType::Contains && edge.source == edge.target {
            debug!(edge = %edge.id, "dropping contains self-loop");
            continue;
        }
        graph.insert_edge(edge.id, &edge.source, &edge.target, edge.kind, edge.attributes, edge.seq)?;
    }

    debug!(rule = %rule.id, root = %root, created = created.len(), "applied match");
    Ok(created)
}

/// Transform each top-level declaration on its own worker, then merge.
///
/// Only valid for intra-declaration rules; with any cross-declaration rule
/// the whole graph is transformed at once.
pub fn transform_partitioned(
    graph: CodeGraph,
    rules: &[&TransformationRule],
    mode: RewriteMode,
) -> Result<Transformed> {
    if rules.iter().any(|r| r.cross_declaration) {
        debug!("cross-declaration rules present, transforming sequentially");
        return transform(graph, rules, mode);
    }

    let (parts, layout) = partition::split(&graph)?;
    info!(parts = parts.len(), "transforming partitions in parallel");

    let results: Vec<Transformed> = parts
        .into_par_iter()
        .map(|part| transform(part, rules, mode))
        .collect::<Result<_>>()?;

    let passes = results.iter().map(|t| t.passes).max().unwrap_or(0);
    let applied = results.iter().map(|t| t.applied).sum();
    let mut warnings = Vec::new();
    let mut parts = Vec::with_capacity(results.len());
    for result in results {
        warnings.extend(result.warnings);
        parts.push(result.graph);
    }

    let merged = partition::merge(&graph, layout, parts)?;
    Ok(Transformed {
        graph: merged,
        passes,
        applied,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_builder::build_graph;
    use crate::parser::parse;
    use crate::types::NodeType;
    use pretty_assertions::assert_eq;

    fn graph_of(src: &str) -> CodeGraph {
        build_graph(&parse(src).unwrap().ast).unwrap()
    }

    fn fixpoint(graph: CodeGraph) -> Transformed {
        let repository = RuleRepository::builtin().unwrap();
        transform(
            graph,
            &repository.automated(),
            RewriteMode::Fixpoint { max_iterations: 32 },
        )
        .unwrap()
    }

    fn edges_of(graph: &CodeGraph) -> Vec<(EdgeType, String, String)> {
        graph
            .edges()
            .into_iter()
            .map(|e| (e.edge.kind, e.source.label.clone(), e.target.label.clone()))
            .collect()
    }

    #[test]
    fn class_becomes_interface_in_place() {
        let mut graph = graph_of("abstract class Shape { abstract double area(); }\nclass Circle extends Shape { }");
        let repository = RuleRepository::builtin().unwrap();
        let created = apply_transformation(&mut graph, &repository, "rule-1").unwrap();

        assert_eq!(created.len(), 1);
        let iface = graph.node(&created[0]).unwrap();
        assert_eq!(iface.kind, NodeType::Interface);
        assert_eq!(iface.label, "Shape");
        assert_eq!(iface.attr("modifiers"), None);
        assert!(graph.node("n0").is_none());
        // Both the member and the subtype follow the replacement
        assert_eq!(
            edges_of(&graph),
            vec![
                (EdgeType::Contains, "Shape".to_string(), "area".to_string()),
                (EdgeType::Extends, "Circle".to_string(), "Shape".to_string()),
            ]
        );
        assert_eq!(graph.edges()[0].edge.id, "e0");
        assert_eq!(graph.history()[0].rule_id, "rule-1");
    }

    #[test]
    fn unknown_and_inapplicable_rules() {
        let mut graph = graph_of("class A { void f() {} }");
        let before = graph.to_data();
        let repository = RuleRepository::builtin().unwrap();
        assert!(matches!(
            apply_transformation(&mut graph, &repository, "rule-42"),
            Err(EngineError::UnknownRule { .. })
        ));
        assert!(matches!(
            apply_transformation(&mut graph, &repository, "rule-1"),
            Err(EngineError::RuleNotApplicable { .. })
        ));
        assert_eq!(graph.to_data(), before);
    }

    #[test]
    fn inner_class_extraction_keeps_calls() {
        let mut graph = graph_of(
            "class Outer {\n void run() { helper(); }\n class Inner { void helper() { } }\n}",
        );
        let repository = RuleRepository::builtin().unwrap();
        apply_transformation(&mut graph, &repository, "rule-3").unwrap();

        let classes = graph.nodes_of(NodeType::Class);
        assert_eq!(classes.len(), 2);
        assert!(graph
            .edges()
            .iter()
            .all(|e| !(e.edge.kind == EdgeType::Contains && e.target.kind == NodeType::Class)));
        assert_eq!(
            edges_of(&graph),
            vec![
                (EdgeType::Contains, "Outer".to_string(), "run".to_string()),
                (EdgeType::Contains, "Inner".to_string(), "helper".to_string()),
                (EdgeType::Calls, "run".to_string(), "helper".to_string()),
            ]
        );
        let inner = classes.iter().find(|c| c.label == "Inner").unwrap();
        assert_eq!(inner.attr("extractedFrom"), Some("Outer"));
    }

    #[test]
    fn getter_and_setter_reach_a_fixpoint() {
        let graph = graph_of(
            "class User {\n private String name;\n public String getName() { return name; }\n public void setName(String name) { this.name = name; }\n}",
        );
        let result = fixpoint(graph);
        assert!(result.warnings.is_empty());
        assert_eq!(result.applied, 2);
        assert_eq!(result.passes, 3);

        let graph = &result.graph;
        let labels: Vec<(NodeType, String)> = graph
            .nodes()
            .into_iter()
            .map(|n| (n.kind, n.label.clone()))
            .collect();
        assert_eq!(
            labels,
            vec![
                (NodeType::Class, "User".to_string()),
                (NodeType::Accessor, "name".to_string()),
                (NodeType::Accessor, "name".to_string()),
                (NodeType::Field, "_name".to_string()),
            ]
        );
        let kinds: Vec<&str> = graph
            .nodes_of(NodeType::Accessor)
            .iter()
            .map(|n| n.attr_or_empty("accessorKind"))
            .collect();
        assert_eq!(kinds, vec!["get", "set"]);
    }

    #[test]
    fn consumed_nodes_wait_for_the_next_pass() {
        let graph = graph_of("class Outer {\n static class Inner {\n static int f() { return 1; }\n }\n}");
        let repository = RuleRepository::builtin().unwrap();
        let single = transform(graph.clone(), &repository.automated(), RewriteMode::SinglePass).unwrap();
        // rule-3 wins the first pass; rule-2 still matched Inner as context
        assert_eq!(single.applied, 1);
        assert_eq!(single.graph.nodes_of(NodeType::Method).len(), 1);

        let result = fixpoint(graph);
        assert_eq!(result.applied, 2);
        assert_eq!(result.graph.nodes_of(NodeType::Function).len(), 1);
        let stripped = &result.graph.nodes_of(NodeType::Class)[1];
        assert_eq!(stripped.attr("modifiers"), None);
    }

    #[test]
    fn iteration_cap_reports_non_termination() {
        // Re-matches its own output forever
        let json = r#"[{"id": "spin", "name": "Spin", "confidence": 50,
            "sourcePattern": {"nodes": [{"name": "c", "role": "rewrite", "kinds": ["class"]}]},
            "targetPattern": {"nodes": [{"name": "d", "copyFrom": "c"}]}}]"#;
        let repository = RuleRepository::from_json(json).unwrap();
        let result = transform(
            graph_of("class A {}"),
            &repository.automated(),
            RewriteMode::Fixpoint { max_iterations: 3 },
        )
        .unwrap();
        assert_eq!(result.passes, 3);
        assert_eq!(
            result.warnings,
            vec![Warning::NonTermination {
                iterations: 3,
                pending: 1
            }]
        );
        assert_eq!(result.graph.node_count(), 1);
        assert_eq!(result.graph.history().len(), 3);
    }

    #[test]
    fn unmapped_boundary_edges_attach_to_root() {
        let mut graph = graph_of("class A { void run(java.util.List<String> xs) { for (String x : xs) { go(); } } void go() {} }");
        let repository = RuleRepository::builtin().unwrap();
        let created = apply_transformation(&mut graph, &repository, "rule-5").unwrap();
        let array_method = graph.node(&created[0]).unwrap();
        assert_eq!(array_method.kind, NodeType::ArrayMethod);
        assert_eq!(array_method.attr("iterable"), Some("xs"));
        assert_eq!(graph.parent(&created[0]).map(|n| n.label.as_str()), Some("run"));
        assert_eq!(graph.forwarding().get("n2"), Some(&created[0]));
    }

    #[test]
    fn partitioned_transform_matches_sequential_shape() {
        let src = "class A { static void f() { B.g(); } }\nclass B { static void g() {} class C {} }";
        let repository = RuleRepository::builtin().unwrap();
        let rules = repository.automated();
        let mode = RewriteMode::Fixpoint { max_iterations: 32 };

        let sequential = transform(graph_of(src), &rules, mode).unwrap();
        let parallel = transform_partitioned(graph_of(src), &rules, mode).unwrap();

        assert_eq!(parallel.applied, sequential.applied);
        assert_eq!(parallel.graph.node_count(), sequential.graph.node_count());
        assert_eq!(parallel.graph.edge_count(), sequential.graph.edge_count());
        let calls: Vec<(String, String)> = parallel
            .graph
            .edges()
            .into_iter()
            .filter(|e| e.edge.kind == EdgeType::Calls)
            .map(|e| (e.source.label.clone(), e.target.label.clone()))
            .collect();
        assert_eq!(calls, vec![("f".to_string(), "g".to_string())]);
        assert!(parallel
            .graph
            .nodes_of(NodeType::Function)
            .iter()
            .all(|n| !n.id.contains('.')));
    }
}
