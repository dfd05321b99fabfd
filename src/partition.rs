//! Split a graph into one part per top-level declaration and merge the
//! parts back after they were transformed independently.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::warn;

use crate::error::{EngineError, Result};
use crate::graph::CodeGraph;
use crate::types::{AppliedRule, EdgeType, Node};

/// Edge whose endpoints fall into different parts.
#[derive(Debug, Clone)]
pub struct CrossEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeType,
    pub attributes: BTreeMap<String, String>,
    pub seq: u64,
}

/// Where every node and edge of the original graph went.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    node_part: HashMap<String, usize>,
    edge_part: HashMap<String, usize>,
    pub cross_edges: Vec<CrossEdge>,
}

impl Layout {
    pub fn part_of(&self, node_id: &str) -> Option<usize> {
        self.node_part.get(node_id).copied()
    }
}

/// One part per `contains` tree rooted at a node without a parent. Nodes
/// only reachable through a containment cycle share a last part.
pub fn split(graph: &CodeGraph) -> Result<(Vec<CodeGraph>, Layout)> {
    let mut layout = Layout::default();
    let mut groups: Vec<Vec<&Node>> = Vec::new();

    for node in graph.nodes() {
        if layout.node_part.contains_key(&node.id)
            || !graph.incoming(&node.id, Some(EdgeType::Contains)).is_empty()
        {
            continue;
        }
        let index = groups.len();
        let mut members = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if layout.node_part.contains_key(&current.id) {
                continue;
            }
            layout.node_part.insert(current.id.clone(), index);
            members.push(current);
            stack.extend(graph.children(&current.id).into_iter().rev());
        }
        groups.push(members);
    }

    let leftovers: Vec<&Node> = graph
        .nodes()
        .into_iter()
        .filter(|n| !layout.node_part.contains_key(&n.id))
        .collect();
    if !leftovers.is_empty() {
        let index = groups.len();
        for node in &leftovers {
            layout.node_part.insert(node.id.clone(), index);
        }
        groups.push(leftovers);
    }

    let mut parts = Vec::with_capacity(groups.len());
    for (index, mut members) in groups.into_iter().enumerate() {
        members.sort_by_key(|n| n.seq);
        let mut part = CodeGraph::with_namespace(format!("p{}.", index));
        for node in members {
            part.add_node_with_id(
                node.id.clone(),
                node.kind,
                node.label.clone(),
                node.attributes.clone(),
            )?;
        }
        parts.push(part);
    }

    for view in graph.edges() {
        let (Some(from), Some(to)) = (
            layout.part_of(&view.source.id),
            layout.part_of(&view.target.id),
        ) else {
            return Err(EngineError::validation(format!(
                "edge '{}' has an unassigned endpoint",
                view.edge.id
            )));
        };
        if from == to {
            parts[from].insert_edge(
                view.edge.id.clone(),
                &view.source.id,
                &view.target.id,
                view.edge.kind,
                view.edge.attributes.clone(),
                view.edge.seq,
            )?;
            layout.edge_part.insert(view.edge.id.clone(), from);
        } else {
            layout.cross_edges.push(CrossEdge {
                id: view.edge.id.clone(),
                source: view.source.id.clone(),
                target: view.target.id.clone(),
                kind: view.edge.kind,
                attributes: view.edge.attributes.clone(),
                seq: view.edge.seq,
            });
        }
    }

    Ok((parts, layout))
}

// Follow a part's forwarding chain to a node that still exists there.
fn resolve_in_part(part: &CodeGraph, id: &str) -> Option<String> {
    let mut current = id.to_string();
    let mut hops = 0;
    while !part.contains_node(&current) {
        current = part.forwarding().get(&current)?.clone();
        hops += 1;
        if hops > part.forwarding().len() {
            return None;
        }
    }
    Some(current)
}

fn fresh_id(prefix: &str, counter: &mut usize, taken: &HashSet<String>) -> String {
    loop {
        let id = format!("{}{}", prefix, counter);
        *counter += 1;
        if !taken.contains(&id) {
            return id;
        }
    }
}

/// Reassemble transformed parts into one graph.
///
/// Surviving original nodes and edges keep their ids and relative order.
/// Nodes and edges created inside a part get fresh global ids, ordered by
/// part and then by creation within the part. Cross-part edges are
/// re-resolved through each part's forwarding map.
pub fn merge(original: &CodeGraph, layout: Layout, parts: Vec<CodeGraph>) -> Result<CodeGraph> {
    let mut taken_nodes: HashSet<String> = original.nodes().iter().map(|n| n.id.clone()).collect();
    taken_nodes.extend(original.history().iter().map(|h| h.node_id.clone()));
    let taken_edges: HashSet<String> = original
        .edges()
        .iter()
        .map(|e| e.edge.id.clone())
        .collect();

    // Node order: originals by original sequence, then fresh by (part, seq)
    let mut node_order: Vec<((u8, u64, u64), usize, &Node)> = Vec::new();
    for (index, part) in parts.iter().enumerate() {
        for node in part.nodes() {
            let key = match original.node(&node.id) {
                Some(orig) if layout.part_of(&node.id) == Some(index) => (0, orig.seq, 0),
                _ => (1, index as u64, node.seq),
            };
            node_order.push((key, index, node));
        }
    }
    node_order.sort_by_key(|(key, _, _)| *key);

    let mut rename: Vec<HashMap<String, String>> = vec![HashMap::new(); parts.len()];
    let mut merged = CodeGraph::new();
    let mut counter = original.node_count();
    for ((origin, _, _), index, node) in &node_order {
        let id = if *origin == 0 {
            node.id.clone()
        } else {
            fresh_id("n", &mut counter, &taken_nodes)
        };
        rename[*index].insert(node.id.clone(), id.clone());
        merged.add_node_with_id(id, node.kind, node.label.clone(), node.attributes.clone())?;
    }

    // Edge order: originals (part or cross) by sequence, then fresh
    struct Planned {
        key: (u8, u64, u64),
        id: Option<String>,
        source: String,
        target: String,
        kind: EdgeType,
        attributes: BTreeMap<String, String>,
    }
    let mut planned = Vec::new();
    for (index, part) in parts.iter().enumerate() {
        for view in part.edges() {
            let (Some(source), Some(target)) = (
                rename[index].get(&view.source.id),
                rename[index].get(&view.target.id),
            ) else {
                continue;
            };
            let is_original = layout.edge_part.get(&view.edge.id) == Some(&index);
            planned.push(Planned {
                key: if is_original {
                    (0, view.edge.seq, 0)
                } else {
                    (1, index as u64, view.edge.seq)
                },
                id: is_original.then(|| view.edge.id.clone()),
                source: source.clone(),
                target: target.clone(),
                kind: view.edge.kind,
                attributes: view.edge.attributes.clone(),
            });
        }
    }
    for edge in &layout.cross_edges {
        let resolve = |id: &str| {
            let index = layout.part_of(id)?;
            let local = resolve_in_part(parts.get(index)?, id)?;
            rename[index].get(&local).cloned()
        };
        match (resolve(&edge.source), resolve(&edge.target)) {
            (Some(source), Some(target)) => planned.push(Planned {
                key: (0, edge.seq, 0),
                id: Some(edge.id.clone()),
                source,
                target,
                kind: edge.kind,
                attributes: edge.attributes.clone(),
            }),
            _ => warn!(edge = %edge.id, "dropping cross-part edge with a removed endpoint"),
        }
    }
    planned.sort_by_key(|p| p.key);

    let mut counter = original.edge_count();
    for (seq, edge) in planned.into_iter().enumerate() {
        let id = match edge.id {
            Some(id) => id,
            None => fresh_id("e", &mut counter, &taken_edges),
        };
        merged.insert_edge(id, &edge.source, &edge.target, edge.kind, edge.attributes, seq as u64)?;
    }

    // History and forwarding, with fresh ids renamed
    merged.extend_history(original.history().iter().cloned());
    for (index, part) in parts.iter().enumerate() {
        merged.extend_history(part.history().iter().map(|entry| AppliedRule {
            node_id: rename[index]
                .get(&entry.node_id)
                .cloned()
                .unwrap_or_else(|| entry.node_id.clone()),
            rule_id: entry.rule_id.clone(),
        }));
        for old in part.forwarding().keys() {
            if !original.contains_node(old) {
                continue;
            }
            if let Some(to) = resolve_in_part(part, old).and_then(|local| rename[index].get(&local)) {
                merged.forward(old, to);
            }
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_builder::build_graph;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn graph_of(src: &str) -> CodeGraph {
        build_graph(&parse(src).unwrap().ast).unwrap()
    }

    const SRC: &str = "class A { void f() { g(); } }\nclass B { void g() { } class C { } }";

    #[test]
    fn one_part_per_top_level_declaration() {
        let graph = graph_of(SRC);
        let (parts, layout) = split(&graph).unwrap();
        let sizes: Vec<usize> = parts.iter().map(CodeGraph::node_count).collect();
        assert_eq!(sizes, vec![2, 3]);
        assert_eq!(layout.part_of("n4"), Some(1));
        // f -> g crosses the parts
        assert_eq!(layout.cross_edges.len(), 1);
        assert_eq!(layout.cross_edges[0].kind, EdgeType::Calls);
    }

    #[test]
    fn merge_of_untouched_parts_is_identity() {
        let mut graph = graph_of(SRC);
        graph.record("n1", "rule-x");
        let (parts, layout) = split(&graph).unwrap();
        let merged = merge(&graph, layout, parts).unwrap();
        assert_eq!(merged.to_data(), graph.to_data());
    }

    #[test]
    fn fresh_nodes_get_global_ids_and_cross_edges_follow() {
        let graph = graph_of(SRC);
        let (mut parts, layout) = split(&graph).unwrap();

        // Replace g in the second part the way a rewrite would
        let part = &mut parts[1];
        let new_id = part.add_node(crate::types::NodeType::Function, "g", BTreeMap::new());
        assert!(new_id.starts_with("p1."));
        part.remove_node("n3");
        part.forward("n3", &new_id);

        let merged = merge(&graph, layout, parts).unwrap();
        let function = merged.nodes_of(crate::types::NodeType::Function)[0];
        assert_eq!(function.id, "n5");
        let calls: Vec<(String, String)> = merged
            .edges()
            .into_iter()
            .filter(|e| e.edge.kind == EdgeType::Calls)
            .map(|e| (e.source.id.clone(), e.target.id.clone()))
            .collect();
        assert_eq!(calls, vec![("n1".to_string(), "n5".to_string())]);
        assert_eq!(merged.forwarding().get("n3").map(String::as_str), Some("n5"));
    }
}
