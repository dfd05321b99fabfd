use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::graph::CodeGraph;
use crate::rules::RuleRepository;

/// Summary of what the rewrites did to a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformationStats {
    pub total_nodes: usize,
    /// Distinct nodes produced by a rule that are still in the graph
    pub transformed_nodes: usize,
    /// Rule ids in order of first application
    pub rules_applied: Vec<String>,
    /// Rounded mean rule confidence over the transformed nodes
    pub confidence: u32,
}

pub fn compute(graph: &CodeGraph, repository: &RuleRepository) -> TransformationStats {
    let mut transformed = HashSet::new();
    let mut seen_rules = HashSet::new();
    let mut rules_applied = Vec::new();
    let mut total = 0u64;
    let mut counted = 0u64;

    for entry in graph.history() {
        if seen_rules.insert(entry.rule_id.as_str()) {
            rules_applied.push(entry.rule_id.clone());
        }
        if !graph.contains_node(&entry.node_id) {
            continue;
        }
        transformed.insert(entry.node_id.as_str());
        match repository.get(&entry.rule_id) {
            Some(rule) => {
                total += u64::from(rule.confidence);
                counted += 1;
            }
            None => warn!(rule = %entry.rule_id, node = %entry.node_id, "history names an unknown rule"),
        }
    }

    let confidence = if counted == 0 {
        100
    } else {
        ((total as f64) / (counted as f64)).round() as u32
    };

    TransformationStats {
        total_nodes: graph.node_count(),
        transformed_nodes: transformed.len(),
        rules_applied,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeType;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn graph_with(nodes: usize) -> CodeGraph {
        let mut graph = CodeGraph::new();
        for i in 0..nodes {
            graph.add_node(NodeType::Class, format!("C{}", i), BTreeMap::new());
        }
        graph
    }

    #[test]
    fn untouched_graph_is_fully_confident() {
        let repository = RuleRepository::builtin().unwrap();
        let stats = compute(&graph_with(3), &repository);
        assert_eq!(
            stats,
            TransformationStats {
                total_nodes: 3,
                transformed_nodes: 0,
                rules_applied: vec![],
                confidence: 100,
            }
        );
    }

    #[test]
    fn mean_over_surviving_history() {
        let repository = RuleRepository::builtin().unwrap();
        let mut graph = graph_with(3);
        graph.record("n0", "rule-1");
        graph.record("n1", "rule-4");
        graph.record("n1", "rule-4");
        // Replaced later; only counts towards rulesApplied
        graph.record("n9", "rule-2");
        graph.record("n2", "custom");

        let stats = compute(&graph, &repository);
        assert_eq!(stats.transformed_nodes, 3);
        assert_eq!(stats.rules_applied, vec!["rule-1", "rule-4", "rule-2", "custom"]);
        // (95 + 85 + 85) / 3
        assert_eq!(stats.confidence, 88);
    }

    #[test]
    fn serializes_camel_case() {
        let repository = RuleRepository::builtin().unwrap();
        let json = serde_json::to_value(compute(&graph_with(1), &repository)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "totalNodes": 1,
                "transformedNodes": 0,
                "rulesApplied": [],
                "confidence": 100
            })
        );
    }
}
