use std::cmp::Reverse;
use std::collections::HashSet;

use tracing::{debug, warn};

use crate::graph::CodeGraph;
use crate::pattern::{PatternNode, Role, SourcePattern};
use crate::rules::TransformationRule;
use crate::types::{EdgeType, Node};

/// Upper bound on embeddings collected for one rule in one search.
pub const MAX_MATCHES_PER_RULE: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Pattern node name
    pub name: String,
    pub node_id: String,
    pub seq: u64,
    pub rewrite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedEdge {
    pub edge_id: String,
    pub source: String,
    pub target: String,
}

/// One embedding of a rule's source pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub rule_id: String,
    /// Position of the rule in the rule list the search ran over
    pub rule_index: usize,
    pub confidence: u32,
    /// Bindings in pattern declaration order
    pub bindings: Vec<Binding>,
    /// One graph edge per pattern edge, in pattern order
    pub edges: Vec<MatchedEdge>,
    /// Sequence of the first rewrite node
    pub root_seq: u64,
}

impl Match {
    pub fn node(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.node_id.as_str())
    }

    pub fn rewritten(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter().filter(|b| b.rewrite)
    }

    fn rank_key(&self) -> (Reverse<u32>, usize, u64, Vec<u64>) {
        (
            Reverse(self.confidence),
            self.rule_index,
            self.root_seq,
            self.bindings.iter().map(|b| b.seq).collect(),
        )
    }
}

/// Find every embedding of every rule, ranked: confidence descending, then
/// rule position, then root node sequence, then the remaining bound node
/// sequences.
pub fn find_matches(graph: &CodeGraph, rules: &[&TransformationRule]) -> Vec<Match> {
    let mut matches: Vec<Match> = rules
        .iter()
        .enumerate()
        .flat_map(|(index, rule)| match_rule(graph, rule, index))
        .collect();
    rank(&mut matches);
    matches
}

/// Embeddings of a single rule, ranked.
pub fn find_matches_for(graph: &CodeGraph, rule: &TransformationRule) -> Vec<Match> {
    let mut matches = match_rule(graph, rule, 0);
    rank(&mut matches);
    matches
}

pub fn rank(matches: &mut [Match]) {
    matches.sort_by_cached_key(Match::rank_key);
}

fn children_of<'g>(graph: &'g CodeGraph, node: &Node, edge: EdgeType) -> Vec<&'g Node> {
    graph
        .outgoing(&node.id, Some(edge))
        .into_iter()
        .map(|e| e.target)
        .collect()
}

fn accepts(graph: &CodeGraph, pattern: &PatternNode, node: &Node) -> bool {
    pattern.filter.accepts(node)
        && pattern
            .children
            .as_ref()
            .is_none_or(|test| test.accepts(&children_of(graph, node, test.edge)))
}

fn match_rule(graph: &CodeGraph, rule: &TransformationRule, rule_index: usize) -> Vec<Match> {
    let pattern = &rule.source_pattern;

    // Predicate pruning before any structural search
    let candidates: Vec<Vec<&Node>> = pattern
        .nodes
        .iter()
        .map(|p| {
            graph
                .nodes()
                .into_iter()
                .filter(|n| accepts(graph, p, n))
                .collect()
        })
        .collect();
    if candidates.iter().any(Vec::is_empty) {
        return Vec::new();
    }

    let edges: Vec<(usize, usize, EdgeType)> = pattern
        .edges
        .iter()
        .filter_map(|e| Some((pattern.position(&e.source)?, pattern.position(&e.target)?, e.kind)))
        .collect();

    let mut search = Search {
        graph,
        pattern,
        edges,
        candidate_ids: candidates
            .iter()
            .map(|list| list.iter().map(|n| n.id.as_str()).collect())
            .collect(),
        candidates,
        bound: Vec::new(),
        found: Vec::new(),
    };
    search.extend();
    if search.found.len() >= MAX_MATCHES_PER_RULE {
        warn!(rule = %rule.id, limit = MAX_MATCHES_PER_RULE, "match search truncated");
    }

    let matches: Vec<Match> = search
        .found
        .iter()
        .filter_map(|bound| {
            let edges = assign_edges(graph, &search.edges, bound)?;
            let bindings: Vec<Binding> = pattern
                .nodes
                .iter()
                .zip(bound)
                .map(|(p, n)| Binding {
                    name: p.name.clone(),
                    node_id: n.id.clone(),
                    seq: n.seq,
                    rewrite: p.role == Role::Rewrite,
                })
                .collect();
            let root_seq = bindings
                .iter()
                .find(|b| b.rewrite)
                .map(|b| b.seq)
                .unwrap_or_default();
            Some(Match {
                rule_id: rule.id.clone(),
                rule_index,
                confidence: rule.confidence,
                bindings,
                edges,
                root_seq,
            })
        })
        .collect();

    if !matches.is_empty() {
        debug!(rule = %rule.id, matches = matches.len(), "rule matched");
    }
    matches
}

/// Whether a match found earlier still embeds in the (possibly rewritten)
/// graph: no bound node consumed or gone, predicates and constraints still
/// hold, and every matched edge still connects the same nodes.
pub fn still_valid(
    graph: &CodeGraph,
    rule: &TransformationRule,
    m: &Match,
    consumed: &HashSet<String>,
) -> bool {
    let pattern = &rule.source_pattern;
    let mut bound = Vec::with_capacity(m.bindings.len());
    for (p, binding) in pattern.nodes.iter().zip(&m.bindings) {
        if consumed.contains(&binding.node_id) {
            return false;
        }
        match graph.node(&binding.node_id) {
            Some(node) if accepts(graph, p, node) => bound.push(node),
            _ => return false,
        }
    }

    let edges_intact = m.edges.iter().all(|e| {
        graph
            .edge(&e.edge_id)
            .is_some_and(|v| v.source.id == e.source && v.target.id == e.target)
    });
    let lookup = |name: &str| pattern.position(name).and_then(|i| bound.get(i).copied());
    edges_intact && pattern.constraints.iter().all(|c| c.holds(lookup))
}

/// Bind each pattern edge to a distinct graph edge, first in creation order.
fn assign_edges(
    graph: &CodeGraph,
    edges: &[(usize, usize, EdgeType)],
    bound: &[&Node],
) -> Option<Vec<MatchedEdge>> {
    let mut used: HashSet<&str> = HashSet::new();
    let mut assigned = Vec::with_capacity(edges.len());
    for &(source, target, kind) in edges {
        let (from, to) = (bound[source], bound[target]);
        let edge = graph
            .outgoing(&from.id, Some(kind))
            .into_iter()
            .find(|e| e.target.id == to.id && !used.contains(e.edge.id.as_str()))?;
        used.insert(edge.edge.id.as_str());
        assigned.push(MatchedEdge {
            edge_id: edge.edge.id.clone(),
            source: from.id.clone(),
            target: to.id.clone(),
        });
    }
    Some(assigned)
}

struct Search<'g, 'r> {
    graph: &'g CodeGraph,
    pattern: &'r SourcePattern,
    edges: Vec<(usize, usize, EdgeType)>,
    candidates: Vec<Vec<&'g Node>>,
    candidate_ids: Vec<HashSet<&'g str>>,
    bound: Vec<&'g Node>,
    found: Vec<Vec<&'g Node>>,
}

impl<'g> Search<'g, '_> {
    fn extend(&mut self) {
        if self.found.len() >= MAX_MATCHES_PER_RULE {
            return;
        }
        let depth = self.bound.len();
        if depth == self.pattern.nodes.len() {
            if self.constraints_hold() {
                self.found.push(self.bound.clone());
            }
            return;
        }

        for node in self.options(depth) {
            if self.bound.iter().any(|b| b.id == node.id) {
                continue;
            }
            self.bound.push(node);
            if self.edges_hold(depth) {
                self.extend();
            }
            self.bound.pop();
        }
    }

    // Candidates for the pattern node at `depth`. When an edge ties it to a
    // node bound earlier, only that node's neighbours are tried.
    fn options(&self, depth: usize) -> Vec<&'g Node> {
        let anchored = self.edges.iter().find_map(|&(s, t, kind)| {
            if t == depth && s < depth {
                Some(
                    self.graph
                        .outgoing(&self.bound[s].id, Some(kind))
                        .into_iter()
                        .map(|e| e.target)
                        .collect::<Vec<_>>(),
                )
            } else if s == depth && t < depth {
                Some(
                    self.graph
                        .incoming(&self.bound[t].id, Some(kind))
                        .into_iter()
                        .map(|e| e.source)
                        .collect::<Vec<_>>(),
                )
            } else {
                None
            }
        });

        match anchored {
            Some(mut neighbours) => {
                neighbours.retain(|n| self.candidate_ids[depth].contains(n.id.as_str()));
                neighbours.sort_by_key(|n| n.seq);
                neighbours.dedup_by(|a, b| a.id == b.id);
                neighbours
            }
            None => self.candidates[depth].clone(),
        }
    }

    fn edges_hold(&self, depth: usize) -> bool {
        self.edges
            .iter()
            .filter(|&&(s, t, _)| s.max(t) == depth)
            .all(|&(s, t, kind)| {
                let target = &self.bound[t].id;
                self.graph
                    .outgoing(&self.bound[s].id, Some(kind))
                    .iter()
                    .any(|e| &e.target.id == target)
            })
    }

    fn constraints_hold(&self) -> bool {
        let lookup = |name: &str| -> Option<&'g Node> {
            self.pattern.position(name).map(|i| self.bound[i])
        };
        self.pattern.constraints.iter().all(|c| c.holds(lookup))
    }
}
