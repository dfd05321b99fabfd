use std::collections::{BTreeMap, HashMap};

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result, Warning};
use crate::types::{AppliedRule, Edge, EdgeType, Node, NodeType};

/// Typed property graph of code constructs.
///
/// Nodes and edges are addressed by string ids; creation order (`seq`)
/// defines the stable traversal order used for ranking and rendering.
#[derive(Debug, Clone, Default)]
pub struct CodeGraph {
    graph: StableDiGraph<Node, Edge>,
    node_index: HashMap<String, NodeIndex>,
    edge_index: HashMap<String, EdgeIndex>,
    next_seq: u64,
    next_edge_seq: u64,
    next_node_id: u64,
    next_edge_id: u64,
    namespace: String,
    history: Vec<AppliedRule>,
    forwarding: HashMap<String, String>,
}

/// Borrowed view of an edge together with its endpoints.
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'a> {
    pub index: EdgeIndex,
    pub edge: &'a Edge,
    pub source: &'a Node,
    pub target: &'a Node,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh ids generated by this graph start with `namespace`.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn fresh_node_id(&mut self) -> String {
        loop {
            let id = format!("{}n{}", self.namespace, self.next_node_id);
            self.next_node_id += 1;
            if !self.node_index.contains_key(&id) {
                return id;
            }
        }
    }

    fn fresh_edge_id(&mut self) -> String {
        loop {
            let id = format!("{}e{}", self.namespace, self.next_edge_id);
            self.next_edge_id += 1;
            if !self.edge_index.contains_key(&id) {
                return id;
            }
        }
    }

    /// Add a node under a freshly generated id.
    pub fn add_node(
        &mut self,
        kind: NodeType,
        label: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> String {
        let id = self.fresh_node_id();
        self.insert_node(id.clone(), kind, label.into(), attributes);
        id
    }

    pub fn add_node_with_id(
        &mut self,
        id: impl Into<String>,
        kind: NodeType,
        label: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> Result<()> {
        let id = id.into();
        if self.node_index.contains_key(&id) {
            return Err(EngineError::validation(format!("duplicate node id '{}'", id)));
        }
        self.insert_node(id, kind, label.into(), attributes);
        Ok(())
    }

    fn insert_node(
        &mut self,
        id: String,
        kind: NodeType,
        label: String,
        attributes: BTreeMap<String, String>,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let index = self.graph.add_node(Node {
            id: id.clone(),
            kind,
            label,
            attributes,
            seq,
        });
        self.node_index.insert(id, index);
    }

    /// Add an edge under a freshly generated id.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        kind: EdgeType,
        attributes: BTreeMap<String, String>,
    ) -> Result<String> {
        let id = self.fresh_edge_id();
        self.add_edge_with_id(id.clone(), source, target, kind, attributes)?;
        Ok(id)
    }

    pub fn add_edge_with_id(
        &mut self,
        id: impl Into<String>,
        source: &str,
        target: &str,
        kind: EdgeType,
        attributes: BTreeMap<String, String>,
    ) -> Result<()> {
        let seq = self.next_edge_seq;
        self.next_edge_seq += 1;
        self.insert_edge(id.into(), source, target, kind, attributes, seq)
    }

    /// Re-insert an edge keeping its original creation order.
    pub(crate) fn insert_edge(
        &mut self,
        id: String,
        source: &str,
        target: &str,
        kind: EdgeType,
        attributes: BTreeMap<String, String>,
        seq: u64,
    ) -> Result<()> {
        if self.edge_index.contains_key(&id) {
            return Err(EngineError::validation(format!("duplicate edge id '{}'", id)));
        }
        let (Some(&from), Some(&to)) = (self.node_index.get(source), self.node_index.get(target))
        else {
            return Err(EngineError::validation(format!(
                "edge '{}' references a missing node ({} -> {})",
                id, source, target
            )));
        };
        self.next_edge_seq = self.next_edge_seq.max(seq + 1);
        let index = self.graph.add_edge(
            from,
            to,
            Edge {
                id: id.clone(),
                kind,
                attributes,
                seq,
            },
        );
        self.edge_index.insert(id, index);
        Ok(())
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.graph[i])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        let index = *self.node_index.get(id)?;
        self.graph.node_weight_mut(index)
    }

    pub fn edge(&self, id: &str) -> Option<EdgeView<'_>> {
        self.edge_index.get(id).and_then(|&i| self.view(i))
    }

    fn view(&self, index: EdgeIndex) -> Option<EdgeView<'_>> {
        let (from, to) = self.graph.edge_endpoints(index)?;
        Some(EdgeView {
            index,
            edge: &self.graph[index],
            source: &self.graph[from],
            target: &self.graph[to],
        })
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.graph.node_weights().collect();
        nodes.sort_by_key(|n| n.seq);
        nodes
    }

    pub fn nodes_of(&self, kind: NodeType) -> Vec<&Node> {
        self.nodes().into_iter().filter(|n| n.kind == kind).collect()
    }

    /// All edges in creation order.
    pub fn edges(&self) -> Vec<EdgeView<'_>> {
        let mut edges: Vec<EdgeView> = self
            .graph
            .edge_indices()
            .filter_map(|i| self.view(i))
            .collect();
        edges.sort_by_key(|e| e.edge.seq);
        edges
    }

    fn edges_directed(
        &self,
        id: &str,
        direction: Direction,
        kind: Option<EdgeType>,
    ) -> Vec<EdgeView<'_>> {
        let Some(&index) = self.node_index.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<EdgeView> = self
            .graph
            .edges_directed(index, direction)
            .filter(|e| kind.is_none_or(|k| e.weight().kind == k))
            .filter_map(|e| self.view(e.id()))
            .collect();
        edges.sort_by_key(|e| e.edge.seq);
        edges
    }

    pub fn outgoing(&self, id: &str, kind: Option<EdgeType>) -> Vec<EdgeView<'_>> {
        self.edges_directed(id, Direction::Outgoing, kind)
    }

    pub fn incoming(&self, id: &str, kind: Option<EdgeType>) -> Vec<EdgeView<'_>> {
        self.edges_directed(id, Direction::Incoming, kind)
    }

    /// Nodes this node `contains`, in creation order.
    pub fn children(&self, id: &str) -> Vec<&Node> {
        let mut children: Vec<&Node> = self
            .outgoing(id, Some(EdgeType::Contains))
            .into_iter()
            .map(|e| e.target)
            .collect();
        children.sort_by_key(|n| n.seq);
        children
    }

    pub fn parent(&self, id: &str) -> Option<&Node> {
        self.incoming(id, Some(EdgeType::Contains))
            .first()
            .map(|e| e.source)
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let index = self.node_index.remove(id)?;
        for edge in self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .chain(self.graph.edges_directed(index, Direction::Incoming))
        {
            self.edge_index.remove(&edge.weight().id);
        }
        self.graph.remove_node(index)
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let index = self.edge_index.remove(id)?;
        self.graph.remove_edge(index)
    }

    // ---- applied-rule history ----

    pub fn history(&self) -> &[AppliedRule] {
        &self.history
    }

    pub fn record(&mut self, node_id: &str, rule_id: &str) {
        self.history.push(AppliedRule {
            node_id: node_id.to_string(),
            rule_id: rule_id.to_string(),
        });
    }

    pub(crate) fn extend_history(&mut self, entries: impl IntoIterator<Item = AppliedRule>) {
        self.history.extend(entries);
    }

    /// Remember that `old` was replaced by `new` during a rewrite.
    pub(crate) fn forward(&mut self, old: &str, new: &str) {
        self.forwarding.insert(old.to_string(), new.to_string());
    }

    pub(crate) fn forwarding(&self) -> &HashMap<String, String> {
        &self.forwarding
    }

    // ---- JSON form ----

    pub fn to_data(&self) -> GraphData {
        GraphData {
            nodes: self
                .nodes()
                .into_iter()
                .map(|n| NodeData {
                    id: n.id.clone(),
                    label: n.label.clone(),
                    kind: n.kind,
                    attributes: n.attributes.clone(),
                })
                .collect(),
            edges: self
                .edges()
                .into_iter()
                .map(|e| EdgeData {
                    id: e.edge.id.clone(),
                    source: e.source.id.clone(),
                    target: e.target.id.clone(),
                    kind: e.edge.kind,
                    attributes: e.edge.attributes.clone(),
                })
                .collect(),
            history: self.history.clone(),
            warnings: Vec::new(),
        }
    }

    /// Build a graph from its JSON form, validating ids and endpoints.
    pub fn from_data(data: GraphData) -> Result<Self> {
        let mut graph = CodeGraph::new();
        for node in data.nodes {
            graph.add_node_with_id(node.id, node.kind, node.label, node.attributes)?;
        }
        for edge in data.edges {
            graph.add_edge_with_id(edge.id, &edge.source, &edge.target, edge.kind, edge.attributes)?;
        }
        graph.next_node_id = graph.node_count() as u64;
        graph.next_edge_id = graph.edge_count() as u64;
        graph.history = data.history;
        Ok(graph)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let data: GraphData = serde_json::from_str(json)?;
        Self::from_data(data)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_data())?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default, alias = "properties")]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "label")]
    pub kind: EdgeType,
    #[serde(default, alias = "properties")]
    pub attributes: BTreeMap<String, String>,
}

/// Wire shape of a graph: `{nodes, edges, history?, warnings?}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<NodeData>,
    pub edges: Vec<EdgeData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<AppliedRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> CodeGraph {
        let mut graph = CodeGraph::new();
        let class = graph.add_node(NodeType::Class, "A", BTreeMap::new());
        let method = graph.add_node(NodeType::Method, "f", BTreeMap::new());
        graph
            .add_edge(&class, &method, EdgeType::Contains, BTreeMap::new())
            .unwrap();
        graph
    }

    #[test]
    fn fresh_ids_skip_taken_ones() {
        let mut graph = CodeGraph::new();
        graph
            .add_node_with_id("n0", NodeType::Field, "x", BTreeMap::new())
            .unwrap();
        let id = graph.add_node(NodeType::Field, "y", BTreeMap::new());
        assert_eq!(id, "n1");
    }

    #[test]
    fn dangling_edge_is_a_validation_error() {
        let json = r#"{"nodes":[{"id":"a","label":"A","type":"class"}],
                       "edges":[{"id":"e","source":"a","target":"b","label":"contains"}]}"#;
        assert!(matches!(
            CodeGraph::from_json(json),
            Err(EngineError::GraphValidation { .. })
        ));
    }

    #[test]
    fn duplicate_node_id_is_rejected() {
        let json = r#"{"nodes":[{"id":"a","label":"A","type":"class"},
                                {"id":"a","label":"B","type":"class"}],"edges":[]}"#;
        assert!(CodeGraph::from_json(json).is_err());
    }

    #[test]
    fn presentation_fields_are_ignored() {
        let json = r#"{"nodes":[{"id":"a","label":"A","type":"class","properties":{"k":"v"}},
                                {"id":"b","label":"f","type":"method"}],
                       "edges":[{"id":"e","source":"a","target":"b","label":"contains","highlighted":true}]}"#;
        let graph = CodeGraph::from_json(json).unwrap();
        assert_eq!(graph.node("a").unwrap().attr("k"), Some("v"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn json_round_trip_keeps_order_and_history() {
        let mut graph = sample();
        graph.record("n1", "rule-x");
        let data = graph.to_data();
        let restored = CodeGraph::from_data(data.clone()).unwrap();
        assert_eq!(restored.to_data(), data);
    }

    #[test]
    fn removing_a_node_drops_its_edges() {
        let mut graph = sample();
        graph.remove_node("n0");
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.edge("e0").is_none());
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn children_and_parent() {
        let graph = sample();
        assert_eq!(graph.children("n0")[0].label, "f");
        assert_eq!(graph.parent("n1").map(|n| n.label.as_str()), Some("A"));
        assert!(graph.parent("n0").is_none());
    }
}
