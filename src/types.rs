use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// Node types represent the different kinds of code constructs in our graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Class,       // Class declaration
    Interface,   // Interface declaration
    Method,      // Method inside a type
    Constructor, // Constructor inside a class
    Function,    // Module-level function
    Accessor,    // get/set property accessor
    Field,       // Field declarator
    Loop,        // for / for-each / while / do loop
    ArrayMethod, // Loop expressed as an array method call
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Class => "class",
            NodeType::Interface => "interface",
            NodeType::Method => "method",
            NodeType::Constructor => "constructor",
            NodeType::Function => "function",
            NodeType::Accessor => "accessor",
            NodeType::Field => "field",
            NodeType::Loop => "loop",
            NodeType::ArrayMethod => "array_method",
        }
    }

    pub fn is_type(self) -> bool {
        matches!(self, NodeType::Class | NodeType::Interface)
    }

    /// Constructs whose body can contain loops and calls
    pub fn is_callable(self) -> bool {
        matches!(
            self,
            NodeType::Method | NodeType::Constructor | NodeType::Function | NodeType::Accessor
        )
    }

    pub fn is_loop(self) -> bool {
        matches!(self, NodeType::Loop | NodeType::ArrayMethod)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Edge types represent the relationships between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Contains,   // Parent declares child
    Calls,      // Body invokes a method by name
    Extends,    // Subtype -> base type
    Implements, // Class -> interface
}

impl EdgeType {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeType::Contains => "contains",
            EdgeType::Calls => "calls",
            EdgeType::Extends => "extends",
            EdgeType::Implements => "implements",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Encapsulate node information
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: NodeType,
    pub label: String,
    pub attributes: BTreeMap<String, String>,
    /// Creation order, the stable traversal order of the graph
    pub seq: u64,
}

impl Node {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attr_or_empty(&self, key: &str) -> &str {
        self.attr(key).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub kind: EdgeType,
    pub attributes: BTreeMap<String, String>,
    pub seq: u64,
}

/// Audit entry: `rule_id` produced node `node_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRule {
    pub node_id: String,
    pub rule_id: String,
}
