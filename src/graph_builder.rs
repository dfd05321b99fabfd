use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{AstKind, AstNode};
use crate::error::{EngineError, Result};
use crate::graph::CodeGraph;
use crate::types::{EdgeType, NodeType};
use crate::utils::split_top_level;

/// Placeholder line marking where a nested loop renders inside a body.
pub const LOOP_PLACEHOLDER: &str = "@loop:";

// Attributes copied verbatim from declaration AST nodes
const DECLARATION_ATTRS: &[&str] = &[
    "modifiers",
    "annotations",
    "typeParams",
    "extends",
    "implements",
    "returnType",
    "throws",
    "type",
    "init",
];

const LOOP_ATTRS: &[&str] = &["init", "condition", "update", "varType", "var", "iterable", "label"];

struct MethodEntry {
    name: String,
    id: String,
    owner: Option<String>,
}

struct CallSite {
    caller: String,
    owner: Option<String>,
    callees: Vec<String>,
}

#[derive(Default)]
struct GraphBuilder {
    graph: CodeGraph,
    types: Vec<(String, String)>,
    methods: Vec<MethodEntry>,
    call_sites: Vec<CallSite>,
}

/// Lower an AST into a property graph.
///
/// Containment edges are added during the depth-first walk right after the
/// child node; `calls`, `extends` and `implements` edges are linked once the
/// whole tree has been visited.
pub fn build_graph(ast: &AstNode) -> Result<CodeGraph> {
    let mut builder = GraphBuilder::default();

    if ast.kind == AstKind::Program {
        for child in &ast.children {
            builder.process_declaration(child, None)?;
        }
    } else {
        builder.process_declaration(ast, None)?;
    }

    builder.link_calls()?;
    builder.link_supertypes()?;

    debug!(
        nodes = builder.graph.node_count(),
        edges = builder.graph.edge_count(),
        "built graph"
    );
    Ok(builder.graph)
}

fn declared_name(node: &AstNode) -> Result<&str> {
    match node.name.as_deref() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(EngineError::validation(format!(
            "{:?} declaration without a name at {}",
            node.kind,
            node.range.location()
        ))),
    }
}

fn base_attributes(node: &AstNode) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    for key in DECLARATION_ATTRS {
        if let Some(value) = node.attr(key) {
            attributes.insert(key.to_string(), value.to_string());
        }
    }
    attributes.insert("location".to_string(), node.range.location());
    attributes
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

// Statement children of a control node, skipping call markers
fn branches(node: &AstNode) -> Vec<&AstNode> {
    node.children
        .iter()
        .filter(|c| c.kind != AstKind::Call)
        .collect()
}

fn branch_statements(branch: &AstNode) -> &[AstNode] {
    if branch.kind == AstKind::Block {
        &branch.children
    } else {
        std::slice::from_ref(branch)
    }
}

fn collect_calls(node: &AstNode, calls: &mut Vec<String>) {
    if node.kind == AstKind::Call {
        if let Some(name) = &node.name {
            calls.push(name.clone());
        }
    }
    for child in &node.children {
        collect_calls(child, calls);
    }
}

/// `java.util.List<T>` -> `List`
fn simple_type_name(ty: &str) -> &str {
    let raw = ty.split('<').next().unwrap_or(ty).trim();
    raw.rsplit('.').next().unwrap_or(raw)
}

impl GraphBuilder {
    fn contain(&mut self, parent: Option<&str>, child: &str) -> Result<()> {
        if let Some(parent) = parent {
            self.graph
                .add_edge(parent, child, EdgeType::Contains, BTreeMap::new())?;
        }
        Ok(())
    }

    fn process_declaration(&mut self, node: &AstNode, parent: Option<&str>) -> Result<()> {
        match node.kind {
            AstKind::Class | AstKind::Interface => self.process_type(node, parent),
            AstKind::Method | AstKind::Constructor => self.process_method(node, parent),
            AstKind::Field => self.process_field(node, parent),
            // Several declarators of one field declaration
            AstKind::Block if node.attr("declarators").is_some() => {
                for field in &node.children {
                    self.process_field(field, parent)?;
                }
                Ok(())
            }
            AstKind::Block => {
                debug!(location = %node.range.location(), "skipping initializer block");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn process_type(&mut self, node: &AstNode, parent: Option<&str>) -> Result<()> {
        let name = declared_name(node)?;
        let kind = if node.kind == AstKind::Interface {
            NodeType::Interface
        } else {
            NodeType::Class
        };

        let id = self.graph.add_node(kind, name, base_attributes(node));
        self.contain(parent, &id)?;
        self.types.push((name.to_string(), id.clone()));

        for member in &node.children {
            self.process_declaration(member, Some(&id))?;
        }
        Ok(())
    }

    fn process_method(&mut self, node: &AstNode, parent: Option<&str>) -> Result<()> {
        let name = declared_name(node)?;
        let kind = if node.kind == AstKind::Constructor {
            NodeType::Constructor
        } else {
            NodeType::Method
        };

        let mut attributes = base_attributes(node);
        let params: Vec<String> = node
            .children_of(AstKind::Parameter)
            .filter_map(|p| {
                let name = p.name.as_deref()?;
                Some(format!("{} {}", p.attr("type").unwrap_or("Object"), name))
            })
            .collect();
        if !params.is_empty() {
            attributes.insert("params".to_string(), params.join(", "));
        }

        let id = self.graph.add_node(kind, name, attributes);
        self.contain(parent, &id)?;
        if kind == NodeType::Method {
            self.methods.push(MethodEntry {
                name: name.to_string(),
                id: id.clone(),
                owner: parent.map(str::to_string),
            });
        }

        // Abstract and interface methods have no body at all
        if let Some(body) = node.children_of(AstKind::Block).next() {
            let mut lines = Vec::new();
            let mut slots = 0;
            self.encode_statements(&body.children, &id, 0, &mut slots, &mut lines)?;
            self.set_body(&id, lines);

            let mut callees = Vec::new();
            collect_calls(body, &mut callees);
            self.call_sites.push(CallSite {
                caller: id,
                owner: parent.map(str::to_string),
                callees,
            });
        }
        Ok(())
    }

    fn process_field(&mut self, node: &AstNode, parent: Option<&str>) -> Result<()> {
        let name = declared_name(node)?;
        let id = self
            .graph
            .add_node(NodeType::Field, name, base_attributes(node));
        self.contain(parent, &id)
    }

    fn process_loop(&mut self, node: &AstNode, owner: &str, slot: usize) -> Result<()> {
        let loop_kind = match node.kind {
            AstKind::WhileLoop => "while",
            AstKind::DoLoop => "do",
            _ => node.attr("loop").unwrap_or("for"),
        };

        let mut attributes = BTreeMap::new();
        attributes.insert("loop".to_string(), loop_kind.to_string());
        for key in LOOP_ATTRS {
            if let Some(value) = node.attr(key) {
                attributes.insert(key.to_string(), value.to_string());
            }
        }
        attributes.insert("slot".to_string(), slot.to_string());
        attributes.insert("location".to_string(), node.range.location());

        let id = self.graph.add_node(NodeType::Loop, loop_kind, attributes);
        self.contain(Some(owner), &id)?;

        let mut lines = Vec::new();
        let mut slots = 0;
        if let Some(body) = branches(node).first() {
            self.encode_statements(branch_statements(body), &id, 0, &mut slots, &mut lines)?;
        }
        self.set_body(&id, lines);
        Ok(())
    }

    fn set_body(&mut self, id: &str, lines: Vec<String>) {
        if let Some(node) = self.graph.node_mut(id) {
            node.attributes.insert("body".to_string(), lines.join("\n"));
        }
    }

    // Encode statements one per line. Loops become graph nodes owned by
    // `owner` and leave a placeholder line behind.
    fn encode_statements(
        &mut self,
        statements: &[AstNode],
        owner: &str,
        depth: usize,
        slots: &mut usize,
        lines: &mut Vec<String>,
    ) -> Result<()> {
        let pad = indent(depth);
        for stmt in statements {
            let label = stmt.attr("label").map(|l| format!("{}: ", l)).unwrap_or_default();
            match stmt.kind {
                AstKind::Statement | AstKind::Return => {
                    lines.push(format!("{}{}", pad, stmt.attr("text").unwrap_or_default()));
                }
                AstKind::Block => {
                    lines.push(format!("{}{}{{", pad, label));
                    self.encode_statements(&stmt.children, owner, depth + 1, slots, lines)?;
                    lines.push(format!("{}}}", pad));
                }
                AstKind::If => {
                    let parts = branches(stmt);
                    lines.push(format!(
                        "{}{}if ({}) {{",
                        pad,
                        label,
                        stmt.attr("condition").unwrap_or_default()
                    ));
                    if let Some(then) = parts.first() {
                        self.encode_statements(branch_statements(then), owner, depth + 1, slots, lines)?;
                    }
                    if let Some(otherwise) = parts.get(1) {
                        lines.push(format!("{}}} else {{", pad));
                        self.encode_statements(
                            branch_statements(otherwise),
                            owner,
                            depth + 1,
                            slots,
                            lines,
                        )?;
                    }
                    lines.push(format!("{}}}", pad));
                }
                kind if kind.is_loop() => {
                    let slot = *slots;
                    *slots += 1;
                    lines.push(format!("{}{}{}", pad, LOOP_PLACEHOLDER, slot));
                    self.process_loop(stmt, owner, slot)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn link_calls(&mut self) -> Result<()> {
        let sites = std::mem::take(&mut self.call_sites);
        for site in sites {
            let mut linked: Vec<&str> = Vec::new();
            for callee in &site.callees {
                let target = self
                    .methods
                    .iter()
                    .find(|m| &m.name == callee && m.owner == site.owner)
                    .or_else(|| self.methods.iter().find(|m| &m.name == callee));
                let Some(target) = target else { continue };
                if linked.contains(&target.id.as_str()) {
                    continue;
                }
                linked.push(&target.id);
                self.graph
                    .add_edge(&site.caller, &target.id, EdgeType::Calls, BTreeMap::new())?;
            }
        }
        Ok(())
    }

    fn link_supertypes(&mut self) -> Result<()> {
        let mut links = Vec::new();
        for (_, id) in &self.types {
            let Some(node) = self.graph.node(id) else { continue };
            for (key, kind) in [("extends", EdgeType::Extends), ("implements", EdgeType::Implements)] {
                for base in split_top_level(node.attr_or_empty(key), ',') {
                    let base = simple_type_name(&base);
                    let target = self
                        .types
                        .iter()
                        .find(|(name, target)| name == base && target != id);
                    if let Some((_, target)) = target {
                        links.push((id.clone(), target.clone(), kind));
                    }
                }
            }
        }
        for (source, target, kind) in links {
            self.graph.add_edge(&source, &target, kind, BTreeMap::new())?;
        }
        Ok(())
    }
}
