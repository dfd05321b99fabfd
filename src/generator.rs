//! Graph to TypeScript source.
//!
//! Top-level units are ordered so that supertypes come before the types
//! extending them; scopes then render recursively, fields first and every
//! other member in creation order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet, VecDeque};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::formatters::{self, INDENT, Scope};
use crate::graph::CodeGraph;
use crate::graph_builder::LOOP_PLACEHOLDER;
use crate::types::{EdgeType, Node, NodeType};
use crate::utils::has_word;

/// Render a graph as TypeScript. An empty graph renders as an empty string.
pub fn generate(graph: &CodeGraph) -> Result<String> {
    check_containment(graph)?;

    let units: Vec<&Node> = graph
        .nodes()
        .into_iter()
        .filter(|node| is_unit(graph, node))
        .collect();
    let ordered = order_units(graph, &units)?;

    let generator = Generator::new(graph);
    let blocks: Vec<String> = ordered
        .iter()
        .map(|node| {
            let mut lines = Vec::new();
            generator.render_unit(node, &mut lines);
            lines.join("\n")
        })
        .collect();

    info!(units = blocks.len(), "generated TypeScript");
    if blocks.is_empty() {
        return Ok(String::new());
    }
    let mut code = blocks.join("\n\n");
    code.push('\n');
    Ok(code)
}

fn check_containment(graph: &CodeGraph) -> Result<()> {
    let mut contains: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for node in graph.nodes() {
        index.insert(node.id.as_str(), contains.add_node(node.id.as_str()));
    }
    for view in graph.edges() {
        if view.edge.kind == EdgeType::Contains {
            contains.add_edge(index[view.source.id.as_str()], index[view.target.id.as_str()], ());
        }
    }
    toposort(&contains, None).map(|_| ()).map_err(|cycle| EngineError::CyclicDependency {
        node: contains[cycle.node_id()].to_string(),
    })
}

// Which member kinds a scope renders in place
fn hosts(parent: NodeType, child: NodeType) -> bool {
    match parent {
        NodeType::Class => matches!(
            child,
            NodeType::Field
                | NodeType::Method
                | NodeType::Constructor
                | NodeType::Accessor
                | NodeType::Class
        ),
        NodeType::Interface => matches!(
            child,
            NodeType::Field | NodeType::Method | NodeType::Accessor
        ),
        NodeType::Field => false,
        _ => child.is_loop(),
    }
}

/// Nodes rendered at module level: roots of the containment forest and
/// declarations their parent cannot host (interfaces nested in classes).
fn is_unit(graph: &CodeGraph, node: &Node) -> bool {
    match graph.parent(&node.id) {
        None => true,
        Some(parent) => !hosts(parent.kind, node.kind),
    }
}

fn unit_of<'g>(graph: &'g CodeGraph, units: &HashMap<&str, usize>, node: &'g Node) -> Option<usize> {
    let mut current = node;
    let mut hops = 0;
    loop {
        if let Some(index) = units.get(current.id.as_str()) {
            return Some(*index);
        }
        current = graph.parent(&current.id)?;
        hops += 1;
        if hops > graph.node_count() {
            return None;
        }
    }
}

/// Kahn's algorithm over `extends`/`implements` between units, base first;
/// ties resolve by creation order.
fn order_units<'g>(graph: &'g CodeGraph, units: &[&'g Node]) -> Result<Vec<&'g Node>> {
    let position: HashMap<&str, usize> = units
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();

    let mut dependents: Vec<HashSet<usize>> = vec![HashSet::new(); units.len()];
    let mut in_degree = vec![0usize; units.len()];
    for view in graph.edges() {
        if !matches!(view.edge.kind, EdgeType::Extends | EdgeType::Implements) {
            continue;
        }
        let (Some(sub), Some(base)) = (
            unit_of(graph, &position, view.source),
            unit_of(graph, &position, view.target),
        ) else {
            continue;
        };
        if sub != base && dependents[base].insert(sub) {
            in_degree[sub] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<(u64, usize)>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(i, _)| Reverse((units[i].seq, i)))
        .collect();
    let mut ordered = Vec::with_capacity(units.len());
    while let Some(Reverse((_, i))) = ready.pop() {
        ordered.push(units[i]);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse((units[dependent].seq, dependent)));
            }
        }
    }

    if ordered.len() < units.len() {
        let stuck = units
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, node)| node)
            .min_by_key(|node| node.seq);
        return Err(EngineError::CyclicDependency {
            node: stuck.map(|n| n.id.clone()).unwrap_or_default(),
        });
    }
    Ok(ordered)
}

fn pad(depth: usize) -> String {
    INDENT.repeat(depth)
}

// `open` ends with `{`; an empty block collapses onto one line
fn push_block(out: &mut Vec<String>, open: String, inner: Vec<String>, close: String) {
    if inner.is_empty() {
        out.push(format!("{}{}", open, close.trim_start()));
    } else {
        out.push(open);
        out.extend(inner);
        out.push(close);
    }
}

struct Generator<'g> {
    graph: &'g CodeGraph,
    // (module, function) pairs for functions hoisted out of a class
    module_functions: Vec<(String, String)>,
}

impl<'g> Generator<'g> {
    fn new(graph: &'g CodeGraph) -> Self {
        let module_functions = graph
            .nodes_of(NodeType::Function)
            .into_iter()
            .filter_map(|f| Some((f.attr("module")?.to_string(), f.label.clone())))
            .collect();
        Self {
            graph,
            module_functions,
        }
    }

    fn render_unit(&self, node: &Node, out: &mut Vec<String>) {
        debug!(node = %node.id, kind = %node.kind, "rendering unit");
        match node.kind {
            NodeType::Class => self.render_class(node, 0, false, out),
            NodeType::Interface => self.render_interface(node, 0, out),
            NodeType::Field => {
                let scope = self.base_scope();
                out.push(formatters::module_variable(node, &scope));
            }
            NodeType::Loop | NodeType::ArrayMethod => {
                let scope = self.callable_scope(node, None);
                self.render_loop(node, 0, &scope, out);
            }
            _ => self.render_function(node, out),
        }
    }

    /// Members a scope renders: fields first, then the rest, each in
    /// creation order.
    fn members(&self, node: &Node) -> Vec<&'g Node> {
        let (mut fields, rest): (Vec<&Node>, Vec<&Node>) = self
            .graph
            .children(&node.id)
            .into_iter()
            .filter(|child| hosts(node.kind, child.kind))
            .partition(|child| child.kind == NodeType::Field);
        fields.extend(rest);
        fields
    }

    /// Class supertypes split into one `extends` and the `implements`
    /// list. A class extending a node that is now an interface implements
    /// it instead.
    fn class_heritage(&self, node: &Node) -> (Option<String>, Vec<String>) {
        let interfaces: HashSet<&str> = self
            .graph
            .outgoing(&node.id, Some(EdgeType::Extends))
            .into_iter()
            .filter(|e| e.target.kind == NodeType::Interface)
            .map(|e| e.target.label.as_str())
            .collect();

        let mut extends = None;
        let mut implements = Vec::new();
        for java in crate::utils::split_top_level(node.attr_or_empty("extends"), ',') {
            let simple = java.split('<').next().unwrap_or(&java).rsplit('.').next().unwrap_or("").trim();
            let mapped = formatters::ts_type(&java);
            if interfaces.contains(simple) || extends.is_some() {
                implements.push(mapped);
            } else {
                extends = Some(mapped);
            }
        }
        implements.extend(formatters::supertypes(node.attr_or_empty("implements")));
        (extends, implements)
    }

    fn render_class(&self, node: &Node, depth: usize, nested: bool, out: &mut Vec<String>) {
        let (extends, implements) = self.class_heritage(node);
        let signature = formatters::class_signature(node, extends.as_deref(), &implements);
        let modifiers = node.attr_or_empty("modifiers");

        let (open, close) = if nested {
            (
                format!("{}static {} = {} {{", pad(depth), node.label, signature),
                format!("{}}};", pad(depth)),
            )
        } else {
            let mut prefix = String::new();
            if formatters::is_exported(node) {
                prefix.push_str("export ");
            }
            if has_word(modifiers, "abstract") {
                prefix.push_str("abstract ");
            }
            (
                format!("{}{}{} {{", pad(depth), prefix, signature),
                format!("{}}}", pad(depth)),
            )
        };

        let mut inner = Vec::new();
        for (i, member) in self.members(node).into_iter().enumerate() {
            if i > 0 && member.kind != NodeType::Field {
                inner.push(String::new());
            }
            match member.kind {
                NodeType::Field => {
                    let scope = self.callable_scope(member, Some(node));
                    inner.push(format!("{}{}", pad(depth + 1), formatters::class_field(member, &scope)));
                }
                NodeType::Class => self.render_class(member, depth + 1, true, &mut inner),
                _ => self.render_member(member, node, depth + 1, &mut inner),
            }
        }
        push_block(out, open, inner, close);
    }

    fn render_interface(&self, node: &Node, depth: usize, out: &mut Vec<String>) {
        let mut extends = formatters::supertypes(node.attr_or_empty("extends"));
        extends.extend(formatters::supertypes(node.attr_or_empty("implements")));
        let signature = formatters::interface_signature(node, &extends);
        let export = if formatters::is_exported(node) { "export " } else { "" };
        let open = format!("{}{}{} {{", pad(depth), export, signature);

        let mut properties = HashSet::new();
        let mut inner = Vec::new();
        for member in self.members(node) {
            let line = match member.kind {
                NodeType::Field => formatters::interface_field(member),
                NodeType::Accessor => {
                    if !properties.insert(member.label.as_str()) {
                        continue;
                    }
                    formatters::interface_property(member)
                }
                _ => format!("{};", formatters::callable_signature(member)),
            };
            inner.push(format!("{}{}", pad(depth + 1), line));
        }
        push_block(out, open, inner, format!("{}}}", pad(depth)));
    }

    fn render_member(&self, node: &Node, owner: &Node, depth: usize, out: &mut Vec<String>) {
        let header = format!(
            "{}{}{}",
            pad(depth),
            formatters::member_prefix(node),
            formatters::callable_signature(node)
        );
        if has_word(node.attr_or_empty("modifiers"), "abstract") {
            out.push(format!("{};", header));
            return;
        }
        let scope = self.callable_scope(node, Some(owner));
        let mut inner = Vec::new();
        self.render_body(node, depth + 1, &scope, &mut inner);
        push_block(out, format!("{} {{", header), inner, format!("{}}}", pad(depth)));
    }

    fn render_function(&self, node: &Node, out: &mut Vec<String>) {
        let export = if formatters::is_exported(node) { "export " } else { "" };
        let open = format!("{}function {} {{", export, formatters::callable_signature(node));
        let owner = node
            .attr("module")
            .and_then(|module| {
                self.graph
                    .nodes_of(NodeType::Class)
                    .into_iter()
                    .find(|c| c.label == module)
            });
        let scope = self.callable_scope(node, owner);
        let mut inner = Vec::new();
        self.render_body(node, 1, &scope, &mut inner);
        push_block(out, open, inner, "}".to_string());
    }

    fn base_scope(&self) -> Scope {
        let mut scope = Scope::new();
        for (module, name) in &self.module_functions {
            scope.module_function(module, name);
        }
        scope
    }

    /// Identifier resolution for the body of `node` declared in `owner`.
    /// Module functions only see the static members of their former class.
    fn callable_scope(&self, node: &Node, owner: Option<&Node>) -> Scope {
        let mut scope = self.base_scope();
        if let Some(owner) = owner {
            let statics_only = node.kind == NodeType::Function;
            for member in self.graph.children(&owner.id) {
                let is_static = has_word(member.attr_or_empty("modifiers"), "static");
                if statics_only && !is_static {
                    continue;
                }
                let qualifier = if is_static { owner.label.as_str() } else { "this" };
                let qualified = format!("{}.{}", qualifier, member.label);
                match (member.kind, member.attr("backingField")) {
                    // Inside the class, properties read and write their backing field
                    (NodeType::Accessor, Some(backing)) if !is_static => {
                        scope.member(&member.label, format!("this.{}", backing));
                        scope.alias(&member.label, backing);
                    }
                    (NodeType::Field | NodeType::Accessor, _) => scope.member(&member.label, qualified),
                    (NodeType::Method, _) => scope.method(&member.label, qualified),
                    _ => {}
                }
            }
        }

        for (_, name) in formatters::parameters(node.attr_or_empty("params")) {
            scope.hide(&name);
        }
        self.hide_body_locals(node, &mut scope);
        scope
    }

    fn hide_body_locals(&self, node: &Node, scope: &mut Scope) {
        scope.hide_locals(node.attr_or_empty("body").lines());
        if let Some(var) = node.attr("var") {
            scope.hide(var);
        }
        if let Some(name) = node.attr("init").and_then(|init| formatters::declared_local(&format!("{};", init))) {
            if node.kind.is_loop() {
                scope.hide(&name);
            }
        }
        for child in self.graph.children(&node.id) {
            if child.kind.is_loop() {
                self.hide_body_locals(child, scope);
            }
        }
    }

    /// Body lines of a callable or loop; nested loops render at their
    /// placeholder, unplaced ones after the last line in creation order.
    /// Loops sharing a slot fill its placeholders in creation order.
    fn render_body(&self, holder: &Node, depth: usize, scope: &Scope, out: &mut Vec<String>) {
        let mut nested_loops: Vec<&Node> = self
            .graph
            .children(&holder.id)
            .into_iter()
            .filter(|child| child.kind.is_loop())
            .collect();
        nested_loops.sort_by_key(|n| n.seq);
        let mut loops: BTreeMap<String, VecDeque<&Node>> = BTreeMap::new();
        for nested in nested_loops {
            loops
                .entry(nested.attr_or_empty("slot").to_string())
                .or_default()
                .push_back(nested);
        }

        for line in holder.attr_or_empty("body").lines() {
            let text = line.trim_start();
            if text.is_empty() {
                continue;
            }
            let level = depth + (line.len() - text.len()) / INDENT.len();
            match text.strip_prefix(LOOP_PLACEHOLDER) {
                Some(slot) => match loops.get_mut(slot.trim()).and_then(VecDeque::pop_front) {
                    Some(nested) => self.render_loop(nested, level, scope, out),
                    None => debug!(holder = %holder.id, slot, "placeholder without a loop"),
                },
                None => out.push(format!("{}{}", pad(level), scope.translate(text))),
            }
        }

        let mut rest: Vec<&Node> = loops.into_values().flatten().collect();
        rest.sort_by_key(|n| n.seq);
        for nested in rest {
            self.render_loop(nested, depth, scope, out);
        }
    }

    fn render_loop(&self, node: &Node, depth: usize, scope: &Scope, out: &mut Vec<String>) {
        let (open, close) = formatters::loop_frame(node, scope);
        let mut inner = Vec::new();
        self.render_body(node, depth + 1, scope, &mut inner);
        push_block(
            out,
            format!("{}{}", pad(depth), open),
            inner,
            format!("{}{}", pad(depth), close),
        );
    }
}
