//! Rule patterns and target templates.
//!
//! A source pattern is a handful of typed node predicates plus the edges
//! that must connect them. A target pattern describes the fragment spliced
//! in place of the `rewrite` nodes; its labels and attributes are templates
//! over the bound pattern nodes, e.g. `"_{field.label|trim_underscore}"`.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{EdgeType, Node, NodeType};
use crate::utils::{accessor_kind, drop_word, has_word, lower_first, property_name, upper_first};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder regex"));
static FILTER_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-z_]+)(?:\((.*)\))?$").expect("filter regex"));

/// Regex matched against a whole value.
#[derive(Debug, Clone)]
pub struct PatternRegex {
    source: String,
    regex: Regex,
}

impl PatternRegex {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for PatternRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for PatternRegex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for PatternRegex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        PatternRegex::new(&source)
            .map_err(|e| de::Error::custom(format!("invalid regex '{}': {}", source, e)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Replaced by the target fragment
    Rewrite,
    /// Must be present but stays untouched
    #[default]
    Context,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeTest {
    Equals(String),
    HasWord(String),
    LacksWord(String),
    Matches(PatternRegex),
    Present(bool),
    Absent(bool),
}

impl AttributeTest {
    pub fn test(&self, value: Option<&str>) -> bool {
        match self {
            AttributeTest::Equals(expected) => value == Some(expected.as_str()),
            AttributeTest::HasWord(word) => value.is_some_and(|v| has_word(v, word)),
            AttributeTest::LacksWord(word) => !value.is_some_and(|v| has_word(v, word)),
            AttributeTest::Matches(regex) => value.is_some_and(|v| regex.is_match(v)),
            AttributeTest::Present(expected) => value.is_some() == *expected,
            AttributeTest::Absent(expected) => value.is_none() == *expected,
        }
    }
}

/// Predicate over a single graph node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilter {
    /// Accepted kinds; empty accepts any kind
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<NodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<PatternRegex>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeTest>,
}

impl NodeFilter {
    pub fn accepts(&self, node: &Node) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&node.kind))
            && self.label.as_ref().is_none_or(|r| r.is_match(&node.label))
            && self
                .attributes
                .iter()
                .all(|(key, test)| test.test(node.attr(key)))
    }
}

fn contains_edge() -> EdgeType {
    EdgeType::Contains
}

/// Predicate over the nodes reached through one edge kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenTest {
    #[serde(default = "contains_edge")]
    pub edge: EdgeType,
    /// Every child must pass this filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<NodeFilter>,
    #[serde(default)]
    pub min: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
}

impl ChildrenTest {
    pub fn accepts(&self, children: &[&Node]) -> bool {
        children.len() >= self.min
            && self.max.is_none_or(|max| children.len() <= max)
            && self
                .all
                .as_ref()
                .is_none_or(|filter| children.iter().all(|c| filter.accepts(c)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternNode {
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(flatten)]
    pub filter: NodeFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<ChildrenTest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeType,
}

/// Cross-node condition checked once every pattern node is bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Constraint {
    Equal(Template, Template),
    Differ(Template, Template),
}

impl Constraint {
    pub fn holds<'a>(&self, lookup: impl Fn(&str) -> Option<&'a Node> + Copy) -> bool {
        match self {
            Constraint::Equal(a, b) => a.render(lookup) == b.render(lookup),
            Constraint::Differ(a, b) => a.render(lookup) != b.render(lookup),
        }
    }

    fn templates(&self) -> [&Template; 2] {
        match self {
            Constraint::Equal(a, b) | Constraint::Differ(a, b) => [a, b],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePattern {
    pub nodes: Vec<PatternNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<PatternEdge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl SourcePattern {
    pub fn node(&self, name: &str) -> Option<&PatternNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    pub fn is_rewrite(&self, name: &str) -> bool {
        self.node(name).is_some_and(|n| n.role == Role::Rewrite)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("source pattern has no nodes".to_string());
        }
        if !self.nodes.iter().any(|n| n.role == Role::Rewrite) {
            return Err("source pattern has no rewrite node".to_string());
        }
        let mut names = HashSet::new();
        for node in &self.nodes {
            if node.name.is_empty() {
                return Err("pattern node without a name".to_string());
            }
            if !names.insert(node.name.as_str()) {
                return Err(format!("duplicate pattern node '{}'", node.name));
            }
            if let Some(children) = &node.children {
                if children.max.is_some_and(|max| max < children.min) {
                    return Err(format!("children bounds of '{}' are empty", node.name));
                }
            }
        }
        for edge in &self.edges {
            for end in [&edge.source, &edge.target] {
                if !names.contains(end.as_str()) {
                    return Err(format!("pattern edge references unknown node '{}'", end));
                }
            }
        }
        for constraint in &self.constraints {
            for template in constraint.templates() {
                template.check_references(&names)?;
            }
        }
        Ok(())
    }
}

/// One node of the fragment spliced in by a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNode {
    pub name: String,
    /// Pattern node whose kind, label and attributes are copied first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Template>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set: BTreeMap<String, Template>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
}

impl TemplateNode {
    /// Kind, label and attributes of the node to create.
    pub fn instantiate<'a>(
        &self,
        lookup: impl Fn(&str) -> Option<&'a Node> + Copy,
    ) -> Option<(NodeType, String, BTreeMap<String, String>)> {
        let origin = self.copy_from.as_deref().and_then(lookup);
        let kind = self.kind.or(origin.map(|n| n.kind))?;
        let label = match (&self.label, origin) {
            (Some(template), _) => template.render(lookup),
            (None, Some(origin)) => origin.label.clone(),
            (None, None) => return None,
        };
        let mut attributes = origin.map(|n| n.attributes.clone()).unwrap_or_default();
        for key in &self.remove {
            attributes.remove(key);
        }
        for (key, template) in &self.set {
            let value = template.render(lookup);
            if value.is_empty() {
                attributes.remove(key);
            } else {
                attributes.insert(key.clone(), value);
            }
        }
        Some((kind, label, attributes))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPattern {
    pub nodes: Vec<TemplateNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<TemplateEdge>,
    /// Fragment node receiving unmapped boundary edges; defaults to the
    /// first node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// Rewritten pattern node -> fragment node taking over its edges
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub boundary: BTreeMap<String, String>,
}

impl TargetPattern {
    pub fn root_name(&self) -> Option<&str> {
        self.root
            .as_deref()
            .or_else(|| self.nodes.first().map(|n| n.name.as_str()))
    }

    pub fn node(&self, name: &str) -> Option<&TemplateNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn validate(&self, source: &SourcePattern) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("target pattern produces no nodes".to_string());
        }
        let bound: HashSet<&str> = source.nodes.iter().map(|n| n.name.as_str()).collect();
        let mut names = HashSet::new();
        for node in &self.nodes {
            if node.name.is_empty() {
                return Err("template node without a name".to_string());
            }
            if bound.contains(node.name.as_str()) {
                return Err(format!(
                    "template node '{}' shadows a pattern node",
                    node.name
                ));
            }
            if !names.insert(node.name.as_str()) {
                return Err(format!("duplicate template node '{}'", node.name));
            }
            match &node.copy_from {
                Some(origin) if !bound.contains(origin.as_str()) => {
                    return Err(format!(
                        "template node '{}' copies unknown pattern node '{}'",
                        node.name, origin
                    ));
                }
                None if node.kind.is_none() || node.label.is_none() => {
                    return Err(format!(
                        "template node '{}' needs copyFrom or both kind and label",
                        node.name
                    ));
                }
                _ => {}
            }
            for template in node.label.iter().chain(node.set.values()) {
                template.check_references(&bound)?;
            }
        }
        for edge in &self.edges {
            for end in [&edge.source, &edge.target] {
                let fragment = names.contains(end.as_str());
                let context = bound.contains(end.as_str()) && !source.is_rewrite(end);
                if !fragment && !context {
                    return Err(format!("target edge endpoint '{}' dangles", end));
                }
            }
        }
        if let Some(root) = &self.root {
            if !names.contains(root.as_str()) {
                return Err(format!("root '{}' is not a template node", root));
            }
        }
        for (from, to) in &self.boundary {
            if !source.is_rewrite(from) {
                return Err(format!("boundary source '{}' is not a rewrite node", from));
            }
            if !names.contains(to.as_str()) {
                return Err(format!("boundary target '{}' is not a template node", to));
            }
        }
        Ok(())
    }
}

// ---- templates ----

#[derive(Debug, Clone, PartialEq)]
enum Field {
    Label,
    Attr(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Filter {
    PropertyName,
    AccessorKind,
    TrimUnderscore,
    LowerFirst,
    UpperFirst,
    DropWord(String),
}

impl Filter {
    fn parse(text: &str) -> Result<Self, String> {
        let caps = FILTER_CALL
            .captures(text.trim())
            .ok_or_else(|| format!("malformed filter '{}'", text))?;
        let arg = caps.get(2).map(|m| m.as_str().trim().to_string());
        let filter = match (&caps[1], arg) {
            ("property_name", None) => Filter::PropertyName,
            ("accessor_kind", None) => Filter::AccessorKind,
            ("trim_underscore", None) => Filter::TrimUnderscore,
            ("lower_first", None) => Filter::LowerFirst,
            ("upper_first", None) => Filter::UpperFirst,
            ("drop_word", Some(word)) if !word.is_empty() => Filter::DropWord(word),
            _ => return Err(format!("unknown filter '{}'", text)),
        };
        Ok(filter)
    }

    fn apply(&self, value: &str) -> String {
        match self {
            Filter::PropertyName => property_name(value),
            Filter::AccessorKind => accessor_kind(value).to_string(),
            Filter::TrimUnderscore => value.trim_start_matches('_').to_string(),
            Filter::LowerFirst => lower_first(value),
            Filter::UpperFirst => upper_first(value),
            Filter::DropWord(word) => drop_word(value, word),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Text(String),
    Value {
        node: String,
        field: Field,
        filters: Vec<Filter>,
    },
}

/// Text with `{node.label}` / `{node.attr.KEY}` placeholders, each
/// optionally piped through filters: `{m.attr.modifiers|drop_word(static)}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    parts: Vec<Part>,
}

impl FromStr for Template {
    type Err = String;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let mut parts = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(source) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                parts.push(Part::Text(source[last..whole.start()].to_string()));
            }
            last = whole.end();

            let mut pieces = inner.as_str().split('|');
            let path = pieces.next().unwrap_or_default().trim();
            let (node, field) = match path.split_once('.') {
                Some((node, "label")) => (node, Field::Label),
                Some((node, rest)) => match rest.strip_prefix("attr.") {
                    Some(key) if !key.is_empty() => (node, Field::Attr(key.to_string())),
                    _ => return Err(format!("unknown field in '{{{}}}'", path)),
                },
                None => return Err(format!("malformed placeholder '{{{}}}'", path)),
            };
            let filters = pieces.map(Filter::parse).collect::<Result<Vec<_>, _>>()?;
            parts.push(Part::Value {
                node: node.to_string(),
                field,
                filters,
            });
        }
        if last < source.len() {
            parts.push(Part::Text(source[last..].to_string()));
        }
        Ok(Template {
            source: source.to_string(),
            parts,
        })
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        source.parse().map_err(de::Error::custom)
    }
}

impl Template {
    /// Pattern node names this template reads from.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            Part::Value { node, .. } => Some(node.as_str()),
            Part::Text(_) => None,
        })
    }

    fn check_references(&self, known: &HashSet<&str>) -> Result<(), String> {
        match self.references().find(|name| !known.contains(name)) {
            Some(name) => Err(format!(
                "template '{}' references unknown node '{}'",
                self.source, name
            )),
            None => Ok(()),
        }
    }

    /// Substitute placeholders; missing nodes or attributes render empty.
    pub fn render<'a>(&self, lookup: impl Fn(&str) -> Option<&'a Node>) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Value {
                    node,
                    field,
                    filters,
                } => {
                    let value = lookup(node)
                        .map(|n| match field {
                            Field::Label => n.label.clone(),
                            Field::Attr(key) => n.attr_or_empty(key).to_string(),
                        })
                        .unwrap_or_default();
                    let value = filters.iter().fold(value, |v, f| f.apply(&v));
                    out.push_str(&value);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(kind: NodeType, label: &str, attrs: &[(&str, &str)]) -> Node {
        Node {
            id: "n0".to_string(),
            kind,
            label: label.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            seq: 0,
        }
    }

    #[test]
    fn templates_substitute_and_filter() {
        let method = node(NodeType::Method, "setUserName", &[("modifiers", "public static")]);
        let lookup = |name: &str| (name == "m").then_some(&method);

        let t: Template = "_{m.label|property_name}".parse().unwrap();
        assert_eq!(t.render(lookup), "_userName");

        let t: Template = "{m.label|accessor_kind}: {m.attr.modifiers|drop_word(static)}"
            .parse()
            .unwrap();
        assert_eq!(t.render(lookup), "set: public");

        let t: Template = "{other.label}{m.attr.missing}".parse().unwrap();
        assert_eq!(t.render(lookup), "");
    }

    #[test]
    fn malformed_templates_are_rejected() {
        assert!("{m.body}".parse::<Template>().is_err());
        assert!("{m}".parse::<Template>().is_err());
        assert!("{m.label|shout}".parse::<Template>().is_err());
        assert!("{m.label|drop_word}".parse::<Template>().is_err());
    }

    #[test]
    fn attribute_tests() {
        assert!(AttributeTest::HasWord("static".into()).test(Some("public static")));
        assert!(AttributeTest::LacksWord("static".into()).test(None));
        assert!(!AttributeTest::Equals("for".into()).test(Some("foreach")));
        assert!(AttributeTest::Absent(true).test(None));
        assert!(AttributeTest::Present(false).test(None));
        let regex = PatternRegex::new("get|is").unwrap();
        assert!(AttributeTest::Matches(regex.clone()).test(Some("is")));
        assert!(!AttributeTest::Matches(regex).test(Some("isX")));
    }

    #[test]
    fn filters_combine_kind_label_and_attributes() {
        let filter: NodeFilter = serde_json::from_str(
            r#"{"kinds": ["method"], "label": "(get|is)[A-Z]\\w*", "attributes": {"modifiers": {"lacksWord": "static"}}}"#,
        )
        .unwrap();
        assert!(filter.accepts(&node(NodeType::Method, "getName", &[])));
        assert!(!filter.accepts(&node(NodeType::Method, "getName", &[("modifiers", "static")])));
        assert!(!filter.accepts(&node(NodeType::Field, "getName", &[])));
        assert!(!filter.accepts(&node(NodeType::Method, "compute", &[])));
    }

    #[test]
    fn children_bounds() {
        let test = ChildrenTest {
            edge: EdgeType::Contains,
            all: Some(NodeFilter {
                kinds: vec![NodeType::Method],
                ..NodeFilter::default()
            }),
            min: 1,
            max: None,
        };
        let m = node(NodeType::Method, "f", &[]);
        let f = node(NodeType::Field, "x", &[]);
        assert!(test.accepts(&[&m]));
        assert!(!test.accepts(&[]));
        assert!(!test.accepts(&[&m, &f]));
    }

    fn patterns(source: &str, target: &str) -> (SourcePattern, TargetPattern) {
        (
            serde_json::from_str(source).unwrap(),
            serde_json::from_str(target).unwrap(),
        )
    }

    #[test]
    fn target_edges_must_not_dangle() {
        let (source, target) = patterns(
            r#"{"nodes": [{"name": "c", "role": "context"}, {"name": "m", "role": "rewrite"}]}"#,
            r#"{"nodes": [{"name": "f", "copyFrom": "m"}],
                "edges": [{"source": "c", "target": "f", "kind": "contains"},
                          {"source": "m", "target": "f", "kind": "calls"}]}"#,
        );
        assert!(source.validate().is_ok());
        let err = target.validate(&source).unwrap_err();
        assert!(err.contains("'m' dangles"), "{}", err);
    }

    #[test]
    fn source_needs_a_rewrite_node() {
        let source: SourcePattern =
            serde_json::from_str(r#"{"nodes": [{"name": "c"}]}"#).unwrap();
        assert!(source.validate().is_err());
    }

    #[test]
    fn template_node_instantiation() {
        let (_, target) = patterns(
            r#"{"nodes": []}"#,
            r#"{"nodes": [{"name": "i", "copyFrom": "c", "kind": "interface",
                           "set": {"modifiers": "{c.attr.modifiers|drop_word(abstract)}"},
                           "remove": ["location"]}]}"#,
        );
        let class = node(
            NodeType::Class,
            "Shape",
            &[("modifiers", "abstract"), ("location", "1:1"), ("typeParams", "<T>")],
        );
        let lookup = |name: &str| (name == "c").then_some(&class);
        let (kind, label, attributes) = target.nodes[0].instantiate(lookup).unwrap();
        assert_eq!(kind, NodeType::Interface);
        assert_eq!(label, "Shape");
        assert_eq!(
            attributes.into_iter().collect::<Vec<_>>(),
            vec![("typeParams".to_string(), "<T>".to_string())]
        );
    }
}
