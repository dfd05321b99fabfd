//! TypeScript rendering primitives: Java to TypeScript type mapping,
//! statement translation and the per-kind declaration templates.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Node, NodeType};
use crate::utils::{has_word, is_keyword, is_modifier, split_top_level};

pub const INDENT: &str = "  ";

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

static LOCAL_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(final\s+)?([A-Za-z_$][\w$.]*(?:\s*<.*>)?(?:\s*\[\s*\])*)\s+([A-Za-z_$][\w$]*)\s*(?:=\s*(.*?))?\s*;$",
    )
    .expect("local declaration regex")
});

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_$][\w$]*").expect("identifier regex"));

static LAMBDA_SINGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_$][\w$]*)\s*->").expect("lambda regex"));

static LAMBDA_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([^()]*)\)\s*->").expect("lambda list regex"));

static CATCH_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bcatch\s*\(\s*(?:final\s+)?[\w$.|\s]+?\s+([A-Za-z_$][\w$]*)\s*\)")
        .expect("catch regex")
});

// Applied in order to code outside of string and char literals
static EXPRESSION_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bSystem\.out\.print(?:ln|f)?\s*\(", "console.log("),
        (r"\bSystem\.err\.print(?:ln|f)?\s*\(", "console.error("),
        (r"\bString\.valueOf\s*\(", "String("),
        (r"\bInteger\.parseInt\s*\(", "parseInt("),
        (r"\bDouble\.parseDouble\s*\(", "parseFloat("),
        (r"\bnew\s+(?:ArrayList|LinkedList)\s*(?:<[^()]*>)?\s*\(\s*\)", "[]"),
        (r"\bnew\s+(?:HashMap|TreeMap|LinkedHashMap)\s*(?:<[^()]*>)?\s*\(\s*\)", "new Map()"),
        (r"\bnew\s+(?:HashSet|TreeSet|LinkedHashSet)\s*(?:<[^()]*>)?\s*\(\s*\)", "new Set()"),
        (r"\.size\s*\(\s*\)", ".length"),
        (r"\.length\s*\(\s*\)", ".length"),
        (r"\bcatch\s*\(\s*(?:final\s+)?[\w$.|\s]+?\s+([A-Za-z_$][\w$]*)\s*\)", "catch ($1)"),
        (r"(^|[^=!<>])==([^=]|$)", "${1}===${2}"),
        (r"!=([^=]|$)", "!==${1}"),
        (r"\b(\d+)[lL]\b", "$1"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("expression rule regex"), replacement))
    .collect()
});

/// Map a Java type expression to its TypeScript counterpart.
pub fn ts_type(java: &str) -> String {
    let ty = java.trim();
    if ty.is_empty() || ty == "?" {
        return "any".to_string();
    }
    if let Some(element) = ty.strip_suffix("[]").or_else(|| ty.strip_suffix("...")) {
        return array_of(ts_type(element));
    }
    if let Some(bound) = ty
        .strip_prefix("? extends ")
        .or_else(|| ty.strip_prefix("? super "))
    {
        return ts_type(bound);
    }

    let (base, args) = match ty.find('<') {
        Some(open) if ty.ends_with('>') => (
            ty[..open].trim(),
            split_top_level(&ty[open + 1..ty.len() - 1], ','),
        ),
        _ => (ty, Vec::new()),
    };
    let base = base.rsplit('.').next().unwrap_or(base);
    let args: Vec<String> = args.iter().map(|a| ts_type(a)).collect();
    let arg = |i: usize| args.get(i).cloned().unwrap_or_else(|| "any".to_string());

    match base {
        "byte" | "short" | "int" | "long" | "float" | "double" | "Byte" | "Short" | "Integer"
        | "Long" | "Float" | "Double" | "Number" | "BigInteger" | "BigDecimal" => "number".to_string(),
        "char" | "Character" | "String" | "CharSequence" => "string".to_string(),
        "boolean" | "Boolean" => "boolean".to_string(),
        "void" | "Void" => "void".to_string(),
        "Object" => "any".to_string(),
        "List" | "ArrayList" | "LinkedList" | "Collection" | "Iterable" | "Set" | "HashSet"
        | "TreeSet" | "LinkedHashSet" => array_of(arg(0)),
        "Map" | "HashMap" | "TreeMap" | "LinkedHashMap" => format!("Map<{}, {}>", arg(0), arg(1)),
        _ if args.is_empty() => base.to_string(),
        _ => format!("{}<{}>", base, args.join(", ")),
    }
}

fn array_of(element: String) -> String {
    if element.contains(' ') {
        format!("({})[]", element)
    } else {
        format!("{}[]", element)
    }
}

/// `<T extends Comparable<T>>` with bounds mapped; empty input stays empty.
pub fn ts_type_params(params: &str) -> String {
    let trimmed = params.trim();
    let inner = trimmed
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(trimmed);
    if inner.trim().is_empty() {
        return String::new();
    }
    let mapped: Vec<String> = split_top_level(inner, ',')
        .iter()
        .map(|param| match param.split_once(" extends ") {
            Some((name, bounds)) => {
                let bounds: Vec<String> = split_top_level(bounds, '&').iter().map(|b| ts_type(b)).collect();
                format!("{} extends {}", name.trim(), bounds.join(" & "))
            }
            None => param.trim().to_string(),
        })
        .collect();
    format!("<{}>", mapped.join(", "))
}

/// Split a `Type name, Type name` parameter list into `(type, name)` pairs.
pub fn parameters(params: &str) -> Vec<(String, String)> {
    split_top_level(params, ',')
        .into_iter()
        .filter_map(|param| {
            let words: Vec<&str> = param
                .split_whitespace()
                .filter(|w| !is_modifier(w) && !w.starts_with('@'))
                .collect();
            let (name, ty) = words.split_last()?;
            Some((ty.join(" "), name.to_string()))
        })
        .collect()
}

/// `int count, String... names` -> `count: number, ...names: string[]`
pub fn ts_params(params: &str) -> String {
    parameters(params)
        .into_iter()
        .map(|(ty, name)| match ty.strip_suffix("...") {
            Some(element) => format!("...{}: {}", name, array_of(ts_type(element))),
            None => format!("{}: {}", name, ts_type(&ty)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Comma separated supertype list, each mapped.
pub fn supertypes(list: &str) -> Vec<String> {
    split_top_level(list, ',').iter().map(|t| ts_type(t)).collect()
}

// Run `f` over the parts of `line` outside of string and char literals
fn map_code(line: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(line.len());
    let mut code = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c != '"' && c != '\'' {
            code.push(c);
            continue;
        }
        out.push_str(&f(&code));
        code.clear();
        out.push(c);
        while let Some(d) = chars.next() {
            out.push(d);
            if d == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if d == c {
                break;
            }
        }
    }
    out.push_str(&f(&code));
    out
}

/// `let x: number = 1;` for `int x = 1;`. `None` when the line is not a
/// local variable declaration.
fn translate_declaration(line: &str) -> Option<String> {
    let caps = LOCAL_DECLARATION.captures(line)?;
    let ty = caps.get(2)?.as_str();
    let head = ty.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$')).next()?;
    if is_keyword(head) && !PRIMITIVES.contains(&head) {
        return None;
    }
    let name = caps.get(3)?.as_str();
    let keyword = if caps.get(1).is_some() { "const" } else { "let" };
    let annotation = if ty == "var" {
        String::new()
    } else {
        format!(": {}", ts_type(ty))
    };
    Some(match caps.get(4) {
        Some(init) => format!("{} {}{} = {};", keyword, name, annotation, init.as_str()),
        None => format!("{} {}{};", keyword, name, annotation),
    })
}

/// Name declared by a local variable declaration line, if it is one.
pub fn declared_local(line: &str) -> Option<String> {
    translate_declaration(line.trim())?;
    LOCAL_DECLARATION
        .captures(line.trim())
        .and_then(|caps| caps.get(3))
        .map(|m| m.as_str().to_string())
}

/// Identifier resolution for one callable body.
///
/// `members` qualifies bare field names (`count` -> `this.count`),
/// `methods` qualifies bare calls, `hidden` holds parameters and locals that
/// shadow them. Aliases rename `this.x` accesses; module calls drop the
/// `Module.` prefix of functions hoisted out of a class.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    members: HashMap<String, String>,
    methods: HashMap<String, String>,
    hidden: HashSet<String>,
    aliases: Vec<(Regex, String)>,
    module_calls: Vec<(Regex, String)>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn member(&mut self, name: &str, qualified: String) {
        self.members.insert(name.to_string(), qualified);
    }

    pub fn method(&mut self, name: &str, qualified: String) {
        self.methods.insert(name.to_string(), qualified);
    }

    pub fn hide(&mut self, name: &str) {
        self.hidden.insert(name.to_string());
    }

    /// `this.from` becomes `this.to`.
    pub fn alias(&mut self, from: &str, to: &str) {
        if let Ok(re) = Regex::new(&format!(r"\bthis\.{}\b", regex::escape(from))) {
            self.aliases.push((re, format!("this.{}", to)));
        }
    }

    pub fn module_function(&mut self, module: &str, name: &str) {
        let pattern = format!(r"\b{}\.{}\s*\(", regex::escape(module), regex::escape(name));
        if let Ok(re) = Regex::new(&pattern) {
            self.module_calls.push((re, format!("{}(", name)));
        }
    }

    /// Hide locals, catch variables and lambda parameters declared in `lines`.
    pub fn hide_locals<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) {
        for line in lines {
            if let Some(name) = declared_local(line) {
                self.hide(&name);
            }
            for caps in CATCH_VARIABLE.captures_iter(line) {
                self.hide(&caps[1]);
            }
            for caps in LAMBDA_LIST.captures_iter(line) {
                for param in caps[1].split(',') {
                    if let Some(name) = param.split_whitespace().last() {
                        self.hide(name);
                    }
                }
            }
            for caps in LAMBDA_SINGLE.captures_iter(line) {
                self.hide(&caps[1]);
            }
        }
    }

    /// Translate one Java statement line.
    pub fn translate(&self, line: &str) -> String {
        let trimmed = line.trim();
        let declared = translate_declaration(trimmed);
        self.translate_expression(declared.as_deref().unwrap_or(trimmed))
    }

    /// Translate an expression or header fragment.
    pub fn translate_expression(&self, text: &str) -> String {
        map_code(text, |code| {
            let mut code = code.to_string();
            for (re, replacement) in EXPRESSION_RULES.iter() {
                code = re.replace_all(&code, *replacement).into_owned();
            }
            for (re, replacement) in &self.module_calls {
                code = re.replace_all(&code, replacement.as_str()).into_owned();
            }
            for (re, replacement) in &self.aliases {
                code = re.replace_all(&code, replacement.as_str()).into_owned();
            }
            self.qualify(&code)
        })
    }

    fn qualify(&self, code: &str) -> String {
        if self.members.is_empty() && self.methods.is_empty() {
            return code.to_string();
        }
        let mut out = String::with_capacity(code.len());
        let mut last = 0;
        for found in IDENTIFIER.find_iter(code) {
            let name = found.as_str();
            if self.hidden.contains(name) {
                continue;
            }
            let before = code[..found.start()].chars().next_back();
            if before.is_some_and(|c| c == '.' || c.is_alphanumeric() || c == '_' || c == '$') {
                continue;
            }
            let is_call = code[found.end()..].trim_start().starts_with('(');
            let table = if is_call { &self.methods } else { &self.members };
            if let Some(qualified) = table.get(name) {
                out.push_str(&code[last..found.start()]);
                out.push_str(qualified);
                last = found.end();
            }
        }
        out.push_str(&code[last..]);
        out
    }
}

fn visibility(modifiers: &str) -> Option<&'static str> {
    ["private", "protected", "public"]
        .into_iter()
        .find(|v| has_word(modifiers, v))
}

/// Keyword prefix of a class member: visibility, `static`, `abstract`,
/// `readonly`, each only when present in the Java modifiers.
pub fn member_prefix(node: &Node) -> String {
    let modifiers = node.attr_or_empty("modifiers");
    let mut words: Vec<&str> = visibility(modifiers).into_iter().collect();
    if has_word(modifiers, "static") {
        words.push("static");
    }
    if node.kind.is_callable() && has_word(modifiers, "abstract") {
        words.push("abstract");
    }
    if node.kind == NodeType::Field && has_word(modifiers, "final") {
        words.push("readonly");
    }
    words.iter().map(|w| format!("{} ", w)).collect()
}

pub fn is_exported(node: &Node) -> bool {
    has_word(node.attr_or_empty("modifiers"), "public")
}

/// `class Name<T> extends Base implements A, B`
pub fn class_signature(node: &Node, extends: Option<&str>, implements: &[String]) -> String {
    let mut signature = format!(
        "class {}{}",
        node.label,
        ts_type_params(node.attr_or_empty("typeParams"))
    );
    if let Some(base) = extends {
        signature.push_str(&format!(" extends {}", base));
    }
    if !implements.is_empty() {
        signature.push_str(&format!(" implements {}", implements.join(", ")));
    }
    signature
}

/// `interface Name<T> extends A, B`
pub fn interface_signature(node: &Node, extends: &[String]) -> String {
    let mut signature = format!(
        "interface {}{}",
        node.label,
        ts_type_params(node.attr_or_empty("typeParams"))
    );
    if !extends.is_empty() {
        signature.push_str(&format!(" extends {}", extends.join(", ")));
    }
    signature
}

fn initializer(node: &Node, scope: &Scope) -> String {
    match node.attr("init") {
        Some(init) if !init.trim().is_empty() => format!(" = {}", scope.translate_expression(init)),
        _ => String::new(),
    }
}

/// Field inside a class body.
pub fn class_field(node: &Node, scope: &Scope) -> String {
    format!(
        "{}{}: {}{};",
        member_prefix(node),
        node.label,
        ts_type(node.attr_or_empty("type")),
        initializer(node, scope)
    )
}

/// Field inside an interface body; Java interface fields are constants.
pub fn interface_field(node: &Node) -> String {
    format!("readonly {}: {};", node.label, ts_type(node.attr_or_empty("type")))
}

/// Field without an enclosing type.
pub fn module_variable(node: &Node, scope: &Scope) -> String {
    let modifiers = node.attr_or_empty("modifiers");
    format!(
        "{}{} {}: {}{};",
        if has_word(modifiers, "public") { "export " } else { "" },
        if has_word(modifiers, "final") { "const" } else { "let" },
        node.label,
        ts_type(node.attr_or_empty("type")),
        initializer(node, scope)
    )
}

fn return_annotation(node: &Node) -> String {
    match node.attr("returnType") {
        Some(ty) if !ty.trim().is_empty() => format!(": {}", ts_type(ty)),
        _ => String::new(),
    }
}

/// Signature of a callable without its prefix or body.
pub fn callable_signature(node: &Node) -> String {
    let params = ts_params(node.attr_or_empty("params"));
    match node.kind {
        NodeType::Constructor => format!("constructor({})", params),
        NodeType::Accessor if node.attr("accessorKind") == Some("set") => {
            format!("set {}({})", node.label, params)
        }
        NodeType::Accessor => format!("get {}(){}", node.label, return_annotation(node)),
        _ => format!(
            "{}{}({}){}",
            node.label,
            ts_type_params(node.attr_or_empty("typeParams")),
            params,
            return_annotation(node)
        ),
    }
}

/// Property signature an accessor contributes to an interface.
pub fn interface_property(node: &Node) -> String {
    let ty = if node.attr("accessorKind") == Some("set") {
        parameters(node.attr_or_empty("params"))
            .first()
            .map(|(ty, _)| ts_type(ty))
            .unwrap_or_else(|| "any".to_string())
    } else {
        ts_type(node.attr_or_empty("returnType"))
    };
    format!("{}: {};", node.label, ty)
}

/// Opening and closing lines of a loop or array method, without indentation.
pub fn loop_frame(node: &Node, scope: &Scope) -> (String, String) {
    let attr = |key: &str| scope.translate_expression(node.attr_or_empty(key));
    if node.kind == NodeType::ArrayMethod {
        let method = node.attr("method").unwrap_or("forEach");
        return (
            format!("{}.{}(({}) => {{", attr("iterable"), method, node.attr_or_empty("var")),
            "});".to_string(),
        );
    }
    let label = node.attr("label").map(|l| format!("{}: ", l)).unwrap_or_default();
    let (open, close) = match node.attr_or_empty("loop") {
        "foreach" => (
            format!("for (const {} of {}) {{", node.attr_or_empty("var"), attr("iterable")),
            "}".to_string(),
        ),
        "while" => (format!("while ({}) {{", attr("condition")), "}".to_string()),
        "do" => ("do {".to_string(), format!("}} while ({});", attr("condition"))),
        _ => {
            let init = node.attr_or_empty("init");
            let init = if init.trim().is_empty() {
                String::new()
            } else {
                scope
                    .translate(&format!("{};", init))
                    .trim_end_matches(';')
                    .to_string()
            };
            (
                format!("for ({}; {}; {}) {{", init, attr("condition"), attr("update")),
                "}".to_string(),
            )
        }
    };
    (format!("{}{}", label, open), close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn node(kind: NodeType, label: &str, attrs: &[(&str, &str)]) -> Node {
        Node {
            id: "n0".to_string(),
            kind,
            label: label.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            seq: 0,
        }
    }

    #[test]
    fn maps_java_types() {
        assert_eq!(ts_type("int"), "number");
        assert_eq!(ts_type("java.lang.String"), "string");
        assert_eq!(ts_type("Object"), "any");
        assert_eq!(ts_type("List<Integer>"), "number[]");
        assert_eq!(ts_type("Set<String>"), "string[]");
        assert_eq!(ts_type("int[][]"), "number[][]");
        assert_eq!(ts_type("Map<String, List<Long>>"), "Map<string, number[]>");
        assert_eq!(ts_type("Optional<User>"), "Optional<User>");
        assert_eq!(ts_type("List<? extends Shape>"), "Shape[]");
        assert_eq!(ts_type("ArrayList<>"), "any[]");
    }

    #[test]
    fn maps_parameters_and_generics() {
        assert_eq!(
            ts_params("int count, Map<String, Integer> totals, String... names"),
            "count: number, totals: Map<string, number>, ...names: string[]"
        );
        assert_eq!(ts_params("final boolean flag"), "flag: boolean");
        assert_eq!(ts_type_params("<T extends Comparable<T>, U>"), "<T extends Comparable<T>, U>");
        assert_eq!(ts_type_params(""), "");
    }

    #[test]
    fn translates_declarations() {
        let scope = Scope::new();
        assert_eq!(scope.translate("int x = 1;"), "let x: number = 1;");
        assert_eq!(scope.translate("final String s = \"a\";"), "const s: string = \"a\";");
        assert_eq!(
            scope.translate("List<String> names = new ArrayList<>();"),
            "let names: string[] = [];"
        );
        assert_eq!(scope.translate("var total = 0L;"), "let total = 0;");
        assert_eq!(scope.translate("User user;"), "let user: User;");
        assert_eq!(scope.translate("return count;"), "return count;");
        assert_eq!(scope.translate("x = y;"), "x = y;");
    }

    #[test]
    fn translates_expressions_outside_literals() {
        let scope = Scope::new();
        assert_eq!(
            scope.translate("System.out.println(\"a == b\" + (a == b));"),
            "console.log(\"a == b\" + (a === b));"
        );
        assert_eq!(scope.translate("System.err.println(msg);"), "console.error(msg);");
        assert_eq!(scope.translate("if (items.size() != 0) {"), "if (items.length !== 0) {");
        assert_eq!(scope.translate("n = s.length();"), "n = s.length;");
        assert_eq!(
            scope.translate("Map<String, Integer> m = new HashMap<String, Integer>();"),
            "let m: Map<string, number> = new Map();"
        );
        assert_eq!(
            scope.translate("try { run(); } catch (IOException e) { log(e); }"),
            "try { run(); } catch (e) { log(e); }"
        );
        assert_eq!(scope.translate("s = String.valueOf(n);"), "s = String(n);");
    }

    #[test]
    fn qualifies_members_unless_shadowed() {
        let mut scope = Scope::new();
        scope.member("count", "this.count".to_string());
        scope.member("total", "Stats.total".to_string());
        scope.method("reset", "this.reset".to_string());
        scope.hide("total");
        assert_eq!(
            scope.translate("count = count + total + other.count;"),
            "this.count = this.count + total + other.count;"
        );
        assert_eq!(scope.translate("reset();"), "this.reset();");
        assert_eq!(scope.translate("log(\"count\");"), "log(\"count\");");
    }

    #[test]
    fn aliases_and_module_calls() {
        let mut scope = Scope::new();
        scope.alias("name", "_name");
        scope.module_function("MathUtils", "square");
        assert_eq!(scope.translate("this.name = name;"), "this._name = name;");
        assert_eq!(scope.translate("return MathUtils.square(x);"), "return square(x);");
    }

    #[test]
    fn hides_locals_lambdas_and_catch_variables() {
        let mut scope = Scope::new();
        for name in ["a", "b", "e", "x", "y"] {
            scope.member(name, format!("this.{}", name));
        }
        scope.hide_locals([
            "int a = 1;",
            "list.forEach(x -> use(x));",
            "f((b, y) -> b + y);",
            "try { } catch (Exception e) { }",
        ]);
        assert_eq!(scope.translate("a + b + e + x + y;"), "a + b + e + x + y;");
    }

    #[test]
    fn member_templates() {
        let field = node(
            NodeType::Field,
            "MAX",
            &[("modifiers", "private static final"), ("type", "int"), ("init", "10")],
        );
        assert_eq!(class_field(&field, &Scope::new()), "private static readonly MAX: number = 10;");
        assert_eq!(interface_field(&field), "readonly MAX: number;");

        let method = node(
            NodeType::Method,
            "find",
            &[("typeParams", "<T>"), ("params", "List<T> items, int index"), ("returnType", "T")],
        );
        assert_eq!(callable_signature(&method), "find<T>(items: T[], index: number): T");

        let setter = node(
            NodeType::Accessor,
            "name",
            &[("accessorKind", "set"), ("params", "String name"), ("returnType", "void")],
        );
        assert_eq!(callable_signature(&setter), "set name(name: string)");
        assert_eq!(interface_property(&setter), "name: string;");

        let getter = node(NodeType::Accessor, "ready", &[("accessorKind", "get"), ("returnType", "boolean")]);
        assert_eq!(callable_signature(&getter), "get ready(): boolean");
    }

    #[test]
    fn loop_frames() {
        let scope = Scope::new();
        let classic = node(
            NodeType::Loop,
            "for",
            &[("loop", "for"), ("init", "int i = 0"), ("condition", "i < n"), ("update", "i++")],
        );
        assert_eq!(
            loop_frame(&classic, &scope),
            ("for (let i: number = 0; i < n; i++) {".to_string(), "}".to_string())
        );

        let each = node(NodeType::Loop, "foreach", &[("loop", "foreach"), ("var", "s"), ("iterable", "items")]);
        assert_eq!(loop_frame(&each, &scope).0, "for (const s of items) {");

        let labeled = node(NodeType::Loop, "while", &[("loop", "while"), ("condition", "true"), ("label", "outer")]);
        assert_eq!(loop_frame(&labeled, &scope).0, "outer: while (true) {");

        let repeat = node(NodeType::Loop, "do", &[("loop", "do"), ("condition", "x != 0")]);
        assert_eq!(
            loop_frame(&repeat, &scope),
            ("do {".to_string(), "} while (x !== 0);".to_string())
        );

        let call = node(NodeType::ArrayMethod, "forEach", &[("var", "s"), ("iterable", "items")]);
        assert_eq!(
            loop_frame(&call, &scope),
            ("items.forEach((s) => {".to_string(), "});".to_string())
        );
    }
}
