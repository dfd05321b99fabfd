pub fn is_keyword(name: &str) -> bool {
    let keywords = [
        "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
        "const", "continue", "default", "do", "double", "else", "enum", "extends", "false",
        "final", "finally", "float", "for", "goto", "if", "implements", "import", "instanceof",
        "int", "interface", "long", "native", "new", "null", "package", "private", "protected",
        "public", "return", "short", "static", "strictfp", "super", "switch", "synchronized",
        "this", "throw", "throws", "transient", "true", "try", "void", "volatile", "while",
    ];

    keywords.contains(&name)
}

pub fn is_modifier(name: &str) -> bool {
    let modifiers = [
        "public",
        "private",
        "protected",
        "static",
        "abstract",
        "final",
        "native",
        "synchronized",
        "transient",
        "volatile",
        "strictfp",
        "default",
        "sealed",
    ];

    modifiers.contains(&name)
}

/// Whether a space-separated word list contains `word`.
pub fn has_word(list: &str, word: &str) -> bool {
    list.split_whitespace().any(|w| w == word)
}

pub fn drop_word(list: &str, word: &str) -> String {
    list.split_whitespace()
        .filter(|w| *w != word)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// Accessor prefixes, longest first
const ACCESSOR_PREFIXES: [&str; 3] = ["get", "set", "is"];

/// `getUserName` -> `userName`; names without an accessor prefix are
/// returned unchanged.
pub fn property_name(method: &str) -> String {
    for prefix in ACCESSOR_PREFIXES {
        if let Some(rest) = method.strip_prefix(prefix) {
            if rest.chars().next().is_some_and(char::is_uppercase) {
                return lower_first(rest);
            }
        }
    }
    method.to_string()
}

/// `set` for setters, `get` for getters and `is` predicates.
pub fn accessor_kind(method: &str) -> &'static str {
    if method.starts_with("set") { "set" } else { "get" }
}

/// Split on `separator` outside of `<>`, `()`, `[]` and `{}`.
pub fn split_top_level(s: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if c == separator && depth == 0 {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}
