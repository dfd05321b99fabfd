use crate::ast::{Diagnostic, Position, SourceRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub range: SourceRange,
    /// Whitespace or a comment separates this token from the previous one
    pub spaced: bool,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::Str && self.kind != TokenKind::Char && self.text == text
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }
}

// Longest operators first so that greedy matching works
const OPERATORS: &[&str] = &[
    "...", "->", "::", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "<<",
];

struct Cursor<'a> {
    src: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
    }
}

/// Split Java source into tokens. Comments and whitespace are dropped;
/// lexical problems are reported as diagnostics and never stop the scan.
pub fn tokenize(src: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut cursor = Cursor::new(src);
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();
    let mut spaced = false;

    while let Some(c) = cursor.peek() {
        let start = cursor.position();

        if c.is_whitespace() {
            cursor.bump();
            spaced = true;
            continue;
        }

        // Comments
        if c == '/' && cursor.peek_second() == Some('/') {
            cursor.eat_while(|c| c != '\n');
            spaced = true;
            continue;
        }
        if c == '/' && cursor.peek_second() == Some('*') {
            cursor.bump();
            cursor.bump();
            let mut closed = false;
            while let Some(c) = cursor.bump() {
                if c == '*' && cursor.peek() == Some('/') {
                    cursor.bump();
                    closed = true;
                    break;
                }
            }
            if !closed {
                diagnostics.push(Diagnostic::error(
                    "unterminated block comment",
                    SourceRange::new(start, cursor.position()),
                ));
            }
            spaced = true;
            continue;
        }

        let kind = if c.is_alphabetic() || c == '_' || c == '$' {
            cursor.eat_while(|c| c.is_alphanumeric() || c == '_' || c == '$');
            TokenKind::Ident
        } else if c.is_ascii_digit()
            || (c == '.' && cursor.peek_second().is_some_and(|n| n.is_ascii_digit()))
        {
            cursor.eat_while(|c| c.is_alphanumeric() || c == '.' || c == '_');
            TokenKind::Number
        } else if c == '"' || c == '\'' {
            if !scan_quoted(&mut cursor, c) {
                let what = if c == '"' { "string" } else { "character" };
                diagnostics.push(Diagnostic::error(
                    format!("unterminated {} literal", what),
                    SourceRange::new(start, cursor.position()),
                ));
            }
            if c == '"' { TokenKind::Str } else { TokenKind::Char }
        } else {
            match OPERATORS.iter().find(|op| cursor.rest().starts_with(**op)) {
                Some(op) => {
                    for _ in 0..op.len() {
                        cursor.bump();
                    }
                }
                None => {
                    cursor.bump();
                    if !"{}()[];,.<>=+-*/%!&|^~?:@".contains(c) {
                        diagnostics.push(Diagnostic::error(
                            format!("unexpected character '{}'", c),
                            SourceRange::new(start, cursor.position()),
                        ));
                    }
                }
            }
            TokenKind::Punct
        };

        let end = cursor.position();
        tokens.push(Token {
            kind,
            text: src[start.offset..end.offset].to_string(),
            range: SourceRange::new(start, end),
            spaced,
        });
        spaced = false;
    }

    (tokens, diagnostics)
}

// Consumes a quoted literal; an unterminated literal is closed at the end of
// the line.
fn scan_quoted(cursor: &mut Cursor, quote: char) -> bool {
    cursor.bump();
    while let Some(c) = cursor.peek() {
        match c {
            '\\' => {
                cursor.bump();
                if cursor.peek() != Some('\n') {
                    cursor.bump();
                }
            }
            '\n' => return false,
            c if c == quote => {
                cursor.bump();
                return true;
            }
            _ => {
                cursor.bump();
            }
        }
    }
    false
}

/// Re-join tokens, keeping a single space wherever the source had one.
pub fn join_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && token.spaced {
            out.push(' ');
        }
        out.push_str(&token.text);
    }
    out
}
