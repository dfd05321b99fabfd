use tracing::{debug, warn};

use crate::ast::{AstKind, AstNode, Diagnostic, ParseOutput, Position, SourceRange};
use crate::error::{EngineError, Result};
use crate::lexer::{join_tokens, tokenize, Token, TokenKind};
use crate::utils::{is_keyword, is_modifier};

/// Parse Java source into an AST.
///
/// Grammar violations never abort: the offending tokens become an `error`
/// node, a diagnostic is recorded and parsing resumes. Only empty input is
/// fatal.
pub fn parse(src: &str) -> Result<ParseOutput> {
    if src.trim().is_empty() {
        return Err(EngineError::EmptyInput);
    }

    let (tokens, mut diagnostics) = tokenize(src);
    let eof = end_position(src);
    let mut parser = Parser {
        tokens,
        pos: 0,
        diagnostics: Vec::new(),
        eof,
    };
    let ast = parser.parse_program();
    diagnostics.append(&mut parser.diagnostics);

    if diagnostics.is_empty() {
        debug!(nodes = ast.size(), "parsed source");
    } else {
        warn!(
            nodes = ast.size(),
            diagnostics = diagnostics.len(),
            "parsed source with recovered syntax errors"
        );
    }

    Ok(ParseOutput { ast, diagnostics })
}

fn end_position(src: &str) -> Position {
    let line = src.matches('\n').count() + 1;
    let last_line = src.rsplit('\n').next().unwrap_or("");
    Position {
        line,
        column: last_line.chars().count() + 1,
        offset: src.len(),
    }
}

// Statements that end with a block rather than a semicolon
const BLOCK_STATEMENTS: &[&str] = &["try", "switch", "synchronized"];
const BLOCK_CONTINUATIONS: &[&str] = &["catch", "finally"];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    eof: Position,
}

impl Parser {
    // ---- token helpers ----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn at(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(text))
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.at(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self) -> Option<Token> {
        match self.peek() {
            Some(t) if t.is_ident() && !is_keyword(&t.text) => self.advance(),
            _ => None,
        }
    }

    fn start(&self) -> Position {
        self.peek().map(|t| t.range.start).unwrap_or(self.eof)
    }

    fn prev_end(&self) -> Position {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(t) => t.range.end,
            None => self.start(),
        }
    }

    fn here(&self) -> SourceRange {
        match self.peek() {
            Some(t) => t.range,
            None => SourceRange::new(self.eof, self.eof),
        }
    }

    fn error(&mut self, message: impl Into<String>, range: SourceRange) {
        self.diagnostics.push(Diagnostic::error(message, range));
    }

    fn expect(&mut self, text: &str, context: &str) -> bool {
        if self.eat(text) {
            return true;
        }
        let found = self
            .peek()
            .map(|t| format!("'{}'", t.text))
            .unwrap_or_else(|| "end of input".to_string());
        let range = self.here();
        self.error(format!("expected '{}' {}, found {}", text, context, found), range);
        false
    }

    // ---- recovery ----

    fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.advance() {
            if token.is("{") {
                depth += 1;
            } else if token.is("}") {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return;
                }
            }
        }
    }

    /// Skip to the next `;` (consumed) or the `}` closing the current scope
    /// (left in place), stepping over balanced blocks.
    fn recover(&mut self, message: &str) -> AstNode {
        let first = self.pos;
        let start = self.start();
        loop {
            match self.peek() {
                None => break,
                Some(t) if t.is("}") => break,
                Some(t) if t.is(";") => {
                    self.pos += 1;
                    break;
                }
                Some(t) if t.is("{") => self.skip_balanced(),
                Some(_) => self.pos += 1,
            }
        }
        // Always make progress unless we stopped at a scope end
        if self.pos == first && !self.at_eof() && !self.at("}") {
            self.pos += 1;
        }
        let range = SourceRange::new(start, self.prev_end().max_offset(start));
        self.error(message, range);
        AstNode::new(AstKind::Error, range)
            .with_attr("text", join_tokens(&self.tokens[first..self.pos]))
    }

    // ---- declarations ----

    fn parse_program(&mut self) -> AstNode {
        let start = self.start();
        let mut program = AstNode::new(AstKind::Program, SourceRange::new(start, self.eof));

        while !self.at_eof() {
            if self.at("package") || self.at("import") {
                program.children.push(self.parse_header_decl());
            } else if self.eat(";") {
                continue;
            } else if self.at("}") {
                let range = self.here();
                self.pos += 1;
                self.error("unmatched '}'", range);
                program
                    .children
                    .push(AstNode::new(AstKind::Error, range).with_attr("text", "}"));
            } else {
                let member = self.parse_member(None);
                program.children.push(member);
            }
        }

        program
    }

    fn parse_header_decl(&mut self) -> AstNode {
        let start = self.start();
        let kind = if self.at("package") {
            AstKind::Package
        } else {
            AstKind::Import
        };
        self.advance();
        let first = self.pos;
        while let Some(t) = self.peek() {
            if t.is(";") || t.is("{") || t.is("}") {
                break;
            }
            self.pos += 1;
        }
        let name = join_tokens(&self.tokens[first..self.pos]);
        self.expect(";", "after declaration");
        AstNode::named(kind, name, SourceRange::new(start, self.prev_end()))
    }

    fn parse_modifiers(&mut self) -> (Vec<String>, Vec<String>) {
        let mut modifiers = Vec::new();
        let mut annotations = Vec::new();
        loop {
            if self.at("@") && !self.peek_at(1).is_some_and(|t| t.is("interface")) {
                let first = self.pos;
                self.pos += 1;
                while self.eat_ident().is_some() {
                    if !self.eat(".") {
                        break;
                    }
                }
                if self.at("(") {
                    self.paren_group();
                }
                annotations.push(join_tokens(&self.tokens[first..self.pos]));
            } else if self.peek().is_some_and(|t| t.is_ident() && is_modifier(&t.text)) {
                if let Some(t) = self.advance() {
                    modifiers.push(t.text);
                }
            } else {
                return (modifiers, annotations);
            }
        }
    }

    /// A declaration at program level (`owner == None`) or inside a type
    /// body.
    fn parse_member(&mut self, owner: Option<&str>) -> AstNode {
        let start = self.start();
        let (modifiers, annotations) = self.parse_modifiers();

        if self.at("class") || self.at("interface") {
            let mut decl = self.parse_type_decl(start);
            decl.set_attr("modifiers", modifiers.join(" "));
            decl.set_attr("annotations", annotations.join(" "));
            return decl;
        }
        if self.at("enum") || self.at("record") || self.at("@") {
            let what = if self.at("@") {
                "annotation type".to_string()
            } else {
                self.peek().map(|t| t.text.clone()).unwrap_or_default()
            };
            return self.skip_declaration(&format!("unsupported declaration: {}", what));
        }

        let Some(owner) = owner else {
            return self.recover("expected class or interface declaration");
        };

        if self.at("{") {
            // Instance or static initializer
            let mut block = self.parse_block();
            block.set_attr("modifiers", modifiers.join(" "));
            return block;
        }

        let type_params = if self.at("<") {
            self.angle_group()
        } else {
            String::new()
        };

        let is_constructor = self.peek().is_some_and(|t| t.text == owner)
            && self.peek_at(1).is_some_and(|t| t.is("("));

        let mut member = if is_constructor {
            let Some(name) = self.advance() else {
                return self.recover("expected constructor name");
            };
            let mut ctor = AstNode::named(AstKind::Constructor, name.text, name.range);
            self.parse_method_rest(&mut ctor);
            ctor
        } else {
            let Some(ty) = self.parse_type() else {
                return self.recover("expected member declaration");
            };
            let Some(name) = self.eat_ident() else {
                return self.recover("expected member name");
            };
            if self.at("(") {
                let mut method = AstNode::named(AstKind::Method, name.text, name.range);
                method.set_attr("returnType", ty);
                self.parse_method_rest(&mut method);
                method
            } else {
                return self.parse_fields(start, ty, name, &modifiers, &annotations);
            }
        };

        member.range = SourceRange::new(start, self.prev_end());
        member.set_attr("modifiers", modifiers.join(" "));
        member.set_attr("annotations", annotations.join(" "));
        member.set_attr("typeParams", type_params);
        member
    }

    fn skip_declaration(&mut self, message: &str) -> AstNode {
        let first = self.pos;
        let start = self.start();
        while let Some(t) = self.peek() {
            if t.is("{") {
                self.skip_balanced();
                break;
            }
            if t.is(";") {
                self.pos += 1;
                break;
            }
            if t.is("}") {
                break;
            }
            self.pos += 1;
        }
        let range = SourceRange::new(start, self.prev_end().max_offset(start));
        self.error(message, range);
        AstNode::new(AstKind::Error, range)
            .with_attr("text", join_tokens(&self.tokens[first..self.pos]))
    }

    fn parse_type_decl(&mut self, start: Position) -> AstNode {
        let is_interface = self.at("interface");
        self.advance();
        let kind = if is_interface {
            AstKind::Interface
        } else {
            AstKind::Class
        };

        let Some(name) = self.eat_ident() else {
            return self.recover("expected type name");
        };
        let mut decl = AstNode::named(kind, name.text.clone(), name.range);

        if self.at("<") {
            let params = self.angle_group();
            decl.set_attr("typeParams", params);
        }
        if self.eat("extends") {
            let bases = self.type_list();
            decl.set_attr("extends", bases.join(", "));
        }
        if self.eat("implements") {
            let interfaces = self.type_list();
            decl.set_attr("implements", interfaces.join(", "));
        }
        if self.eat("permits") {
            self.type_list();
        }

        let header = SourceRange::new(start, self.prev_end());
        if !self.expect("{", "to open type body") {
            let error = self.recover("malformed type declaration");
            decl.children.push(error);
            decl.range = SourceRange::new(start, self.prev_end());
            return decl;
        }

        loop {
            if self.at_eof() {
                let what = if is_interface { "interface" } else { "class" };
                self.error(format!("expected '}}' to close {} '{}'", what, name.text), header);
                break;
            }
            if self.eat("}") {
                break;
            }
            if self.eat(";") {
                continue;
            }
            let before = self.pos;
            let member = self.parse_member(Some(&name.text));
            decl.children.push(member);
            if self.pos == before && !self.at("}") {
                self.pos += 1;
            }
        }

        decl.range = SourceRange::new(start, self.prev_end());
        decl
    }

    fn parse_method_rest(&mut self, method: &mut AstNode) {
        self.expect("(", "to open parameter list");
        while !self.at_eof() && !self.at(")") {
            let start = self.start();
            let (modifiers, annotations) = self.parse_modifiers();
            let param = match (self.parse_type(), self.peek().is_some_and(|t| t.is_ident())) {
                (Some(mut ty), true) => {
                    let Some(name) = self.advance() else { break };
                    while self.at("[") && self.peek_at(1).is_some_and(|t| t.is("]")) {
                        self.pos += 2;
                        ty.push_str("[]");
                    }
                    let mut param = AstNode::named(
                        AstKind::Parameter,
                        name.text,
                        SourceRange::new(start, self.prev_end()),
                    )
                    .with_attr("type", ty);
                    param.set_attr("modifiers", modifiers.join(" "));
                    param.set_attr("annotations", annotations.join(" "));
                    param
                }
                _ => {
                    let first = self.pos;
                    while let Some(t) = self.peek() {
                        if t.is(",") || t.is(")") || t.is("{") || t.is(";") {
                            break;
                        }
                        self.pos += 1;
                    }
                    let range = SourceRange::new(start, self.prev_end().max_offset(start));
                    self.error("malformed parameter", range);
                    AstNode::new(AstKind::Error, range)
                        .with_attr("text", join_tokens(&self.tokens[first..self.pos]))
                }
            };
            method.children.push(param);
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")", "to close parameter list");

        while self.at("[") && self.peek_at(1).is_some_and(|t| t.is("]")) {
            self.pos += 2;
        }
        if self.eat("throws") {
            let thrown = self.type_list();
            method.set_attr("throws", thrown.join(", "));
        }

        if self.at("{") {
            let body = self.parse_block();
            method.children.push(body);
        } else if self.eat("default") {
            // Annotation element default value
            self.recover("unexpected default value");
        } else if !self.eat(";") {
            let error = self.recover("expected method body or ';'");
            method.children.push(error);
        }
    }

    fn parse_fields(
        &mut self,
        start: Position,
        ty: String,
        first_name: Token,
        modifiers: &[String],
        annotations: &[String],
    ) -> AstNode {
        let mut fields = Vec::new();
        let mut name = Some(first_name);

        while let Some(current) = name.take() {
            let mut field_type = ty.clone();
            while self.at("[") && self.peek_at(1).is_some_and(|t| t.is("]")) {
                self.pos += 2;
                field_type.push_str("[]");
            }
            let mut field = AstNode::named(AstKind::Field, current.text, current.range)
                .with_attr("type", field_type);
            field.set_attr("modifiers", modifiers.join(" "));
            field.set_attr("annotations", annotations.join(" "));

            if self.eat("=") {
                let init = self.initializer_tokens();
                field.children.extend(calls_in(&init));
                field.set_attr("init", join_tokens(&init));
            }
            field.range = SourceRange::new(current.range.start, self.prev_end());
            fields.push(field);

            if self.eat(",") {
                name = self.eat_ident();
                if name.is_none() {
                    let range = self.here();
                    self.error("expected field name after ','", range);
                }
            }
        }
        self.expect(";", "after field declaration");

        // A single declarator is returned directly; several are grouped in a
        // block the graph builder flattens.
        if fields.len() == 1 {
            fields.remove(0)
        } else {
            let mut group = AstNode::new(AstKind::Block, SourceRange::new(start, self.prev_end()));
            group.set_attr("declarators", fields.len().to_string());
            group.children = fields;
            group
        }
    }

    // Initializer tokens up to a top-level `;` or a `,` that starts the next
    // declarator.
    fn initializer_tokens(&mut self) -> Vec<Token> {
        let first = self.pos;
        let mut depth = 0usize;
        while let Some(t) = self.peek() {
            if depth == 0 {
                if t.is(";") || t.is("}") {
                    break;
                }
                if t.is(",") && self.starts_declarator(self.pos + 1) {
                    break;
                }
            }
            if t.is("(") || t.is("[") || t.is("{") {
                depth += 1;
            } else if t.is(")") || t.is("]") || t.is("}") {
                depth = depth.saturating_sub(1);
            }
            self.pos += 1;
        }
        self.tokens[first..self.pos].to_vec()
    }

    fn starts_declarator(&self, index: usize) -> bool {
        let is_name = self
            .tokens
            .get(index)
            .is_some_and(|t| t.is_ident() && !is_keyword(&t.text));
        let follows = self
            .tokens
            .get(index + 1)
            .is_some_and(|t| t.is("=") || t.is(",") || t.is(";") || t.is("["));
        is_name && follows
    }

    // ---- types ----

    fn parse_type(&mut self) -> Option<String> {
        let first = self.pos;
        let head = self.peek()?;
        if !head.is_ident() || (is_keyword(&head.text) && !is_primitive(&head.text)) {
            return None;
        }
        self.pos += 1;
        while self.at(".") && self.peek_at(1).is_some_and(|t| t.is_ident()) {
            self.pos += 2;
        }
        if self.at("<") {
            self.angle_group();
        }
        while self.at("[") && self.peek_at(1).is_some_and(|t| t.is("]")) {
            self.pos += 2;
        }
        self.eat("...");
        Some(join_tokens(&self.tokens[first..self.pos]))
    }

    fn type_list(&mut self) -> Vec<String> {
        let mut types = Vec::new();
        while let Some(ty) = self.parse_type() {
            types.push(ty);
            if !self.eat(",") {
                break;
            }
        }
        if types.is_empty() {
            let range = self.here();
            self.error("expected type name", range);
        }
        types
    }

    fn angle_group(&mut self) -> String {
        let first = self.pos;
        let mut depth = 0usize;
        while let Some(t) = self.peek() {
            if t.is("<") {
                depth += 1;
            } else if t.is(">") {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    self.pos += 1;
                    break;
                }
            } else if t.is("{") || t.is(";") || t.is("(") || t.is("=") {
                let range = self.here();
                self.error("unclosed type argument list", range);
                break;
            }
            self.pos += 1;
        }
        join_tokens(&self.tokens[first..self.pos])
    }

    /// Tokens between a `(` and its matching `)`, both consumed.
    fn paren_group(&mut self) -> Vec<Token> {
        if !self.expect("(", "") {
            return Vec::new();
        }
        let first = self.pos;
        let mut depth = 0usize;
        while let Some(t) = self.peek() {
            if t.is(")") && depth == 0 {
                let inner = self.tokens[first..self.pos].to_vec();
                self.pos += 1;
                return inner;
            }
            if t.is("(") || t.is("[") || t.is("{") {
                depth += 1;
            } else if t.is(")") || t.is("]") || t.is("}") {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            self.pos += 1;
        }
        let range = self.here();
        self.error("expected ')'", range);
        self.tokens[first..self.pos].to_vec()
    }

    // ---- statements ----

    fn parse_block(&mut self) -> AstNode {
        let start = self.start();
        let open = self.here();
        self.expect("{", "to open block");
        let mut block = AstNode::new(AstKind::Block, open);
        loop {
            if self.at_eof() {
                self.error("expected '}' to close block", open);
                break;
            }
            if self.eat("}") {
                break;
            }
            let before = self.pos;
            if let Some(stmt) = self.parse_statement() {
                block.children.push(stmt);
            }
            if self.pos == before && !self.at("}") {
                self.pos += 1;
            }
        }
        block.range = SourceRange::new(start, self.prev_end());
        block
    }

    fn parse_statement(&mut self) -> Option<AstNode> {
        let start = self.start();
        let head = self.peek()?;
        if head.is_ident() && !is_keyword(&head.text) && self.peek_at(1).is_some_and(|t| t.is(":")) {
            let label = head.text.clone();
            self.pos += 2;
            let mut node = self.parse_body_statement(start);
            match node.kind {
                AstKind::Statement | AstKind::Return => {
                    let text = format!("{}: {}", label, node.attr("text").unwrap_or_default());
                    node.set_attr("text", text);
                }
                _ => node.set_attr("label", label),
            }
            node.range = SourceRange::new(start, self.prev_end());
            return Some(node);
        }
        let head = head.text.clone();
        let node = match head.as_str() {
            ";" => {
                self.pos += 1;
                return None;
            }
            "{" => self.parse_block(),
            "if" => {
                self.pos += 1;
                let cond = self.paren_group();
                let mut node = AstNode::new(AstKind::If, self.here())
                    .with_attr("condition", join_tokens(&cond));
                node.children.extend(calls_in(&cond));
                node.children.push(self.parse_body_statement(start));
                if self.eat("else") {
                    node.set_attr("else", "true");
                    node.children.push(self.parse_body_statement(start));
                }
                node
            }
            "for" => {
                self.pos += 1;
                let header = self.paren_group();
                let mut node = self.for_header(&header, start);
                node.children.extend(calls_in(&header));
                node.children.push(self.parse_body_statement(start));
                node
            }
            "while" => {
                self.pos += 1;
                let cond = self.paren_group();
                let mut node = AstNode::new(AstKind::WhileLoop, self.here())
                    .with_attr("condition", join_tokens(&cond));
                node.children.extend(calls_in(&cond));
                node.children.push(self.parse_body_statement(start));
                node
            }
            "do" => {
                self.pos += 1;
                let body = self.parse_body_statement(start);
                self.expect("while", "after do body");
                let cond = self.paren_group();
                self.expect(";", "after do/while condition");
                let mut node = AstNode::new(AstKind::DoLoop, self.here())
                    .with_attr("condition", join_tokens(&cond));
                node.children.extend(calls_in(&cond));
                node.children.push(body);
                node
            }
            _ => self.parse_simple_statement(&head),
        };
        let mut node = node;
        node.range = SourceRange::new(start, self.prev_end());
        Some(node)
    }

    fn parse_body_statement(&mut self, start: Position) -> AstNode {
        if self.at("}") || self.at_eof() {
            let range = self.here();
            self.error("expected statement", range);
            return AstNode::new(AstKind::Block, SourceRange::new(start, self.prev_end()));
        }
        self.parse_statement()
            .unwrap_or_else(|| AstNode::new(AstKind::Block, SourceRange::new(start, self.prev_end())))
    }

    fn for_header(&mut self, header: &[Token], start: Position) -> AstNode {
        let range = SourceRange::new(start, self.prev_end());
        let parts = split_top_level(header, ";");
        if parts.len() == 3 {
            let mut node = AstNode::new(AstKind::ForLoop, range).with_attr("loop", "for");
            node.set_attr("init", join_tokens(parts[0]));
            node.set_attr("condition", join_tokens(parts[1]));
            node.set_attr("update", join_tokens(parts[2]));
            return node;
        }

        let colon = split_top_level(header, ":");
        if colon.len() == 2 && colon[0].len() >= 2 {
            let (declared, var) = colon[0].split_at(colon[0].len() - 1);
            let var_type: Vec<Token> = declared
                .iter()
                .filter(|t| !(t.is_ident() && is_modifier(&t.text)))
                .cloned()
                .collect();
            let mut node = AstNode::new(AstKind::ForLoop, range).with_attr("loop", "foreach");
            node.set_attr("varType", join_tokens(&var_type));
            node.set_attr("var", var[0].text.clone());
            node.set_attr("iterable", join_tokens(colon[1]));
            return node;
        }

        self.error("malformed for-loop header", range);
        AstNode::new(AstKind::ForLoop, range)
            .with_attr("loop", "for")
            .with_attr("condition", join_tokens(header))
    }

    fn parse_simple_statement(&mut self, head: &str) -> AstNode {
        let first = self.pos;
        let block_statement = BLOCK_STATEMENTS.contains(&head);
        let mut depth = 0usize;
        let mut terminated = false;

        while let Some(t) = self.peek() {
            if depth == 0 && t.is(";") {
                self.pos += 1;
                terminated = true;
                break;
            }
            if t.is("(") || t.is("[") || t.is("{") {
                depth += 1;
            } else if t.is(")") || t.is("]") || t.is("}") {
                if depth == 0 && t.is("}") {
                    // Closing brace of the enclosing scope
                    break;
                }
                if depth == 0 {
                    if self.pos > first {
                        break;
                    }
                    // Unbalanced closer, reported and skipped on its own
                    let range = t.range;
                    let text = t.text.clone();
                    self.pos += 1;
                    self.error(format!("unexpected '{}'", text), range);
                    return AstNode::new(AstKind::Error, range).with_attr("text", text);
                }
                depth -= 1;
                if depth == 0 && block_statement && t.is("}") {
                    let continues = self
                        .peek_at(1)
                        .is_some_and(|n| BLOCK_CONTINUATIONS.iter().any(|c| n.is(c)));
                    if !continues {
                        self.pos += 1;
                        terminated = true;
                        break;
                    }
                }
            }
            self.pos += 1;
        }

        let tokens = &self.tokens[first..self.pos];
        let mut text = join_tokens(tokens);
        let calls = calls_in(tokens);
        if !terminated {
            let range = self.here();
            self.error("expected ';'", range);
        }

        let kind = if head == "return" {
            AstKind::Return
        } else {
            AstKind::Statement
        };
        if !terminated && !text.is_empty() && !block_statement {
            text.push(';');
        }
        let mut node = AstNode::new(kind, SourceRange::default()).with_attr("text", text);
        node.children = calls;
        node
    }
}

trait MaxOffset {
    fn max_offset(self, other: Position) -> Position;
}

impl MaxOffset for Position {
    fn max_offset(self, other: Position) -> Position {
        if self.offset >= other.offset { self } else { other }
    }
}

fn is_primitive(text: &str) -> bool {
    matches!(
        text,
        "int" | "long" | "short" | "byte" | "float" | "double" | "char" | "boolean" | "void"
    )
}

fn split_top_level<'t>(tokens: &'t [Token], separator: &str) -> Vec<&'t [Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;
    for (i, t) in tokens.iter().enumerate() {
        if t.is("(") || t.is("[") || t.is("{") {
            depth += 1;
        } else if t.is(")") || t.is("]") || t.is("}") {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && t.is(separator) {
            parts.push(&tokens[last..i]);
            last = i + 1;
        }
    }
    parts.push(&tokens[last..]);
    parts
}

/// Method invocations in a token run: `name(` not preceded by `new`.
fn calls_in(tokens: &[Token]) -> Vec<AstNode> {
    tokens
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| {
            pair[0].kind == TokenKind::Ident && !is_keyword(&pair[0].text) && pair[1].is("(")
        })
        .filter(|(i, _)| *i == 0 || !tokens[i - 1].is("new"))
        .map(|(_, pair)| AstNode::named(AstKind::Call, pair[0].text.clone(), pair[0].range))
        .collect()
}
