//! Recursive-descent parser for resource declarations.
//!
//! ```text
//! file             = resource_content
//! resource_content = { binding | resource }
//! binding          = identifier ( '=' | '+=' ) expr [ ',' ]
//! resource         = identifier { literal } [ expr_list ] '{' resource_content '}'
//! expr             = literal | function_call | '{' obj_content '}' | expr_array
//!                  | expr '.' identifier
//! literal          = string | identifier
//! function_call    = identifier expr_list
//! expr_list        = '(' { expr [ ',' ] } ')'
//! expr_array       = '[' { expr [ ',' ] } ']'
//! obj_content      = { binding }
//! string           = '"' { ^'"' } '"'
//! ```
//!
//! A block's descriptors and the start of its attribute list share one
//! line. The `{` may follow on a later line.
//!
//! The parser never stops at the first error. Problems are recorded as
//! [`Diagnostic`]s and parsing resumes with the next construct. Further
//! diagnostics on the line of the last one are held back, so one mistake
//! produces one message. A block missing its `{` is dropped together with
//! its orphaned body.

use crate::ast::{Binding, Bindings, Expr, ExprKind, Resource};
use crate::cursor::Cursor;
use crate::location::{Diagnostic, Location};
use crate::trace::{TraceEvent, Tracer};
use indexmap::map::Entry;

/// Result of parsing a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutput {
    /// Synthetic root holding top-level bindings and blocks
    pub root: Resource,
    /// Syntax problems, in source order of discovery
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    /// True when no diagnostics were recorded
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parse source text into a syntax tree
#[must_use]
pub fn parse(input: &str) -> ParseOutput {
    Parser::new(input).parse()
}

/// Parser state for one source buffer
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    diagnostics: Vec<Diagnostic>,
    recovering: bool,
    error_line: usize,
    tracer: Option<&'a mut dyn Tracer>,
}

impl<'a> Parser<'a> {
    /// Create a parser over `input`
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            cursor: Cursor::new(input),
            diagnostics: Vec::new(),
            recovering: false,
            error_line: 0,
            tracer: None,
        }
    }

    /// Install a trace hook
    #[must_use]
    pub fn with_tracer(mut self, tracer: &'a mut dyn Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Parse the whole input
    #[must_use]
    pub fn parse(mut self) -> ParseOutput {
        let mut root = Resource::root();
        self.parse_content(Some(&mut root.resources), &mut root.bindings, false);
        self.cursor.finish(&mut root.location);
        ParseOutput {
            root,
            diagnostics: self.diagnostics,
        }
    }

    /// `res_content` when `children` is set, `obj_content` otherwise.
    fn parse_content(
        &mut self,
        mut children: Option<&mut Vec<Resource>>,
        bindings: &mut Bindings,
        nested: bool,
    ) {
        loop {
            self.skip_spaces();
            self.trace("res_content");
            let mut loc = self.cursor.location();
            if loc.line > self.error_line {
                self.recovering = false;
            }
            match self.cursor.peek(0) {
                0 => return,
                b'}' if nested => return,
                b'}' => {
                    self.error(loc, "unexpected `}`");
                    self.cursor.advance(1);
                    continue;
                }
                _ => {}
            }

            let id = self.parse_identifier();
            if id.is_empty() {
                self.error(loc, "expected identifier");
                self.cursor.advance(1);
                continue;
            }
            self.cursor.finish(&mut loc);
            self.skip_spaces();

            match self.cursor.peek(0) {
                0 => {
                    let here = self.cursor.location();
                    self.error(here, format!("unexpected end of input after `{}`", id));
                    return;
                }
                b'+' => {
                    let op = self.cursor.location();
                    if self.cursor.peek(1) == b'=' {
                        self.cursor.advance(2);
                    } else {
                        self.error(op, "incorrect binding operator `+`");
                        self.cursor.advance(1);
                    }
                    self.trace("expr(+=)");
                    let Some(expr) = self.parse_expr(false) else {
                        let here = self.cursor.location();
                        self.error(here, "expected expression");
                        continue;
                    };
                    accumulate(bindings, id, loc, op, expr);
                    self.skip_comma();
                    self.recovering = false;
                }
                b'=' => {
                    self.cursor.advance(1);
                    self.trace("expr(=)");
                    let Some(expr) = self.parse_expr(false) else {
                        let here = self.cursor.location();
                        self.error(here, "expected expression");
                        continue;
                    };
                    self.skip_comma();
                    bindings.insert(
                        id.clone(),
                        Binding {
                            location: loc,
                            name: id,
                            expr,
                        },
                    );
                    self.recovering = false;
                }
                _ => match children.as_mut() {
                    Some(children) => {
                        if let Some(resource) = self.parse_resource(id, loc, nested) {
                            children.push(resource);
                        }
                    }
                    None => {
                        self.error(loc, format!("expected `=` or `+=` after `{}`", id));
                    }
                },
            }
        }
    }

    /// `resource`, after its keyword has been read. A block without a body
    /// is dropped.
    fn parse_resource(&mut self, name: String, location: Location, nested: bool) -> Option<Resource> {
        let mut resource = Resource::new(name, location);
        while !self.at_line_end() {
            self.trace("expr(resource literal)");
            match self.parse_expr(true) {
                Some(literal) => resource.descriptors.push(literal),
                None => break,
            }
        }

        if !self.at_line_end() && self.cursor.peek(0) == b'(' {
            resource.attributes = self.parse_expr_list();
        }
        self.skip_spaces();

        if self.cursor.peek(0) != b'{' {
            self.error(
                location,
                format!("expected `{{` to start resource `{}`", resource.name),
            );
            self.skip_orphan_body(&resource.name, location.line, nested);
            return None;
        }
        self.cursor.advance(1);
        self.parse_content(Some(&mut resource.resources), &mut resource.bindings, true);

        if self.cursor.peek(0) == b'}' {
            self.cursor.advance(1);
            self.recovering = false;
        } else {
            let here = self.cursor.location();
            self.error(
                here,
                format!("expected `}}` to close resource `{}`", resource.name),
            );
        }
        self.cursor.finish(&mut resource.location);
        Some(resource)
    }

    /// `expr`, or only `literal` when `literal` is set.
    fn parse_expr(&mut self, literal: bool) -> Option<Expr> {
        self.skip_spaces();
        self.trace("expr");
        let start = self.cursor.location();
        let mut loc = start;

        let mut expr = match self.cursor.peek(0) {
            0 | b',' | b')' => return None,
            b'"' => {
                let text = self.parse_string();
                self.cursor.finish(&mut loc);
                let expr = Expr::new(loc, ExprKind::String(text));
                if literal {
                    return Some(expr);
                }
                expr
            }
            b'[' => {
                if literal {
                    return None;
                }
                let items = self.parse_expr_list();
                self.cursor.finish(&mut loc);
                Expr::new(loc, ExprKind::Array(items))
            }
            b'{' => {
                if literal {
                    return None;
                }
                self.cursor.advance(1);
                let mut bindings = Bindings::new();
                self.parse_content(None, &mut bindings, true);
                if self.cursor.peek(0) == b'}' {
                    self.cursor.advance(1);
                } else {
                    let here = self.cursor.location();
                    self.error(here, "expected `}` to close object");
                }
                self.cursor.finish(&mut loc);
                Expr::new(loc, ExprKind::Object(bindings))
            }
            _ => {
                let id = self.parse_identifier();
                if id.is_empty() {
                    return None;
                }
                self.cursor.finish(&mut loc);
                if literal {
                    return Some(Expr::new(loc, ExprKind::Reference(id)));
                }
                self.skip_spaces();
                self.trace("expr after identifier");
                if self.cursor.peek(0) == b'(' {
                    let args = self.parse_expr_list();
                    self.cursor.finish(&mut loc);
                    Expr::new(loc, ExprKind::Call { name: id, args })
                } else {
                    Expr::new(loc, ExprKind::Reference(id))
                }
            }
        };

        loop {
            self.skip_spaces();
            if self.cursor.peek(0) != b'.' {
                break;
            }
            self.cursor.advance(1);
            self.skip_spaces();
            let mut part_loc = self.cursor.location();
            let id = self.parse_identifier();
            if id.is_empty() {
                self.error(part_loc, "expected chain identifier");
                continue;
            }
            self.cursor.finish(&mut part_loc);
            let part = Expr::new(part_loc, ExprKind::Reference(id));
            match &mut expr.kind {
                ExprKind::Chain(parts) => parts.push(part),
                _ => {
                    let base = std::mem::replace(&mut expr, Expr::new(start, ExprKind::Chain(Vec::new())));
                    expr.kind = ExprKind::Chain(vec![base, part]);
                }
            }
            self.cursor.finish(&mut expr.location);
        }

        Some(expr)
    }

    /// `expr_list` or `expr_array`, depending on the opening byte.
    fn parse_expr_list(&mut self) -> Vec<Expr> {
        let end = match self.cursor.peek(0) {
            b'(' => b')',
            b'[' => b']',
            _ => return Vec::new(),
        };
        self.trace("expr_list");
        let open = self.cursor.location();
        self.cursor.advance(1);

        let mut items = Vec::new();
        loop {
            let expr = self.parse_expr(false);
            let parsed = expr.is_some();
            items.extend(expr);

            self.skip_spaces();
            match self.cursor.peek(0) {
                c if c == end => {
                    self.cursor.advance(1);
                    return items;
                }
                0 => {
                    self.error(open, format!("expected `{}` to close list", end as char));
                    return items;
                }
                b',' => self.cursor.advance(1),
                _ => {}
            }

            if !parsed {
                let here = self.cursor.location();
                self.error(here, "expected expression in list");
                return items;
            }
        }
    }

    /// `string`, starting at the opening quote. No escapes.
    fn parse_string(&mut self) -> String {
        let open = self.cursor.location();
        self.cursor.advance(1);
        let begin = self.cursor.offset();
        loop {
            match self.cursor.peek(0) {
                b'"' => {
                    let text = self.cursor.text(begin, self.cursor.offset());
                    self.cursor.advance(1);
                    return text;
                }
                0 => {
                    self.error(open, "unterminated string");
                    return self.cursor.text(begin, self.cursor.offset());
                }
                _ => self.cursor.advance(1),
            }
        }
    }

    fn parse_identifier(&mut self) -> String {
        let begin = self.cursor.offset();
        while !is_delimiter(self.cursor.peek(0)) {
            self.cursor.advance(1);
        }
        self.cursor.text(begin, self.cursor.offset())
    }

    fn skip_spaces(&mut self) {
        while matches!(self.cursor.peek(0), b' ' | b'\t' | b'\n' | b'\r') {
            self.cursor.advance(1);
        }
    }

    /// Skip spaces and tabs. True when the line or input ends before the
    /// next token.
    fn at_line_end(&mut self) -> bool {
        while matches!(self.cursor.peek(0), b' ' | b'\t' | b'\r') {
            self.cursor.advance(1);
        }
        matches!(self.cursor.peek(0), b'\n' | 0)
    }

    /// Skip the body of a block whose `{` is missing. Stops after the
    /// unmatched `}`, or before it when `nested`, or before a later line
    /// that opens with `keyword`.
    fn skip_orphan_body(&mut self, keyword: &str, line: usize, nested: bool) {
        let mut depth = 0usize;
        let mut line_start = self.cursor.location().line > line;
        while !self.cursor.is_eof() {
            match self.cursor.peek(0) {
                b'\n' => {
                    line_start = true;
                    self.cursor.advance(1);
                    continue;
                }
                b' ' | b'\t' | b'\r' => {
                    self.cursor.advance(1);
                    continue;
                }
                _ => {}
            }
            if line_start && depth == 0 && self.at_keyword(keyword) {
                return;
            }
            line_start = false;
            match self.cursor.peek(0) {
                b'"' => {
                    self.cursor.advance(1);
                    while !matches!(self.cursor.peek(0), b'"' | 0) {
                        self.cursor.advance(1);
                    }
                    self.cursor.advance(1);
                }
                b'{' => {
                    depth += 1;
                    self.cursor.advance(1);
                }
                b'}' if depth == 0 => {
                    if !nested {
                        self.cursor.advance(1);
                    }
                    return;
                }
                b'}' => {
                    depth -= 1;
                    self.cursor.advance(1);
                }
                _ => self.cursor.advance(1),
            }
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        keyword.bytes().enumerate().all(|(i, b)| self.cursor.peek(i) == b)
            && is_delimiter(self.cursor.peek(keyword.len()))
    }

    fn skip_comma(&mut self) {
        self.skip_spaces();
        if self.cursor.peek(0) == b',' {
            self.cursor.advance(1);
        }
    }

    fn error(&mut self, location: Location, message: impl Into<String>) {
        self.trace("error");
        if !self.recovering {
            self.error_line = location.line;
            self.diagnostics.push(Diagnostic::new(location, message));
        }
        self.recovering = true;
    }

    fn trace(&mut self, rule: &'static str) {
        if let Some(tracer) = self.tracer.as_mut() {
            let (before, after) = self.cursor.context(5);
            tracer.trace(TraceEvent {
                location: self.cursor.location(),
                rule,
                before,
                after,
            });
        }
    }
}

/// Bytes that end an identifier
const fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        0 | b' '
            | b'\t'
            | b'\n'
            | b'\r'
            | b'{'
            | b'}'
            | b'('
            | b')'
            | b'['
            | b']'
            | b'+'
            | b'='
            | b','
            | b'"'
            | b'.'
    )
}

/// Apply `name += expr`.
fn accumulate(bindings: &mut Bindings, name: String, location: Location, op: Location, expr: Expr) {
    match bindings.entry(name) {
        Entry::Vacant(entry) => {
            let name = entry.key().clone();
            entry.insert(Binding {
                location,
                name,
                expr: Expr::new(op, ExprKind::Array(vec![expr])),
            });
        }
        Entry::Occupied(mut entry) => {
            let binding = entry.get_mut();
            match &mut binding.expr.kind {
                ExprKind::Array(items) => items.push(expr),
                _ => {
                    let previous = std::mem::replace(
                        &mut binding.expr,
                        Expr::new(op, ExprKind::Array(Vec::new())),
                    );
                    binding.expr.kind = ExprKind::Array(vec![previous, expr]);
                }
            }
        }
    }
}
