//! GVariant text format: parsing and printing.
//!
//! This is the format dconf keyfiles and `dconf dump` use for values:
//! `true`, `42`, `uint32 7`, `'text'`, `[1, 2]`, `(1, 'a')`, `{'k': <1>}`,
//! `@as []`, `just 3`, `b'bytes'`.
//!
//! Parsing is two passes: the text is parsed into an untyped expression,
//! then a type is inferred (or given) and the expression is resolved
//! against it.

use std::fmt;
use std::str::FromStr;

use crate::ty::MAX_DEPTH;
use crate::{ParseError, Tag, TypeError, Variant, VariantError, VariantType};

impl Variant {
    /// Parse a value, inferring its type.
    ///
    /// Untyped integers are `int32`, untyped floats are `double`, unless a
    /// sibling in the same array or dictionary is annotated: in
    /// `[uint32 1, 2]` both elements are `uint32`. Empty containers and
    /// `nothing` need a type annotation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tinydconf_variant::Variant;
    ///
    /// let v = Variant::parse("[(1, 'a'), (2, 'b')]").unwrap();
    /// assert_eq!(v.ty().as_str(), "a(is)");
    ///
    /// let v = Variant::parse("@as []").unwrap();
    /// assert_eq!(v.n_children(), 0);
    ///
    /// assert!(Variant::parse("[]").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Variant, ParseError> {
        let expr = parse_expr(text)?;
        let ty = infer_type(&expr)?;
        resolve(&expr, &ty)
    }

    /// Parse a value that must have type `ty`.
    pub fn parse_typed(text: &str, ty: &VariantType) -> Result<Variant, ParseError> {
        let expr = parse_expr(text)?;
        resolve(&expr, ty)
    }
}

impl FromStr for Variant {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::parse(s)
    }
}

// ==================== Lexer ====================

#[derive(Debug, Clone)]
enum Token {
    Ident(String),
    Number(String),
    Str(String),
    Bytes(Vec<u8>),
    Annotation(VariantType),
    Symbol(char),
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("word '{}'", name),
            Token::Number(text) => format!("number {}", text),
            Token::Str(_) => "string".to_string(),
            Token::Bytes(_) => "byte string".to_string(),
            Token::Annotation(ty) => format!("type annotation @{}", ty),
            Token::Symbol(c) => format!("'{}'", c),
            Token::Eof => "end of input".to_string(),
        }
    }
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn starts_number(&self, c: char) -> bool {
        if c.is_ascii_digit() {
            return true;
        }
        if matches!(c, '-' | '+' | '.') {
            return self
                .peek_at(1)
                .is_some_and(|n| n.is_ascii_digit() || matches!(n, '.' | 'i' | 'I' | 'n' | 'N'));
        }
        false
    }

    fn number(&mut self) -> String {
        let start = self.pos;
        self.bump();
        while let Some(c) = self.peek() {
            let text = &self.src[start..self.pos];
            let exponent_sign = matches!(c, '+' | '-')
                && text.ends_with(['e', 'E'])
                && !text.contains(['x', 'X']);
            if c.is_ascii_alphanumeric() || c == '.' || exponent_sign {
                self.bump();
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn annotation(&mut self, offset: usize) -> Result<VariantType, ParseError> {
        let rest = &self.src[self.pos..];
        let end = crate::ty::scan(rest, 0, 0).map_err(|source| ParseError::Type { offset, source })?;
        let ty = VariantType::new(&rest[..end]).map_err(|source| ParseError::Type { offset, source })?;
        self.pos += end;
        Ok(ty)
    }

    /// Lex a quoted string; the opening quote has not been consumed yet.
    fn quoted(&mut self, bytes: bool) -> Result<Vec<Unit>, ParseError> {
        let start = self.pos;
        let quote = self.bump().ok_or(ParseError::UnexpectedEnd)?;
        let mut out = Vec::new();
        loop {
            let offset = self.pos;
            let c = self
                .bump()
                .ok_or(ParseError::UnterminatedString { offset: start })?;
            if c == quote {
                return Ok(out);
            }
            if c != '\\' {
                out.push(Unit::Char(c));
                continue;
            }
            let escape = self
                .bump()
                .ok_or(ParseError::UnterminatedString { offset: start })?;
            let decoded = match escape {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                'a' => '\u{07}',
                'b' => '\u{08}',
                'f' => '\u{0c}',
                'v' => '\u{0b}',
                '\\' | '\'' | '"' => escape,
                'u' => self.hex_escape(4, offset)?,
                'U' => self.hex_escape(8, offset)?,
                '0'..='7' if bytes => {
                    out.push(Unit::Byte(self.octal_escape(escape, offset)?));
                    continue;
                }
                _ => return Err(ParseError::InvalidEscape { offset }),
            };
            out.push(Unit::Char(decoded));
        }
    }

    fn hex_escape(&mut self, digits: usize, offset: usize) -> Result<char, ParseError> {
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or(ParseError::InvalidEscape { offset })?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| ParseError::InvalidEscape { offset })?;
        self.pos = end;
        char::from_u32(code).ok_or(ParseError::InvalidEscape { offset })
    }

    fn octal_escape(&mut self, first: char, offset: usize) -> Result<u8, ParseError> {
        let mut value = first.to_digit(8).unwrap_or(0);
        for _ in 0..2 {
            match self.peek().and_then(|c| c.to_digit(8)) {
                Some(d) => {
                    value = value * 8 + d;
                    self.bump();
                }
                None => break,
            }
        }
        u8::try_from(value).map_err(|_| ParseError::InvalidEscape { offset })
    }
}

/// One decoded unit of a quoted literal.
enum Unit {
    Char(char),
    /// Octal escape, only in byte strings.
    Byte(u8),
}

fn tokenize(src: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let mut lexer = Lexer { src, pos: 0 };
    let mut tokens = Vec::new();

    while let Some(c) = lexer.peek() {
        let offset = lexer.pos;
        if c.is_whitespace() {
            lexer.bump();
            continue;
        }

        let token = if c == '@' {
            lexer.bump();
            Token::Annotation(lexer.annotation(offset)?)
        } else if c == '\'' || c == '"' {
            let mut text = String::new();
            for unit in lexer.quoted(false)? {
                if let Unit::Char(c) = unit {
                    text.push(c);
                }
            }
            Token::Str(text)
        } else if c == 'b' && matches!(lexer.peek_at(1), Some('\'' | '"')) {
            lexer.bump();
            let mut bytes = Vec::new();
            for unit in lexer.quoted(true)? {
                match unit {
                    Unit::Byte(b) => bytes.push(b),
                    Unit::Char(c) => {
                        let mut buf = [0u8; 4];
                        bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    }
                }
            }
            Token::Bytes(bytes)
        } else if lexer.starts_number(c) {
            Token::Number(lexer.number())
        } else if c.is_ascii_alphabetic() || c == '_' {
            let word = lexer.ident();
            let lower = word.to_ascii_lowercase();
            if matches!(lower.as_str(), "inf" | "infinity" | "nan") {
                Token::Number(word)
            } else {
                Token::Ident(word)
            }
        } else if "[](){}<>,:".contains(c) {
            lexer.bump();
            Token::Symbol(c)
        } else {
            return Err(ParseError::UnexpectedChar {
                character: c,
                offset,
            });
        };
        tokens.push((token, offset));
    }

    Ok(tokens)
}

// ==================== Parser ====================

#[derive(Debug)]
struct Expr {
    offset: usize,
    kind: ExprKind,
}

#[derive(Debug)]
enum ExprKind {
    Bool(bool),
    Number(String),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Entry(Box<Expr>, Box<Expr>),
    Boxed(Box<Expr>),
    Just(Box<Expr>),
    Nothing,
    Typed(VariantType, Box<Expr>),
}

static EOF: Token = Token::Eof;

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map_or(&EOF, |(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(_, o)| *o)
    }

    fn next(&mut self) -> (Token, usize) {
        let offset = self.offset();
        let token = self.peek().clone();
        if !matches!(token, Token::Eof) {
            self.pos += 1;
        }
        (token, offset)
    }

    fn accept_symbol(&mut self, expected: char) -> bool {
        if matches!(self.peek(), Token::Symbol(c) if *c == expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, expected: char) -> Result<(), ParseError> {
        match self.next() {
            (Token::Symbol(c), _) if c == expected => Ok(()),
            (Token::Eof, _) => Err(ParseError::UnexpectedEnd),
            (token, offset) => Err(ParseError::UnexpectedToken {
                token: token.describe(),
                offset,
            }),
        }
    }

    /// Comma separated values up to `close`; a trailing comma is allowed.
    fn items(&mut self, close: char, depth: usize) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while !self.accept_symbol(close) {
            items.push(self.value(depth + 1)?);
            if !self.accept_symbol(',') {
                self.expect_symbol(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn value(&mut self, depth: usize) -> Result<Expr, ParseError> {
        if depth > MAX_DEPTH {
            return Err(ParseError::TooDeep { max: MAX_DEPTH });
        }

        let (token, offset) = self.next();
        let kind = match token {
            Token::Annotation(ty) => ExprKind::Typed(ty, Box::new(self.value(depth + 1)?)),
            Token::Number(text) => ExprKind::Number(text),
            Token::Str(s) => ExprKind::Str(s),
            Token::Bytes(b) => ExprKind::Bytes(b),
            Token::Ident(word) => match word.as_str() {
                "true" => ExprKind::Bool(true),
                "false" => ExprKind::Bool(false),
                "nothing" => ExprKind::Nothing,
                "just" => ExprKind::Just(Box::new(self.value(depth + 1)?)),
                keyword => match keyword_type(keyword) {
                    Some(ty) => ExprKind::Typed(ty, Box::new(self.value(depth + 1)?)),
                    None => {
                        return Err(ParseError::UnexpectedToken {
                            token: format!("word '{}'", word),
                            offset,
                        })
                    }
                },
            },
            Token::Symbol('[') => ExprKind::Array(self.items(']', depth)?),
            // GLib needs a comma after a lone tuple item; `(1)` is
            // accepted here as `(1,)`.
            Token::Symbol('(') => ExprKind::Tuple(self.items(')', depth)?),
            Token::Symbol('<') => {
                let inner = self.value(depth + 1)?;
                self.expect_symbol('>')?;
                ExprKind::Boxed(Box::new(inner))
            }
            Token::Symbol('{') => self.braces(depth)?,
            Token::Eof => return Err(ParseError::UnexpectedEnd),
            other => {
                return Err(ParseError::UnexpectedToken {
                    token: other.describe(),
                    offset,
                })
            }
        };
        Ok(Expr { offset, kind })
    }

    /// `{}`, `{k: v, ...}` or `{k, v}`; the `{` is already consumed.
    fn braces(&mut self, depth: usize) -> Result<ExprKind, ParseError> {
        if self.accept_symbol('}') {
            return Ok(ExprKind::Dict(Vec::new()));
        }
        let key = self.value(depth + 1)?;
        if self.accept_symbol(',') {
            let value = self.value(depth + 1)?;
            self.expect_symbol('}')?;
            return Ok(ExprKind::Entry(Box::new(key), Box::new(value)));
        }

        self.expect_symbol(':')?;
        let mut entries = vec![(key, self.value(depth + 1)?)];
        while self.accept_symbol(',') {
            if self.accept_symbol('}') {
                return Ok(ExprKind::Dict(entries));
            }
            let key = self.value(depth + 1)?;
            self.expect_symbol(':')?;
            entries.push((key, self.value(depth + 1)?));
        }
        self.expect_symbol('}')?;
        Ok(ExprKind::Dict(entries))
    }
}

fn keyword_type(word: &str) -> Option<VariantType> {
    let ty = match word {
        "boolean" => VariantType::BOOLEAN,
        "byte" => VariantType::BYTE,
        "int16" => VariantType::INT16,
        "uint16" => VariantType::UINT16,
        "int32" => VariantType::INT32,
        "uint32" => VariantType::UINT32,
        "int64" => VariantType::INT64,
        "uint64" => VariantType::UINT64,
        "handle" => VariantType::HANDLE,
        "double" => VariantType::DOUBLE,
        "string" => VariantType::STRING,
        "objectpath" => VariantType::OBJECT_PATH,
        "signature" => VariantType::SIGNATURE,
        _ => return None,
    };
    Some(ty)
}

fn parse_expr(text: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
        end: text.len(),
    };
    let expr = parser.value(0)?;
    match parser.next() {
        (Token::Eof, _) => Ok(expr),
        (_, offset) => Err(ParseError::Trailing { offset }),
    }
}

// ==================== Typing ====================

fn is_float_literal(text: &str) -> bool {
    let t = text.trim_start_matches(|c| c == '+' || c == '-');
    if t.starts_with("0x") || t.starts_with("0X") {
        return false;
    }
    t.contains(['.', 'e', 'E'])
        || t.eq_ignore_ascii_case("inf")
        || t.eq_ignore_ascii_case("infinity")
        || t.eq_ignore_ascii_case("nan")
}

/// Inferred type of an expression.
///
/// Untyped number literals stay open (`Int`, `Float`) so that
/// `[uint32 1, 2]` and `[(byte 0x01, 'a'), (2, 'b')]` take the type of
/// the annotated element.
#[derive(Clone, Debug)]
enum Shape {
    Fixed(VariantType),
    Int,
    Float,
    Array(Box<Shape>),
    Maybe(Box<Shape>),
    Tuple(Vec<Shape>),
    Entry(Box<Shape>, Box<Shape>),
}

impl Shape {
    fn is_basic(&self) -> bool {
        match self {
            Shape::Fixed(ty) => ty.is_basic(),
            Shape::Int | Shape::Float => true,
            _ => false,
        }
    }

    /// Whether a value of this shape can be resolved as `ty`.
    fn fits(&self, ty: &VariantType) -> bool {
        match self {
            Shape::Fixed(t) => t == ty,
            Shape::Int => ty.tag().is_integer() || ty.tag() == Tag::Double,
            Shape::Float => ty.tag() == Tag::Double,
            Shape::Array(element) => {
                ty.tag() == Tag::Array && ty.element().is_some_and(|t| element.fits(&t))
            }
            Shape::Maybe(element) => {
                ty.tag() == Tag::Maybe && ty.element().is_some_and(|t| element.fits(&t))
            }
            Shape::Tuple(items) => {
                let types = ty.items();
                ty.tag() == Tag::Tuple
                    && types.len() == items.len()
                    && items.iter().zip(&types).all(|(item, t)| item.fits(t))
            }
            Shape::Entry(key, value) => {
                let kv = ty.items();
                ty.tag() == Tag::DictEntry && key.fits(&kv[0]) && value.fits(&kv[1])
            }
        }
    }

    fn write_type(&self, out: &mut String) {
        match self {
            Shape::Fixed(ty) => out.push_str(ty.as_str()),
            Shape::Int => out.push_str(VariantType::INT32.as_str()),
            Shape::Float => out.push_str(VariantType::DOUBLE.as_str()),
            Shape::Array(element) => {
                out.push('a');
                element.write_type(out);
            }
            Shape::Maybe(element) => {
                out.push('m');
                element.write_type(out);
            }
            Shape::Tuple(items) => {
                out.push('(');
                for item in items {
                    item.write_type(out);
                }
                out.push(')');
            }
            Shape::Entry(key, value) => {
                out.push('{');
                key.write_type(out);
                value.write_type(out);
                out.push('}');
            }
        }
    }

    /// The type this shape settles on: open integers are `int32`, open
    /// floats `double`. Fails if the result nests deeper than [`MAX_DEPTH`].
    fn concrete(&self, offset: usize) -> Result<VariantType, ParseError> {
        let mut s = String::new();
        self.write_type(&mut s);
        VariantType::new(s).map_err(|source| ParseError::Type { offset, source })
    }
}

/// Unify two shapes; open integers widen to doubles and take the type of
/// annotated values they meet.
fn merge(a: &Shape, b: &Shape) -> Option<Shape> {
    match (a, b) {
        (Shape::Fixed(x), Shape::Fixed(y)) => (x == y).then(|| a.clone()),
        (Shape::Fixed(ty), other) | (other, Shape::Fixed(ty)) => {
            other.fits(ty).then(|| Shape::Fixed(ty.clone()))
        }
        (Shape::Int, Shape::Int) => Some(Shape::Int),
        (Shape::Int | Shape::Float, Shape::Int | Shape::Float) => Some(Shape::Float),
        (Shape::Array(x), Shape::Array(y)) => Some(Shape::Array(Box::new(merge(x, y)?))),
        (Shape::Maybe(x), Shape::Maybe(y)) => Some(Shape::Maybe(Box::new(merge(x, y)?))),
        (Shape::Tuple(x), Shape::Tuple(y)) if x.len() == y.len() => x
            .iter()
            .zip(y)
            .map(|(l, r)| merge(l, r))
            .collect::<Option<Vec<_>>>()
            .map(Shape::Tuple),
        (Shape::Entry(xk, xv), Shape::Entry(yk, yv)) => Some(Shape::Entry(
            Box::new(merge(xk, yk)?),
            Box::new(merge(xv, yv)?),
        )),
        _ => None,
    }
}

fn merge_into(acc: &mut Option<Shape>, next: Option<Shape>, offset: usize) -> Result<(), ParseError> {
    let Some(next) = next else {
        return Ok(());
    };
    let merged = match acc.take() {
        None => next,
        Some(prev) => match merge(&prev, &next) {
            Some(shape) => shape,
            None => {
                return Err(ParseError::Conflict {
                    first: prev.concrete(offset)?,
                    second: next.concrete(offset)?,
                    offset,
                })
            }
        },
    };
    *acc = Some(merged);
    Ok(())
}

/// Shape of an expression, `None` when it cannot be known yet.
fn infer(expr: &Expr) -> Result<Option<Shape>, ParseError> {
    let shape = match &expr.kind {
        ExprKind::Typed(ty, _) => Some(Shape::Fixed(ty.clone())),
        ExprKind::Bool(_) => Some(Shape::Fixed(VariantType::BOOLEAN)),
        ExprKind::Number(text) if is_float_literal(text) => Some(Shape::Float),
        ExprKind::Number(_) => Some(Shape::Int),
        ExprKind::Str(_) => Some(Shape::Fixed(VariantType::STRING)),
        ExprKind::Bytes(_) => Some(Shape::Fixed(VariantType::BYTESTRING)),
        ExprKind::Boxed(_) => Some(Shape::Fixed(VariantType::VARIANT)),
        ExprKind::Nothing => None,
        ExprKind::Just(inner) => infer(inner)?.map(|s| Shape::Maybe(Box::new(s))),
        ExprKind::Array(items) => {
            let mut element = None;
            for item in items {
                merge_into(&mut element, infer(item)?, item.offset)?;
            }
            element.map(|e| Shape::Array(Box::new(e)))
        }
        ExprKind::Tuple(items) => {
            let mut shapes = Vec::with_capacity(items.len());
            for item in items {
                match infer(item)? {
                    Some(s) => shapes.push(s),
                    None => return Ok(None),
                }
            }
            Some(Shape::Tuple(shapes))
        }
        ExprKind::Entry(key, value) => match (infer(key)?, infer(value)?) {
            (Some(k), Some(v)) => Some(entry_shape(k, v, key.offset)?),
            _ => None,
        },
        ExprKind::Dict(entries) => {
            let (mut keys, mut values) = (None, None);
            for (key, value) in entries {
                merge_into(&mut keys, infer(key)?, key.offset)?;
                merge_into(&mut values, infer(value)?, value.offset)?;
            }
            match (keys, values) {
                (Some(k), Some(v)) => Some(Shape::Array(Box::new(entry_shape(k, v, expr.offset)?))),
                _ => None,
            }
        }
    };
    Ok(shape)
}

/// Settle the type of a whole expression.
fn infer_type(expr: &Expr) -> Result<VariantType, ParseError> {
    infer(expr)?
        .ok_or(ParseError::CannotInfer {
            offset: expr.offset,
        })?
        .concrete(expr.offset)
}

fn entry_shape(key: Shape, value: Shape, offset: usize) -> Result<Shape, ParseError> {
    if !key.is_basic() {
        return Err(ParseError::Type {
            offset,
            source: TypeError::NonBasicKey { position: 1 },
        });
    }
    Ok(Shape::Entry(Box::new(key), Box::new(value)))
}

fn invalid_value(offset: usize) -> impl FnOnce(VariantError) -> ParseError {
    move |source| ParseError::Value { offset, source }
}

/// Build the value of `expr` as type `ty`.
fn resolve(expr: &Expr, ty: &VariantType) -> Result<Variant, ParseError> {
    let offset = expr.offset;
    let mismatch = || ParseError::TypeMismatch {
        expected: ty.clone(),
        offset,
    };

    match (&expr.kind, ty.tag()) {
        (ExprKind::Typed(t, inner), _) if t == ty => resolve(inner, ty),
        (ExprKind::Just(inner), Tag::Maybe) => {
            let element = ty.element().ok_or_else(mismatch)?;
            let value = resolve(inner, &element)?;
            Variant::maybe(element, Some(value)).map_err(invalid_value(offset))
        }
        (ExprKind::Nothing, Tag::Maybe) => {
            let element = ty.element().ok_or_else(mismatch)?;
            Variant::maybe(element, None).map_err(invalid_value(offset))
        }
        // A plain value where a maybe is expected is implicitly `just`.
        (_, Tag::Maybe) => {
            let element = ty.element().ok_or_else(mismatch)?;
            let value = resolve(expr, &element)?;
            Variant::maybe(element, Some(value)).map_err(invalid_value(offset))
        }
        (ExprKind::Bool(b), Tag::Boolean) => Ok(Variant::from(*b)),
        (ExprKind::Number(text), tag) if tag.is_integer() || tag == Tag::Double => {
            number(text, ty, offset)
        }
        (ExprKind::Str(s), Tag::String) => Ok(Variant::from(s.as_str())),
        (ExprKind::Str(s), Tag::ObjectPath) => {
            Variant::object_path(s).map_err(invalid_value(offset))
        }
        (ExprKind::Str(s), Tag::Signature) => Variant::signature(s).map_err(invalid_value(offset)),
        (ExprKind::Bytes(bytes), Tag::Array) if ty == &VariantType::BYTESTRING => {
            Ok(Variant::bytestring(bytes))
        }
        (ExprKind::Array(items), Tag::Array) => {
            let element = ty.element().ok_or_else(mismatch)?;
            let children = items
                .iter()
                .map(|item| resolve(item, &element))
                .collect::<Result<Vec<_>, _>>()?;
            Variant::array(element, children).map_err(invalid_value(offset))
        }
        (ExprKind::Dict(entries), Tag::Array) => {
            let element = ty.element().ok_or_else(mismatch)?;
            if element.tag() != Tag::DictEntry {
                return Err(mismatch());
            }
            let kv = element.items();
            let children = entries
                .iter()
                .map(|(key, value)| {
                    let key = resolve(key, &kv[0])?;
                    let value = resolve(value, &kv[1])?;
                    Variant::dict_entry(key, value).map_err(invalid_value(offset))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Variant::array(element, children).map_err(invalid_value(offset))
        }
        (ExprKind::Entry(key, value), Tag::DictEntry) => {
            let kv = ty.items();
            let key = resolve(key, &kv[0])?;
            let value = resolve(value, &kv[1])?;
            Variant::dict_entry(key, value).map_err(invalid_value(offset))
        }
        (ExprKind::Tuple(items), Tag::Tuple) => {
            let types = ty.items();
            if types.len() != items.len() {
                return Err(ParseError::Arity {
                    expected: ty.clone(),
                    needed: types.len(),
                    found: items.len(),
                    offset,
                });
            }
            let children = items
                .iter()
                .zip(&types)
                .map(|(item, t)| resolve(item, t))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Variant::tuple(children))
        }
        (ExprKind::Boxed(inner), Tag::Variant) => {
            let inner_ty = infer_type(inner)?;
            Ok(Variant::boxed(resolve(inner, &inner_ty)?))
        }
        _ => Err(mismatch()),
    }
}

fn parse_int(text: &str) -> Option<i128> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            i128::from_str_radix(hex, 16).ok()?
        }
        Some(_) => return None,
        None if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.parse::<i128>().ok()?
        }
        None => return None,
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_float(text: &str) -> Option<f64> {
    if let Some(n) = parse_int(text) {
        return Some(n as f64);
    }
    text.parse::<f64>().ok()
}

fn number(text: &str, ty: &VariantType, offset: usize) -> Result<Variant, ParseError> {
    let invalid = || ParseError::InvalidNumber {
        text: text.to_string(),
        offset,
    };
    if ty.tag() == Tag::Double {
        return parse_float(text).map(Variant::from).ok_or_else(invalid);
    }

    let n = parse_int(text).ok_or_else(invalid)?;
    let out_of_range = |_| ParseError::OutOfRange {
        text: text.to_string(),
        ty: ty.clone(),
        offset,
    };
    let value = match ty.tag() {
        Tag::Byte => Variant::from(u8::try_from(n).map_err(out_of_range)?),
        Tag::Int16 => Variant::from(i16::try_from(n).map_err(out_of_range)?),
        Tag::UInt16 => Variant::from(u16::try_from(n).map_err(out_of_range)?),
        Tag::Int32 => Variant::from(i32::try_from(n).map_err(out_of_range)?),
        Tag::UInt32 => Variant::from(u32::try_from(n).map_err(out_of_range)?),
        Tag::Int64 => Variant::from(i64::try_from(n).map_err(out_of_range)?),
        Tag::UInt64 => Variant::from(u64::try_from(n).map_err(out_of_range)?),
        Tag::Handle => Variant::handle(i32::try_from(n).map_err(out_of_range)?),
        _ => {
            return Err(ParseError::TypeMismatch {
                expected: ty.clone(),
                offset,
            })
        }
    };
    Ok(value)
}

// ==================== Printer ====================

/// Prints the text form. Types that would not be inferred back are
/// annotated, so `Variant::parse(&v.to_string())` yields `v` again.
impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use crate::variant::Payload;

        match &self.0.payload {
            Payload::Boolean(b) => write!(f, "{}", b),
            Payload::Byte(n) => write!(f, "byte 0x{:02x}", n),
            Payload::Int16(n) => write!(f, "int16 {}", n),
            Payload::UInt16(n) => write!(f, "uint16 {}", n),
            Payload::Int32(n) => write!(f, "{}", n),
            Payload::UInt32(n) => write!(f, "uint32 {}", n),
            Payload::Int64(n) => write!(f, "int64 {}", n),
            Payload::UInt64(n) => write!(f, "uint64 {}", n),
            Payload::Handle(n) => write!(f, "handle {}", n),
            Payload::Double(d) => write_double(f, *d),
            Payload::Text(s) => {
                match self.tag() {
                    Tag::ObjectPath => f.write_str("objectpath ")?,
                    Tag::Signature => f.write_str("signature ")?,
                    _ => {}
                }
                write_quoted(f, s)
            }
            Payload::Children(children) => match self.tag() {
                Tag::Array if self.ty() == &VariantType::BYTESTRING => {
                    write_bytestring(f, children)
                }
                Tag::Array => write_array(f, self.ty(), children),
                Tag::Tuple => {
                    f.write_str("(")?;
                    write_joined(f, children)?;
                    if children.len() == 1 {
                        f.write_str(",")?;
                    }
                    f.write_str(")")
                }
                Tag::DictEntry => {
                    f.write_str("{")?;
                    write_joined(f, children)?;
                    f.write_str("}")
                }
                Tag::Variant => {
                    f.write_str("<")?;
                    write_joined(f, children)?;
                    f.write_str(">")
                }
                _ => match children.first() {
                    Some(value) => write!(f, "just {}", value),
                    None => write!(f, "@{} nothing", self.ty()),
                },
            },
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Variant]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_array(f: &mut fmt::Formatter<'_>, ty: &VariantType, children: &[Variant]) -> fmt::Result {
    let is_dict = ty.element().is_some_and(|e| e.tag() == Tag::DictEntry);
    if children.is_empty() {
        return write!(f, "@{} {}", ty, if is_dict { "{}" } else { "[]" });
    }
    if !is_dict {
        f.write_str("[")?;
        write_joined(f, children)?;
        return f.write_str("]");
    }

    f.write_str("{")?;
    for (i, entry) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        let kv = entry.children();
        if let [key, value] = kv {
            write!(f, "{}: {}", key, value)?;
        }
    }
    f.write_str("}")
}

fn write_double(f: &mut fmt::Formatter<'_>, d: f64) -> fmt::Result {
    if d.is_nan() {
        f.write_str("nan")
    } else if d.is_infinite() {
        f.write_str(if d > 0.0 { "inf" } else { "-inf" })
    } else {
        // Debug always keeps a '.' or an exponent.
        write!(f, "{:?}", d)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in s.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c.is_control() => write!(f, "\\u{:04x}", u32::from(c))?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("'")
}

fn write_bytestring(f: &mut fmt::Formatter<'_>, children: &[Variant]) -> fmt::Result {
    use crate::variant::Payload;

    f.write_str("b'")?;
    for child in children {
        if let Payload::Byte(b) = child.0.payload {
            match b {
                b'\'' => f.write_str("\\'")?,
                b'\\' => f.write_str("\\\\")?,
                0x20..=0x7e => write!(f, "{}", b as char)?,
                _ => write!(f, "\\{:03o}", b)?,
            }
        }
    }
    f.write_str("'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(s: &str) -> VariantType {
        VariantType::new(s).unwrap()
    }

    #[test]
    fn parse_scalars() {
        assert_eq!(Variant::parse("true").unwrap(), Variant::from(true));
        assert_eq!(Variant::parse("-17").unwrap(), Variant::from(-17i32));
        assert_eq!(Variant::parse("3.5").unwrap(), Variant::from(3.5));
        assert_eq!(Variant::parse("'abc'").unwrap(), Variant::from("abc"));
        assert_eq!(Variant::parse("\"it's\"").unwrap(), Variant::from("it's"));
        assert_eq!(Variant::parse("uint32 7").unwrap(), Variant::from(7u32));
        assert_eq!(Variant::parse("byte 0xff").unwrap(), Variant::from(255u8));
        assert_eq!(Variant::parse("int64 -5").unwrap(), Variant::from(-5i64));
        assert_eq!(Variant::parse("handle 2").unwrap(), Variant::handle(2));
        assert_eq!(
            Variant::parse("uint64 18446744073709551615").unwrap(),
            Variant::from(u64::MAX)
        );
        assert_eq!(
            Variant::parse("objectpath '/org/a'").unwrap(),
            Variant::object_path("/org/a").unwrap()
        );
        assert_eq!(
            Variant::parse("@g 'as'").unwrap(),
            Variant::signature("as").unwrap()
        );
    }

    #[test]
    fn parse_escapes() {
        assert_eq!(
            Variant::parse(r"'a\nb\t\'\\é'").unwrap(),
            Variant::from("a\nb\t'\\é")
        );
        assert_eq!(
            Variant::parse(r"b'a\000\377'").unwrap(),
            Variant::bytestring(&[b'a', 0, 0xff])
        );
        assert!(matches!(
            Variant::parse(r"'\q'"),
            Err(ParseError::InvalidEscape { offset: 1 })
        ));
        assert!(matches!(
            Variant::parse("'open"),
            Err(ParseError::UnterminatedString { offset: 0 })
        ));
    }

    #[test]
    fn parse_containers() {
        let v = Variant::parse("[(1, 'a'), (2, 'b')]").unwrap();
        assert_eq!(v.ty(), &ty("a(is)"));
        assert_eq!(v.n_children(), 2);

        let v = Variant::parse("(1,)").unwrap();
        assert_eq!(v.ty(), &ty("(i)"));
        assert_eq!(Variant::parse("(1)").unwrap(), v);
        assert_eq!(Variant::parse("()").unwrap(), Variant::tuple(Vec::new()));

        let v = Variant::parse("{'a': <1>, 'b': <'x'>}").unwrap();
        assert_eq!(v.ty(), &ty("a{sv}"));

        let v = Variant::parse("{1, 'one'}").unwrap();
        assert_eq!(v.ty(), &ty("{is}"));

        let v = Variant::parse("[just 1, nothing]").unwrap();
        assert_eq!(v.ty(), &ty("ami"));

        let v = Variant::parse("[[], ['x']]").unwrap();
        assert_eq!(v.ty(), &ty("aas"));
    }

    #[test]
    fn numbers_unify_to_double() {
        let v = Variant::parse("[1, 2.5]").unwrap();
        assert_eq!(v.ty(), &ty("ad"));
        assert_eq!(v.child_value(0).unwrap(), Variant::from(1.0));
    }

    #[test]
    fn first_annotation_types_untyped_siblings() {
        let v = Variant::parse("[uint32 1, 2]").unwrap();
        assert_eq!(v.ty(), &ty("au"));
        assert_eq!(v.child_value(1).unwrap(), Variant::from(2u32));

        assert_eq!(
            Variant::parse("[byte 0x01, 0x02]").unwrap(),
            Variant::bytestring(&[1, 2])
        );

        let v = Variant::parse("[int64 5, 6]").unwrap();
        assert_eq!(v.ty(), &ty("ax"));
        assert_eq!(v.child_value(1).unwrap(), Variant::from(6i64));

        let v = Variant::parse("{'a': uint32 1, 'b': 2}").unwrap();
        assert_eq!(v.ty(), &ty("a{su}"));
        let entry = v.child_value(1).unwrap();
        assert_eq!(entry.child_value(1).unwrap(), Variant::from(2u32));

        let v = Variant::parse("[(uint32 1, 'a'), (2, 'b')]").unwrap();
        assert_eq!(v.ty(), &ty("a(us)"));
        let second = v.child_value(1).unwrap();
        assert_eq!(second.child_value(0).unwrap(), Variant::from(2u32));

        // Order does not matter, and nesting is followed.
        assert_eq!(Variant::parse("[1, uint16 2]").unwrap().ty(), &ty("aq"));
        assert_eq!(
            Variant::parse("[[1], [int16 2], []]").unwrap().ty(),
            &ty("aan")
        );
        assert_eq!(
            Variant::parse("[just 1, just byte 2, nothing]").unwrap().ty(),
            &ty("amy")
        );
        assert_eq!(
            Variant::parse("[b'ab', [1, 2]]").unwrap().ty(),
            &ty("aay")
        );
        assert_eq!(
            Variant::parse("[@a(us) [], [(1, 'x')]]").unwrap().ty(),
            &ty("aa(us)")
        );
    }

    #[test]
    fn annotated_siblings_still_conflict() {
        assert!(matches!(
            Variant::parse("[uint32 1, int64 2]"),
            Err(ParseError::Conflict { offset: 11, .. })
        ));
        assert!(matches!(
            Variant::parse("[uint32 1, 2.5]"),
            Err(ParseError::Conflict { .. })
        ));
        assert!(matches!(
            Variant::parse("[uint32 1, 'a']"),
            Err(ParseError::Conflict { .. })
        ));
        assert!(matches!(
            Variant::parse("[byte 0x01, 256]"),
            Err(ParseError::OutOfRange { .. })
        ));
        assert!(matches!(
            Variant::parse("[uint32 1, -1]"),
            Err(ParseError::OutOfRange { .. })
        ));
    }

    #[test]
    fn annotations_drive_typing() {
        let v = Variant::parse("@as []").unwrap();
        assert_eq!(v.ty(), &ty("as"));
        assert_eq!(Variant::parse("@a{sv} {}").unwrap().ty(), &ty("a{sv}"));
        assert_eq!(
            Variant::parse("@mi 5").unwrap(),
            Variant::maybe(VariantType::INT32, Some(5i32.into())).unwrap()
        );
        assert_eq!(
            Variant::parse("@ay [1, 2]").unwrap(),
            Variant::bytestring(&[1, 2])
        );

        let v = Variant::parse_typed("[1, 2]", &ty("at")).unwrap();
        assert_eq!(v.child_value(1).unwrap(), Variant::from(2u64));
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            Variant::parse("[]"),
            Err(ParseError::CannotInfer { offset: 0 })
        ));
        assert!(matches!(
            Variant::parse("nothing"),
            Err(ParseError::CannotInfer { .. })
        ));
        assert!(matches!(
            Variant::parse("[1, 'a']"),
            Err(ParseError::Conflict { offset: 4, .. })
        ));
        assert!(matches!(
            Variant::parse("byte 256"),
            Err(ParseError::OutOfRange { .. })
        ));
        assert!(matches!(
            Variant::parse("int32 1.5"),
            Err(ParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            Variant::parse("1 2"),
            Err(ParseError::Trailing { offset: 2 })
        ));
        assert!(matches!(
            Variant::parse("[1,"),
            Err(ParseError::UnexpectedEnd)
        ));
        assert!(matches!(
            Variant::parse("bogus"),
            Err(ParseError::UnexpectedToken { offset: 0, .. })
        ));
        assert!(matches!(
            Variant::parse("@q 'x'"),
            Err(ParseError::TypeMismatch { .. })
        ));
        assert!(matches!(
            Variant::parse_typed("(1, 2)", &ty("(i)")),
            Err(ParseError::Arity { needed: 1, found: 2, .. })
        ));
        assert!(matches!(
            Variant::parse("objectpath 'nope'"),
            Err(ParseError::Value { .. })
        ));
        assert!(matches!(
            Variant::parse("@a 1"),
            Err(ParseError::Type { offset: 0, .. })
        ));
        assert!(matches!(
            Variant::parse("#"),
            Err(ParseError::UnexpectedChar { character: '#', .. })
        ));
    }

    #[test]
    fn nesting_is_capped() {
        let deep = format!("{}1{}", "[".repeat(MAX_DEPTH + 2), "]".repeat(MAX_DEPTH + 2));
        assert_eq!(
            Variant::parse(&deep),
            Err(ParseError::TooDeep { max: MAX_DEPTH })
        );
    }

    #[test]
    fn inferred_types_are_depth_checked() {
        let deep = format!("[[[@{}i []]]]", "a".repeat(MAX_DEPTH - 2));
        assert_eq!(
            Variant::parse(&deep),
            Err(ParseError::Type {
                offset: 0,
                source: TypeError::TooDeep { max: MAX_DEPTH },
            })
        );

        let fits = format!("[[@{}i []]]", "a".repeat(MAX_DEPTH - 2));
        assert!(Variant::parse(&fits).is_ok());
    }

    #[test]
    fn print_forms() {
        assert_eq!(Variant::from(true).to_string(), "true");
        assert_eq!(Variant::from(-3i32).to_string(), "-3");
        assert_eq!(Variant::from(5u8).to_string(), "byte 0x05");
        assert_eq!(Variant::from(2.0).to_string(), "2.0");
        assert_eq!(Variant::from(f64::NEG_INFINITY).to_string(), "-inf");
        assert_eq!(Variant::from("it's").to_string(), r"'it\'s'");
        assert_eq!(
            Variant::parse("@as []").unwrap().to_string(),
            "@as []"
        );
        assert_eq!(
            Variant::parse("{'a': <uint32 1>}").unwrap().to_string(),
            "{'a': <uint32 1>}"
        );
        assert_eq!(
            Variant::parse("[(1, 'a'), (2, 'b')]").unwrap().to_string(),
            "[(1, 'a'), (2, 'b')]"
        );
        assert_eq!(Variant::parse("(7,)").unwrap().to_string(), "(7,)");
        assert_eq!(
            Variant::parse("@mmi just nothing").unwrap().to_string(),
            "just @mi nothing"
        );
        assert_eq!(Variant::bytestring(b"a'\n").to_string(), r"b'a\'\012'");
    }

    #[test]
    fn printed_text_parses_back() {
        let samples = [
            "[(1, 'a'), (2, 'b')]",
            "@a{sv} {}",
            "{'k': <[int16 1, int16 2]>}",
            "(byte 0x01, uint16 2, uint32 3, int64 -4, uint64 5, handle 6)",
            "[@ad [], [1.5]]",
            "just (nan, -inf)",
            "b'\\001bytes'",
            "(objectpath '/a/b', signature 'a{sv}', '')",
        ];
        for text in samples {
            let v = Variant::parse(text).unwrap();
            let printed = v.to_string();
            let reparsed = Variant::parse(&printed).unwrap();
            assert_eq!(reparsed.ty(), v.ty(), "{} -> {}", text, printed);
            assert_eq!(reparsed.to_string(), printed);
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_variant() -> impl Strategy<Value = Variant> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(Variant::from),
            any::<u8>().prop_map(Variant::from),
            any::<i16>().prop_map(Variant::from),
            any::<u16>().prop_map(Variant::from),
            any::<i32>().prop_map(Variant::from),
            any::<u32>().prop_map(Variant::from),
            any::<i64>().prop_map(Variant::from),
            any::<u64>().prop_map(Variant::from),
            any::<i32>().prop_map(Variant::handle),
            (-1e12f64..1e12).prop_map(Variant::from),
            any::<String>().prop_map(Variant::from),
            prop::collection::vec(any::<u8>(), 0..8).prop_map(|b| Variant::bytestring(&b)),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Variant::tuple),
                inner.clone().prop_map(Variant::boxed),
                inner.clone().prop_map(|v| {
                    let element = v.ty().clone();
                    Variant::maybe(element, Some(v)).unwrap()
                }),
                prop::collection::vec(any::<i64>(), 0..4).prop_map(|xs| {
                    let children = xs.into_iter().map(Variant::from).collect();
                    Variant::array(VariantType::INT64, children).unwrap()
                }),
                (any::<String>(), inner).prop_map(|(k, v)| {
                    let entry = Variant::dict_entry(k.into(), v).unwrap();
                    let element = entry.ty().clone();
                    Variant::array(element, vec![entry]).unwrap()
                }),
            ]
        })
    }

    proptest! {
        /// Printing then parsing yields the same value.
        #[test]
        fn prop_print_parse(v in arb_variant()) {
            let printed = v.to_string();
            let parsed = Variant::parse(&printed)
                .unwrap_or_else(|e| panic!("reparse of {} failed: {}", printed, e));
            prop_assert_eq!(parsed, v);
        }
    }
}
