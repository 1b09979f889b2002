//! Declaration cell parser
//!
//! Scans cell source for `pipeline.<method>(...)` and `report.<method>(...)`
//! calls and parses their literal arguments. Everything else in the cell
//! (imports, comments, ordinary code) is skipped.

use tracing::debug;

use crate::directive::Directive;
use crate::error::ParseError;
use crate::literal::Literal;

/// Objects whose method calls are declarations
pub const RECEIVERS: [&str; 2] = ["pipeline", "report"];

/// A parsed method call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub receiver: String,
    pub method: String,
    pub args: Vec<Literal>,
    pub kwargs: Vec<(String, Literal)>,
    /// 1-based line of the receiver
    pub line: usize,
}

/// Parses every declaration call in `source` into directives
pub fn parse_directives(source: &str) -> Result<Vec<Directive>, ParseError> {
    let directives = parse_calls(source)?
        .into_iter()
        .map(|call| {
            let line = call.line;
            Directive::from_call(call).map_err(|message| ParseError::new(line, message))
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Parsed {} directive(s)", directives.len());
    Ok(directives)
}

/// Finds and parses every `pipeline.`/`report.` call in `source`
pub fn parse_calls(source: &str) -> Result<Vec<Call>, ParseError> {
    let mut cursor = Cursor::new(source);
    let mut calls = Vec::new();
    let mut after_dot = false;

    while let Some(c) = cursor.peek() {
        match c {
            '#' => cursor.skip_comment(),
            '\'' | '"' => {
                cursor.parse_string()?;
                after_dot = false;
            }
            c if is_ident_start(c) => {
                let line = cursor.line;
                let ident = cursor.ident();
                if !after_dot && RECEIVERS.contains(&ident.as_str()) && cursor.peek() == Some('.') {
                    cursor.bump();
                    let method = cursor.ident();
                    if method.is_empty() {
                        return Err(cursor.error(format!("expected a method name after '{}.'", ident)));
                    }
                    cursor.skip_inline_ws();
                    if cursor.peek() != Some('(') {
                        // attribute access, not a call
                        after_dot = false;
                        continue;
                    }
                    cursor.bump();
                    let (args, kwargs) = cursor.arguments()?;
                    calls.push(Call {
                        receiver: ident,
                        method,
                        args,
                        kwargs,
                        line,
                    });
                }
                after_dot = false;
            }
            '.' => {
                cursor.bump();
                after_dot = true;
            }
            _ => {
                cursor.bump();
                if !c.is_whitespace() {
                    after_dot = false;
                }
            }
        }
    }

    Ok(calls)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Cursor {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.line, message)
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_inline_ws(&mut self) {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.bump();
        }
    }

    /// Skips whitespace, newlines, line continuations and comments
    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                '#' => self.skip_comment(),
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.bump();
                    self.bump();
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    fn ident(&mut self) -> String {
        let mut ident = String::new();
        if let Some(c) = self.peek() {
            if !is_ident_start(c) {
                return ident;
            }
        }
        while let Some(c) = self.peek() {
            if !is_ident_continue(c) {
                break;
            }
            ident.push(c);
            self.bump();
        }
        ident
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of cell", expected))),
        }
    }

    /// Parses call arguments after the opening parenthesis
    fn arguments(&mut self) -> Result<(Vec<Literal>, Vec<(String, Literal)>), ParseError> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Literal)> = Vec::new();

        loop {
            self.skip_ws();
            match self.peek() {
                Some(')') => {
                    self.bump();
                    return Ok((args, kwargs));
                }
                None => return Err(self.error("unterminated call")),
                _ => {}
            }

            if let Some(name) = self.keyword_name() {
                let value = self.literal()?;
                kwargs.push((name, value));
            } else {
                if !kwargs.is_empty() {
                    return Err(self.error("positional argument follows keyword argument"));
                }
                args.push(self.literal()?);
            }

            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(')') => return Ok((args, kwargs)),
                Some(c) => return Err(self.error(format!("expected ',' or ')', found '{}'", c))),
                None => return Err(self.error("unterminated call")),
            }
        }
    }

    /// Consumes `name=` if the next tokens form a keyword argument
    fn keyword_name(&mut self) -> Option<String> {
        let start = (self.pos, self.line);
        let name = self.ident();
        if !name.is_empty() {
            self.skip_inline_ws();
            if self.peek() == Some('=') && self.peek_at(1) != Some('=') {
                self.bump();
                return Some(name);
            }
        }
        (self.pos, self.line) = start;
        None
    }

    fn literal(&mut self) -> Result<Literal, ParseError> {
        self.skip_ws();
        let Some(c) = self.peek() else {
            return Err(self.error("expected a value, found end of cell"));
        };

        match c {
            '\'' | '"' => {
                let mut value = self.parse_string()?;
                // implicit concatenation: "a" "b"
                loop {
                    let save = (self.pos, self.line);
                    self.skip_ws();
                    if matches!(self.peek(), Some('\'') | Some('"')) {
                        value.push_str(&self.parse_string()?);
                    } else {
                        (self.pos, self.line) = save;
                        break;
                    }
                }
                Ok(Literal::Str(value))
            }
            '[' => {
                self.bump();
                Ok(Literal::List(self.sequence(']')?))
            }
            '(' => {
                self.bump();
                Ok(Literal::List(self.sequence(')')?))
            }
            '{' => {
                self.bump();
                self.dict()
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            c if is_ident_start(c) => {
                let ident = self.ident();
                match ident.as_str() {
                    "True" => Ok(Literal::Bool(true)),
                    "False" => Ok(Literal::Bool(false)),
                    "None" => Ok(Literal::None),
                    "r" | "R" if matches!(self.peek(), Some('\'') | Some('"')) => {
                        Ok(Literal::Str(self.parse_raw_string()?))
                    }
                    _ => Err(self.error(format!(
                        "unsupported expression '{}': only literal values are allowed",
                        ident
                    ))),
                }
            }
            c => Err(self.error(format!("unexpected character '{}'", c))),
        }
    }

    fn sequence(&mut self, close: char) -> Result<Vec<Literal>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(items);
            }
            items.push(self.literal()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(items),
                Some(c) => {
                    return Err(self.error(format!("expected ',' or '{}', found '{}'", close, c)));
                }
                None => return Err(self.error(format!("missing closing '{}'", close))),
            }
        }
    }

    fn dict(&mut self) -> Result<Literal, ParseError> {
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Literal::Dict(entries));
            }
            let key = self.literal()?;
            self.expect(':')?;
            let value = self.literal()?;
            entries.push((key, value));
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Literal::Dict(entries)),
                Some(c) => return Err(self.error(format!("expected ',' or '}}', found '{}'", c))),
                None => return Err(self.error("missing closing '}'")),
            }
        }
    }

    fn number(&mut self) -> Result<Literal, ParseError> {
        let mut text = String::new();
        if let Some(sign @ ('-' | '+')) = self.peek() {
            text.push(sign);
            self.bump();
        }
        while let Some(c) = self.peek() {
            let exponent_sign =
                (c == '-' || c == '+') && matches!(text.chars().last(), Some('e') | Some('E'));
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let cleaned = text.replace('_', "");
        if let Ok(value) = cleaned.parse::<i64>() {
            return Ok(Literal::Int(value));
        }
        cleaned
            .parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| self.error(format!("invalid number '{}'", text)))
    }

    fn string_delimiter(&mut self) -> Result<(char, bool), ParseError> {
        let quote = match self.bump() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a string")),
        };
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }
        Ok((quote, triple))
    }

    fn at_closing(&self, quote: char, triple: bool) -> bool {
        if triple {
            self.peek() == Some(quote)
                && self.peek_at(1) == Some(quote)
                && self.peek_at(2) == Some(quote)
        } else {
            self.peek() == Some(quote)
        }
    }

    fn close_string(&mut self, triple: bool) {
        let width = if triple { 3 } else { 1 };
        for _ in 0..width {
            self.bump();
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let (quote, triple) = self.string_delimiter()?;
        let mut value = String::new();

        loop {
            if self.at_closing(quote, triple) {
                self.close_string(triple);
                return Ok(value);
            }
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\n') if !triple => return Err(self.error("unterminated string")),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('\\') => value.push('\\'),
                    Some('\'') => value.push('\''),
                    Some('"') => value.push('"'),
                    Some('\n') => {}
                    Some(other) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn parse_raw_string(&mut self) -> Result<String, ParseError> {
        let (quote, triple) = self.string_delimiter()?;
        let mut value = String::new();

        loop {
            if self.at_closing(quote, triple) {
                self.close_string(triple);
                return Ok(value);
            }
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\n') if !triple => return Err(self.error("unterminated string")),
                Some(c) => value.push(c),
            }
        }
    }
}
