//! List literals used to carry list values inside flat payloads.
//!
//! Grammar (a subset of Python literal syntax, which is what the ingestion side
//! historically produced, plus the JSON keywords):
//!
//! ```text
//! list    := '[' ( value ( ',' value )* ','? )? ']'
//! value   := list | dict | string | number | 'True' | 'False' | 'None'
//!          | 'true' | 'false' | 'null'
//! dict    := '{' ( string ':' value ( ',' string ':' value )* ','? )? '}'
//! string  := '\'' chars '\'' | '"' chars '"'     escapes: \\ \' \" \n \r \t \0 \xHH \uHHHH \UHHHHHHHH
//! number  := '-'? digits ( '.' digits )? ( [eE] [+-]? digits )? | 'nan' | 'inf' | '-inf'
//! ```
//!
//! `encode_list` always produces Python-style output (`['x', 'y']`, `True`, `None`).
//!
//! Known false positive: a genuine string value that begins with `[` and contains `]`
//! is indistinguishable from an encoded list. If it happens to parse (e.g. `"[1]"`) it
//! comes back as a list; otherwise decoding fails and the string is kept.

use crate::error::{CodecError, Result};
use crate::value::{Metadata, Scalar, Value};
use std::fmt::Write;

/// Deepest list/dict nesting the decoder accepts.
const MAX_DEPTH: usize = 128;

/// Heuristic used on read: only strings shaped like a list literal are decoded.
#[must_use]
pub fn looks_like_list(text: &str) -> bool {
    text.starts_with('[') && text.contains(']')
}

#[must_use]
pub fn encode_list(items: &[Value]) -> String {
    let mut out = String::new();
    write_list(&mut out, items);
    out
}

pub fn decode_list(text: &str) -> Result<Vec<Value>> {
    let mut parser = Parser::new(text);
    parser.skip_ws();
    let items = parser.list()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("trailing characters after list"));
    }
    Ok(items)
}

fn write_list(out: &mut String, items: &[Value]) {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_value(out, item);
    }
    out.push(']');
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Scalar(scalar) => write_scalar(out, scalar),
        Value::List(items) => write_list(out, items),
        Value::Map(map) => write_map(out, map),
    }
}

fn write_map(out: &mut String, map: &Metadata) {
    out.push('{');
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_string(out, key);
        out.push_str(": ");
        write_value(out, value);
    }
    out.push('}');
}

fn write_scalar(out: &mut String, scalar: &Scalar) {
    match scalar {
        Scalar::Null => out.push_str("None"),
        Scalar::Bool(true) => out.push_str("True"),
        Scalar::Bool(false) => out.push_str("False"),
        Scalar::Int(n) => {
            let _ = write!(out, "{n}");
        }
        Scalar::Float(f) => write_float(out, *f),
        Scalar::Str(s) => write_string(out, s),
    }
}

fn write_float(out: &mut String, f: f64) {
    if f.is_nan() {
        out.push_str("nan");
    } else if f.is_infinite() {
        out.push_str(if f > 0.0 { "inf" } else { "-inf" });
    } else {
        // `{:?}` keeps a fractional part or exponent, so the value reads back as a float.
        let _ = write!(out, "{f:?}");
    }
}

fn write_string(out: &mut String, s: &str) {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, reason: &str) -> CodecError {
        CodecError::MalformedList {
            input: self.input.to_string(),
            position: self.pos,
            reason: reason.to_string(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<()> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            _ => Err(self.error(&format!("expected '{want}'"))),
        }
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let parsed = parse(self);
        self.depth -= 1;
        parsed
    }

    fn list(&mut self) -> Result<Vec<Value>> {
        self.nested(Self::list_body)
    }

    fn list_body(&mut self) -> Result<Vec<Value>> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some(']') => return Ok(items),
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn dict(&mut self) -> Result<Metadata> {
        self.nested(Self::dict_body)
    }

    fn dict_body(&mut self) -> Result<Metadata> {
        self.expect('{')?;
        let mut map = Metadata::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(map);
                }
                Some('\'' | '"') => {}
                _ => return Err(self.error("dict keys must be strings")),
            }
            let key = self.string()?;
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some('}') => return Ok(map),
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn value(&mut self) -> Result<Value> {
        match self.peek() {
            Some('[') => self.list().map(Value::List),
            Some('{') => self.dict().map(Value::Map),
            Some('\'' | '"') => self.string().map(Value::text),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                self.number().map(Value::Scalar)
            }
            Some(c) if c.is_ascii_alphabetic() => self.keyword().map(Value::Scalar),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn keyword(&mut self) -> Result<Scalar> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.input[start..self.pos] {
            "True" | "true" => Ok(Scalar::Bool(true)),
            "False" | "false" => Ok(Scalar::Bool(false)),
            "None" | "null" => Ok(Scalar::Null),
            "nan" => Ok(Scalar::Float(f64::NAN)),
            "inf" => Ok(Scalar::Float(f64::INFINITY)),
            _ => {
                self.pos = start;
                Err(self.error("unknown identifier"))
            }
        }
    }

    fn number(&mut self) -> Result<Scalar> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        if self.rest().starts_with("inf") {
            self.pos += 3;
            let negative = self.input[start..].starts_with('-');
            return Ok(Scalar::Float(if negative {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }));
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' | 'e' | 'E' => is_float = true,
                '-' | '+' if matches!(self.input[..self.pos].chars().last(), Some('e' | 'E')) => {}
                _ => break,
            }
            self.bump();
        }
        let raw: String = self.input[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if !is_float {
            if let Ok(n) = raw.parse::<i64>() {
                return Ok(Scalar::Int(n));
            }
        }
        raw.parse::<f64>().map(Scalar::Float).map_err(|_| {
            self.pos = start;
            self.error("invalid number")
        })
    }

    fn string(&mut self) -> Result<String> {
        let quote = match self.bump() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected string")),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char> {
        match self.bump() {
            Some('\\') => Ok('\\'),
            Some('\'') => Ok('\''),
            Some('"') => Ok('"'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('0') => Ok('\0'),
            Some('x') => self.hex_escape(2),
            Some('u') => self.hex_escape(4),
            Some('U') => self.hex_escape(8),
            _ => Err(self.error("invalid escape")),
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char> {
        let hex = self
            .rest()
            .get(..digits)
            .ok_or_else(|| self.error("truncated escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos += digits;
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }
}
