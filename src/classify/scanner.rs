//! Streaming JSON token scanner
//!
//! Reads JSON one token at a time from any `Read` without building a value
//! tree. Uninteresting values are skipped as whole units by tracking
//! object/array depth, so a classifier can walk the top-level fields of a
//! large body and stop as soon as it has what it needs.

use std::io::{ErrorKind, Read};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected character {found:?} at offset {offset}")]
    Unexpected { found: char, offset: usize },

    #[error("invalid escape sequence at offset {0}")]
    InvalidEscape(usize),

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("expected a scalar value")]
    ExpectedScalar,

    #[error("expected an object key")]
    ExpectedKey,

    #[error("expected a value")]
    ExpectedValue,

    #[error("body is not a JSON object")]
    NotAnObject,
}

/// Scalar JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    /// Number kept in its source text form
    Number(String),
    Bool(bool),
    Null,
}

impl Scalar {
    /// Text of the value (strings unquoted)
    pub fn text(&self) -> String {
        match self {
            Scalar::String(s) | Scalar::Number(s) => s.clone(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Null => "null".to_string(),
        }
    }

    /// Integer value of a number token
    pub fn as_i64(&self) -> Result<i64, ScanError> {
        match self {
            Scalar::Number(raw) => raw
                .parse::<i64>()
                .map_err(|_| ScanError::InvalidNumber(raw.clone())),
            other => Err(ScanError::InvalidNumber(other.text())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Key(String),
    Value(Scalar),
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Object { first: bool },
    Array { first: bool },
}

pub struct JsonScanner<R> {
    reader: R,
    peeked: Option<u8>,
    offset: usize,
    stack: Vec<Frame>,
    after_key: bool,
    finished: bool,
}

impl<R: Read> JsonScanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            peeked: None,
            offset: 0,
            stack: Vec::new(),
            after_key: false,
            finished: false,
        }
    }

    /// Current nesting depth (0 at top level)
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Next token, or `None` once the top-level value is complete.
    pub fn next_token(&mut self) -> Result<Option<Token>, ScanError> {
        if self.after_key {
            self.after_key = false;
            return self.read_value().map(Some);
        }

        match self.stack.last().copied() {
            None => {
                if self.finished {
                    return Ok(None);
                }
                if self.peek_significant()?.is_none() {
                    return Ok(None);
                }
                self.read_value().map(Some)
            }
            Some(Frame::Object { first }) => {
                let byte = self.expect_significant()?;
                if byte == b'}' {
                    self.bump();
                    self.close_frame();
                    return Ok(Some(Token::EndObject));
                }
                if !first {
                    self.expect_byte(b',')?;
                    self.peek_significant()?;
                }
                self.set_first(false);
                self.expect_byte(b'"')?;
                let key = self.read_string_body()?;
                self.peek_significant()?;
                self.expect_byte(b':')?;
                self.after_key = true;
                Ok(Some(Token::Key(key)))
            }
            Some(Frame::Array { first }) => {
                let byte = self.expect_significant()?;
                if byte == b']' {
                    self.bump();
                    self.close_frame();
                    return Ok(Some(Token::EndArray));
                }
                if !first {
                    self.expect_byte(b',')?;
                }
                self.set_first(false);
                self.read_value().map(Some)
            }
        }
    }

    /// Consume `{` if the next value is an object.
    ///
    /// Returns `false` for empty input or any other kind of value.
    pub fn begin_object(&mut self) -> Result<bool, ScanError> {
        match self.next_token()? {
            Some(Token::BeginObject) => Ok(true),
            _ => Ok(false),
        }
    }

    /// Next field name of the current object, or `None` at its closing brace.
    pub fn next_key(&mut self) -> Result<Option<String>, ScanError> {
        match self.next_token()? {
            Some(Token::Key(key)) => Ok(Some(key)),
            Some(Token::EndObject) => Ok(None),
            None => Err(ScanError::UnexpectedEof),
            Some(_) => Err(ScanError::ExpectedKey),
        }
    }

    /// Read a scalar value; containers are an error.
    pub fn read_scalar(&mut self) -> Result<Scalar, ScanError> {
        match self.next_token()? {
            Some(Token::Value(scalar)) => Ok(scalar),
            Some(_) => Err(ScanError::ExpectedScalar),
            None => Err(ScanError::UnexpectedEof),
        }
    }

    /// Skip the next value, including all children of an object or array.
    pub fn skip_value(&mut self) -> Result<(), ScanError> {
        let mut depth = 0usize;
        loop {
            match self.next_token()?.ok_or(ScanError::UnexpectedEof)? {
                Token::BeginObject | Token::BeginArray => depth += 1,
                Token::EndObject | Token::EndArray => {
                    depth = depth.checked_sub(1).ok_or(ScanError::ExpectedValue)?;
                }
                Token::Key(_) | Token::Value(_) => {}
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }

    fn read_value(&mut self) -> Result<Token, ScanError> {
        let byte = self.expect_significant()?;
        let token = match byte {
            b'{' => {
                self.bump();
                self.stack.push(Frame::Object { first: true });
                return Ok(Token::BeginObject);
            }
            b'[' => {
                self.bump();
                self.stack.push(Frame::Array { first: true });
                return Ok(Token::BeginArray);
            }
            b'"' => {
                self.bump();
                Token::Value(Scalar::String(self.read_string_body()?))
            }
            b't' => {
                self.expect_literal(b"true")?;
                Token::Value(Scalar::Bool(true))
            }
            b'f' => {
                self.expect_literal(b"false")?;
                Token::Value(Scalar::Bool(false))
            }
            b'n' => {
                self.expect_literal(b"null")?;
                Token::Value(Scalar::Null)
            }
            b'-' | b'0'..=b'9' => Token::Value(Scalar::Number(self.read_number()?)),
            other => {
                return Err(ScanError::Unexpected {
                    found: other as char,
                    offset: self.offset,
                })
            }
        };
        if self.stack.is_empty() {
            self.finished = true;
        }
        Ok(token)
    }

    /// Reads the rest of a string whose opening quote was already consumed.
    fn read_string_body(&mut self) -> Result<String, ScanError> {
        let mut bytes = Vec::new();
        loop {
            let byte = self.next_byte()?.ok_or(ScanError::UnexpectedEof)?;
            match byte {
                b'"' => break,
                b'\\' => {
                    let escape = self.next_byte()?.ok_or(ScanError::UnexpectedEof)?;
                    match escape {
                        b'"' => bytes.push(b'"'),
                        b'\\' => bytes.push(b'\\'),
                        b'/' => bytes.push(b'/'),
                        b'b' => bytes.push(0x08),
                        b'f' => bytes.push(0x0c),
                        b'n' => bytes.push(b'\n'),
                        b'r' => bytes.push(b'\r'),
                        b't' => bytes.push(b'\t'),
                        b'u' => {
                            let ch = self.read_unicode_escape()?;
                            let mut buf = [0u8; 4];
                            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                        }
                        _ => return Err(ScanError::InvalidEscape(self.offset)),
                    }
                }
                0x00..=0x1f => {
                    return Err(ScanError::Unexpected {
                        found: byte as char,
                        offset: self.offset,
                    })
                }
                _ => bytes.push(byte),
            }
        }
        String::from_utf8(bytes).map_err(|_| ScanError::InvalidUtf8)
    }

    fn read_unicode_escape(&mut self) -> Result<char, ScanError> {
        let high = self.read_hex4()?;
        let code = if (0xD800..0xDC00).contains(&high) {
            if self.next_byte()? != Some(b'\\') || self.next_byte()? != Some(b'u') {
                return Err(ScanError::InvalidEscape(self.offset));
            }
            let low = self.read_hex4()?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(ScanError::InvalidEscape(self.offset));
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };
        char::from_u32(code).ok_or(ScanError::InvalidEscape(self.offset))
    }

    fn read_hex4(&mut self) -> Result<u32, ScanError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let byte = self.next_byte()?.ok_or(ScanError::UnexpectedEof)?;
            let digit = (byte as char)
                .to_digit(16)
                .ok_or(ScanError::InvalidEscape(self.offset))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    fn read_number(&mut self) -> Result<String, ScanError> {
        let mut raw = String::new();
        while let Some(byte) = self.peek_byte()? {
            match byte {
                b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E' => {
                    raw.push(byte as char);
                    self.bump();
                }
                _ => break,
            }
        }
        if raw.parse::<f64>().is_err() {
            return Err(ScanError::InvalidNumber(raw));
        }
        Ok(raw)
    }

    fn expect_literal(&mut self, literal: &[u8]) -> Result<(), ScanError> {
        for &expected in literal {
            match self.next_byte()? {
                Some(byte) if byte == expected => {}
                Some(byte) => {
                    return Err(ScanError::Unexpected {
                        found: byte as char,
                        offset: self.offset,
                    })
                }
                None => return Err(ScanError::UnexpectedEof),
            }
        }
        Ok(())
    }

    fn expect_byte(&mut self, expected: u8) -> Result<(), ScanError> {
        match self.peek_significant()? {
            Some(byte) if byte == expected => {
                self.bump();
                Ok(())
            }
            Some(byte) => Err(ScanError::Unexpected {
                found: byte as char,
                offset: self.offset,
            }),
            None => Err(ScanError::UnexpectedEof),
        }
    }

    fn expect_significant(&mut self) -> Result<u8, ScanError> {
        self.peek_significant()?.ok_or(ScanError::UnexpectedEof)
    }

    fn close_frame(&mut self) {
        self.stack.pop();
        if self.stack.is_empty() {
            self.finished = true;
        }
    }

    fn set_first(&mut self, value: bool) {
        if let Some(Frame::Object { first } | Frame::Array { first }) = self.stack.last_mut() {
            *first = value;
        }
    }

    /// Peek the next non-whitespace byte
    fn peek_significant(&mut self) -> Result<Option<u8>, ScanError> {
        while let Some(byte) = self.peek_byte()? {
            if matches!(byte, b' ' | b'\t' | b'\n' | b'\r') {
                self.bump();
            } else {
                return Ok(Some(byte));
            }
        }
        Ok(None)
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, ScanError> {
        if self.peeked.is_none() {
            self.peeked = self.read_raw()?;
        }
        Ok(self.peeked)
    }

    fn next_byte(&mut self) -> Result<Option<u8>, ScanError> {
        let byte = match self.peeked.take() {
            Some(byte) => Some(byte),
            None => self.read_raw()?,
        };
        if byte.is_some() {
            self.offset += 1;
        }
        Ok(byte)
    }

    /// Consume a byte previously returned by a peek
    fn bump(&mut self) {
        if self.peeked.take().is_some() {
            self.offset += 1;
        }
    }

    fn read_raw(&mut self) -> Result<Option<u8>, ScanError> {
        let mut buf = [0u8; 1];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
