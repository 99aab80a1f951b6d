use std::fs;
use std::path::PathBuf;

use crate::token::{Token, TokenKind, TokenSink};

/// A state function consumes input and hands back the next state; `None`
/// terminates the scan.
#[derive(Clone, Copy)]
pub struct State(pub fn(&mut Lexer<'_>) -> Option<State>);

/// Cursor-based scanner over one source string. `start..pos` is the span of
/// the token being built; `width` is the byte width of the last char read so
/// a single `backup` is always possible.
pub struct Lexer<'a> {
    input:   &'a str,
    sink:    &'a mut dyn TokenSink,
    start:   usize,
    pos:     usize,
    width:   usize,
    stopped: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, sink: &'a mut dyn TokenSink) -> Self {
        Lexer {
            input,
            sink,
            start: 0,
            pos: 0,
            width: 0,
            stopped: false,
        }
    }

    pub fn run(&mut self, initial: State) {
        let mut state = Some(initial);
        while let Some(State(f)) = state {
            if self.stopped {
                break;
            }
            state = f(self);
        }
    }

    fn current(&self) -> &str {
        &self.input[self.start..self.pos]
    }

    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn emit(&mut self, kind: TokenKind) {
        let token = Token {
            filename: None,
            value:    self.input[self.start..self.pos].to_string(),
            kind,
            start:    self.start,
            end:      self.pos,
        };
        if !self.sink.emit(token) {
            self.stopped = true;
        }
        self.start = self.pos;
    }

    fn error(&mut self, message: impl Into<String>) {
        let token = Token {
            filename: None,
            value:    message.into(),
            kind:     TokenKind::Error,
            start:    self.start,
            end:      self.pos,
        };
        if !self.sink.emit(token) {
            self.stopped = true;
        }
    }

    fn next(&mut self) -> Option<char> {
        self.width = 0;
        let ch = self.input[self.pos..].chars().next()?;
        self.width = ch.len_utf8();
        self.pos += self.width;
        Some(ch)
    }

    fn backup(&mut self) {
        self.pos -= self.width;
        self.width = 0;
    }

    fn peek(&mut self) -> Option<char> {
        let ch = self.next();
        self.backup();
        ch
    }

    fn ignore(&mut self) {
        self.start = self.pos;
    }

    fn accept(&mut self, valid: &str) -> bool {
        match self.next() {
            Some(ch) if valid.contains(ch) => true,
            _ => {
                self.backup();
                false
            }
        }
    }

    fn accept_run(&mut self, valid: &str) -> bool {
        let mut found = false;
        while self.accept(valid) {
            found = true;
        }
        found
    }

    fn accept_run_until(&mut self, invalid: &str) {
        loop {
            match self.next() {
                None => break,
                Some(ch) if invalid.contains(ch) => {
                    self.backup();
                    break;
                }
                Some(_) => {}
            }
        }
    }

    fn skip_whitespace(&mut self) {
        self.accept_run(" \t\r\n");
        self.ignore();
    }
}

/// Lex one source string into `sink`, ending with an `Eof` or `Error` token.
/// Returns `false` if the sink rejected a token (consumer gone).
pub fn scan(input: &str, sink: &mut dyn TokenSink) -> bool {
    let mut lexer = Lexer::new(input, sink);
    lexer.run(State(lex));
    !lexer.stopped
}

/// Lex an ordered file list as one logical stream: every token is tagged
/// with its filename and only the final file's `Eof` reaches the sink. A
/// file that cannot be read produces an `Error` token carrying the failing
/// filename and stops the feed.
pub fn scan_files(paths: &[PathBuf], sink: &mut dyn TokenSink) {
    let last = paths.len().saturating_sub(1);

    for (i, path) in paths.iter().enumerate() {
        let filename = path.display().to_string();

        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                sink.emit(Token {
                    filename: Some(filename),
                    value:    err.to_string(),
                    kind:     TokenKind::Error,
                    start:    0,
                    end:      0,
                });
                return;
            }
        };

        let mut feed = FileFeed {
            inner: &mut *sink,
            filename,
            is_last: i == last,
        };
        if !scan(&source, &mut feed) {
            return;
        }
    }
}

struct FileFeed<'a> {
    inner:    &'a mut dyn TokenSink,
    filename: String,
    is_last:  bool,
}

impl TokenSink for FileFeed<'_> {
    fn emit(&mut self, mut token: Token) -> bool {
        if token.kind == TokenKind::Eof && !self.is_last {
            // more files are coming, swallow this end marker
            return true;
        }
        token.filename = Some(self.filename.clone());
        self.inner.emit(token)
    }
}

pub fn lex(l: &mut Lexer<'_>) -> Option<State> {
    l.skip_whitespace();

    let Some(ch) = l.peek() else {
        l.emit(TokenKind::Eof);
        return None;
    };

    match ch {
        '=' => {
            l.next();
            if l.peek() == Some('>') {
                l.next();
                l.emit(TokenKind::Return);
            } else {
                l.emit(TokenKind::Assign);
            }
        }
        ':' => {
            l.next();
            l.emit(TokenKind::Colon);
        }
        ',' => {
            l.next();
            l.emit(TokenKind::Comma);
        }
        '?' => {
            l.next();
            l.emit(TokenKind::Optional);
        }
        '.' => {
            l.next();
            if l.next() != Some('.') || l.next() != Some('.') {
                l.error("extend requires 3 consecutive dots");
                return None;
            }
            l.emit(TokenKind::Extend);
        }
        '{' => {
            l.next();
            l.emit(TokenKind::OpenCurly);
        }
        '}' => {
            l.next();
            l.emit(TokenKind::CloseCurly);
        }
        '(' => {
            l.next();
            l.emit(TokenKind::OpenParen);
        }
        ')' => {
            l.next();
            l.emit(TokenKind::CloseParen);
        }
        '<' => {
            l.next();
            l.emit(TokenKind::OpenAngle);
        }
        '>' => {
            l.next();
            l.emit(TokenKind::CloseAngle);
        }
        '[' => {
            l.next();
            if l.peek() != Some(']') {
                l.error("expected ']' to close array type");
                return None;
            }
            l.next();
            l.emit(TokenKind::Array);
        }
        '#' => {
            l.next();
            l.ignore();
            l.accept_run_until("\n\r");
            l.emit(TokenKind::Comment);
        }
        '\'' => return scan_string(l, '\'', TokenKind::ConstStringSingleQuote, "'\n\r"),
        '"' => return scan_string(l, '"', TokenKind::ConstStringDoubleQuote, "\"\n\r"),
        '`' => return scan_string(l, '`', TokenKind::ConstStringBacktickQuote, "`"),
        _ => {
            match scan_number(l) {
                NumberScan::Number => return Some(State(lex)),
                NumberScan::Error => return None,
                NumberScan::NotNumber => {}
            }

            l.accept_run_until("=,.:?{}()<>[]# \t\n\r");
            if l.current().is_empty() {
                l.error("unexpected character");
                return None;
            }
            if !emit_keyword(l) {
                l.emit(TokenKind::Identifier);
            }
        }
    }

    Some(State(lex))
}

fn scan_string(l: &mut Lexer<'_>, quote: char, kind: TokenKind, boundary: &str) -> Option<State> {
    l.next();
    l.ignore();
    l.accept_run_until(boundary);
    if l.peek() != Some(quote) {
        l.error(format!("expected {} to close string", quote));
        return None;
    }
    l.emit(kind);
    l.next();
    l.ignore();
    Some(State(lex))
}

enum NumberScan {
    NotNumber,
    Number,
    Error,
}

fn scan_number(l: &mut Lexer<'_>) -> NumberScan {
    l.accept("+-");

    let mut digits = "0123456789_";
    if l.accept("0") && l.accept("xX") {
        digits = "0123456789abcdefABCDEF_";
    }

    l.accept_run(digits);

    if l.current().is_empty() || l.current().starts_with('_') {
        // not a number; the identifier scan picks up from here
        return NumberScan::NotNumber;
    }

    let mut is_float = false;
    if l.accept(".") {
        is_float = true;
        if !l.accept_run(digits) {
            l.error("expected digit after decimal point");
            return NumberScan::Error;
        }
    }

    if l.accept("eE") {
        l.accept("+-");
        l.accept_run("0123456789_");
    }

    if l.current().ends_with('_') {
        l.error("expected digit after each underscore");
        return NumberScan::Error;
    }

    let is_bytes = scan_byte_size_suffix(l);
    let is_duration = !is_bytes && scan_duration_suffix(l);

    match l.peek() {
        None | Some(' ') | Some('\t') | Some('\n') | Some('\r') | Some('#') => {}
        Some(ch) => {
            l.error(format!("unexpected character after number: {}", ch));
            return NumberScan::Error;
        }
    }

    if l.current().contains("__") {
        l.error("expected digit after each underscore");
        return NumberScan::Error;
    }

    if is_float && is_bytes {
        l.error("byte size number can't be presented as float");
        return NumberScan::Error;
    }
    if is_float && is_duration {
        l.error("duration number can't be presented as float");
        return NumberScan::Error;
    }

    if is_float {
        l.emit(TokenKind::ConstFloat);
    } else if is_bytes {
        l.emit(TokenKind::ConstBytes);
    } else if is_duration {
        l.emit(TokenKind::ConstDuration);
    } else {
        l.emit(TokenKind::ConstInt);
    }

    NumberScan::Number
}

// b, kb, mb, gb, tb, pb, eb
fn scan_byte_size_suffix(l: &mut Lexer<'_>) -> bool {
    if l.accept("b") {
        return true;
    }
    let rest = l.rest();
    if ["kb", "mb", "gb", "tb", "pb", "eb"].iter().any(|unit| rest.starts_with(unit)) {
        l.next();
        l.next();
        return true;
    }
    false
}

// ns, us, ms, s, m, h
fn scan_duration_suffix(l: &mut Lexer<'_>) -> bool {
    let rest = l.rest();
    if rest.starts_with("ns") || rest.starts_with("us") || rest.starts_with("ms") {
        l.next();
        l.next();
        return true;
    }
    l.accept("smh")
}

fn emit_keyword(l: &mut Lexer<'_>) -> bool {
    let kind = match l.current() {
        "const" => TokenKind::Const,
        "enum" => TokenKind::Enum,
        "model" => TokenKind::Model,
        "http" => TokenKind::Http,
        "rpc" => TokenKind::Rpc,
        "service" => TokenKind::Service,
        "byte" => TokenKind::Byte,
        "bool" => TokenKind::Bool,
        "int8" => TokenKind::Int8,
        "int16" => TokenKind::Int16,
        "int32" => TokenKind::Int32,
        "int64" => TokenKind::Int64,
        "uint8" => TokenKind::Uint8,
        "uint16" => TokenKind::Uint16,
        "uint32" => TokenKind::Uint32,
        "uint64" => TokenKind::Uint64,
        "float32" => TokenKind::Float32,
        "float64" => TokenKind::Float64,
        "timestamp" => TokenKind::Timestamp,
        "string" => TokenKind::String,
        "map" => TokenKind::Map,
        "any" => TokenKind::Any,
        "file" => TokenKind::File,
        "stream" => TokenKind::Stream,
        "true" | "false" => TokenKind::ConstBool,
        "null" => TokenKind::ConstNull,
        "error" => TokenKind::CustomError,
        _ => return false,
    };
    l.emit(kind);
    true
}
