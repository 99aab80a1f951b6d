use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;

use serde::Serialize;

use crate::lexer;

/// How many tokens the lexer may run ahead of the parser before its next
/// emit blocks.
pub const TOKEN_BUFFER: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Error,
    Eof,
    Identifier,
    Const,
    Enum,
    Model,
    Http,
    Rpc,
    Service,
    Byte,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Timestamp,
    String,
    Map,
    Array,
    Any,
    File,
    Stream,
    ConstDuration,
    ConstBytes,
    ConstFloat,
    ConstInt,
    ConstStringSingleQuote,
    ConstStringDoubleQuote,
    ConstStringBacktickQuote,
    ConstBool,
    ConstNull,
    Return,
    Assign,
    Optional,
    Colon,
    Comma,
    Extend,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,
    OpenAngle,
    CloseAngle,
    Comment,
    CustomError,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Error => "Error",
            TokenKind::Eof => "EOF",
            TokenKind::Identifier => "Identifier",
            TokenKind::Const => "Const",
            TokenKind::Enum => "Enum",
            TokenKind::Model => "Model",
            TokenKind::Http => "Http",
            TokenKind::Rpc => "Rpc",
            TokenKind::Service => "Service",
            TokenKind::Byte => "Byte",
            TokenKind::Bool => "Bool",
            TokenKind::Int8 => "Int8",
            TokenKind::Int16 => "Int16",
            TokenKind::Int32 => "Int32",
            TokenKind::Int64 => "Int64",
            TokenKind::Uint8 => "Uint8",
            TokenKind::Uint16 => "Uint16",
            TokenKind::Uint32 => "Uint32",
            TokenKind::Uint64 => "Uint64",
            TokenKind::Float32 => "Float32",
            TokenKind::Float64 => "Float64",
            TokenKind::Timestamp => "Timestamp",
            TokenKind::String => "String",
            TokenKind::Map => "Map",
            TokenKind::Array => "Array",
            TokenKind::Any => "Any",
            TokenKind::File => "File",
            TokenKind::Stream => "Stream",
            TokenKind::ConstDuration => "ConstDuration",
            TokenKind::ConstBytes => "ConstBytes",
            TokenKind::ConstFloat => "ConstFloat",
            TokenKind::ConstInt => "ConstInt",
            TokenKind::ConstStringSingleQuote => "ConstStringSingleQuote",
            TokenKind::ConstStringDoubleQuote => "ConstStringDoubleQuote",
            TokenKind::ConstStringBacktickQuote => "ConstStringBacktickQuote",
            TokenKind::ConstBool => "ConstBool",
            TokenKind::ConstNull => "ConstNull",
            TokenKind::Return => "Return",
            TokenKind::Assign => "Assign",
            TokenKind::Optional => "Optional",
            TokenKind::Colon => "Colon",
            TokenKind::Comma => "Comma",
            TokenKind::Extend => "Extend",
            TokenKind::OpenCurly => "OpenCurly",
            TokenKind::CloseCurly => "CloseCurly",
            TokenKind::OpenParen => "OpenParen",
            TokenKind::CloseParen => "CloseParen",
            TokenKind::OpenAngle => "OpenAngle",
            TokenKind::CloseAngle => "CloseAngle",
            TokenKind::Comment => "Comment",
            TokenKind::CustomError => "CustomError",
        };
        f.write_str(name)
    }
}

/// A single lexeme. `start` and `end` are byte offsets into the source the
/// token came from; `value` is the raw source substring (for string tokens
/// the delimiters are excluded, for error tokens it is the message).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub filename: Option<String>,
    pub value:    String,
    pub kind:     TokenKind,
    pub start:    usize,
    pub end:      usize,
}

/// Destination for lexed tokens. Returning `false` tells the lexer that the
/// consumer is gone and scanning should stop.
pub trait TokenSink {
    fn emit(&mut self, token: Token) -> bool;
}

impl TokenSink for SyncSender<Token> {
    fn emit(&mut self, token: Token) -> bool {
        self.send(token).is_ok()
    }
}

impl TokenSink for Vec<Token> {
    fn emit(&mut self, token: Token) -> bool {
        self.push(token);
        true
    }
}

/// Consumer side of the lexer handoff channel. The lexer runs on its own
/// thread and blocks once it is `TOKEN_BUFFER` tokens ahead. After the
/// terminal token (`Eof` or `Error`) arrives it is handed out again on every
/// subsequent call.
pub struct TokenStream {
    rx:  Receiver<Token>,
    end: Option<Token>,
}

impl TokenStream {
    pub fn from_source(source: impl Into<String>) -> Self {
        let source = source.into();
        let (tx, rx) = sync_channel(TOKEN_BUFFER);
        thread::spawn(move || {
            let mut tx: SyncSender<Token> = tx;
            lexer::scan(&source, &mut tx);
        });
        TokenStream { rx, end: None }
    }

    pub fn from_files(paths: Vec<PathBuf>) -> Self {
        let (tx, rx) = sync_channel(TOKEN_BUFFER);
        thread::spawn(move || {
            let mut tx: SyncSender<Token> = tx;
            lexer::scan_files(&paths, &mut tx);
        });
        TokenStream { rx, end: None }
    }

    pub fn next_token(&mut self) -> Token {
        if let Some(end) = &self.end {
            return end.clone();
        }

        match self.rx.recv() {
            Ok(token) => {
                if matches!(token.kind, TokenKind::Eof | TokenKind::Error) {
                    self.end = Some(token.clone());
                }
                token
            }
            // The producer hung up without a terminal token (e.g. an empty
            // file list); surface a synthetic end of stream.
            Err(_) => {
                let eof = Token {
                    filename: None,
                    value:    String::new(),
                    kind:     TokenKind::Eof,
                    start:    0,
                    end:      0,
                };
                self.end = Some(eof.clone());
                eof
            }
        }
    }
}
