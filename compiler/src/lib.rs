//! vela-compiler
//!
//! This crate implements the front end of the Vela schema language:
//!  1) A state-machine lexer feeding a bounded token channel (`lexer`, `token`),
//!  2) A recursive-descent parser producing a formattable AST (`parser`, `ast`),
//!  3) A whole-program validator over merged documents (`validator`),
//!  4) Compile entry points (`compile_source` / `compile_files`), and
//!  5) Error types (`VelaError`).
//!
//! Code generators consume the validated [`ast::Document`]; everything they
//! need (resolved constants, enum sizes, error codes) is settled by the time
//! validation succeeds.

pub mod ast;
pub mod compile;
pub mod error;
pub mod http;
pub mod lexer;
pub mod parser;
pub mod strcase;
pub mod token;
pub mod utils;
pub mod validator;

pub use compile::{compile_files, compile_source};
pub use error::VelaError;
pub use parser::Parser;
pub use validator::validate;
