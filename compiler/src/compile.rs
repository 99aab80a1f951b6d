use std::path::PathBuf;
use std::slice;

use crate::ast::Document;
use crate::error::VelaError;
use crate::parser::Parser;
use crate::validator::validate;

/// Compile one source string into a validated `Document`.
/// Returns `Err(VelaError)` if lexing, parsing or validation fails.
pub fn compile_source(source: &str) -> Result<Document, VelaError> {
    let mut doc = Parser::new(source).parse_document()?;
    validate(slice::from_mut(&mut doc))?;
    Ok(doc)
}

/// Compile an ordered list of files as one logical program. The files are
/// lexed as a single continuous token stream, so declaration order across
/// files is preserved for deterministic code generation.
pub fn compile_files(paths: &[PathBuf]) -> Result<Document, VelaError> {
    let mut doc = Parser::from_files(paths).parse_document()?;
    validate(slice::from_mut(&mut doc))?;
    Ok(doc)
}
