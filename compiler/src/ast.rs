use std::fmt;

use serde::Serialize;

use crate::token::Token;

//
// Comment
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommentPosition {
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub token:    Token,
    pub position: CommentPosition,
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "# {}", self.token.value.trim())
    }
}

//
// Identifier
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identifier {
    pub token: Token,
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token.value)
    }
}

//
// Value
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DurationScale {
    Nanosecond,
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
}

impl DurationScale {
    pub fn as_nanos(self) -> i64 {
        match self {
            DurationScale::Nanosecond => 1,
            DurationScale::Microsecond => 1_000,
            DurationScale::Millisecond => 1_000_000,
            DurationScale::Second => 1_000_000_000,
            DurationScale::Minute => 60 * 1_000_000_000,
            DurationScale::Hour => 3_600 * 1_000_000_000,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            DurationScale::Nanosecond => "ns",
            DurationScale::Microsecond => "us",
            DurationScale::Millisecond => "ms",
            DurationScale::Second => "s",
            DurationScale::Minute => "m",
            DurationScale::Hour => "h",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ByteSizeScale {
    Byte,
    Kilobyte,
    Megabyte,
    Gigabyte,
    Terabyte,
    Petabyte,
    Exabyte,
}

impl ByteSizeScale {
    pub fn as_bytes(self) -> i64 {
        match self {
            ByteSizeScale::Byte => 1,
            ByteSizeScale::Kilobyte => 1 << 10,
            ByteSizeScale::Megabyte => 1 << 20,
            ByteSizeScale::Gigabyte => 1 << 30,
            ByteSizeScale::Terabyte => 1 << 40,
            ByteSizeScale::Petabyte => 1 << 50,
            ByteSizeScale::Exabyte => 1 << 60,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            ByteSizeScale::Byte => "b",
            ByteSizeScale::Kilobyte => "kb",
            ByteSizeScale::Megabyte => "mb",
            ByteSizeScale::Gigabyte => "gb",
            ByteSizeScale::Terabyte => "tb",
            ByteSizeScale::Petabyte => "pb",
            ByteSizeScale::Exabyte => "eb",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueBool {
    /// `None` for the implicit `true` of a flag option.
    pub token:        Option<Token>,
    pub value:        bool,
    pub user_defined: bool,
}

impl fmt::Display for ValueBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.value { "true" } else { "false" })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueString {
    pub token: Token,
    pub value: String,
}

impl fmt::Display for ValueString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use crate::token::TokenKind;

        match self.token.kind {
            TokenKind::ConstStringSingleQuote => write!(f, "'{}'", self.value),
            TokenKind::ConstStringBacktickQuote => write!(f, "`{}`", self.value),
            _ => write!(f, "\"{}\"", self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueFloat {
    pub token: Token,
    pub value: f64,
    pub size:  u8, // 32, 64
}

impl fmt::Display for ValueFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueInt {
    /// `None` when the value was assigned by the compiler (auto-incremented
    /// enum sets).
    pub token:   Option<Token>,
    pub value:   i64,
    pub size:    u8, // 8, 16, 32, 64
    pub defined: bool,
}

impl fmt::Display for ValueInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.token {
            Some(token) => f.write_str(&token.value),
            None => write!(f, "{}", self.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueUint {
    pub token: Token,
    pub value: u64,
    pub size:  u8, // 8, 16, 32, 64
}

impl fmt::Display for ValueUint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueDuration {
    pub token: Token,
    pub value: i64,
    pub scale: DurationScale,
}

impl fmt::Display for ValueDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueByteSize {
    pub token: Token,
    pub value: i64,
    pub scale: ByteSizeScale,
}

impl fmt::Display for ValueByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueNull {
    pub token: Token,
}

impl fmt::Display for ValueNull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null")
    }
}

/// A reference to a constant by name, replaced by the referenced literal
/// during validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueVariable {
    pub token: Token,
}

impl fmt::Display for ValueVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Bool(ValueBool),
    String(ValueString),
    Float(ValueFloat),
    Int(ValueInt),
    Uint(ValueUint),
    Duration(ValueDuration),
    ByteSize(ValueByteSize),
    Null(ValueNull),
    Variable(ValueVariable),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => v.fmt(f),
            Value::String(v) => v.fmt(f),
            Value::Float(v) => v.fmt(f),
            Value::Int(v) => v.fmt(f),
            Value::Uint(v) => v.fmt(f),
            Value::Duration(v) => v.fmt(f),
            Value::ByteSize(v) => v.fmt(f),
            Value::Null(v) => v.fmt(f),
            Value::Variable(v) => v.fmt(f),
        }
    }
}

//
// Type
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Type {
    Bool { token: Token },
    Byte { token: Token },
    Int { token: Token, size: u8 },
    Uint { token: Token, size: u8 },
    Float { token: Token, size: u8 },
    String { token: Token },
    Any { token: Token },
    Timestamp { token: Token },
    File { token: Token },
    Array { token: Token, elem: Box<Type> },
    Map { token: Token, key: Box<Type>, value: Box<Type> },
    Custom { token: Token },
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool { .. } => f.write_str("bool"),
            Type::Byte { .. } => f.write_str("byte"),
            Type::Int { token, .. } => f.write_str(&token.value),
            Type::Uint { token, .. } => f.write_str(&token.value),
            Type::Float { token, .. } => f.write_str(&token.value),
            Type::String { .. } => f.write_str("string"),
            Type::Any { .. } => f.write_str("any"),
            Type::Timestamp { .. } => f.write_str("timestamp"),
            Type::File { .. } => f.write_str("file"),
            Type::Array { elem, .. } => write!(f, "[]{}", elem),
            Type::Map { key, value, .. } => write!(f, "map<{}, {}>", key, value),
            Type::Custom { token } => f.write_str(&token.value),
        }
    }
}

//
// Document
//

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    pub comments: Vec<Comment>,
    pub consts:   Vec<Const>,
    pub enums:    Vec<Enum>,
    pub models:   Vec<Model>,
    pub services: Vec<Service>,
    pub errors:   Vec<CustomError>,
}

impl Document {
    /// Concatenate several documents into one, preserving declaration order.
    /// This is how multiple source files become one logical program.
    pub fn merge(docs: impl IntoIterator<Item = Document>) -> Document {
        let mut merged = Document::default();
        for doc in docs {
            merged.comments.extend(doc.comments);
            merged.consts.extend(doc.consts);
            merged.enums.extend(doc.enums);
            merged.models.extend(doc.models);
            merged.services.extend(doc.services);
            merged.errors.extend(doc.errors);
        }
        merged
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let has_enums = !self.enums.is_empty();
        let has_models = !self.models.is_empty();
        let has_services = !self.services.is_empty();
        let has_errors = !self.errors.is_empty();

        for (i, c) in self.consts.iter().enumerate() {
            if i != 0 {
                writeln!(f)?;
            }
            write!(f, "{}", c)?;
        }
        if !self.consts.is_empty() && (has_enums || has_models || has_services || has_errors) {
            write!(f, "\n\n")?;
        }

        for (i, e) in self.enums.iter().enumerate() {
            if i != 0 {
                write!(f, "\n\n")?;
            }
            write!(f, "{}", e)?;
        }
        if has_enums && (has_models || has_services || has_errors) {
            write!(f, "\n\n")?;
        }

        for (i, m) in self.models.iter().enumerate() {
            if i != 0 {
                write!(f, "\n\n")?;
            }
            write!(f, "{}", m)?;
        }
        if has_models && (has_services || has_errors) {
            write!(f, "\n\n")?;
        }

        for (i, s) in self.services.iter().enumerate() {
            if i != 0 {
                writeln!(f)?;
            }
            write!(f, "{}", s)?;
        }
        if has_services && has_errors {
            write!(f, "\n\n")?;
        }

        for (i, e) in self.errors.iter().enumerate() {
            if i != 0 {
                writeln!(f)?;
            }
            write!(f, "{}", e)?;
        }

        let has_decls = !self.consts.is_empty() || has_enums || has_models || has_services || has_errors;
        if has_decls && !self.comments.is_empty() {
            writeln!(f)?;
        }
        for (i, c) in self.comments.iter().enumerate() {
            if i != 0 {
                writeln!(f)?;
            }
            write!(f, "{}", c)?;
        }

        Ok(())
    }
}

//
// Const
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Const {
    pub token:    Token,
    pub name:     Identifier,
    pub value:    Value,
    pub comments: Vec<Comment>,
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.comments {
            writeln!(f, "{}", c)?;
        }
        write!(f, "const {} = {}", self.name, self.value)
    }
}

//
// Enum
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumSet {
    pub name:     Identifier,
    pub value:    ValueInt,
    pub defined:  bool,
    pub comments: Vec<Comment>,
}

impl fmt::Display for EnumSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.comments {
            writeln!(f, "    {}", c)?;
        }
        write!(f, "    {}", self.name)?;
        if self.defined {
            write!(f, " = {}", self.value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enum {
    pub token:    Token,
    pub name:     Identifier,
    /// Smallest signed bit width holding every set value; fixed up right
    /// after the enum body is parsed.
    pub size:     u8,
    pub sets:     Vec<EnumSet>,
    pub comments: Vec<Comment>,
}

impl fmt::Display for Enum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.comments.iter().filter(|c| c.position == CommentPosition::Top) {
            writeln!(f, "{}", c)?;
        }

        write!(f, "enum {} {{", self.name)?;

        let bottom: Vec<&Comment> = self
            .comments
            .iter()
            .filter(|c| c.position == CommentPosition::Bottom)
            .collect();

        if self.sets.is_empty() && bottom.is_empty() {
            return f.write_str("}");
        }

        for set in &self.sets {
            write!(f, "\n{}", set)?;
        }
        for c in bottom {
            write!(f, "\n    {}", c)?;
        }
        f.write_str("\n}")
    }
}

//
// Options
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opt {
    pub name:     Identifier,
    pub value:    Value,
    pub comments: Vec<Comment>,
}

impl fmt::Display for Opt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.comments {
            write!(f, "\n        {}", c)?;
        }
        write!(f, "\n        {}", self.name)?;

        // a flag option has no written value
        if let Value::Bool(b) = &self.value {
            if b.token.is_none() {
                return Ok(());
            }
        }

        write!(f, " = {}", self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Options {
    pub list:     Vec<Opt>,
    pub comments: Vec<Comment>,
}

impl Options {
    pub fn is_empty(&self) -> bool {
        self.list.is_empty() && self.comments.is_empty()
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " {{")?;
        for opt in &self.list {
            write!(f, "{}", opt)?;
        }
        for c in &self.comments {
            write!(f, "\n        {}", c)?;
        }
        f.write_str("\n    }")
    }
}

//
// Model
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:        Identifier,
    pub typ:         Type,
    pub is_optional: bool,
    pub options:     Options,
    pub comments:    Vec<Comment>,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.comments {
            writeln!(f, "    {}", c)?;
        }
        write!(f, "    {}", self.name)?;
        if self.is_optional {
            f.write_str("?")?;
        }
        write!(f, ": {}", self.typ)?;
        if !self.options.is_empty() {
            write!(f, "{}", self.options)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extend {
    pub name:     Identifier,
    pub comments: Vec<Comment>,
}

impl fmt::Display for Extend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.comments {
            writeln!(f, "    {}", c)?;
        }
        write!(f, "    ...{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub token:    Token,
    pub name:     Identifier,
    pub extends:  Vec<Extend>,
    pub fields:   Vec<Field>,
    pub comments: Vec<Comment>,
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.comments.iter().filter(|c| c.position == CommentPosition::Top) {
            writeln!(f, "{}", c)?;
        }

        write!(f, "model {} {{", self.name)?;

        let bottom: Vec<&Comment> = self
            .comments
            .iter()
            .filter(|c| c.position == CommentPosition::Bottom)
            .collect();

        if self.extends.is_empty() && self.fields.is_empty() && bottom.is_empty() {
            return f.write_str("}");
        }

        for extend in &self.extends {
            write!(f, "\n{}", extend)?;
        }
        for field in &self.fields {
            write!(f, "\n{}", field)?;
        }
        for c in bottom {
            write!(f, "\n    {}", c)?;
        }
        f.write_str("\n}")
    }
}

//
// Service
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MethodKind {
    Rpc,
    Http,
    RpcHttp,
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Rpc => f.write_str("rpc"),
            MethodKind::Http => f.write_str("http"),
            MethodKind::RpcHttp => f.write_str("rpc, http"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arg {
    pub name:   Identifier,
    pub typ:    Type,
    /// Chunked upload, e.g. a file or a raw `stream []byte` body.
    pub stream: bool,
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name)?;
        if self.stream {
            f.write_str("stream ")?;
        }
        write!(f, "{}", self.typ)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Return {
    pub name:   Identifier,
    pub typ:    Type,
    /// Server-streamed result rather than a single bounded value.
    pub stream: bool,
}

impl fmt::Display for Return {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name)?;
        if self.stream {
            f.write_str("stream ")?;
        }
        write!(f, "{}", self.typ)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Method {
    pub kind:     MethodKind,
    pub name:     Identifier,
    pub args:     Vec<Arg>,
    pub returns:  Vec<Return>,
    pub options:  Options,
    pub comments: Vec<Comment>,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.comments {
            write!(f, "\n    {}", c)?;
        }

        write!(f, "\n    {} {} (", self.kind, self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")?;

        if !self.returns.is_empty() {
            f.write_str(" => (")?;
            for (i, ret) in self.returns.iter().enumerate() {
                if i != 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", ret)?;
            }
            f.write_str(")")?;
        }

        if !self.options.is_empty() {
            write!(f, "{}", self.options)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub token:    Token,
    pub name:     Identifier,
    pub methods:  Vec<Method>,
    pub comments: Vec<Comment>,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.comments.iter().filter(|c| c.position == CommentPosition::Top) {
            writeln!(f, "{}", c)?;
        }

        write!(f, "service {} {{", self.name)?;

        let bottom: Vec<&Comment> = self
            .comments
            .iter()
            .filter(|c| c.position == CommentPosition::Bottom)
            .collect();

        if self.methods.is_empty() && bottom.is_empty() {
            return f.write_str("}");
        }

        for method in &self.methods {
            write!(f, "{}", method)?;
        }
        for c in bottom {
            write!(f, "\n    {}", c)?;
        }
        f.write_str("\n}")
    }
}

//
// Custom Error
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomError {
    pub token:       Token,
    pub name:        Identifier,
    /// Assigned by the validator when not declared.
    pub code:        Option<i64>,
    pub http_status: Option<u16>,
    pub msg:         Option<ValueString>,
    pub comments:    Vec<Comment>,
}

impl fmt::Display for CustomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.comments {
            writeln!(f, "{}", c)?;
        }

        write!(f, "error {} {{ ", self.name)?;
        if let Some(code) = self.code {
            write!(f, "Code = {} ", code)?;
        }
        if let Some(status) = self.http_status {
            if let Some(name) = crate::http::status_name(status) {
                write!(f, "HttpStatus = {} ", name)?;
            }
        }
        if let Some(msg) = &self.msg {
            write!(f, "Msg = {} ", msg)?;
        }
        f.write_str("}")
    }
}
