use std::mem;
use std::path::PathBuf;

use crate::ast::*;
use crate::error::VelaError;
use crate::strcase;
use crate::token::{Token, TokenKind, TokenStream};
use crate::utils::quote;

/// Recursive-descent parser with one token of lookahead. Tokens arrive from
/// the lexer thread through a `TokenStream`; the first syntax error aborts
/// the parse.
pub struct Parser {
    tokens:   TokenStream,
    peeked:   Option<Token>,
    comments: Vec<Comment>,
}

impl Parser {
    pub fn new(source: impl Into<String>) -> Self {
        Parser {
            tokens:   TokenStream::from_source(source),
            peeked:   None,
            comments: Vec::new(),
        }
    }

    pub fn from_files(paths: &[PathBuf]) -> Self {
        Parser {
            tokens:   TokenStream::from_files(paths.to_vec()),
            peeked:   None,
            comments: Vec::new(),
        }
    }

    fn next(&mut self) -> Token {
        match self.peeked.take() {
            Some(token) => token,
            None => self.tokens.next_token(),
        }
    }

    fn peek(&mut self) -> &Token {
        if self.peeked.is_none() {
            let token = self.tokens.next_token();
            self.peeked = Some(token);
        }
        self.peeked.as_ref().expect("peek buffer was just filled")
    }

    fn take_comments(&mut self) -> Vec<Comment> {
        mem::take(&mut self.comments)
    }

    /// Build a parse error for `token`. Error tokens from the lexer already
    /// carry their message, which wins over the grammar-level one.
    fn error_at(token: &Token, message: impl Into<String>) -> VelaError {
        if token.kind == TokenKind::Error {
            VelaError::parse(token, token.value.clone())
        } else {
            VelaError::parse(token, message)
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, VelaError> {
        if self.peek().kind != kind {
            let token = self.peek().clone();
            return Err(Self::error_at(
                &token,
                format!("expected {}, got {}", what, token.kind),
            ));
        }
        Ok(self.next())
    }

    //
    // Document
    //

    pub fn parse_document(&mut self) -> Result<Document, VelaError> {
        let mut doc = Document::default();

        loop {
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::Comment => {
                    let comment = self.parse_comment()?;
                    self.comments.push(comment);
                }
                TokenKind::Const => doc.consts.push(self.parse_const()?),
                TokenKind::Enum => doc.enums.push(self.parse_enum()?),
                TokenKind::Model => doc.models.push(self.parse_model()?),
                TokenKind::Service => doc.services.push(self.parse_service()?),
                TokenKind::CustomError => doc.errors.push(self.parse_custom_error()?),
                _ => {
                    let token = self.peek().clone();
                    return Err(Self::error_at(
                        &token,
                        format!(
                            "expected const, enum, model, service or error declaration, got {}",
                            token.kind
                        ),
                    ));
                }
            }
        }

        doc.comments.append(&mut self.comments);

        Ok(doc)
    }

    //
    // Comment
    //

    fn parse_comment(&mut self) -> Result<Comment, VelaError> {
        let token = self.expect(TokenKind::Comment, "comment")?;
        Ok(Comment {
            token,
            position: CommentPosition::Top,
        })
    }

    //
    // Const
    //

    fn parse_const(&mut self) -> Result<Const, VelaError> {
        let comments = self.take_comments();
        let token = self.expect(TokenKind::Const, "'const' keyword")?;

        let name_tok = self.expect(TokenKind::Identifier, "identifier for defining a constant")?;
        if !strcase::is_pascal(&name_tok.value) {
            return Err(Self::error_at(&name_tok, "constant name must be in PascalCase format"));
        }

        self.expect(TokenKind::Assign, "'=' after constant name")?;

        let value = self.parse_value()?;

        Ok(Const {
            token,
            name: Identifier { token: name_tok },
            value,
            comments,
        })
    }

    //
    // Enum
    //

    fn parse_enum(&mut self) -> Result<Enum, VelaError> {
        let comments = self.take_comments();
        let token = self.expect(TokenKind::Enum, "'enum' keyword")?;

        let name_tok = self.expect(TokenKind::Identifier, "identifier for defining an enum")?;
        if !strcase::is_pascal(&name_tok.value) {
            return Err(Self::error_at(&name_tok, "enum name must be in PascalCase format"));
        }

        self.expect(TokenKind::OpenCurly, "'{' after enum declaration")?;

        let mut enum_ = Enum {
            token,
            name: Identifier { token: name_tok },
            size: 0,
            sets: Vec::new(),
            comments,
        };

        loop {
            match self.peek().kind {
                TokenKind::CloseCurly => break,
                TokenKind::Comment => {
                    let comment = self.parse_comment()?;
                    self.comments.push(comment);
                }
                TokenKind::Identifier => {
                    let mut set = self.parse_enum_set()?;
                    set.comments = self.take_comments();
                    enum_.sets.push(set);
                }
                _ => {
                    let tok = self.peek().clone();
                    return Err(Self::error_at(
                        &tok,
                        format!("expected enum set name or '}}', got {}", tok.kind),
                    ));
                }
            }
        }

        self.next(); // skip '}'

        for mut comment in self.take_comments() {
            comment.position = CommentPosition::Bottom;
            enum_.comments.push(comment);
        }

        // Fill in auto-incremented values and settle the bit width over the
        // whole value range.
        let mut next = 0i64;
        let mut min_value = 0i64;
        let mut max_value = 0i64;

        for set in enum_.sets.iter_mut() {
            if set.defined {
                next = set.value.value.saturating_add(1);
            } else {
                set.value = ValueInt {
                    token:   None,
                    value:   next,
                    size:    0,
                    defined: false,
                };
                next = next.saturating_add(1);
            }

            min_value = min_value.min(set.value.value);
            max_value = max_value.max(set.value.value);
        }

        enum_.size = int_size(min_value, max_value);
        for set in enum_.sets.iter_mut() {
            set.value.size = enum_.size;
        }

        Ok(enum_)
    }

    fn parse_enum_set(&mut self) -> Result<EnumSet, VelaError> {
        let name_tok = self.expect(TokenKind::Identifier, "identifier for defining an enum set")?;
        if name_tok.value != "_" && !strcase::is_pascal(&name_tok.value) {
            return Err(Self::error_at(&name_tok, "enum set name must be in PascalCase format"));
        }

        if self.peek().kind != TokenKind::Assign {
            return Ok(EnumSet {
                name:    Identifier { token: name_tok },
                value:   ValueInt { token: None, value: 0, size: 0, defined: false },
                defined: false,
                comments: Vec::new(),
            });
        }

        self.next(); // skip '='

        let value_tok = self.expect(TokenKind::ConstInt, "constant integer value for an enum set")?;
        let clean = value_tok.value.replace('_', "");
        let value = parse_int(&clean).ok_or_else(|| {
            Self::error_at(
                &value_tok,
                format!("invalid integer value {} for an enum set", quote(&value_tok.value)),
            )
        })?;

        Ok(EnumSet {
            name:    Identifier { token: name_tok },
            value:   ValueInt {
                token:   Some(value_tok),
                value,
                size:    0,
                defined: true,
            },
            defined: true,
            comments: Vec::new(),
        })
    }

    //
    // Options
    //

    fn parse_option(&mut self) -> Result<Opt, VelaError> {
        let name_tok = self.expect(TokenKind::Identifier, "identifier for defining an option")?;
        if !strcase::is_pascal(&name_tok.value) {
            return Err(Self::error_at(&name_tok, "option name must be in PascalCase format"));
        }

        let name = Identifier { token: name_tok };

        if self.peek().kind != TokenKind::Assign {
            // a bare option name is a flag set to true
            return Ok(Opt {
                name,
                value: Value::Bool(ValueBool {
                    token:        None,
                    value:        true,
                    user_defined: false,
                }),
                comments: Vec::new(),
            });
        }

        self.next(); // skip '='

        let value = self.parse_value()?;

        Ok(Opt { name, value, comments: Vec::new() })
    }

    fn parse_options(&mut self) -> Result<Options, VelaError> {
        self.next(); // skip '{'

        let mut options = Options::default();

        loop {
            match self.peek().kind {
                TokenKind::CloseCurly => break,
                TokenKind::Comment => {
                    let comment = self.parse_comment()?;
                    self.comments.push(comment);
                }
                _ => {
                    let mut option = self.parse_option()?;
                    option.comments = self.take_comments();
                    options.list.push(option);
                }
            }
        }

        self.next(); // skip '}'

        for mut comment in self.take_comments() {
            comment.position = CommentPosition::Bottom;
            options.comments.push(comment);
        }

        Ok(options)
    }

    //
    // Model
    //

    fn parse_model(&mut self) -> Result<Model, VelaError> {
        let comments = self.take_comments();
        let token = self.expect(TokenKind::Model, "'model' keyword")?;

        let name_tok = self.expect(TokenKind::Identifier, "identifier for defining a model")?;
        if !strcase::is_pascal(&name_tok.value) {
            return Err(Self::error_at(&name_tok, "model name must be in PascalCase format"));
        }

        self.expect(TokenKind::OpenCurly, "'{' after model declaration")?;

        let mut model = Model {
            token,
            name: Identifier { token: name_tok },
            extends: Vec::new(),
            fields: Vec::new(),
            comments,
        };

        loop {
            match self.peek().kind {
                TokenKind::CloseCurly => break,
                TokenKind::Comment => {
                    let comment = self.parse_comment()?;
                    self.comments.push(comment);
                }
                TokenKind::Extend => {
                    let mut extend = self.parse_extend()?;
                    extend.comments = self.take_comments();
                    model.extends.push(extend);
                }
                _ => {
                    let field = self.parse_field()?;
                    model.fields.push(field);
                }
            }
        }

        self.next(); // skip '}'

        for mut comment in self.take_comments() {
            comment.position = CommentPosition::Bottom;
            model.comments.push(comment);
        }

        Ok(model)
    }

    fn parse_extend(&mut self) -> Result<Extend, VelaError> {
        self.expect(TokenKind::Extend, "'...' to include another model")?;

        let name_tok = self.expect(TokenKind::Identifier, "identifier after '...'")?;
        if !strcase::is_pascal(&name_tok.value) {
            return Err(Self::error_at(&name_tok, "extended model name must be in PascalCase format"));
        }

        Ok(Extend {
            name:     Identifier { token: name_tok },
            comments: Vec::new(),
        })
    }

    fn parse_field(&mut self) -> Result<Field, VelaError> {
        let name_tok = self.expect(TokenKind::Identifier, "identifier for defining a model field")?;
        if !strcase::is_pascal(&name_tok.value) {
            return Err(Self::error_at(&name_tok, "model field name must be in PascalCase format"));
        }

        let is_optional = match self.peek().kind {
            TokenKind::Optional => {
                self.next(); // skip '?'
                self.expect(TokenKind::Colon, "':' after '?'")?;
                true
            }
            TokenKind::Colon => {
                self.next(); // skip ':'
                false
            }
            _ => {
                let tok = self.peek().clone();
                return Err(Self::error_at(
                    &tok,
                    format!("expected ':' or '?' after model field name, got {}", tok.kind),
                ));
            }
        };

        let typ = self.parse_type()?;

        // comments gathered so far belong to the field, not to its options
        let comments = self.take_comments();

        let options = if self.peek().kind == TokenKind::OpenCurly {
            self.parse_options()?
        } else {
            Options::default()
        };

        Ok(Field {
            name: Identifier { token: name_tok },
            typ,
            is_optional,
            options,
            comments,
        })
    }

    //
    // Type
    //

    fn parse_type(&mut self) -> Result<Type, VelaError> {
        match self.peek().kind {
            TokenKind::Map => self.parse_map_type(),
            TokenKind::Array => self.parse_array_type(),
            TokenKind::Bool => Ok(Type::Bool { token: self.next() }),
            TokenKind::Byte => Ok(Type::Byte { token: self.next() }),
            TokenKind::Int8 | TokenKind::Int16 | TokenKind::Int32 | TokenKind::Int64 => {
                let token = self.next();
                let size = type_bits(token.kind);
                Ok(Type::Int { token, size })
            }
            TokenKind::Uint8 | TokenKind::Uint16 | TokenKind::Uint32 | TokenKind::Uint64 => {
                let token = self.next();
                let size = type_bits(token.kind);
                Ok(Type::Uint { token, size })
            }
            TokenKind::Float32 | TokenKind::Float64 => {
                let token = self.next();
                let size = type_bits(token.kind);
                Ok(Type::Float { token, size })
            }
            TokenKind::Timestamp => Ok(Type::Timestamp { token: self.next() }),
            TokenKind::String => Ok(Type::String { token: self.next() }),
            TokenKind::Any => Ok(Type::Any { token: self.next() }),
            TokenKind::File => Ok(Type::File { token: self.next() }),
            TokenKind::Identifier => {
                let token = self.next();
                if !strcase::is_pascal(&token.value) {
                    return Err(Self::error_at(&token, "custom type name must be in PascalCase format"));
                }
                Ok(Type::Custom { token })
            }
            _ => {
                let tok = self.peek().clone();
                Err(Self::error_at(&tok, format!("expected a type, got {}", tok.kind)))
            }
        }
    }

    fn parse_map_type(&mut self) -> Result<Type, VelaError> {
        let token = self.expect(TokenKind::Map, "'map' keyword")?;
        self.expect(TokenKind::OpenAngle, "'<' after 'map' keyword")?;

        let key = self.parse_map_key_type()?;

        self.expect(TokenKind::Comma, "',' after map key type")?;

        let value = self.parse_type()?;

        self.expect(TokenKind::CloseAngle, "'>' after map value type")?;

        Ok(Type::Map {
            token,
            key:   Box::new(key),
            value: Box::new(value),
        })
    }

    fn parse_map_key_type(&mut self) -> Result<Type, VelaError> {
        match self.peek().kind {
            TokenKind::Int8
            | TokenKind::Int16
            | TokenKind::Int32
            | TokenKind::Int64
            | TokenKind::Uint8
            | TokenKind::Uint16
            | TokenKind::Uint32
            | TokenKind::Uint64
            | TokenKind::String
            | TokenKind::Byte => self.parse_type(),
            _ => {
                let tok = self.peek().clone();
                Err(Self::error_at(
                    &tok,
                    format!("expected map key type to be comparable, got {}", tok.kind),
                ))
            }
        }
    }

    fn parse_array_type(&mut self) -> Result<Type, VelaError> {
        let token = self.expect(TokenKind::Array, "'[]' to begin an array type")?;
        let elem = self.parse_type()?;
        Ok(Type::Array {
            token,
            elem: Box::new(elem),
        })
    }

    //
    // Service
    //

    fn parse_service(&mut self) -> Result<Service, VelaError> {
        let comments = self.take_comments();
        let token = self.expect(TokenKind::Service, "'service' keyword")?;

        let name_tok = self.expect(TokenKind::Identifier, "identifier for defining a service")?;
        if !strcase::is_pascal(&name_tok.value) {
            return Err(Self::error_at(&name_tok, "service name must be in PascalCase format"));
        }

        self.expect(TokenKind::OpenCurly, "'{' after service declaration")?;

        let mut service = Service {
            token,
            name: Identifier { token: name_tok },
            methods: Vec::new(),
            comments,
        };

        loop {
            match self.peek().kind {
                TokenKind::CloseCurly => break,
                TokenKind::Comment => {
                    let comment = self.parse_comment()?;
                    self.comments.push(comment);
                }
                TokenKind::Rpc | TokenKind::Http => {
                    let method = self.parse_method()?;
                    service.methods.push(method);
                }
                _ => {
                    let tok = self.peek().clone();
                    return Err(Self::error_at(
                        &tok,
                        format!("expected 'rpc' or 'http' to begin a service method, got {}", tok.kind),
                    ));
                }
            }
        }

        self.next(); // skip '}'

        for mut comment in self.take_comments() {
            comment.position = CommentPosition::Bottom;
            service.comments.push(comment);
        }

        Ok(service)
    }

    fn parse_method_kind(&mut self) -> Result<MethodKind, VelaError> {
        let first = self.next();
        let kind = match first.kind {
            TokenKind::Rpc => MethodKind::Rpc,
            TokenKind::Http => MethodKind::Http,
            _ => return Err(Self::error_at(&first, "expected 'rpc' or 'http' keyword")),
        };

        if self.peek().kind != TokenKind::Comma {
            return Ok(kind);
        }

        self.next(); // skip ','

        // `rpc, http` (in either order) marks a mixed-mode method
        let other = match kind {
            MethodKind::Rpc => TokenKind::Http,
            _ => TokenKind::Rpc,
        };
        self.expect(other, "the other of 'rpc' and 'http' after ','")?;

        Ok(MethodKind::RpcHttp)
    }

    fn parse_method(&mut self) -> Result<Method, VelaError> {
        let kind = self.parse_method_kind()?;

        let name_tok = self.expect(TokenKind::Identifier, "identifier for defining a service method")?;
        if !strcase::is_pascal(&name_tok.value) {
            return Err(Self::error_at(&name_tok, "service method name must be in PascalCase format"));
        }

        self.expect(TokenKind::OpenParen, "'(' after service method name")?;

        let mut args = Vec::new();
        while self.peek().kind != TokenKind::CloseParen {
            args.push(self.parse_method_arg()?);
        }

        self.next(); // skip ')'

        let mut returns = Vec::new();
        if self.peek().kind == TokenKind::Return {
            self.next(); // skip '=>'
            self.expect(TokenKind::OpenParen, "'(' after '=>'")?;
            while self.peek().kind != TokenKind::CloseParen {
                returns.push(self.parse_method_return()?);
            }
            self.next(); // skip ')'
        }

        let comments = self.take_comments();

        let options = if self.peek().kind == TokenKind::OpenCurly {
            self.parse_options()?
        } else {
            Options::default()
        };

        Ok(Method {
            kind,
            name: Identifier { token: name_tok },
            args,
            returns,
            options,
            comments,
        })
    }

    fn parse_method_arg(&mut self) -> Result<Arg, VelaError> {
        let name_tok = self.expect(TokenKind::Identifier, "identifier for defining a service method argument")?;
        if !strcase::is_camel(&name_tok.value) {
            return Err(Self::error_at(&name_tok, "service method argument name must be in camelCase format"));
        }

        self.expect(TokenKind::Colon, "':' after service method argument name")?;

        let stream = if self.peek().kind == TokenKind::Stream {
            self.next(); // skip 'stream'
            true
        } else {
            false
        };

        let typ = self.parse_type()?;

        if self.peek().kind == TokenKind::Comma {
            self.next(); // skip ','
        }

        Ok(Arg {
            name: Identifier { token: name_tok },
            typ,
            stream,
        })
    }

    fn parse_method_return(&mut self) -> Result<Return, VelaError> {
        let name_tok = self.expect(TokenKind::Identifier, "identifier for defining a service method return")?;
        if !strcase::is_camel(&name_tok.value) {
            return Err(Self::error_at(&name_tok, "service method return name must be in camelCase format"));
        }

        self.expect(TokenKind::Colon, "':' after service method return name")?;

        let stream = if self.peek().kind == TokenKind::Stream {
            self.next(); // skip 'stream'
            true
        } else {
            false
        };

        let typ = self.parse_type()?;

        if self.peek().kind == TokenKind::Comma {
            self.next(); // skip ','
        }

        Ok(Return {
            name: Identifier { token: name_tok },
            typ,
            stream,
        })
    }

    //
    // Custom Error
    //

    fn parse_custom_error(&mut self) -> Result<CustomError, VelaError> {
        let comments = self.take_comments();
        let token = self.expect(TokenKind::CustomError, "'error' keyword")?;

        let name_tok = self.expect(TokenKind::Identifier, "identifier for defining a custom error")?;
        if !strcase::is_pascal(&name_tok.value) {
            return Err(Self::error_at(&name_tok, "custom error name must be in PascalCase format"));
        }

        self.expect(TokenKind::OpenCurly, "'{' after custom error declaration")?;

        let mut error = CustomError {
            token,
            name: Identifier { token: name_tok },
            code: None,
            http_status: None,
            msg: None,
            comments,
        };

        loop {
            match self.peek().kind {
                TokenKind::CloseCurly => break,
                TokenKind::Comment => {
                    let comment = self.parse_comment()?;
                    self.comments.push(comment);
                }
                TokenKind::Identifier => self.parse_custom_error_field(&mut error)?,
                _ => {
                    let tok = self.peek().clone();
                    return Err(Self::error_at(
                        &tok,
                        format!("expected 'Code', 'HttpStatus' or 'Msg' in custom error, got {}", tok.kind),
                    ));
                }
            }
        }

        self.next(); // skip '}'

        if error.msg.is_none() {
            return Err(Self::error_at(&error.token, "Msg is not defined in custom error"));
        }

        error.comments.append(&mut self.comments);

        Ok(error)
    }

    fn parse_custom_error_field(&mut self, error: &mut CustomError) -> Result<(), VelaError> {
        let value = self.peek().value.clone();
        match value.as_str() {
            "Code" => self.parse_custom_error_code(error),
            "HttpStatus" => self.parse_custom_error_http_status(error),
            "Msg" => self.parse_custom_error_msg(error),
            other => {
                let tok = self.peek().clone();
                Err(Self::error_at(
                    &tok,
                    format!("unexpected field name {} in custom error", quote(other)),
                ))
            }
        }
    }

    fn parse_custom_error_code(&mut self, error: &mut CustomError) -> Result<(), VelaError> {
        if error.code.is_some() {
            let tok = self.peek().clone();
            return Err(Self::error_at(&tok, "Code is already defined in custom error"));
        }

        self.next(); // skip 'Code'
        self.expect(TokenKind::Assign, "'=' after 'Code'")?;

        if self.peek().kind != TokenKind::ConstInt {
            let tok = self.peek().clone();
            return Err(Self::error_at(&tok, format!("expected integer value for 'Code', got {}", tok.kind)));
        }

        match self.parse_value()? {
            Value::Int(v) => error.code = Some(v.value),
            _ => {
                let tok = self.peek().clone();
                return Err(Self::error_at(&tok, "integer value for 'Code' is out of range"));
            }
        }

        Ok(())
    }

    fn parse_custom_error_http_status(&mut self, error: &mut CustomError) -> Result<(), VelaError> {
        if error.http_status.is_some() {
            let tok = self.peek().clone();
            return Err(Self::error_at(&tok, "HttpStatus is already defined in custom error"));
        }

        self.next(); // skip 'HttpStatus'
        self.expect(TokenKind::Assign, "'=' after 'HttpStatus'")?;

        if self.peek().kind != TokenKind::Identifier {
            let tok = self.peek().clone();
            return Err(Self::error_at(
                &tok,
                format!("expected an HTTP status name for 'HttpStatus', e.g. NotFound, got {}", tok.kind),
            ));
        }

        let status_tok = self.next();
        let status = crate::http::status_code(&status_tok.value).ok_or_else(|| {
            Self::error_at(
                &status_tok,
                format!("unexpected http status value {}", quote(&status_tok.value)),
            )
        })?;

        error.http_status = Some(status);

        Ok(())
    }

    fn parse_custom_error_msg(&mut self, error: &mut CustomError) -> Result<(), VelaError> {
        if error.msg.is_some() {
            let tok = self.peek().clone();
            return Err(Self::error_at(&tok, "Msg is already defined in custom error"));
        }

        self.next(); // skip 'Msg'
        self.expect(TokenKind::Assign, "'=' after 'Msg'")?;

        match self.parse_value()? {
            Value::String(msg) => error.msg = Some(msg),
            _ => {
                let tok = self.peek().clone();
                return Err(Self::error_at(&tok, "expected string value for 'Msg'"));
            }
        }

        Ok(())
    }

    //
    // Value
    //

    fn parse_value(&mut self) -> Result<Value, VelaError> {
        match self.peek().kind {
            TokenKind::ConstBytes => {
                let token = self.next();
                let clean = token.value.replace('_', "");
                let (magnitude, scale) = split_byte_size(&clean);
                let value = parse_int(magnitude).ok_or_else(|| {
                    Self::error_at(&token, format!("failed to parse byte size value {}", quote(&token.value)))
                })?;
                Ok(Value::ByteSize(ValueByteSize { token, value, scale }))
            }
            TokenKind::ConstDuration => {
                let token = self.next();
                let clean = token.value.replace('_', "");
                let (magnitude, scale) = split_duration(&clean);
                let value = parse_int(magnitude).ok_or_else(|| {
                    Self::error_at(&token, format!("failed to parse duration value {}", quote(&token.value)))
                })?;
                Ok(Value::Duration(ValueDuration { token, value, scale }))
            }
            TokenKind::ConstFloat => {
                let token = self.next();
                let clean = token.value.replace('_', "");
                let value: f64 = clean.parse().map_err(|_| {
                    Self::error_at(&token, format!("failed to parse float value {}", quote(&token.value)))
                })?;
                let size = float_size(value);
                Ok(Value::Float(ValueFloat { token, value, size }))
            }
            TokenKind::ConstInt => {
                let token = self.next();
                let clean = token.value.replace('_', "");
                if let Some(value) = parse_int(&clean) {
                    Ok(Value::Int(ValueInt {
                        token:   Some(token),
                        value,
                        size:    int_size(value, value),
                        defined: true,
                    }))
                } else if let Some(value) = parse_uint(&clean) {
                    let size = uint_size(value);
                    Ok(Value::Uint(ValueUint { token, value, size }))
                } else {
                    Err(Self::error_at(&token, format!("failed to parse integer value {}", quote(&token.value))))
                }
            }
            TokenKind::ConstBool => {
                let token = self.next();
                let value = token.value == "true";
                Ok(Value::Bool(ValueBool {
                    token:        Some(token),
                    value,
                    user_defined: true,
                }))
            }
            TokenKind::ConstNull => Ok(Value::Null(ValueNull { token: self.next() })),
            TokenKind::ConstStringSingleQuote
            | TokenKind::ConstStringDoubleQuote
            | TokenKind::ConstStringBacktickQuote => {
                let token = self.next();
                let value = token.value.clone();
                Ok(Value::String(ValueString { token, value }))
            }
            TokenKind::Identifier => Ok(Value::Variable(ValueVariable { token: self.next() })),
            _ => {
                let tok = self.peek().clone();
                Err(Self::error_at(
                    &tok,
                    format!(
                        "expected int, float, bool, null, string, duration, byte size or identifier, got {}",
                        tok.kind
                    ),
                ))
            }
        }
    }
}

fn type_bits(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::Int8 | TokenKind::Uint8 => 8,
        TokenKind::Int16 | TokenKind::Uint16 => 16,
        TokenKind::Int32 | TokenKind::Uint32 | TokenKind::Float32 => 32,
        _ => 64,
    }
}

/// Parse an integer lexeme with underscores already removed; honors an
/// optional sign and a `0x`/`0X` prefix.
fn parse_int(s: &str) -> Option<i64> {
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };

    Some(if negative { -value } else { value })
}

fn parse_uint(s: &str) -> Option<u64> {
    let digits = s.strip_prefix('+').unwrap_or(s);
    match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => digits.parse::<u64>().ok(),
    }
}

fn split_byte_size(value: &str) -> (&str, ByteSizeScale) {
    let bytes = value.as_bytes();
    let scale = match bytes[bytes.len() - 2] {
        b'k' => ByteSizeScale::Kilobyte,
        b'm' => ByteSizeScale::Megabyte,
        b'g' => ByteSizeScale::Gigabyte,
        b't' => ByteSizeScale::Terabyte,
        b'p' => ByteSizeScale::Petabyte,
        b'e' => ByteSizeScale::Exabyte,
        _ => return (&value[..value.len() - 1], ByteSizeScale::Byte),
    };
    (&value[..value.len() - 2], scale)
}

fn split_duration(value: &str) -> (&str, DurationScale) {
    let bytes = value.as_bytes();
    match bytes[bytes.len() - 2] {
        b'n' => (&value[..value.len() - 2], DurationScale::Nanosecond),
        b'u' => (&value[..value.len() - 2], DurationScale::Microsecond),
        b'm' => (&value[..value.len() - 2], DurationScale::Millisecond),
        _ => {
            let scale = match bytes[bytes.len() - 1] {
                b's' => DurationScale::Second,
                b'm' => DurationScale::Minute,
                _ => DurationScale::Hour,
            };
            (&value[..value.len() - 1], scale)
        }
    }
}

// 8:  -128 ..= 127
// 16: -32768 ..= 32767
// 32: -2147483648 ..= 2147483647
// 64: everything else
fn int_size(min: i64, max: i64) -> u8 {
    if min >= i64::from(i8::MIN) && max <= i64::from(i8::MAX) {
        8
    } else if min >= i64::from(i16::MIN) && max <= i64::from(i16::MAX) {
        16
    } else if min >= i64::from(i32::MIN) && max <= i64::from(i32::MAX) {
        32
    } else {
        64
    }
}

fn uint_size(value: u64) -> u8 {
    if value <= u64::from(u8::MAX) {
        8
    } else if value <= u64::from(u16::MAX) {
        16
    } else if value <= u64::from(u32::MAX) {
        32
    } else {
        64
    }
}

fn float_size(value: f64) -> u8 {
    if value >= f64::from(f32::MIN_POSITIVE) && value <= f64::from(f32::MAX) {
        32
    } else {
        64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_doc(input: &str) -> Document {
        Parser::new(input).parse_document().expect("parse failed")
    }

    fn reformat(input: &str) -> String {
        parse_doc(input).to_string()
    }

    #[test]
    fn test_parse_const_round_trip() {
        for input in [
            "const A = true",
            "const B = false",
            "const C = \"hello\"",
            "const D = 123",
            "const E = 123.456",
            "const F = 123.456e-78",
            "const G = 123.456e+78",
            "const H = null",
            "const I = NewId",
            "const J = 1ns",
            "const K = 1us",
            "const L = 1ms",
            "const M = 1s",
            "const N = 1m",
            "const O = 1h",
            "const P = 1b",
            "const Q = 1kb",
            "const R = 1mb",
            "const S = 1gb",
            "const T = 1tb",
            "const U = 1pb",
            "const V = 1eb",
            "const W = 'single'",
            "const X = `backtick`",
            "const Y = 1_200kb",
            "const Z = 100h",
        ] {
            assert_eq!(reformat(input), input);
        }
    }

    #[test]
    fn test_parse_const_values() {
        let doc = parse_doc("const Timeout = 5s\nconst MaxBody = 2mb\nconst Big = 0x1F");

        match &doc.consts[0].value {
            Value::Duration(v) => {
                assert_eq!(v.value, 5);
                assert_eq!(v.scale, DurationScale::Second);
            }
            other => panic!("expected duration, got {:?}", other),
        }

        match &doc.consts[1].value {
            Value::ByteSize(v) => {
                assert_eq!(v.value, 2);
                assert_eq!(v.scale, ByteSizeScale::Megabyte);
            }
            other => panic!("expected byte size, got {:?}", other),
        }

        match &doc.consts[2].value {
            Value::Int(v) => assert_eq!(v.value, 31),
            other => panic!("expected int, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_huge_int_becomes_uint() {
        let doc = parse_doc("const Huge = 9223372036854775808");
        match &doc.consts[0].value {
            Value::Uint(v) => {
                assert_eq!(v.value, 9223372036854775808);
                assert_eq!(v.size, 64);
            }
            other => panic!("expected uint, got {:?}", other),
        }
    }

    #[test]
    fn test_enum_auto_increment() {
        let doc = parse_doc("enum E {\n    A = 5\n    B\n    C = 2\n    D\n}");
        let sets = &doc.enums[0].sets;
        let values: Vec<i64> = sets.iter().map(|s| s.value.value).collect();
        assert_eq!(values, vec![5, 6, 2, 3]);
        assert!(sets[0].defined);
        assert!(!sets[1].defined);
    }

    #[test]
    fn test_enum_size_inference() {
        let cases = [
            ("enum A {\n    X\n    Y\n    Z\n}", 8),
            ("enum B {\n    X = -1\n    Y = 0\n    Z = 200\n}", 16),
            ("enum C {\n    X = 70000\n}", 32),
            ("enum D {\n    X = 5000000000\n}", 64),
        ];
        for (input, size) in cases {
            let doc = parse_doc(input);
            let enum_ = &doc.enums[0];
            assert_eq!(enum_.size, size, "input {:?}", input);
            for set in &enum_.sets {
                assert_eq!(set.value.size, size);
            }
        }
    }

    #[test]
    fn test_enum_wildcard_sets() {
        let doc = parse_doc("enum E {\n    _\n    A\n    _\n}");
        assert_eq!(doc.enums[0].sets.len(), 3);
        let values: Vec<i64> = doc.enums[0].sets.iter().map(|s| s.value.value).collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[test]
    fn test_parse_model_end_to_end() {
        let doc = parse_doc("model User {\n    Id: int64\n    Name?: string\n}");
        assert_eq!(doc.models.len(), 1);

        let model = &doc.models[0];
        assert_eq!(model.name.token.value, "User");
        assert_eq!(model.fields.len(), 2);

        let id = &model.fields[0];
        assert_eq!(id.name.token.value, "Id");
        assert!(!id.is_optional);
        assert!(matches!(id.typ, Type::Int { size: 64, .. }));

        let name = &model.fields[1];
        assert_eq!(name.name.token.value, "Name");
        assert!(name.is_optional);
        assert!(matches!(name.typ, Type::String { .. }));
    }

    #[test]
    fn test_parse_model_extends_and_options() {
        let input = "model Account {\n    ...Base\n    Email: string {\n        Required\n        MaxBytes = 1kb\n    }\n    Tags: []string\n    Meta: map<string, any>\n}";
        let doc = parse_doc(input);

        let model = &doc.models[0];
        assert_eq!(model.extends.len(), 1);
        assert_eq!(model.extends[0].name.token.value, "Base");

        let email = &model.fields[0];
        assert_eq!(email.options.list.len(), 2);
        assert_eq!(email.options.list[0].name.token.value, "Required");
        assert!(matches!(
            email.options.list[0].value,
            Value::Bool(ValueBool { token: None, value: true, .. })
        ));

        assert!(matches!(model.fields[1].typ, Type::Array { .. }));
        assert!(matches!(model.fields[2].typ, Type::Map { .. }));

        assert_eq!(reformat(input), input);
    }

    #[test]
    fn test_parse_service_method_kinds() {
        let input = "service Accounts {\n    rpc Create (name: string) => (id: int64)\n    http Fetch (id: int64) => (account: Account)\n    rpc, http Remove (id: int64)\n}";
        let doc = parse_doc(input);

        let methods = &doc.services[0].methods;
        assert_eq!(methods.len(), 3);
        assert_eq!(methods[0].kind, MethodKind::Rpc);
        assert_eq!(methods[1].kind, MethodKind::Http);
        assert_eq!(methods[2].kind, MethodKind::RpcHttp);

        assert_eq!(reformat(input), input);
    }

    #[test]
    fn test_parse_service_mixed_kind_either_order() {
        let doc = parse_doc("service S {\n    http, rpc Ping ()\n}");
        assert_eq!(doc.services[0].methods[0].kind, MethodKind::RpcHttp);
        // normalized on output
        assert_eq!(doc.to_string(), "service S {\n    rpc, http Ping ()\n}");
    }

    #[test]
    fn test_parse_service_streams() {
        let input = "service Files {\n    http Upload (chunk: stream file) => (ok: bool)\n    http Download (assetId: string) => (chunk: stream []byte)\n}";
        let doc = parse_doc(input);

        let methods = &doc.services[0].methods;
        assert!(methods[0].args[0].stream);
        assert!(matches!(methods[0].args[0].typ, Type::File { .. }));
        assert!(methods[1].returns[0].stream);
        assert!(matches!(methods[1].returns[0].typ, Type::Array { .. }));

        assert_eq!(reformat(input), input);
    }

    #[test]
    fn test_parse_method_options() {
        let input = "service Jobs {\n    rpc Run (name: string) => (id: int64) {\n        Timeout = 5m\n        MaxBody = 1mb\n    }\n}";
        let doc = parse_doc(input);

        let options = &doc.services[0].methods[0].options;
        assert_eq!(options.list.len(), 2);
        assert_eq!(options.list[0].name.token.value, "Timeout");

        assert_eq!(reformat(input), input);
    }

    #[test]
    fn test_parse_custom_error() {
        let input = "error ErrUserNotFound { Code = 1000 HttpStatus = NotFound Msg = \"user not found\" }";
        let doc = parse_doc(input);

        let error = &doc.errors[0];
        assert_eq!(error.code, Some(1000));
        assert_eq!(error.http_status, Some(404));
        assert_eq!(error.msg.as_ref().unwrap().value, "user not found");

        assert_eq!(reformat(input), input);
    }

    #[test]
    fn test_parse_custom_error_without_code() {
        let input = "error ErrTooBusy { HttpStatus = ServiceUnavailable Msg = `try again later` }";
        let doc = parse_doc(input);

        assert_eq!(doc.errors[0].code, None);
        assert_eq!(reformat(input), input);
    }

    #[test]
    fn test_parse_custom_error_requires_msg() {
        let err = Parser::new("error ErrNope { Code = 1 }")
            .parse_document()
            .unwrap_err();
        assert!(err.to_string().contains("Msg is not defined"), "{}", err);
    }

    #[test]
    fn test_parse_rejects_bad_casing() {
        for input in [
            "const lower = 1",
            "enum bad {}",
            "model bad {}",
            "model Ok {\n    lower: string\n}",
            "service bad {}",
            "service Ok {\n    rpc bad ()\n}",
            "service Ok {\n    rpc Call (BadArg: string)\n}",
            "service Ok {\n    rpc Call () => (BadRet: string)\n}",
        ] {
            assert!(
                Parser::new(input).parse_document().is_err(),
                "input {:?} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_parse_surfaces_lexical_error() {
        let err = Parser::new("const A = 1__2").parse_document().unwrap_err();
        assert!(
            err.to_string().contains("expected digit after each underscore"),
            "{}",
            err
        );
    }

    #[test]
    fn test_comment_attachment() {
        let input = "# top comment\nmodel Foo {\n    # field comment\n    Name: string\n    # bottom comment\n}";
        let doc = parse_doc(input);

        let model = &doc.models[0];
        assert_eq!(model.comments.len(), 2);
        assert_eq!(model.comments[0].position, CommentPosition::Top);
        assert_eq!(model.comments[1].position, CommentPosition::Bottom);
        assert_eq!(model.fields[0].comments.len(), 1);

        assert_eq!(reformat(input), input);
    }

    #[test]
    fn test_trailing_comments_belong_to_document() {
        let input = "const A = 1\n# trailing note";
        let doc = parse_doc(input);
        assert_eq!(doc.comments.len(), 1);
        assert_eq!(reformat(input), input);
    }

    #[test]
    fn test_empty_blocks_stay_compact() {
        for input in ["enum Foo {}", "model Foo {}", "service Foo {}"] {
            assert_eq!(reformat(input), input);
        }
        assert_eq!(reformat("enum Foo {\n\n}"), "enum Foo {}");
    }

    #[test]
    fn test_format_is_idempotent() {
        let input = r#"# tuning knobs
const Version = "1.0.0"
const Timeout = 30s
const Retries = 3

enum Status {
    Active = 1
    Inactive
    _
}

model Base {
    Id: int64
    CreatedAt: timestamp
}

# a user of the system
model User {
    ...Base
    Email: string {
        Required
        Pattern = '^.+@.+$'
    }
    Age?: uint8
    Labels: map<string, string>
}

service Users {
    rpc Create (email: string, age: uint8) => (user: User)
    http Search (query: string) => (users: stream User) {
        Timeout = Timeout
    }
    rpc, http Delete (id: int64)
}

error ErrUserNotFound { Code = 1000 HttpStatus = NotFound Msg = "user not found" }
error ErrEmailTaken { HttpStatus = Conflict Msg = "email is already registered" }"#;

        let once = reformat(input);
        let twice = reformat(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_document_section_separators() {
        let doc = parse_doc("const A = 1\nenum E {\n    X\n}\nmodel M {}\nservice S {}\nerror ErrX { HttpStatus = Gone Msg = \"x\" }");
        let out = doc.to_string();
        assert_eq!(
            out,
            "const A = 1\n\nenum E {\n    X\n}\n\nmodel M {}\n\nservice S {}\n\nerror ErrX { HttpStatus = Gone Msg = \"x\" }"
        );
    }

    #[test]
    fn test_map_key_must_be_comparable() {
        let err = Parser::new("model M {\n    X: map<float32, string>\n}")
            .parse_document()
            .unwrap_err();
        assert!(err.to_string().contains("comparable"), "{}", err);
    }

    #[test]
    fn test_multi_file_parse() {
        use std::fs;

        let dir = std::env::temp_dir().join(format!("vela-parser-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let first = dir.join("a.vela");
        let second = dir.join("b.vela");
        fs::write(&first, "model A {\n    Id: int64\n}\n").unwrap();
        fs::write(&second, "model B {\n    A: A\n}\n").unwrap();

        let doc = Parser::from_files(&[first, second]).parse_document().unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(doc.models.len(), 2);
        assert_eq!(doc.models[0].name.token.value, "A");
        assert_eq!(doc.models[1].name.token.value, "B");
        assert!(doc.models[1].token.filename.is_some());
    }
}
