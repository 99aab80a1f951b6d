use std::collections::{HashMap, HashSet};

use crate::ast::*;
use crate::error::VelaError;
use crate::http;
use crate::strcase;

// Checks the following, in order, failing on the first violation:
// - all names follow their casing convention (the parser already enforces
//   this per file; re-checked here over the merged set)
// - consts, enums, models and services share one namespace with no duplicates
// - nested names are unique (enum sets, model fields, options, methods,
//   arguments and returns)
// - every constant reference resolves to a literal, with cycles rejected
// - every custom type reference names a declared model or enum
// - custom error codes are unique, assigned when missing, and every error
//   carries a known HTTP status

/// Validate the merged set of parsed documents. Constant references are
/// resolved in place and missing error codes are assigned, so a document
/// that passes is ready for code generation.
pub fn validate(docs: &mut [Document]) -> Result<(), VelaError> {
    check_naming(docs)?;
    check_duplicates(docs)?;
    resolve_consts(docs)?;
    check_custom_types(docs)?;
    finalize_custom_errors(docs)?;
    Ok(())
}

fn check_naming(docs: &[Document]) -> Result<(), VelaError> {
    for doc in docs {
        for c in &doc.consts {
            if !strcase::is_pascal(&c.name.token.value) {
                return Err(VelaError::validate(&c.name.token, "name should be PascalCase"));
            }
        }

        for e in &doc.enums {
            if !strcase::is_pascal(&e.name.token.value) {
                return Err(VelaError::validate(&e.name.token, "name should be PascalCase"));
            }
            for set in &e.sets {
                if set.name.token.value == "_" {
                    continue;
                }
                if !strcase::is_pascal(&set.name.token.value) {
                    return Err(VelaError::validate(&set.name.token, "name should be PascalCase"));
                }
            }
        }

        for m in &doc.models {
            if !strcase::is_pascal(&m.name.token.value) {
                return Err(VelaError::validate(&m.name.token, "name should be PascalCase"));
            }
            for f in &m.fields {
                if !strcase::is_pascal(&f.name.token.value) {
                    return Err(VelaError::validate(&f.name.token, "name should be PascalCase"));
                }
                for o in &f.options.list {
                    if !strcase::is_pascal(&o.name.token.value) {
                        return Err(VelaError::validate(&o.name.token, "name should be PascalCase"));
                    }
                }
            }
        }

        for s in &doc.services {
            if !strcase::is_pascal(&s.name.token.value) {
                return Err(VelaError::validate(&s.name.token, "name should be PascalCase"));
            }
            for m in &s.methods {
                if !strcase::is_pascal(&m.name.token.value) {
                    return Err(VelaError::validate(&m.name.token, "name should be PascalCase"));
                }
                for a in &m.args {
                    if !strcase::is_camel(&a.name.token.value) {
                        return Err(VelaError::validate(&a.name.token, "name should be camelCase"));
                    }
                }
                for r in &m.returns {
                    if !strcase::is_camel(&r.name.token.value) {
                        return Err(VelaError::validate(&r.name.token, "name should be camelCase"));
                    }
                }
                for o in &m.options.list {
                    if !strcase::is_pascal(&o.name.token.value) {
                        return Err(VelaError::validate(&o.name.token, "name should be PascalCase"));
                    }
                }
            }
        }
    }

    Ok(())
}

fn check_duplicates(docs: &[Document]) -> Result<(), VelaError> {
    // consts, enums, models and services live in one namespace
    let mut names: HashSet<&str> = HashSet::new();

    for doc in docs {
        for c in &doc.consts {
            if !names.insert(&c.name.token.value) {
                return Err(VelaError::validate(&c.name.token, "name is already used"));
            }
        }
    }

    for doc in docs {
        for e in &doc.enums {
            if !names.insert(&e.name.token.value) {
                return Err(VelaError::validate(&e.name.token, "name is already used"));
            }

            let mut keys: HashSet<&str> = HashSet::new();
            for set in &e.sets {
                if set.name.token.value == "_" {
                    continue;
                }
                if !keys.insert(&set.name.token.value) {
                    return Err(VelaError::validate(&set.name.token, "key is already used in the same enum"));
                }
            }
        }
    }

    for doc in docs {
        for m in &doc.models {
            if !names.insert(&m.name.token.value) {
                return Err(VelaError::validate(&m.name.token, "name is already used"));
            }

            let mut fields: HashSet<&str> = HashSet::new();
            for f in &m.fields {
                if !fields.insert(&f.name.token.value) {
                    return Err(VelaError::validate(&f.name.token, "field name is already used in the same model"));
                }

                let mut options: HashSet<&str> = HashSet::new();
                for o in &f.options.list {
                    if !options.insert(&o.name.token.value) {
                        return Err(VelaError::validate(&o.name.token, "option name is already used in the same field"));
                    }
                }
            }
        }
    }

    for doc in docs {
        for s in &doc.services {
            if !names.insert(&s.name.token.value) {
                return Err(VelaError::validate(&s.name.token, "name is already used"));
            }

            let mut methods: HashSet<&str> = HashSet::new();
            for m in &s.methods {
                if !methods.insert(&m.name.token.value) {
                    return Err(VelaError::validate(&m.name.token, "method name is already used in the same service"));
                }

                let mut args: HashSet<&str> = HashSet::new();
                for a in &m.args {
                    if !args.insert(&a.name.token.value) {
                        return Err(VelaError::validate(&a.name.token, "argument name is already used in the same method"));
                    }
                }

                let mut returns: HashSet<&str> = HashSet::new();
                for r in &m.returns {
                    if !returns.insert(&r.name.token.value) {
                        return Err(VelaError::validate(&r.name.token, "return name is already used in the same method"));
                    }
                    if args.contains(r.name.token.value.as_str()) {
                        return Err(VelaError::validate(
                            &r.name.token,
                            "return name is already used in the same method as argument",
                        ));
                    }
                }

                let mut options: HashSet<&str> = HashSet::new();
                for o in &m.options.list {
                    if !options.insert(&o.name.token.value) {
                        return Err(VelaError::validate(&o.name.token, "option name is already used in the same method"));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Follow a chain of constant references down to a literal. `seen` guards
/// against `const A = B` / `const B = A` style cycles.
fn resolve_value(table: &HashMap<String, Value>, variable: &ValueVariable) -> Result<Value, VelaError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut name: &str = &variable.token.value;

    loop {
        if !seen.insert(name) {
            return Err(VelaError::validate(&variable.token, "constant reference cycle detected"));
        }

        match table.get(name) {
            None => return Err(VelaError::validate(&variable.token, "unknown constant reference")),
            Some(Value::Variable(next)) => name = &next.token.value,
            Some(value) => return Ok(value.clone()),
        }
    }
}

fn resolve_in_place(table: &HashMap<String, Value>, slot: &mut Value) -> Result<(), VelaError> {
    let resolved = match slot {
        Value::Variable(variable) => Some(resolve_value(table, variable)?),
        _ => None,
    };
    if let Some(value) = resolved {
        *slot = value;
    }
    Ok(())
}

fn resolve_consts(docs: &mut [Document]) -> Result<(), VelaError> {
    let mut table: HashMap<String, Value> = HashMap::new();
    for doc in docs.iter() {
        for c in &doc.consts {
            table.insert(c.name.token.value.clone(), c.value.clone());
        }
    }

    for doc in docs.iter_mut() {
        for c in doc.consts.iter_mut() {
            resolve_in_place(&table, &mut c.value)?;
        }

        for m in doc.models.iter_mut() {
            for f in m.fields.iter_mut() {
                for o in f.options.list.iter_mut() {
                    resolve_in_place(&table, &mut o.value)?;
                }
            }
        }

        for s in doc.services.iter_mut() {
            for m in s.methods.iter_mut() {
                for o in m.options.list.iter_mut() {
                    resolve_in_place(&table, &mut o.value)?;
                }
            }
        }
    }

    Ok(())
}

fn check_custom_types(docs: &[Document]) -> Result<(), VelaError> {
    let mut types: HashSet<&str> = HashSet::new();
    for doc in docs {
        for m in &doc.models {
            types.insert(&m.name.token.value);
        }
        for e in &doc.enums {
            types.insert(&e.name.token.value);
        }
    }

    for doc in docs {
        for m in &doc.models {
            for f in &m.fields {
                check_type_exists(&types, &f.typ)?;
            }
        }

        for s in &doc.services {
            for m in &s.methods {
                for a in &m.args {
                    check_type_exists(&types, &a.typ)?;
                }
                for r in &m.returns {
                    check_type_exists(&types, &r.typ)?;
                }
            }
        }
    }

    Ok(())
}

fn check_type_exists(types: &HashSet<&str>, typ: &Type) -> Result<(), VelaError> {
    match typ {
        Type::Map { value, .. } => check_type_exists(types, value),
        Type::Array { elem, .. } => check_type_exists(types, elem),
        Type::Custom { token } => {
            if !types.contains(token.value.as_str()) {
                return Err(VelaError::validate(token, "type is not defined"));
            }
            Ok(())
        }
        // scalar kinds were settled by the parser
        _ => Ok(()),
    }
}

fn finalize_custom_errors(docs: &mut [Document]) -> Result<(), VelaError> {
    let mut errors: Vec<&mut CustomError> =
        docs.iter_mut().flat_map(|doc| doc.errors.iter_mut()).collect();

    // name order keeps code assignment independent of file order
    errors.sort_by(|a, b| a.name.token.value.cmp(&b.name.token.value));

    let mut reserved: HashSet<i64> = HashSet::new();
    let mut max_code: i64 = 0;

    for e in errors.iter() {
        if let Some(code) = e.code {
            if !reserved.insert(code) {
                return Err(VelaError::validate(&e.token, "code is already used"));
            }
            max_code = max_code.max(code);
        }
    }

    for e in errors.iter_mut() {
        if e.code.is_none() {
            max_code += 1;
            e.code = Some(max_code);
        }
    }

    for e in errors.iter() {
        let valid = matches!(e.http_status, Some(status) if http::status_name(status).is_some());
        if !valid {
            return Err(VelaError::validate(&e.token, "http status is not valid in custom error"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn parse(input: &str) -> Document {
        Parser::new(input).parse_document().expect("parse failed")
    }

    fn validate_source(input: &str) -> Result<Document, VelaError> {
        let mut doc = parse(input);
        validate(std::slice::from_mut(&mut doc))?;
        Ok(doc)
    }

    #[test]
    fn test_validate_minimal_model() {
        let doc = validate_source("model User {\n    Id: int64\n    Name?: string\n}").unwrap();
        assert_eq!(doc.models.len(), 1);
    }

    #[test]
    fn test_duplicate_model_across_documents() {
        let mut docs = vec![
            parse("model User {\n    Id: int64\n}"),
            parse("model User {\n    Email: string\n}"),
        ];
        let err = validate(&mut docs).unwrap_err();
        assert!(err.to_string().contains("name is already used"), "{}", err);
    }

    #[test]
    fn test_duplicate_across_kinds() {
        let err = validate_source("const Thing = 1\nmodel Thing {}").unwrap_err();
        assert!(err.to_string().contains("name is already used"), "{}", err);
    }

    #[test]
    fn test_wildcard_enum_sets_are_exempt() {
        validate_source("enum E {\n    _\n    A\n    _\n}").unwrap();
    }

    #[test]
    fn test_duplicate_enum_set_rejected() {
        let err = validate_source("enum E {\n    A\n    A\n}").unwrap_err();
        assert!(err.to_string().contains("key is already used"), "{}", err);
    }

    #[test]
    fn test_const_indirection_resolves_to_literal() {
        let doc = validate_source("const A = 1\nconst B = A\nconst C = B").unwrap();

        match &doc.consts[2].value {
            Value::Int(v) => assert_eq!(v.value, 1),
            other => panic!("expected int, got {:?}", other),
        }
        // the resolved value formats as the original literal
        assert!(doc.to_string().contains("const C = 1"));
    }

    #[test]
    fn test_const_cycle_rejected() {
        let err = validate_source("const A = B\nconst B = A").unwrap_err();
        assert!(err.to_string().contains("cycle"), "{}", err);
    }

    #[test]
    fn test_unknown_const_rejected() {
        let err = validate_source("const A = Missing").unwrap_err();
        assert!(err.to_string().contains("unknown constant"), "{}", err);
    }

    #[test]
    fn test_option_values_resolve_through_consts() {
        let doc = validate_source(
            "const MaxBody = 2mb\nservice Files {\n    http Upload (chunk: stream file) {\n        Limit = MaxBody\n    }\n}",
        )
        .unwrap();

        match &doc.services[0].methods[0].options.list[0].value {
            Value::ByteSize(v) => assert_eq!(v.value, 2),
            other => panic!("expected byte size, got {:?}", other),
        }
    }

    #[test]
    fn test_undefined_custom_type_rejected() {
        let err = validate_source("model A {\n    B: Missing\n}").unwrap_err();
        assert!(err.to_string().contains("type is not defined"), "{}", err);
    }

    #[test]
    fn test_custom_type_through_wrappers() {
        validate_source("enum Kind {\n    A\n}\nmodel Holder {\n    Kinds: []Kind\n    ByName: map<string, Kind>\n}").unwrap();

        let err = validate_source("model Holder {\n    Bad: []Missing\n}").unwrap_err();
        assert!(err.to_string().contains("type is not defined"), "{}", err);
    }

    #[test]
    fn test_return_may_not_reuse_argument_name() {
        let err = validate_source("service S {\n    rpc Echo (value: string) => (value: string)\n}").unwrap_err();
        assert!(err.to_string().contains("as argument"), "{}", err);
    }

    #[test]
    fn test_error_code_assignment() {
        let doc = validate_source(
            "error ErrA { Code = 10 HttpStatus = BadRequest Msg = \"a\" }\n\
             error ErrB { Code = 5 HttpStatus = BadRequest Msg = \"b\" }\n\
             error ErrC { HttpStatus = BadRequest Msg = \"c\" }",
        )
        .unwrap();

        let code = |name: &str| {
            doc.errors
                .iter()
                .find(|e| e.name.token.value == name)
                .and_then(|e| e.code)
        };
        assert_eq!(code("ErrA"), Some(10));
        assert_eq!(code("ErrB"), Some(5));
        assert_eq!(code("ErrC"), Some(11));
    }

    #[test]
    fn test_error_code_assignment_is_stable() {
        let mut doc = validate_source(
            "error ErrA { Code = 10 HttpStatus = BadRequest Msg = \"a\" }\n\
             error ErrB { HttpStatus = BadRequest Msg = \"b\" }",
        )
        .unwrap();

        let before: Vec<Option<i64>> = doc.errors.iter().map(|e| e.code).collect();
        validate(std::slice::from_mut(&mut doc)).unwrap();
        let after: Vec<Option<i64>> = doc.errors.iter().map(|e| e.code).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_duplicate_error_code_rejected() {
        let err = validate_source(
            "error ErrA { Code = 7 HttpStatus = BadRequest Msg = \"a\" }\n\
             error ErrB { Code = 7 HttpStatus = BadRequest Msg = \"b\" }",
        )
        .unwrap_err();
        assert!(err.to_string().contains("code is already used"), "{}", err);
    }

    #[test]
    fn test_error_requires_http_status() {
        let err = validate_source("error ErrA { Code = 1 Msg = \"a\" }").unwrap_err();
        assert!(err.to_string().contains("http status"), "{}", err);
    }

    #[test]
    fn test_merged_documents_share_namespace() {
        let mut docs = vec![
            parse("const Limit = 10"),
            parse("model Pager {\n    Limit: int32\n}"),
            parse("service Pages {\n    rpc List (page: int32) => (pagers: []Pager)\n}"),
        ];
        validate(&mut docs).unwrap();

        let merged = Document::merge(docs);
        assert_eq!(merged.consts.len(), 1);
        assert_eq!(merged.models.len(), 1);
        assert_eq!(merged.services.len(), 1);
    }
}
