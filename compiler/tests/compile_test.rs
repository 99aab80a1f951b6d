use vela_compiler::ast::{MethodKind, Type, Value};
use vela_compiler::{compile_files, compile_source, Parser};

const SCHEMA: &str = r#"# service wide limits
const MaxUploadSize = 25mb
const DefaultTimeout = 30s
const SlowTimeout = DefaultTimeout

enum Role {
    Unknown
    Member = 10
    Admin
}

model Base {
    Id: int64
    CreatedAt: timestamp
}

model User {
    ...Base
    Email: string {
        Required
    }
    Role: Role
    Age?: uint8
    Tags: []string
    Settings: map<string, any>
}

service Users {
    rpc Create (email: string, role: Role) => (user: User)
    http Avatar (userId: int64) => (image: stream []byte) {
        Timeout = SlowTimeout
    }
    rpc, http Delete (userId: int64) => (ok: bool)
}

service Files {
    http Upload (name: string, content: stream file) => (id: string) {
        MaxSize = MaxUploadSize
    }
}

error ErrUserNotFound { Code = 1000 HttpStatus = NotFound Msg = "user not found" }
error ErrAccessDenied { Code = 1001 HttpStatus = Forbidden Msg = "access denied" }
error ErrUploadTooLarge { HttpStatus = RequestEntityTooLarge Msg = `upload exceeds the size limit` }"#;

#[test]
fn test_compile_full_schema() {
    let doc = compile_source(SCHEMA).expect("compile failed");

    // constant indirection resolved down to the literal
    match &doc.consts[2].value {
        Value::Duration(v) => assert_eq!(v.value, 30),
        other => panic!("expected duration, got {:?}", other),
    }

    // enum values and inferred width
    let role = &doc.enums[0];
    let values: Vec<i64> = role.sets.iter().map(|s| s.value.value).collect();
    assert_eq!(values, vec![0, 10, 11]);
    assert_eq!(role.size, 8);

    // models keep their declared shape
    let user = &doc.models[1];
    assert_eq!(user.extends[0].name.token.value, "Base");
    assert_eq!(user.fields.len(), 5);
    assert!(matches!(user.fields[1].typ, Type::Custom { .. }));

    // method kinds and streaming
    let users = &doc.services[0];
    assert_eq!(users.methods[0].kind, MethodKind::Rpc);
    assert_eq!(users.methods[1].kind, MethodKind::Http);
    assert_eq!(users.methods[2].kind, MethodKind::RpcHttp);
    assert!(users.methods[1].returns[0].stream);

    let upload = &doc.services[1].methods[0];
    assert!(upload.args[1].stream);
    assert!(matches!(upload.args[1].typ, Type::File { .. }));

    // option values resolved through constants
    match &upload.options.list[0].value {
        Value::ByteSize(v) => assert_eq!(v.value, 25),
        other => panic!("expected byte size, got {:?}", other),
    }

    // explicit codes kept, the unset one continues the running max
    let code = |name: &str| {
        doc.errors
            .iter()
            .find(|e| e.name.token.value == name)
            .and_then(|e| e.code)
    };
    assert_eq!(code("ErrUserNotFound"), Some(1000));
    assert_eq!(code("ErrAccessDenied"), Some(1001));
    assert_eq!(code("ErrUploadTooLarge"), Some(1002));
}

#[test]
fn test_format_round_trip_is_stable() {
    let once = Parser::new(SCHEMA)
        .parse_document()
        .expect("parse failed")
        .to_string();
    let twice = Parser::new(once.as_str())
        .parse_document()
        .expect("reparse failed")
        .to_string();
    assert_eq!(once, twice);
}

#[test]
fn test_minimal_document_compiles_alone() {
    let doc = compile_source("model User {\n    Id: int64\n    Name?: string\n}").expect("compile failed");

    assert!(doc.consts.is_empty());
    assert!(doc.services.is_empty());
    assert!(doc.errors.is_empty());
    assert_eq!(
        doc.to_string(),
        "model User {\n    Id: int64\n    Name?: string\n}"
    );
}

#[test]
fn test_compile_files_merges_sources() {
    use std::fs;

    let dir = std::env::temp_dir().join(format!("vela-compile-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let models = dir.join("models.vela");
    let services = dir.join("services.vela");
    fs::write(&models, "model Ping {\n    At: timestamp\n}\n").unwrap();
    fs::write(&services, "service Health {\n    rpc Ping () => (pong: Ping)\n}\n").unwrap();

    let doc = compile_files(&[models, services]).expect("compile failed");
    fs::remove_dir_all(&dir).unwrap();

    assert_eq!(doc.models.len(), 1);
    assert_eq!(doc.services.len(), 1);
}

#[test]
fn test_compile_rejects_cross_file_duplicates() {
    use std::fs;

    let dir = std::env::temp_dir().join(format!("vela-compile-dup-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let first = dir.join("a.vela");
    let second = dir.join("b.vela");
    fs::write(&first, "model User {\n    Id: int64\n}\n").unwrap();
    fs::write(&second, "model User {\n    Email: string\n}\n").unwrap();

    let err = compile_files(&[first, second]).unwrap_err();
    fs::remove_dir_all(&dir).unwrap();

    assert!(err.to_string().contains("name is already used"), "{}", err);
}
