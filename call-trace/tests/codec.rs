use std::collections::BTreeMap;
use std::fs;

use tempfile::TempDir;
use trace::call::CALL_FLAG_END_FRAME;
use trace::{Call, CodecError, Parser, Signature, Value, Writer};

fn sample_call(no: u64) -> Call {
    Call {
        no,
        thread_id: 1,
        flags: if no % 4 == 0 { CALL_FLAG_END_FRAME } else { 0 },
        sig: Signature {
            id: 81,
            name: String::from("IDirect3DTexture9::LockRect"),
        },
        args: vec![
            Value::Pointer(0x1000 + no),
            Value::UInt(0),
            Value::Array(vec![Value::Struct(vec![
                Value::UInt(64),
                Value::Pointer(0x9000),
            ])]),
            Value::Null,
            Value::SInt(-5),
            Value::String(String::from("hello")),
            Value::Blob(vec![0xde, 0xad]),
            Value::Bool(true),
            Value::Float(0.5),
        ],
    }
}

#[test]
fn header_and_calls_survive_a_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.trace");

    let mut properties = BTreeMap::new();
    properties.insert(String::from("application"), String::from("demo.exe"));
    properties.insert(String::from("api"), String::from("d3d9"));

    let mut writer = Writer::create(&path, 5, &properties).unwrap();
    for no in 1..=6 {
        writer.write_call(&sample_call(no)).unwrap();
    }
    writer.finish().unwrap();

    let mut parser = Parser::open(&path).unwrap();
    assert_eq!(parser.version(), 5);
    assert_eq!(parser.properties(), &properties);

    for no in 1..=6 {
        let call = parser.parse_call().unwrap().unwrap();
        assert_eq!(call, sample_call(no));
    }
    assert!(parser.parse_call().unwrap().is_none());
}

#[test]
fn bookmark_restores_the_exact_call_sequence() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rewind.trace");

    let mut writer = Writer::create(&path, 5, &BTreeMap::new()).unwrap();
    for no in 1..=4 {
        writer.write_call(&sample_call(no)).unwrap();
    }
    writer.finish().unwrap();

    let mut parser = Parser::open(&path).unwrap();
    let bookmark = parser.bookmark().unwrap();

    let first_pass: Vec<u64> = std::iter::from_fn(|| parser.parse_call().unwrap())
        .map(|call| call.no)
        .collect();
    assert_eq!(first_pass, vec![1, 2, 3, 4]);

    parser.set_bookmark(bookmark).unwrap();
    let second_pass: Vec<u64> = std::iter::from_fn(|| parser.parse_call().unwrap())
        .map(|call| call.no)
        .collect();
    assert_eq!(first_pass, second_pass);
}

#[test]
fn rejects_files_without_magic() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bogus.trace");
    fs::write(&path, b"not a trace file").unwrap();

    match Parser::open(&path) {
        Err(CodecError::BadMagic) => {}
        other => panic!("expected BadMagic, got {other:?}"),
    }
}

#[test]
fn truncated_record_is_an_error_not_eof() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cut.trace");

    let mut writer = Writer::create(&path, 5, &BTreeMap::new()).unwrap();
    writer.write_call(&sample_call(1)).unwrap();
    writer.finish().unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

    let mut parser = Parser::open(&path).unwrap();
    assert!(parser.parse_call().is_err());
}
