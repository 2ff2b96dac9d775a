use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use trace::call::CALL_FLAG_END_FRAME;
use trace::{Call, CallSet, Parser, Signature, Value, Writer};
use trim_tools::trim::{trim_trace, TrimError, TrimOptions};

const A8R8G8B8: i64 = 21;

fn call(no: u64, id: u32, name: &str, args: Vec<Value>) -> Call {
    Call {
        no,
        thread_id: 0,
        flags: 0,
        sig: Signature {
            id,
            name: String::from(name),
        },
        args,
    }
}

fn create_texture(no: u64, texture: u64) -> Call {
    call(
        no,
        219,
        "IDirect3DDevice9::CreateTexture",
        vec![
            Value::Pointer(0xd3d),
            Value::UInt(8),
            Value::UInt(8),
            Value::UInt(1),
            Value::UInt(0),
            Value::SInt(A8R8G8B8),
            Value::UInt(0),
            Value::Array(vec![Value::Pointer(texture)]),
            Value::Null,
        ],
    )
}

fn lock_rect(no: u64, texture: u64, bits: u64) -> Call {
    call(
        no,
        81,
        "IDirect3DTexture9::LockRect",
        vec![
            Value::Pointer(texture),
            Value::UInt(0),
            Value::Array(vec![Value::Struct(vec![
                Value::UInt(8),
                Value::Pointer(bits),
            ])]),
            Value::Null,
            Value::UInt(0),
        ],
    )
}

fn memcpy(no: u64, dest: u64, len: u64) -> Call {
    call(
        no,
        0,
        "memcpy",
        vec![
            Value::Pointer(dest),
            Value::UInt(len),
            Value::Blob(vec![0u8; len as usize]),
        ],
    )
}

fn unlock_rect(no: u64, texture: u64) -> Call {
    call(
        no,
        82,
        "IDirect3DTexture9::UnlockRect",
        vec![Value::Pointer(texture), Value::UInt(0)],
    )
}

fn present(no: u64) -> Call {
    let mut call = call(
        no,
        213,
        "IDirect3DDevice9::Present",
        vec![Value::Null, Value::Null, Value::Null, Value::Null],
    );
    call.flags |= CALL_FLAG_END_FRAME;
    call
}

fn set_render_state(no: u64, thread_id: u32) -> Call {
    let mut call = call(
        no,
        253,
        "IDirect3DDevice9::SetRenderState",
        vec![Value::Pointer(0xd3d), Value::UInt(7), Value::UInt(1)],
    );
    call.thread_id = thread_id;
    call
}

fn write_trace(dir: &Path, name: &str, version: u32, calls: &[Call]) -> PathBuf {
    let path = dir.join(name);
    let mut properties = BTreeMap::new();
    properties.insert(String::from("application"), String::from("demo.exe"));
    let mut writer = Writer::create(&path, version, &properties).unwrap();
    for call in calls {
        writer.write_call(call).unwrap();
    }
    writer.finish().unwrap();
    path
}

fn read_numbers(path: &Path) -> Vec<u64> {
    let mut parser = Parser::open(path).unwrap();
    std::iter::from_fn(|| parser.parse_call().unwrap())
        .map(|call| call.no)
        .collect()
}

fn all_calls() -> TrimOptions {
    TrimOptions {
        calls: CallSet::all(),
        ..TrimOptions::default()
    }
}

// Squashing the first frame drops the superseded lineage and keeps the
// survivors at their original positions. Memcpy calls are not claimed by
// the aggregator, so the superseded copy at 3 still flows through the
// ordinary selection path.
#[test]
fn squash_drops_the_superseded_lineage() {
    let dir = TempDir::new().unwrap();
    let input = write_trace(
        dir.path(),
        "app.trace",
        5,
        &[
            create_texture(1, 0x100),
            lock_rect(2, 0x100, 0x900),
            memcpy(3, 0x900, 64),
            unlock_rect(4, 0x100),
            lock_rect(5, 0x100, 0x900),
            memcpy(6, 0x900, 64),
            unlock_rect(7, 0x100),
            present(8),
        ],
    );

    let options = TrimOptions {
        squash_until_frame: 1,
        output: Some(dir.path().join("out.trace")),
        ..all_calls()
    };
    let summary = trim_trace(&input, &options).unwrap();

    assert_eq!(read_numbers(&summary.output), vec![1, 3, 5, 6, 7, 8]);
    assert_eq!(summary.written, 6);
}

// Without squashing, a full-selection trim is a faithful copy.
#[test]
fn no_squash_copies_everything() {
    let dir = TempDir::new().unwrap();
    let input = write_trace(
        dir.path(),
        "app.trace",
        5,
        &[
            create_texture(1, 0x100),
            lock_rect(2, 0x100, 0x900),
            memcpy(3, 0x900, 64),
            unlock_rect(4, 0x100),
            present(5),
        ],
    );

    let options = TrimOptions {
        output: Some(dir.path().join("out.trace")),
        ..all_calls()
    };
    let summary = trim_trace(&input, &options).unwrap();

    assert_eq!(read_numbers(&summary.output), vec![1, 2, 3, 4, 5]);
    assert_eq!(summary.unmatched_survivors, 0);
}

// The version and properties of the source trace carry over.
#[test]
fn header_carries_over() {
    let dir = TempDir::new().unwrap();
    let input = write_trace(dir.path(), "app.trace", 5, &[present(1)]);

    let options = TrimOptions {
        output: Some(dir.path().join("out.trace")),
        ..all_calls()
    };
    let summary = trim_trace(&input, &options).unwrap();

    let mut parser = Parser::open(&summary.output).unwrap();
    assert_eq!(parser.version(), 5);
    assert_eq!(
        parser.properties().get("application").map(String::as_str),
        Some("demo.exe")
    );
}

// A thread filter keeps only the selected threads' calls.
#[test]
fn thread_filter_keeps_the_selected_thread() {
    let dir = TempDir::new().unwrap();
    let input = write_trace(
        dir.path(),
        "app.trace",
        5,
        &[set_render_state(10, 1), set_render_state(11, 2)],
    );

    let options = TrimOptions {
        thread_ids: [2].into_iter().collect(),
        output: Some(dir.path().join("out.trace")),
        ..all_calls()
    };
    let summary = trim_trace(&input, &options).unwrap();

    assert_eq!(read_numbers(&summary.output), vec![11]);
}

// A frame selection keeps whole frames, counting from zero.
#[test]
fn frame_selection_keeps_whole_frames() {
    let dir = TempDir::new().unwrap();
    let input = write_trace(
        dir.path(),
        "app.trace",
        5,
        &[
            set_render_state(1, 0),
            present(2),
            set_render_state(3, 0),
            present(4),
            set_render_state(5, 0),
            present(6),
        ],
    );

    let options = TrimOptions {
        frames: "1".parse().unwrap(),
        output: Some(dir.path().join("out.trace")),
        ..TrimOptions::default()
    };
    let summary = trim_trace(&input, &options).unwrap();

    assert_eq!(read_numbers(&summary.output), vec![3, 4]);
}

// A call selection stops the walk once the selection is exhausted.
#[test]
fn call_selection_keeps_the_requested_range() {
    let dir = TempDir::new().unwrap();
    let input = write_trace(
        dir.path(),
        "app.trace",
        5,
        &[
            set_render_state(1, 0),
            set_render_state(2, 0),
            set_render_state(3, 0),
            set_render_state(4, 0),
        ],
    );

    let options = TrimOptions {
        calls: "2-3".parse().unwrap(),
        output: Some(dir.path().join("out.trace")),
        ..TrimOptions::default()
    };
    let summary = trim_trace(&input, &options).unwrap();

    assert_eq!(read_numbers(&summary.output), vec![2, 3]);
}

// A trace from an unknown codec version has no opcode table.
#[test]
fn unsupported_codec_version_is_fatal() {
    let dir = TempDir::new().unwrap();
    let input = write_trace(dir.path(), "app.trace", 9, &[present(1)]);

    let options = TrimOptions {
        output: Some(dir.path().join("out.trace")),
        ..all_calls()
    };
    match trim_trace(&input, &options) {
        Err(TrimError::UnsupportedVersion(9)) => {}
        other => panic!("expected UnsupportedVersion, got {other:?}"),
    }
}

// Opening a missing trace reports the path.
#[test]
fn missing_input_is_fatal() {
    let dir = TempDir::new().unwrap();
    let options = all_calls();
    assert!(matches!(
        trim_trace(&dir.path().join("nope.trace"), &options),
        Err(TrimError::Open { .. })
    ));
}
