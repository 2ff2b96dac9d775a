use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::call::{Call, Signature, Value};
use crate::{CodecError, MAGIC_BYTES};

/// Restorable position in a trace. Capturing one and restoring it later
/// replays the identical call sequence, numbers included.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Bookmark {
    offset: u64,
}

/// Lazy reader over a call-trace file.
#[derive(Debug)]
pub struct Parser {
    reader: BufReader<File>,
    version: u32,
    properties: BTreeMap<String, String>,
}

impl Parser {
    /// Opens a trace, validates the magic bytes, and reads the header.
    /// The cursor is left at the first call record.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CodecError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 8];
        reader
            .read_exact(&mut magic)
            .map_err(|err| at_eof(err, CodecError::BadMagic))?;
        if &magic != MAGIC_BYTES {
            return Err(CodecError::BadMagic);
        }

        let version = read_u32(&mut reader, "version")?;
        let count = read_u32(&mut reader, "property count")?;
        let mut properties = BTreeMap::new();
        for _ in 0..count {
            let key = read_string(&mut reader, "property key")?;
            let value = read_string(&mut reader, "property value")?;
            properties.insert(key, value);
        }

        Ok(Self {
            reader,
            version,
            properties,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn bookmark(&mut self) -> Result<Bookmark, CodecError> {
        Ok(Bookmark {
            offset: self.reader.stream_position()?,
        })
    }

    pub fn set_bookmark(&mut self, bookmark: Bookmark) -> Result<(), CodecError> {
        self.reader.seek(SeekFrom::Start(bookmark.offset))?;
        Ok(())
    }

    /// Parses the next call. `Ok(None)` at a clean end of stream; a stream
    /// that ends mid-record is a [`CodecError::Truncated`].
    pub fn parse_call(&mut self) -> Result<Option<Call>, CodecError> {
        let mut no = [0u8; 8];
        let mut filled = 0;
        while filled < no.len() {
            let read = self.reader.read(&mut no[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < no.len() {
            return Err(CodecError::Truncated("call header"));
        }
        let no = u64::from_le_bytes(no);

        let thread_id = read_u32(&mut self.reader, "thread id")?;
        let flags = read_u32(&mut self.reader, "call flags")?;
        let id = read_u32(&mut self.reader, "signature id")?;
        let name = read_string(&mut self.reader, "signature name")?;
        let argc = read_u32(&mut self.reader, "argument count")?;
        let mut args = Vec::with_capacity(argc.min(64) as usize);
        for _ in 0..argc {
            args.push(read_value(&mut self.reader)?);
        }

        Ok(Some(Call {
            no,
            thread_id,
            flags,
            sig: Signature { id, name },
            args,
        }))
    }
}

fn at_eof(err: io::Error, replacement: CodecError) -> CodecError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => replacement,
        _ => CodecError::Io(err),
    }
}

fn fill<R: Read>(reader: &mut R, buffer: &mut [u8], what: &'static str) -> Result<(), CodecError> {
    reader
        .read_exact(buffer)
        .map_err(|err| at_eof(err, CodecError::Truncated(what)))
}

fn read_u8<R: Read>(reader: &mut R, what: &'static str) -> Result<u8, CodecError> {
    let mut buffer = [0u8; 1];
    fill(reader, &mut buffer, what)?;
    Ok(buffer[0])
}

fn read_u32<R: Read>(reader: &mut R, what: &'static str) -> Result<u32, CodecError> {
    let mut buffer = [0u8; 4];
    fill(reader, &mut buffer, what)?;
    Ok(u32::from_le_bytes(buffer))
}

fn read_u64<R: Read>(reader: &mut R, what: &'static str) -> Result<u64, CodecError> {
    let mut buffer = [0u8; 8];
    fill(reader, &mut buffer, what)?;
    Ok(u64::from_le_bytes(buffer))
}

fn read_bytes<R: Read>(reader: &mut R, what: &'static str) -> Result<Vec<u8>, CodecError> {
    let len = read_u32(reader, what)? as usize;
    let mut buffer = vec![0u8; len];
    fill(reader, &mut buffer, what)?;
    Ok(buffer)
}

fn read_string<R: Read>(reader: &mut R, what: &'static str) -> Result<String, CodecError> {
    let bytes = read_bytes(reader, what)?;
    String::from_utf8(bytes).map_err(|_| CodecError::Malformed(what))
}

fn read_value<R: Read>(reader: &mut R) -> Result<Value, CodecError> {
    match read_u8(reader, "value tag")? {
        0 => Ok(Value::Null),
        1 => Ok(Value::Bool(read_u8(reader, "bool value")? != 0)),
        2 => Ok(Value::UInt(read_u64(reader, "uint value")?)),
        3 => Ok(Value::SInt(read_u64(reader, "sint value")? as i64)),
        4 => Ok(Value::Float(f64::from_bits(read_u64(
            reader,
            "float value",
        )?))),
        5 => Ok(Value::String(read_string(reader, "string value")?)),
        6 => Ok(Value::Blob(read_bytes(reader, "blob value")?)),
        7 => Ok(Value::Pointer(read_u64(reader, "pointer value")?)),
        8 => Ok(Value::Array(read_values(reader, "array value")?)),
        9 => Ok(Value::Struct(read_values(reader, "struct value")?)),
        tag => Err(CodecError::UnknownValueTag(tag)),
    }
}

fn read_values<R: Read>(reader: &mut R, what: &'static str) -> Result<Vec<Value>, CodecError> {
    let count = read_u32(reader, what)? as usize;
    let mut values = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        values.push(read_value(reader)?);
    }
    Ok(values)
}
