use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use crate::call::{Call, Value};
use crate::{CodecError, MAGIC_BYTES};

/// Writes a call-trace file with the same framing [`crate::Parser`] reads.
#[derive(Debug)]
pub struct Writer {
    writer: BufWriter<File>,
}

impl Writer {
    /// Creates the output file and writes the header.
    pub fn create<P: AsRef<Path>>(
        path: P,
        version: u32,
        properties: &BTreeMap<String, String>,
    ) -> Result<Self, CodecError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC_BYTES)?;
        writer.write_all(&version.to_le_bytes())?;
        writer.write_all(&(properties.len() as u32).to_le_bytes())?;
        for (key, value) in properties {
            write_bytes(&mut writer, key.as_bytes())?;
            write_bytes(&mut writer, value.as_bytes())?;
        }

        Ok(Self { writer })
    }

    pub fn write_call(&mut self, call: &Call) -> Result<(), CodecError> {
        self.writer.write_all(&call.no.to_le_bytes())?;
        self.writer.write_all(&call.thread_id.to_le_bytes())?;
        self.writer.write_all(&call.flags.to_le_bytes())?;
        self.writer.write_all(&call.sig.id.to_le_bytes())?;
        write_bytes(&mut self.writer, call.sig.name.as_bytes())?;
        self.writer.write_all(&(call.args.len() as u32).to_le_bytes())?;
        for arg in &call.args {
            write_value(&mut self.writer, arg)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), CodecError> {
        self.writer.flush()?;
        Ok(())
    }
}

fn write_bytes(writer: &mut BufWriter<File>, bytes: &[u8]) -> Result<(), CodecError> {
    writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
    writer.write_all(bytes)?;
    Ok(())
}

fn write_value(writer: &mut BufWriter<File>, value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Null => writer.write_all(&[0])?,
        Value::Bool(value) => {
            writer.write_all(&[1, *value as u8])?;
        }
        Value::UInt(value) => {
            writer.write_all(&[2])?;
            writer.write_all(&value.to_le_bytes())?;
        }
        Value::SInt(value) => {
            writer.write_all(&[3])?;
            writer.write_all(&value.to_le_bytes())?;
        }
        Value::Float(value) => {
            writer.write_all(&[4])?;
            writer.write_all(&value.to_bits().to_le_bytes())?;
        }
        Value::String(value) => {
            writer.write_all(&[5])?;
            write_bytes(writer, value.as_bytes())?;
        }
        Value::Blob(bytes) => {
            writer.write_all(&[6])?;
            write_bytes(writer, bytes)?;
        }
        Value::Pointer(address) => {
            writer.write_all(&[7])?;
            writer.write_all(&address.to_le_bytes())?;
        }
        Value::Array(values) => {
            writer.write_all(&[8])?;
            write_values(writer, values)?;
        }
        Value::Struct(members) => {
            writer.write_all(&[9])?;
            write_values(writer, members)?;
        }
    }
    Ok(())
}

fn write_values(writer: &mut BufWriter<File>, values: &[Value]) -> Result<(), CodecError> {
    writer.write_all(&(values.len() as u32).to_le_bytes())?;
    for value in values {
        write_value(writer, value)?;
    }
    Ok(())
}
