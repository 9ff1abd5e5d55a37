use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use integer_encoding::{VarInt, VarIntReader, VarIntWriter};
use std::io::{self, Read, Write};

fn truncated(e: io::Error) -> Error {
    Error::Corruption(format!("truncated record: {}", e))
}

pub trait NumberWriter: Write + Sized {
    fn write_u64_le(&mut self, v: u64) -> Result<()> {
        self.write_u64::<LittleEndian>(v).map_err(From::from)
    }
    fn write_f32_le(&mut self, v: f32) -> Result<()> {
        self.write_f32::<LittleEndian>(v).map_err(From::from)
    }
    fn write_u8_le(&mut self, v: u8) -> Result<()> {
        self.write_u8(v).map_err(From::from)
    }
    fn write_var_u32(&mut self, v: u32) -> Result<usize> {
        self.write_varint(v).map_err(From::from)
    }
}

impl NumberWriter for Vec<u8> {}

/// Reads from a shrinking byte slice. Running off the end is reported as
/// corruption: every record is written whole by a single store write.
pub trait NumberReader: Read + Sized {
    fn read_u64_le(&mut self) -> Result<u64> {
        self.read_u64::<LittleEndian>().map_err(truncated)
    }
    fn read_f32_le(&mut self) -> Result<f32> {
        self.read_f32::<LittleEndian>().map_err(truncated)
    }
    fn read_u8_le(&mut self) -> Result<u8> {
        self.read_u8().map_err(truncated)
    }
    fn read_var_u32(&mut self) -> Result<u32> {
        self.read_varint::<u32>().map_err(truncated)
    }
}

impl NumberReader for &[u8] {}

pub fn put_length_prefixed_slice(target: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    target.reserve(data.len() + data.len().required_space());
    target.write_var_u32(data.len() as u32)?;
    target.extend_from_slice(data);
    Ok(())
}

pub fn get_length_prefixed_slice<'a>(data: &mut &'a [u8]) -> Result<&'a [u8]> {
    let len = data.read_var_u32()? as usize;
    if data.len() < len {
        return Err(Error::Corruption(format!(
            "length prefixed slice wants {} bytes, {} left",
            len,
            data.len()
        )));
    }
    let (left, right) = data.split_at(len);
    *data = right;
    Ok(left)
}
