//! Byte formats of the two record kinds stored in object value slots.
//!
//! Node (and terminus) record:
//!  tag          : u8 (`NODE_TAG`)
//!  height rand  : f32
//!  key          : varint32 length + bytes
//!  next count   : varint32
//!  next keys    : next count * (varint32 length + bytes)
//!
//! Skip list metadata record:
//!  tag          : u8 (`META_TAG`)
//!  length       : u64
//!  cur depth    : u64
//!  cur capacity : u64
//!  prob count   : varint32
//!  probabilities: prob count * f32
//!
//! All fixed-width fields are little endian.

use crate::codec::{get_length_prefixed_slice, put_length_prefixed_slice, NumberReader, NumberWriter};
use crate::error::{Error, Result};

const NODE_TAG: u8 = 0x4e;
const META_TAG: u8 = 0x4d;

#[derive(Clone, Debug, PartialEq)]
pub struct NodeRecord {
    /// Drawn once when the node is created. Decides whether the node is
    /// promoted when the list grows a level.
    pub height_rand: f32,
    pub key: Vec<u8>,
    /// `next_keys[i]` caches the key of the level-`i` successor. Empty when the
    /// successor is the terminus.
    pub next_keys: Vec<Vec<u8>>,
}

impl NodeRecord {
    pub fn new(height_rand: f32, key: impl Into<Vec<u8>>, next_keys: Vec<Vec<u8>>) -> Self {
        NodeRecord {
            height_rand,
            key: key.into(),
            next_keys,
        }
    }

    /// The terminus never carries a key and is eligible for every level.
    pub fn terminus(depth: usize) -> Self {
        NodeRecord {
            height_rand: 0.0,
            key: Vec::new(),
            next_keys: vec![Vec::new(); depth],
        }
    }

    pub fn height(&self) -> usize {
        self.next_keys.len()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let size = 1
            + 4
            + 5
            + self.key.len()
            + 5
            + self.next_keys.iter().map(|k| k.len() + 5).sum::<usize>();
        let mut buf = Vec::with_capacity(size);
        buf.write_u8_le(NODE_TAG)?;
        buf.write_f32_le(self.height_rand)?;
        put_length_prefixed_slice(&mut buf, &self.key)?;
        buf.write_var_u32(self.next_keys.len() as u32)?;
        for k in self.next_keys.iter() {
            put_length_prefixed_slice(&mut buf, k)?;
        }
        Ok(buf)
    }

    pub fn decode(mut data: &[u8]) -> Result<Self> {
        let tag = data.read_u8_le()?;
        if tag != NODE_TAG {
            return Err(Error::Corruption(format!(
                "expected node record tag {:#x}, got {:#x}",
                NODE_TAG, tag
            )));
        }
        let height_rand = data.read_f32_le()?;
        let key = get_length_prefixed_slice(&mut data)?.to_vec();
        let count = data.read_var_u32()? as usize;
        // each next key needs at least its length byte
        if count > data.len() {
            return Err(Error::Corruption(format!(
                "node record claims {} next keys in {} bytes",
                count,
                data.len()
            )));
        }
        let mut next_keys = Vec::with_capacity(count);
        for _ in 0..count {
            next_keys.push(get_length_prefixed_slice(&mut data)?.to_vec());
        }
        if !data.is_empty() {
            return Err(Error::Corruption(format!(
                "{} trailing bytes after node record",
                data.len()
            )));
        }
        Ok(NodeRecord {
            height_rand,
            key,
            next_keys,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetaRecord {
    pub length: u64,
    /// Promotion threshold for every level above level 0, shrinking by the
    /// configured probability at each step.
    pub level_probabilities: Vec<f32>,
    pub cur_depth: u64,
    pub cur_capacity: u64,
}

impl MetaRecord {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(1 + 24 + 5 + 4 * self.level_probabilities.len());
        buf.write_u8_le(META_TAG)?;
        buf.write_u64_le(self.length)?;
        buf.write_u64_le(self.cur_depth)?;
        buf.write_u64_le(self.cur_capacity)?;
        buf.write_var_u32(self.level_probabilities.len() as u32)?;
        for p in self.level_probabilities.iter() {
            buf.write_f32_le(*p)?;
        }
        Ok(buf)
    }

    pub fn decode(mut data: &[u8]) -> Result<Self> {
        let tag = data.read_u8_le()?;
        if tag != META_TAG {
            return Err(Error::Corruption(format!(
                "expected skip list record tag {:#x}, got {:#x}",
                META_TAG, tag
            )));
        }
        let length = data.read_u64_le()?;
        let cur_depth = data.read_u64_le()?;
        let cur_capacity = data.read_u64_le()?;
        let count = data.read_var_u32()? as usize;
        if count * 4 != data.len() {
            return Err(Error::Corruption(format!(
                "skip list record claims {} probabilities in {} bytes",
                count,
                data.len()
            )));
        }
        let mut level_probabilities = Vec::with_capacity(count);
        for _ in 0..count {
            level_probabilities.push(data.read_f32_le()?);
        }
        Ok(MetaRecord {
            length,
            level_probabilities,
            cur_depth,
            cur_capacity,
        })
    }

    pub fn depth(&self) -> usize {
        self.cur_depth as usize
    }
}
