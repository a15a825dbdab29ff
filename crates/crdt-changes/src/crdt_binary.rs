//! Shared binary primitives used by the change codec.
//!
//! `vu57` is a little-endian base-128 varint capped at 8 bytes: seven
//! continuation bytes carry 7 bits each and the eighth byte carries the last
//! 8 bits, for 57 bits in total.

use ciborium::value::Value as CborValue;
use std::io::Cursor;

/// Largest value representable as `vu57`.
pub const VU57_MAX: u64 = (1 << 57) - 1;

#[derive(Debug, Clone, Copy)]
pub struct BinaryCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos == self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn u8(&mut self) -> Option<u8> {
        self.read_array::<1>().map(|[b]| b)
    }

    pub fn u32_be(&mut self) -> Option<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    pub fn i64_be(&mut self) -> Option<i64> {
        self.read_array().map(i64::from_be_bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.read_bytes(N)?.try_into().ok()
    }

    pub fn skip(&mut self, n: usize) -> Option<()> {
        if self.remaining() < n {
            return None;
        }
        self.pos += n;
        Some(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let start = self.pos;
        self.pos += n;
        Some(&self.data[start..start + n])
    }

    pub fn vu57(&mut self) -> Option<u64> {
        read_vu57(self.data, &mut self.pos)
    }

    /// Reads one CBOR data item and advances past exactly the bytes it used.
    pub fn read_one_cbor(&mut self) -> Option<CborValue> {
        let slice = &self.data[self.pos..];
        let mut cursor = Cursor::new(slice);
        let val = ciborium::de::from_reader::<CborValue, _>(&mut cursor).ok()?;
        let consumed = cursor.position() as usize;
        self.skip(consumed)?;
        Some(val)
    }
}

pub fn write_vu57(out: &mut Vec<u8>, mut value: u64) {
    for _ in 0..7 {
        let mut b = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(b);
            return;
        }
        b |= 0x80;
        out.push(b);
    }
    out.push((value & 0xff) as u8);
}

pub fn read_vu57(data: &[u8], pos: &mut usize) -> Option<u64> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    for i in 0..8 {
        let b = *data.get(*pos)?;
        *pos += 1;
        if i < 7 {
            let part = (b & 0x7f) as u64;
            result |= part.checked_shl(shift)?;
            if (b & 0x80) == 0 {
                return Some(result);
            }
            shift += 7;
        } else {
            result |= (b as u64).checked_shl(49)?;
            return Some(result);
        }
    }
    None
}

/// Number of bytes `write_vu57` emits for `value`.
pub fn vu57_len(mut value: u64) -> usize {
    let mut len = 1;
    while value > 0x7f && len < 8 {
        value >>= 7;
        len += 1;
    }
    len
}
