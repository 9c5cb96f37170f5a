//! Fixed, versioned, little-endian wire frames for collective messages.
//!
//! Every message is `WireHdr` + `WireCount` + body. The body is produced by
//! one of two value codecs: raw record bytes for [`Pod`] types, or `bincode`
//! for anything `serde` can handle.

use bytemuck::{Pod, Zeroable};
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use static_assertions::{assert_eq_size, const_assert_eq};
use thiserror::Error;

/// Bump when the layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

/// Frame kinds.
pub const KIND_SCATTER: u16 = 1;
pub const KIND_BLOCK: u16 = 2;
pub const KIND_GATHER: u16 = 3;

/// Bytes preceding the body of every frame.
pub const FRAME_HEADER_LEN: usize = size_of::<WireHdr>() + size_of::<WireCount>();

/// Structural problems with a received frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("frame too short: need {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },
    #[error("unsupported wire version {found} (expected {WIRE_VERSION})")]
    Version { found: u16 },
    #[error("unexpected frame kind {found} (expected {expected})")]
    Kind { expected: u16, found: u16 },
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("body of {len} bytes exceeds the frame limit of {max}")]
    TooLarge { len: usize, max: usize },
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), WireError> {
    if actual == expected {
        Ok(())
    } else {
        Err(WireError::Length { expected, actual })
    }
}

/// All multi-byte integers in these structs are **little-endian** on the wire.
/// We store them pre-LE with `.to_le()` and decode with `.from_le()`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct WireHdr {
    pub version_le: u16,  // = WIRE_VERSION.to_le()
    pub kind_le: u16,     // KIND_*
    pub reserved_le: u32, // future use; keep zero
}

impl WireHdr {
    pub fn new(kind: u16) -> Self {
        Self {
            version_le: WIRE_VERSION.to_le(),
            kind_le: kind.to_le(),
            reserved_le: 0,
        }
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u32, // body length in bytes
}

impl WireCount {
    /// Fails when `n` does not fit the 32-bit length field.
    pub fn new(n: usize) -> Result<Self, WireError> {
        let n32 = u32::try_from(n).map_err(|_| WireError::TooLarge {
            len: n,
            max: u32::MAX as usize,
        })?;
        Ok(Self { n_le: n32.to_le() })
    }
    pub fn get(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

assert_eq_size!(WireHdr, u64);
assert_eq_size!(WireCount, u32);
const_assert_eq!(FRAME_HEADER_LEN, 12);

/// Prefix `body` with a header of the given kind and its length.
pub fn encode_frame(kind: u16, body: &[u8]) -> Result<Bytes, WireError> {
    let count = WireCount::new(body.len())?;
    let mut out = BytesMut::with_capacity(FRAME_HEADER_LEN + body.len());
    out.put_slice(bytemuck::bytes_of(&WireHdr::new(kind)));
    out.put_slice(bytemuck::bytes_of(&count));
    out.put_slice(body);
    Ok(out.freeze())
}

/// Validate a frame of the expected kind and borrow its body.
pub fn decode_frame(kind: u16, raw: &[u8]) -> Result<&[u8], WireError> {
    if raw.len() < FRAME_HEADER_LEN {
        return Err(WireError::Truncated {
            need: FRAME_HEADER_LEN,
            got: raw.len(),
        });
    }
    let (hdr_bytes, rest) = raw.split_at(size_of::<WireHdr>());
    let hdr: WireHdr = bytemuck::pod_read_unaligned(hdr_bytes);
    if hdr.version() != WIRE_VERSION {
        return Err(WireError::Version {
            found: hdr.version(),
        });
    }
    if hdr.kind() != kind {
        return Err(WireError::Kind {
            expected: kind,
            found: hdr.kind(),
        });
    }
    let (cnt_bytes, body) = rest.split_at(size_of::<WireCount>());
    let cnt: WireCount = bytemuck::pod_read_unaligned(cnt_bytes);
    expect_exact_len(body.len(), cnt.get())?;
    Ok(body)
}

// ===== Value codecs ========================================================

/// Raw record bytes in native layout; all ranks must share endianness.
pub fn encode_pod<T: Pod>(value: &T) -> Vec<u8> {
    bytemuck::bytes_of(value).to_vec()
}

pub fn decode_pod<T: Pod>(body: &[u8]) -> Result<T, WireError> {
    expect_exact_len(body.len(), size_of::<T>())?;
    Ok(bytemuck::pod_read_unaligned(body))
}

pub fn encode_serde<T: Serialize>(value: &T) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(value)
}

pub fn decode_serde<T: DeserializeOwned>(body: &[u8]) -> Result<T, bincode::Error> {
    bincode::deserialize(body)
}
