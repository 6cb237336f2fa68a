use crate::error::{EngineError, Result};
use crate::index::FileId;

/// zstd level for posting payloads. Postings are small and hot; favor
/// decode speed over ratio.
const ZSTD_LEVEL: i32 = 3;

/// MSB-first bit accumulator.
pub struct BitWriter {
    bytes: Vec<u8>,
    /// Bits used in the trailing byte, 0..8.
    used: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter {
            bytes: Vec::new(),
            used: 0,
        }
    }

    #[inline]
    pub fn push_bit(&mut self, bit: bool) {
        if self.used == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 1 << (7 - self.used);
        }
        self.used = (self.used + 1) % 8;
    }

    /// Append the low `count` bits of `value`, most significant first.
    pub fn push_bits(&mut self, value: u64, count: u32) {
        for i in (0..count).rev() {
            self.push_bit((value >> i) & 1 != 0);
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// MSB-first bit cursor over a byte slice.
pub struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        BitReader { bytes, pos: 0 }
    }

    #[inline]
    pub fn read_bit(&mut self) -> Option<bool> {
        let byte = self.bytes.get(self.pos / 8)?;
        let bit = byte >> (7 - (self.pos % 8) as u32) & 1;
        self.pos += 1;
        Some(bit != 0)
    }

    pub fn read_bits(&mut self, count: u32) -> Option<u64> {
        let mut v = 0u64;
        for _ in 0..count {
            v = (v << 1) | self.read_bit()? as u64;
        }
        Some(v)
    }
}

/// Rice parameter for a delta sequence: round(log2(mean delta)), clamped
/// to [0, 31]. Golomb-Rice with this k is near-optimal for the roughly
/// geometric gaps of a posting list.
pub fn rice_parameter(deltas: &[u64]) -> u32 {
    if deltas.is_empty() {
        return 0;
    }
    let sum: u128 = deltas.iter().map(|&d| d as u128).sum();
    let mean = (sum as f64 / deltas.len() as f64).max(1.0);
    (mean.log2().round() as i64).clamp(0, 31) as u32
}

/// Encode one value: unary quotient (`q` one-bits, zero-terminated), then
/// k remainder bits.
pub fn rice_encode_into(values: &[u64], k: u32, w: &mut BitWriter) {
    for &v in values {
        let q = v >> k;
        for _ in 0..q {
            w.push_bit(true);
        }
        w.push_bit(false);
        w.push_bits(v, k);
    }
}

/// Decode exactly `count` values written by `rice_encode_into`.
pub fn rice_decode(r: &mut BitReader<'_>, k: u32, count: usize) -> Option<Vec<u64>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let mut q = 0u64;
        while r.read_bit()? {
            q += 1;
        }
        let rem = r.read_bits(k)?;
        out.push((q << k) | rem);
    }
    Some(out)
}

/// Deltas of a strictly ascending sequence: first value kept, then gaps.
pub fn delta_encode(sorted: &[FileId]) -> Vec<u64> {
    let mut out = Vec::with_capacity(sorted.len());
    let mut prev = 0u64;
    for (i, &v) in sorted.iter().enumerate() {
        if i == 0 {
            out.push(v);
        } else {
            out.push(v - prev);
        }
        prev = v;
    }
    out
}

/// Inverse of `delta_encode`.
pub fn delta_decode(deltas: &[u64]) -> Vec<FileId> {
    let mut out = Vec::with_capacity(deltas.len());
    let mut acc = 0u64;
    for (i, &d) in deltas.iter().enumerate() {
        if i == 0 {
            acc = d;
        } else {
            acc += d;
        }
        out.push(acc);
    }
    out
}

/// Sealing context: owns the reusable zstd compression state.
pub struct Sealer {
    cctx: zstd::bulk::Compressor<'static>,
}

impl Sealer {
    pub fn new() -> Result<Self> {
        let cctx = zstd::bulk::Compressor::new(ZSTD_LEVEL).map_err(EngineError::Compression)?;
        Ok(Sealer { cctx })
    }

    /// Seal a posting buffer: sort, dedup, delta, Golomb-Rice, zstd.
    ///
    /// `ids` is sorted and deduplicated in place (so a failed compression
    /// leaves a still-valid buffer behind); the returned payload decodes to
    /// exactly that strictly ascending sequence. Also returns the final
    /// posting count.
    ///
    /// Payload layout: `raw_len: u32 LE` then a zstd frame whose plain text
    /// is `k: u8`, `count: u32 LE`, Rice bitstream.
    pub fn seal(&mut self, ids: &mut Vec<FileId>) -> Result<(Vec<u8>, u32)> {
        ids.sort_unstable();
        ids.dedup();

        let deltas = delta_encode(ids);
        let k = rice_parameter(&deltas);

        let mut w = BitWriter::new();
        rice_encode_into(&deltas, k, &mut w);
        let bits = w.into_bytes();

        let mut raw = Vec::with_capacity(5 + bits.len());
        raw.push(k as u8);
        raw.extend_from_slice(&(ids.len() as u32).to_le_bytes());
        raw.extend_from_slice(&bits);

        let frame = self
            .cctx
            .compress(&raw)
            .map_err(EngineError::Compression)?;

        let mut payload = Vec::with_capacity(4 + frame.len());
        payload.extend_from_slice(&(raw.len() as u32).to_le_bytes());
        payload.extend_from_slice(&frame);

        Ok((payload, ids.len() as u32))
    }
}

/// Decoding context: reusable zstd decompression state plus scratch. One
/// per query worker; no locking needed.
pub struct Decoder {
    dctx: zstd::bulk::Decompressor<'static>,
}

impl Decoder {
    pub fn new() -> Result<Self> {
        let dctx = zstd::bulk::Decompressor::new().map_err(EngineError::Compression)?;
        Ok(Decoder { dctx })
    }

    /// Decode a sealed payload back into its ascending id list.
    pub fn decode(&mut self, payload: &[u8]) -> Result<Vec<FileId>> {
        if payload.len() < 4 {
            return Err(EngineError::CorruptPostings);
        }
        let raw_len = u32::from_le_bytes(payload[..4].try_into().unwrap()) as usize;

        let raw = self
            .dctx
            .decompress(&payload[4..], raw_len)
            .map_err(EngineError::Compression)?;
        if raw.len() != raw_len || raw.len() < 5 {
            return Err(EngineError::CorruptPostings);
        }

        let k = raw[0] as u32;
        if k > 31 {
            return Err(EngineError::CorruptPostings);
        }
        let count = u32::from_le_bytes(raw[1..5].try_into().unwrap()) as usize;

        let mut r = BitReader::new(&raw[5..]);
        let deltas = rice_decode(&mut r, k, count).ok_or(EngineError::CorruptPostings)?;
        Ok(delta_decode(&deltas))
    }
}

#[cfg(test)]
#[path = "postings_tests.rs"]
mod tests;
