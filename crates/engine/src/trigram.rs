use smallvec::SmallVec;

const INLINE: usize = 32;

/// A 3-byte path window packed into the low 24 bits of a `u32`,
/// little-endian; the top byte stays zero.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Trigram(u32);

impl Trigram {
    #[inline]
    pub const fn from_bytes(b0: u8, b1: u8, b2: u8) -> Self {
        Trigram(u32::from_le_bytes([b0, b1, b2, 0]))
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// The caller must keep the top byte clear for `to_bytes` to
    /// roundtrip.
    #[inline]
    pub const fn from_u32(v: u32) -> Self {
        Trigram(v)
    }

    #[inline]
    pub const fn to_bytes(self) -> [u8; 3] {
        let [b0, b1, b2, _] = self.0.to_le_bytes();
        [b0, b1, b2]
    }
}

/// Lowercase a pattern for case-insensitive matching. Folding is
/// ASCII-only: multibyte UTF-8 and other high bytes pass through
/// untouched. Short patterns stay on the stack.
#[inline]
pub fn fold_bytes(input: &[u8]) -> SmallVec<[u8; INLINE]> {
    input.iter().map(u8::to_ascii_lowercase).collect()
}

/// Append every trigram of `bytes` onto `out`, in window order.
///
/// Fewer than 3 bytes yield nothing; otherwise exactly `len - 2` values
/// come out, duplicates included (the scorer counts them; posting lists
/// dedup later). `out` is cleared first, so a caller-held buffer makes
/// extraction allocation-free once warm. `fold_case` lowercases ASCII
/// letters before packing.
pub fn extract_into(bytes: &[u8], fold_case: bool, out: &mut Vec<Trigram>) {
    out.clear();

    let Some(windows) = bytes.len().checked_sub(2).filter(|&n| n > 0) else {
        return;
    };
    out.reserve(windows);

    for i in 0..windows {
        let (mut b0, mut b1, mut b2) = (bytes[i], bytes[i + 1], bytes[i + 2]);
        if fold_case {
            b0 = b0.to_ascii_lowercase();
            b1 = b1.to_ascii_lowercase();
            b2 = b2.to_ascii_lowercase();
        }
        out.push(Trigram::from_bytes(b0, b1, b2));
    }
}

/// Sorted, deduplicated trigram set of `bytes`. This is the indexing-side
/// view: one posting append per distinct trigram.
pub fn distinct_trigrams(bytes: &[u8], fold_case: bool) -> Vec<Trigram> {
    let mut tris = Vec::new();
    extract_into(bytes, fold_case, &mut tris);
    tris.sort_unstable();
    tris.dedup();
    tris
}

#[cfg(test)]
#[path = "trigram_tests.rs"]
mod tests;
