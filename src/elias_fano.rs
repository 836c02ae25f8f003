//! Elias-Fano encoding for monotone sequences.
//!
//! Provides near-optimal space for sorted integers while allowing
//! $O(1)$ random access to any element. In the harness it is the
//! "compressed, static" end of the spectrum: set operations decode both
//! operands, merge, and re-encode.
//!
//! # Theory
//!
//! For $n$ sorted integers in range $[0, U)$, Elias-Fano uses:
//! - $L = \lfloor \log_2(U/n) \rfloor$ bits for each "lower" part.
//! - A bit vector of length $n + \lceil U/2^L \rceil$ for "upper" parts.
//!
//! Total space is $n \lceil \log_2(U/n) \rceil + 2n + o(n)$ bits.

use crate::bitvec::{BitVector, ByteReader};
use crate::error::{Error, Result};

const MAGIC: &[u8; 8] = b"SBITEF01";

/// Elias-Fano encoding structure.
#[derive(Debug, Clone)]
pub struct EliasFano {
    upper_bits: BitVector,
    lower_bits: Vec<u64>,
    l: usize,
    n: usize,
    universe_size: u32,
}

impl EliasFano {
    /// Create a new Elias-Fano structure from a sorted sequence.
    ///
    /// `values` must be strictly increasing and below `universe_size`.
    pub fn new(values: &[u32], universe_size: u32) -> Self {
        let n = values.len();
        if n == 0 {
            return Self {
                upper_bits: BitVector::new(&[], 0),
                lower_bits: Vec::new(),
                l: 0,
                n: 0,
                universe_size,
            };
        }

        // L = floor(log2(U/n))
        let ratio = (universe_size as u64 / n as u64) as u32;
        let l = if ratio > 0 {
            (31 - ratio.leading_zeros()) as usize
        } else {
            0
        };
        let low_mask = (1u64 << l) - 1;

        // Lower bits: pack n elements of L bits each
        let mut lower_bits = Vec::with_capacity(n.saturating_mul(l).div_ceil(64));
        if l > 0 {
            let mut current_word = 0u64;
            let mut bit_offset = 0;

            for &v in values {
                let low = v as u64 & low_mask;
                if bit_offset + l <= 64 {
                    current_word |= low << bit_offset;
                    bit_offset += l;
                    if bit_offset == 64 {
                        lower_bits.push(current_word);
                        current_word = 0;
                        bit_offset = 0;
                    }
                } else {
                    // Split across words
                    let bits_in_this = 64 - bit_offset;
                    current_word |= (low & ((1u64 << bits_in_this) - 1)) << bit_offset;
                    lower_bits.push(current_word);
                    current_word = low >> bits_in_this;
                    bit_offset = l - bits_in_this;
                }
            }
            if bit_offset > 0 {
                lower_bits.push(current_word);
            }
        }

        // Upper bits: n ones and U/2^L zeros
        let num_upper_vals = (universe_size >> l) as usize + 1;
        let upper_bv_len = n + num_upper_vals;
        let mut upper_data = vec![0u64; upper_bv_len.div_ceil(64)];

        for (i, &v) in values.iter().enumerate() {
            let high = (v >> l) as usize;
            let pos = high + i;
            upper_data[pos / 64] |= 1 << (pos % 64);
        }

        Self {
            upper_bits: BitVector::new(&upper_data, upper_bv_len),
            lower_bits,
            l,
            n,
            universe_size,
        }
    }

    /// Return the number of elements.
    pub fn len(&self) -> usize {
        self.n
    }

    /// Return true if the sequence has 0 elements.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Exclusive upper bound the sequence was encoded against.
    pub fn universe_size(&self) -> u32 {
        self.universe_size
    }

    /// Return the value at index `i`.
    pub fn get(&self, i: usize) -> Result<u32> {
        if i >= self.n {
            return Err(Error::IndexOutOfBounds(i));
        }

        // 1. Get high bits from upper_bits using select1(i)
        let pos = self
            .upper_bits
            .select1(i)
            .ok_or(Error::InvalidSelection(i))?;
        let high = (pos - i) as u32;

        // 2. Get low bits from lower_bits
        Ok((high << self.l) | self.low(i))
    }

    /// Decode all values in order without per-element select.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.upper_bits
            .iter_ones()
            .enumerate()
            .map(move |(i, pos)| (((pos - i) as u32) << self.l) | self.low(i))
    }

    fn low(&self, i: usize) -> u32 {
        if self.l == 0 {
            return 0;
        }
        let start_bit = i * self.l;
        let word_idx = start_bit / 64;
        let bit_offset = start_bit % 64;

        let mut low = self.lower_bits[word_idx] >> bit_offset;
        if bit_offset + self.l > 64 {
            let bits_from_next = bit_offset + self.l - 64;
            low |= (self.lower_bits[word_idx + 1] & ((1u64 << bits_from_next) - 1))
                << (self.l - bits_from_next);
        }
        (low & ((1u64 << self.l) - 1)) as u32
    }

    /// Serialize to a stable binary encoding (little-endian).
    ///
    /// Format (versioned):
    /// - magic: 8 bytes (`SBITEF01`)
    /// - universe_size: u32
    /// - n: u64
    /// - l: u64
    /// - lower_len: u64, then `lower_len` u64 words
    /// - upper bits: `BitVector::to_bytes` (to the end of input)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_size());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.universe_size.to_le_bytes());
        out.extend_from_slice(&(self.n as u64).to_le_bytes());
        out.extend_from_slice(&(self.l as u64).to_le_bytes());
        out.extend_from_slice(&(self.lower_bits.len() as u64).to_le_bytes());
        for &w in &self.lower_bits {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out.extend_from_slice(&self.upper_bits.to_bytes());
        out
    }

    /// Exact length in bytes of [`EliasFano::to_bytes`].
    pub fn serialized_size(&self) -> usize {
        8 + 4 + 8 + 8 + 8 + self.lower_bits.len() * 8 + self.upper_bits.serialized_size()
    }

    /// Deserialize from `to_bytes()` output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        if r.take(8)? != MAGIC {
            return Err(Error::InvalidEncoding(
                "bad magic for EliasFano".to_string(),
            ));
        }
        let universe_size = r.u32()?;
        let n = r.u64()? as usize;
        let l = r.u64()? as usize;
        if l > 31 {
            return Err(Error::InvalidEncoding(format!(
                "EliasFano lower width {l} exceeds 31 bits"
            )));
        }
        let lower_len = r.len_prefix(8)?;
        if lower_len != n.saturating_mul(l).div_ceil(64) {
            return Err(Error::InvalidEncoding(format!(
                "EliasFano lower bits ({lower_len} words) do not match n={n}, l={l}"
            )));
        }
        let mut lower_bits = Vec::with_capacity(lower_len);
        for _ in 0..lower_len {
            lower_bits.push(r.u64()?);
        }
        let upper_bits = BitVector::from_bytes(r.rest())?;

        if upper_bits.count_ones() != n {
            return Err(Error::InvalidEncoding(format!(
                "EliasFano n ({n}) does not match upper bit count ({})",
                upper_bits.count_ones()
            )));
        }

        Ok(Self {
            upper_bits,
            lower_bits,
            l,
            n,
            universe_size,
        })
    }
}
