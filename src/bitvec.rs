//! Cache-friendly succinct bit vector with rank/select support.
//!
//! Implements the Rank9 indexing scheme with an interleaved (blocked) layout
//! for superior cache locality. Registered in the harness as `rank9`: a dense
//! bitset that pays an index on top of the raw words and must rebuild it after
//! every mutation.
//!
//! # Layout
//!
//! Each 512-bit block is stored as 10 x 64-bit words:
//! - Word 0: Absolute rank (number of 1s before this block)
//! - Word 1: Relative ranks (7 x 9-bit cumulative counts within the block)
//! - Word 2-9: Raw data (512 bits)
//!
//! This ensures that once the block header is in cache, all data needed for
//! rank/select within that block is also available.

use crate::error::{Error, Result};

const MAGIC: &[u8; 8] = b"SBITBV01";

/// A cache-oblivious succinct bit vector.
#[derive(Clone)]
pub struct BitVector {
    /// Interleaved data: [abs_rank, rel_ranks, data0, ..., data7, ...]
    storage: Vec<u64>,
    /// Coarse index for select1: stores block index for every 512th one-bit
    select1_index: Vec<u32>,
    /// Coarse index for select0: stores block index for every 512th zero-bit
    select0_index: Vec<u32>,
    len: usize,
}

impl std::fmt::Debug for BitVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitVector")
            .field("len", &self.len)
            .field("ones", &self.count_ones())
            .finish()
    }
}

impl BitVector {
    /// Create a new BitVector from a sequence of bits.
    pub fn new(bits: &[u64], len: usize) -> Self {
        let num_blocks = len.div_ceil(512);
        let mut storage = vec![0u64; num_blocks * 10 + 10]; // +10 for sentinel
        let mut select1_index = Vec::new();
        let mut select0_index = Vec::new();

        let mut total_rank = 0u64;
        let mut next_select1_threshold = 0u64;
        let mut next_select0_threshold = 0u64;

        for i in 0..num_blocks {
            let base = i * 10;
            storage[base] = total_rank;
            let total_zeros = (i as u64 * 512) - total_rank;

            while total_rank >= next_select1_threshold {
                select1_index.push(i as u32);
                next_select1_threshold += 512;
            }
            while total_zeros >= next_select0_threshold {
                select0_index.push(i as u32);
                next_select0_threshold += 512;
            }

            let mut relative_ranks = 0u64;
            let mut current_rel = 0u64;

            for j in 0..8 {
                let data_idx = i * 8 + j;
                let word = bits.get(data_idx).copied().unwrap_or(0) & tail_mask(data_idx, len);
                storage[base + 2 + j] = word;

                if j > 0 {
                    relative_ranks |= current_rel << (9 * (j - 1));
                }
                current_rel += word.count_ones() as u64;
            }
            storage[base + 1] = relative_ranks;
            total_rank += current_rel;
        }

        // Sentinel
        let last_base = num_blocks * 10;
        storage[last_base] = total_rank;
        let total_zeros = (num_blocks as u64 * 512) - total_rank;
        while total_rank >= next_select1_threshold {
            select1_index.push(num_blocks as u32);
            next_select1_threshold += 512;
        }
        while total_zeros >= next_select0_threshold {
            select0_index.push(num_blocks as u32);
            next_select0_threshold += 512;
        }

        Self {
            storage,
            select1_index,
            select0_index,
            len,
        }
    }

    /// Build a bit vector of length `len` with exactly the given positions set.
    ///
    /// Positions at or beyond `len` are ignored.
    pub fn from_positions(positions: &[u32], len: usize) -> Self {
        let mut words = vec![0u64; len.div_ceil(64)];
        for &p in positions {
            let p = p as usize;
            if p < len {
                words[p / 64] |= 1u64 << (p % 64);
            }
        }
        Self::new(&words, len)
    }

    /// Reconstruct a `BitVector` from its internal parts.
    ///
    /// This is primarily intended for serialization round-trips.
    pub fn from_parts(
        storage: Vec<u64>,
        select1_index: Vec<u32>,
        select0_index: Vec<u32>,
        len: usize,
    ) -> Result<Self> {
        // Minimal structural validation to avoid obvious panics.
        if storage.len() < 10 {
            return Err(Error::InvalidEncoding(
                "bitvec storage too small".to_string(),
            ));
        }
        if storage.len() % 10 != 0 {
            return Err(Error::InvalidEncoding(
                "bitvec storage len must be multiple of 10".to_string(),
            ));
        }
        if storage.len() / 10 != len.div_ceil(512) + 1 {
            return Err(Error::InvalidEncoding(format!(
                "bitvec storage of {} words does not cover {len} bits",
                storage.len()
            )));
        }

        Ok(Self {
            storage,
            select1_index,
            select0_index,
            len,
        })
    }

    /// Serialize this bitvector to a stable binary encoding (little-endian).
    ///
    /// Format (versioned):
    /// - magic: 8 bytes (`SBITBV01`)
    /// - len: u64
    /// - storage_len: u64, then `storage_len` u64 words
    /// - select1_len: u64, then `select1_len` u32 words
    /// - select0_len: u64, then `select0_len` u32 words
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_size());
        out.extend_from_slice(MAGIC);

        out.extend_from_slice(&(self.len as u64).to_le_bytes());

        out.extend_from_slice(&(self.storage.len() as u64).to_le_bytes());
        for &w in &self.storage {
            out.extend_from_slice(&w.to_le_bytes());
        }

        out.extend_from_slice(&(self.select1_index.len() as u64).to_le_bytes());
        for &w in &self.select1_index {
            out.extend_from_slice(&w.to_le_bytes());
        }

        out.extend_from_slice(&(self.select0_index.len() as u64).to_le_bytes());
        for &w in &self.select0_index {
            out.extend_from_slice(&w.to_le_bytes());
        }

        out
    }

    /// Exact length in bytes of [`BitVector::to_bytes`].
    pub fn serialized_size(&self) -> usize {
        8 + 8
            + 8
            + self.storage.len() * 8
            + 8
            + self.select1_index.len() * 4
            + 8
            + self.select0_index.len() * 4
    }

    /// Deserialize a `BitVector` from `to_bytes()` output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);

        if r.take(8)? != MAGIC {
            return Err(Error::InvalidEncoding(
                "bad magic for BitVector".to_string(),
            ));
        }

        let len = r.u64()? as usize;

        let storage_len = r.len_prefix(8)?;
        let mut storage = Vec::with_capacity(storage_len);
        for _ in 0..storage_len {
            storage.push(r.u64()?);
        }

        let select1_len = r.len_prefix(4)?;
        let mut select1_index = Vec::with_capacity(select1_len);
        for _ in 0..select1_len {
            select1_index.push(r.u32()?);
        }

        let select0_len = r.len_prefix(4)?;
        let mut select0_index = Vec::with_capacity(select0_len);
        for _ in 0..select0_len {
            select0_index.push(r.u32()?);
        }

        r.finish("BitVector")?;
        Self::from_parts(storage, select1_index, select0_index, len)
    }

    /// Return the total number of bits in the vector.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Return true if the bit-vector has length 0.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of set bits. O(1): read from the sentinel block header.
    pub fn count_ones(&self) -> usize {
        self.rank1(self.len)
    }

    /// Copy the raw data words out of the interleaved layout.
    pub fn to_words(&self) -> Vec<u64> {
        let n_words = self.len.div_ceil(64);
        (0..n_words)
            .map(|w| self.storage[(w / 8) * 10 + 2 + (w % 8)])
            .collect()
    }

    /// Iterate over the positions of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        let n_words = self.len.div_ceil(64);
        (0..n_words).flat_map(move |w| {
            let mut word = self.storage[(w / 8) * 10 + 2 + (w % 8)];
            std::iter::from_fn(move || {
                if word == 0 {
                    return None;
                }
                let bit = word.trailing_zeros() as usize;
                word &= word - 1;
                Some(w * 64 + bit)
            })
        })
    }

    /// Return true if the bit at index `i` is set.
    pub fn get(&self, i: usize) -> bool {
        if i >= self.len {
            return false;
        }
        let block_idx = i / 512;
        let word_in_block = (i % 512) / 64;
        let bit_in_word = i % 64;
        let word = self.storage[block_idx * 10 + 2 + word_in_block];
        (word & (1u64 << bit_in_word)) != 0
    }

    /// Return the number of set bits in the range [0, i).
    pub fn rank1(&self, i: usize) -> usize {
        if i == 0 {
            return 0;
        }
        let i = i.min(self.len);
        let block_idx = i / 512;
        let sub_block_idx = (i % 512) / 64;
        let bit_offset = i % 64;

        let base = block_idx * 10;
        let mut rank = self.storage[base] as usize;

        if sub_block_idx > 0 {
            let relative_ranks = self.storage[base + 1];
            rank += ((relative_ranks >> (9 * (sub_block_idx - 1))) & 0x1FF) as usize;
        }

        let word = self.storage[base + 2 + sub_block_idx];
        let mask = (1u64 << bit_offset).wrapping_sub(1);
        rank += (word & mask).count_ones() as usize;

        rank
    }

    /// Return the number of unset bits in the range [0, i).
    pub fn rank0(&self, i: usize) -> usize {
        let i = i.min(self.len);
        i - self.rank1(i)
    }

    /// Return the position of the $k$-th set bit (0-indexed).
    pub fn select1(&self, k: usize) -> Option<usize> {
        if k >= self.rank1(self.len) {
            return None;
        }

        let target = k + 1;
        let select_idx = k / 512;
        let mut block_low = self.select1_index[select_idx] as usize;
        let mut block_high = if select_idx + 1 < self.select1_index.len() {
            self.select1_index[select_idx + 1] as usize + 1
        } else {
            self.storage.len() / 10
        };

        while block_low < block_high {
            let mid = block_low + (block_high - block_low) / 2;
            if self.storage[mid * 10] < target as u64 {
                block_low = mid + 1;
            } else {
                block_high = mid;
            }
        }
        let block_idx = block_low - 1;
        let mut remaining_k = target - (self.storage[block_idx * 10] as usize);

        let relative_ranks = self.storage[block_idx * 10 + 1];
        let mut sub_block_idx = 0;
        for j in 1..8 {
            let rel_rank = ((relative_ranks >> (9 * (j - 1))) & 0x1FF) as usize;
            if rel_rank < remaining_k {
                sub_block_idx = j;
            } else {
                break;
            }
        }

        if sub_block_idx > 0 {
            let rel_rank = ((relative_ranks >> (9 * (sub_block_idx - 1))) & 0x1FF) as usize;
            remaining_k -= rel_rank;
        }

        let word = self.storage[block_idx * 10 + 2 + sub_block_idx];
        let pos_in_word = select_in_word(word, remaining_k - 1);
        Some(block_idx * 512 + sub_block_idx * 64 + pos_in_word)
    }

    /// Return the position of the $k$-th unset bit (0-indexed).
    pub fn select0(&self, k: usize) -> Option<usize> {
        if k >= self.rank0(self.len) {
            return None;
        }

        let target = k + 1;
        let select_idx = k / 512;
        let mut block_low = self.select0_index[select_idx] as usize;
        let mut block_high = if select_idx + 1 < self.select0_index.len() {
            self.select0_index[select_idx + 1] as usize + 1
        } else {
            self.storage.len() / 10
        };

        while block_low < block_high {
            let mid = block_low + (block_high - block_low) / 2;
            let rank0_at_mid = (mid * 512) - (self.storage[mid * 10] as usize);
            if rank0_at_mid < target {
                block_low = mid + 1;
            } else {
                block_high = mid;
            }
        }
        let block_idx = block_low - 1;
        let mut remaining_k =
            target - ((block_idx * 512) - (self.storage[block_idx * 10] as usize));

        let relative_ranks1 = self.storage[block_idx * 10 + 1];
        let mut sub_block_idx = 0;
        for j in 1..8 {
            let rel_rank1 = ((relative_ranks1 >> (9 * (j - 1))) & 0x1FF) as usize;
            let rel_rank0 = (j * 64) - rel_rank1;
            if rel_rank0 < remaining_k {
                sub_block_idx = j;
            } else {
                break;
            }
        }

        if sub_block_idx > 0 {
            let rel_rank1 = ((relative_ranks1 >> (9 * (sub_block_idx - 1))) & 0x1FF) as usize;
            let rel_rank0 = (sub_block_idx * 64) - rel_rank1;
            remaining_k -= rel_rank0;
        }

        let word = !self.storage[block_idx * 10 + 2 + sub_block_idx];
        let pos_in_word = select_in_word(word, remaining_k - 1);
        Some(block_idx * 512 + sub_block_idx * 64 + pos_in_word)
    }
}

/// Mask keeping only the bits of data word `idx` that fall below `len`.
fn tail_mask(idx: usize, len: usize) -> u64 {
    let start = idx * 64;
    if start >= len {
        0
    } else if len - start >= 64 {
        !0u64
    } else {
        (1u64 << (len - start)) - 1
    }
}

fn select_in_word(word: u64, k: usize) -> usize {
    #[cfg(all(target_arch = "x86_64", target_feature = "bmi2"))]
    {
        // SAFETY: gated on the bmi2 target feature.
        unsafe {
            let mask = 1u64 << k;
            let res = core::arch::x86_64::_pdep_u64(mask, word);
            return res.trailing_zeros() as usize;
        }
    }

    let mut count = 0;
    for i in 0..64 {
        if (word & (1 << i)) != 0 {
            if count == k {
                return i;
            }
            count += 1;
        }
    }
    63
}

/// Bounds-checked little-endian cursor shared by the binary decoders.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    off: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, off: 0 }
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.bytes.len() - self.off {
            return Err(Error::InvalidEncoding(
                "unexpected end of input".to_string(),
            ));
        }
        let slice = &self.bytes[self.off..self.off + n];
        self.off += n;
        Ok(slice)
    }

    /// Consume and return everything not read yet.
    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.off..];
        self.off = self.bytes.len();
        slice
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a u64 element count and reject counts the remaining input cannot hold.
    pub(crate) fn len_prefix(&mut self, elem_size: usize) -> Result<usize> {
        let n = self.u64()? as usize;
        if n.saturating_mul(elem_size) > self.bytes.len() - self.off {
            return Err(Error::InvalidEncoding(format!(
                "length prefix {n} exceeds remaining input"
            )));
        }
        Ok(n)
    }

    pub(crate) fn finish(self, what: &str) -> Result<()> {
        if self.off != self.bytes.len() {
            return Err(Error::InvalidEncoding(format!(
                "trailing bytes after {what}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitvector_rank_basic() {
        let data = vec![0b1011, 0b1101];
        let bv = BitVector::new(&data, 128);
        assert_eq!(bv.rank1(0), 0);
        assert_eq!(bv.rank1(1), 1);
        assert_eq!(bv.rank1(4), 3);
        assert!(bv.get(0));
        assert!(!bv.get(2));
    }

    #[test]
    fn test_bitvector_select_basic() {
        let data = vec![0b1011];
        let bv = BitVector::new(&data, 64);
        assert_eq!(bv.select1(0), Some(0));
        assert_eq!(bv.select1(1), Some(1));
        assert_eq!(bv.select1(2), Some(3));
        assert_eq!(bv.select1(3), None);

        assert_eq!(bv.select0(0), Some(2));
        assert_eq!(bv.select0(1), Some(4));
    }

    #[test]
    fn bits_past_len_are_dropped() {
        let bv = BitVector::new(&[u64::MAX], 10);
        assert_eq!(bv.count_ones(), 10);
        assert_eq!(bv.to_words(), vec![(1u64 << 10) - 1]);
    }

    #[test]
    fn positions_roundtrip_through_iter_ones() {
        let positions = [0u32, 63, 64, 511, 512, 1000, 4095];
        let bv = BitVector::from_positions(&positions, 4096);
        assert_eq!(bv.count_ones(), positions.len());
        let back: Vec<u32> = bv.iter_ones().map(|p| p as u32).collect();
        assert_eq!(back, positions);
    }

    #[test]
    fn bytes_roundtrip_and_size() {
        let bv = BitVector::from_positions(&[3, 700, 1999], 2000);
        let bytes = bv.to_bytes();
        assert_eq!(bytes.len(), bv.serialized_size());
        let back = BitVector::from_bytes(&bytes).unwrap();
        assert_eq!(back.len(), 2000);
        assert_eq!(back.iter_ones().collect::<Vec<_>>(), vec![3, 700, 1999]);
    }

    #[test]
    fn truncated_bytes_are_rejected() {
        let bytes = BitVector::from_positions(&[1, 2, 3], 64).to_bytes();
        assert!(BitVector::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert!(BitVector::from_bytes(&bad).is_err());
    }
}
