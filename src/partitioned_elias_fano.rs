//! Partitioned Elias–Fano for clustered monotone sequences.
//!
//! Intuition: plain Elias–Fano chooses a single `L = floor(log2(U/n))` based on the *global*
//! universe size. If a sequence is locally clustered (the Zipfian workloads are the extreme
//! case: almost everything lands in a short prefix), using a single global `L` wastes bits.
//! Partitioned Elias–Fano splits the sequence into blocks and encodes each block with its own
//! local universe, improving compression while preserving fast random access via per-block
//! decoding.
//!
//! This implementation is intentionally simple:
//! - blocks are encoded as independent `EliasFano` structures over values shifted by the block base
//! - access is `O(1)` block indexing + `O(1)` `EliasFano::get`
//! - serialization is stable and versioned
//!
//! It assumes the input values are sorted (monotone) and all `< universe_size`.

use crate::bitvec::ByteReader;
use crate::elias_fano::EliasFano;
use crate::error::{Error, Result};

const MAGIC: &[u8; 8] = b"SBITPEF1";

/// Partitioned Elias–Fano encoding.
#[derive(Debug, Clone)]
pub struct PartitionedEliasFano {
    universe_size: u32,
    block_size: usize,
    n: usize,
    bases: Vec<u32>,
    blocks: Vec<EliasFano>,
}

impl PartitionedEliasFano {
    /// Build a partitioned Elias–Fano structure from a sorted sequence.
    ///
    /// `block_size` is the maximum number of items per block (must be >= 1; values 64–256 are
    /// typical engineering choices).
    #[must_use]
    pub fn new(values: &[u32], universe_size: u32, block_size: usize) -> Self {
        let n = values.len();
        let block_size = block_size.max(1);

        let mut bases = Vec::with_capacity(n.div_ceil(block_size));
        let mut blocks = Vec::with_capacity(n.div_ceil(block_size));
        for chunk in values.chunks(block_size) {
            let base = chunk[0];
            let last = chunk[chunk.len() - 1];
            let local_u = (last - base).saturating_add(1);
            let rel: Vec<u32> = chunk.iter().map(|&v| v - base).collect();
            bases.push(base);
            blocks.push(EliasFano::new(&rel, local_u));
        }

        Self {
            universe_size,
            block_size,
            n,
            bases,
            blocks,
        }
    }

    /// Return the universe size used to build this structure.
    #[must_use]
    pub fn universe_size(&self) -> u32 {
        self.universe_size
    }

    /// Return the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Return true if the sequence is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Maximum number of values per block.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks.
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Return the value at index `i`.
    pub fn get(&self, i: usize) -> Result<u32> {
        if i >= self.n {
            return Err(Error::IndexOutOfBounds(i));
        }
        let b = i / self.block_size;
        let off = i % self.block_size;
        let base = *self
            .bases
            .get(b)
            .ok_or(Error::InvalidEncoding("missing block base".to_string()))?;
        let block = self
            .blocks
            .get(b)
            .ok_or(Error::InvalidEncoding("missing block".to_string()))?;
        let rel = block.get(off)?;
        Ok(base + rel)
    }

    /// Decode all values in order, one block at a time.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.bases
            .iter()
            .zip(&self.blocks)
            .flat_map(|(&base, block)| block.iter().map(move |rel| base + rel))
    }

    /// Serialize this partitioned structure to a stable binary encoding (little-endian).
    ///
    /// Format (versioned):
    /// - magic: 8 bytes (`SBITPEF1`)
    /// - universe_size: u32
    /// - block_size: u32
    /// - n: u64
    /// - num_blocks: u64
    /// - bases: `num_blocks` u32
    /// - blocks: for each block: len_bytes u64, then `len_bytes` bytes (EliasFano::to_bytes)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_size());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.universe_size.to_le_bytes());
        out.extend_from_slice(&(self.block_size as u32).to_le_bytes());
        out.extend_from_slice(&(self.n as u64).to_le_bytes());
        out.extend_from_slice(&(self.blocks.len() as u64).to_le_bytes());

        for &b in &self.bases {
            out.extend_from_slice(&b.to_le_bytes());
        }
        for blk in &self.blocks {
            let bytes = blk.to_bytes();
            out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
            out.extend_from_slice(&bytes);
        }
        out
    }

    /// Exact length in bytes of [`PartitionedEliasFano::to_bytes`].
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        8 + 4
            + 4
            + 8
            + 8
            + self.bases.len() * 4
            + self
                .blocks
                .iter()
                .map(|b| 8 + b.serialized_size())
                .sum::<usize>()
    }

    /// Deserialize a partitioned Elias–Fano structure from `to_bytes()` output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);

        if r.take(8)? != MAGIC {
            return Err(Error::InvalidEncoding(
                "bad magic for PartitionedEliasFano".to_string(),
            ));
        }

        let universe_size = r.u32()?;
        let block_size = r.u32()? as usize;
        let n = r.u64()? as usize;
        // Bound allocation against total input to prevent allocation bombs.
        let num_blocks = r.len_prefix(4)?;

        let mut bases = Vec::with_capacity(num_blocks);
        for _ in 0..num_blocks {
            bases.push(r.u32()?);
        }

        let mut blocks = Vec::with_capacity(num_blocks);
        for _ in 0..num_blocks {
            let len_bytes = r.len_prefix(1)?;
            blocks.push(EliasFano::from_bytes(r.take(len_bytes)?)?);
        }

        r.finish("PartitionedEliasFano")?;
        if block_size == 0 {
            return Err(Error::InvalidEncoding(
                "block_size must be >= 1".to_string(),
            ));
        }

        // Validate n against block contents.
        let actual_n: usize = blocks.iter().map(|b| b.len()).sum();
        if actual_n != n {
            return Err(Error::InvalidEncoding(format!(
                "PEF n ({n}) does not match sum of block lengths ({actual_n})"
            )));
        }

        Ok(Self {
            universe_size,
            block_size,
            n,
            bases,
            blocks,
        })
    }
}
