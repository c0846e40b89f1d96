//! Fixed-width bit-vector addresses for hypercube routing.

use crate::types::Rank;

/// Integer ceiling of log2(n). Returns 0 for n <= 1.
pub fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        return 0;
    }
    u32::BITS - (n - 1).leading_zeros()
}

/// Number of Hamming-distance hops between two hypercube ranks.
pub fn hamming_distance(a: Rank, b: Rank) -> u32 {
    (a ^ b).count_ones()
}

/// A rank written as a bit vector, index `i` holding the bit of weight `2^i`.
///
/// Vectors shorter than the cube dimension are zero-padded on the high end,
/// so `[true]` padded to width 3 is rank 1 (`001`), never rank 4.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitAddress {
    bits: Vec<bool>,
}

impl BitAddress {
    /// Encode `rank` into exactly `width` bits.
    ///
    /// Bits of `rank` above `width` are dropped; callers validate the rank
    /// against the world size first.
    pub fn from_rank(rank: Rank, width: u32) -> Self {
        let bits = (0..width).map(|i| (rank >> i) & 1 == 1).collect();
        Self { bits }
    }

    /// Build an address from raw bits (lowest weight first), zero-padding the
    /// high end up to `width`.
    pub fn from_bits(bits: &[bool], width: u32) -> Self {
        let mut bits = bits.to_vec();
        if bits.len() < width as usize {
            bits.resize(width as usize, false);
        }
        Self { bits }
    }

    pub fn width(&self) -> u32 {
        self.bits.len() as u32
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Integer value of the vector.
    pub fn to_rank(&self) -> Rank {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .fold(0, |acc, (i, _)| acc | (1 << i))
    }

    /// Zero-pad the high end up to `width` bits. Never truncates.
    pub fn pad_to(&mut self, width: u32) {
        if self.bits.len() < width as usize {
            self.bits.resize(width as usize, false);
        }
    }

    /// First index (lowest weight) at which the two addresses differ, after
    /// padding both to a common width.
    pub fn first_difference(&self, other: &BitAddress) -> Option<usize> {
        let width = self.bits.len().max(other.bits.len());
        (0..width).find(|&i| self.bit(i) != other.bit(i))
    }

    /// Flip the bit at `index`, padding first if needed.
    pub fn flip(&mut self, index: usize) {
        if index >= self.bits.len() {
            self.bits.resize(index + 1, false);
        }
        self.bits[index] = !self.bits[index];
    }

    /// Number of positions at which the two addresses differ.
    pub fn hamming(&self, other: &BitAddress) -> u32 {
        let width = self.bits.len().max(other.bits.len());
        (0..width).filter(|&i| self.bit(i) != other.bit(i)).count() as u32
    }

    fn bit(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }
}

impl std::fmt::Display for BitAddress {
    /// Most significant bit first, like a binary literal.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.bits.is_empty() {
            return f.write_str("0");
        }
        for set in self.bits.iter().rev() {
            f.write_str(if *set { "1" } else { "0" })?;
        }
        Ok(())
    }
}
