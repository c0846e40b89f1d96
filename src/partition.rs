//! Contiguous shard layout shared by scatter and gather.
//!
//! `N` elements over `P` ranks: the first `N % P` ranks hold `N / P + 1`
//! elements, the rest `N / P`. Both the sending and the receiving side
//! derive the layout from `(N, P)` alone.

use crate::error::{CollError, Result};
use crate::types::Rank;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    sizes: Vec<usize>,
    offsets: Vec<usize>,
    total: usize,
}

impl Partition {
    pub fn new(total: usize, world_size: u32) -> Self {
        let world = world_size as usize;
        if world == 0 {
            return Self {
                sizes: Vec::new(),
                offsets: Vec::new(),
                total,
            };
        }
        let base = total / world;
        let extra = total % world;
        let sizes: Vec<usize> = (0..world)
            .map(|i| if i < extra { base + 1 } else { base })
            .collect();
        let offsets = sizes
            .iter()
            .scan(0usize, |acc, &s| {
                let start = *acc;
                *acc += s;
                Some(start)
            })
            .collect();
        Self {
            sizes,
            offsets,
            total,
        }
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Total element count `N`.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn world_size(&self) -> u32 {
        self.sizes.len() as u32
    }

    /// Element count of `rank`'s shard (0 for ranks outside the world).
    pub fn size(&self, rank: Rank) -> usize {
        self.sizes.get(rank as usize).copied().unwrap_or(0)
    }

    /// Start index of `rank`'s shard.
    pub fn offset(&self, rank: Rank) -> usize {
        self.offsets
            .get(rank as usize)
            .copied()
            .unwrap_or(self.total)
    }

    /// Index range of `rank`'s shard within the full buffer.
    pub fn shard(&self, rank: Rank) -> Range<usize> {
        let start = self.offset(rank);
        start..start + self.size(rank)
    }

    /// Combined element count of a set of ranks.
    pub fn span(&self, ranks: impl IntoIterator<Item = Rank>) -> usize {
        ranks.into_iter().map(|r| self.size(r)).sum()
    }

    /// Check that a caller-supplied local buffer matches `rank`'s shard.
    pub fn check_local(&self, rank: Rank, actual: usize) -> Result<()> {
        let expected = self.size(rank);
        if actual != expected {
            return Err(CollError::PartitionMismatch {
                rank,
                expected,
                actual,
            });
        }
        Ok(())
    }
}
