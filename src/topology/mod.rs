//! Rank adjacency and deterministic next-hop routing.
//!
//! Every function here is pure: a [`Topology`] is derived from the kind and
//! world size alone, so every rank computes identical neighbor sets and
//! routes without exchanging messages.

pub mod address;

use crate::error::{CollError, Result};
use crate::types::Rank;
use address::{BitAddress, ceil_log2};

/// Logical adjacency structure constraining which ranks talk directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TopologyKind {
    /// Ranks differing in exactly one address bit. Power-of-two worlds only.
    Hypercube,
    /// Heap-ordered binary tree rooted at rank 0.
    BinaryTree,
    /// Chain 0 - 1 - ... - (P-1).
    Line,
    /// Rank 0 is the hub, every other rank a spoke.
    Star,
    /// Square grid without wraparound. Perfect-square worlds only.
    Grid2D,
    /// Square grid with wraparound. Perfect-square worlds only.
    Torus,
    /// Every rank adjacent to every other.
    #[default]
    Complete,
}

impl TopologyKind {
    pub const ALL: [TopologyKind; 7] = [
        TopologyKind::Hypercube,
        TopologyKind::BinaryTree,
        TopologyKind::Line,
        TopologyKind::Star,
        TopologyKind::Grid2D,
        TopologyKind::Torus,
        TopologyKind::Complete,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            TopologyKind::Hypercube => "hypercube",
            TopologyKind::BinaryTree => "binary_tree",
            TopologyKind::Line => "line",
            TopologyKind::Star => "star",
            TopologyKind::Grid2D => "grid2d",
            TopologyKind::Torus => "torus",
            TopologyKind::Complete => "complete",
        }
    }

    /// Whether `world_size` satisfies this kind's structural precondition.
    pub fn supports(self, world_size: u32) -> bool {
        if world_size == 0 {
            return false;
        }
        match self {
            TopologyKind::Hypercube => world_size.is_power_of_two(),
            TopologyKind::Grid2D | TopologyKind::Torus => square_side(world_size).is_some(),
            TopologyKind::BinaryTree
            | TopologyKind::Line
            | TopologyKind::Star
            | TopologyKind::Complete => true,
        }
    }
}

impl std::fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for TopologyKind {
    type Err = CollError;

    /// Formats: "hypercube", "binary_tree", "line", "star", "grid2d",
    /// "torus", "complete". Case-insensitive; `-` is accepted for `_`.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        TopologyKind::ALL
            .into_iter()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| CollError::InvalidConfig(format!("unknown topology {s:?}")))
    }
}

/// Side length of a square grid holding exactly `n` cells.
fn square_side(n: u32) -> Option<u32> {
    let n = n as u64;
    let mut side = (n as f64).sqrt() as u64;
    while side * side > n {
        side -= 1;
    }
    while (side + 1) * (side + 1) <= n {
        side += 1;
    }
    (side * side == n).then_some(side as u32)
}

/// A validated topology over a fixed world size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    kind: TopologyKind,
    world_size: u32,
    /// Grid side length; 0 for non-grid kinds.
    side: u32,
    /// Hypercube dimension; 0 for non-cube kinds.
    dimension: u32,
}

impl Topology {
    /// Build a topology, rejecting world sizes that violate the kind's
    /// structural precondition.
    pub fn new(kind: TopologyKind, world_size: u32) -> Result<Self> {
        if !kind.supports(world_size) {
            return Err(CollError::InvalidTopologySize { kind, world_size });
        }
        let side = match kind {
            TopologyKind::Grid2D | TopologyKind::Torus => square_side(world_size).unwrap_or(0),
            _ => 0,
        };
        let dimension = match kind {
            TopologyKind::Hypercube => ceil_log2(world_size),
            _ => 0,
        };
        Ok(Self {
            kind,
            world_size,
            side,
            dimension,
        })
    }

    pub fn kind(&self) -> TopologyKind {
        self.kind
    }

    pub fn world_size(&self) -> u32 {
        self.world_size
    }

    /// Grid side length (0 unless Grid2D or Torus).
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Address width in bits (0 unless Hypercube).
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    pub fn check_rank(&self, rank: Rank) -> Result<()> {
        if rank >= self.world_size {
            return Err(CollError::RankOutOfRange {
                rank,
                world_size: self.world_size,
            });
        }
        Ok(())
    }

    /// Direct neighbors of `rank`, ascending, without `rank` itself.
    pub fn neighbors(&self, rank: Rank) -> Result<Vec<Rank>> {
        self.check_rank(rank)?;
        let p = self.world_size;
        let mut out: Vec<Rank> = match self.kind {
            TopologyKind::Complete => (0..p).filter(|&r| r != rank).collect(),
            TopologyKind::Star => {
                if rank == 0 {
                    (1..p).collect()
                } else {
                    vec![0]
                }
            }
            TopologyKind::Line => [rank.checked_sub(1), Some(rank + 1)]
                .into_iter()
                .flatten()
                .filter(|&r| r < p)
                .collect(),
            TopologyKind::BinaryTree => {
                let mut n: Vec<Rank> = [2 * rank + 1, 2 * rank + 2]
                    .into_iter()
                    .filter(|&c| c < p)
                    .collect();
                if rank > 0 {
                    n.push((rank - 1) / 2);
                }
                n
            }
            TopologyKind::Hypercube => (0..self.dimension)
                .map(|b| {
                    let mut addr = BitAddress::from_rank(rank, self.dimension);
                    addr.flip(b as usize);
                    addr.to_rank()
                })
                .collect(),
            TopologyKind::Grid2D | TopologyKind::Torus => self.grid_neighbors(rank),
        };
        out.sort_unstable();
        out.dedup();
        out.retain(|&r| r != rank);
        Ok(out)
    }

    fn grid_neighbors(&self, rank: Rank) -> Vec<Rank> {
        let side = self.side;
        let (row, col) = (rank / side, rank % side);
        let wrap = self.kind == TopologyKind::Torus;
        let mut out = Vec::with_capacity(4);
        let steps: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        for (dr, dc) in steps {
            let (mut r, mut c) = (row as i64 + dr, col as i64 + dc);
            if wrap {
                r = r.rem_euclid(side as i64);
                c = c.rem_euclid(side as i64);
            } else if r < 0 || c < 0 || r >= side as i64 || c >= side as i64 {
                continue;
            }
            out.push(r as u32 * side + c as u32);
        }
        out
    }

    /// Whether `a` and `b` share a direct link.
    pub fn is_neighbor(&self, a: Rank, b: Rank) -> bool {
        self.neighbors(a).is_ok_and(|n| n.binary_search(&b).is_ok())
    }

    /// Whether every other rank is a direct neighbor of `root`.
    pub fn is_direct_fanout(&self, root: Rank) -> bool {
        self.neighbors(root)
            .is_ok_and(|n| n.len() as u32 + 1 == self.world_size)
    }

    /// The adjacent rank a frame at `source` must move to next on its way
    /// to `destination`. Returns `source` when the two are equal.
    pub fn next_hop(&self, source: Rank, destination: Rank) -> Result<Rank> {
        self.check_rank(source)?;
        self.check_rank(destination)?;
        if source == destination {
            return Ok(source);
        }
        let hop = match self.kind {
            TopologyKind::Complete => destination,
            TopologyKind::Star => {
                if source == 0 || destination == 0 {
                    destination
                } else {
                    0
                }
            }
            TopologyKind::Line => {
                if destination > source {
                    source + 1
                } else {
                    source - 1
                }
            }
            TopologyKind::BinaryTree => tree_next_hop(source, destination),
            TopologyKind::Hypercube => {
                let mut here = BitAddress::from_rank(source, self.dimension);
                let there = BitAddress::from_rank(destination, self.dimension);
                match here.first_difference(&there) {
                    Some(bit) => {
                        here.flip(bit);
                        here.to_rank()
                    }
                    None => source,
                }
            }
            TopologyKind::Grid2D | TopologyKind::Torus => self.grid_next_hop(source, destination),
        };
        Ok(hop)
    }

    /// Dimension-ordered routing: fix the column first, then the row.
    fn grid_next_hop(&self, source: Rank, destination: Rank) -> Rank {
        let side = self.side;
        let (row, col) = (source / side, source % side);
        let (drow, dcol) = (destination / side, destination % side);
        if col != dcol {
            let c = self.grid_step(col, dcol);
            row * side + c
        } else {
            let r = self.grid_step(row, drow);
            r * side + col
        }
    }

    /// One step along a single grid axis. On a torus the shorter wrap
    /// direction wins; ties go the increasing way.
    fn grid_step(&self, from: u32, to: u32) -> u32 {
        let side = self.side;
        if self.kind == TopologyKind::Torus {
            let forward = (to + side - from) % side;
            let backward = side - forward;
            if forward <= backward {
                (from + 1) % side
            } else {
                (from + side - 1) % side
            }
        } else if to > from {
            from + 1
        } else {
            from - 1
        }
    }

    /// Full route from `source` to `destination`, both endpoints included.
    pub fn path(&self, source: Rank, destination: Rank) -> Result<Vec<Rank>> {
        self.check_rank(source)?;
        self.check_rank(destination)?;
        let mut path = vec![source];
        let mut here = source;
        while here != destination {
            let next = self.next_hop(here, destination)?;
            if path.len() > self.world_size as usize || path.contains(&next) {
                return Err(CollError::collective(
                    "route",
                    here,
                    format!("routing loop toward {destination} via {path:?}"),
                ));
            }
            path.push(next);
            here = next;
        }
        Ok(path)
    }

    /// Number of links a frame crosses between two ranks.
    pub fn hop_count(&self, source: Rank, destination: Rank) -> Result<u32> {
        Ok(self.path(source, destination)?.len() as u32 - 1)
    }

    /// Longest route, in hops, between any two ranks.
    pub fn diameter(&self) -> u32 {
        let p = self.world_size;
        (0..p)
            .flat_map(|s| (0..p).map(move |d| (s, d)))
            .filter_map(|(s, d)| self.hop_count(s, d).ok())
            .max()
            .unwrap_or(0)
    }
}

/// Next hop in the heap-ordered tree: down toward `destination` if it lives
/// in `source`'s subtree, otherwise up to the parent.
fn tree_next_hop(source: Rank, destination: Rank) -> Rank {
    let mut cur = destination;
    while cur > source {
        let parent = (cur - 1) / 2;
        if parent == source {
            return cur;
        }
        cur = parent;
    }
    // source is not an ancestor, so it is not the root either
    (source - 1) / 2
}
