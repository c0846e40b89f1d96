//! Recursive halving over logical ranks.
//!
//! The holder of the logical range `[lo, hi)` keeps `[lo, mid)` and hands
//! `[mid, hi)` to logical rank `mid`, where `mid = lo + ceil((hi - lo) / 2)`.
//! Scatter walks the resulting tree top-down; gather walks it bottom-up.

use crate::types::Rank;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HalvingPlan {
    /// Logical rank this rank receives its range from (`None` for the root).
    pub parent: Option<Rank>,
    /// Logical range this rank holds once it has received.
    pub span: Range<Rank>,
    /// Hand-offs in scatter order, largest range first.
    pub children: Vec<(Rank, Range<Rank>)>,
}

pub(crate) fn halving_plan(world: u32, me: Rank) -> HalvingPlan {
    let (mut lo, mut hi) = (0, world);
    let mut parent = None;
    let mut span = 0..world;
    let mut children = Vec::new();

    while hi - lo > 1 {
        let mid = lo + (hi - lo).div_ceil(2);
        if me < mid {
            if me == lo {
                children.push((mid, mid..hi));
            }
            hi = mid;
        } else {
            if me == mid {
                parent = Some(lo);
                span = mid..hi;
            }
            lo = mid;
        }
    }

    HalvingPlan {
        parent,
        span,
        children,
    }
}
