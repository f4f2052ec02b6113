//! Fork-join stable filter used by the per-frame particle pass
//!
//! The input slice is split by index into two contiguous halves until a half
//! is shorter than the threshold; halves run independently (on rayon workers
//! when the `parallel` feature is on) and each returns its own private index
//! lists. The parent concatenates first-half results before second-half
//! results, so the outcome is the same as a plain left-to-right scan no
//! matter how the work was split.
//!
//! Evaluation only mutates the item being tested. Removing rejected items
//! from the collection happens afterwards on the calling thread, see
//! [`compact`].

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Below this many items a batch is filtered sequentially
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 100;

/// How the filter evaluates the predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum FilterMode {
    /// Recursive fork-join split above the threshold
    #[default]
    Parallel,
    /// Single left-to-right scan on the calling thread
    Sequential,
}

/// Indices of kept and rejected items, both ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub survivors: Vec<usize>,
    pub rejected: Vec<usize>,
    /// Whether any fork happened while producing this outcome
    pub forked: bool,
}

impl FilterOutcome {
    fn with_capacity(len: usize) -> Self {
        Self {
            survivors: Vec::with_capacity(len),
            rejected: Vec::new(),
            forked: false,
        }
    }

    fn append(&mut self, mut other: Self) {
        self.survivors.append(&mut other.survivors);
        self.rejected.append(&mut other.rejected);
        self.forked |= other.forked;
    }
}

/// Evaluate `keep` once per item and classify every index
///
/// `threshold` is clamped to at least 2 so a split always shrinks both halves.
pub fn stable_filter<T, F>(
    items: &mut [T],
    threshold: usize,
    mode: FilterMode,
    keep: &F,
) -> FilterOutcome
where
    T: Send,
    F: Fn(&mut T) -> bool + Sync,
{
    match mode {
        FilterMode::Sequential => filter_sequential(items, 0, keep),
        FilterMode::Parallel => filter_recursive(items, 0, threshold.max(2), keep),
    }
}

fn filter_recursive<T, F>(items: &mut [T], offset: usize, threshold: usize, keep: &F) -> FilterOutcome
where
    T: Send,
    F: Fn(&mut T) -> bool + Sync,
{
    if items.len() < threshold {
        return filter_sequential(items, offset, keep);
    }

    let mid = items.len() / 2;
    let (left, right) = items.split_at_mut(mid);
    let (mut outcome, second) = fork(
        || filter_recursive(left, offset, threshold, keep),
        || filter_recursive(right, offset + mid, threshold, keep),
    );
    outcome.append(second);
    outcome.forked = true;
    outcome
}

fn filter_sequential<T, F>(items: &mut [T], offset: usize, keep: &F) -> FilterOutcome
where
    F: Fn(&mut T) -> bool,
{
    let mut outcome = FilterOutcome::with_capacity(items.len());
    for (i, item) in items.iter_mut().enumerate() {
        if keep(item) {
            outcome.survivors.push(offset + i);
        } else {
            outcome.rejected.push(offset + i);
        }
    }
    outcome
}

#[cfg(feature = "parallel")]
fn fork<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    rayon::join(a, b)
}

#[cfg(not(feature = "parallel"))]
fn fork<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA,
    B: FnOnce() -> RB,
{
    (a(), b())
}

/// Remove the rejected items from `items`, keeping survivors in order
///
/// Rejected items are handed to `on_rejected` in ascending index order.
/// `scratch` is swapped with `items`, so two buffers that live across frames
/// reach a size where compaction stops allocating.
pub fn compact<T>(
    items: &mut Vec<T>,
    scratch: &mut Vec<T>,
    rejected: &[usize],
    mut on_rejected: impl FnMut(T),
) {
    if rejected.is_empty() {
        return;
    }

    scratch.clear();
    scratch.reserve(items.len() - rejected.len());

    let mut next = rejected.iter().copied().peekable();
    for (i, item) in items.drain(..).enumerate() {
        if next.peek() == Some(&i) {
            next.next();
            on_rejected(item);
        } else {
            scratch.push(item);
        }
    }

    std::mem::swap(items, scratch);
}
