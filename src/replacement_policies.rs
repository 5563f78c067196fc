use crate::cache::Line;

/// A generic trait for implementing new eviction policies. Can be used to parameterise a Cache.
pub trait ReplacementPolicy {
    /// Picks the slot whose line should be discarded to admit a new tag
    ///
    /// Implementations may assume every line in the set is valid: the cache only asks for a
    /// victim once the set has no empty slot left, and may assume the set is non-empty
    ///
    /// Candidates which compare equal must resolve to the lowest slot index among them, which
    /// falls out of a strict-inequality left-to-right scan. This keeps victim selection
    /// deterministic for a given trace
    ///
    /// # Arguments
    ///
    /// * `lines`: the set's lines, in slot order
    ///
    /// returns: usize, the victim's slot index
    fn select_victim(&self, lines: &[Line]) -> usize;
}

/// Least recently used eviction
///
/// The per-line recency counter is aged by the cache on every access to the set which doesn't
/// match that line, so the largest counter marks the line unmatched for the longest stretch of
/// accesses. No state is needed here beyond the lines themselves
#[derive(Default)]
pub struct LeastRecentlyUsed;

impl ReplacementPolicy for LeastRecentlyUsed {
    fn select_victim(&self, lines: &[Line]) -> usize {
        let mut victim = 0;
        let mut max_recency = lines[0].recency_counter;
        for (slot, line) in lines.iter().enumerate().skip(1) {
            if line.recency_counter > max_recency {
                max_recency = line.recency_counter;
                victim = slot;
            }
        }
        victim
    }
}

/// Least frequently used eviction
///
/// Ranks the lines by a two-key comparator: hit counter ascending, then tag ascending. Ties on
/// the hit counter are broken by the smallest tag rather than the slot position, uniformly
/// across the whole set
#[derive(Default)]
pub struct LeastFrequentlyUsed;

impl ReplacementPolicy for LeastFrequentlyUsed {
    fn select_victim(&self, lines: &[Line]) -> usize {
        let mut victim = 0;
        let mut min_key = (lines[0].hit_counter, lines[0].tag);
        for (slot, line) in lines.iter().enumerate().skip(1) {
            let key = (line.hit_counter, line.tag);
            if key < min_key {
                min_key = key;
                victim = slot;
            }
        }
        victim
    }
}

/// Evicts the line holding the smallest tag
#[derive(Default)]
pub struct SmallestTag;

impl ReplacementPolicy for SmallestTag {
    fn select_victim(&self, lines: &[Line]) -> usize {
        let mut victim = 0;
        let mut min_tag = lines[0].tag;
        for (slot, line) in lines.iter().enumerate().skip(1) {
            if line.tag < min_tag {
                min_tag = line.tag;
                victim = slot;
            }
        }
        victim
    }
}

/// Evicts the line holding the largest tag
#[derive(Default)]
pub struct LargestTag;

impl ReplacementPolicy for LargestTag {
    fn select_victim(&self, lines: &[Line]) -> usize {
        let mut victim = 0;
        let mut max_tag = lines[0].tag;
        for (slot, line) in lines.iter().enumerate().skip(1) {
            if line.tag > max_tag {
                max_tag = line.tag;
                victim = slot;
            }
        }
        victim
    }
}
