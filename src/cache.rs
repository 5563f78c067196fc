use crate::config::CacheConfig;
use crate::replacement_policies::{LargestTag, LeastFrequentlyUsed, LeastRecentlyUsed, ReplacementPolicy, SmallestTag};

/// A single cache line
///
/// Created invalid with all counters zero; overwritten on eviction, never destroyed individually.
/// `recency_counter` counts accesses to the set since this line last matched, so a strictly
/// higher value means strictly less recently used. `hit_counter` counts how often the line has
/// matched and is the frequency signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub valid: bool,
    pub tag: u64,
    pub recency_counter: u64,
    pub hit_counter: u64,
}

impl Line {
    fn empty() -> Self {
        Self {
            valid: false,
            tag: 0,
            recency_counter: 0,
            hit_counter: 0,
        }
    }
}

/// An ordered, index-stable group of lines. The slot position encodes line identity for the
/// policies' tie-breaks
#[derive(Debug)]
pub struct Set {
    lines: Vec<Line>,
}

impl Set {
    fn new(associativity: u32) -> Self {
        Self {
            lines: vec![Line::empty(); associativity as usize],
        }
    }
}

/// The classification of one simulated access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit,
    Miss,
    MissEviction,
}

/// A generic trait for caches
///
/// Technically not required as we're using static dispatch to speed things up instead of dyn
/// Cache, but this gives flexibility for the future with no overhead
pub trait CacheTrait {
    /// Converts an address into a set index and a tag
    ///
    /// The set index can be used directly as an index into the collection of sets
    ///
    /// The tag keeps the full remaining width of the address above the set index bits
    ///
    /// # Arguments
    ///
    /// * `input`: the accessed address
    ///
    /// returns: (u64, u64)
    fn address_to_set_and_tag(&self, input: u64) -> (u64, u64);

    /// Applies one access to the cache, classifying it as a hit, a miss which fills an empty
    /// line, or a miss which evicts a victim
    ///
    /// The implementation must update the per-line counters so the eviction policies can rank
    /// the lines on the next miss
    ///
    /// # Arguments
    ///
    /// * `input`: the accessed address
    ///
    /// returns: AccessOutcome
    fn access_and_update_line(&mut self, input: u64) -> AccessOutcome;

    /// Gets the number of lines which have never been filled. Useful for analysing cache
    /// utilisation or debugging
    fn get_invalid_line_count(&self) -> usize;
}

/// A generic cache implementation, parameterised by an eviction policy
///
/// The general approach here is to have one solid implementation which is easy to maintain and
/// expand with more eviction policies without compromising too much on performance
///
/// To facilitate this we rely on Rust's monomorphisation and the inlining of the policy's victim
/// selection to provide performance close to on par with writing a specialised implementation
/// for each cache type
pub struct Cache<R: ReplacementPolicy> {
    sets: Vec<Set>,
    set_selection_bit_mask: u64,
    tag_shift: u32,
    block_offset_bits: u32,
    replacement_policy: R,
}

impl<R: ReplacementPolicy> Cache<R> {
    /// Allocates `2^set_index_bits` sets of `associativity` invalid lines each
    ///
    /// The config must have been validated; the shifts assume the set index and block offset
    /// fit the address width
    pub fn new(config: &CacheConfig, policy: R) -> Self {
        let set_count = config.set_count();
        Self {
            sets: (0..set_count).map(|_| Set::new(config.associativity)).collect(),
            set_selection_bit_mask: set_count - 1,
            tag_shift: config.block_offset_bits + config.set_index_bits,
            block_offset_bits: config.block_offset_bits,
            replacement_policy: policy,
        }
    }

    /// A read-only view of one set's lines, in slot order
    pub fn lines(&self, set_index: u64) -> &[Line] {
        &self.sets[set_index as usize].lines
    }

    /// The number of sets in the cache
    pub fn set_count(&self) -> u64 {
        self.sets.len() as u64
    }
}

impl<R: ReplacementPolicy> CacheTrait for Cache<R> {
    fn address_to_set_and_tag(&self, input: u64) -> (u64, u64) {
        (
            (input >> self.block_offset_bits) & self.set_selection_bit_mask,
            input >> self.tag_shift,
        )
    }

    fn access_and_update_line(&mut self, input: u64) -> AccessOutcome {
        let (set_index, tag) = self.address_to_set_and_tag(input);
        let lines = &mut self.sets[set_index as usize].lines;
        // One slot-order scan: find a resident tag and the first empty slot, and age every
        // valid line that doesn't match. The recency counter measures accesses elapsed since
        // the line last matched, so aging happens on hits and misses alike
        let mut hit_index = None;
        let mut first_empty_index = None;
        for (slot, line) in lines.iter_mut().enumerate() {
            if line.valid && line.tag == tag {
                hit_index = Some(slot);
            } else if !line.valid {
                if first_empty_index.is_none() {
                    first_empty_index = Some(slot);
                }
            } else {
                line.recency_counter += 1;
            }
        }
        if let Some(slot) = hit_index {
            let line = &mut lines[slot];
            line.recency_counter = 0;
            line.hit_counter += 1;
            return AccessOutcome::Hit;
        }
        if let Some(slot) = first_empty_index {
            lines[slot] = Line {
                valid: true,
                tag,
                recency_counter: 0,
                hit_counter: 0,
            };
            return AccessOutcome::Miss;
        }
        // Set full, all lines valid: the policy picks the victim
        let victim = self.replacement_policy.select_victim(lines);
        lines[victim] = Line {
            valid: true,
            tag,
            recency_counter: 0,
            hit_counter: 0,
        };
        AccessOutcome::MissEviction
    }

    fn get_invalid_line_count(&self) -> usize {
        self.sets
            .iter()
            .flat_map(|set| set.lines.iter())
            .filter(|line| !line.valid)
            .count()
    }
}

/// Enum for all 4 types of cache provided by the library
///
/// Using trait objects in Rust reduces boilerplate, but it is surprisingly slow, as this is
/// completely opaque to the compiler
///
/// For most cases this isn't an issue, but for our use case we would be de-referencing for each
/// line in the input file, which imposes significant overhead
///
/// It's much faster to explicitly branch on all implementations, as the compiler can reason
/// about the concrete types, perform function inlining etc
pub enum GenericCache {
    LeastRecentlyUsed(Cache<LeastRecentlyUsed>),
    LeastFrequentlyUsed(Cache<LeastFrequentlyUsed>),
    SmallestTag(Cache<SmallestTag>),
    LargestTag(Cache<LargestTag>),
}

impl From<Cache<LeastRecentlyUsed>> for GenericCache {
    fn from(value: Cache<LeastRecentlyUsed>) -> Self {
        Self::LeastRecentlyUsed(value)
    }
}

impl From<Cache<LeastFrequentlyUsed>> for GenericCache {
    fn from(value: Cache<LeastFrequentlyUsed>) -> Self {
        Self::LeastFrequentlyUsed(value)
    }
}

impl From<Cache<SmallestTag>> for GenericCache {
    fn from(value: Cache<SmallestTag>) -> Self {
        Self::SmallestTag(value)
    }
}

impl From<Cache<LargestTag>> for GenericCache {
    fn from(value: Cache<LargestTag>) -> Self {
        Self::LargestTag(value)
    }
}

impl CacheTrait for GenericCache {
    fn address_to_set_and_tag(&self, input: u64) -> (u64, u64) {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.address_to_set_and_tag(input),
            GenericCache::LeastFrequentlyUsed(c) => c.address_to_set_and_tag(input),
            GenericCache::SmallestTag(c) => c.address_to_set_and_tag(input),
            GenericCache::LargestTag(c) => c.address_to_set_and_tag(input),
        }
    }

    fn access_and_update_line(&mut self, input: u64) -> AccessOutcome {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.access_and_update_line(input),
            GenericCache::LeastFrequentlyUsed(c) => c.access_and_update_line(input),
            GenericCache::SmallestTag(c) => c.access_and_update_line(input),
            GenericCache::LargestTag(c) => c.access_and_update_line(input),
        }
    }

    fn get_invalid_line_count(&self) -> usize {
        match self {
            GenericCache::LeastRecentlyUsed(c) => c.get_invalid_line_count(),
            GenericCache::LeastFrequentlyUsed(c) => c.get_invalid_line_count(),
            GenericCache::SmallestTag(c) => c.get_invalid_line_count(),
            GenericCache::LargestTag(c) => c.get_invalid_line_count(),
        }
    }
}
