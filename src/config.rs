use clap::ValueEnum;
use serde::Deserialize;

/// The width of the simulated addresses, in bits
pub const ADDRESS_WIDTH: u32 = u64::BITS;

/// The geometry and policy for a single set-associative cache
///
/// `set_index_bits` and `block_offset_bits` are exponents: the cache has `2^s` sets of
/// `associativity` lines each, with `2^b` byte blocks
#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    pub set_index_bits: u32,
    pub associativity: u32,
    pub block_offset_bits: u32,
    pub policy: ReplacementPolicyConfig,
    #[serde(default = "MalformedLinePolicy::default")]
    pub malformed: MalformedLinePolicy,
}

impl CacheConfig {
    /// The number of sets, `2^set_index_bits`
    pub fn set_count(&self) -> u64 {
        1u64 << self.set_index_bits
    }

    /// Checks the geometry before any cache is allocated
    ///
    /// The set index and block offset must leave at least one tag bit in the address, and a set
    /// must hold at least one line so every miss has a fill-or-evict outcome
    pub fn validate(&self) -> Result<(), String> {
        if self.set_index_bits as u64 + self.block_offset_bits as u64 >= ADDRESS_WIDTH as u64 {
            return Err(format!(
                "Set index bits ({}) plus block offset bits ({}) must be less than the address width ({ADDRESS_WIDTH})",
                self.set_index_bits, self.block_offset_bits
            ));
        }
        if self.associativity == 0 {
            return Err("Associativity must be at least 1".to_string());
        }
        Ok(())
    }
}

/// The eviction policy - lru, lfu, low (smallest tag), or hig (largest tag)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, ValueEnum)]
pub enum ReplacementPolicyConfig {
    #[serde(alias = "lru")]
    #[value(name = "lru")]
    LeastRecentlyUsed,
    #[serde(alias = "lfu")]
    #[value(name = "lfu")]
    LeastFrequentlyUsed,
    #[serde(alias = "low")]
    #[value(name = "low")]
    SmallestTag,
    #[serde(alias = "hig")]
    #[value(name = "hig")]
    LargestTag,
}

/// What the trace dispatcher does with a line that doesn't parse
///
/// Truncate silently stops consuming the rest of the file, matching the historical behavior.
/// Skip moves on to the next line. Defaults to Truncate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, ValueEnum)]
pub enum MalformedLinePolicy {
    #[serde(alias = "truncate")]
    #[value(name = "truncate")]
    Truncate,
    #[serde(alias = "skip")]
    #[value(name = "skip")]
    Skip,
}

impl Default for MalformedLinePolicy {
    fn default() -> Self {
        MalformedLinePolicy::Truncate
    }
}
