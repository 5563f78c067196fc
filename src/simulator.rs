use std::io::BufRead;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cache::{AccessOutcome, Cache, CacheTrait, GenericCache};
use crate::config::{CacheConfig, MalformedLinePolicy, ReplacementPolicyConfig};
use crate::replacement_policies::{LargestTag, LeastFrequentlyUsed, LeastRecentlyUsed, SmallestTag};

lazy_static! {
    // One operation letter, a bare hex address, and a decimal size, e.g. " L 7f3b2c,4"
    static ref EVENT_PATTERN: Regex =
        Regex::new(r"^\s*([A-Za-z])\s+([0-9a-fA-F]+),([0-9]+)\s*$").unwrap();
}

/// One record of the trace. The size is validated by the pattern but unused afterwards, as
/// block contents are not simulated
#[derive(Debug, Clone, Copy)]
struct TraceEvent {
    operation: char,
    address: u64,
    size: u16,
}

/// Parses one trace line, or None if it doesn't have the expected shape
fn parse_event(line: &str) -> Option<TraceEvent> {
    let captures = EVENT_PATTERN.captures(line)?;
    let operation = captures.get(1)?.as_str().chars().next()?;
    let address = u64::from_str_radix(captures.get(2)?.as_str(), 16).ok()?;
    let size = captures.get(3)?.as_str().parse::<u16>().ok()?;
    Some(TraceEvent {
        operation,
        address,
        size,
    })
}

/// The tally of a cache simulation. Can be serialised to a machine-readable summary
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct SimulationResult {
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl SimulationResult {
    fn record_hit(&mut self) {
        self.hits += 1;
    }

    fn record_miss(&mut self) {
        self.misses += 1;
    }

    fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    fn record(&mut self, outcome: AccessOutcome) {
        match outcome {
            AccessOutcome::Hit => self.record_hit(),
            AccessOutcome::Miss => self.record_miss(),
            AccessOutcome::MissEviction => {
                self.record_miss();
                self.record_eviction();
            }
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}

/// The simulator drives one access per load or store and two per modify, and collects results
///
/// It supports calling simulate multiple times, and will update the time taken to simulate and
/// the results accordingly
pub struct Simulator {
    cache: GenericCache,
    result: SimulationResult,
    verbose: bool,
    malformed: MalformedLinePolicy,
    simulation_time: Duration,
}

impl Simulator {
    /// Creates a new simulator for a given configuration, rejecting geometry the address width
    /// can't accommodate
    ///
    /// # Arguments
    ///
    /// * `config`: the cache geometry and policy, usually resulting from the command line
    ///
    /// returns: Result<Simulator, String>
    ///
    /// # Examples
    ///
    /// ```
    /// use csim::config::{CacheConfig, MalformedLinePolicy, ReplacementPolicyConfig};
    /// use csim::simulator::Simulator;
    ///
    /// let config = CacheConfig {
    ///     set_index_bits: 4,
    ///     associativity: 2,
    ///     block_offset_bits: 4,
    ///     policy: ReplacementPolicyConfig::LeastRecentlyUsed,
    ///     malformed: MalformedLinePolicy::Truncate,
    /// };
    /// let mut simulator = Simulator::new(&config).unwrap();
    /// let result = simulator.simulate(" L 2a0,4\n L 2a0,4\n".as_bytes()).unwrap();
    /// assert_eq!(result.hits(), 1);
    /// assert_eq!(result.misses(), 1);
    /// ```
    pub fn new(config: &CacheConfig) -> Result<Self, String> {
        Self::with_verbose(config, false)
    }

    /// As new, but printing a diagnostic line per data access. The diagnostics have no effect
    /// on the counters
    pub fn with_verbose(config: &CacheConfig, verbose: bool) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            cache: Self::config_to_cache(config),
            result: SimulationResult {
                hits: 0,
                misses: 0,
                evictions: 0,
            },
            verbose,
            malformed: config.malformed,
            simulation_time: Duration::new(0, 0),
        })
    }

    /// Replays a trace from a line-oriented reader against the cache
    ///
    /// Loads and stores apply one access each; a modify applies two back-to-back accesses of
    /// the same address, of which the second always hits. Instruction fetches and unrecognised
    /// operation letters are ignored entirely. A line which doesn't have the expected shape
    /// either ends consumption of the remaining trace or is skipped, per the configured
    /// malformed-line policy
    ///
    /// # Arguments
    ///
    /// * `reader`: the trace source
    ///
    /// returns: Result<&SimulationResult, String>
    pub fn simulate<T: BufRead>(&mut self, reader: T) -> Result<&SimulationResult, String> {
        let start = Instant::now();
        for line in reader.lines() {
            let line = line.map_err(|e| format!("Couldn't read from the trace source: {e}"))?;
            if line.trim().is_empty() {
                continue;
            }
            let event = match parse_event(&line) {
                Some(event) => event,
                None => match self.malformed {
                    MalformedLinePolicy::Truncate => break,
                    MalformedLinePolicy::Skip => continue,
                },
            };
            self.dispatch(&event);
        }
        self.simulation_time += start.elapsed();
        Ok(&self.result)
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of lines the replay never filled
    pub fn get_invalid_line_count(&self) -> usize {
        self.cache.get_invalid_line_count()
    }

    fn dispatch(&mut self, event: &TraceEvent) {
        match event.operation {
            'L' | 'S' => {
                let outcome = self.apply_access(event.address);
                if self.verbose {
                    println!(
                        "{} {:x},{} {}",
                        event.operation,
                        event.address,
                        event.size,
                        outcome_label(outcome)
                    );
                }
            }
            'M' => {
                // A modify touches its address twice; the first access leaves the matching tag
                // resident, so the second always hits
                let first = self.apply_access(event.address);
                let second = self.apply_access(event.address);
                if self.verbose {
                    println!(
                        "M {:x},{} {} {}",
                        event.address,
                        event.size,
                        outcome_label(first),
                        outcome_label(second)
                    );
                }
            }
            // Instruction fetches, and any other operation letter, don't touch the cache
            _ => {}
        }
    }

    fn apply_access(&mut self, address: u64) -> AccessOutcome {
        let outcome = self.cache.access_and_update_line(address);
        self.result.record(outcome);
        outcome
    }

    /// Creates a new cache from a cache configuration
    fn config_to_cache(config: &CacheConfig) -> GenericCache {
        match config.policy {
            ReplacementPolicyConfig::LeastRecentlyUsed => {
                GenericCache::from(Cache::new(config, LeastRecentlyUsed))
            }
            ReplacementPolicyConfig::LeastFrequentlyUsed => {
                GenericCache::from(Cache::new(config, LeastFrequentlyUsed))
            }
            ReplacementPolicyConfig::SmallestTag => {
                GenericCache::from(Cache::new(config, SmallestTag))
            }
            ReplacementPolicyConfig::LargestTag => {
                GenericCache::from(Cache::new(config, LargestTag))
            }
        }
    }
}

fn outcome_label(outcome: AccessOutcome) -> &'static str {
    match outcome {
        AccessOutcome::Hit => "hit",
        AccessOutcome::Miss => "miss",
        AccessOutcome::MissEviction => "miss eviction",
    }
}
