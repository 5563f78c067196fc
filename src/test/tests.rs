use crate::cache::{AccessOutcome, Cache, CacheTrait};
use crate::config::{CacheConfig, MalformedLinePolicy, ReplacementPolicyConfig};
use crate::kernel::{grand_sum_blocked, grand_sum_naive};
use crate::replacement_policies::{
    LargestTag, LeastFrequentlyUsed, LeastRecentlyUsed, ReplacementPolicy, SmallestTag,
};
use crate::simulator::{SimulationResult, Simulator};
use crate::util::{data_access_count, mixed_trace};

fn config(s: u32, e: u32, b: u32, policy: ReplacementPolicyConfig) -> CacheConfig {
    CacheConfig {
        set_index_bits: s,
        associativity: e,
        block_offset_bits: b,
        policy,
        malformed: MalformedLinePolicy::Truncate,
    }
}

fn run(config: &CacheConfig, trace: &str) -> (u64, u64, u64) {
    let mut simulator = Simulator::new(config).unwrap();
    let result = simulator.simulate(trace.as_bytes()).unwrap();
    (result.hits(), result.misses(), result.evictions())
}

#[test]
fn single_set_direct_mapped_conflicts_on_every_access() {
    // One set, one line: 0x0 and 0x10 fight over the only slot
    let trace = " L 0,1\n L 10,1\n L 0,1\n";
    let counts = run(&config(0, 1, 0, ReplacementPolicyConfig::LeastRecentlyUsed), trace);
    assert_eq!(counts, (0, 3, 2));
}

#[test]
fn distinct_sets_do_not_conflict() {
    // With one offset bit, addresses 0x0 and 0x2 land in different sets, so the third access
    // finds its line still resident
    let trace = " L 0,1\n L 2,1\n L 0,1\n";
    let counts = run(&config(1, 1, 1, ReplacementPolicyConfig::LeastRecentlyUsed), trace);
    assert_eq!(counts, (1, 2, 0));
}

#[test]
fn repeated_access_of_one_address_misses_then_hits() {
    let trace = " S 7f3b2c,4\n L 7f3b2c,4\n";
    let counts = run(&config(4, 1, 4, ReplacementPolicyConfig::LeastRecentlyUsed), trace);
    assert_eq!(counts, (1, 1, 0));
}

#[test]
fn modify_counts_two_accesses_and_the_second_always_hits() {
    // The first half of the modify evicts the resident line; the second half hits the line it
    // just admitted
    let trace = " L 0,1\n M 10,1\n";
    let counts = run(&config(0, 1, 0, ReplacementPolicyConfig::LeastRecentlyUsed), trace);
    assert_eq!(counts, (1, 2, 1));
}

#[test]
fn instruction_fetches_are_ignored() {
    let trace = "I 0,4\nI 400d7d4,8\n";
    let counts = run(&config(2, 2, 2, ReplacementPolicyConfig::LeastRecentlyUsed), trace);
    assert_eq!(counts, (0, 0, 0));

    let trace = "I 0,1\n L 0,1\nI 0,1\n L 0,1\n";
    let counts = run(&config(2, 2, 2, ReplacementPolicyConfig::LeastRecentlyUsed), trace);
    assert_eq!(counts, (1, 1, 0));
}

#[test]
fn unrecognised_operation_letters_are_ignored_not_malformed() {
    // A well-formed line with an unknown letter passes through without ending consumption,
    // even under the truncating policy
    let trace = " X 5,1\n L 5,1\n";
    let counts = run(&config(0, 2, 0, ReplacementPolicyConfig::LeastRecentlyUsed), trace);
    assert_eq!(counts, (0, 1, 0));
}

#[test]
fn blank_lines_are_passed_over() {
    let trace = " L 0,1\n\n L 0,1\n";
    let counts = run(&config(0, 2, 0, ReplacementPolicyConfig::LeastRecentlyUsed), trace);
    assert_eq!(counts, (1, 1, 0));
}

#[test]
fn malformed_line_truncates_the_rest_of_the_trace() {
    let trace = " L 0,1\nnot a trace line\n L 10,1\n";
    let counts = run(&config(0, 2, 0, ReplacementPolicyConfig::LeastRecentlyUsed), trace);
    assert_eq!(counts, (0, 1, 0));
}

#[test]
fn malformed_line_can_be_skipped_instead() {
    let trace = " L 0,1\nnot a trace line\n L 10,1\n";
    let mut config = config(0, 2, 0, ReplacementPolicyConfig::LeastRecentlyUsed);
    config.malformed = MalformedLinePolicy::Skip;
    assert_eq!(run(&config, trace), (0, 2, 0));
}

#[test]
fn geometry_wider_than_the_address_is_rejected() {
    let config = config(32, 1, 32, ReplacementPolicyConfig::LeastRecentlyUsed);
    assert!(Simulator::new(&config).is_err());
}

#[test]
fn zero_associativity_is_rejected() {
    let config = config(2, 0, 2, ReplacementPolicyConfig::LeastRecentlyUsed);
    assert!(Simulator::new(&config).is_err());
}

#[test]
fn address_decomposition_splits_set_index_and_tag() {
    let cache = Cache::new(
        &config(2, 1, 4, ReplacementPolicyConfig::LeastRecentlyUsed),
        LeastRecentlyUsed,
    );
    assert_eq!(cache.address_to_set_and_tag(0xABCD), (0, 0x2AF));
    assert_eq!(cache.address_to_set_and_tag(0x37), (3, 0));
}

#[test]
fn tag_keeps_the_full_remaining_address_width() {
    // With no set or offset bits the tag is the whole address, top bit included
    let cache = Cache::new(
        &config(0, 1, 0, ReplacementPolicyConfig::LeastRecentlyUsed),
        LeastRecentlyUsed,
    );
    assert_eq!(cache.address_to_set_and_tag(u64::MAX), (0, u64::MAX));

    let cache = Cache::new(
        &config(4, 1, 8, ReplacementPolicyConfig::LeastRecentlyUsed),
        LeastRecentlyUsed,
    );
    assert_eq!(cache.address_to_set_and_tag(u64::MAX).1, u64::MAX >> 12);
}

#[test]
fn miss_fills_the_first_empty_slot() {
    let mut cache = Cache::new(
        &config(0, 4, 0, ReplacementPolicyConfig::LeastRecentlyUsed),
        LeastRecentlyUsed,
    );
    assert_eq!(cache.access_and_update_line(0xA0), AccessOutcome::Miss);
    assert_eq!(cache.access_and_update_line(0xB0), AccessOutcome::Miss);
    let lines = cache.lines(0);
    assert!(lines[0].valid && lines[0].tag == 0xA0);
    assert!(lines[1].valid && lines[1].tag == 0xB0);
    assert!(!lines[2].valid && !lines[3].valid);
    assert_eq!(cache.get_invalid_line_count(), 2);
}

#[test]
fn hit_resets_recency_and_ages_the_rest_of_the_set() {
    let mut cache = Cache::new(
        &config(0, 2, 0, ReplacementPolicyConfig::LeastRecentlyUsed),
        LeastRecentlyUsed,
    );
    cache.access_and_update_line(0x1);
    cache.access_and_update_line(0x2);
    assert_eq!(cache.access_and_update_line(0x1), AccessOutcome::Hit);
    let lines = cache.lines(0);
    assert_eq!(lines[0].recency_counter, 0);
    assert_eq!(lines[0].hit_counter, 1);
    assert_eq!(lines[1].recency_counter, 1);
    assert_eq!(lines[1].hit_counter, 0);
}

#[test]
fn lru_evicts_the_line_unmatched_for_longest() {
    let mut cache = Cache::new(
        &config(0, 2, 0, ReplacementPolicyConfig::LeastRecentlyUsed),
        LeastRecentlyUsed,
    );
    cache.access_and_update_line(0x1);
    cache.access_and_update_line(0x2);
    cache.access_and_update_line(0x1);
    // 0x2 is now the older line, so it goes
    assert_eq!(cache.access_and_update_line(0x3), AccessOutcome::MissEviction);
    let lines = cache.lines(0);
    assert_eq!(lines[0].tag, 0x1);
    assert_eq!(lines[1].tag, 0x3);
}

#[test]
fn lfu_breaks_hit_count_ties_by_smallest_tag() {
    // Six lines all tied on zero hits; the victim must be the smallest tag wherever it sits
    let mut cache = Cache::new(
        &config(0, 6, 0, ReplacementPolicyConfig::LeastFrequentlyUsed),
        LeastFrequentlyUsed,
    );
    for tag in [0x9, 0x5, 0x8, 0x3, 0x7, 0x6] {
        assert_eq!(cache.access_and_update_line(tag), AccessOutcome::Miss);
    }
    assert_eq!(cache.access_and_update_line(0x20), AccessOutcome::MissEviction);
    assert_eq!(cache.lines(0)[3].tag, 0x20);
}

#[test]
fn lfu_prefers_the_lower_hit_count_over_the_lower_tag() {
    let mut cache = Cache::new(
        &config(0, 2, 0, ReplacementPolicyConfig::LeastFrequentlyUsed),
        LeastFrequentlyUsed,
    );
    cache.access_and_update_line(0x1);
    cache.access_and_update_line(0x2);
    cache.access_and_update_line(0x1);
    // 0x1 has been matched once, 0x2 never, so 0x2 goes despite its larger tag
    assert_eq!(cache.access_and_update_line(0x3), AccessOutcome::MissEviction);
    let lines = cache.lines(0);
    assert_eq!(lines[0].tag, 0x1);
    assert_eq!(lines[1].tag, 0x3);
}

#[test]
fn smallest_tag_policy_evicts_the_minimum_tag() {
    let mut cache = Cache::new(
        &config(0, 2, 0, ReplacementPolicyConfig::SmallestTag),
        SmallestTag,
    );
    cache.access_and_update_line(0x5);
    cache.access_and_update_line(0x9);
    assert_eq!(cache.access_and_update_line(0x7), AccessOutcome::MissEviction);
    let lines = cache.lines(0);
    assert_eq!(lines[0].tag, 0x7);
    assert_eq!(lines[1].tag, 0x9);
}

#[test]
fn largest_tag_policy_evicts_the_maximum_tag() {
    let mut cache = Cache::new(
        &config(0, 2, 0, ReplacementPolicyConfig::LargestTag),
        LargestTag,
    );
    cache.access_and_update_line(0x5);
    cache.access_and_update_line(0x9);
    assert_eq!(cache.access_and_update_line(0x7), AccessOutcome::MissEviction);
    let lines = cache.lines(0);
    assert_eq!(lines[0].tag, 0x5);
    assert_eq!(lines[1].tag, 0x7);
}

#[test]
fn counters_conserve_across_all_policies() {
    let trace = mixed_trace(500, 42);
    let expected = data_access_count(&trace);
    assert!(expected > 0);
    for policy in [
        ReplacementPolicyConfig::LeastRecentlyUsed,
        ReplacementPolicyConfig::LeastFrequentlyUsed,
        ReplacementPolicyConfig::SmallestTag,
        ReplacementPolicyConfig::LargestTag,
    ] {
        let (hits, misses, evictions) = run(&config(2, 2, 2, policy), &trace);
        assert_eq!(hits + misses, expected);
        assert!(evictions <= misses);
    }
}

#[test]
fn replaying_the_same_trace_gives_identical_results() {
    let trace = mixed_trace(300, 7);
    let config = config(3, 2, 4, ReplacementPolicyConfig::LeastFrequentlyUsed);
    assert_eq!(run(&config, &trace), run(&config, &trace));
}

fn assert_no_duplicate_tags<R: ReplacementPolicy>(policy: R) {
    let mut cache = Cache::new(
        &config(2, 4, 2, ReplacementPolicyConfig::LeastRecentlyUsed),
        policy,
    );
    let mut state = 99u64;
    for _ in 0..2000 {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        cache.access_and_update_line((state >> 24) & 0x3FF);
    }
    for set_index in 0..cache.set_count() {
        let mut tags: Vec<u64> = cache
            .lines(set_index)
            .iter()
            .filter(|line| line.valid)
            .map(|line| line.tag)
            .collect();
        let total = tags.len();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), total);
    }
}

#[test]
fn sets_never_hold_duplicate_valid_tags() {
    assert_no_duplicate_tags(LeastRecentlyUsed);
    assert_no_duplicate_tags(LeastFrequentlyUsed);
    assert_no_duplicate_tags(SmallestTag);
    assert_no_duplicate_tags(LargestTag);
}

#[test]
fn result_serialises_and_deserialises_unchanged() {
    let mut simulator = Simulator::new(&config(2, 2, 2, ReplacementPolicyConfig::LeastRecentlyUsed)).unwrap();
    let result = simulator.simulate(mixed_trace(100, 3).as_bytes()).unwrap();
    let round_tripped: SimulationResult =
        serde_json::from_str(&serde_json::to_string(result).unwrap()).unwrap();
    assert_eq!(round_tripped, *result);
}

#[test]
fn kernel_blocked_matches_naive_for_the_tuned_sizes() {
    for n in [32usize, 64, 67] {
        let mut state = n as u64;
        let a: Vec<i32> = (0..n * n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 33) as i32) % 100
            })
            .collect();
        assert_eq!(grand_sum_blocked(n, &a), grand_sum_naive(n, &a));
    }
}

#[test]
fn kernel_handles_untuned_sizes_and_known_values() {
    let a = [1, 2, 3, 4];
    assert_eq!(grand_sum_naive(2, &a), 29);
    assert_eq!(grand_sum_blocked(2, &a), 29);
}
