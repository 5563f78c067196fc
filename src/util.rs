//! Synthetic trace builders. Tests and benchmarks share these so both exercise the same
//! on-disk format the dispatcher parses.

/// Formats one trace line. Data accesses carry the leading space real traces have;
/// instruction fetches don't
pub fn format_event(operation: char, address: u64, size: u16) -> String {
    if operation == 'I' {
        format!("I {address:x},{size}\n")
    } else {
        format!(" {operation} {address:x},{size}\n")
    }
}

/// A load sweep over `count` consecutive addresses spaced `stride` bytes apart
pub fn sequential_trace(count: u64, stride: u64) -> String {
    let mut out = String::new();
    for i in 0..count {
        out.push_str(&format_event('L', i * stride, 4));
    }
    out
}

/// Loads cycling through `tags` distinct tags that all decompose to set 0, so any cache with
/// fewer ways than tags misses on every access
pub fn conflict_trace(count: u64, tags: u64, tag_shift: u32) -> String {
    let mut out = String::new();
    for i in 0..count {
        out.push_str(&format_event('L', (i % tags + 1) << tag_shift, 4));
    }
    out
}

/// Counts the data accesses a trace implies: one per load or store, two per modify
pub fn data_access_count(trace: &str) -> u64 {
    trace
        .lines()
        .map(|line| match line.trim_start().chars().next() {
            Some('L') | Some('S') => 1,
            Some('M') => 2,
            _ => 0,
        })
        .sum()
}

/// A deterministic pseudo-random mix of instruction, load, store, and modify events over a
/// small address range, so repeated runs replay the identical trace
pub fn mixed_trace(events: u64, seed: u64) -> String {
    let mut out = String::new();
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1);
    for _ in 0..events {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let operation = match (state >> 32) % 4 {
            0 => 'I',
            1 => 'L',
            2 => 'S',
            _ => 'M',
        };
        let address = (state >> 16) & 0xFFFF;
        let size = 1 + (state % 8) as u16;
        out.push_str(&format_event(operation, address, size));
    }
    out
}
