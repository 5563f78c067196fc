use std::fs::File;
use std::time::Instant;

use clap::Parser;

use csim::config::{CacheConfig, MalformedLinePolicy, ReplacementPolicyConfig};
use csim::io::get_reader;
use csim::simulator::Simulator;

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(about = String::from("Set-associative cache simulator driven by replayed memory-access traces"))]
struct Args {
    /// Number of set index bits (the cache has 2^s sets)
    #[arg(short = 's')]
    set_index_bits: u32,

    /// Associativity (number of lines per set)
    #[arg(short = 'E')]
    associativity: u32,

    /// Number of block offset bits (blocks are 2^b bytes)
    #[arg(short = 'b')]
    block_offset_bits: u32,

    /// Eviction policy
    #[arg(short = 'p', value_enum)]
    policy: ReplacementPolicyConfig,

    /// Path of the trace to replay
    #[arg(short = 't')]
    trace: String,

    /// Print a diagnostic line for every data access
    #[arg(short = 'v', long)]
    verbose: bool,

    /// What to do with a trace line that doesn't parse
    #[arg(long, value_enum, default_value = "truncate")]
    malformed: MalformedLinePolicy,

    /// Print the summary as JSON instead of the plain counters
    #[arg(long)]
    json: bool,

    #[arg(long)]
    performance: bool,

    #[arg(long, default_value_t = DEBUG_DEFAULT)]
    debug: bool,
}

fn main() -> Result<(), String> {
    let start = Instant::now();
    let args = Args::parse();
    let config = CacheConfig {
        set_index_bits: args.set_index_bits,
        associativity: args.associativity,
        block_offset_bits: args.block_offset_bits,
        policy: args.policy,
        malformed: args.malformed,
    };
    let mut simulator = Simulator::with_verbose(&config, args.verbose)?;
    let trace_file = File::open(&args.trace)
        .map_err(|e| format!("Couldn't open the trace file at path {}: {e}", args.trace))?;
    let trace_reader = get_reader(trace_file)?;
    let result = simulator.simulate(trace_reader)?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(result)
                .map_err(|e| format!("Couldn't serialise the output {e}"))?
        );
    } else {
        println!(
            "hits:{} misses:{} evictions:{}",
            result.hits(),
            result.misses(),
            result.evictions()
        );
    }
    if args.performance {
        let end = Instant::now();
        let simulation_time = simulator.get_execution_time();
        let total_time = end - start;
        println!("Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9);
        println!(
            "Total execution time (includes initial parsing, configuration, and output): {}s",
            total_time.as_nanos() as f64 / 1e9
        )
    }
    if args.debug {
        #[cfg(debug_assertions)]
        println!("Running the debug binary, debug mode is enabled by default. If benchmarking, do not use this binary, re-compile with the --release argument when using cargo run");
        println!("Parsed input configuration: {config:?}");
        println!(
            "Cache lines never filled by the replay: {}",
            simulator.get_invalid_line_count()
        )
    }
    Ok(())
}
