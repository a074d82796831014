//! distgen: multi-distance memory access benchmark
//!
//! Sweeps per-thread buffers at each requested working-set size and reports
//! achieved bandwidth and time per access.
use clap::Parser;
use distgen_rs::bench::{AccessMode, Totals, run_bench};
use distgen_rs::config::Config;
use distgen_rs::geometry::{BLOCK_LEN, Geometry};
use distgen_rs::workers::{WorkerSet, prepare_then_wait};
use distgen_rs::{DistgenError, DistanceRegistry, format_size, init_buffers, parse_size, wtime};
use log::{error, info, warn};
use std::process::ExitCode;
use std::sync::{Arc, Barrier};

// use faster/smaller `mimalloc` allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "distgen")]
#[command(about = "Memory access benchmark over a set of working-set distances")]
struct Args {
    /// Pseudo-random access pattern (stride of 7/17 of the buffer)
    #[arg(short = 'p', long)]
    pseudo_random: bool,

    /// Traverse a dependency chain instead of computed addresses
    #[arg(short = 'd', long)]
    dep_chain: bool,

    /// Read-modify-write accesses instead of reads only
    #[arg(short = 'w', long)]
    write: bool,

    /// Number of worker threads
    #[arg(short = 'c', long, default_value = "1")]
    threads: usize,

    /// Outer iterations (0 picks a count giving ~1G accesses per thread)
    #[arg(short = 'i', long, default_value = "0")]
    iterations: u64,

    /// Print a summary of the buffer layout
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Pin worker thread N to CPU core N
    #[arg(long)]
    pin: bool,

    /// Distances in bytes, with optional K/M/G suffix
    #[arg(required = true, value_parser = parse_distance)]
    distances: Vec<u64>,
}

fn parse_distance(s: &str) -> Result<u64, String> {
    parse_size(s).map_err(|e| e.to_string())
}

fn build_config(args: &Args) -> Result<Config, DistgenError> {
    Ok(Config {
        threads: args.threads,
        pseudo_random: args.pseudo_random,
        dep_chain: args.dep_chain,
        write: args.write,
        iterations: args.iterations,
        verbose: args.verbose,
        pin_threads: args.pin,
        distances: DistanceRegistry::try_from(args.distances.as_slice())?,
    })
}

fn run(args: &Args) -> Result<(), DistgenError> {
    let mut config = build_config(args)?;
    let geometry = Geometry::new(&config)?;
    config.derive_iterations(geometry.accesses_per_iteration(config.write));
    geometry.log_summary(&config);

    let buffers = init_buffers(&config, &geometry)?;
    info!("initialised {} buffers of {}", buffers.len(), format_size(geometry.buffer_bytes()));

    let mode = AccessMode::from_flags(config.dep_chain, config.write);
    let iterations = config.iterations;
    let geometry = Arc::new(geometry);
    // workers plus the timing thread
    let start = Arc::new(Barrier::new(config.threads + 1));

    let mut workers = WorkerSet::new();
    for (tid, mut buf) in buffers.into_iter().enumerate() {
        let geometry = Arc::clone(&geometry);
        let start = Arc::clone(&start);
        workers.spawn(format!("distgen-bench-{tid}"), tid, config.pin_threads, move || {
            if thread_priority::set_current_thread_priority(thread_priority::ThreadPriority::Max)
                .is_err()
            {
                warn!("Couldn't set bench thread {} to maximum thread priority", tid);
            }

            // warm up caches and TLB, not part of the measurement
            prepare_then_wait(&start, || {
                let mut warmup = Totals::default();
                run_bench(&mut buf, &geometry, 1, mode, &mut warmup);
            });

            let mut totals = Totals::default();
            run_bench(&mut buf, &geometry, iterations, mode, &mut totals);
            totals
        })?;
    }

    start.wait();
    let t0 = wtime();
    let results = workers.wait()?;
    let elapsed = wtime() - t0;

    let mut totals = Totals::default();
    for t in results {
        totals.merge(t);
    }
    // a read-modify-write touches each block twice
    let accesses = if mode.is_write() { totals.accesses * 2 } else { totals.accesses };
    let bytes = accesses as f64 * BLOCK_LEN as f64;
    let ns_per_access = elapsed * 1e9 * config.threads as f64 / accesses.max(1) as f64;

    println!(
        "  {} iterations, {} threads, {:?} accesses",
        iterations, config.threads, mode
    );
    println!(
        "  {:.6} s, {} accesses, {:.3} GB/s, {:.3} ns/access per thread",
        elapsed,
        accesses,
        bytes / elapsed / 1e9,
        ns_per_access
    );
    println!("  (checksum {:.1})", totals.sum);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
