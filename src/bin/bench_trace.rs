//! Benchmark reentry tracing on synthetic lattice meshes.
//!
//! Run with: cargo run --release --bin bench-trace
//!
//! Usage:
//!   bench-trace              Run default size (100k nodes, 2 waves)
//!   bench-trace 100k 1m      Run multiple sizes
//!   bench-trace --waves 4    Number of expanding waves that merge
//!   bench-trace -n 10        Run 10 iterations (for profiling)
//!
//! For per-phase timing, build with: cargo run --release --features timing --bin bench-trace

use std::io::{self, Write};
use std::time::Instant;

use clap::Parser;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use reentry_trace::{
    trace_sources, ActivatedGraph, ActivationIndex, MemoryStore, MeshGraph, NodeId, TraceConfig,
};

/// Node count with an optional `k`/`m` suffix, e.g. `250k` or `1.5m`.
fn parse_count(arg: &str) -> Result<usize, String> {
    let text = arg.trim().to_ascii_lowercase();
    let (digits, scale) = match text.as_bytes().last() {
        Some(b'm') => (&text[..text.len() - 1], 1e6),
        Some(b'k') => (&text[..text.len() - 1], 1e3),
        _ => (text.as_str(), 1.0),
    };
    let value: f64 = digits
        .parse()
        .map_err(|e| format!("bad node count {arg:?}: {e}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("bad node count {arg:?}"));
    }
    Ok((value * scale).round() as usize)
}

#[derive(Parser)]
#[command(name = "bench-trace")]
#[command(about = "Benchmark reentry tracing on synthetic lattice meshes")]
struct Args {
    /// Approximate node counts to benchmark (e.g., 100k, 1m)
    #[arg(value_parser = parse_count)]
    sizes: Vec<usize>,

    /// Random seed
    #[arg(short, long, default_value_t = 12345)]
    seed: u64,

    /// Number of expanding waves
    #[arg(short, long, default_value_t = 2)]
    waves: usize,

    /// Number of iterations to run (useful for profiling)
    #[arg(short = 'n', long, default_value_t = 1)]
    repeat: usize,
}

/// Cubic lattice of about `n` nodes, with every lattice edge covered by a
/// 4-node element (one xy face and one xz face per lattice point).
struct Lattice {
    side: usize,
    elements: Vec<[NodeId; 4]>,
}

impl Lattice {
    fn new(n: usize) -> Self {
        let side = (n as f64).cbrt().round().max(2.0) as usize;
        let id = |x: usize, y: usize, z: usize| (x + side * (y + side * z)) as NodeId;
        let mut elements = Vec::with_capacity(2 * side * side * side);
        for z in 0..side {
            for y in 0..side {
                for x in 0..side - 1 {
                    if y + 1 < side {
                        elements.push([id(x, y, z), id(x + 1, y, z), id(x + 1, y + 1, z), id(x, y + 1, z)]);
                    }
                    if z + 1 < side {
                        elements.push([id(x, y, z), id(x, y, z + 1), id(x + 1, y, z + 1), id(x + 1, y, z)]);
                    }
                }
            }
        }
        Self { side, elements }
    }

    fn num_nodes(&self) -> usize {
        self.side * self.side * self.side
    }

    fn coords(&self, id: NodeId) -> [f64; 3] {
        let i = id as usize;
        [
            (i % self.side) as f64,
            ((i / self.side) % self.side) as f64,
            (i / (self.side * self.side)) as f64,
        ]
    }
}

/// Activation rows for `waves` fronts starting at random nodes and times,
/// sorted by time.
fn wave_activations(lattice: &Lattice, waves: usize, rng: &mut ChaCha8Rng) -> Vec<(NodeId, f64)> {
    let n = lattice.num_nodes() as NodeId;
    let sources: Vec<([f64; 3], f64)> = (0..waves.max(1))
        .map(|_| (lattice.coords(rng.gen_range(0..n)), rng.gen_range(0.0..20.0)))
        .collect();
    // Lattice units per ms.
    let speed = 0.5;

    let mut rows: Vec<(NodeId, f64)> = (0..n)
        .map(|id| {
            let p = lattice.coords(id);
            let t = sources
                .iter()
                .map(|(s, start)| {
                    let d = ((p[0] - s[0]).powi(2) + (p[1] - s[1]).powi(2) + (p[2] - s[2]).powi(2)).sqrt();
                    start + d / speed
                })
                .fold(f64::INFINITY, f64::min);
            (id, t + rng.gen_range(0.0..1.0))
        })
        .collect();
    rows.sort_by(|a, b| a.1.total_cmp(&b.1));
    rows
}

struct BenchResult {
    n: usize,
    time_ms: f64,
    sources: usize,
    splits: usize,
    thresholds: usize,
}

fn run_benchmark(graph: &ActivatedGraph, index: &ActivationIndex) -> BenchResult {
    let config = TraceConfig::default();
    let t0 = Instant::now();
    let outcome = trace_sources(graph, index, config, &mut MemoryStore::new())
        .expect("trace should succeed on synthetic input");
    let time_ms = t0.elapsed().as_secs_f64() * 1000.0;

    #[cfg(debug_assertions)]
    {
        use reentry_trace::validation::validate;
        let report = validate(graph, &outcome, config.size_threshold);
        if !report.is_valid() {
            eprintln!("WARNING: Validation failed: {}", report);
        } else {
            println!("Validation passed: {}", report);
        }
    }

    #[cfg(feature = "timing")]
    {
        let t = outcome.stats.timings;
        println!(
            "  seed {:.1}ms, resolve {:.1}ms, store {:.1}ms",
            t.seed.as_secs_f64() * 1000.0,
            t.resolve.as_secs_f64() * 1000.0,
            t.store.as_secs_f64() * 1000.0
        );
    }

    BenchResult {
        n: graph.num_nodes(),
        time_ms,
        sources: outcome.reduced.len(),
        splits: outcome.stats.splits,
        thresholds: outcome.stats.thresholds_processed,
    }
}

fn short_count(n: usize) -> String {
    match n {
        0..=999 => n.to_string(),
        1_000..=999_999 => format!("{}k", n / 1_000),
        _ => format!("{:.1}M", n as f64 / 1e6),
    }
}

fn main() {
    let args = Args::parse();

    println!("reentry-trace Benchmark");
    println!("=======================\n");

    let sizes: Vec<usize> = if args.sizes.is_empty() {
        vec![100_000]
    } else {
        args.sizes
    };

    println!("Configuration:");
    println!("  seed = {}", args.seed);
    println!("  waves = {}", args.waves);
    println!(
        "  sizes = {:?}",
        sizes.iter().map(|&n| short_count(n)).collect::<Vec<_>>()
    );
    if args.repeat > 1 {
        println!("  repeat = {}", args.repeat);
    }

    let mut results: Vec<BenchResult> = Vec::new();

    for n in &sizes {
        println!("\n{}", "=".repeat(60));
        println!("Benchmarking n = {}", short_count(*n));
        println!("{}", "=".repeat(60));

        let t_gen = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
        let lattice = Lattice::new(*n);
        let rows = wave_activations(&lattice, args.waves, &mut rng);
        let index = ActivationIndex::from_rows(rows).expect("synthetic table is well-formed");
        let graph = ActivatedGraph::new(MeshGraph::from_elements(lattice.elements), &index);
        println!(
            "Mesh generation: {:.1}ms ({} nodes, {} edges)",
            t_gen.elapsed().as_secs_f64() * 1000.0,
            short_count(graph.num_nodes()),
            short_count(graph.graph().num_edges())
        );

        let mut times: Vec<f64> = Vec::with_capacity(args.repeat);
        let mut last_result: Option<BenchResult> = None;
        for iter in 0..args.repeat.max(1) {
            if args.repeat > 1 {
                print!("  Iteration {}/{}... ", iter + 1, args.repeat);
                io::stdout().flush().unwrap();
            }
            let result = run_benchmark(&graph, &index);
            times.push(result.time_ms);
            if args.repeat > 1 {
                println!("{:.1}ms", result.time_ms);
            }
            last_result = Some(result);
        }
        let result = last_result.unwrap();

        println!("\nResults:");
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        println!("  Avg time:      {:>8.1}ms", avg);
        println!("  Sources:       {:>8}", result.sources);
        println!("  Splits:        {:>8}", result.splits);
        println!("  Thresholds:    {:>8}", result.thresholds);

        results.push(result);
    }

    if results.len() > 1 {
        println!("\n\n{}", "=".repeat(60));
        println!("SUMMARY");
        println!("{}", "=".repeat(60));
        println!("{:>10} | {:>10} | {:>8} | {:>8}", "n", "time", "sources", "splits");
        println!("{:-<10}-+-{:-<10}-+-{:-<8}-+-{:-<8}", "", "", "", "");
        for r in &results {
            println!(
                "{:>10} | {:>8.1}ms | {:>8} | {:>8}",
                short_count(r.n),
                r.time_ms,
                r.sources,
                r.splits
            );
        }
    }

    println!("\nBenchmark complete.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_suffixes() {
        assert_eq!(parse_count("250k"), Ok(250_000));
        assert_eq!(parse_count("1.5M"), Ok(1_500_000));
        assert_eq!(parse_count(" 64 "), Ok(64));
        assert!(parse_count("k").is_err());
        assert!(parse_count("-3k").is_err());
    }

    #[test]
    fn test_short_count() {
        assert_eq!(short_count(512), "512");
        assert_eq!(short_count(64_000), "64k");
        assert_eq!(short_count(2_500_000), "2.5M");
    }
}
