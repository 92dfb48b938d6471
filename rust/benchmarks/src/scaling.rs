//! Scaling benchmarks for genus enumeration and Hecke matrices.
//!
//! Builds genera of increasing discriminant and times enumeration, dense
//! and sparse Hecke matrices, under both integer strategies.
//!
//! Options:
//!   --max-level=<N>     Largest prime level to time (default: 1000)
//!   --hecke=<p>         Hecke prime (default: 2)
//!   --json              Print rows as JSON

use std::time::{Duration, Instant};

use num_bigint::BigInt;
use serde::Serialize;

use genus_arith::{next_prime, Ring, W64};
use ternary_genus::{Genus, GenusConfig, PrimeSymbol};

const SEED: u64 = 12345;

#[derive(Debug, Serialize)]
struct ScalingRow {
    level: u64,
    precision: &'static str,
    classes: usize,
    enumerate_us: u128,
    dense_us: u128,
    sparse_us: u128,
    nnz: usize,
}

fn time<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

fn bench_level<R: Ring>(level: u64, hecke: u64, precision: &'static str) -> Option<ScalingRow> {
    let config = GenusConfig::with_seed(SEED);
    let (genus, enumerate) = time(|| Genus::<R>::from_symbols(&[PrimeSymbol::ramified(level)], &config));
    let genus = match genus {
        Ok(g) => g,
        Err(e) => {
            eprintln!("  level {} ({}): {}", level, precision, e);
            return None;
        }
    };
    let (dense, dense_time) = time(|| genus.hecke_matrix_dense(hecke));
    let (sparse, sparse_time) = time(|| genus.hecke_matrix_sparse(hecke));
    let (dense, sparse) = match (dense, sparse) {
        (Ok(d), Ok(s)) => (d, s),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("  level {} ({}): {}", level, precision, e);
            return None;
        }
    };
    debug_assert_eq!(dense.len(), sparse.len());
    Some(ScalingRow {
        level,
        precision,
        classes: genus.size(),
        enumerate_us: enumerate.as_micros(),
        dense_us: dense_time.as_micros(),
        sparse_us: sparse_time.as_micros(),
        nnz: sparse.values().map(|m| m.nnz()).sum(),
    })
}

fn arg_value(args: &[String], name: &str) -> Option<u64> {
    let prefix = format!("--{}=", name);
    args.iter()
        .find_map(|a| a.strip_prefix(prefix.as_str()))
        .and_then(|v| v.parse().ok())
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    let max_level = arg_value(&args, "max-level").unwrap_or(1000);
    let hecke = arg_value(&args, "hecke").unwrap_or(2);
    let json = args.iter().any(|a| a == "--json");

    let mut levels = Vec::new();
    let mut level = 10;
    while level <= max_level {
        let p = next_prime(level);
        if p != hecke && p <= max_level {
            levels.push(p);
        }
        level *= 2;
    }

    let mut rows = Vec::new();
    for &level in &levels {
        rows.extend(bench_level::<W64>(level, hecke, "fixed"));
        rows.extend(bench_level::<BigInt>(level, hecke, "arbitrary"));
    }

    if json {
        match serde_json::to_string_pretty(&rows) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error: {}", e),
        }
        return;
    }

    println!("================================================================");
    println!("  SCALING BENCHMARKS: Genus Enumeration and T_{}", hecke);
    println!("================================================================\n");
    println!(
        "  {:>7} {:>10} {:>8} {:>12} {:>12} {:>12} {:>8}",
        "level", "precision", "classes", "enum_us", "dense_us", "sparse_us", "nnz"
    );
    println!("  {}", "-".repeat(77));
    for r in &rows {
        println!(
            "  {:>7} {:>10} {:>8} {:>12} {:>12} {:>12} {:>8}",
            r.level, r.precision, r.classes, r.enumerate_us, r.dense_us, r.sparse_us, r.nnz
        );
    }
}
