//! ternary-genus CLI: enumerate a genus and print Hecke matrices.
//!
//! Options:
//!   --primes=11,37            Primes dividing the discriminant (default: 11)
//!   --ramified=11             Ramified primes (default: all of --primes)
//!   --seed=<N>                Sampler seed, 0 for random (default: config)
//!   --hecke=2,3               Hecke primes to compute (default: first two good primes)
//!   --sparse                  Build CSR matrices instead of dense ones
//!   --precision=fixed         fixed | arbitrary (default: config)
//!   --config=<file.json>      Load a GenusConfig from JSON
//!   --json                    Print a JSON report instead of text

use std::path::Path;
use std::process;

use serde::Serialize;

use genus_arith::{next_prime, Precision};
use ternary_genus::{AnyGenus, CsrMatrix, DenseMatrix, GenusConfig, PrimeSymbol};

/// CLI configuration parsed from command-line arguments.
struct CliConfig {
    primes: Vec<u64>,
    ramified: Option<Vec<u64>>,
    seed: Option<u64>,
    hecke: Option<Vec<u64>>,
    sparse: bool,
    precision: Option<Precision>,
    config_path: Option<String>,
    json: bool,
}

#[derive(Serialize)]
struct HeckeReport {
    p: u64,
    conductor: String,
    dense: Option<DenseMatrix>,
    sparse: Option<CsrMatrix>,
}

#[derive(Serialize)]
struct Report {
    seed: u64,
    precision: Precision,
    size: usize,
    mass_x24: String,
    forms: Vec<String>,
    dimensions: Vec<(String, usize)>,
    hecke: Vec<HeckeReport>,
}

fn parse_list(value: &str) -> Option<Vec<u64>> {
    value
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse::<u64>().ok())
        .collect()
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("--{}=", name);
    args.iter().find_map(|a| a.strip_prefix(prefix.as_str()))
}

fn parse_args() -> Result<CliConfig, String> {
    let args: Vec<String> = std::env::args().collect();

    let primes = match flag_value(&args, "primes") {
        Some(v) => parse_list(v).ok_or_else(|| format!("bad --primes value '{}'", v))?,
        None => vec![11],
    };
    let ramified = flag_value(&args, "ramified")
        .map(|v| parse_list(v).ok_or_else(|| format!("bad --ramified value '{}'", v)))
        .transpose()?;
    let seed = flag_value(&args, "seed")
        .map(|v| v.parse::<u64>().map_err(|e| format!("bad --seed: {}", e)))
        .transpose()?;
    let hecke = flag_value(&args, "hecke")
        .map(|v| parse_list(v).ok_or_else(|| format!("bad --hecke value '{}'", v)))
        .transpose()?;
    let precision = flag_value(&args, "precision")
        .map(|v| v.parse::<Precision>())
        .transpose()?;

    Ok(CliConfig {
        primes,
        ramified,
        seed,
        hecke,
        sparse: args.iter().any(|a| a == "--sparse"),
        precision,
        config_path: flag_value(&args, "config").map(str::to_string),
        json: args.iter().any(|a| a == "--json"),
    })
}

/// The first `count` primes not dividing the discriminant.
fn default_hecke_primes(primes: &[u64], count: usize) -> Vec<u64> {
    let mut out = Vec::with_capacity(count);
    let mut p = 1;
    while out.len() < count {
        p = next_prime(p);
        if !primes.contains(&p) {
            out.push(p);
        }
    }
    out
}

fn run(cli: CliConfig) -> ternary_genus::Result<()> {
    let mut config = match &cli.config_path {
        Some(path) => GenusConfig::load(Path::new(path))?,
        None => GenusConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(precision) = cli.precision {
        config.precision = precision;
    }

    let symbols: Vec<PrimeSymbol> = cli
        .primes
        .iter()
        .map(|&p| {
            let ramified = cli.ramified.as_ref().map_or(true, |r| r.contains(&p));
            PrimeSymbol::new(p, ramified)
        })
        .collect();

    let mut genus = AnyGenus::build(&symbols, &config)?;
    let dimensions: Vec<(String, usize)> = genus
        .dimension_map()
        .into_iter()
        .map(|(k, d)| (k.to_string(), d))
        .collect();
    let hecke_primes = cli
        .hecke
        .clone()
        .unwrap_or_else(|| default_hecke_primes(&cli.primes, 2));

    let mut hecke = Vec::new();
    for &p in &hecke_primes {
        if cli.sparse {
            for (conductor, m) in genus.hecke_matrix_sparse(p)? {
                hecke.push(HeckeReport {
                    p,
                    conductor: conductor.to_string(),
                    dense: None,
                    sparse: Some(m),
                });
            }
        } else {
            for (conductor, m) in genus.hecke_matrix_dense(p)? {
                hecke.push(HeckeReport {
                    p,
                    conductor: conductor.to_string(),
                    dense: Some(m),
                    sparse: None,
                });
            }
        }
    }

    let report = Report {
        seed: genus.seed(),
        precision: genus.precision(),
        size: genus.size(),
        mass_x24: genus.mass_x24().to_string(),
        forms: genus.forms().iter().map(|q| q.to_string()).collect(),
        dimensions,
        hecke,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("========================================");
    println!("  ternary-genus");
    println!("========================================");
    println!("Seed:       {}", report.seed);
    println!("Precision:  {}", report.precision);
    println!("Classes:    {}", report.size);
    println!("Mass x 24:  {}", report.mass_x24);
    for (i, form) in report.forms.iter().enumerate() {
        println!("  [{:>3}] {}", i, form);
    }
    println!();
    println!("Conductor dimensions:");
    for (conductor, dim) in &report.dimensions {
        println!("  {:>8}: {}", conductor, dim);
    }
    for entry in &report.hecke {
        if let Some(m) = &entry.dense {
            if m.dim == 0 {
                continue;
            }
            println!();
            println!("T_{} on conductor {}:", entry.p, entry.conductor);
            print!("{}", m);
        }
        if let Some(m) = &entry.sparse {
            if m.dim == 0 {
                continue;
            }
            println!();
            println!(
                "T_{} on conductor {}: {}x{} with {} nonzeros",
                entry.p, entry.conductor, m.dim, m.dim, m.nnz()
            );
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
