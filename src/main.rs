//! Benchmark launcher: generates (or reuses) a pseudo-random input file,
//! runs the chosen algorithm over an in-process cluster, validates and
//! stores the result, and prints the per-rank phase timings.

use mpsort::algorithms::{by_name, NAMES};
use mpsort::config::RunConfig;
use mpsort::dal::Ctx;
use mpsort::io;
use mpsort::Cluster;
use log::info;
use rayon::prelude::*;
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

struct Args {
    cfg: RunConfig,
    nodes: usize,
    dir: PathBuf,
}

fn print_help(argv0: &str) {
    println!(
        "Usage:\n\
         \t{argv0} [options]\n\
         \n\
         Options:\n\
         \t--help     -h        print this help and exit\n\
         \t--verbose  -v        print more information\n\
         \t--nodes    -n  N     run the cluster with N ranks (default 4)\n\
         \t--size     -M  M     sort M elements\n\
         \t--seed     -s  S     use seed S to generate random elements\n\
         \t--algo     -a  A     use algorithm A, one of: {}\n\
         \t--var0         X     first algorithm-specific variable\n\
         \t--var1         X     second algorithm-specific variable\n\
         \t--var2         X     third algorithm-specific variable\n\
         \t--memory       B     per-dataset memory budget in elements\n\
         \t--dir          D     directory for data files (default: system temp)\n",
        NAMES.join(", ")
    );
}

fn parse_args() -> Result<Args, String> {
    let argv: Vec<String> = std::env::args().collect();
    let mut m: Option<u64> = None;
    let mut seed: Option<u64> = None;
    let mut algo: Option<String> = None;
    let mut nodes = 4usize;
    let mut algo_var = [0i64; 3];
    let mut mem_budget: Option<u64> = None;
    let mut dir = std::env::temp_dir();
    let mut verbose = false;

    let mut it = argv.iter().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |name: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| format!("{} requires a value", name))
        };
        match arg.as_str() {
            "-h" | "--help" => {
                print_help(&argv[0]);
                exit(0);
            }
            "-v" | "--verbose" => verbose = true,
            "-M" | "--size" => m = Some(parse_num(&value("--size")?)?),
            "-s" | "--seed" => seed = Some(parse_num(&value("--seed")?)?),
            "-a" | "--algo" => algo = Some(value("--algo")?),
            "-n" | "--nodes" => nodes = parse_num(&value("--nodes")?)? as usize,
            "--var0" => algo_var[0] = parse_num(&value("--var0")?)? as i64,
            "--var1" => algo_var[1] = parse_num(&value("--var1")?)? as i64,
            "--var2" => algo_var[2] = parse_num(&value("--var2")?)? as i64,
            "--memory" => mem_budget = Some(parse_num(&value("--memory")?)?),
            "--dir" => dir = PathBuf::from(value("--dir")?),
            other => return Err(format!("unknown option {}", other)),
        }
    }

    let m = m.ok_or("size is mandatory!")?;
    let seed = seed.ok_or("seed is mandatory!")?;
    let algo = algo.ok_or("algo is mandatory!")?;
    if by_name(&algo).is_none() {
        return Err(format!("unknown algorithm \"{}\"", algo));
    }
    if nodes == 0 {
        return Err("nodes must be at least 1".into());
    }

    let mut cfg = RunConfig::new(m, seed, &algo).with_algo_var(algo_var);
    if let Some(b) = mem_budget {
        cfg = cfg.with_mem_budget(b);
    }
    cfg.verbose = verbose;
    Ok(Args { cfg, nodes, dir })
}

fn parse_num(s: &str) -> Result<u64, String> {
    // Accepts suffixes for element counts: 1K, 16M, 2G.
    let (digits, mult) = match s.chars().last() {
        Some('K') | Some('k') => (&s[..s.len() - 1], 1u64 << 10),
        Some('M') => (&s[..s.len() - 1], 1 << 20),
        Some('G') | Some('g') => (&s[..s.len() - 1], 1 << 30),
        _ => (s, 1),
    };
    digits
        .parse::<u64>()
        .map(|v| v * mult)
        .map_err(|_| format!("\"{}\" is not a valid number", s))
}

/// Checks the root's output: same element count, matching checksum, and
/// globally nondecreasing.
fn validate(input_path: &std::path::Path, sorted: &[i32], m: u64) -> Result<(), String> {
    if sorted.len() as u64 != m {
        return Err(format!("output has {} elements instead of {}", sorted.len(), m));
    }
    let input = io::load_vec(input_path).map_err(|e| e.to_string())?;
    let in_sum: i64 = input.par_iter().map(|&e| e as i64).sum();
    let out_sum: i64 = sorted.par_iter().map(|&e| e as i64).sum();
    if in_sum != out_sum {
        return Err("output checksum does not match the input".into());
    }
    let is_sorted = sorted
        .par_windows(2)
        .all(|w| w[0] <= w[1]);
    if !is_sorted {
        return Err("output is not sorted".into());
    }
    Ok(())
}

fn print_report(rank: usize, report: &[(String, Duration)]) {
    let total: Duration = report.iter().map(|(_, d)| *d).sum();
    println!("rank {:>3}  total {:>12.6}s", rank, total.as_secs_f64());
    for (name, elapsed) in report {
        println!("         {:<28} {:>12.6}s", name, elapsed.as_secs_f64());
    }
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}\n", msg);
            print_help(&std::env::args().next().unwrap_or_default());
            exit(1);
        }
    };

    let mut logger = env_logger::Builder::from_default_env();
    if args.cfg.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let cfg = args.cfg;
    let algo = by_name(&cfg.algo).unwrap();

    let unsorted = io::unsorted_path(&args.dir, cfg.m, cfg.seed);
    if let Err(e) = io::generate_file(&unsorted, cfg.m, cfg.seed) {
        eprintln!("error generating data into {}: {}", unsorted.display(), e);
        exit(1);
    }

    info!(
        "sorting {} elements with {} over {} ranks (seed {})",
        cfg.m, cfg.algo, args.nodes, cfg.seed
    );

    let sorted_path = io::sorted_path(&args.dir, cfg.m, cfg.seed, &cfg.algo);
    let outcome = Cluster::new(args.nodes).run(|comm| {
        let rank = comm.rank();
        let ctx = Ctx::new(comm, cfg.clone());
        let sorted = if rank == 0 {
            let mut data = io::load_dataset(&ctx, &unsorted)
                .unwrap_or_else(|e| panic!("cannot load {}: {}", unsorted.display(), e));
            algo.main_sort(&ctx, &mut data);
            io::store_dataset(&ctx, &mut data, &sorted_path)
                .unwrap_or_else(|e| panic!("cannot store {}: {}", sorted_path.display(), e));
            data.take_vec()
        } else {
            algo.sort(&ctx);
            Vec::new()
        };
        (sorted, ctx.phase_report())
    });

    for (rank, (_, report)) in outcome.iter().enumerate() {
        print_report(rank, report);
    }

    if cfg.algo != "nosort" {
        if let Err(msg) = validate(&unsorted, &outcome[0].0, cfg.m) {
            eprintln!("sorting failed: {}", msg);
            exit(1);
        }
    }
    println!("sorted output stored in {}", sorted_path.display());
}
