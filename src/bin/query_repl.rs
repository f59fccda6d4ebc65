//! Interactive DQL REPL over an `Engine` wired to the in-memory evaluators
//! (§C "ambient CLI surface; not itself part of the specified core").
//!
//! Grounded on `inputlayer::main`'s REPL loop shape (plain stdin, dot-prefix
//! commands, no readline/history) and `inputlayer::bin::client`'s use of
//! `clap` for flag parsing.
//!
//! ```bash
//! cargo run --bin query-repl
//! cargo run --bin query-repl -- --mode threaded --fainder-mode full_recall
//! ```
//!
//! Commands:
//! - `.mode <sequential|prefilter|threaded>` - change the executor mode
//! - `.fainder-mode <low_memory|full_precision|full_recall|exact>` - change the percentile mode
//! - `.format <query>` - parse, then pretty-print the canonical form
//! - `.help` - show this help
//! - `.quit` - exit
//!
//! Anything else is evaluated as a DQL query against a small built-in
//! demo dataset.

use clap::Parser;
use fainder_query::evaluators::memory::{InMemoryColumnNameEvaluator, InMemoryKeywordEvaluator, InMemoryPercentileEvaluator};
use fainder_query::evaluators::FainderMode;
use fainder_query::executor::ExecutorMode;
use fainder_query::ids::{ColumnId, DatasetId, HistogramId};
use fainder_query::{ast, parser, Config, Engine, IndexSnapshot};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "query-repl", about = "Interactive DQL REPL")]
struct Args {
    /// Executor mode to use when a query does not override it with `.mode`.
    #[arg(long, value_enum, default_value = "prefilter")]
    mode: CliExecutorMode,

    /// Fainder mode to use when a query does not override it with `.fainder-mode`.
    #[arg(long, value_enum, default_value = "full-precision")]
    fainder_mode: CliFainderMode,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CliExecutorMode {
    Sequential,
    Prefilter,
    Threaded,
}

impl From<CliExecutorMode> for ExecutorMode {
    fn from(m: CliExecutorMode) -> Self {
        match m {
            CliExecutorMode::Sequential => ExecutorMode::Sequential,
            CliExecutorMode::Prefilter => ExecutorMode::Prefilter,
            CliExecutorMode::Threaded => ExecutorMode::Threaded,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CliFainderMode {
    LowMemory,
    FullPrecision,
    FullRecall,
    Exact,
}

impl From<CliFainderMode> for FainderMode {
    fn from(m: CliFainderMode) -> Self {
        match m {
            CliFainderMode::LowMemory => FainderMode::LowMemory,
            CliFainderMode::FullPrecision => FainderMode::FullPrecision,
            CliFainderMode::FullRecall => FainderMode::FullRecall,
            CliFainderMode::Exact => FainderMode::Exact,
        }
    }
}

fn demo_snapshot() -> IndexSnapshot {
    // Three datasets, four columns (0,1 in dataset 0; 2 in dataset 1; 3 in dataset 2).
    let meta = fainder_query::ids::MetaTables::new(
        vec![DatasetId(0), DatasetId(0), DatasetId(1), DatasetId(2)],
        vec![ColumnId(0), ColumnId(2)],
    );
    let keyword = InMemoryKeywordEvaluator::new(HashMap::from([
        (DatasetId(0), "lung cancer incidence by county".to_string()),
        (DatasetId(1), "daily weather observations".to_string()),
        (DatasetId(2), "household income survey".to_string()),
    ]));
    let column_name = InMemoryColumnNameEvaluator::new(vec![
        (ColumnId(0), "age".to_string()),
        (ColumnId(1), "county_fips".to_string()),
        (ColumnId(2), "temperature_celsius".to_string()),
        (ColumnId(3), "household_income".to_string()),
    ]);
    let percentile = InMemoryPercentileEvaluator::new(HashMap::from([
        (HistogramId(0), vec![20.0, 35.0, 50.0, 65.0, 80.0]),
        (HistogramId(1), vec![-5.0, 10.0, 22.0, 31.0]),
    ]));
    IndexSnapshot {
        meta,
        keyword: Arc::new(keyword),
        column_name: Arc::new(column_name),
        percentile: Arc::new(percentile),
    }
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    println!("Dataset query engine REPL");
    println!("==========================\n");
    println!("Commands:");
    println!("  .mode <sequential|prefilter|threaded>");
    println!("  .fainder-mode <low_memory|full_precision|full_recall|exact>");
    println!("  .format <query>");
    println!("  .help");
    println!("  .quit\n");

    let mut mode: ExecutorMode = args.mode.into();
    let mut fainder_mode: FainderMode = args.fainder_mode.into();
    let engine = Engine::new(Config::default(), demo_snapshot());

    loop {
        print!("dql> ");
        io::stdout().flush().expect("stdout is writable");

        let mut input = String::new();
        if io::stdin().read_line(&mut input).expect("stdin is readable") == 0 {
            break; // EOF
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == ".quit" || input == ".exit" {
            break;
        }
        if input == ".help" {
            println!("  .mode <sequential|prefilter|threaded>");
            println!("  .fainder-mode <low_memory|full_precision|full_recall|exact>");
            println!("  .format <query>");
            println!("  .quit");
            continue;
        }
        if let Some(rest) = input.strip_prefix(".mode") {
            match rest.trim() {
                "sequential" => mode = ExecutorMode::Sequential,
                "prefilter" => mode = ExecutorMode::Prefilter,
                "threaded" => mode = ExecutorMode::Threaded,
                other => println!("unknown mode: {other}"),
            }
            continue;
        }
        if let Some(rest) = input.strip_prefix(".fainder-mode") {
            match rest.trim() {
                "low_memory" => fainder_mode = FainderMode::LowMemory,
                "full_precision" => fainder_mode = FainderMode::FullPrecision,
                "full_recall" => fainder_mode = FainderMode::FullRecall,
                "exact" => fainder_mode = FainderMode::Exact,
                other => println!("unknown fainder mode: {other}"),
            }
            continue;
        }
        if let Some(rest) = input.strip_prefix(".format") {
            match parser::parse(rest.trim()) {
                Ok(node) => println!("{}", ast::format::format(&node)),
                Err(e) => println!("error: {e}"),
            }
            continue;
        }

        match engine.execute(input, Some(mode), Some(fainder_mode)) {
            Ok(result) => {
                let ranked = result.ranked_ids();
                println!("datasets: {:?}", ranked.iter().map(|d| d.0).collect::<Vec<_>>());
                for dataset in &ranked {
                    match result.scores.get(dataset) {
                        Some(score) => println!("  dataset {}: score {score:.3}", dataset.0),
                        None => println!("  dataset {}", dataset.0),
                    }
                }
            }
            Err(e) => println!("error: {e}"),
        }
    }

    engine.shutdown();
    println!("goodbye");
}
