//! Command-line front end: position analysis and batch solving.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};

use edax_core::board::Board;
use edax_core::disc::Disc;
use edax_core::level::{get_level, Level};
use edax_core::probcut::Selectivity;
use edax_core::search::options::{SearchOptions, SearchRunOptions};
use edax_core::search::{Search, SearchProgress};

#[derive(Parser, Debug, Clone)]
struct EngineParams {
    /// log2 bucket count of the main hash table.
    #[arg(long, default_value = "19")]
    hash_bits: u32,

    /// Playing level (0-60).
    #[arg(short, long, default_value = "21")]
    level: usize,

    /// Selectivity level (0-5, 5 = exact).
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=5))]
    selectivity: u8,

    /// Worker thread count (0 = hardware threads).
    #[arg(long, default_value = "0")]
    threads: usize,

    /// Evaluation weight file.
    #[arg(long = "eval-file", value_name = "FILE")]
    eval_file: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(name = "edax", about = "Othello engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    engine_params: EngineParams,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyze a single position given as a 65-character diagram
    /// (64 squares of X/O/- followed by the side to move).
    Analyze {
        position: String,

        /// Solve exactly regardless of level.
        #[arg(long)]
        exact: bool,
    },
    /// Solve every position in a file, one 65-character diagram per line.
    Solve {
        file: PathBuf,

        /// Solve exactly regardless of level.
        #[arg(long)]
        exact: bool,
    },
}

fn build_search(params: &EngineParams) -> Result<Search, String> {
    let options = SearchOptions {
        log2_main: params.hash_bits,
        log2_pv: params.hash_bits.saturating_sub(5).max(10),
        log2_shallow: params.hash_bits.saturating_sub(2).max(10),
        n_threads: params.threads,
        eval_path: params.eval_file.clone(),
    };
    Search::new(&options).map_err(|err| format!("failed to initialize engine: {err}"))
}

fn run_options(params: &EngineParams, exact: bool) -> SearchRunOptions {
    let level = if exact {
        Level::perfect()
    } else {
        get_level(params.level)
    };
    let selectivity = if exact {
        Selectivity::None
    } else {
        Selectivity::from_u8(params.selectivity)
    };
    let mut options = SearchRunOptions::with_level(level, selectivity);
    options.callback = Some(Arc::new(report_progress));
    options
}

fn report_progress(progress: SearchProgress) {
    let pv: Vec<String> = progress.pv_line.iter().map(|sq| sq.to_string()).collect();
    eprintln!(
        "depth {:2}/{:2}  score {:+6.2}  {:3}%  {:>12} nodes  pv {}",
        progress.depth,
        progress.target_depth,
        progress.score,
        progress.probability,
        progress.nodes,
        pv.join(" "),
    );
}

fn parse_position(text: &str) -> Result<(Board, Disc), String> {
    Board::from_string_with_side(text.trim())
        .map_err(|err| format!("bad position {text:?}: {err}"))
}

fn analyze(search: &mut Search, board: &Board, options: &SearchRunOptions) {
    let start = Instant::now();
    let result = search.run(board, options);
    let elapsed = start.elapsed();

    let best = result
        .best_move
        .map(|sq| sq.to_string())
        .unwrap_or_else(|| "pass".to_string());
    let pv: Vec<String> = result.pv_line.iter().map(|sq| sq.to_string()).collect();
    let nps = result.n_nodes as f64 / elapsed.as_secs_f64().max(1e-9);

    println!(
        "move {best}  score {:+.2} ({}%)  depth {}  {} nodes  {:.3}s  {:.0} n/s",
        result.score,
        result.get_probability(),
        result.depth,
        result.n_nodes,
        elapsed.as_secs_f64(),
        nps,
    );
    println!("pv: {}", pv.join(" "));
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let params = cli.engine_params;

    let mut search = match build_search(&params) {
        Ok(search) => search,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Analyze { position, exact } => {
            let (board, _side) = match parse_position(&position) {
                Ok(parsed) => parsed,
                Err(err) => {
                    eprintln!("{err}");
                    return ExitCode::FAILURE;
                }
            };
            println!("{board}");
            analyze(&mut search, &board, &run_options(&params, exact));
        }
        Commands::Solve { file, exact } => {
            let content = match std::fs::read_to_string(&file) {
                Ok(content) => content,
                Err(err) => {
                    eprintln!("cannot read {}: {err}", file.display());
                    return ExitCode::FAILURE;
                }
            };
            let options = run_options(&params, exact);
            for (line_no, line) in content.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                match parse_position(line) {
                    Ok((board, _side)) => {
                        println!("position {}:", line_no + 1);
                        analyze(&mut search, &board, &options);
                    }
                    Err(err) => eprintln!("line {}: {err}", line_no + 1),
                }
            }
        }
    }

    ExitCode::SUCCESS
}
