//! Command-line front end: training, evaluation and move queries.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use uzero_board::{Move, Position, UltimateTicTacToe};
use uzero_core::Estimator;
use uzero_net::{MlpConfig, MlpEstimator};
use uzero_selfplay::{
    analyze, evaluate_position, play_match, LoggingObserver, MinimaxPlayer, Trainer,
    TrainingConfig,
};

/// Ultimate Tic-Tac-Toe self-play trainer.
#[derive(Parser)]
#[command(name = "uzero")]
#[command(about = "Train and query an Ultimate Tic-Tac-Toe engine by self-play")]
struct Cli {
    /// Default log level; RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the self-play training loop.
    Train {
        /// JSON training configuration; missing fields use defaults.
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        iterations: Option<usize>,

        /// Self-play games per iteration.
        #[arg(short, long)]
        games: Option<usize>,

        /// MCTS simulations per move.
        #[arg(short, long)]
        simulations: Option<usize>,

        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,

        /// Start from this checkpoint. A missing file falls back to fresh
        /// parameters; any other load failure is an error.
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Hidden layer width for a freshly initialized network.
        #[arg(long, default_value = "128")]
        hidden_size: usize,
    },

    /// Play a trained network against the minimax baseline.
    Evaluate {
        #[arg(short, long)]
        checkpoint: PathBuf,

        #[arg(short, long, default_value = "20")]
        games: usize,

        /// Minimax search depth.
        #[arg(short, long, default_value = "2")]
        depth: usize,

        #[arg(short, long, default_value = "200")]
        simulations: usize,

        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Print the best move for a position given as moves from the empty board.
    BestMove {
        /// Network checkpoint; an untrained network is used if omitted.
        #[arg(short, long)]
        checkpoint: Option<PathBuf>,

        #[arg(short, long, default_value = "400")]
        simulations: usize,

        /// Moves as flat indices ("40") or coordinates ("1,1,0,0").
        moves: Vec<String>,
    },
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_estimator(path: &Path) -> Result<MlpEstimator> {
    MlpEstimator::from_checkpoint(path)
        .with_context(|| format!("Failed to load checkpoint {}", path.display()))
}

#[allow(clippy::too_many_arguments)]
fn cmd_train(
    config_path: Option<PathBuf>,
    iterations: Option<usize>,
    games: Option<usize>,
    simulations: Option<usize>,
    checkpoint_dir: Option<PathBuf>,
    seed: Option<u64>,
    resume: Option<PathBuf>,
    hidden_size: usize,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<TrainingConfig>(&text)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => TrainingConfig::default(),
    };
    if let Some(v) = iterations {
        config.iterations = v;
    }
    if let Some(v) = games {
        config.games_per_iteration = v;
    }
    if let Some(v) = simulations {
        config.simulations_per_move = v;
    }
    if let Some(dir) = checkpoint_dir {
        config.checkpoint_dir = Some(dir);
    }
    if let Some(v) = seed {
        config.seed = v;
    }

    let mut estimator = MlpEstimator::new(
        MlpConfig::default()
            .with_hidden_size(hidden_size)
            .with_seed(config.seed),
    );
    if let Some(path) = &resume {
        match estimator.load(path) {
            Ok(()) => info!(path = %path.display(), "resumed from checkpoint"),
            Err(e) if e.is_not_found() => {
                warn!(path = %path.display(), "checkpoint not found, starting from fresh parameters")
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to resume from {}", path.display()))
            }
        }
    }

    let start = Instant::now();
    let mut trainer = Trainer::new(UltimateTicTacToe, estimator, config)
        .context("Invalid training configuration")?
        .with_observer(LoggingObserver);
    let summary = trainer.run().context("Training failed")?;

    println!("\nCompleted in {:.2}s", start.elapsed().as_secs_f64());
    println!("Iterations:   {}", summary.iterations_completed);
    println!("Games played: {}", summary.games_played);
    println!("Failed games: {}", summary.failed_games);
    println!("Buffer size:  {}", summary.buffer_size);
    if let Some(path) = &summary.last_checkpoint {
        println!("Checkpoint:   {}", path.display());
    }
    if summary.stopped_early {
        println!("Stopped early on request");
    }
    Ok(())
}

fn cmd_evaluate(
    checkpoint: PathBuf,
    games: usize,
    depth: usize,
    simulations: usize,
    seed: u64,
) -> Result<()> {
    let estimator = load_estimator(&checkpoint)?;
    let opponent = MinimaxPlayer::new(depth);

    println!(
        "Playing {} games: MCTS ({} sims) vs Minimax (depth {})",
        games, simulations, depth
    );
    let start = Instant::now();
    let result = play_match(&estimator, &opponent, games, simulations, seed)
        .context("Evaluation match failed")?;

    let pct = |n: usize| n as f32 / result.games().max(1) as f32 * 100.0;
    println!("\nCompleted in {:.2}s", start.elapsed().as_secs_f64());
    println!("Search wins:  {} ({:.1}%)", result.wins, pct(result.wins));
    println!("Minimax wins: {} ({:.1}%)", result.losses, pct(result.losses));
    println!("Draws:        {} ({:.1}%)", result.draws, pct(result.draws));
    println!("Score: {:.3}", result.score());
    Ok(())
}

fn cmd_best_move(checkpoint: Option<PathBuf>, simulations: usize, moves: Vec<String>) -> Result<()> {
    let estimator = match &checkpoint {
        Some(path) => load_estimator(path)?,
        None => {
            warn!("no checkpoint given, using an untrained network");
            MlpEstimator::new(MlpConfig::default())
        }
    };

    let moves = moves
        .iter()
        .map(|s| {
            s.parse::<Move>()
                .with_context(|| format!("Invalid move {s:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let state = Position::from_moves(&moves).context("Illegal move sequence")?;

    println!("{state}");
    if state.is_terminal() {
        bail!("game is already over: {}", state.status());
    }

    let game = UltimateTicTacToe;
    let value = evaluate_position(&game, &estimator, &state)?;
    let result = analyze(&game, &estimator, &state, simulations)?;

    println!("Best move:   {} (index {})", result.best_action, result.best_action.index());
    println!("Search value: {:+.3}", result.root_value);
    println!("Network value: {:+.3}", value);
    let mut top = result.moves.clone();
    top.sort_by(|a, b| b.visits.cmp(&a.visits).then(a.index.cmp(&b.index)));
    for stats in top.iter().take(5) {
        println!(
            "  {}  visits {:>5}  prior {:.3}  q {:+.3}",
            stats.action, stats.visits, stats.prior, stats.mean_value
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Train {
            config,
            iterations,
            games,
            simulations,
            checkpoint_dir,
            seed,
            resume,
            hidden_size,
        } => cmd_train(
            config,
            iterations,
            games,
            simulations,
            checkpoint_dir,
            seed,
            resume,
            hidden_size,
        ),

        Commands::Evaluate {
            checkpoint,
            games,
            depth,
            simulations,
            seed,
        } => cmd_evaluate(checkpoint, games, depth, simulations, seed),

        Commands::BestMove {
            checkpoint,
            simulations,
            moves,
        } => cmd_best_move(checkpoint, simulations, moves),
    }
}
