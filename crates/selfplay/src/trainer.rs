//! The self-play training loop.
//!
//! Each iteration plays a batch of games in parallel against a shared,
//! read-only estimator, then trains that estimator on the replay buffer.
//! The estimator is only borrowed mutably once every game of the iteration
//! has returned, so prediction and parameter updates never overlap.

use crate::{
    play_game, GameRecord, IterationReport, ProgressObserver, ReplayBuffer, SelfPlayError, TrainError,
    TrainingConfig,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uzero_core::{Estimator, Game, TrainStats};

/// Requests a stop at the next iteration boundary.
///
/// Cloned handles share one flag; the in-flight iteration always completes.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Totals returned by [`Trainer::run`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingSummary {
    pub iterations_completed: usize,
    pub games_played: usize,
    pub failed_games: usize,
    pub buffer_size: usize,
    pub stopped_early: bool,
    pub last_checkpoint: Option<PathBuf>,
}

/// Derives an independent game seed from the run seed.
fn game_seed(seed: u64, iteration: usize, game: usize) -> u64 {
    let mut z = seed ^ ((iteration as u64) << 32) ^ (game as u64);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub struct Trainer<G: Game, E: Estimator> {
    game: G,
    estimator: E,
    config: TrainingConfig,
    buffer: ReplayBuffer,
    rng: ChaCha8Rng,
    observers: Vec<Box<dyn ProgressObserver>>,
    stop: StopHandle,
    games_played: usize,
    failed_games: usize,
}

impl<G: Game, E: Estimator> Trainer<G, E> {
    /// # Errors
    /// [`TrainError::InvalidConfig`] if `config` fails validation.
    pub fn new(game: G, estimator: E, config: TrainingConfig) -> Result<Self, TrainError> {
        config.validate()?;
        Ok(Self {
            game,
            estimator,
            buffer: ReplayBuffer::new(config.replay_capacity),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            observers: Vec::new(),
            stop: StopHandle::default(),
            games_played: 0,
            failed_games: 0,
        })
    }

    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    /// Runs all configured iterations, or until a stop is requested.
    ///
    /// # Errors
    /// Returns the first systemic failure together with its iteration:
    /// too many failed games, a failed training step or a failed checkpoint.
    pub fn run(&mut self) -> Result<TrainingSummary, TrainError> {
        let start = Instant::now();
        let mut summary = TrainingSummary::default();

        info!(
            iterations = self.config.iterations,
            games = self.config.games_per_iteration,
            simulations = self.config.simulations_per_move,
            "starting training"
        );

        for iteration in 0..self.config.iterations {
            if self.stop.is_stop_requested() {
                info!(iteration, "stop requested");
                summary.stopped_early = true;
                break;
            }

            let report = self.run_iteration(iteration, start)?;
            summary.iterations_completed += 1;
            if report.checkpoint.is_some() {
                summary.last_checkpoint = report.checkpoint.clone();
            }
            for observer in &mut self.observers {
                observer.on_iteration(&report);
            }
        }

        summary.games_played = self.games_played;
        summary.failed_games = self.failed_games;
        summary.buffer_size = self.buffer.len();
        Ok(summary)
    }

    fn run_iteration(
        &mut self,
        iteration: usize,
        start: Instant,
    ) -> Result<IterationReport, TrainError> {
        let (examples_added, failed_games) = self.self_play(iteration)?;
        let train_stats = self.train_on_buffer(iteration)?;

        let checkpoint = if self.config.checkpoint_due(iteration) {
            Some(self.save_checkpoint(iteration)?)
        } else {
            None
        };

        Ok(IterationReport {
            iteration,
            games_played: self.games_played,
            failed_games,
            examples_added,
            buffer_size: self.buffer.len(),
            elapsed: start.elapsed(),
            train_stats,
            checkpoint,
        })
    }

    /// Plays this iteration's games and appends their examples.
    ///
    /// Returns `(examples_added, failed_games)`.
    fn self_play(&mut self, iteration: usize) -> Result<(usize, usize), TrainError> {
        let total = self.config.games_per_iteration;
        let seed = self.config.seed;
        let (game, estimator, config) = (&self.game, &self.estimator, &self.config);

        let results: Vec<Result<_, SelfPlayError>> = (0..total)
            .into_par_iter()
            .map(|index| play_game(game, estimator, config, game_seed(seed, iteration, index)))
            .collect();

        self.commit_games(iteration, results)
    }

    /// Adds the finished games to the buffer unless too many failed.
    ///
    /// An aborted iteration leaves the buffer and counters untouched.
    fn commit_games(
        &mut self,
        iteration: usize,
        results: Vec<Result<GameRecord<G::Action>, SelfPlayError>>,
    ) -> Result<(usize, usize), TrainError> {
        let total = results.len();
        let mut records = Vec::with_capacity(total);
        let mut failed = 0;
        let mut last_error = None;
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(iteration, game = index, error = %e, "self-play game failed");
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        if let Some(source) = last_error {
            if failed as f32 / total as f32 > self.config.max_failed_fraction {
                return Err(TrainError::SelfPlay {
                    iteration,
                    failed,
                    total,
                    source,
                });
            }
        }

        let mut added = 0;
        for record in records {
            added += record.examples.len();
            self.buffer.extend(record.examples);
        }
        self.games_played += total - failed;
        self.failed_games += failed;

        debug!(iteration, added, failed, buffer = self.buffer.len(), "self-play done");
        Ok((added, failed))
    }

    /// Runs `epochs` passes of shuffled batches; `None` if the buffer is too small.
    fn train_on_buffer(&mut self, iteration: usize) -> Result<Option<TrainStats>, TrainError> {
        if self.buffer.len() < self.config.batch_size {
            info!(
                iteration,
                buffer = self.buffer.len(),
                batch_size = self.config.batch_size,
                "buffer smaller than one batch, skipping training"
            );
            return Ok(None);
        }

        let mut steps = 0;
        let mut totals = TrainStats::default();
        for _ in 0..self.config.epochs {
            for batch in self.buffer.shuffled_batches(self.config.batch_size, &mut self.rng) {
                let stats = self
                    .estimator
                    .train(&batch)
                    .map_err(|source| TrainError::Training { iteration, source })?;
                totals.policy_loss += stats.policy_loss;
                totals.value_loss += stats.value_loss;
                totals.batch_size += stats.batch_size;
                steps += 1;
            }
        }

        if steps == 0 {
            return Ok(None);
        }
        let mean = TrainStats {
            policy_loss: totals.policy_loss / steps as f32,
            value_loss: totals.value_loss / steps as f32,
            batch_size: self.config.batch_size,
        };
        debug!(
            iteration,
            steps,
            policy_loss = mean.policy_loss,
            value_loss = mean.value_loss,
            "training done"
        );
        Ok(Some(mean))
    }

    /// Writes `checkpoint_{iteration:05}.msgpack` and refreshes `latest.msgpack`.
    fn save_checkpoint(&self, iteration: usize) -> Result<PathBuf, TrainError> {
        let dir = self
            .config
            .checkpoint_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let path = dir.join(format!("checkpoint_{iteration:05}.msgpack"));
        let latest = dir.join("latest.msgpack");

        for target in [&path, &latest] {
            self.estimator
                .save(target)
                .map_err(|source| TrainError::Checkpoint { iteration, source })?;
        }
        info!(iteration, path = %path.display(), "checkpoint saved");
        Ok(path)
    }
}
