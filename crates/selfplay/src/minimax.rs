//! Fixed-depth minimax with alpha-beta pruning as a baseline opponent.
//!
//! Uses a positional heuristic: won sub-boards weighted by their place on
//! the meta-board, cell placement in open sub-boards, and open two-in-a-row
//! threats on both levels. Scores are from X's perspective.

use crate::SelfPlayError;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;
use uzero_board::{Move, Player, Position, Status, UltimateTicTacToe, LINES};
use uzero_core::Estimator;
use uzero_mcts::{Mcts, MctsConfig};

/// Score of a won game, reduced by the ply so faster wins rank higher.
const WIN_SCORE: i32 = 100_000;

/// Centre 4, corners 3, edges 2.
const SQUARE_WEIGHTS: [i32; 9] = [3, 2, 3, 2, 4, 2, 3, 2, 3];

const BOARD_WIN: i32 = 100;
const LOCAL_THREAT: i32 = 8;
const META_THREAT: i32 = 150;

/// Random plies played before each evaluation game.
const OPENING_PLIES: usize = 2;

fn sign(player: Player) -> i32 {
    match player {
        Player::X => 1,
        Player::O => -1,
    }
}

/// Open two-in-a-row lines: X's count minus O's.
fn threats(owner: impl Fn(usize) -> Option<Player>, open: impl Fn(usize) -> bool) -> i32 {
    LINES
        .iter()
        .map(|line| {
            let count = |p| line.iter().filter(|&&i| owner(i) == Some(p)).count();
            let free = line.iter().filter(|&&i| open(i)).count();
            match (count(Player::X), count(Player::O), free) {
                (2, 0, 1) => 1,
                (0, 2, 1) => -1,
                _ => 0,
            }
        })
        .sum()
}

/// Heuristic score of `pos` from X's perspective.
pub fn evaluate_heuristic(pos: &Position) -> i32 {
    let ply = pos.ply() as i32;
    match pos.status() {
        Status::Won(p) => return sign(p) * (WIN_SCORE - ply),
        Status::Drawn => return 0,
        Status::Active => {}
    }

    let mut score = 0;
    let mut owners = [None; 9];
    let mut open = [false; 9];

    for (b, board) in pos.sub_boards().iter().enumerate() {
        match board.status() {
            Status::Won(p) => {
                score += sign(p) * BOARD_WIN * SQUARE_WEIGHTS[b];
                owners[b] = Some(p);
            }
            Status::Drawn => {}
            Status::Active => {
                open[b] = true;
                for (c, weight) in SQUARE_WEIGHTS.iter().enumerate() {
                    if let Some(p) = board.cell(c) {
                        score += sign(p) * weight;
                    }
                }
                score += LOCAL_THREAT * threats(|i| board.cell(i), |i| board.cell(i).is_none());
            }
        }
    }

    score + META_THREAT * threats(|i| owners[i], |i| open[i])
}

/// Minimax player with alpha-beta pruning.
#[derive(Clone, Copy, Debug)]
pub struct MinimaxPlayer {
    depth: usize,
}

impl MinimaxPlayer {
    /// Searches `depth` plies (at least one).
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
        }
    }

    /// Best move for the side to move; ties go to the lowest move index.
    pub fn best_move(&self, state: &Position) -> Option<Move> {
        let legal_moves = state.legal_moves();
        let first = *legal_moves.first()?;

        let maximizing = state.side_to_move() == Player::X;
        let mut best_move = first;
        let mut best_score = if maximizing { i32::MIN } else { i32::MAX };

        for mv in legal_moves {
            let Ok(child) = state.apply(mv) else { continue };
            let score = self.alphabeta(&child, self.depth - 1, i32::MIN, i32::MAX);

            if maximizing {
                if score > best_score {
                    best_score = score;
                    best_move = mv;
                }
            } else if score < best_score {
                best_score = score;
                best_move = mv;
            }
        }

        Some(best_move)
    }

    fn alphabeta(&self, state: &Position, depth: usize, mut alpha: i32, mut beta: i32) -> i32 {
        if depth == 0 || state.is_terminal() {
            return evaluate_heuristic(state);
        }

        let children = state.legal_moves().into_iter().filter_map(|mv| state.apply(mv).ok());

        if state.side_to_move() == Player::X {
            let mut max_eval = i32::MIN;
            for child in children {
                let eval = self.alphabeta(&child, depth - 1, alpha, beta);
                max_eval = max_eval.max(eval);
                alpha = alpha.max(eval);
                if beta <= alpha {
                    break;
                }
            }
            max_eval
        } else {
            let mut min_eval = i32::MAX;
            for child in children {
                let eval = self.alphabeta(&child, depth - 1, alpha, beta);
                min_eval = min_eval.min(eval);
                beta = beta.min(eval);
                if beta <= alpha {
                    break;
                }
            }
            min_eval
        }
    }
}

/// Outcome counts from the search player's side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
}

impl MatchResult {
    pub fn games(&self) -> usize {
        self.wins + self.draws + self.losses
    }

    /// Points per game, counting a draw as half a win.
    pub fn score(&self) -> f32 {
        if self.games() == 0 {
            return 0.0;
        }
        (self.wins as f32 + 0.5 * self.draws as f32) / self.games() as f32
    }

    fn record(&mut self, result: f32) {
        if result > 0.0 {
            self.wins += 1;
        } else if result < 0.0 {
            self.losses += 1;
        } else {
            self.draws += 1;
        }
    }
}

/// Plays `games` games of estimator-guided search against `opponent`.
///
/// Colours alternate; each pair of games shares a random opening of
/// [`OPENING_PLIES`] moves derived from `seed`. The search player always
/// picks its most-visited move.
pub fn play_match<E: Estimator + ?Sized>(
    estimator: &E,
    opponent: &MinimaxPlayer,
    games: usize,
    simulations: usize,
    seed: u64,
) -> Result<MatchResult, SelfPlayError> {
    let results = (0..games)
        .into_par_iter()
        .map(|i| {
            let (search_side, opening_seed) = seating(i, seed);
            play_evaluation_game(estimator, opponent, search_side, simulations, opening_seed)
        })
        .collect::<Result<Vec<f32>, _>>()?;

    let mut tally = MatchResult::default();
    for result in results {
        tally.record(result);
    }
    Ok(tally)
}

/// Side played by the search player in game `index`, and that game's opening seed.
fn seating(index: usize, seed: u64) -> (Player, u64) {
    let side = if index % 2 == 0 { Player::X } else { Player::O };
    (side, seed.wrapping_add((index / 2) as u64))
}

/// Returns the final result for `search_side`.
fn play_evaluation_game<E: Estimator + ?Sized>(
    estimator: &E,
    opponent: &MinimaxPlayer,
    search_side: Player,
    simulations: usize,
    opening_seed: u64,
) -> Result<f32, SelfPlayError> {
    let game = UltimateTicTacToe;
    let mut rng = ChaCha8Rng::seed_from_u64(opening_seed);
    let mut state = Position::new();

    for _ in 0..OPENING_PLIES {
        let legal_moves = state.legal_moves();
        let Some(&mv) = legal_moves.choose(&mut rng) else {
            break;
        };
        state = state.apply(mv)?;
    }

    let mut mcts = Mcts::new(MctsConfig::for_evaluation(), estimator, rng);
    while !state.is_terminal() {
        let mv = if state.side_to_move() == search_side {
            mcts.search(&game, &state, simulations)?.best_action
        } else {
            match opponent.best_move(&state) {
                Some(mv) => mv,
                None => break,
            }
        };
        state = state.apply(mv)?;
    }

    let result = state.result(search_side)?;
    debug!(?search_side, result, plies = state.ply(), "evaluation game finished");
    Ok(result)
}
