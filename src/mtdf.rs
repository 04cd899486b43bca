//! Iterative deepening MTD(f) driver with parallel root-move dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use rand::prelude::*;
use rayon::ThreadPool;

use crate::board::{Board, Mark};
use crate::search::{move_order, nega_max, SearchError, INFINITY};
use crate::transposition_table::{SharedTranspositionTable, TABLE_MAX_SIZE};

/// Tunables for the iterative deepening driver.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Wall-clock budget per move request
    pub budget: Duration,
    /// Worker pool size; 0 asks the pool for one thread per core
    pub threads: usize,
    /// Transposition table capacity in slots
    pub table_capacity: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            budget: Duration::from_millis(500),
            threads: 0,
            table_capacity: TABLE_MAX_SIZE,
        }
    }
}

/// Cancels a running driver from another thread.
///
/// Aborting stops the driver from launching further depths or root tasks;
/// tasks already dispatched run to completion and their results are
/// discarded.
#[derive(Clone)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// Converges on the value of `board` for `mark` at `depth` plies through
/// zero-width alpha-beta probes.
///
/// Narrows `[lower, upper]` until the bounds meet or the deadline passes;
/// each probe runs `beta = guess + 1` when the guess sits on the lower
/// bound, `beta = guess` otherwise.
pub fn mtdf<B: Board>(
    board: &B,
    mark: Mark,
    depth: u32,
    first_guess: i32,
    deadline: Instant,
    table: &SharedTranspositionTable,
) -> Result<i32, SearchError> {
    let mut guess = first_guess;
    let mut lower = -INFINITY;
    let mut upper = INFINITY;

    while lower < upper {
        let beta = if guess == lower { guess + 1 } else { guess };
        let probe = nega_max(board, mark, beta - 1, beta, depth, table)?;
        guess = probe.value;
        if guess < beta {
            upper = guess;
        } else {
            lower = guess;
        }
        if Instant::now() >= deadline {
            break;
        }
    }
    Ok(guess)
}

/// Chooses root moves by iterative deepening within a wall-clock budget.
///
/// Every legal root column of a depth iteration is evaluated as one task on
/// the worker pool; the recursion below a task is ordinary sequential
/// search. One deadline per move request is shared by every nested call,
/// and blowing it is never an error: the driver answers with the best fully
/// completed iteration, or a uniformly random legal column when none
/// finished.
pub struct MtdfDriver {
    pool: ThreadPool,
    table: SharedTranspositionTable,
    abort: Arc<AtomicBool>,
    budget: Duration,
    // final value of the previous request, seeding the next first guess
    guess: i32,
}

impl MtdfDriver {
    pub fn new(config: DriverConfig) -> Result<Self, SearchError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()?;
        Ok(Self {
            pool,
            table: SharedTranspositionTable::with_capacity(config.table_capacity),
            abort: Arc::new(AtomicBool::new(false)),
            budget: config.budget,
            guess: 0,
        })
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            flag: Arc::clone(&self.abort),
        }
    }

    /// Picks the best column for `mark` within the configured budget.
    pub fn determine_move<B: Board>(
        &mut self,
        board: &B,
        mark: Mark,
    ) -> Result<usize, SearchError> {
        let deadline = Instant::now() + self.budget;
        let legal: Vec<usize> = move_order(board.columns())
            .into_iter()
            .filter(|&column| board.playable(column))
            .collect();
        if legal.is_empty() {
            return Err(SearchError::NoLegalMoves);
        }

        let free_spots = (board.spot_count() - board.num_moves()) as u32;
        let mut best: Option<(usize, i32, u32)> = None;

        let mut depth = 1;
        while depth < free_spots
            && Instant::now() < deadline
            && !self.abort.load(Ordering::Relaxed)
        {
            let started = Instant::now();
            let (tx, rx) = channel();

            for &column in &legal {
                let tx = tx.clone();
                let root = board.clone();
                let table = self.table.clone();
                let guess = self.guess;
                self.pool.spawn(move || {
                    let value: Result<i32, SearchError> = (|| {
                        let mut child = root;
                        child
                            .play(column, mark)
                            .map_err(|error| SearchError::Aborted(error.to_string()))?;
                        // the child is scored from the opponent's side, so
                        // both the seed and the result flip sign
                        Ok(-mtdf(&child, mark.other(), depth - 1, -guess, deadline, &table)?)
                    })();
                    // the receiver may already have given up on this depth
                    let _ = tx.send((column, value));
                });
            }
            drop(tx);

            let mut resolved: Vec<(usize, i32)> = Vec::with_capacity(legal.len());
            let mut failure = None;
            for _ in 0..legal.len() {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(remaining) {
                    Ok((column, Ok(value))) => resolved.push((column, value)),
                    Ok((_, Err(error))) => {
                        failure = Some(error);
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            if let Some(error) = failure {
                error!("root search aborted at depth {}: {}", depth, error);
                return random_column(&legal);
            }
            if resolved.len() < legal.len() {
                warn!(
                    "deadline reached at depth {}, abandoning {} root tasks",
                    depth,
                    legal.len() - resolved.len()
                );
                break;
            }
            if self.abort.load(Ordering::Relaxed) {
                break;
            }

            // select only now that every root future resolved, with ties
            // broken by the fixed center-out column order
            let mut chosen: Option<(usize, i32)> = None;
            for &column in &legal {
                if let Some(&(_, value)) = resolved.iter().find(|&&(c, _)| c == column) {
                    if chosen.map_or(true, |(_, best_value)| value > best_value) {
                        chosen = Some((column, value));
                    }
                }
            }
            if let Some((column, value)) = chosen {
                debug!(
                    "depth {} searched in {:?}: column {} value {}",
                    depth,
                    started.elapsed(),
                    column,
                    value
                );
                best = Some((column, value, depth));
                self.guess = value;
            }
            depth += 2;
        }

        match best {
            Some((column, value, depth)) => {
                debug!(
                    "selected column {} (value {}, searched depth {})",
                    column, value, depth
                );
                Ok(column)
            }
            None => random_column(&legal),
        }
    }
}

fn random_column(legal: &[usize]) -> Result<usize, SearchError> {
    legal
        .choose(&mut rand::rng())
        .copied()
        .ok_or(SearchError::NoLegalMoves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboard::BitBoard;
    use crate::board::Board;

    fn test_config() -> DriverConfig {
        DriverConfig {
            budget: Duration::from_millis(200),
            threads: 2,
            table_capacity: 1 << 16,
        }
    }

    #[test]
    fn finds_the_immediate_win() -> anyhow::Result<()> {
        // player one has three in the middle column and wins by dropping
        // a fourth
        let board = BitBoard::from_moves("414243")?;
        let mut driver = MtdfDriver::new(test_config())?;
        assert_eq!(driver.determine_move(&board, Mark::PlayerOne)?, 3);
        Ok(())
    }

    #[test]
    fn full_board_has_no_move() -> anyhow::Result<()> {
        let mut board = BitBoard::with_dims(crate::board::Dimensions {
            columns: 4,
            rows: 2,
            win_streak: 4,
        })?;
        for (column, mark) in [
            (0, Mark::PlayerOne),
            (1, Mark::PlayerTwo),
            (2, Mark::PlayerOne),
            (3, Mark::PlayerTwo),
        ] {
            board.play(column, mark)?;
            board.play(column, mark.other())?;
        }
        assert!(board.is_full());

        let mut driver = MtdfDriver::new(test_config())?;
        assert!(matches!(
            driver.determine_move(&board, Mark::PlayerOne),
            Err(SearchError::NoLegalMoves)
        ));
        Ok(())
    }

    #[test]
    fn single_free_cell_falls_back_to_it() -> anyhow::Result<()> {
        // no depth iteration can run with one free cell, so the driver
        // degrades to the uniform fallback over the one legal column
        let mut board = BitBoard::with_dims(crate::board::Dimensions {
            columns: 4,
            rows: 2,
            win_streak: 4,
        })?;
        for (column, mark) in [
            (0, Mark::PlayerOne),
            (1, Mark::PlayerTwo),
            (2, Mark::PlayerOne),
            (3, Mark::PlayerTwo),
        ] {
            board.play(column, mark)?;
            if column != 2 {
                board.play(column, mark.other())?;
            }
        }
        let mut driver = MtdfDriver::new(test_config())?;
        assert_eq!(driver.determine_move(&board, Mark::PlayerTwo)?, 2);
        Ok(())
    }

    #[test]
    fn aborted_driver_still_answers_legally() -> anyhow::Result<()> {
        let board = BitBoard::new();
        let mut driver = MtdfDriver::new(test_config())?;
        driver.abort_handle().abort();

        let column = driver.determine_move(&board, Mark::PlayerOne)?;
        assert!(board.playable(column));
        Ok(())
    }

    #[test]
    fn mtdf_converges_to_the_negamax_value() -> anyhow::Result<()> {
        let far_deadline = Instant::now() + Duration::from_secs(30);
        for moves in ["4", "44", "4455", "435264"] {
            let board = BitBoard::from_moves(moves)?;
            for depth in [1, 2, 3] {
                let wide = nega_max(
                    &board,
                    Mark::PlayerOne,
                    -INFINITY,
                    INFINITY,
                    depth,
                    &SharedTranspositionTable::with_capacity(1 << 16),
                )?;
                let converged = mtdf(
                    &board,
                    Mark::PlayerOne,
                    depth,
                    0,
                    far_deadline,
                    &SharedTranspositionTable::with_capacity(1 << 16),
                )?;
                assert_eq!(converged, wide.value, "moves {} depth {}", moves, depth);
            }
        }
        Ok(())
    }
}
