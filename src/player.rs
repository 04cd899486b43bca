use rand::prelude::*;

use crate::board::{Board, Mark};
use crate::mtdf::{AbortHandle, DriverConfig, MtdfDriver};
use crate::search::SearchError;

/// A move supplier, invoked once per turn by whatever drives the game:
/// a renderer, a network relay, or a test harness.
///
/// The returned column is in `0..board.columns()` and was playable at call
/// time; internal leaf sentinels never cross this boundary.
pub trait Strategy<B: Board> {
    fn determine_move(&mut self, board: &B, mark: Mark) -> Result<usize, SearchError>;
}

/// The search-backed player: a thin wrapper delegating to the iterative
/// deepening driver.
pub struct AiPlayer {
    driver: MtdfDriver,
}

impl AiPlayer {
    pub fn new(config: DriverConfig) -> Result<Self, SearchError> {
        Ok(Self {
            driver: MtdfDriver::new(config)?,
        })
    }

    /// Handle for cancelling a move computation from another thread
    pub fn abort_handle(&self) -> AbortHandle {
        self.driver.abort_handle()
    }
}

impl<B: Board> Strategy<B> for AiPlayer {
    fn determine_move(&mut self, board: &B, mark: Mark) -> Result<usize, SearchError> {
        self.driver.determine_move(board, mark)
    }
}

/// Picks uniformly among the legal columns; a baseline opponent.
pub struct RandomPlayer;

impl<B: Board> Strategy<B> for RandomPlayer {
    fn determine_move(&mut self, board: &B, _mark: Mark) -> Result<usize, SearchError> {
        let legal: Vec<usize> = (0..board.columns())
            .filter(|&column| board.playable(column))
            .collect();
        legal
            .choose(&mut rand::rng())
            .copied()
            .ok_or(SearchError::NoLegalMoves)
    }
}
