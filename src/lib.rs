//! A time-bounded agent for playing 'Connect 4' style connection games
//!
//! This agent searches the game tree with negamax, alpha-beta pruning and a
//! shared transposition table, driven by an iterative deepening MTD(f) loop
//! that evaluates root moves in parallel and answers with the best move
//! found inside a wall-clock budget.
//!
//! # Basic Usage
//!
//! ```
//! use fourline_ai::bitboard::BitBoard;
//! use fourline_ai::board::{Board, Mark};
//! use fourline_ai::mtdf::DriverConfig;
//! use fourline_ai::player::{AiPlayer, Strategy};
//! use std::time::Duration;
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let board = BitBoard::from_moves("44")?;
//! let mut player = AiPlayer::new(DriverConfig {
//!     budget: Duration::from_millis(50),
//!     table_capacity: 1 << 16,
//!     ..DriverConfig::default()
//! })?;
//!
//! let column = player.determine_move(&board, Mark::PlayerOne)?;
//! assert!(board.playable(column));
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod board;

pub mod bitboard;

pub mod arrayboard;

pub mod transposition_table;

pub mod search;

pub mod mtdf;

pub mod player;


/// The default width of the game board in tiles
pub const WIDTH: usize = 7;

/// The default height of the game board in tiles
pub const HEIGHT: usize = 6;

/// The default length of an aligned run that wins the game
pub const WIN_STREAK: usize = 4;

// ensure that the default dimensions fit in a u64 for the bitboard
// representation, position code arithmetic included
const_assert!(WIDTH * (HEIGHT + 1) < 62);
