//! Depth-limited negamax with alpha-beta pruning over the shared
//! transposition table.

use thiserror::Error;

use crate::board::{Board, Mark};
use crate::transposition_table::{Entry, Flag, SharedTranspositionTable};

/// Window bound, outside any reachable value
pub const INFINITY: i32 = i32::MAX / 2;

/// Value of a detected win for the searched mark
pub const WIN_VALUE: i32 = 1_000_000;

// placeholder evaluation weights: a same-mark neighbour in a window counts
// strongly, an open cell counts as a small mobility bonus
const STREAK_WEIGHT: i32 = 8;
const OPEN_WEIGHT: i32 = 1;

#[derive(Debug, Error)]
pub enum SearchError {
    /// A move application failed inside the search tree. The position was
    /// checked playable immediately before, so this is a broken invariant
    /// and the invocation cannot continue.
    #[error("search invariant violated: {0}")]
    Aborted(String),
    #[error("no legal moves available")]
    NoLegalMoves,
    #[error("failed to build the search worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Outcome of one search call. `column` is `None` at terminal and leaf
/// nodes; callers substitute a legal column before the result leaves the
/// engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SearchResult {
    pub column: Option<usize>,
    pub value: i32,
}

/// Returns the columns ordered from the middle outwards, as the middle
/// columns are often better moves
pub fn move_order(columns: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..columns).collect();
    order.sort_by_key(|&column| {
        let distance = (2 * column as i64 - (columns as i64 - 1)).abs();
        (distance, std::cmp::Reverse(column))
    });
    order
}

// cache key: the occupancy code tagged with the side to move, so a value
// stored for one side is never replayed for the other
pub(crate) fn full_key<B: Board>(board: &B, mark: Mark) -> u64 {
    board.position_code() * 2 + mark.index() as u64
}

/// Static evaluation of `board` from the perspective of `mark`.
///
/// A detected win short-circuits to `±WIN_VALUE`. Otherwise every occupied
/// cell contributes a windowed walk along the four axes, stopping at the
/// first enemy tile: same-owner neighbours weigh [`STREAK_WEIGHT`], open
/// cells weigh [`OPEN_WEIGHT`], and the sum is signed by the cell's owner.
/// Not antisymmetric between the two marks; a placeholder.
pub fn node_value<B: Board>(board: &B, mark: Mark) -> i32 {
    if board.has_won(mark) {
        return WIN_VALUE;
    }
    if board.has_won(mark.other()) {
        return -WIN_VALUE;
    }

    let columns = board.columns() as i32;
    let rows = board.rows() as i32;
    let window = board.win_streak() as i32;

    let mut value = 0;
    for column in 0..columns {
        for row in 0..rows {
            let owner = match board.mark_at((column + columns * row) as usize).mark() {
                Some(owner) => owner,
                None => continue,
            };
            let sign = if owner == mark { 1 } else { -1 };
            for (dx, dy) in [(1, 0), (0, 1), (1, 1), (1, -1)] {
                for distance in 1..window {
                    let (x, y) = (column + dx * distance, row + dy * distance);
                    if x < 0 || x >= columns || y < 0 || y >= rows {
                        break;
                    }
                    match board.mark_at((x + columns * y) as usize).mark() {
                        Some(neighbour) if neighbour == owner => value += sign * STREAK_WEIGHT,
                        // window blocked by the other player
                        Some(_) => break,
                        None => value += sign * OPEN_WEIGHT,
                    }
                }
            }
        }
    }
    value
}

/// Performs game tree search to `depth` plies.
///
/// Probes the transposition table first (full-key validated, depth-gated);
/// at a leaf (depth exhausted, full board, or the opponent's last move
/// already won) returns the static evaluation with no column. Interior
/// nodes search children in center-out column order, each on its own deep
/// copy, with the negated and swapped window, and store the outcome tagged
/// as an exact value or a bound.
pub fn nega_max<B: Board>(
    board: &B,
    mark: Mark,
    mut alpha: i32,
    mut beta: i32,
    depth: u32,
    table: &SharedTranspositionTable,
) -> Result<SearchResult, SearchError> {
    let key = full_key(board, mark);
    if let Some(entry) = table.get(key) {
        if entry.depth >= depth {
            match entry.flag {
                Flag::Exact => {
                    return Ok(SearchResult {
                        column: entry.column,
                        value: entry.value,
                    })
                }
                Flag::LowerBound => alpha = alpha.max(entry.value),
                Flag::UpperBound => beta = beta.min(entry.value),
            }
            if alpha >= beta {
                // the bound alone settles this node
                return Ok(SearchResult {
                    column: entry.column,
                    value: entry.value,
                });
            }
        }
    }

    if depth == 0 || board.is_full() || board.has_won(mark.other()) {
        return Ok(SearchResult {
            column: None,
            value: node_value(board, mark),
        });
    }

    let alpha_original = alpha;
    let mut best = SearchResult {
        column: None,
        value: -INFINITY,
    };

    for column in move_order(board.columns()) {
        if !board.playable(column) {
            continue;
        }
        let mut next = board.clone();
        next.play(column, mark)
            .map_err(|error| SearchError::Aborted(error.to_string()))?;

        // the search window is flipped for the other player
        let reply = nega_max(&next, mark.other(), -beta, -alpha, depth - 1, table)?;
        let value = -reply.value;

        if value > best.value {
            best = SearchResult {
                column: Some(column),
                value,
            };
        }
        alpha = alpha.max(best.value);
        if alpha >= beta {
            // a perfect opponent will not pick this branch
            break;
        }
    }

    let flag = if best.value <= alpha_original {
        Flag::UpperBound
    } else if best.value >= beta {
        Flag::LowerBound
    } else {
        Flag::Exact
    };
    table.set(
        key,
        Entry {
            depth,
            value: best.value,
            flag,
            column: best.column,
        },
    );
    Ok(best)
}
