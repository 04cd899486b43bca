use anyhow::{anyhow, Result};

use crate::board::{Board, BoardError, Cell, Dimensions, Mark};

/// Bit-packed game position.
///
/// Each player owns one bitmask over a grid padded with a sentinel row per
/// column (column stride `rows + 1`), so column overflow is a single mask
/// test and win detection stays in word operations. The two masks never
/// share a set bit.
#[derive(Clone)]
pub struct BitBoard {
    dims: Dimensions,
    // one mask per player, disjoint
    masks: [u64; 2],
    // filled cells per column, 0..=rows
    heights: Vec<u8>,
    history: Vec<(u8, Mark)>,
    num_moves: usize,
    // one set bit at the base of every column
    bottom: u64,
}

impl BitBoard {
    /// Creates an empty board with the standard dimensions
    pub fn new() -> Self {
        Self::build(Dimensions::STANDARD)
    }

    /// Creates an empty board with the given dimensions.
    ///
    /// Fails when the padded grid does not fit the 64-bit representation.
    pub fn with_dims(dims: Dimensions) -> Result<Self, BoardError> {
        Ok(Self::build(dims.validate()?))
    }

    fn build(dims: Dimensions) -> Self {
        let mut bottom = 0;
        for column in 0..dims.columns {
            bottom |= 1 << (column * (dims.rows + 1));
        }
        Self {
            dims,
            masks: [0; 2],
            heights: vec![0; dims.columns],
            history: Vec::with_capacity(dims.columns * dims.rows),
            num_moves: 0,
            bottom,
        }
    }

    /// Replays a move string of 1-indexed columns, alternating players
    /// starting with player one.
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self> {
        let mut board = Self::new();
        let mut mark = Mark::PlayerOne;

        for column_char in moves.as_ref().chars() {
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..) if column <= board.dims.columns => {
                    board.play(column - 1, mark)?;
                    mark = mark.other();
                }
                _ => return Err(anyhow!("could not parse '{}' as a valid move", column_char)),
            }
        }
        Ok(board)
    }

    /// The moves played so far, in order
    pub fn moves(&self) -> &[(u8, Mark)] {
        &self.history
    }

    fn column_base(&self, column: usize) -> usize {
        column * (self.dims.rows + 1)
    }

    // true when `mask` holds a run of `streak` cells along `step`, found by
    // pairwise AND-reduction with doubling shift widths
    fn contains_run(&self, mask: u64, step: usize, streak: usize) -> bool {
        // a run along this direction cannot fit the grid at all
        if (streak - 1) * step >= self.dims.mask_bits() {
            return false;
        }
        let mut m = mask;
        let mut covered = 1;
        while covered * 2 <= streak {
            m &= m >> (covered * step);
            covered *= 2;
        }
        if covered < streak {
            m &= m >> ((streak - covered) * step);
        }
        m != 0
    }
}

impl Board for BitBoard {
    fn columns(&self) -> usize {
        self.dims.columns
    }

    fn rows(&self) -> usize {
        self.dims.rows
    }

    fn win_streak(&self) -> usize {
        self.dims.win_streak
    }

    fn playable(&self, column: usize) -> bool {
        column < self.dims.columns && (self.heights[column] as usize) < self.dims.rows
    }

    fn play(&mut self, column: usize, mark: Mark) -> Result<(), BoardError> {
        if !self.playable(column) {
            return Err(BoardError::InvalidMove { column });
        }
        let bit = self.column_base(column) + self.heights[column] as usize;
        // the mask update must land before the height moves on
        self.masks[mark.index()] |= 1 << bit;
        self.history.push((column as u8, mark));
        self.heights[column] += 1;
        self.num_moves += 1;
        Ok(())
    }

    fn has_won(&self, mark: Mark) -> bool {
        let mask = self.masks[mark.index()];
        let stride = self.dims.rows + 1;

        // vertical, horizontal, then both diagonals
        for step in [1, stride, stride - 1, stride + 1] {
            if self.contains_run(mask, step, self.dims.win_streak) {
                return true;
            }
        }
        false
    }

    fn is_full(&self) -> bool {
        self.num_moves >= self.spot_count()
    }

    fn num_moves(&self) -> usize {
        self.num_moves
    }

    fn position_code(&self) -> u64 {
        // the masks are disjoint, so this is occupancy + player one's mask
        // + the bottom pattern: injective over cell contents for a fixed
        // player numbering
        2 * self.masks[0] + self.masks[1] + self.bottom
    }

    fn mark_at(&self, index: usize) -> Cell {
        if index >= self.spot_count() {
            return Cell::Empty;
        }
        let column = index % self.dims.columns;
        let row = index / self.dims.columns;
        let bit = 1 << (self.column_base(column) + row);
        if self.masks[0] & bit != 0 {
            Cell::PlayerOne
        } else if self.masks[1] & bit != 0 {
            Cell::PlayerTwo
        } else {
            Cell::Empty
        }
    }
}

impl Default for BitBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HEIGHT, WIDTH};

    #[test]
    fn empty_board_has_no_winner() {
        let board = BitBoard::new();
        assert!(!board.has_won(Mark::PlayerOne));
        assert!(!board.has_won(Mark::PlayerTwo));
        assert!(!board.is_full());
        assert_eq!(board.num_moves(), 0);
    }

    #[test]
    fn play_updates_plies_and_capacity() -> Result<()> {
        let mut board = BitBoard::new();
        let snapshot = board.clone();

        for _ in 0..HEIGHT {
            assert!(board.playable(2));
            board.play(2, Mark::PlayerOne)?;
        }
        assert_eq!(board.num_moves(), HEIGHT);
        assert!(!board.playable(2));
        assert_eq!(
            board.play(2, Mark::PlayerTwo),
            Err(BoardError::InvalidMove { column: 2 })
        );

        // the pre-move copy shares nothing with the mutated board
        assert_eq!(snapshot.num_moves(), 0);
        assert!(snapshot.playable(2));
        assert_eq!(snapshot.mark_at(2), Cell::Empty);
        Ok(())
    }

    #[test]
    fn out_of_range_column_rejected() {
        let mut board = BitBoard::new();
        assert_eq!(
            board.play(WIDTH, Mark::PlayerOne),
            Err(BoardError::InvalidMove { column: WIDTH })
        );
    }

    #[test]
    fn vertical_win_detected() -> Result<()> {
        let mut board = BitBoard::new();
        for _ in 0..3 {
            board.play(3, Mark::PlayerOne)?;
            board.play(0, Mark::PlayerTwo)?;
            assert!(!board.has_won(Mark::PlayerOne));
        }
        board.play(3, Mark::PlayerOne)?;
        assert!(board.has_won(Mark::PlayerOne));
        assert!(!board.has_won(Mark::PlayerTwo));
        assert!(!board.is_full());
        Ok(())
    }

    #[test]
    fn horizontal_and_diagonal_wins_detected() -> Result<()> {
        // columns 1-4 on the bottom row for player one
        let board = BitBoard::from_moves("1122334")?;
        assert!(board.has_won(Mark::PlayerOne));

        // rising diagonal for player one from column 1 to column 4
        let board = BitBoard::from_moves("12234334414")?;
        assert!(board.has_won(Mark::PlayerOne));
        Ok(())
    }

    #[test]
    fn sentinel_row_does_not_fake_runs() -> Result<()> {
        // fill two adjacent columns with the same mark: the sentinel gap
        // must keep runs from leaking into the neighbouring column
        let mut board = BitBoard::with_dims(Dimensions {
            columns: 4,
            rows: 3,
            win_streak: 4,
        })?;
        for column in [0, 1] {
            for _ in 0..3 {
                board.play(column, Mark::PlayerTwo)?;
            }
        }
        assert!(!board.has_won(Mark::PlayerTwo));
        Ok(())
    }

    #[test]
    fn longer_win_streak_respected() -> Result<()> {
        let mut board = BitBoard::with_dims(Dimensions {
            columns: 7,
            rows: 6,
            win_streak: 5,
        })?;
        for _ in 0..4 {
            board.play(1, Mark::PlayerTwo)?;
        }
        assert!(!board.has_won(Mark::PlayerTwo));
        board.play(1, Mark::PlayerTwo)?;
        assert!(board.has_won(Mark::PlayerTwo));
        Ok(())
    }

    #[test]
    fn position_code_is_injective_over_occupancy() {
        use std::collections::HashMap;

        // sweep all positions up to 4 plies and check distinct cell
        // contents never share a code
        let mut seen: HashMap<u64, Vec<Cell>> = HashMap::new();
        let mut stack = vec![BitBoard::new()];
        while let Some(board) = stack.pop() {
            let cells: Vec<Cell> = (0..board.spot_count()).map(|i| board.mark_at(i)).collect();
            if let Some(previous) = seen.insert(board.position_code(), cells.clone()) {
                assert_eq!(previous, cells);
            }
            if board.num_moves() < 4 {
                for column in 0..WIDTH {
                    for mark in [Mark::PlayerOne, Mark::PlayerTwo] {
                        let mut next = board.clone();
                        if next.play(column, mark).is_ok() {
                            stack.push(next);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn swapped_marks_change_the_code() -> Result<()> {
        let mut a = BitBoard::new();
        a.play(3, Mark::PlayerOne)?;
        let mut b = BitBoard::new();
        b.play(3, Mark::PlayerTwo)?;
        assert_ne!(a.position_code(), b.position_code());
        Ok(())
    }

    #[test]
    fn mark_at_matches_played_moves() -> Result<()> {
        let board = BitBoard::from_moves("434")?;
        assert_eq!(board.mark_at(3), Cell::PlayerOne);
        assert_eq!(board.mark_at(3 + WIDTH), Cell::PlayerOne);
        assert_eq!(board.mark_at(2), Cell::PlayerTwo);
        assert_eq!(board.mark_at(board.spot_count() + 10), Cell::Empty);
        Ok(())
    }

    #[test]
    fn history_records_the_game() -> Result<()> {
        let board = BitBoard::from_moves("123")?;
        assert_eq!(
            board.moves(),
            &[
                (0, Mark::PlayerOne),
                (1, Mark::PlayerTwo),
                (2, Mark::PlayerOne)
            ]
        );
        Ok(())
    }
}
