use crate::board::{Board, BoardError, Cell, Dimensions, Mark};

/// Naive cell-array implementation of the [`Board`] contract.
///
/// No bit tricks: every query walks the grid. This exists to cross-validate
/// the bit-packed board and to keep the contract honest with a second
/// implementor; external callers that only render or relay moves may use it
/// too.
#[derive(Clone)]
pub struct ArrayBoard {
    dims: Dimensions,
    // cells are stored left-to-right, bottom-to-top
    cells: Vec<Cell>,
    heights: Vec<usize>,
    num_moves: usize,
}

impl ArrayBoard {
    pub fn new() -> Self {
        Self::build(Dimensions::STANDARD)
    }

    pub fn with_dims(dims: Dimensions) -> Result<Self, BoardError> {
        Ok(Self::build(dims.validate()?))
    }

    fn build(dims: Dimensions) -> Self {
        Self {
            dims,
            cells: vec![Cell::Empty; dims.columns * dims.rows],
            heights: vec![0; dims.columns],
            num_moves: 0,
        }
    }

    fn cell(&self, column: usize, row: usize) -> Cell {
        self.cells[column + self.dims.columns * row]
    }

    // walk one window of `win_streak` cells and report whether every cell
    // belongs to `mark`
    fn window_is_won(&self, mark: Mark, column: i32, row: i32, dx: i32, dy: i32) -> bool {
        let (columns, rows) = (self.dims.columns as i32, self.dims.rows as i32);
        for i in 0..self.dims.win_streak as i32 {
            let (x, y) = (column + i * dx, row + i * dy);
            if x < 0 || x >= columns || y < 0 || y >= rows {
                return false;
            }
            if self.cell(x as usize, y as usize) != Cell::from(mark) {
                return false;
            }
        }
        true
    }
}

impl Board for ArrayBoard {
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
        column < self.dims.columns && self.heights[column] < self.dims.rows
    }

    fn play(&mut self, column: usize, mark: Mark) -> Result<(), BoardError> {
        if !self.playable(column) {
            return Err(BoardError::InvalidMove { column });
        }
        self.cells[column + self.dims.columns * self.heights[column]] = mark.into();
        self.heights[column] += 1;
        self.num_moves += 1;
        Ok(())
    }

    fn has_won(&self, mark: Mark) -> bool {
        for column in 0..self.dims.columns as i32 {
            for row in 0..self.dims.rows as i32 {
                for (dx, dy) in [(1, 0), (0, 1), (1, 1), (1, -1)] {
                    if self.window_is_won(mark, column, row, dx, dy) {
                        return true;
                    }
                }
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
        // same bit layout as the packed board so the two implementations
        // agree on codes for identical cell contents
        let stride = self.dims.rows + 1;
        let mut code = 0u64;
        for column in 0..self.dims.columns {
            code += 1 << (column * stride);
            for row in 0..self.dims.rows {
                let bit = 1u64 << (column * stride + row);
                match self.cell(column, row) {
                    Cell::PlayerOne => code += 2 * bit,
                    Cell::PlayerTwo => code += bit,
                    Cell::Empty => {}
                }
            }
        }
        code
    }

    fn mark_at(&self, index: usize) -> Cell {
        self.cells.get(index).copied().unwrap_or(Cell::Empty)
    }
}

impl Default for ArrayBoard {
    fn default() -> Self {
        Self::new()
    }
}
