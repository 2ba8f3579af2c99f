use serde::{Deserialize, Serialize};

/// Errors for malformed board descriptions.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    #[error("checkerboard needs at least 3x3 squares, got {cols}x{rows}")]
    TooFewSquares { cols: u32, rows: u32 },
    #[error("square size must be finite and positive, got {0}")]
    InvalidSquareSize(f64),
}

/// Physical description of a printed (or displayed) checkerboard.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckerboardSpec {
    /// Number of squares along x and y.
    pub squares: [u32; 2],
    /// Side length of one square, in centimeters.
    pub square_size: f64,
}

/// Inner-corner dimensions of a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSize {
    pub cols: u32,
    pub rows: u32,
}

impl BoardSize {
    pub fn corner_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    pub fn transposed(&self) -> Self {
        Self {
            cols: self.rows,
            rows: self.cols,
        }
    }
}

impl CheckerboardSpec {
    pub fn new(squares: [u32; 2], square_size: f64) -> Result<Self, BoardError> {
        let spec = Self {
            squares,
            square_size,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), BoardError> {
        let [cols, rows] = self.squares;
        if cols < 3 || rows < 3 {
            return Err(BoardError::TooFewSquares { cols, rows });
        }
        if !(self.square_size.is_finite() && self.square_size > 0.0) {
            return Err(BoardError::InvalidSquareSize(self.square_size));
        }
        Ok(())
    }

    /// A board of `c x r` squares has `(c - 1) x (r - 1)` inner corners.
    pub fn inner_corners(&self) -> BoardSize {
        BoardSize {
            cols: self.squares[0].saturating_sub(1),
            rows: self.squares[1].saturating_sub(1),
        }
    }

    /// Physical positions of the inner corners on the board plane, row-major.
    pub fn object_points(&self) -> Vec<nalgebra::Point2<f64>> {
        let size = self.inner_corners();
        (0..size.rows)
            .flat_map(|j| {
                (0..size.cols).map(move |i| {
                    nalgebra::Point2::new(
                        i as f64 * self.square_size,
                        j as f64 * self.square_size,
                    )
                })
            })
            .collect()
    }
}
