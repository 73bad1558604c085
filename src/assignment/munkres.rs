/// Stand-in value for infeasible cells while reducing the matrix.
/// Large enough to lose against any realistic pairing cost, small enough
/// to survive f64 subtraction without drift.
const BIG: f64 = 1.0e9;

/// Padding cost for the square extension of a rectangular matrix.
const PADDING: f64 = 0.0;

const NONE: u8 = 0;
const STAR: u8 = 1;
const PRIME: u8 = 2;

const EPS: f64 = 1.0e-9;

/// Row-major R×C cost matrix. Non-finite entries (NaN/±inf) mark pairs
/// that must never be matched.
#[derive(Debug, Clone)]
pub struct CostMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl CostMatrix {
    /// Creates a matrix filled with zeros.
    pub fn new(rows: usize, cols: usize) -> Self {
        CostMatrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }
    /// Creates a matrix by evaluating `f` at every (row, col) position.
    ///
    /// Basic usage:
    ///
    /// ```
    /// use bestshot_rs::assignment::CostMatrix;
    /// let costs = CostMatrix::from_fn(2, 3, |r, c| (r + c) as f32);
    /// assert_eq!(costs.at(1, 2), 3.0);
    /// ```
    pub fn from_fn<F: FnMut(usize, usize) -> f32>(rows: usize, cols: usize, mut f: F) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        CostMatrix { rows, cols, data }
    }
    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.cols + col] = value;
    }
}

/// One-to-one assignment between rows and columns of a cost matrix.
/// `None` means the row/column stayed unmatched (rectangular padding or
/// an infeasible cost).
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub row_to_col: Vec<Option<usize>>,
    pub col_to_row: Vec<Option<usize>>,
}

impl Assignment {
    /// Sum of the matched cells' costs.
    pub fn total_cost(&self, costs: &CostMatrix) -> f32 {
        self.row_to_col
            .iter()
            .enumerate()
            .filter_map(|(r, c)| c.map(|c| costs.at(r, c)))
            .sum()
    }
}

/// Minimum-cost one-to-one assignment via the Munkres (Hungarian) algorithm.
///
/// Rectangular matrices are padded to square internally; padded pairings are
/// reported as unmatched, as are pairings through non-finite cells, so
/// degenerate input (e.g. an all-infinite matrix) simply yields an empty
/// assignment instead of a forced bad one. Ties resolve to the lowest
/// row/column index.
///
/// Basic usage:
///
/// ```
/// use bestshot_rs::assignment::{solve, CostMatrix};
/// let costs = CostMatrix::from_fn(2, 2, |r, c| if r == c { 1.0 } else { 5.0 });
/// let assignment = solve(&costs);
/// assert_eq!(assignment.row_to_col, vec![Some(0), Some(1)]);
/// ```
pub fn solve(costs: &CostMatrix) -> Assignment {
    let rows = costs.rows();
    let cols = costs.cols();
    if rows == 0 || cols == 0 {
        return Assignment {
            row_to_col: vec![None; rows],
            col_to_row: vec![None; cols],
        };
    }
    let solver = Munkres::new(costs);
    solver.run(costs)
}

/// Working state of one solver run on the squared matrix.
struct Munkres {
    n: usize,
    cost: Vec<f64>,
    marks: Vec<u8>,
    covered_rows: Vec<bool>,
    covered_cols: Vec<bool>,
}

impl Munkres {
    fn new(costs: &CostMatrix) -> Self {
        let n = usize::max(costs.rows(), costs.cols());
        let mut cost = vec![PADDING; n * n];
        for r in 0..costs.rows() {
            for c in 0..costs.cols() {
                let v = costs.at(r, c);
                cost[r * n + c] = if v.is_finite() { v as f64 } else { BIG };
            }
        }
        Munkres {
            n,
            cost,
            marks: vec![NONE; n * n],
            covered_rows: vec![false; n],
            covered_cols: vec![false; n],
        }
    }

    fn run(mut self, costs: &CostMatrix) -> Assignment {
        self.reduce_rows();
        self.reduce_cols();
        self.star_zeros();

        while self.cover_starred_cols() < self.n {
            loop {
                match self.find_uncovered_zero() {
                    Some((r, c)) => {
                        self.marks[r * self.n + c] = PRIME;
                        if let Some(star_col) = self.star_in_row(r) {
                            self.covered_rows[r] = true;
                            self.covered_cols[star_col] = false;
                        } else {
                            self.augment(r, c);
                            self.clear_covers_and_primes();
                            break;
                        }
                    }
                    None => self.relax(),
                }
            }
        }

        self.extract(costs)
    }

    fn reduce_rows(&mut self) {
        for r in 0..self.n {
            let row = &mut self.cost[r * self.n..(r + 1) * self.n];
            let min = row.iter().cloned().fold(f64::MAX, f64::min);
            for v in row.iter_mut() {
                *v -= min;
                if *v < 0.0 {
                    *v = 0.0;
                }
            }
        }
    }

    fn reduce_cols(&mut self) {
        for c in 0..self.n {
            let mut min = f64::MAX;
            for r in 0..self.n {
                min = f64::min(min, self.cost[r * self.n + c]);
            }
            for r in 0..self.n {
                let v = &mut self.cost[r * self.n + c];
                *v -= min;
                if *v < 0.0 {
                    *v = 0.0;
                }
            }
        }
    }

    /// Greedy initial starring, row-major so ties go to lower indexes.
    fn star_zeros(&mut self) {
        let mut row_has_star = vec![false; self.n];
        let mut col_has_star = vec![false; self.n];
        for r in 0..self.n {
            for c in 0..self.n {
                if self.cost[r * self.n + c] <= EPS && !row_has_star[r] && !col_has_star[c] {
                    self.marks[r * self.n + c] = STAR;
                    row_has_star[r] = true;
                    col_has_star[c] = true;
                }
            }
        }
    }

    fn cover_starred_cols(&mut self) -> usize {
        let mut covered = 0;
        for c in 0..self.n {
            let has_star = (0..self.n).any(|r| self.marks[r * self.n + c] == STAR);
            self.covered_cols[c] = has_star;
            if has_star {
                covered += 1;
            }
        }
        covered
    }

    fn find_uncovered_zero(&self) -> Option<(usize, usize)> {
        for r in 0..self.n {
            if self.covered_rows[r] {
                continue;
            }
            for c in 0..self.n {
                if !self.covered_cols[c] && self.cost[r * self.n + c] <= EPS {
                    return Some((r, c));
                }
            }
        }
        None
    }

    fn star_in_row(&self, row: usize) -> Option<usize> {
        (0..self.n).find(|&c| self.marks[row * self.n + c] == STAR)
    }

    fn star_in_col(&self, col: usize) -> Option<usize> {
        (0..self.n).find(|&r| self.marks[r * self.n + col] == STAR)
    }

    fn prime_in_row(&self, row: usize) -> Option<usize> {
        (0..self.n).find(|&c| self.marks[row * self.n + c] == PRIME)
    }

    /// Alternating prime/star path starting at an uncovered prime;
    /// flips the path so the star count grows by one.
    fn augment(&mut self, prime_row: usize, prime_col: usize) {
        let mut path = vec![(prime_row, prime_col)];
        let mut col = prime_col;
        while let Some(star_row) = self.star_in_col(col) {
            path.push((star_row, col));
            // a path row always holds a primed zero
            let next_col = match self.prime_in_row(star_row) {
                Some(c) => c,
                None => break,
            };
            path.push((star_row, next_col));
            col = next_col;
        }
        for (r, c) in path {
            let mark = &mut self.marks[r * self.n + c];
            *mark = if *mark == STAR { NONE } else { STAR };
        }
    }

    fn clear_covers_and_primes(&mut self) {
        self.covered_rows.iter_mut().for_each(|v| *v = false);
        self.covered_cols.iter_mut().for_each(|v| *v = false);
        for mark in self.marks.iter_mut() {
            if *mark == PRIME {
                *mark = NONE;
            }
        }
    }

    /// No uncovered zero left: shift the threshold by the smallest
    /// uncovered value to expose a new one.
    fn relax(&mut self) {
        let mut min = f64::MAX;
        for r in 0..self.n {
            if self.covered_rows[r] {
                continue;
            }
            for c in 0..self.n {
                if !self.covered_cols[c] {
                    min = f64::min(min, self.cost[r * self.n + c]);
                }
            }
        }
        for r in 0..self.n {
            for c in 0..self.n {
                let v = &mut self.cost[r * self.n + c];
                if self.covered_rows[r] {
                    *v += min;
                }
                if !self.covered_cols[c] {
                    *v -= min;
                    if *v < 0.0 {
                        *v = 0.0;
                    }
                }
            }
        }
    }

    /// Maps starred cells of the squared matrix back to the original shape,
    /// dropping padded and infeasible pairings.
    fn extract(self, costs: &CostMatrix) -> Assignment {
        let rows = costs.rows();
        let cols = costs.cols();
        let mut row_to_col = vec![None; rows];
        let mut col_to_row = vec![None; cols];
        for r in 0..rows {
            for c in 0..cols {
                if self.marks[r * self.n + c] == STAR && costs.at(r, c).is_finite() {
                    row_to_col[r] = Some(c);
                    col_to_row[c] = Some(r);
                }
            }
        }
        Assignment {
            row_to_col,
            col_to_row,
        }
    }
}
