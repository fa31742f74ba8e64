/// Dense row-major `f64` matrix with named columns, as produced by
/// [`Evaluation::x`](crate::Evaluation::x).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DesignMatrix {
    names: Vec<String>,
    nrows: usize,
    data: Vec<f64>,
}

impl DesignMatrix {
    /// `data` holds `nrows * names.len()` values, row after row.
    pub(crate) fn new(names: Vec<String>, nrows: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), nrows * names.len());
        Self { names, nrows, data }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.names.len()
    }

    /// Column names, left to right.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.nrows || col >= self.ncols() {
            return None;
        }
        self.data.get(row * self.ncols() + col).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.nrows {
            return None;
        }
        let ncols = self.ncols();
        self.data.get(row * ncols..(row + 1) * ncols)
    }

    /// Copies out the column called `name`.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let col = self.names.iter().position(|n| n == name)?;
        Some(self.rows().map(|row| row[col]).collect())
    }

    /// Iterates rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.nrows).filter_map(|row| self.row(row))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }
}
