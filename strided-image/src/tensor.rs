//! Per-pixel tensor layouts.
//!
//! A pixel holds `elements()` samples. For matrix-valued pixels the samples
//! may be stored in a compact form (diagonal, symmetric, triangular) that
//! omits implied or repeated values. [`Tensor::look_up_table`] relates the
//! full column-major matrix to that compact storage.

/// Layout of the samples within one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TensorShape {
    #[default]
    ColumnVector,
    RowVector,
    ColumnMajorMatrix,
    RowMajorMatrix,
    /// Only the diagonal is stored.
    DiagonalMatrix,
    /// Diagonal first, then the upper triangle column-wise.
    SymmetricMatrix,
    /// Diagonal first, then the upper triangle column-wise; lower half is zero.
    UpperTriangular,
    /// Diagonal first, then the lower triangle row-wise; upper half is zero.
    LowerTriangular,
}

/// Shape of the per-pixel tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tensor {
    shape: TensorShape,
    elements: usize,
    rows: usize,
}

impl Default for Tensor {
    fn default() -> Self {
        Self::scalar()
    }
}

impl Tensor {
    pub const fn scalar() -> Self {
        Self {
            shape: TensorShape::ColumnVector,
            elements: 1,
            rows: 1,
        }
    }

    pub const fn column_vector(n: usize) -> Self {
        Self {
            shape: TensorShape::ColumnVector,
            elements: n,
            rows: n,
        }
    }

    pub const fn row_vector(n: usize) -> Self {
        Self {
            shape: TensorShape::RowVector,
            elements: n,
            rows: 1,
        }
    }

    /// Full column-major `rows x cols` matrix.
    pub const fn matrix(rows: usize, cols: usize) -> Self {
        let shape = if cols == 1 {
            TensorShape::ColumnVector
        } else if rows == 1 {
            TensorShape::RowVector
        } else {
            TensorShape::ColumnMajorMatrix
        };
        Self {
            shape,
            elements: rows * cols,
            rows,
        }
    }

    /// Full row-major `rows x cols` matrix.
    pub const fn row_major_matrix(rows: usize, cols: usize) -> Self {
        Self {
            shape: TensorShape::RowMajorMatrix,
            elements: rows * cols,
            rows,
        }
    }

    pub const fn diagonal(n: usize) -> Self {
        Self {
            shape: TensorShape::DiagonalMatrix,
            elements: n,
            rows: n,
        }
    }

    pub const fn symmetric(n: usize) -> Self {
        Self {
            shape: TensorShape::SymmetricMatrix,
            elements: n * (n + 1) / 2,
            rows: n,
        }
    }

    pub const fn upper_triangular(n: usize) -> Self {
        Self {
            shape: TensorShape::UpperTriangular,
            elements: n * (n + 1) / 2,
            rows: n,
        }
    }

    pub const fn lower_triangular(n: usize) -> Self {
        Self {
            shape: TensorShape::LowerTriangular,
            elements: n * (n + 1) / 2,
            rows: n,
        }
    }

    #[inline]
    pub fn shape(&self) -> TensorShape {
        self.shape
    }

    /// Number of stored samples per pixel.
    #[inline]
    pub fn elements(&self) -> usize {
        self.elements
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        match self.shape {
            TensorShape::ColumnVector => 1,
            TensorShape::RowVector => self.elements,
            TensorShape::ColumnMajorMatrix | TensorShape::RowMajorMatrix => {
                self.elements / self.rows.max(1)
            }
            _ => self.rows,
        }
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.elements == 1
    }

    /// True when storage order equals the full column-major matrix order.
    pub fn has_normal_order(&self) -> bool {
        matches!(
            self.shape,
            TensorShape::ColumnVector | TensorShape::RowVector | TensorShape::ColumnMajorMatrix
        )
    }

    /// Storage index for each element of the full column-major matrix.
    ///
    /// `None` marks an element that is implicitly zero (off-diagonal entries
    /// of a diagonal matrix, the empty half of a triangular matrix).
    pub fn look_up_table(&self) -> Vec<Option<usize>> {
        let rows = self.rows();
        let cols = self.columns();
        let n = self.rows;
        let mut table = Vec::with_capacity(rows * cols);
        for c in 0..cols {
            for r in 0..rows {
                let index = match self.shape {
                    TensorShape::ColumnVector
                    | TensorShape::RowVector
                    | TensorShape::ColumnMajorMatrix => Some(c * rows + r),
                    TensorShape::RowMajorMatrix => Some(r * cols + c),
                    TensorShape::DiagonalMatrix => (r == c).then_some(r),
                    TensorShape::SymmetricMatrix => Some(triangle_index(n, r.min(c), r.max(c))),
                    TensorShape::UpperTriangular => (r <= c).then(|| triangle_index(n, r, c)),
                    TensorShape::LowerTriangular => {
                        // Lower part row-wise is the transposed upper part column-wise.
                        (r >= c).then(|| triangle_index(n, c, r))
                    }
                };
                table.push(index);
            }
        }
        table
    }
}

/// Compact index of element `(r, c)` with `r <= c`.
fn triangle_index(n: usize, r: usize, c: usize) -> usize {
    if r == c {
        r
    } else {
        n + c * (c - 1) / 2 + r
    }
}

/// Remapping applied while staging tensor elements into a line buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TensorLookup {
    /// Tensor elements are copied in storage order.
    #[default]
    Identity,
    /// Element `i` of the staged pixel is read from storage index
    /// `table[i]`, or written as zero when that entry is `None`.
    Permuted(Vec<Option<usize>>),
}

impl TensorLookup {
    /// Lookup that expands `tensor` into its full column-major form, or
    /// [`TensorLookup::Identity`] if it is already in that order.
    pub fn expanding(tensor: &Tensor) -> Self {
        if tensor.has_normal_order() {
            TensorLookup::Identity
        } else {
            TensorLookup::Permuted(tensor.look_up_table())
        }
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        matches!(self, TensorLookup::Identity)
    }

    /// Number of staged elements per pixel, given the stored count.
    pub fn output_elements(&self, stored: usize) -> usize {
        match self {
            TensorLookup::Identity => stored,
            TensorLookup::Permuted(table) => table.len(),
        }
    }

    /// Storage index feeding staged element `index`.
    #[inline]
    pub fn source(&self, index: usize) -> Option<usize> {
        match self {
            TensorLookup::Identity => Some(index),
            TensorLookup::Permuted(table) => table.get(index).copied().flatten(),
        }
    }
}
