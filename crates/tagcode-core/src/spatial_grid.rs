//! Uniform-grid spatial index for fixed-radius neighbor queries.
//!
//! Elements are stored by value in the bucket covering their insertion
//! point. The grid is meant to hold cheap handles (segment or corner
//! indices into the caller's own storage), so equality of two stored
//! values is identity of the referenced object.

/// Errors returned when creating a [`SpatialGrid`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum GridError {
    #[error("cell size must be finite and > 0 (got {0})")]
    InvalidCellSize(f64),
    #[error("invalid grid extent [{x0}, {x1}] x [{y0}, {y1}]")]
    InvalidExtent { x0: f64, y0: f64, x1: f64, y1: f64 },
    #[error("grid of {width} x {height} cells is too large")]
    TooManyCells { width: f64, height: f64 },
}

/// Buckets of elements over the rectangle `[x0, x1) x [y0, y1)`.
///
/// Queries return every element in any bucket touching the query square,
/// which is a superset of the true disk; callers filter by exact distance
/// when they need it.
///
/// `T` is expected to be a handle (an index or id into the caller's
/// storage) whose equality means identity: [`SpatialGrid::remove`] drops
/// the first stored value that compares equal, so two distinct objects
/// must never share a handle.
#[derive(Clone, Debug)]
pub struct SpatialGrid<T> {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    cell_size: f64,
    width: usize,
    height: usize,
    cells: Vec<Vec<T>>,
    len: usize,
}

impl<T> SpatialGrid<T> {
    /// Create a grid covering `[x0, x1] x [y0, y1]` with square cells of side `cell_size`.
    ///
    /// The grid spans `ceil(span / cell_size) + 1` cells per axis, so the
    /// stored upper bounds may exceed the requested ones.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64, cell_size: f64) -> Result<Self, GridError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        let extent_ok = [x0, y0, x1, y1].iter().all(|v| v.is_finite()) && x1 >= x0 && y1 >= y0;
        if !extent_ok {
            return Err(GridError::InvalidExtent { x0, y0, x1, y1 });
        }

        let wf = ((x1 - x0) / cell_size).ceil() + 1.0;
        let hf = ((y1 - y0) / cell_size).ceil() + 1.0;
        let too_many = GridError::TooManyCells {
            width: wf,
            height: hf,
        };
        let (width, height) = match (axis_cells(wf), axis_cells(hf)) {
            (Some(w), Some(h)) => (w, h),
            _ => return Err(too_many),
        };
        let bucket_bytes = std::mem::size_of::<Vec<T>>();
        let count = match width.checked_mul(height) {
            Some(n) if n.checked_mul(bucket_bytes).is_some_and(|b| b <= isize::MAX as usize) => n,
            _ => return Err(too_many),
        };
        let mut cells = Vec::new();
        cells.try_reserve_exact(count).map_err(|_| too_many)?;
        cells.resize_with(count, Vec::new);

        log::debug!("spatial grid {width}x{height} cells of {cell_size}");

        Ok(Self {
            x0,
            y0,
            x1: x0 + cell_size * width as f64,
            y1: y0 + cell_size * height as f64,
            cell_size,
            width,
            height,
            cells,
            len: 0,
        })
    }

    /// Grid width in cells.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Covered rectangle as `[x0, y0, x1, y1]` (upper bounds exclusive).
    pub fn bounds(&self) -> [f64; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }

    /// Number of stored elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every element, keeping the bucket allocations.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.len = 0;
    }

    /// Signed cell coordinate along one axis; `None` for NaN input.
    #[inline]
    fn axis_index(&self, v: f64, origin: f64) -> Option<i64> {
        let f = ((v - origin) / self.cell_size).floor();
        if f.is_nan() {
            None
        } else {
            Some(f as i64)
        }
    }

    /// Bucket index for a point, `None` when outside the grid.
    fn cell_index(&self, x: f64, y: f64) -> Option<usize> {
        let ix = self.axis_index(x, self.x0)?;
        let iy = self.axis_index(y, self.y0)?;
        if ix < 0 || iy < 0 || ix >= self.width as i64 || iy >= self.height as i64 {
            return None;
        }
        Some(iy as usize * self.width + ix as usize)
    }

    /// Store `element` in the bucket covering `(x, y)`.
    ///
    /// Points outside the grid are ignored.
    pub fn add(&mut self, x: f64, y: f64, element: T) {
        match self.cell_index(x, y) {
            Some(idx) => {
                self.cells[idx].push(element);
                self.len += 1;
            }
            None => log::trace!("dropping point ({x}, {y}) outside grid"),
        }
    }

    /// Elements in every bucket touching `[x - range, x + range] x [y - range, y + range]`.
    ///
    /// Buckets are visited row by row, then in insertion order. The borrow
    /// on `self` keeps the grid unmodified while the query is alive.
    pub fn find(&self, x: f64, y: f64, range: f64) -> GridQuery<'_, T> {
        let span = |lo: f64, hi: f64, origin: f64, cells: usize| -> Option<(usize, usize)> {
            let i0 = self.axis_index(lo, origin)?;
            let i1 = self.axis_index(hi, origin)?;
            if i1 < 0 || i0 >= cells as i64 || i0 > i1 {
                return None;
            }
            Some((i0.max(0) as usize, i1.min(cells as i64 - 1) as usize))
        };

        let xs = span(x - range, x + range, self.x0, self.width);
        let ys = span(y - range, y + range, self.y0, self.height);
        let window = match (xs, ys) {
            (Some((ix0, ix1)), Some((iy0, iy1))) => Some(Window {
                ix0,
                ix1,
                iy1,
                ix: ix0,
                iy: iy0,
            }),
            _ => None,
        };

        GridQuery {
            grid: self,
            window,
            current: Default::default(),
        }
    }
}

/// Cell count along one axis, `None` when it is not representable.
fn axis_cells(n: f64) -> Option<usize> {
    // `usize::MAX as f64` rounds up, so `<` keeps the cast exact.
    if n.is_finite() && n >= 1.0 && n < usize::MAX as f64 {
        Some(n as usize)
    } else {
        None
    }
}

impl<T: PartialEq> SpatialGrid<T> {
    /// Remove the first stored value equal to `element` from the bucket covering `(x, y)`.
    ///
    /// Returns the removed value, or `None` if the point is outside the grid
    /// or the bucket does not hold it. Remaining elements keep their order.
    pub fn remove(&mut self, x: f64, y: f64, element: &T) -> Option<T> {
        let idx = self.cell_index(x, y)?;
        let cell = &mut self.cells[idx];
        let pos = cell.iter().position(|e| e == element)?;
        self.len -= 1;
        Some(cell.remove(pos))
    }
}

#[derive(Clone, Copy, Debug)]
struct Window {
    ix0: usize,
    ix1: usize,
    iy1: usize,
    ix: usize,
    iy: usize,
}

/// Lazy iterator returned by [`SpatialGrid::find`].
///
/// Once exhausted it stays exhausted; call `find` again for a fresh query.
#[derive(Clone, Debug)]
pub struct GridQuery<'a, T> {
    grid: &'a SpatialGrid<T>,
    window: Option<Window>,
    current: std::slice::Iter<'a, T>,
}

impl<'a, T> Iterator for GridQuery<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.current.next() {
                return Some(item);
            }

            let w = self.window.as_mut()?;
            if w.iy > w.iy1 {
                self.window = None;
                return None;
            }
            self.current = self.grid.cells[w.iy * self.grid.width + w.ix].iter();
            if w.ix == w.ix1 {
                w.ix = w.ix0;
                w.iy += 1;
            } else {
                w.ix += 1;
            }
        }
    }
}

impl<T> std::iter::FusedIterator for GridQuery<'_, T> {}
