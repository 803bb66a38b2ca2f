use bytemuck::Zeroable;
use bytemuck::allocation::zeroed_slice_box;

use std::ops::{Index, IndexMut};

// Two-dimensional array type, indexed by (row, col)
#[derive(Clone, Debug)]
pub struct Array2D<T> {
  rows: usize,
  cols: usize,
  data: Box<[T]>,
}

impl<T> Array2D<T> {
  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn fill_with<F: FnMut(usize, usize) -> T>(&mut self, mut f: F) {
    for i in 0..self.rows {
      for j in 0..self.cols {
        self[(i, j)] = f(i, j);
      }
    }
  }
}

impl<T: Zeroable> Array2D<T> {
  pub fn zeroed(rows: usize, cols: usize) -> Self {
    let num_elements = rows.checked_mul(cols).unwrap();
    let data = zeroed_slice_box(num_elements);

    Self {
      rows: rows,
      cols: cols,
      data: data
    }
  }

  pub fn new_with<F: FnMut(usize, usize) -> T>(rows: usize, cols: usize, f: F) -> Self {
    let mut result = Array2D::zeroed(rows, cols);
    result.fill_with(f);
    return result;
  }
}

impl<T> Index<(usize, usize)> for Array2D<T> {
  type Output = T;
  fn index(&self, (row, col): (usize, usize)) -> &T {
    if row >= self.rows || col >= self.cols {
      panic!("Array2D index out of bounds (index ({}, {}) vs. size ({}, {}))",
             row, col, self.rows, self.cols);
    }
    &self.data[row * self.cols + col]
  }
}

impl<T> IndexMut<(usize, usize)> for Array2D<T> {
  fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
    if row >= self.rows || col >= self.cols {
      panic!("Array2D index out of bounds (index ({}, {}) vs. size ({}, {}))",
             row, col, self.rows, self.cols);
    }
    &mut self.data[row * self.cols + col]
  }
}
