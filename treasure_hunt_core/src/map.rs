use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![T::default(); size],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Converts a position to a flat vector index, or `None` when out of bounds.
    #[inline]
    fn index_of(&self, position: Position) -> Option<usize> {
        self.contains(position)
            .then(|| position.y * self.width + position.x)
    }

    /// Checks if the given position is within the grid boundaries.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    /// Gets an immutable reference to the cell at `position`.
    ///
    /// Returns `None` if the position is out of bounds.
    pub fn get(&self, position: Position) -> Option<&T> {
        self.index_of(position).and_then(|index| self.cells.get(index))
    }

    /// Gets a mutable reference to the cell at `position`.
    ///
    /// Returns `None` if the position is out of bounds.
    pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
        let index = self.index_of(position)?;
        self.cells.get_mut(index)
    }

    /// Returns an iterator over every position of the grid in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<T> {
        let width = self.width;
        (0..self.cells.len()).map(move |index| Position {
            x: index % width,
            y: index / width,
        })
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        self.positions().zip(self.cells.iter())
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: Position) -> &Self::Output {
        match self.index_of(position) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                position.x, position.y, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        let (width, height) = (self.width, self.height);
        match self.index_of(position) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                position.x, position.y, width, height
            ),
        }
    }
}
