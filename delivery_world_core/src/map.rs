use std::ops::{Index, IndexMut};

use crate::Position;

/// A fixed-size 2D grid stored row-major in a flat vector.
///
/// Cells are addressed by `(x, y)` where `x` is the column and `y` the row.
/// Equality and hashing are structural, so two grids built independently
/// with the same contents compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a grid whose cells are produced by `f(x, y)` in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn from_generator<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        let mut cells = Vec::with_capacity(size);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Grid {
            width,
            height,
            cells,
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

    #[inline]
    fn coords_to_index(&self, x: usize, y: usize) -> Option<usize> {
        if self.is_valid(x, y) {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    #[inline]
    fn is_valid(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// The position one step away from `position` by `(dx, dy)`.
    ///
    /// Returns `None` if the step leaves the grid.
    pub fn offset(&self, position: Position, dx: isize, dy: isize) -> Option<Position> {
        let x = position.x.checked_add_signed(dx)?;
        let y = position.y.checked_add_signed(dy)?;
        self.is_valid(x, y).then_some(Position { x, y })
    }

    /// Iterates `(position, &cell)` pairs in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            (
                Position {
                    x: index % width,
                    y: index / width,
                },
                cell,
            )
        })
    }

    /// First position (row-major) whose cell satisfies `predicate`.
    pub fn find<P>(&self, mut predicate: P) -> Option<Position>
    where
        P: FnMut(&T) -> bool,
    {
        self.enumerate()
            .find_map(|(position, cell)| predicate(cell).then_some(position))
    }

    /// Iterates the grid one row slice at a time, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.width.max(1))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: Position) -> &Self::Output {
        match self.coords_to_index(index.x, index.y) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                index.x, index.y, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, index: Position) -> &mut Self::Output {
        let (width, height) = (self.width, self.height);
        match self.coords_to_index(index.x, index.y) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                index.x, index.y, width, height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_fills_row_major() {
        let grid = Grid::from_generator(3, 2, |x, y| y * 10 + x);
        assert_eq!(grid.as_slice(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(grid[Position::new(2, 1)], 12);
    }

    #[test]
    fn offset_stays_in_bounds() {
        let grid = Grid::from_generator(3, 3, |_, _| 0u8);
        let corner = Position::new(0, 0);
        assert_eq!(grid.offset(corner, -1, 0), None);
        assert_eq!(grid.offset(corner, 0, -1), None);
        assert_eq!(grid.offset(corner, 1, 0), Some(Position::new(1, 0)));
        assert_eq!(grid.offset(Position::new(2, 2), 0, 1), None);
    }

    #[test]
    fn index_mut_writes_in_place() {
        let mut grid = Grid::from_generator(2, 2, |_, _| 0u8);
        grid[Position::new(1, 1)] = 7;
        assert_eq!(grid.as_slice(), &[0, 0, 0, 7]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn index_out_of_bounds_panics() {
        let grid = Grid::from_generator(2, 2, |_, _| 0u8);
        let _cell = grid[Position::new(2, 0)];
    }

    #[test]
    fn find_and_rows() {
        let grid = Grid::from_generator(4, 2, |x, y| x == 2 && y == 1);
        assert_eq!(grid.find(|cell| *cell), Some(Position::new(2, 1)));
        let rows: Vec<&[bool]> = grid.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], &[false, false, true, false]);
    }
}
