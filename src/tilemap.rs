use std::collections::VecDeque;

/// A bounded 2D grid stored in row-major order.
///
/// Unlike a world map this grid does not wrap: coordinates outside
/// `[0, width) × [0, height)` simply do not exist.
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Tilemap<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }
}

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height, "({}, {}) out of bounds", x, y);
        y * self.width + x
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    /// Signed lookup returning `None` outside the grid
    pub fn get_checked(&self, x: i64, y: i64) -> Option<&T> {
        if self.in_bounds(x, y) {
            Some(&self.data[y as usize * self.width + x as usize])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// 4-connected neighbors inside the grid.
    pub fn neighbors(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let mut result = Vec::with_capacity(4);
        if x > 0 {
            result.push((x - 1, y));
        }
        if x + 1 < self.width {
            result.push((x + 1, y));
        }
        if y > 0 {
            result.push((x, y - 1));
        }
        if y + 1 < self.height {
            result.push((x, y + 1));
        }
        result
    }

    /// 8-connected neighbors inside the grid.
    pub fn neighbors_8(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let mut result = Vec::with_capacity(8);
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if self.in_bounds(nx, ny) {
                    result.push((nx as usize, ny as usize));
                }
            }
        }
        result
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width;
        self.data.iter().enumerate().map(move |(idx, val)| {
            (idx % width, idx / width, val)
        })
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let width = self.width;
        self.data.iter_mut().enumerate().map(move |(idx, val)| {
            (idx % width, idx / width, val)
        })
    }

    /// Number of cells matching a predicate
    pub fn count(&self, mut pred: impl FnMut(&T) -> bool) -> usize {
        self.data.iter().filter(|v| pred(v)).count()
    }
}

impl Tilemap<f32> {
    /// Minimum and maximum finite values, ignoring anything at or below `floor`.
    pub fn min_max_above(&self, floor: f32) -> Option<(f32, f32)> {
        let mut range: Option<(f32, f32)> = None;
        for &v in &self.data {
            if v <= floor || !v.is_finite() {
                continue;
            }
            range = Some(match range {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            });
        }
        range
    }
}

impl Tilemap<bool> {
    /// 4-connected components of set cells, found in row-major scan order.
    pub fn components(&self) -> Vec<Vec<(usize, usize)>> {
        let mut visited = Tilemap::new_with(self.width, self.height, false);
        let mut components = Vec::new();

        for y in 0..self.height {
            for x in 0..self.width {
                if !*self.get(x, y) || *visited.get(x, y) {
                    continue;
                }

                let mut cells = Vec::new();
                let mut queue = VecDeque::new();
                visited.set(x, y, true);
                queue.push_back((x, y));
                while let Some((cx, cy)) = queue.pop_front() {
                    cells.push((cx, cy));
                    for (nx, ny) in self.neighbors(cx, cy) {
                        if *self.get(nx, ny) && !*visited.get(nx, ny) {
                            visited.set(nx, ny, true);
                            queue.push_back((nx, ny));
                        }
                    }
                }
                components.push(cells);
            }
        }

        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_do_not_wrap() {
        let map: Tilemap<u8> = Tilemap::new(4, 3);
        assert!(map.in_bounds(3, 2));
        assert!(!map.in_bounds(4, 0));
        assert!(!map.in_bounds(-1, 0));
        assert!(map.get_checked(0, 3).is_none());
        assert_eq!(map.neighbors(0, 0), vec![(1, 0), (0, 1)]);
        assert_eq!(map.neighbors_8(0, 0).len(), 3);
        assert_eq!(map.neighbors_8(1, 1).len(), 8);
    }

    #[test]
    fn test_iter_coordinates() {
        let mut map = Tilemap::new_with(3, 2, 0u32);
        for (x, y, v) in map.iter_mut() {
            *v = (y * 10 + x) as u32;
        }
        assert_eq!(*map.get(2, 1), 12);
        assert_eq!(map.count(|v| *v >= 10), 3);
    }

    #[test]
    fn test_min_max_above_skips_sentinel() {
        let mut map = Tilemap::new_with(2, 2, -1.0e9f32);
        map.set(0, 0, 3.0);
        map.set(1, 1, -2.0);
        assert_eq!(map.min_max_above(-1.0e8), Some((-2.0, 3.0)));
    }

    #[test]
    fn test_components_are_four_connected() {
        let mut mask = Tilemap::new_with(5, 3, false);
        for (x, y) in [(0, 0), (1, 0), (1, 1), (3, 1), (4, 2)] {
            mask.set(x, y, true);
        }
        let comps = mask.components();
        assert_eq!(comps.len(), 3, "diagonal contact must not join components");
        assert_eq!(comps[0].len(), 3);
    }
}
