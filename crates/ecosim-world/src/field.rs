//! Bounded 2D field holding at most one agent per cell.

use ecosim_core::{AgentId, Location};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A rectangular grid without wraparound
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    width: i32,
    height: i32,
    cells: Vec<Option<AgentId>>,
}

impl Field {
    /// # Panics
    /// If either dimension is not positive.
    pub fn new(width: i32, height: i32) -> Self {
        assert!(
            width > 0 && height > 0,
            "field dimensions must be positive, got {width}x{height}"
        );
        let size = (width * height) as usize;
        Self {
            width,
            height,
            cells: vec![None; size],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn is_in_grid(&self, location: Location) -> bool {
        (0..self.height).contains(&location.row) && (0..self.width).contains(&location.col)
    }

    /// Place an occupant (or nothing) at a location, replacing whatever was there.
    ///
    /// # Panics
    /// If the location lies outside the grid.
    pub fn put(&mut self, occupant: Option<AgentId>, location: Location) {
        assert!(
            self.is_in_grid(location),
            "location {location} outside {}x{} field",
            self.width,
            self.height
        );
        let index = self.index(location);
        self.cells[index] = occupant;
    }

    /// Occupant at a location; `None` for empty cells and locations outside the grid
    pub fn occupant_at(&self, location: Location) -> Option<AgentId> {
        if self.is_in_grid(location) {
            self.cells[self.index(location)]
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    /// In-grid neighbours of a location, row by row from the top-left
    pub fn adjacent_locations(&self, location: Location) -> Vec<Location> {
        let mut adjacent = Vec::with_capacity(8);
        for d_row in -1..=1 {
            for d_col in -1..=1 {
                if d_row == 0 && d_col == 0 {
                    continue;
                }
                let neighbor = location.offset(d_row, d_col);
                if self.is_in_grid(neighbor) {
                    adjacent.push(neighbor);
                }
            }
        }
        adjacent
    }

    /// A uniformly chosen empty neighbour, if any
    pub fn free_adjacent_location<R: Rng + ?Sized>(
        &self,
        location: Location,
        rng: &mut R,
    ) -> Option<Location> {
        let free: Vec<Location> = self
            .adjacent_locations(location)
            .into_iter()
            .filter(|&loc| self.occupant_at(loc).is_none())
            .collect();
        free.choose(rng).copied()
    }

    /// A uniformly chosen neighbour, occupied or not
    pub fn random_adjacent_location<R: Rng + ?Sized>(
        &self,
        location: Location,
        rng: &mut R,
    ) -> Option<Location> {
        self.adjacent_locations(location).choose(rng).copied()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Every occupant, in row-major order
    pub fn occupants(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.cells.iter().flatten().copied()
    }

    /// Every location, in row-major order
    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        (0..self.cells.len()).map(move |i| self.index_to_location(i))
    }

    /// Occupied cells with their occupants
    pub fn iter(&self) -> impl Iterator<Item = (Location, AgentId)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(i, cell)| cell.map(|id| (self.index_to_location(i), id)))
    }

    /// True if the cell storage matches the dimensions. Only deserialized
    /// fields can fail this.
    pub fn is_consistent(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.cells.len() == (self.width as usize) * (self.height as usize)
    }

    fn index(&self, location: Location) -> usize {
        (location.row * self.width + location.col) as usize
    }

    fn index_to_location(&self, index: usize) -> Location {
        let row = (index as i32) / self.width;
        let col = (index as i32) % self.width;
        Location::new(row, col)
    }
}

/// Two same-shaped fields: the one being read this step and the one being built
#[derive(Debug, Clone)]
pub struct FieldBuffers {
    fields: [Field; 2],
    current: usize,
}

impl FieldBuffers {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            fields: [Field::new(width, height), Field::new(width, height)],
            current: 0,
        }
    }

    pub fn current(&self) -> &Field {
        &self.fields[self.current]
    }

    pub fn next(&self) -> &Field {
        &self.fields[1 - self.current]
    }

    pub fn current_mut(&mut self) -> &mut Field {
        &mut self.fields[self.current]
    }

    pub fn next_mut(&mut self) -> &mut Field {
        &mut self.fields[1 - self.current]
    }

    /// Read access to the current field alongside write access to the next
    pub fn split(&mut self) -> (&Field, &mut Field) {
        let (first, second) = self.fields.split_at_mut(1);
        if self.current == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    /// Promote the next field to current and clear the old current for reuse
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
        self.next_mut().clear();
    }

    pub fn clear(&mut self) {
        for field in &mut self.fields {
            field.clear();
        }
    }

    /// Install a new current field; the next field is rebuilt empty to match its shape
    pub fn replace_current(&mut self, field: Field) {
        let next = Field::new(field.width(), field.height());
        self.fields = [field, next];
        self.current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_field_creation() {
        let field = Field::new(10, 5);
        assert_eq!(field.width(), 10);
        assert_eq!(field.height(), 5);
        assert_eq!(field.cells.len(), 50);
        assert_eq!(field.occupied_count(), 0);
        assert!(field.is_consistent());
    }

    #[test]
    #[should_panic]
    fn test_zero_dimension_panics() {
        Field::new(0, 5);
    }

    #[test]
    fn test_put_overwrites() {
        let mut field = Field::new(4, 4);
        let loc = Location::new(1, 2);
        field.put(Some(AgentId(1)), loc);
        field.put(Some(AgentId(2)), loc);
        assert_eq!(field.occupant_at(loc), Some(AgentId(2)));
        assert_eq!(field.occupied_count(), 1);

        field.put(None, loc);
        assert_eq!(field.occupant_at(loc), None);
    }

    #[test]
    #[should_panic]
    fn test_put_outside_grid_panics() {
        let mut field = Field::new(4, 4);
        field.put(Some(AgentId(1)), Location::new(4, 0));
    }

    #[test]
    fn test_occupant_outside_grid_is_none() {
        let field = Field::new(3, 3);
        assert_eq!(field.occupant_at(Location::new(-1, 0)), None);
        assert_eq!(field.occupant_at(Location::new(0, 3)), None);
    }

    #[test]
    fn test_bounds() {
        let field = Field::new(3, 2);
        assert!(field.is_in_grid(Location::new(1, 2)));
        assert!(!field.is_in_grid(Location::new(2, 0)));
        assert!(!field.is_in_grid(Location::new(0, 3)));
        assert!(!field.is_in_grid(Location::new(0, -1)));
    }

    #[test]
    fn test_adjacent_interior_and_corner() {
        let field = Field::new(10, 10);
        assert_eq!(field.adjacent_locations(Location::new(5, 5)).len(), 8);
        assert_eq!(field.adjacent_locations(Location::new(0, 0)).len(), 3);
        assert_eq!(field.adjacent_locations(Location::new(0, 5)).len(), 5);
        assert!(Field::new(1, 1).adjacent_locations(Location::new(0, 0)).is_empty());
    }

    #[test]
    fn test_adjacent_order_is_row_major() {
        let field = Field::new(3, 3);
        let adjacent = field.adjacent_locations(Location::new(1, 1));
        assert_eq!(
            adjacent,
            vec![
                Location::new(0, 0),
                Location::new(0, 1),
                Location::new(0, 2),
                Location::new(1, 0),
                Location::new(1, 2),
                Location::new(2, 0),
                Location::new(2, 1),
                Location::new(2, 2),
            ]
        );
    }

    #[test]
    fn test_free_adjacent_location() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut field = Field::new(2, 2);
        let origin = Location::new(0, 0);
        field.put(Some(AgentId(1)), Location::new(0, 1));
        field.put(Some(AgentId(2)), Location::new(1, 0));

        for _ in 0..20 {
            assert_eq!(field.free_adjacent_location(origin, &mut rng), Some(Location::new(1, 1)));
        }

        field.put(Some(AgentId(3)), Location::new(1, 1));
        assert_eq!(field.free_adjacent_location(origin, &mut rng), None);
        assert!(field.random_adjacent_location(origin, &mut rng).is_some());
    }

    #[test]
    fn test_random_adjacent_on_single_cell() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let field = Field::new(1, 1);
        assert_eq!(field.random_adjacent_location(Location::new(0, 0), &mut rng), None);
    }

    #[test]
    fn test_iter_reports_locations() {
        let mut field = Field::new(3, 2);
        field.put(Some(AgentId(7)), Location::new(1, 2));
        let cells: Vec<_> = field.iter().collect();
        assert_eq!(cells, vec![(Location::new(1, 2), AgentId(7))]);
        assert_eq!(field.locations().count(), 6);
    }

    #[test]
    fn test_buffers_swap_and_clear() {
        let mut buffers = FieldBuffers::new(3, 3);
        let loc = Location::new(1, 1);
        buffers.current_mut().put(Some(AgentId(1)), loc);
        {
            let (current, next) = buffers.split();
            assert_eq!(current.occupant_at(loc), Some(AgentId(1)));
            next.put(Some(AgentId(2)), loc);
        }

        buffers.swap();
        assert_eq!(buffers.current().occupant_at(loc), Some(AgentId(2)));
        assert_eq!(buffers.next().occupied_count(), 0);

        buffers.swap();
        assert_eq!(buffers.current().occupied_count(), 0);
    }

    proptest! {
        #[test]
        fn proptest_adjacent_in_grid_and_distinct(
            width in 1i32..12,
            height in 1i32..12,
            row in 0i32..12,
            col in 0i32..12,
        ) {
            let field = Field::new(width, height);
            let loc = Location::new(row % height, col % width);
            let adjacent = field.adjacent_locations(loc);

            prop_assert!(adjacent.len() <= 8);
            for n in &adjacent {
                prop_assert!(field.is_in_grid(*n));
                prop_assert!(*n != loc);
                prop_assert!((n.row - loc.row).abs() <= 1 && (n.col - loc.col).abs() <= 1);
            }
            let mut unique = adjacent.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), adjacent.len());
        }

        #[test]
        fn proptest_free_adjacent_is_empty_neighbor(seed in any::<u64>(), fill in 0usize..9) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut field = Field::new(3, 3);
            let centre = Location::new(1, 1);
            for (i, loc) in field.adjacent_locations(centre).into_iter().take(fill).enumerate() {
                field.put(Some(AgentId(i as u64)), loc);
            }

            match field.free_adjacent_location(centre, &mut rng) {
                Some(loc) => {
                    prop_assert!(fill < 8);
                    prop_assert!(field.occupant_at(loc).is_none());
                    prop_assert!(field.adjacent_locations(centre).contains(&loc));
                }
                None => prop_assert_eq!(fill, 8),
            }
        }
    }
}
