//! Toroidal spatial partition
//!
//! The playfield is cut into `GRID_SIZE` cells. Neighbor links wrap at the
//! edges so the lattice is a closed torus, and boundary cells carry a
//! duplicate offset (the full canvas width or height) so that objects near a
//! seam can be compared with objects on the far side as if they were adjacent.
//!
//! Membership is stored as cell -> entity index lists; each entity keeps a
//! back-reference to the one cell it is filed under.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId, EntityKind, EntityPool};
use crate::wrap_coord;

/// Index of a cell in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId(pub u32);

impl CellId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Neighbor direction (screen space: north is up)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    #[inline]
    fn slot(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
        }
    }
}

/// One partition cell
#[derive(Debug, Clone)]
pub struct Cell {
    pub col: u32,
    pub row: u32,
    /// Indexed by `Direction::slot`
    neighbors: [CellId; 4],
    /// Seam offset for boundary cells (zero on interior axes). A renderer adds
    /// it to members of this cell to draw their copy on the far edge.
    pub dupe: Vec2,
    members: Vec<EntityId>,
}

impl Cell {
    #[inline]
    pub fn neighbor(&self, dir: Direction) -> CellId {
        self.neighbors[dir.slot()]
    }

    #[inline]
    pub fn members(&self) -> &[EntityId] {
        &self.members
    }

    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.dupe != Vec2::ZERO
    }
}

/// Fixed grid of cells covering a wrapping playfield
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cols: u32,
    rows: u32,
    cell_size: f32,
    width: f32,
    height: f32,
    cells: Vec<Cell>,
}

impl SpatialGrid {
    /// Build a grid of `round(extent / cell_size)` cells per axis (at least one)
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let cols = ((width / cell_size).round() as u32).max(1);
        let rows = ((height / cell_size).round() as u32).max(1);

        let mut cells = Vec::with_capacity((cols * rows) as usize);
        for row in 0..rows {
            for col in 0..cols {
                let id = |c: u32, r: u32| CellId(r * cols + c);
                let north = id(col, if row == 0 { rows - 1 } else { row - 1 });
                let south = id(col, if row == rows - 1 { 0 } else { row + 1 });
                let east = id(if col == cols - 1 { 0 } else { col + 1 }, row);
                let west = id(if col == 0 { cols - 1 } else { col - 1 }, row);

                // Last edge wins when a single row/column is both first and last
                let mut dupe = Vec2::ZERO;
                if row == 0 {
                    dupe.y = height;
                }
                if row == rows - 1 {
                    dupe.y = -height;
                }
                if col == 0 {
                    dupe.x = width;
                }
                if col == cols - 1 {
                    dupe.x = -width;
                }

                cells.push(Cell {
                    col,
                    row,
                    neighbors: [north, south, east, west],
                    dupe,
                    members: Vec::new(),
                });
            }
        }

        log::debug!("Spatial grid {}x{} ({}px cells)", cols, rows, cell_size);

        Self {
            cols,
            rows,
            cell_size,
            width,
            height,
            cells,
        }
    }

    #[inline]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[inline]
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    #[inline]
    pub fn neighbor(&self, id: CellId, dir: Direction) -> CellId {
        self.cell(id).neighbor(dir)
    }

    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        (0..self.cells.len() as u32).map(CellId)
    }

    /// Owning cell of a world position (normalized onto the torus first)
    pub fn cell_at(&self, pos: Vec2) -> CellId {
        let x = wrap_coord(pos.x, self.width);
        let y = wrap_coord(pos.y, self.height);
        let col = axis_index(x, self.cell_size, self.cols);
        let row = axis_index(y, self.cell_size, self.rows);
        CellId(row * self.cols + col)
    }

    /// World-space bounds `[min, max)` of a cell; the last row/column absorbs
    /// any remainder of the canvas
    pub fn bounds(&self, id: CellId) -> (Vec2, Vec2) {
        let cell = self.cell(id);
        let min = Vec2::new(
            cell.col as f32 * self.cell_size,
            cell.row as f32 * self.cell_size,
        );
        let max_x = if cell.col == self.cols - 1 {
            self.width
        } else {
            min.x + self.cell_size
        };
        let max_y = if cell.row == self.rows - 1 {
            self.height
        } else {
            min.y + self.cell_size
        };
        (min, Vec2::new(max_x, max_y))
    }

    /// Whether the normalized position falls inside the cell
    pub fn contains(&self, id: CellId, pos: Vec2) -> bool {
        self.cell_at(pos) == id
    }

    /// File an entity under a cell, leaving its previous cell first
    pub fn enter(&mut self, entity: &mut Entity, id: CellId) {
        if entity.cell == Some(id) {
            return;
        }
        self.leave(entity);
        let members = &mut self.cells[id.index()].members;
        debug_assert!(!members.contains(&entity.id), "entity {:?} filed twice", entity.id);
        members.push(entity.id);
        entity.cell = Some(id);
    }

    /// Remove an entity from its cell; a no-op for non-members
    pub fn leave(&mut self, entity: &mut Entity) {
        if let Some(id) = entity.cell.take() {
            let members = &mut self.cells[id.index()].members;
            if let Some(i) = members.iter().position(|&m| m == entity.id) {
                members.swap_remove(i);
            } else {
                log::warn!("Entity {:?} claimed cell {:?} but was not a member", entity.id, id);
            }
        }
    }

    /// Re-file an entity under the cell matching its current position
    ///
    /// Returns true when the entity changed cells.
    pub fn refile(&mut self, entity: &mut Entity) -> bool {
        let target = self.cell_at(entity.pos());
        if entity.cell == Some(target) {
            return false;
        }
        self.enter(entity, target);
        true
    }

    /// Offset to apply to members of `dir`'s neighbor so they sit next to
    /// `id` in world space; non-zero only when the step crosses a seam
    pub fn crossing_offset(&self, id: CellId, dir: Direction) -> Vec2 {
        let cell = self.cell(id);
        if !cell.is_boundary() {
            return Vec2::ZERO;
        }
        match dir {
            Direction::North if cell.row == 0 => Vec2::new(0.0, -self.height),
            Direction::South if cell.row == self.rows - 1 => Vec2::new(0.0, self.height),
            Direction::West if cell.col == 0 => Vec2::new(-self.width, 0.0),
            Direction::East if cell.col == self.cols - 1 => Vec2::new(self.width, 0.0),
            _ => Vec2::ZERO,
        }
    }

    /// Broad-phase scan set: own cell, then north, south, east and west
    /// neighbors, each with the offset for its candidates
    pub fn scan(&self, id: CellId) -> [(CellId, Vec2); 5] {
        let n = |dir| (self.neighbor(id, dir), self.crossing_offset(id, dir));
        [
            (id, Vec2::ZERO),
            n(Direction::North),
            n(Direction::South),
            n(Direction::East),
            n(Direction::West),
        ]
    }

    /// The 3x3 block of cells centred on `id`
    pub fn neighborhood(&self, id: CellId) -> [CellId; 9] {
        let north = self.neighbor(id, Direction::North);
        let south = self.neighbor(id, Direction::South);
        [
            id,
            north,
            south,
            self.neighbor(id, Direction::East),
            self.neighbor(id, Direction::West),
            self.neighbor(north, Direction::East),
            self.neighbor(north, Direction::West),
            self.neighbor(south, Direction::East),
            self.neighbor(south, Direction::West),
        ]
    }

    /// Whether any visible entity of `kinds` is a member of `id`
    pub fn occupied_by(&self, pool: &EntityPool, id: CellId, kinds: &[EntityKind]) -> bool {
        self.cell(id).members.iter().any(|&m| {
            pool.get(m)
                .is_some_and(|e| e.visible && kinds.contains(&e.kind))
        })
    }

    /// Whether the 3x3 block around `pos` holds none of `kinds`
    pub fn is_clear(&self, pool: &EntityPool, pos: Vec2, kinds: &[EntityKind]) -> bool {
        if kinds.is_empty() {
            return true;
        }
        self.neighborhood(self.cell_at(pos))
            .iter()
            .all(|&id| !self.occupied_by(pool, id, kinds))
    }

    /// Total memberships across all cells
    pub fn member_count(&self) -> usize {
        self.cells.iter().map(|c| c.members.len()).sum()
    }
}

/// Cell index along one axis, consistent with `SpatialGrid::bounds` even when
/// the division rounds across a cell edge
fn axis_index(v: f32, cell_size: f32, count: u32) -> u32 {
    let mut i = ((v / cell_size) as u32).min(count - 1);
    if i > 0 && v < i as f32 * cell_size {
        i -= 1;
    } else if i < count - 1 && v >= (i + 1) as f32 * cell_size {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn walk(grid: &SpatialGrid, start: CellId, dir: Direction, steps: u32) -> CellId {
        (0..steps).fold(start, |id, _| grid.neighbor(id, dir))
    }

    #[test]
    fn test_dimensions_round() {
        let grid = SpatialGrid::new(800.0, 600.0, 60.0);
        assert_eq!((grid.cols(), grid.rows()), (13, 10));

        let tiny = SpatialGrid::new(10.0, 10.0, 60.0);
        assert_eq!((tiny.cols(), tiny.rows()), (1, 1));
    }

    #[test]
    fn test_neighbors_wrap() {
        let grid = SpatialGrid::new(800.0, 600.0, 60.0);
        let origin = grid.cell_at(Vec2::new(1.0, 1.0));
        let west = grid.cell(grid.neighbor(origin, Direction::West));
        assert_eq!((west.col, west.row), (12, 0));
        let north = grid.cell(grid.neighbor(origin, Direction::North));
        assert_eq!((north.col, north.row), (0, 9));
    }

    #[test]
    fn test_dupe_offsets_on_boundaries() {
        let grid = SpatialGrid::new(800.0, 600.0, 60.0);
        assert_eq!(grid.cell(grid.cell_at(Vec2::new(1.0, 1.0))).dupe, Vec2::new(800.0, 600.0));
        assert_eq!(grid.cell(grid.cell_at(Vec2::new(799.0, 599.0))).dupe, Vec2::new(-800.0, -600.0));
        let interior = grid.cell(grid.cell_at(Vec2::new(400.0, 300.0)));
        assert!(!interior.is_boundary());
    }

    #[test]
    fn test_cell_at_normalizes() {
        let grid = SpatialGrid::new(800.0, 600.0, 60.0);
        assert_eq!(grid.cell_at(Vec2::new(-5.0, 10.0)), grid.cell_at(Vec2::new(795.0, 10.0)));
        assert_eq!(grid.cell_at(Vec2::new(810.0, 610.0)), grid.cell_at(Vec2::new(10.0, 10.0)));
        // Remainder past the last full cell belongs to the last column
        let last = grid.cell(grid.cell_at(Vec2::new(790.0, 10.0)));
        assert_eq!(last.col, 12);
    }

    #[test]
    fn test_enter_leave_are_safe() {
        let mut grid = SpatialGrid::new(800.0, 600.0, 60.0);
        let mut pool = EntityPool::new();
        let id = pool.insert(Entity::new(EntityKind::Asteroid, Vec::new()));
        let mut entity = pool.remove(id).unwrap();

        grid.leave(&mut entity);
        assert_eq!(grid.member_count(), 0);

        let a = grid.cell_at(Vec2::new(10.0, 10.0));
        let b = grid.cell_at(Vec2::new(400.0, 300.0));
        grid.enter(&mut entity, a);
        grid.enter(&mut entity, a);
        assert_eq!(grid.cell(a).members(), &[id]);

        grid.enter(&mut entity, b);
        assert!(grid.cell(a).members().is_empty());
        assert_eq!(grid.cell(b).members(), &[id]);
        assert_eq!(entity.cell(), Some(b));

        grid.leave(&mut entity);
        assert_eq!(grid.member_count(), 0);
        assert_eq!(entity.cell(), None);
    }

    #[test]
    fn test_crossing_offsets() {
        let grid = SpatialGrid::new(800.0, 600.0, 60.0);
        let corner = grid.cell_at(Vec2::new(1.0, 1.0));
        assert_eq!(grid.crossing_offset(corner, Direction::West), Vec2::new(-800.0, 0.0));
        assert_eq!(grid.crossing_offset(corner, Direction::North), Vec2::new(0.0, -600.0));
        assert_eq!(grid.crossing_offset(corner, Direction::East), Vec2::ZERO);

        let far = grid.cell_at(Vec2::new(799.0, 599.0));
        assert_eq!(grid.crossing_offset(far, Direction::East), Vec2::new(800.0, 0.0));
        assert_eq!(grid.crossing_offset(far, Direction::South), Vec2::new(0.0, 600.0));
    }

    #[test]
    fn test_single_cell_grid_is_its_own_neighbor() {
        let grid = SpatialGrid::new(50.0, 50.0, 60.0);
        let only = CellId(0);
        for dir in Direction::ALL {
            assert_eq!(grid.neighbor(only, dir), only);
        }
        let scan = grid.scan(only);
        assert_eq!(scan[3].1, Vec2::new(50.0, 0.0));
        assert_eq!(scan[4].1, Vec2::new(-50.0, 0.0));
    }

    proptest! {
        #[test]
        fn prop_toroidal_closure(cols in 1u32..20, rows in 1u32..20) {
            let grid = SpatialGrid::new(cols as f32 * 60.0, rows as f32 * 60.0, 60.0);
            prop_assert_eq!((grid.cols(), grid.rows()), (cols, rows));
            for id in grid.cell_ids() {
                prop_assert_eq!(walk(&grid, id, Direction::North, rows), id);
                prop_assert_eq!(walk(&grid, id, Direction::South, rows), id);
                prop_assert_eq!(walk(&grid, id, Direction::East, cols), id);
                prop_assert_eq!(walk(&grid, id, Direction::West, cols), id);
                // Opposite steps undo each other
                let n = grid.neighbor(id, Direction::North);
                prop_assert_eq!(grid.neighbor(n, Direction::South), id);
                let e = grid.neighbor(id, Direction::East);
                prop_assert_eq!(grid.neighbor(e, Direction::West), id);
            }
        }

        #[test]
        fn prop_cell_at_bounds_contain_position(
            width in 30.0f32..1200.0,
            height in 30.0f32..900.0,
            x in -3000.0f32..3000.0,
            y in -3000.0f32..3000.0,
        ) {
            let grid = SpatialGrid::new(width, height, 60.0);
            let id = grid.cell_at(Vec2::new(x, y));
            let (min, max) = grid.bounds(id);
            let p = Vec2::new(wrap_coord(x, width), wrap_coord(y, height));
            prop_assert!(p.x >= min.x && p.x < max.x, "x {} outside [{}, {})", p.x, min.x, max.x);
            prop_assert!(p.y >= min.y && p.y < max.y, "y {} outside [{}, {})", p.y, min.y, max.y);
        }
    }
}
