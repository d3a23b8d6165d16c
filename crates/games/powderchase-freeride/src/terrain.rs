//! Procedural slope generation and chunk streaming.
//!
//! A chunk is a pure function of `(seed, chunk index, incoming exclusions)`.
//! The only coupling between chunks is the pending-exclusion list: landing
//! zones and rail run-outs that spill past a chunk's bottom edge are handed to
//! the next chunk, which reserves those cells before placing anything.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::FreerideConfig;
use crate::entities::{
    Cell, Collectible, CollectibleKind, EntityRef, GrindableType, Jump, JumpSize, Lodge, Obstacle,
    Rail, RockSize,
};
use crate::util::{dist_sq, roll, sample_int, sample_range};

// Roll salts. Each independent decision about a cell uses its own salt.
const SALT_FEATURE: u64 = 1;
const SALT_JUMP_SIZE: u64 = 2;
const SALT_RAIL_LENGTH: u64 = 3;
const SALT_RAIL_DRIFT: u64 = 4;
const SALT_RAIL_TYPE: u64 = 5;
const SALT_GUARANTEED: u64 = 6;
const SALT_CLUSTER: u64 = 7;
const SALT_CLUSTER_POS: u64 = 8;
const SALT_TREE_SCALE: u64 = 9;
const SALT_SCATTER: u64 = 10;
const SALT_SCATTER_KIND: u64 = 11;
const SALT_ROCK_SIZE: u64 = 12;
const SALT_CLEAR_PATH: u64 = 13;
const SALT_LODGE: u64 = 14;
const SALT_LODGE_SITE: u64 = 15;
const SALT_COLLECTIBLE: u64 = 16;
const SALT_JITTER: u64 = 17;

// Keys for rolls that are not tied to a single cell.
const KEY_CHUNK: u64 = 1 << 40;
const KEY_CLUSTER: u64 = 2 << 40;
const KEY_COLLECTIBLE: u64 = 3 << 40;

/// Extra rows kept clear past a rail's end for the dismount.
const RAIL_RUNOUT_ROWS: i64 = 6;
/// Lanes kept clear either side of a rail.
const RAIL_CLEAR_LANES: i64 = 2;
/// Obstacle jitter as a fraction of a cell, peak to peak.
const JITTER_FRACTION: f32 = 0.25;

/// A fixed-height slice of the slope and everything generated in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: u64,
    pub origin_y: f32,
    pub height: f32,
    pub obstacles: Vec<Obstacle>,
    pub jumps: Vec<Jump>,
    pub rails: Vec<Rail>,
    pub lodges: Vec<Lodge>,
    pub collectibles: Vec<Collectible>,
}

impl Chunk {
    pub fn end_y(&self) -> f32 {
        self.origin_y + self.height
    }
}

/// Output of generating one chunk: the chunk plus the cells it reserves in
/// the next chunk (`index + 1`), expressed in that chunk's grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedChunk {
    pub chunk: Chunk,
    pub outgoing: Vec<Cell>,
}

/// Inclusive cell rectangle in a chunk's grid. Rows may run past the chunk
/// bottom (those belong to the next chunk).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBand {
    pub first_row: i64,
    pub last_row: i64,
    pub first_col: i64,
    pub last_col: i64,
}

impl CellBand {
    pub fn contains(&self, row: i64, col: i64) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }
}

/// Grid geometry of one chunk.
#[derive(Debug, Clone, Copy)]
struct Grid {
    rows: u32,
    cols: u32,
    lane_width: f32,
    row_height: f32,
    origin_y: f32,
    half_width: f32,
}

impl Grid {
    fn new(config: &FreerideConfig, index: u64) -> Self {
        let terrain = &config.terrain;
        Self {
            rows: terrain.rows_per_chunk.max(1),
            cols: terrain.columns(),
            lane_width: terrain.lane_width,
            row_height: terrain.row_height,
            origin_y: index as f32 * terrain.chunk_height(),
            half_width: terrain.half_width(),
        }
    }

    fn center(&self, cell: Cell) -> (f32, f32) {
        (
            self.col_x(cell.col as i64),
            self.origin_y + (cell.row as f32 + 0.5) * self.row_height,
        )
    }

    fn col_x(&self, col: i64) -> f32 {
        -self.half_width + (col as f32 + 0.5) * self.lane_width
    }

    fn row_of(&self, y: f32) -> i64 {
        ((y - self.origin_y) / self.row_height).floor() as i64
    }

    fn col_of(&self, x: f32) -> i64 {
        ((x + self.half_width) / self.lane_width).floor() as i64
    }

    fn cell_key(&self, cell: Cell) -> u64 {
        cell.row as u64 * self.cols as u64 + cell.col as u64
    }

    fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Cell::new(row, col)))
    }
}

/// Reserved-cell bookkeeping for one chunk under generation.
struct Reservations {
    rows: u32,
    cols: u32,
    used: Vec<bool>,
    overflow: BTreeSet<Cell>,
}

impl Reservations {
    fn new(grid: &Grid) -> Self {
        Self {
            rows: grid.rows,
            cols: grid.cols,
            used: vec![false; (grid.rows * grid.cols) as usize],
            overflow: BTreeSet::new(),
        }
    }

    fn is_used(&self, cell: Cell) -> bool {
        self.used[(cell.row * self.cols + cell.col) as usize]
    }

    /// Reserve a cell. Rows above the chunk are ignored (already generated);
    /// rows past the bottom spill into the next chunk.
    fn reserve(&mut self, row: i64, col: i64) {
        if col < 0 || col >= self.cols as i64 || row < 0 {
            return;
        }
        let rows = self.rows as i64;
        if row < rows {
            self.used[(row as u32 * self.cols + col as u32) as usize] = true;
        } else {
            let spill = (row - rows).min(rows - 1) as u32;
            self.overflow.insert(Cell::new(spill, col as u32));
        }
    }

    fn reserve_band(&mut self, band: CellBand) {
        for row in band.first_row..=band.last_row {
            for col in band.first_col..=band.last_col {
                self.reserve(row, col);
            }
        }
    }
}

/// Landing band for a jump in its own chunk's grid: centred on the computed
/// landing distance, starting no earlier than the row after the jump.
pub fn landing_band(jump: &Jump, config: &FreerideConfig) -> CellBand {
    let distance = config.landing_distance(jump.size);
    let row_height = config.terrain.row_height.max(1.0);
    let landing_row = jump.cell.row as i64 + (distance / row_height).round() as i64;
    let (half_rows, half_cols) = jump.size.landing_band();
    let col = jump.cell.col as i64;
    CellBand {
        first_row: (landing_row - half_rows as i64).max(jump.cell.row as i64 + 1),
        last_row: landing_row + half_rows as i64,
        first_col: col - half_cols as i64,
        last_col: col + half_cols as i64,
    }
}

/// Raw lodge roll for a chunk, before spacing is applied.
fn lodge_roll(seed: u64, index: u64, config: &FreerideConfig) -> bool {
    let terrain = &config.terrain;
    let distance = index as f32 * terrain.chunk_height();
    distance >= terrain.lodge_min_distance
        && roll(seed, index, KEY_CHUNK, SALT_LODGE) < terrain.lodge_chance
}

/// Whether a chunk may host a lodge.
///
/// Spacing is checked against the raw rolls of the preceding chunks rather
/// than against lodges actually placed, so the answer stays a pure function
/// of `(seed, index)`. This is conservative: a roll that was itself
/// suppressed still blocks the chunks after it, so placed lodges are always
/// at least `lodge_spacing` apart but may be further apart than strictly
/// needed.
pub fn lodge_allowed(seed: u64, index: u64, config: &FreerideConfig) -> bool {
    if !lodge_roll(seed, index, config) {
        return false;
    }
    let chunk_height = config.terrain.chunk_height().max(1.0);
    let spacing_chunks = (config.terrain.lodge_spacing / chunk_height).ceil() as u64;
    let first = index.saturating_sub(spacing_chunks);
    !(first..index).any(|j| lodge_roll(seed, j, config))
}

/// Generate one chunk. Placement rejections are silent: density is a target,
/// not a guarantee, and generation never fails.
pub fn generate_chunk(
    seed: u64,
    index: u64,
    incoming: &[Cell],
    config: &FreerideConfig,
) -> GeneratedChunk {
    let terrain = &config.terrain;
    let grid = Grid::new(config, index);
    let mut used = Reservations::new(&grid);
    let mut chunk = Chunk {
        index,
        origin_y: grid.origin_y,
        height: terrain.chunk_height(),
        obstacles: Vec::new(),
        jumps: Vec::new(),
        rails: Vec::new(),
        lodges: Vec::new(),
        collectibles: Vec::new(),
    };

    // Phase 1: grid setup.
    for cell in incoming {
        used.reserve(cell.row as i64, cell.col as i64);
    }
    for cell in grid.cells() {
        if grid.center(cell).1 < terrain.start_clear_distance {
            used.reserve(cell.row as i64, cell.col as i64);
        }
    }
    let lodge_site = pick_lodge_site(seed, index, &grid, &used, config);
    if let Some((_, _, band)) = &lodge_site {
        used.reserve_band(*band);
    }
    let clear_path = clear_path_columns(seed, index, &grid);

    // Phase 2: jumps and rails.
    place_features(seed, index, &grid, &mut used, &mut chunk, config);

    // Phase 3: landing zones and rail run-outs.
    for jump in &chunk.jumps {
        used.reserve_band(landing_band(jump, config));
    }
    for rail in &chunk.rails {
        reserve_rail_clearance(rail, &grid, &mut used);
    }

    // Phase 4: tree clusters.
    place_tree_clusters(seed, index, &grid, &mut used, &clear_path, &mut chunk, config);

    // Phase 5: scattered obstacles.
    place_scattered(seed, index, &grid, &mut used, &clear_path, &mut chunk, config);

    // Phase 6: lodge.
    if let Some((x, y, band)) = lodge_site {
        let cells = (band.first_row..=band.last_row)
            .flat_map(|r| (band.first_col..=band.last_col).map(move |c| (r, c)))
            .filter(|(r, c)| *r >= 0 && *r < grid.rows as i64 && *c >= 0 && *c < grid.cols as i64)
            .map(|(r, c)| Cell::new(r as u32, c as u32))
            .collect();
        chunk.lodges.push(Lodge::new(
            x,
            y,
            terrain.lodge_width,
            terrain.lodge_height,
            cells,
        ));
        tracing::debug!(chunk = index, x, y, "Lodge placed");
    }

    // Phase 7: collectibles.
    place_collectibles(seed, index, &grid, &used, &mut chunk, config);

    GeneratedChunk {
        chunk,
        outgoing: used.overflow.into_iter().collect(),
    }
}

/// Choose a lodge site during grid setup so the later phases route around it.
/// Returns the lodge centre and its full exclusion band.
fn pick_lodge_site(
    seed: u64,
    index: u64,
    grid: &Grid,
    used: &Reservations,
    config: &FreerideConfig,
) -> Option<(f32, f32, CellBand)> {
    if !lodge_allowed(seed, index, config) {
        return None;
    }
    let terrain = &config.terrain;
    let foot_cols = (terrain.lodge_width / grid.lane_width).ceil() as u32;
    let foot_rows = (terrain.lodge_height / grid.row_height).ceil() as u32;
    // One lane either side, one row above (ramp) and one below.
    let zone_cols = foot_cols + 2;
    let zone_rows = foot_rows + 2;
    if zone_cols > grid.cols || zone_rows > grid.rows {
        return None;
    }
    let row0 = sample_int(
        roll(seed, index, KEY_CHUNK, SALT_LODGE_SITE),
        0,
        grid.rows - zone_rows,
    );
    let col0 = sample_int(
        roll(seed, index, KEY_CHUNK + 1, SALT_LODGE_SITE),
        0,
        grid.cols - zone_cols,
    );
    let band = CellBand {
        first_row: row0 as i64,
        last_row: (row0 + zone_rows - 1) as i64,
        first_col: col0 as i64,
        last_col: (col0 + zone_cols - 1) as i64,
    };
    let blocked = (band.first_row..=band.last_row).any(|r| {
        (band.first_col..=band.last_col).any(|c| used.is_used(Cell::new(r as u32, c as u32)))
    });
    if blocked {
        return None;
    }
    let x = (grid.col_x(band.first_col + 1) + grid.col_x(band.last_col - 1)) / 2.0;
    let y = grid.origin_y + (row0 as f32 + 1.0 + foot_rows as f32 / 2.0) * grid.row_height;
    Some((x, y, band))
}

/// One obstacle-free lane per row, wandering at most one lane per row.
fn clear_path_columns(seed: u64, index: u64, grid: &Grid) -> Vec<u32> {
    let mut col = sample_int(
        roll(seed, index, KEY_CHUNK, SALT_CLEAR_PATH),
        0,
        grid.cols - 1,
    ) as i64;
    let mut path = Vec::with_capacity(grid.rows as usize);
    for row in 0..grid.rows {
        if row > 0 {
            let step = roll(seed, index, row as u64, SALT_CLEAR_PATH);
            if step < 0.33 {
                col -= 1;
            } else if step >= 0.66 {
                col += 1;
            }
            col = col.clamp(0, grid.cols as i64 - 1);
        }
        path.push(col as u32);
    }
    path
}

fn pick_jump_size(sample: f32) -> JumpSize {
    if sample < 0.5 {
        JumpSize::Small
    } else if sample < 0.8 {
        JumpSize::Medium
    } else if sample < 0.95 {
        JumpSize::Large
    } else {
        JumpSize::Mega
    }
}

/// Relative frequency of each grindable, in `GrindableType::ALL` order.
const GRINDABLE_WEIGHTS: [f32; 5] = [0.4, 0.2, 0.15, 0.15, 0.1];

fn pick_grindable(sample: f32) -> GrindableType {
    let mut threshold = 0.0;
    for (kind, weight) in GrindableType::ALL.into_iter().zip(GRINDABLE_WEIGHTS) {
        threshold += weight;
        if sample < threshold {
            return kind;
        }
    }
    GrindableType::Kinked
}

/// True if `(x, y)` is within `radius` of any placed jump or rail start.
fn crowded(chunk: &Chunk, x: f32, y: f32, radius: f32) -> bool {
    let r2 = radius * radius;
    chunk.jumps.iter().any(|j| dist_sq(j.x, j.y, x, y) < r2)
        || chunk.rails.iter().any(|r| dist_sq(r.x1, r.y1, x, y) < r2)
}

enum Feature {
    Jump(JumpSize),
    Rail,
}

fn place_features(
    seed: u64,
    index: u64,
    grid: &Grid,
    used: &mut Reservations,
    chunk: &mut Chunk,
    config: &FreerideConfig,
) {
    let terrain = &config.terrain;
    let massive_band = terrain.massive_jump_chance;
    let jump_band = massive_band + terrain.jump_chance;
    let rail_band = jump_band + terrain.rail_chance;

    for cell in grid.cells() {
        if used.is_used(cell) {
            continue;
        }
        let key = grid.cell_key(cell);
        let sample = roll(seed, index, key, SALT_FEATURE);
        let feature = if sample < massive_band {
            Feature::Jump(JumpSize::Massive)
        } else if sample < jump_band {
            Feature::Jump(pick_jump_size(roll(seed, index, key, SALT_JUMP_SIZE)))
        } else if sample < rail_band {
            Feature::Rail
        } else {
            continue;
        };
        match feature {
            Feature::Jump(size) => {
                try_place_jump(grid, used, chunk, cell, size, config);
            },
            Feature::Rail => {
                try_place_rail(seed, index, grid, used, chunk, cell, config);
            },
        }
    }

    let has_massive = chunk.jumps.iter().any(|j| j.size == JumpSize::Massive);
    if !has_massive
        && roll(seed, index, KEY_CHUNK, SALT_GUARANTEED) < terrain.guaranteed_massive_chance
    {
        let row = sample_int(
            roll(seed, index, KEY_CHUNK + 1, SALT_GUARANTEED),
            0,
            grid.rows - 1,
        );
        let col = sample_int(
            roll(seed, index, KEY_CHUNK + 2, SALT_GUARANTEED),
            0,
            grid.cols - 1,
        );
        let cell = Cell::new(row, col);
        if !used.is_used(cell) {
            try_place_jump(grid, used, chunk, cell, JumpSize::Massive, config);
        }
    }
}

fn try_place_jump(
    grid: &Grid,
    used: &mut Reservations,
    chunk: &mut Chunk,
    cell: Cell,
    size: JumpSize,
    config: &FreerideConfig,
) -> bool {
    let (x, y) = grid.center(cell);
    if crowded(chunk, x, y, config.terrain.jump_clearance) {
        return false;
    }
    let jump = Jump::new(x, y, size, cell);
    used.reserve_band(footprint_band(&jump, grid, config));
    chunk.jumps.push(jump);
    true
}

/// Largest extent any obstacle can reach from its cell centre, jitter included.
fn obstacle_reach(grid: &Grid, config: &FreerideConfig) -> (f32, f32) {
    let origin = Cell::new(0, 0);
    let candidates = [
        Obstacle::tree(0.0, 0.0, config.terrain.tree_max_scale, origin),
        Obstacle::rock(0.0, 0.0, RockSize::Large, origin),
        Obstacle::mogul(0.0, 0.0, origin),
    ];
    let half_w = candidates.iter().map(|o| o.half_w).fold(0.0, f32::max);
    let half_h = candidates.iter().map(|o| o.half_h).fold(0.0, f32::max);
    (
        half_w + grid.lane_width * JITTER_FRACTION / 2.0,
        half_h + grid.row_height * JITTER_FRACTION / 2.0,
    )
}

/// Cells whose obstacles could touch the jump's rectangle.
fn footprint_band(jump: &Jump, grid: &Grid, config: &FreerideConfig) -> CellBand {
    let (reach_x, reach_y) = obstacle_reach(grid, config);
    let lanes = ((jump.half_w + reach_x) / grid.lane_width.max(1.0)).ceil() as i64 - 1;
    let rows = ((jump.half_h + reach_y) / grid.row_height.max(1.0)).ceil() as i64 - 1;
    let (row, col) = (jump.cell.row as i64, jump.cell.col as i64);
    CellBand {
        first_row: row - rows.max(0),
        last_row: row + rows.max(0),
        first_col: col - lanes.max(0),
        last_col: col + lanes.max(0),
    }
}

/// Rows a rail occupies in its chunk's grid, paired with the column at each row.
fn rail_path(rail: &Rail, grid: &Grid) -> Vec<(i64, i64)> {
    let first = grid.row_of(rail.y1);
    let last = grid.row_of(rail.y2);
    (first..=last)
        .map(|row| {
            let y = (grid.origin_y + (row as f32 + 0.5) * grid.row_height).clamp(rail.y1, rail.y2);
            let x = rail.x_at(y).unwrap_or(rail.x1);
            (row, grid.col_of(x))
        })
        .collect()
}

fn try_place_rail(
    seed: u64,
    index: u64,
    grid: &Grid,
    used: &mut Reservations,
    chunk: &mut Chunk,
    cell: Cell,
    config: &FreerideConfig,
) -> bool {
    let terrain = &config.terrain;
    let key = grid.cell_key(cell);
    let (x1, y1) = grid.center(cell);
    if crowded(chunk, x1, y1, terrain.rail_clearance) {
        return false;
    }

    let length = sample_range(
        roll(seed, index, key, SALT_RAIL_LENGTH),
        terrain.rail_min_length,
        terrain.rail_max_length,
    );
    let drift_sample = roll(seed, index, key, SALT_RAIL_DRIFT) * 2.0 - 1.0;
    let drift = drift_sample * terrain.rail_max_drift * length;
    let x2 = x1 + drift;
    let y2 = y1 + (length * length - drift * drift).max(0.0).sqrt();
    let edge = grid.half_width - grid.lane_width / 2.0;
    if x2.abs() > edge {
        return false;
    }

    let overlaps_rail = chunk.rails.iter().any(|other| {
        let spans_overlap = y1 <= other.y2 && other.y1 <= y2;
        let lateral = (x1 - other.x1)
            .abs()
            .min((x2 - other.x2).abs())
            .min(((x1 + x2) - (other.x1 + other.x2)).abs() / 2.0);
        spans_overlap && lateral < terrain.rail_clearance
    });
    if overlaps_rail {
        return false;
    }

    let mut rail = Rail {
        x1,
        y1,
        x2,
        y2,
        grindable: pick_grindable(roll(seed, index, key, SALT_RAIL_TYPE)),
        cells: Vec::new(),
    };
    let path = rail_path(&rail, grid);
    let in_chunk: Vec<Cell> = path
        .iter()
        .filter(|(row, col)| *row < grid.rows as i64 && *col >= 0 && *col < grid.cols as i64)
        .map(|&(row, col)| Cell::new(row as u32, col as u32))
        .collect();
    if in_chunk.iter().any(|c| used.is_used(*c)) {
        return false;
    }
    for &(row, col) in &path {
        used.reserve(row, col);
    }
    rail.cells = in_chunk;
    chunk.rails.push(rail);
    true
}

/// Full rail path ±2 lanes plus run-out rows past the end.
fn reserve_rail_clearance(rail: &Rail, grid: &Grid, used: &mut Reservations) {
    let path = rail_path(rail, grid);
    for &(row, col) in &path {
        for c in col - RAIL_CLEAR_LANES..=col + RAIL_CLEAR_LANES {
            used.reserve(row, c);
        }
    }
    if let Some(&(end_row, end_col)) = path.last() {
        used.reserve_band(CellBand {
            first_row: end_row + 1,
            last_row: end_row + RAIL_RUNOUT_ROWS,
            first_col: end_col - RAIL_CLEAR_LANES,
            last_col: end_col + RAIL_CLEAR_LANES,
        });
    }
}

/// Whether a cell may take an obstacle at all.
fn obstacle_allowed(cell: Cell, used: &Reservations, clear_path: &[u32]) -> bool {
    !used.is_used(cell) && clear_path.get(cell.row as usize) != Some(&cell.col)
}

/// Small in-cell offset so trees and rocks do not sit on a perfect grid.
fn jitter(seed: u64, index: u64, key: u64, grid: &Grid) -> (f32, f32) {
    let jx = (roll(seed, index, key, SALT_JITTER) - 0.5) * grid.lane_width * JITTER_FRACTION;
    let jy = (roll(seed, index, key + 1, SALT_JITTER) - 0.5) * grid.row_height * JITTER_FRACTION;
    (jx, jy)
}

#[allow(clippy::too_many_arguments)]
fn place_tree_clusters(
    seed: u64,
    index: u64,
    grid: &Grid,
    used: &mut Reservations,
    clear_path: &[u32],
    chunk: &mut Chunk,
    config: &FreerideConfig,
) {
    let terrain = &config.terrain;
    let radius = terrain.cluster_radius as i64;
    for (k, &chance) in terrain.cluster_chances.iter().enumerate() {
        let cluster_key = KEY_CLUSTER + (k as u64) * 1024;
        if roll(seed, index, cluster_key, SALT_CLUSTER) >= chance {
            continue;
        }
        let center_row = sample_int(
            roll(seed, index, cluster_key + 1, SALT_CLUSTER),
            0,
            grid.rows - 1,
        ) as i64;
        let center_col = sample_int(
            roll(seed, index, cluster_key + 2, SALT_CLUSTER),
            0,
            grid.cols - 1,
        ) as i64;
        let count = sample_int(
            roll(seed, index, cluster_key + 3, SALT_CLUSTER),
            terrain.cluster_min_trees,
            terrain.cluster_max_trees,
        );
        for t in 0..count as u64 {
            let tree_key = cluster_key + 16 + t * 4;
            let dr = sample_int(
                roll(seed, index, tree_key, SALT_CLUSTER_POS),
                0,
                2 * radius as u32,
            ) as i64
                - radius;
            let dc = sample_int(
                roll(seed, index, tree_key + 1, SALT_CLUSTER_POS),
                0,
                2 * radius as u32,
            ) as i64
                - radius;
            let (row, col) = (center_row + dr, center_col + dc);
            if row < 0 || col < 0 || row >= grid.rows as i64 || col >= grid.cols as i64 {
                continue;
            }
            let cell = Cell::new(row as u32, col as u32);
            if !obstacle_allowed(cell, used, clear_path) {
                continue;
            }
            let scale = sample_range(
                roll(seed, index, tree_key, SALT_TREE_SCALE),
                terrain.tree_min_scale,
                terrain.tree_max_scale,
            );
            let (x, y) = grid.center(cell);
            let (jx, jy) = jitter(seed, index, tree_key, grid);
            chunk.obstacles.push(Obstacle::tree(x + jx, y + jy, scale, cell));
            used.reserve(row, col);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn place_scattered(
    seed: u64,
    index: u64,
    grid: &Grid,
    used: &mut Reservations,
    clear_path: &[u32],
    chunk: &mut Chunk,
    config: &FreerideConfig,
) {
    let terrain = &config.terrain;
    let density = terrain.density_at(grid.origin_y);
    for cell in grid.cells() {
        if !obstacle_allowed(cell, used, clear_path) {
            continue;
        }
        let key = grid.cell_key(cell);
        if roll(seed, index, key, SALT_SCATTER) >= density {
            continue;
        }
        let (x, y) = grid.center(cell);
        let (jx, jy) = jitter(seed, index, key, grid);
        let (x, y) = (x + jx, y + jy);

        let rock_weight = if y >= terrain.rock_min_distance { 25.0 } else { 0.0 };
        let mogul_weight = if y >= terrain.mogul_min_distance { 15.0 } else { 0.0 };
        let total = 60.0 + rock_weight + mogul_weight;
        let pick = roll(seed, index, key, SALT_SCATTER_KIND) * total;

        let obstacle = if pick < 60.0 {
            let scale = sample_range(
                roll(seed, index, key, SALT_TREE_SCALE),
                terrain.tree_min_scale,
                terrain.tree_max_scale,
            );
            Obstacle::tree(x, y, scale, cell)
        } else if pick < 60.0 + rock_weight {
            let size_roll = roll(seed, index, key, SALT_ROCK_SIZE);
            let size = if size_roll < 0.5 {
                RockSize::Small
            } else if size_roll < 0.85 {
                RockSize::Medium
            } else {
                RockSize::Large
            };
            Obstacle::rock(x, y, size, cell)
        } else {
            Obstacle::mogul(x, y, cell)
        };
        chunk.obstacles.push(obstacle);
        used.reserve(cell.row as i64, cell.col as i64);
    }
}

fn place_collectibles(
    seed: u64,
    index: u64,
    grid: &Grid,
    used: &Reservations,
    chunk: &mut Chunk,
    config: &FreerideConfig,
) {
    let terrain = &config.terrain;
    let count = sample_int(
        roll(seed, index, KEY_COLLECTIBLE, SALT_COLLECTIBLE),
        terrain.min_collectibles,
        terrain.max_collectibles,
    );
    let edge = grid.half_width - grid.lane_width / 2.0;
    for i in 0..count as u64 {
        let key = KEY_COLLECTIBLE + 8 + i * 4;
        let x = sample_range(roll(seed, index, key, SALT_COLLECTIBLE), -edge, edge);
        let y = grid.origin_y
            + sample_range(
                roll(seed, index, key + 1, SALT_COLLECTIBLE),
                0.0,
                terrain.chunk_height(),
            );
        let (row, col) = (grid.row_of(y), grid.col_of(x));
        if row < 0 || col < 0 || row >= grid.rows as i64 || col >= grid.cols as i64 {
            continue;
        }
        if used.is_used(Cell::new(row as u32, col as u32)) {
            continue;
        }
        let kind = if roll(seed, index, key + 2, SALT_COLLECTIBLE) < terrain.big_collectible_chance {
            CollectibleKind::Big
        } else {
            CollectibleKind::Normal
        };
        chunk.collectibles.push(Collectible {
            x,
            y,
            kind,
            collected: false,
        });
    }
}

/// Flat handles to live entities across all streamed chunks, rebuilt whenever
/// chunks stream in or out. Handles, not copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveIndex {
    pub obstacles: Vec<EntityRef>,
    pub jumps: Vec<EntityRef>,
    pub rails: Vec<EntityRef>,
    pub lodges: Vec<EntityRef>,
    pub collectibles: Vec<EntityRef>,
}

/// What one streaming pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamReport {
    pub generated: u32,
    pub culled: u32,
}

/// Arena of streamed chunks plus the cross-chunk exclusion side-table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    seed: u64,
    chunks: VecDeque<Chunk>,
    next_index: u64,
    /// Future chunk index → cells it must reserve before placing anything.
    pending_exclusions: BTreeMap<u64, Vec<Cell>>,
    index: ActiveIndex,
    index_dirty: bool,
}

impl Terrain {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            chunks: VecDeque::new(),
            next_index: 0,
            pending_exclusions: BTreeMap::new(),
            index: ActiveIndex::default(),
            index_dirty: false,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn active(&self) -> &ActiveIndex {
        &self.index
    }

    pub fn pending_exclusions(&self) -> &BTreeMap<u64, Vec<Cell>> {
        &self.pending_exclusions
    }

    /// Generate chunks ahead of the camera and cull those fully behind it.
    pub fn stream(&mut self, camera_y: f32, config: &FreerideConfig) -> StreamReport {
        let mut report = StreamReport::default();
        let chunk_height = config.terrain.chunk_height();

        while (self.next_index as f32) * chunk_height < camera_y + config.terrain.lookahead_margin {
            let index = self.next_index;
            let incoming = self.pending_exclusions.remove(&index).unwrap_or_default();
            let generated = generate_chunk(self.seed, index, &incoming, config);
            if !generated.outgoing.is_empty() {
                self.pending_exclusions
                    .entry(index + 1)
                    .or_default()
                    .extend(generated.outgoing);
            }
            tracing::debug!(
                chunk = index,
                obstacles = generated.chunk.obstacles.len(),
                jumps = generated.chunk.jumps.len(),
                rails = generated.chunk.rails.len(),
                "Chunk streamed in"
            );
            self.chunks.push_back(generated.chunk);
            self.next_index += 1;
            report.generated += 1;
        }

        while let Some(front) = self.chunks.front() {
            if front.end_y() >= camera_y - config.terrain.cull_margin {
                break;
            }
            tracing::debug!(chunk = front.index, "Chunk culled");
            self.chunks.pop_front();
            report.culled += 1;
        }

        if report.generated > 0 || report.culled > 0 || self.index_dirty {
            self.rebuild_index();
        }
        report
    }

    /// Rebuild the flat handle lists from the chunk arena. Collected pickups
    /// drop out here.
    pub fn rebuild_index(&mut self) {
        let mut index = ActiveIndex::default();
        for chunk in &self.chunks {
            let refs = |n: usize| {
                (0..n as u32).map(move |i| EntityRef {
                    chunk: chunk.index,
                    index: i,
                })
            };
            index.obstacles.extend(refs(chunk.obstacles.len()));
            index.jumps.extend(refs(chunk.jumps.len()));
            index.rails.extend(refs(chunk.rails.len()));
            index.lodges.extend(refs(chunk.lodges.len()));
            index.collectibles.extend(
                refs(chunk.collectibles.len())
                    .filter(|r| !chunk.collectibles[r.index as usize].collected),
            );
        }
        self.index = index;
        self.index_dirty = false;
    }

    pub fn chunk(&self, index: u64) -> Option<&Chunk> {
        let first = self.chunks.front()?.index;
        let offset = index.checked_sub(first)?;
        self.chunks.get(offset as usize)
    }

    fn chunk_mut(&mut self, index: u64) -> Option<&mut Chunk> {
        let first = self.chunks.front()?.index;
        let offset = index.checked_sub(first)?;
        self.chunks.get_mut(offset as usize)
    }

    pub fn obstacle(&self, r: EntityRef) -> Option<&Obstacle> {
        self.chunk(r.chunk)?.obstacles.get(r.index as usize)
    }

    pub fn jump(&self, r: EntityRef) -> Option<&Jump> {
        self.chunk(r.chunk)?.jumps.get(r.index as usize)
    }

    pub fn rail(&self, r: EntityRef) -> Option<&Rail> {
        self.chunk(r.chunk)?.rails.get(r.index as usize)
    }

    pub fn lodge(&self, r: EntityRef) -> Option<&Lodge> {
        self.chunk(r.chunk)?.lodges.get(r.index as usize)
    }

    pub fn collectible(&self, r: EntityRef) -> Option<&Collectible> {
        self.chunk(r.chunk)?.collectibles.get(r.index as usize)
    }

    /// Mark a collectible as taken. Returns its kind the first time only.
    pub fn collect(&mut self, r: EntityRef) -> Option<CollectibleKind> {
        let item = self
            .chunk_mut(r.chunk)?
            .collectibles
            .get_mut(r.index as usize)?;
        if item.collected {
            return None;
        }
        item.collected = true;
        let kind = item.kind;
        self.index_dirty = true;
        Some(kind)
    }

    pub fn obstacles(&self) -> impl Iterator<Item = (EntityRef, &Obstacle)> + '_ {
        self.index
            .obstacles
            .iter()
            .filter_map(|r| self.obstacle(*r).map(|o| (*r, o)))
    }

    pub fn jumps(&self) -> impl Iterator<Item = (EntityRef, &Jump)> + '_ {
        self.index
            .jumps
            .iter()
            .filter_map(|r| self.jump(*r).map(|j| (*r, j)))
    }

    pub fn rails(&self) -> impl Iterator<Item = (EntityRef, &Rail)> + '_ {
        self.index
            .rails
            .iter()
            .filter_map(|r| self.rail(*r).map(|rail| (*r, rail)))
    }

    pub fn lodges(&self) -> impl Iterator<Item = (EntityRef, &Lodge)> + '_ {
        self.index
            .lodges
            .iter()
            .filter_map(|r| self.lodge(*r).map(|l| (*r, l)))
    }

    pub fn collectibles(&self) -> impl Iterator<Item = (EntityRef, &Collectible)> + '_ {
        self.index
            .collectibles
            .iter()
            .filter_map(|r| self.collectible(*r).map(|c| (*r, c)))
            .filter(|(_, c)| !c.collected)
    }
}
