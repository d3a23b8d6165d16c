use serde::{Deserialize, Serialize};

/// A grid cell inside one chunk. `row` counts down the slope from the chunk top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

impl Cell {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Stable handle to an entity owned by a chunk: chunk index + slot in that
/// chunk's collection. Handles never dangle into freed memory; a culled chunk
/// simply makes the lookup return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub chunk: u64,
    pub index: u32,
}

/// Axis-aligned rectangle given by centre and half extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub half_w: f32,
    pub half_h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, half_w: f32, half_h: f32) -> Self {
        Self {
            x,
            y,
            half_w,
            half_h,
        }
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        (self.x - other.x).abs() < self.half_w + other.half_w
            && (self.y - other.y).abs() < self.half_h + other.half_h
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        (self.x - x).abs() <= self.half_w && (self.y - y).abs() <= self.half_h
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.half_h
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    Tree,
    Rock,
    Mogul,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RockSize {
    Small,
    Medium,
    Large,
}

impl RockSize {
    pub fn half_extent(&self) -> f32 {
        match self {
            RockSize::Small => 14.0,
            RockSize::Medium => 22.0,
            RockSize::Large => 32.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub x: f32,
    pub y: f32,
    pub half_w: f32,
    pub half_h: f32,
    pub cell: Cell,
}

impl Obstacle {
    pub fn tree(x: f32, y: f32, scale: f32, cell: Cell) -> Self {
        Self {
            kind: ObstacleKind::Tree,
            x,
            y,
            half_w: 18.0 * scale,
            half_h: 24.0 * scale,
            cell,
        }
    }

    pub fn rock(x: f32, y: f32, size: RockSize, cell: Cell) -> Self {
        let half = size.half_extent();
        Self {
            kind: ObstacleKind::Rock,
            x,
            y,
            half_w: half,
            half_h: half * 0.8,
            cell,
        }
    }

    pub fn mogul(x: f32, y: f32, cell: Cell) -> Self {
        Self {
            kind: ObstacleKind::Mogul,
            x,
            y,
            half_w: 26.0,
            half_h: 12.0,
            cell,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.half_w, self.half_h)
    }
}

/// Jump size category. Bigger jumps launch harder and need longer landing zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JumpSize {
    Small,
    Medium,
    Large,
    Mega,
    Massive,
}

impl JumpSize {
    pub fn launch_power(&self) -> f32 {
        match self {
            JumpSize::Small => 0.7,
            JumpSize::Medium => 1.0,
            JumpSize::Large => 1.3,
            JumpSize::Mega => 1.6,
            JumpSize::Massive => 2.0,
        }
    }

    pub fn half_extents(&self) -> (f32, f32) {
        match self {
            JumpSize::Small => (30.0, 12.0),
            JumpSize::Medium => (40.0, 15.0),
            JumpSize::Large => (50.0, 18.0),
            JumpSize::Mega => (60.0, 20.0),
            JumpSize::Massive => (80.0, 25.0),
        }
    }

    /// Landing band half-height in rows and half-width in lanes.
    pub fn landing_band(&self) -> (u32, u32) {
        match self {
            JumpSize::Small => (2, 1),
            JumpSize::Medium => (2, 1),
            JumpSize::Large => (3, 2),
            JumpSize::Mega => (4, 2),
            JumpSize::Massive => (5, 3),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jump {
    pub x: f32,
    pub y: f32,
    pub half_w: f32,
    pub half_h: f32,
    pub launch_power: f32,
    pub size: JumpSize,
    pub cell: Cell,
}

impl Jump {
    pub fn new(x: f32, y: f32, size: JumpSize, cell: Cell) -> Self {
        let (half_w, half_h) = size.half_extents();
        Self {
            x,
            y,
            half_w,
            half_h,
            launch_power: size.launch_power(),
            size,
            cell,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.half_w, self.half_h)
    }
}

/// What a rail is built from. Affects trick naming and bonus only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrindableType {
    Rail,
    Funbox,
    Log,
    Bench,
    Kinked,
}

impl GrindableType {
    pub const ALL: [GrindableType; 5] = [
        GrindableType::Rail,
        GrindableType::Funbox,
        GrindableType::Log,
        GrindableType::Bench,
        GrindableType::Kinked,
    ];

    pub fn bonus(&self) -> f32 {
        match self {
            GrindableType::Rail => 1.0,
            GrindableType::Funbox => 1.2,
            GrindableType::Log => 1.3,
            GrindableType::Bench => 1.4,
            GrindableType::Kinked => 1.6,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GrindableType::Rail => "Rail",
            GrindableType::Funbox => "Funbox",
            GrindableType::Log => "Log",
            GrindableType::Bench => "Bench",
            GrindableType::Kinked => "Kinked Rail",
        }
    }
}

/// A grindable segment running downhill from `(x1, y1)` to `(x2, y2)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rail {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub grindable: GrindableType,
    /// Cells along the rail path.
    pub cells: Vec<Cell>,
}

impl Rail {
    pub fn length(&self) -> f32 {
        ((self.x2 - self.x1).powi(2) + (self.y2 - self.y1).powi(2)).sqrt()
    }

    /// Point at fractional progress `t` along the rail.
    pub fn point_at(&self, t: f32) -> (f32, f32) {
        (
            self.x1 + (self.x2 - self.x1) * t,
            self.y1 + (self.y2 - self.y1) * t,
        )
    }

    /// Rail x at world `y`, or `None` outside the rail's vertical span.
    pub fn x_at(&self, y: f32) -> Option<f32> {
        let span = self.y2 - self.y1;
        if span.abs() < 1e-4 || y < self.y1.min(self.y2) || y > self.y1.max(self.y2) {
            return None;
        }
        let t = (y - self.y1) / span;
        Some(self.x1 + (self.x2 - self.x1) * t)
    }

    /// Fractional progress corresponding to world `y`, clamped to [0, 1].
    pub fn progress_at(&self, y: f32) -> f32 {
        let span = self.y2 - self.y1;
        if span.abs() < 1e-4 {
            return 0.0;
        }
        ((y - self.y1) / span).clamp(0.0, 1.0)
    }
}

/// A rare safe-haven building. Riding into the door or its ramp enters the
/// interior; any other part of the footprint is a wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lodge {
    pub footprint: Rect,
    pub door: Rect,
    pub ramp: Rect,
    /// Cells reserved for the footprint and its exclusion zone.
    pub cells: Vec<Cell>,
}

impl Lodge {
    pub fn new(x: f32, y: f32, width: f32, height: f32, cells: Vec<Cell>) -> Self {
        let footprint = Rect::new(x, y, width / 2.0, height / 2.0);
        let top = y - height / 2.0;
        // Door on the uphill face, ramp leading into it from above.
        let door = Rect::new(x, top + 10.0, width * 0.15, 10.0);
        let ramp = Rect::new(x, top - 20.0, width * 0.15, 20.0);
        Self {
            footprint,
            door,
            ramp,
            cells,
        }
    }

    pub fn is_entrance(&self, rider: &Rect) -> bool {
        self.door.overlaps(rider) || self.ramp.overlaps(rider)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectibleKind {
    Normal,
    Big,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    pub x: f32,
    pub y: f32,
    pub kind: CollectibleKind,
    pub collected: bool,
}

impl Collectible {
    pub const RADIUS: f32 = 16.0;
}
