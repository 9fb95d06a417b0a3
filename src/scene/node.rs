use std::fmt;

/// Identity of a node, and of the note bound to it.
///
/// Issued in increasing order starting at 1 and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A point in view-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// One live touch effect.
///
/// Everything but `life` is fixed at creation. Render-time effects (jitter,
/// growth) are derived from these fields and never written back.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) position: Point,
    pub(crate) radius: f32,
    pub(crate) hue: f32,
    pub(crate) life: f32,
    pub(crate) seed: f32,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Base radius (before life-driven growth)
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Hue in degrees, [0, 360). Saturation and brightness are always full.
    pub fn hue(&self) -> f32 {
        self.hue
    }

    /// Remaining life in (0, 1]
    pub fn life(&self) -> f32 {
        self.life
    }

    /// Phase offset for render jitter, [0, 1)
    pub fn seed(&self) -> f32 {
        self.seed
    }
}
