use glam::DVec3;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// A point in the host's internal coordinate system.
pub type Point3 = DVec3;

/// Multiplicative factor converting external millimeters into the host's
/// internal linear unit (centimeters in the reference host).
pub const UNIT_SCALE: f64 = 0.1;

/// Rigid translations shorter than this (in internal units) are not applied.
pub const MIN_TRANSLATION: f64 = 1e-6;

pub fn mm_to_internal(mm: f64) -> f64 {
    mm * UNIT_SCALE
}

pub fn internal_to_mm(internal: f64) -> f64 {
    internal / UNIT_SCALE
}

/// Axis-aligned bounding box in internal units. Componentwise `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox {
    pub fn new(min: Point3, max: Point3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Smallest box containing every given point.
    pub fn from_points(points: impl IntoIterator<Item = Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Point3 {
        (self.min + self.max) * 0.5
    }

    pub fn corners(&self) -> [Point3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(b.x, b.y, b.z),
        ]
    }

    pub fn translated(&self, offset: DVec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Shortest Euclidean gap between two boxes; zero when they touch or
    /// overlap.
    pub fn clearance_to(&self, other: &Self) -> f64 {
        let gap = |min_a: f64, max_a: f64, min_b: f64, max_b: f64| {
            (min_a - max_b).max(min_b - max_a).max(0.0)
        };
        let dx = gap(self.min.x, self.max.x, other.min.x, other.max.x);
        let dy = gap(self.min.y, self.max.y, other.min.y, other.max.y);
        let dz = gap(self.min.z, self.max.z, other.min.z, other.max.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// JSON object for a point, converted back to millimeters for the wire.
pub fn point_to_mm_json(p: Point3) -> JsonValue {
    json!({
        "x": internal_to_mm(p.x),
        "y": internal_to_mm(p.y),
        "z": internal_to_mm(p.z),
    })
}
