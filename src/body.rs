use crate::geometry::{BoundingBox, Point3};
use glam::{DQuat, DVec3};
use std::collections::BTreeMap;

/// Adapter over a solid owned by the host's modeling kernel.
///
/// The bridge only ever reads geometry and requests rigid motions; it never
/// creates or destroys the underlying body.
pub trait SolidBody {
    fn name(&self) -> &str;
    fn bounding_box(&self) -> BoundingBox;
    /// Center of mass, which is not the bounding-box center in general.
    fn centroid(&self) -> Point3;
    fn apply_translation(&mut self, vector: DVec3);
    fn apply_rotation(&mut self, axis: DVec3, angle: f64, pivot: Point3);
}

/// The host document the dispatcher's handlers operate against.
pub trait Document {
    fn find_body(&mut self, name: &str) -> Option<&mut dyn SolidBody>;
    fn body_names(&self) -> Vec<String>;
}

/// In-memory solid used by the demo binary and the test suite.
///
/// Tracks a bounding box plus a centroid that may sit anywhere inside it, so
/// asymmetric mass distributions are representable. Rotation moves the
/// centroid rigidly and re-fits an axis-aligned box around the rotated
/// corners.
#[derive(Debug, Clone)]
pub struct BoxBody {
    name: String,
    bbox: BoundingBox,
    centroid: Point3,
}

impl BoxBody {
    pub fn new(name: impl Into<String>, bbox: BoundingBox) -> Self {
        let centroid = bbox.center();
        Self {
            name: name.into(),
            bbox,
            centroid,
        }
    }

    /// Same box, but with the mass center displaced from the geometric one.
    pub fn with_centroid(mut self, centroid: Point3) -> Self {
        self.centroid = centroid;
        self
    }
}

impl SolidBody for BoxBody {
    fn name(&self) -> &str {
        &self.name
    }

    fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    fn centroid(&self) -> Point3 {
        self.centroid
    }

    fn apply_translation(&mut self, vector: DVec3) {
        self.bbox = self.bbox.translated(vector);
        self.centroid += vector;
    }

    fn apply_rotation(&mut self, axis: DVec3, angle: f64, pivot: Point3) {
        let rotation = DQuat::from_axis_angle(axis.normalize_or_zero(), angle);
        let rotate = |p: Point3| pivot + rotation * (p - pivot);
        self.centroid = rotate(self.centroid);
        self.bbox = BoundingBox::from_points(self.bbox.corners().into_iter().map(rotate))
            .unwrap_or(self.bbox);
    }
}

/// Simple name-keyed document for demos and tests.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    bodies: BTreeMap<String, BoxBody>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: BoxBody) {
        self.bodies.insert(body.name().to_string(), body);
    }
}

impl Document for MemoryDocument {
    fn find_body(&mut self, name: &str) -> Option<&mut dyn SolidBody> {
        self.bodies
            .get_mut(name)
            .map(|body| body as &mut dyn SolidBody)
    }

    fn body_names(&self) -> Vec<String> {
        self.bodies.keys().cloned().collect()
    }
}
