//! Anchor-aware body placement.
//!
//! Converts a declarative placement request ("put this solid's bottom-left
//! corner at this coordinate") into a single rigid translation computed from
//! the body's current bounding box and centroid.

use crate::body::SolidBody;
use crate::geometry::{BoundingBox, Point3, MIN_TRANSLATION};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Which X-axis feature of the bounding box lands on the target coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XAnchor {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YAnchor {
    /// The box's max-Y face. Fixed convention, not user-configurable.
    Front,
    #[default]
    Center,
    /// The box's min-Y face.
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZAnchor {
    Bottom,
    #[default]
    Center,
    Top,
}

/// Which way the generative operation extended the solid from its sketch
/// plane. A negative extrusion leaves the geometric "bottom" at the box's
/// max-Z face, so the resolver swaps which face it anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtrudeDirection {
    #[default]
    Positive,
    Negative,
}

impl XAnchor {
    /// Permissive: unrecognized strings fall back to `Center`.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::Center,
        }
    }
}

impl YAnchor {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "front" => Self::Front,
            "back" => Self::Back,
            _ => Self::Center,
        }
    }
}

impl ZAnchor {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "bottom" => Self::Bottom,
            "top" => Self::Top,
            _ => Self::Center,
        }
    }
}

impl ExtrudeDirection {
    /// Anything other than `positive` is treated as negative, mirroring the
    /// reference host's behavior.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("positive") {
            Self::Positive
        } else {
            Self::Negative
        }
    }
}

/// One placement request. Target is in internal units; built per command
/// invocation and consumed once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementSpec {
    pub target: Point3,
    pub x_anchor: XAnchor,
    pub y_anchor: YAnchor,
    pub z_anchor: ZAnchor,
    pub direction: ExtrudeDirection,
}

impl PlacementSpec {
    pub fn new(target: Point3) -> Self {
        Self {
            target,
            x_anchor: XAnchor::default(),
            y_anchor: YAnchor::default(),
            z_anchor: ZAnchor::default(),
            direction: ExtrudeDirection::default(),
        }
    }
}

/// Translation that moves `centroid` so the anchored bounding-box features
/// land on the spec's target, per axis independently.
pub fn resolve_translation(bbox: &BoundingBox, centroid: Point3, spec: &PlacementSpec) -> DVec3 {
    let target_x = match spec.x_anchor {
        XAnchor::Left => spec.target.x + (centroid.x - bbox.min.x),
        XAnchor::Right => spec.target.x + (centroid.x - bbox.max.x),
        XAnchor::Center => spec.target.x,
    };

    let target_y = match spec.y_anchor {
        YAnchor::Front => spec.target.y + (centroid.y - bbox.max.y),
        YAnchor::Back => spec.target.y + (centroid.y - bbox.min.y),
        YAnchor::Center => spec.target.y,
    };

    // The direction flag applies to Z only: a negative-direction extrusion
    // swaps which face means "bottom" so the caller's vocabulary stays stable.
    let target_z = match (spec.z_anchor, spec.direction) {
        (ZAnchor::Bottom, ExtrudeDirection::Positive) => {
            spec.target.z + (centroid.z - bbox.min.z)
        }
        (ZAnchor::Bottom, ExtrudeDirection::Negative) => {
            spec.target.z + (centroid.z - bbox.max.z)
        }
        (ZAnchor::Top, ExtrudeDirection::Positive) => spec.target.z + (centroid.z - bbox.max.z),
        (ZAnchor::Top, ExtrudeDirection::Negative) => spec.target.z + (centroid.z - bbox.min.z),
        (ZAnchor::Center, _) => spec.target.z,
    };

    DVec3::new(target_x, target_y, target_z) - centroid
}

/// Resolves the translation for `body` and applies it through the adapter.
///
/// Returns the translation that was computed. Degenerate motions below
/// [`MIN_TRANSLATION`] are skipped entirely.
pub fn place_body(body: &mut dyn SolidBody, spec: &PlacementSpec) -> DVec3 {
    let translation = resolve_translation(&body.bounding_box(), body.centroid(), spec);
    if translation.length() < MIN_TRANSLATION {
        tracing::debug!(body = body.name(), "placement already satisfied, skipping move");
        return translation;
    }
    tracing::debug!(
        body = body.name(),
        ?translation,
        "applying placement translation"
    );
    body.apply_translation(translation);
    translation
}
