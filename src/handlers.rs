//! Built-in command handlers.
//!
//! Everything here works through the [`SolidBody`] adapter surface alone:
//! bounding box, centroid, rigid translate, rigid rotate. Kernel-owned
//! modeling operations (extrude, booleans, patterns) are registered by the
//! embedding host, not by this module. All wire values are millimeters; the
//! handlers scale to internal units on the way in and back on the way out.

use crate::body::{Document, SolidBody};
use crate::dispatch::Dispatcher;
use crate::error::InvalidReference;
use crate::geometry::{internal_to_mm, mm_to_internal, point_to_mm_json, BoundingBox, Point3};
use crate::placement::{self, ExtrudeDirection, PlacementSpec, XAnchor, YAnchor, ZAnchor};
use color_eyre::eyre::{Result, WrapErr};
use glam::DVec3;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};

/// Registers the complete built-in command surface on `dispatcher`.
pub fn register_builtin(dispatcher: &mut Dispatcher) {
    dispatcher.register("place_body", place_body);
    dispatcher.register("move_by_name", move_by_name);
    dispatcher.register("rotate_by_name", rotate_by_name);
    dispatcher.register("get_bounding_box", get_bounding_box);
    dispatcher.register("get_body_center", get_body_center);
    dispatcher.register("get_body_dimensions", get_body_dimensions);
    dispatcher.register("get_body_relationships", get_body_relationships);
    dispatcher.register("measure_distance", measure_distance);
    dispatcher.register("debug_body_placement", debug_body_placement);
}

fn parse_args<T: DeserializeOwned>(params: &Map<String, JsonValue>) -> Result<T> {
    serde_json::from_value(JsonValue::Object(params.clone())).wrap_err("invalid parameters")
}

fn require_body<'a>(
    document: &'a mut dyn Document,
    name: &str,
) -> Result<&'a mut dyn SolidBody, InvalidReference> {
    document
        .find_body(name)
        .ok_or_else(|| InvalidReference(name.to_string()))
}

/// Snapshot of one body's geometry, for commands that compare two bodies.
fn body_snapshot(
    document: &mut dyn Document,
    name: &str,
) -> Result<(BoundingBox, Point3), InvalidReference> {
    let body = require_body(document, name)?;
    Ok((body.bounding_box(), body.centroid()))
}

fn default_center() -> String {
    "center".to_string()
}

fn default_positive() -> String {
    "positive".to_string()
}

fn default_z_axis() -> String {
    "z".to_string()
}

#[derive(Debug, Deserialize)]
struct PlaceBodyArgs {
    body_name: String,
    #[serde(default)]
    cx: f64,
    #[serde(default)]
    cy: f64,
    #[serde(default)]
    cz: f64,
    #[serde(default = "default_center")]
    x_placement: String,
    #[serde(default = "default_center")]
    y_placement: String,
    #[serde(default = "default_center")]
    z_placement: String,
    #[serde(default = "default_positive")]
    direction: String,
}

fn place_body(document: &mut dyn Document, params: &Map<String, JsonValue>) -> Result<JsonValue> {
    let args: PlaceBodyArgs = parse_args(params)?;
    let spec = PlacementSpec {
        target: DVec3::new(
            mm_to_internal(args.cx),
            mm_to_internal(args.cy),
            mm_to_internal(args.cz),
        ),
        x_anchor: XAnchor::parse(&args.x_placement),
        y_anchor: YAnchor::parse(&args.y_placement),
        z_anchor: ZAnchor::parse(&args.z_placement),
        direction: ExtrudeDirection::parse(&args.direction),
    };
    let body = require_body(document, &args.body_name)?;
    let translation = placement::place_body(body, &spec);
    Ok(json!({
        "body_name": args.body_name,
        "translation": {
            "x": internal_to_mm(translation.x),
            "y": internal_to_mm(translation.y),
            "z": internal_to_mm(translation.z),
        },
    }))
}

#[derive(Debug, Deserialize)]
struct MoveArgs {
    body_name: String,
    #[serde(default)]
    x_dist: f64,
    #[serde(default)]
    y_dist: f64,
    #[serde(default)]
    z_dist: f64,
}

fn move_by_name(document: &mut dyn Document, params: &Map<String, JsonValue>) -> Result<JsonValue> {
    let args: MoveArgs = parse_args(params)?;
    let body = require_body(document, &args.body_name)?;
    body.apply_translation(DVec3::new(
        mm_to_internal(args.x_dist),
        mm_to_internal(args.y_dist),
        mm_to_internal(args.z_dist),
    ));
    Ok(json!(format!("Moved '{}'.", args.body_name)))
}

#[derive(Debug, Deserialize)]
struct RotateArgs {
    body_name: String,
    #[serde(default = "default_z_axis")]
    axis: String,
    /// Degrees.
    #[serde(default)]
    angle: f64,
    #[serde(default)]
    cx: f64,
    #[serde(default)]
    cy: f64,
    #[serde(default)]
    cz: f64,
}

fn rotate_by_name(
    document: &mut dyn Document,
    params: &Map<String, JsonValue>,
) -> Result<JsonValue> {
    let args: RotateArgs = parse_args(params)?;
    let axis = match args.axis.to_ascii_lowercase().as_str() {
        "x" => DVec3::X,
        "y" => DVec3::Y,
        "z" => DVec3::Z,
        other => color_eyre::eyre::bail!("invalid rotation axis: {other}"),
    };
    let pivot = DVec3::new(
        mm_to_internal(args.cx),
        mm_to_internal(args.cy),
        mm_to_internal(args.cz),
    );
    let body = require_body(document, &args.body_name)?;
    body.apply_rotation(axis, args.angle.to_radians(), pivot);
    Ok(json!(format!("Rotated '{}'.", args.body_name)))
}

#[derive(Debug, Deserialize)]
struct BodyQueryArgs {
    body_name: String,
}

fn get_bounding_box(
    document: &mut dyn Document,
    params: &Map<String, JsonValue>,
) -> Result<JsonValue> {
    let args: BodyQueryArgs = parse_args(params)?;
    let (bbox, _) = body_snapshot(document, &args.body_name)?;
    let size = bbox.size();
    Ok(json!({
        "min": point_to_mm_json(bbox.min),
        "max": point_to_mm_json(bbox.max),
        "size": {
            "width": internal_to_mm(size.x),
            "height": internal_to_mm(size.y),
            "depth": internal_to_mm(size.z),
        },
        "center": point_to_mm_json(bbox.center()),
    }))
}

fn get_body_center(
    document: &mut dyn Document,
    params: &Map<String, JsonValue>,
) -> Result<JsonValue> {
    let args: BodyQueryArgs = parse_args(params)?;
    let (bbox, centroid) = body_snapshot(document, &args.body_name)?;
    Ok(json!({
        "geometric_center": point_to_mm_json(bbox.center()),
        "mass_center": point_to_mm_json(centroid),
        "bounding_center": point_to_mm_json(bbox.center()),
    }))
}

fn get_body_dimensions(
    document: &mut dyn Document,
    params: &Map<String, JsonValue>,
) -> Result<JsonValue> {
    let args: BodyQueryArgs = parse_args(params)?;
    let (bbox, _) = body_snapshot(document, &args.body_name)?;
    let size = bbox.size();
    Ok(json!({
        "length": internal_to_mm(size.x),
        "width": internal_to_mm(size.y),
        "height": internal_to_mm(size.z),
        // Physical properties are kernel-owned; the adapter surface has
        // none, so these report 0 like a host without them would.
        "volume": 0.0,
        "surface_area": 0.0,
    }))
}

#[derive(Debug, Deserialize)]
struct RelationshipArgs {
    body_name: String,
    other_body_name: String,
}

fn get_body_relationships(
    document: &mut dyn Document,
    params: &Map<String, JsonValue>,
) -> Result<JsonValue> {
    let args: RelationshipArgs = parse_args(params)?;
    let (bbox1, centroid1) = body_snapshot(document, &args.body_name)?;
    let (bbox2, centroid2) = body_snapshot(document, &args.other_body_name)?;

    let distance = internal_to_mm(centroid1.distance(centroid2));
    let interference = bbox1.intersects(&bbox2);

    // Classification order matches the reference host: Z, then X, then Y.
    // "back" is +Y and "front" is -Y, consistent with front = max-Y face.
    let relative_position = if centroid1.z > bbox2.max.z {
        "above"
    } else if centroid1.z < bbox2.min.z {
        "below"
    } else if centroid1.x > bbox2.max.x {
        "right"
    } else if centroid1.x < bbox2.min.x {
        "left"
    } else if centroid1.y > bbox2.max.y {
        "back"
    } else if centroid1.y < bbox2.min.y {
        "front"
    } else {
        "overlapping"
    };

    Ok(json!({
        "distance": distance,
        "interference": interference,
        "relative_position": relative_position,
        "clearance": if interference { 0.0 } else { distance },
    }))
}

#[derive(Debug, Deserialize)]
struct MeasureArgs {
    body_name1: String,
    body_name2: String,
}

fn measure_distance(
    document: &mut dyn Document,
    params: &Map<String, JsonValue>,
) -> Result<JsonValue> {
    let args: MeasureArgs = parse_args(params)?;
    let (bbox1, centroid1) = body_snapshot(document, &args.body_name1)?;
    let (bbox2, centroid2) = body_snapshot(document, &args.body_name2)?;

    let clearance = internal_to_mm(bbox1.clearance_to(&bbox2));
    Ok(json!({
        "center_to_center": internal_to_mm(centroid1.distance(centroid2)),
        "bounding_box_clearance": clearance,
        "is_overlapping": clearance == 0.0,
    }))
}

fn debug_body_placement(
    document: &mut dyn Document,
    params: &Map<String, JsonValue>,
) -> Result<JsonValue> {
    let args: BodyQueryArgs = parse_args(params)?;
    let (bbox, centroid) = body_snapshot(document, &args.body_name)?;
    let size = bbox.size();
    let mm = internal_to_mm;

    let mut info = format!("=== Placement info for {} ===\n", args.body_name);
    info.push_str(&format!(
        "Centroid: ({:.2}, {:.2}, {:.2}) mm\n",
        mm(centroid.x),
        mm(centroid.y),
        mm(centroid.z)
    ));
    info.push_str("Bounding box:\n");
    info.push_str(&format!(
        "  min: ({:.2}, {:.2}, {:.2}) mm\n",
        mm(bbox.min.x),
        mm(bbox.min.y),
        mm(bbox.min.z)
    ));
    info.push_str(&format!(
        "  max: ({:.2}, {:.2}, {:.2}) mm\n",
        mm(bbox.max.x),
        mm(bbox.max.y),
        mm(bbox.max.z)
    ));
    info.push_str("Size:\n");
    info.push_str(&format!("  width (X): {:.2} mm\n", mm(size.x)));
    info.push_str(&format!("  depth (Y): {:.2} mm\n", mm(size.y)));
    info.push_str(&format!("  height (Z): {:.2} mm\n", mm(size.z)));
    info.push_str("Anchor references:\n");
    info.push_str(&format!("  left (X-): {:.2} mm\n", mm(bbox.min.x)));
    info.push_str(&format!("  right (X+): {:.2} mm\n", mm(bbox.max.x)));
    info.push_str(&format!("  back (Y-): {:.2} mm\n", mm(bbox.min.y)));
    info.push_str(&format!("  front (Y+): {:.2} mm\n", mm(bbox.max.y)));
    info.push_str(&format!("  bottom (Z-): {:.2} mm\n", mm(bbox.min.z)));
    info.push_str(&format!("  top (Z+): {:.2} mm\n", mm(bbox.max.z)));
    Ok(json!(info))
}
