//! Filesystem mailbox command bridge for a CAD host.
//!
//! An external controller writes JSON command payloads to a command file; a
//! polling watcher detects new content, hands it across a bounded channel
//! into the host's single-threaded execution context, and the dispatcher
//! writes a normalized response back to a response file. A placement resolver
//! turns declarative anchoring requests into rigid translations against a
//! solid's bounding box and centroid.
//!
//! Hosts embed the library: implement [`body::Document`] and
//! [`body::SolidBody`] over the modeling kernel, register extra handlers on
//! the [`dispatch::Dispatcher`], and wire a [`bridge::Bridge`] to an
//! [`executor::Executor`].

pub mod body;
pub mod bridge;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod geometry;
pub mod handlers;
pub mod mailbox;
pub mod placement;
pub mod protocol;

pub use body::{BoxBody, Document, MemoryDocument, SolidBody};
pub use bridge::{Bridge, BridgeConfig, Delivery};
pub use dispatch::Dispatcher;
pub use error::{BridgeError, InvalidReference};
pub use executor::{Executor, MacroPolicy};
pub use geometry::{BoundingBox, Point3, UNIT_SCALE};
pub use mailbox::Mailbox;
pub use placement::{ExtrudeDirection, PlacementSpec, XAnchor, YAnchor, ZAnchor};
pub use protocol::{CommandEnvelope, MacroStep, Response, Status};
