//! trackcurator
//!
//! Reconciliation engine for curating object-tracking annotations
//! (bounding boxes with persistent identity labels) over paired
//! image-frame sequences. The host GUI owns the windowing, canvas widget
//! and dialogs; this crate owns the tracklet table, its invariants, and
//! the translation between canvas gestures and table mutations.

pub mod canvas;
pub mod config;
pub mod dual_view;
pub mod error;
pub mod frame_index;
pub mod identity;
pub mod image_source;
pub mod logging;
pub mod session;
pub mod settings;
pub mod store;
pub mod tracklet;

pub use canvas::{CanvasEvent, DialogRequest, SessionEffect, ShapeSpec};
pub use dual_view::{DualViewer, SingleViewer};
pub use error::Error;
pub use frame_index::FrameKey;
pub use session::FrameSession;
pub use store::TrackletStore;
pub use tracklet::Tracklet;
