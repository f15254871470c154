//! Batch algorithms built on the mesh core.
//!
//! - **Triangulation**: ear clipping of every polygon, with the per-face work
//!   spread over a `rayon` pool
//!
//! Long-running algorithms take a [`Progress`] callback through their options.

mod progress;
pub mod triangulate;

pub use progress::Progress;
pub use triangulate::{triangulate, triangulate_selection, TriangulateOptions};
