//! # Salon Core
//!
//! Geometry primitives, the scene object model, and the quadtree spatial
//! index that backs viewport culling on the Salon layout canvas.
//!
//! Objects are owned by the editor; the index only keeps ids and the
//! bounding boxes it was last told about.

pub mod geometry;
pub mod object;
pub mod scene;
pub mod spatial;

pub use geometry::{Point, Rect, Size};
pub use object::{ObjectId, SceneObject, ShapeKind};
pub use scene::Scene;
pub use spatial::{IndexStats, QuadTreeConfig, SpatialEntry, SpatialIndex};
