//! # Salon Renderer
//!
//! Render-optimization layer for the layout canvas: viewport culling over
//! the quadtree, dirty-region tracking that limits repaint to changed
//! screen areas, and frame/render timing.
//!
//! [`RenderOptimizer`] bundles all three for one editing session. Everything
//! runs on the UI thread; mutations for a frame must be reported before
//! that frame's paint asks for visible objects and dirty regions.

pub mod config;
pub mod culling;
pub mod dirty;
pub mod error;
pub mod frame_timer;
pub mod optimizer;

pub use config::OptimizerConfig;
pub use culling::ViewportCuller;
pub use dirty::DirtyRegionTracker;
pub use error::ConfigError;
pub use frame_timer::{FrameReport, FrameTimer};
pub use optimizer::RenderOptimizer;
