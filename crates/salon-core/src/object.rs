use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Point, Rect, Size};

/// Stable identity of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outline of an object. Only the bounding box matters for indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Round tables and other elliptical footprints.
    Ellipse,
    /// Square and rectangular footprints (tables, walls, decorations).
    Polygon,
}

/// A positioned object on the layout canvas.
///
/// Geometry is owned by the editor and may change at any time; anything
/// that caches a footprint (the spatial index, dirty tracking) has to be
/// told explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    /// Top-left corner.
    pub position: Point,
    pub size: Size,
    pub shape: ShapeKind,
}

impl SceneObject {
    pub fn new(shape: ShapeKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: ObjectId::new(),
            position: Point::new(x, y),
            size: Size::new(width, height),
            shape,
        }
    }

    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(ShapeKind::Polygon, x, y, width, height)
    }

    pub fn ellipse(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(ShapeKind::Ellipse, x, y, width, height)
    }

    pub fn bbox(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.position = Point::new(x, y);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.size = Size::new(width, height);
    }

    /// Point hit test against the actual outline.
    ///
    /// Ellipses use the inscribed ellipse of the bounding box, so clicks on
    /// the corners of a round table miss it.
    pub fn hit_test(&self, p: &Point) -> bool {
        let bbox = self.bbox();
        if !bbox.contains_point(p) {
            return false;
        }
        match self.shape {
            ShapeKind::Polygon => true,
            ShapeKind::Ellipse => {
                let c = bbox.center();
                let rx = bbox.width / 2.0;
                let ry = bbox.height / 2.0;
                let nx = (p.x - c.x) / rx;
                let ny = (p.y - c.y) / ry;
                nx * nx + ny * ny <= 1.0
            }
        }
    }
}
