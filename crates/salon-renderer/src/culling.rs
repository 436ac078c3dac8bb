use std::collections::HashSet;

use log::{debug, trace};

use salon_core::geometry::Rect;
use salon_core::object::{ObjectId, SceneObject};
use salon_core::spatial::{QuadTreeConfig, SpatialEntry, SpatialIndex};

use crate::config::DEFAULT_CULL_THRESHOLD;

/// Viewport culling over a quadtree rooted at the visible area.
///
/// The index root always equals the viewport, so subdivision granularity
/// tracks what is on screen. Changing the viewport rebuilds the tree.
#[derive(Debug)]
pub struct ViewportCuller {
    index: SpatialIndex,
    viewport: Rect,
    /// Ids currently in the index; its size is the object count.
    members: HashSet<ObjectId>,
    cull_threshold: usize,
}

impl ViewportCuller {
    /// Create an empty culler with the default limits and threshold.
    pub fn new(viewport: Rect) -> Self {
        Self::with_config(viewport, QuadTreeConfig::default(), DEFAULT_CULL_THRESHOLD)
    }

    /// Create an empty culler with custom quadtree limits and threshold.
    pub fn with_config(viewport: Rect, config: QuadTreeConfig, cull_threshold: usize) -> Self {
        Self {
            index: SpatialIndex::with_config(viewport, config),
            viewport,
            members: HashSet::new(),
            cull_threshold,
        }
    }

    /// Drop the current index and insert `objects` from scratch.
    pub fn build_index<'a>(&mut self, objects: impl IntoIterator<Item = &'a SceneObject>) {
        self.clear();
        for obj in objects {
            self.add(obj);
        }
        debug!("Built culling index with {} objects", self.object_count());
    }

    /// Alias of [`build_index`](Self::build_index).
    pub fn rebuild<'a>(&mut self, objects: impl IntoIterator<Item = &'a SceneObject>) {
        self.build_index(objects);
    }

    /// Index a new object. Adding an object that is already indexed
    /// replaces its entry instead of duplicating it.
    pub fn add(&mut self, obj: &SceneObject) {
        if self.members.insert(obj.id) {
            self.index.insert(obj);
        } else {
            trace!("Object {} was already indexed; refiled", obj.id);
            self.index.update(obj);
        }
    }

    /// Drop `obj` from the index, returning whether it was indexed.
    pub fn remove(&mut self, obj: &SceneObject) -> bool {
        if !self.members.remove(&obj.id) {
            return false;
        }
        self.index.remove(obj)
    }

    /// Re-file an object after its position or size changed. An object
    /// that was never indexed is added.
    pub fn update(&mut self, obj: &SceneObject) {
        if self.members.insert(obj.id) {
            self.index.insert(obj);
        } else {
            self.index.update(obj);
        }
    }

    /// Move the viewport, rerooting the index at the new rectangle.
    ///
    /// Only entries intersecting the old viewport are carried over; anything
    /// outside it drops out until the next full rebuild. Returns whether the
    /// viewport actually changed.
    pub fn set_viewport(&mut self, viewport: Rect) -> bool {
        if viewport == self.viewport {
            return false;
        }

        let carried: Vec<SpatialEntry> = self
            .index
            .query(&self.viewport)
            .into_iter()
            .cloned()
            .collect();

        let mut index = SpatialIndex::with_config(viewport, self.index.config());
        let mut members = HashSet::with_capacity(carried.len());
        for entry in carried {
            members.insert(entry.id);
            index.insert_entry(entry);
        }

        debug!(
            "Viewport changed to {:?}; reindexed {} objects ({} dropped)",
            viewport,
            members.len(),
            self.members.len().saturating_sub(members.len())
        );

        self.index = index;
        self.viewport = viewport;
        self.members = members;
        true
    }

    /// Move the viewport and rebuild from an authoritative object list, so
    /// nothing that left the old viewport is lost.
    pub fn reset_viewport<'a>(
        &mut self,
        viewport: Rect,
        objects: impl IntoIterator<Item = &'a SceneObject>,
    ) {
        self.viewport = viewport;
        self.index = SpatialIndex::with_config(viewport, self.index.config());
        self.build_index(objects);
    }

    /// Ids of indexed objects intersecting `region`.
    pub fn visible(&self, region: &Rect) -> Vec<ObjectId> {
        self.index.query_ids(region)
    }

    /// Ids of indexed objects intersecting the viewport.
    pub fn visible_in_viewport(&self) -> Vec<ObjectId> {
        self.visible(&self.viewport)
    }

    /// Whether `obj`'s current box intersects the viewport. Does not consult
    /// the index.
    pub fn is_visible(&self, obj: &SceneObject) -> bool {
        self.viewport.intersects(&obj.bbox())
    }

    /// Whether the scene is large enough that an indexed query beats a
    /// linear scan.
    pub fn should_cull(&self) -> bool {
        self.object_count() > self.cull_threshold
    }

    /// Current viewport, which is also the index root.
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Number of distinct objects in the index.
    pub fn object_count(&self) -> usize {
        self.members.len()
    }

    /// The underlying quadtree.
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Forget every indexed object, keeping the viewport.
    pub fn clear(&mut self) {
        self.index.clear();
        self.members.clear();
    }
}
