use log::{debug, trace};

use crate::geometry::Rect;
use crate::object::{ObjectId, SceneObject};

/// Entries a node holds before it tries to split.
pub const MAX_OBJECTS_PER_NODE: usize = 10;
/// Deepest level a node may be split to. The root is level 0.
pub const MAX_DEPTH: usize = 5;

/// Subdivision limits for a [`SpatialIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadTreeConfig {
    pub max_objects_per_node: usize,
    pub max_depth: usize,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            max_objects_per_node: MAX_OBJECTS_PER_NODE,
            max_depth: MAX_DEPTH,
        }
    }
}

/// An entry in the quadtree, referencing a scene object by id.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialEntry {
    pub id: ObjectId,
    /// Bounding box as of the last insert or update.
    pub bbox: Rect,
}

impl From<&SceneObject> for SpatialEntry {
    fn from(obj: &SceneObject) -> Self {
        Self {
            id: obj.id,
            bbox: obj.bbox(),
        }
    }
}

/// Shape of the tree, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexStats {
    pub nodes: usize,
    /// Level of the deepest node.
    pub depth: usize,
    pub entries: usize,
}

/// Which child quadrant fully holds `rect`, judged by the midlines of `bounds`.
///
/// Quadrants are numbered 0 = top-right, 1 = top-left, 2 = bottom-left,
/// 3 = bottom-right. Anything touching or crossing a midline gets `None`.
fn quadrant(bounds: &Rect, rect: &Rect) -> Option<usize> {
    let vertical_mid = bounds.x + bounds.width / 2.0;
    let horizontal_mid = bounds.y + bounds.height / 2.0;

    let top = rect.y < horizontal_mid && rect.bottom() < horizontal_mid;
    let bottom = rect.y > horizontal_mid;

    if rect.x < vertical_mid && rect.right() < vertical_mid {
        if top {
            Some(1)
        } else if bottom {
            Some(2)
        } else {
            None
        }
    } else if rect.x > vertical_mid {
        if top {
            Some(0)
        } else if bottom {
            Some(3)
        } else {
            None
        }
    } else {
        None
    }
}

/// Whether `region` can intersect anything [`quadrant`] files under `q`.
///
/// Children own open half-planes, not just their finite bounds: a box
/// beyond the root edge still lands in the child on its side of both
/// midlines.
fn reaches_quadrant(bounds: &Rect, region: &Rect, q: usize) -> bool {
    let vertical_mid = bounds.x + bounds.width / 2.0;
    let horizontal_mid = bounds.y + bounds.height / 2.0;

    let left = region.x < vertical_mid;
    let right = region.right() > vertical_mid;
    let top = region.y < horizontal_mid;
    let bottom = region.bottom() > horizontal_mid;

    match q {
        0 => right && top,
        1 => left && top,
        2 => left && bottom,
        _ => right && bottom,
    }
}

#[derive(Debug)]
struct QuadNode {
    level: usize,
    bounds: Rect,
    entries: Vec<SpatialEntry>,
    children: Option<Box<[QuadNode; 4]>>,
}

impl QuadNode {
    fn new(level: usize, bounds: Rect) -> Self {
        Self {
            level,
            bounds,
            entries: Vec::new(),
            children: None,
        }
    }

    fn split(&mut self) {
        let half_w = self.bounds.width / 2.0;
        let half_h = self.bounds.height / 2.0;
        let Rect { x, y, .. } = self.bounds;
        let level = self.level + 1;

        debug!(
            "Splitting quadtree node at level {} ({} entries)",
            self.level,
            self.entries.len()
        );

        self.children = Some(Box::new([
            QuadNode::new(level, Rect::new(x + half_w, y, half_w, half_h)),
            QuadNode::new(level, Rect::new(x, y, half_w, half_h)),
            QuadNode::new(level, Rect::new(x, y + half_h, half_w, half_h)),
            QuadNode::new(level, Rect::new(x + half_w, y + half_h, half_w, half_h)),
        ]));
    }

    fn insert(&mut self, entry: SpatialEntry, config: &QuadTreeConfig) {
        if let Some(children) = self.children.as_mut() {
            if let Some(q) = quadrant(&self.bounds, &entry.bbox) {
                children[q].insert(entry, config);
                return;
            }
        }

        self.entries.push(entry);

        if self.entries.len() > config.max_objects_per_node && self.level < config.max_depth {
            if self.children.is_none() {
                self.split();
            }
            self.push_down(config);
        }
    }

    /// Move every local entry that fits a single child into it.
    fn push_down(&mut self, config: &QuadTreeConfig) {
        let Some(children) = self.children.as_mut() else {
            return;
        };
        let bounds = self.bounds;
        let mut straddlers = Vec::new();
        for entry in self.entries.drain(..) {
            match quadrant(&bounds, &entry.bbox) {
                Some(q) => children[q].insert(entry, config),
                None => straddlers.push(entry),
            }
        }
        self.entries = straddlers;
    }

    /// Remove the entry for `id`. `hint` is the object's current box and
    /// only steers the search; the entry may have been filed under an
    /// older box.
    fn remove(&mut self, id: ObjectId, hint: &Rect) -> Option<SpatialEntry> {
        if let Some(pos) = self.entries.iter().position(|e| e.id == id) {
            return Some(self.entries.remove(pos));
        }

        let preferred = quadrant(&self.bounds, hint);
        let children = self.children.as_mut()?;

        if let Some(q) = preferred {
            if let Some(found) = children[q].remove(id, hint) {
                return Some(found);
            }
        }

        children
            .iter_mut()
            .enumerate()
            .filter(|(i, _)| Some(*i) != preferred)
            .find_map(|(_, child)| child.remove(id, hint))
    }

    fn query<'a>(&'a self, region: &Rect, out: &mut Vec<&'a SpatialEntry>) {
        if let Some(children) = self.children.as_deref() {
            for (q, child) in children.iter().enumerate() {
                if reaches_quadrant(&self.bounds, region, q) {
                    child.query(region, out);
                }
            }
        }

        // Entries parked here may still miss the region.
        out.extend(self.entries.iter().filter(|e| e.bbox.intersects(region)));
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a SpatialEntry>) {
        out.extend(self.entries.iter());
        if let Some(children) = self.children.as_deref() {
            for child in children {
                child.collect(out);
            }
        }
    }

    fn collect_stats(&self, stats: &mut IndexStats) {
        stats.nodes += 1;
        stats.depth = stats.depth.max(self.level);
        stats.entries += self.entries.len();
        if let Some(children) = self.children.as_deref() {
            for child in children {
                child.collect_stats(stats);
            }
        }
    }
}

/// Quadtree over object bounding boxes, used for viewport culling and
/// region queries.
///
/// The index never observes object geometry on its own: after an object
/// moves or resizes it must be passed to [`SpatialIndex::update`].
#[derive(Debug)]
pub struct SpatialIndex {
    root: QuadNode,
    config: QuadTreeConfig,
    len: usize,
}

impl SpatialIndex {
    /// Create an empty index over `bounds` with the default limits.
    pub fn new(bounds: Rect) -> Self {
        Self::with_config(bounds, QuadTreeConfig::default())
    }

    /// Create an empty index over `bounds` with custom subdivision limits.
    pub fn with_config(bounds: Rect, config: QuadTreeConfig) -> Self {
        Self {
            root: QuadNode::new(0, bounds),
            config,
            len: 0,
        }
    }

    /// Build an index over `objects` in one go.
    pub fn build<'a>(
        bounds: Rect,
        config: QuadTreeConfig,
        objects: impl IntoIterator<Item = &'a SceneObject>,
    ) -> Self {
        let mut index = Self::with_config(bounds, config);
        for obj in objects {
            index.insert(obj);
        }
        index
    }

    /// Root bounds of the tree.
    pub fn bounds(&self) -> Rect {
        self.root.bounds
    }

    /// Subdivision limits in effect.
    pub fn config(&self) -> QuadTreeConfig {
        self.config
    }

    /// Index `obj` under its current bounding box.
    pub fn insert(&mut self, obj: &SceneObject) {
        self.insert_entry(SpatialEntry::from(obj));
    }

    /// Index a prepared entry as-is.
    pub fn insert_entry(&mut self, entry: SpatialEntry) {
        trace!("Indexing object {} at {:?}", entry.id, entry.bbox);
        self.root.insert(entry, &self.config);
        self.len += 1;
    }

    /// Remove `obj`, returning whether it was indexed.
    pub fn remove(&mut self, obj: &SceneObject) -> bool {
        self.remove_entry(obj.id, &obj.bbox()).is_some()
    }

    /// Remove the entry for `id`, searching around `hint` first.
    pub fn remove_entry(&mut self, id: ObjectId, hint: &Rect) -> Option<SpatialEntry> {
        let removed = self.root.remove(id, hint);
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Re-file `obj` under its current bounding box.
    ///
    /// The object is inserted even if it was not indexed before; the return
    /// value tells whether an older entry was replaced.
    pub fn update(&mut self, obj: &SceneObject) -> bool {
        let replaced = self.remove(obj);
        self.insert(obj);
        replaced
    }

    /// Entries whose bounding box intersects `region`.
    pub fn query(&self, region: &Rect) -> Vec<&SpatialEntry> {
        let mut found = Vec::new();
        self.root.query(region, &mut found);
        found
    }

    /// Ids of the entries whose bounding box intersects `region`.
    pub fn query_ids(&self, region: &Rect) -> Vec<ObjectId> {
        self.query(region).into_iter().map(|e| e.id).collect()
    }

    /// Every entry in the tree, regardless of position.
    pub fn entries(&self) -> Vec<&SpatialEntry> {
        let mut all = Vec::with_capacity(self.len);
        self.root.collect(&mut all);
        all
    }

    /// Drop every entry, keeping the root bounds.
    pub fn clear(&mut self) {
        self.root = QuadNode::new(0, self.root.bounds);
        self.len = 0;
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Node count, depth and entry count of the current tree.
    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats::default();
        self.root.collect_stats(&mut stats);
        stats
    }
}
