use log::trace;

use salon_core::geometry::{Point, Rect, Size};
use salon_core::object::SceneObject;

pub use crate::config::DEFAULT_DIRTY_PADDING as DEFAULT_PADDING;

/// Screen areas that need repainting since the last clear.
///
/// Every stored rectangle is clipped to the canvas and non-empty. The set is
/// conservative: its union covers everything that changed, possibly more.
#[derive(Debug, Clone)]
pub struct DirtyRegionTracker {
    canvas: Rect,
    regions: Vec<Rect>,
}

impl DirtyRegionTracker {
    pub fn new(canvas: Rect) -> Self {
        Self {
            canvas,
            regions: Vec::new(),
        }
    }

    /// Change the clip rectangle. Regions already recorded are left as-is.
    pub fn set_canvas_bounds(&mut self, canvas: Rect) {
        self.canvas = canvas;
    }

    pub fn canvas_bounds(&self) -> Rect {
        self.canvas
    }

    pub fn add_region(&mut self, region: Rect) {
        if let Some(clipped) = region.intersection(&self.canvas) {
            self.regions.push(clipped);
        } else {
            trace!("Dropping dirty region {:?} outside canvas", region);
        }
    }

    /// Mark an object's footprint, grown by `padding` for selection handles.
    pub fn add_object_region(&mut self, obj: &SceneObject, padding: f64) {
        self.add_region(obj.bbox().inflate(padding));
    }

    /// Mark both the vacated and the newly occupied footprint of a move.
    pub fn add_moved_regions(&mut self, obj: &SceneObject, old_position: Point, padding: f64) {
        self.add_region(Rect::from_origin_size(old_position, obj.size).inflate(padding));
        self.add_object_region(obj, padding);
    }

    /// Mark both the old and the new footprint of a resize.
    pub fn add_resized_regions(&mut self, obj: &SceneObject, old_size: Size, padding: f64) {
        self.add_region(Rect::from_origin_size(obj.position, old_size).inflate(padding));
        self.add_object_region(obj, padding);
    }

    /// Merge overlapping rectangles in a single greedy pass.
    ///
    /// Each rectangle is folded into the first already-kept rectangle it
    /// intersects. A merge that grows a kept rectangle does not trigger a
    /// second look at earlier ones, so the result is not a minimal cover.
    pub fn optimize(&mut self) {
        if self.regions.len() <= 1 {
            return;
        }

        let before = self.regions.len();
        let mut merged: Vec<Rect> = Vec::with_capacity(before);
        for rect in self.regions.drain(..) {
            match merged.iter_mut().find(|kept| rect.intersects(kept)) {
                Some(kept) => *kept = kept.union(&rect),
                None => merged.push(rect),
            }
        }
        self.regions = merged;

        trace!("Merged {} dirty regions into {}", before, self.regions.len());
    }

    pub fn regions(&self) -> &[Rect] {
        &self.regions
    }

    /// Single rectangle covering every dirty region.
    pub fn union_rect(&self) -> Option<Rect> {
        let mut it = self.regions.iter();
        let first = *it.next()?;
        Some(it.fold(first, |acc, r| acc.union(r)))
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn has_dirty(&self) -> bool {
        !self.regions.is_empty()
    }

    pub fn count(&self) -> usize {
        self.regions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Rect {
        Rect::new(0.0, 0.0, 1000.0, 800.0)
    }

    /// Area of the union of `rects`, by coordinate compression.
    fn union_area(rects: &[Rect]) -> f64 {
        let mut xs: Vec<f64> = rects.iter().flat_map(|r| [r.x, r.right()]).collect();
        let mut ys: Vec<f64> = rects.iter().flat_map(|r| [r.y, r.bottom()]).collect();
        xs.sort_by(f64::total_cmp);
        ys.sort_by(f64::total_cmp);
        xs.dedup();
        ys.dedup();

        let mut area = 0.0;
        for xw in xs.windows(2) {
            for yw in ys.windows(2) {
                let cell = Rect::new(xw[0], yw[0], xw[1] - xw[0], yw[1] - yw[0]);
                if rects.iter().any(|r| r.contains_rect(&cell)) {
                    area += cell.area();
                }
            }
        }
        area
    }

    fn covered_by(target: &Rect, rects: &[Rect]) -> bool {
        let clipped: Vec<Rect> = rects.iter().filter_map(|r| r.intersection(target)).collect();
        (union_area(&clipped) - target.area()).abs() < 1e-9
    }

    #[test]
    fn test_regions_are_clipped_and_empty_dropped() {
        let mut tracker = DirtyRegionTracker::new(canvas());
        tracker.add_region(Rect::new(-20.0, -20.0, 50.0, 50.0));
        tracker.add_region(Rect::new(10.0, 10.0, 0.0, 40.0));
        tracker.add_region(Rect::new(2000.0, 10.0, 40.0, 40.0));

        assert_eq!(tracker.regions(), &[Rect::new(0.0, 0.0, 30.0, 30.0)]);
        assert_eq!(tracker.count(), 1);
        assert!(tracker.has_dirty());
    }

    #[test]
    fn test_object_region_is_padded() {
        let mut tracker = DirtyRegionTracker::new(canvas());
        let obj = SceneObject::rect(100.0, 100.0, 80.0, 80.0);
        tracker.add_object_region(&obj, DEFAULT_PADDING);
        assert_eq!(tracker.regions(), &[Rect::new(90.0, 90.0, 100.0, 100.0)]);
    }

    #[test]
    fn test_moved_object_covers_both_footprints() {
        let mut tracker = DirtyRegionTracker::new(canvas());
        let mut obj = SceneObject::rect(100.0, 100.0, 80.0, 80.0);
        let old = obj.position;
        obj.move_to(150.0, 130.0);

        tracker.add_moved_regions(&obj, old, 10.0);
        assert_eq!(tracker.count(), 2);
        tracker.optimize();
        assert_eq!(tracker.count(), 1);

        let before = Rect::new(90.0, 90.0, 100.0, 100.0);
        let after = Rect::new(140.0, 120.0, 100.0, 100.0);
        assert!(covered_by(&before, tracker.regions()));
        assert!(covered_by(&after, tracker.regions()));
    }

    #[test]
    fn test_far_move_keeps_two_regions() {
        let mut tracker = DirtyRegionTracker::new(canvas());
        let mut obj = SceneObject::ellipse(100.0, 100.0, 80.0, 80.0);
        let old = obj.position;
        obj.move_to(600.0, 500.0);

        tracker.add_moved_regions(&obj, old, 10.0);
        tracker.optimize();
        assert_eq!(tracker.count(), 2);
        assert!(covered_by(&Rect::new(90.0, 90.0, 100.0, 100.0), tracker.regions()));
        assert!(covered_by(&Rect::new(590.0, 490.0, 100.0, 100.0), tracker.regions()));
    }

    #[test]
    fn test_resized_object_covers_both_footprints() {
        let mut tracker = DirtyRegionTracker::new(canvas());
        let mut obj = SceneObject::rect(100.0, 100.0, 80.0, 80.0);
        let old = obj.size;
        obj.resize(40.0, 200.0);

        tracker.add_resized_regions(&obj, old, 5.0);
        assert_eq!(
            tracker.regions(),
            &[
                Rect::new(95.0, 95.0, 90.0, 90.0),
                Rect::new(95.0, 95.0, 50.0, 210.0),
            ]
        );
    }

    #[test]
    fn test_optimize_is_single_pass() {
        let mut tracker = DirtyRegionTracker::new(canvas());
        // `c` bridges `a` and `b` only after it has been merged into `a`;
        // the pass does not go back to fold `b` in.
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 0.0, 10.0, 10.0);
        let c = Rect::new(5.0, 0.0, 20.0, 10.0);
        tracker.add_region(a);
        tracker.add_region(b);
        tracker.add_region(c);

        tracker.optimize();
        assert_eq!(
            tracker.regions(),
            &[Rect::new(0.0, 0.0, 25.0, 10.0), Rect::new(20.0, 0.0, 10.0, 10.0)]
        );
    }

    #[test]
    fn test_optimize_never_loses_coverage() {
        let mut tracker = DirtyRegionTracker::new(canvas());
        let input = [
            Rect::new(10.0, 10.0, 50.0, 50.0),
            Rect::new(40.0, 40.0, 50.0, 50.0),
            Rect::new(300.0, 300.0, 20.0, 20.0),
            Rect::new(85.0, 85.0, 30.0, 10.0),
            Rect::new(310.0, 290.0, 5.0, 50.0),
            Rect::new(700.0, 10.0, 10.0, 10.0),
        ];
        for r in input {
            tracker.add_region(r);
        }

        let before_count = tracker.count();
        let before_area = union_area(tracker.regions());
        tracker.optimize();

        assert!(tracker.count() <= before_count);
        assert!(union_area(tracker.regions()) >= before_area - 1e-9);
        for r in &input {
            assert!(covered_by(r, tracker.regions()));
        }
    }

    #[test]
    fn test_union_and_clear() {
        let mut tracker = DirtyRegionTracker::new(canvas());
        assert_eq!(tracker.union_rect(), None);
        tracker.add_region(Rect::new(10.0, 10.0, 10.0, 10.0));
        tracker.add_region(Rect::new(50.0, 40.0, 10.0, 10.0));
        assert_eq!(tracker.union_rect(), Some(Rect::new(10.0, 10.0, 50.0, 40.0)));

        tracker.clear();
        assert!(!tracker.has_dirty());
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn test_degenerate_canvas_drops_everything() {
        let mut tracker = DirtyRegionTracker::new(Rect::new(0.0, 0.0, 0.0, 0.0));
        tracker.add_region(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(!tracker.has_dirty());

        tracker.set_canvas_bounds(canvas());
        tracker.add_region(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(tracker.count(), 1);
    }
}
