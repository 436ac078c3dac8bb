use log::debug;

use salon_core::geometry::{Point, Rect, Size};
use salon_core::object::{ObjectId, SceneObject};
use salon_core::scene::Scene;

use crate::config::OptimizerConfig;
use crate::culling::ViewportCuller;
use crate::dirty::DirtyRegionTracker;
use crate::frame_timer::{FrameReport, FrameTimer};

/// Per-session render optimization state for one canvas.
///
/// The editor reports every mutation here before the next paint; the paint
/// handler then asks for the visible set and the dirty rectangles.
#[derive(Debug)]
pub struct RenderOptimizer {
    config: OptimizerConfig,
    culler: ViewportCuller,
    dirty: DirtyRegionTracker,
    timer: FrameTimer,
}

impl RenderOptimizer {
    pub fn new(viewport: Rect) -> Self {
        Self::with_config(viewport, OptimizerConfig::default())
    }

    pub fn with_config(viewport: Rect, config: OptimizerConfig) -> Self {
        Self {
            culler: ViewportCuller::with_config(viewport, config.quadtree(), config.cull_threshold),
            dirty: DirtyRegionTracker::new(viewport),
            timer: FrameTimer::new(config.sample_window)
                .with_thresholds(config.good_fps, config.acceptable_fps),
            config,
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Index every object in `scene`, replacing whatever was indexed.
    pub fn load_scene(&mut self, scene: &Scene) {
        self.culler.build_index(scene.objects());
        self.dirty.add_region(self.culler.viewport());
    }

    /// Resize the canvas. The index is rebuilt from `scene` so objects
    /// outside the previous viewport stay addressable.
    pub fn set_viewport(&mut self, viewport: Rect, scene: &Scene) {
        if viewport == self.culler.viewport() {
            return;
        }
        debug!("Canvas resized to {:?}", viewport);
        self.culler.reset_viewport(viewport, scene.objects());
        self.dirty.set_canvas_bounds(viewport);
        self.dirty.add_region(viewport);
    }

    pub fn viewport(&self) -> Rect {
        self.culler.viewport()
    }

    // ── Visibility ──────────────────────────────────────────────────

    /// Objects intersecting `region`, each at most once.
    ///
    /// Small scenes are scanned linearly; above the cull threshold the
    /// quadtree is queried instead.
    pub fn visible_objects<'s>(&self, region: &Rect, scene: &'s Scene) -> Vec<&'s SceneObject> {
        if self.culler.should_cull() {
            self.culler
                .visible(region)
                .iter()
                .filter_map(|id| scene.get(id))
                .collect()
        } else {
            scene
                .objects()
                .filter(|obj| obj.bbox().intersects(region))
                .collect()
        }
    }

    pub fn visible_ids(&self, region: &Rect) -> Vec<ObjectId> {
        self.culler.visible(region)
    }

    pub fn is_visible(&self, obj: &SceneObject) -> bool {
        self.culler.is_visible(obj)
    }

    pub fn should_cull(&self) -> bool {
        self.culler.should_cull()
    }

    pub fn object_count(&self) -> usize {
        self.culler.object_count()
    }

    // ── Index maintenance ───────────────────────────────────────────

    pub fn on_object_added(&mut self, obj: &SceneObject) {
        self.culler.add(obj);
        self.dirty.add_object_region(obj, self.config.dirty_padding);
    }

    pub fn on_object_removed(&mut self, obj: &SceneObject) -> bool {
        let removed = self.culler.remove(obj);
        self.dirty.add_object_region(obj, self.config.dirty_padding);
        removed
    }

    /// `obj` already carries its new position.
    pub fn on_object_moved(&mut self, obj: &SceneObject, old_position: Point) {
        self.culler.update(obj);
        self.dirty
            .add_moved_regions(obj, old_position, self.config.dirty_padding);
    }

    /// `obj` already carries its new size.
    pub fn on_object_resized(&mut self, obj: &SceneObject, old_size: Size) {
        self.culler.update(obj);
        self.dirty
            .add_resized_regions(obj, old_size, self.config.dirty_padding);
    }

    // ── Dirty regions ───────────────────────────────────────────────

    pub fn mark_dirty(&mut self, region: Rect) {
        self.dirty.add_region(region);
    }

    /// Mark an object for repaint without touching the index, e.g. after a
    /// selection or style change.
    pub fn mark_object_dirty(&mut self, obj: &SceneObject) {
        self.dirty.add_object_region(obj, self.config.dirty_padding);
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty.add_region(self.culler.viewport());
    }

    pub fn has_dirty(&self) -> bool {
        self.dirty.has_dirty()
    }

    /// Merged rectangles to repaint this frame.
    pub fn dirty_regions(&mut self) -> Vec<Rect> {
        self.dirty.optimize();
        self.dirty.regions().to_vec()
    }

    pub fn dirty_bounds(&self) -> Option<Rect> {
        self.dirty.union_rect()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    // ── Diagnostics ─────────────────────────────────────────────────

    pub fn begin_frame(&mut self) {
        self.timer.begin_frame();
    }

    pub fn begin_render(&mut self) {
        self.timer.begin_render();
    }

    pub fn end_render(&mut self) {
        self.timer.end_render();
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut FrameTimer {
        &mut self.timer
    }

    pub fn frame_report(&self) -> FrameReport {
        self.timer.report()
    }

    /// Forget indexed objects, pending repaints, and timing samples.
    pub fn clear(&mut self) {
        self.culler.clear();
        self.dirty.clear();
        self.timer.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::{Duration, Instant};

    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn canvas() -> Rect {
        Rect::new(0.0, 0.0, 1000.0, 800.0)
    }

    fn banquet_hall(tables: usize) -> Scene {
        (0..tables)
            .map(|i| {
                let col = (i % 12) as f64;
                let row = (i / 12) as f64;
                if i % 3 == 0 {
                    SceneObject::ellipse(col * 80.0 + 10.0, row * 90.0 + 10.0, 60.0, 60.0)
                } else {
                    SceneObject::rect(col * 80.0 + 10.0, row * 90.0 + 10.0, 60.0, 40.0)
                }
            })
            .collect()
    }

    fn ids<'a>(objects: impl IntoIterator<Item = &'a SceneObject>) -> HashSet<ObjectId> {
        objects.into_iter().map(|o| o.id).collect()
    }

    #[test]
    fn test_linear_scan_and_index_agree() {
        init_logging();
        let region = Rect::new(150.0, 120.0, 420.0, 300.0);

        let small = banquet_hall(30);
        let mut optimizer = RenderOptimizer::new(canvas());
        optimizer.load_scene(&small);
        assert!(!optimizer.should_cull());
        let scanned = ids(optimizer.visible_objects(&region, &small));
        let indexed: HashSet<ObjectId> = optimizer.visible_ids(&region).into_iter().collect();
        assert_eq!(scanned, indexed);

        let large = banquet_hall(96);
        optimizer.load_scene(&large);
        assert!(optimizer.should_cull());
        let culled = optimizer.visible_objects(&region, &large);
        let expected = ids(large.objects().filter(|o| o.bbox().intersects(&region)));
        assert_eq!(culled.len(), expected.len());
        assert_eq!(ids(culled), expected);
    }

    #[test]
    fn test_move_scenario() {
        init_logging();
        let mut scene = Scene::new();
        let mut optimizer = RenderOptimizer::new(canvas());

        let table = SceneObject::rect(100.0, 100.0, 80.0, 80.0);
        let id = scene.add(table.clone());
        optimizer.on_object_added(&table);
        assert!(optimizer
            .visible_ids(&Rect::new(0.0, 0.0, 1000.0, 800.0))
            .contains(&id));
        optimizer.clear_dirty();

        let obj = scene.get_mut(&id).unwrap();
        let old = obj.position;
        obj.move_to(500.0, 500.0);
        let moved = obj.clone();
        optimizer.on_object_moved(&moved, old);

        assert!(!optimizer
            .visible_ids(&Rect::new(90.0, 90.0, 100.0, 100.0))
            .contains(&id));
        assert!(optimizer
            .visible_ids(&Rect::new(490.0, 490.0, 100.0, 100.0))
            .contains(&id));

        let dirty = optimizer.dirty_regions();
        assert_eq!(
            dirty,
            vec![
                Rect::new(90.0, 90.0, 100.0, 100.0),
                Rect::new(490.0, 490.0, 100.0, 100.0),
            ]
        );
        optimizer.clear_dirty();
        assert!(!optimizer.has_dirty());
    }

    #[test]
    fn test_resize_and_remove_mark_dirty() {
        let mut scene = Scene::new();
        let mut optimizer = RenderOptimizer::new(canvas());
        let mut wall = SceneObject::rect(200.0, 50.0, 300.0, 10.0);
        scene.add(wall.clone());
        optimizer.on_object_added(&wall);
        optimizer.clear_dirty();

        let old = wall.size;
        wall.resize(300.0, 40.0);
        optimizer.on_object_resized(&wall, old);
        assert_eq!(
            optimizer.dirty_regions(),
            vec![Rect::new(190.0, 40.0, 320.0, 60.0)]
        );
        assert!(optimizer
            .visible_ids(&Rect::new(250.0, 80.0, 10.0, 5.0))
            .contains(&wall.id));

        optimizer.clear_dirty();
        assert!(optimizer.on_object_removed(&wall));
        assert!(!optimizer.on_object_removed(&wall));
        assert_eq!(optimizer.object_count(), 0);
        assert_eq!(optimizer.dirty_bounds(), Some(Rect::new(190.0, 40.0, 320.0, 60.0)));
    }

    #[test]
    fn test_viewport_change_keeps_offscreen_objects() {
        let scene = banquet_hall(96);
        let mut optimizer = RenderOptimizer::new(Rect::new(0.0, 0.0, 400.0, 300.0));
        optimizer.load_scene(&scene);
        optimizer.clear_dirty();

        optimizer.set_viewport(canvas(), &scene);
        assert_eq!(optimizer.object_count(), 96);
        assert_eq!(optimizer.viewport(), canvas());
        assert_eq!(optimizer.dirty_regions(), vec![canvas()]);

        let visible = optimizer.visible_objects(&canvas(), &scene);
        assert_eq!(visible.len(), 96);
    }

    #[test]
    fn test_offscreen_region_same_for_scan_and_index() {
        init_logging();
        let scene = banquet_hall(60);
        let region = Rect::new(800.0, 0.0, 200.0, 100.0);
        let expected = ids(scene.objects().filter(|o| o.bbox().intersects(&region)));
        assert!(!expected.is_empty());

        let small_viewport = Rect::new(0.0, 0.0, 400.0, 300.0);
        let mut culled = RenderOptimizer::new(small_viewport);
        culled.load_scene(&scene);
        assert!(culled.should_cull());
        assert_eq!(ids(culled.visible_objects(&region, &scene)), expected);

        let config = OptimizerConfig {
            cull_threshold: 1000,
            ..OptimizerConfig::default()
        };
        let mut scanned = RenderOptimizer::with_config(small_viewport, config);
        scanned.load_scene(&scene);
        assert!(!scanned.should_cull());
        assert_eq!(ids(scanned.visible_objects(&region, &scene)), expected);
    }

    #[test]
    fn test_frame_report() {
        let mut optimizer = RenderOptimizer::new(canvas());
        let start = Instant::now();
        let timer = optimizer.timer_mut();
        for i in 0..10u32 {
            let t = start + Duration::from_millis(30) * i;
            timer.begin_frame_at(t);
            timer.begin_render_at(t);
            timer.end_render_at(t + Duration::from_millis(5));
        }

        let report = optimizer.frame_report();
        assert_eq!(report.total_frames, 10);
        assert!((report.avg_fps - 1000.0 / 30.0).abs() < 1e-6);
        assert!((report.avg_render_ms - 5.0).abs() < 1e-9);
        assert!(optimizer.timer().is_acceptable());

        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["total_frames"], 10);

        optimizer.clear();
        assert_eq!(optimizer.frame_report().total_frames, 0);
    }

    #[test]
    fn test_custom_config() {
        let config = OptimizerConfig::from_json(
            r#"{ "cull_threshold": 5, "dirty_padding": 0.0, "max_objects_per_node": 2 }"#,
        )
        .unwrap();
        let scene = banquet_hall(12);
        let mut optimizer = RenderOptimizer::with_config(canvas(), config);
        optimizer.load_scene(&scene);
        optimizer.clear_dirty();
        assert!(optimizer.should_cull());

        let obj = scene.objects().next().unwrap();
        optimizer.mark_object_dirty(obj);
        assert_eq!(optimizer.dirty_regions(), vec![obj.bbox()]);
    }
}
