//! Which find is focused, kept consistent with the filtered set.
//!
//! A selection is only ever a member of the current filtered set. Selecting
//! something outside it is ignored; a filter change that drops the selected
//! find clears the selection on its own.

use std::collections::HashMap;

use dewmap_common::{FindId, GeoPoint};
use tokio::sync::watch;
use tracing::debug;

use crate::camera::{CameraFeed, CameraTransition, Viewport, FLY_DURATION, MIN_DETAIL_ZOOM};
use crate::decluster::PlacedFind;

pub struct SelectionController {
    selected: Option<FindId>,
    /// Render positions of the current filtered set.
    visible: HashMap<FindId, GeoPoint>,
    viewport: Viewport,
    seq: u64,
    camera: watch::Sender<Option<CameraTransition>>,
}

impl SelectionController {
    /// Create a controller and the feed a `CameraAnimator` should follow.
    pub fn new(viewport: Viewport) -> (Self, CameraFeed) {
        let (camera, feed) = watch::channel(None);
        let controller = Self {
            selected: None,
            visible: HashMap::new(),
            viewport,
            seq: 0,
            camera,
        };
        (controller, feed)
    }

    pub fn selected(&self) -> Option<&FindId> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, id: &FindId) -> bool {
        self.selected.as_ref() == Some(id)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Focus `id` and fly the camera to its marker. Returns the transition
    /// that was published, or `None` when `id` is not in the filtered set.
    pub fn select(&mut self, id: &FindId) -> Option<CameraTransition> {
        let Some(&render) = self.visible.get(id) else {
            debug!(find_id = %id, "Ignoring selection outside filtered set");
            return None;
        };

        self.seq += 1;
        let target = Viewport::new(render, self.viewport.zoom.max(MIN_DETAIL_ZOOM));
        let transition = CameraTransition {
            seq: self.seq,
            find_id: id.clone(),
            target,
            duration: FLY_DURATION,
        };

        self.selected = Some(id.clone());
        self.viewport = target;
        self.camera.send_replace(Some(transition.clone()));
        Some(transition)
    }

    /// Drop the selection, closing its popup.
    pub fn clear(&mut self) {
        if self.selected.take().is_some() {
            self.camera.send_replace(None);
        }
    }

    /// Record a camera move made outside a selection (user pan or zoom).
    pub fn on_viewport_changed(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Adopt a new filtered set. Returns `true` when the selection was
    /// cleared because its find is no longer in the set.
    pub fn on_filter_changed(&mut self, placed: &[PlacedFind]) -> bool {
        self.visible = placed
            .iter()
            .map(|p| (p.find.id.clone(), p.render))
            .collect();

        let dropped = self
            .selected
            .as_ref()
            .is_some_and(|id| !self.visible.contains_key(id));
        if dropped {
            debug!("Selected find filtered out, clearing selection");
            self.clear();
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::DEFAULT_VIEWPORT;
    use crate::decluster::decluster;
    use crate::filter::filter_finds;
    use crate::testing::find_at;
    use dewmap_common::Find;

    fn scenario_a() -> Vec<Find> {
        vec![
            find_at("1", "Code Red", 40.0, -75.0),
            find_at("2", "Baja Blast", 40.0, -75.0),
        ]
    }

    #[test]
    fn selecting_absent_id_is_a_no_op() {
        let (mut sel, feed) = SelectionController::new(DEFAULT_VIEWPORT);
        sel.on_filter_changed(&decluster(&scenario_a()));

        assert!(sel.select(&FindId::from("99")).is_none());
        assert!(sel.selected().is_none());
        assert!(feed.borrow().is_none());

        sel.select(&FindId::from("1"));
        assert!(sel.select(&FindId::from("99")).is_none());
        assert_eq!(sel.selected(), Some(&FindId::from("1")));
    }

    #[test]
    fn select_targets_render_position_at_detail_zoom() {
        let (mut sel, feed) = SelectionController::new(DEFAULT_VIEWPORT);
        let placed = decluster(&scenario_a());
        sel.on_filter_changed(&placed);

        let t = sel.select(&FindId::from("2")).unwrap();
        assert_eq!(t.target.center, placed[1].render);
        assert_eq!(t.target.zoom, MIN_DETAIL_ZOOM);
        assert_eq!(feed.borrow().as_ref(), Some(&t));
    }

    #[test]
    fn zoom_never_decreases_on_select() {
        let (mut sel, _feed) = SelectionController::new(DEFAULT_VIEWPORT);
        sel.on_filter_changed(&decluster(&scenario_a()));
        sel.on_viewport_changed(Viewport::new(GeoPoint::new(40.0, -75.0), 17.0));

        let t = sel.select(&FindId::from("1")).unwrap();
        assert_eq!(t.target.zoom, 17.0);
    }

    #[test]
    fn later_selection_replaces_published_transition() {
        let (mut sel, feed) = SelectionController::new(DEFAULT_VIEWPORT);
        sel.on_filter_changed(&decluster(&scenario_a()));

        let first = sel.select(&FindId::from("1")).unwrap();
        let second = sel.select(&FindId::from("2")).unwrap();
        assert!(second.seq > first.seq);
        assert_eq!(feed.borrow().as_ref().map(|t| t.seq), Some(second.seq));
    }

    #[test]
    fn narrowing_filter_clears_dropped_selection() {
        let finds = scenario_a();
        let (mut sel, feed) = SelectionController::new(DEFAULT_VIEWPORT);
        sel.on_filter_changed(&decluster(&finds));
        sel.select(&FindId::from("1"));

        let narrowed = filter_finds("baja", &finds);
        assert!(sel.on_filter_changed(&decluster(&narrowed)));
        assert!(sel.selected().is_none());
        assert!(feed.borrow().is_none());
    }

    #[test]
    fn selection_survives_filter_that_keeps_it() {
        let finds = scenario_a();
        let (mut sel, _feed) = SelectionController::new(DEFAULT_VIEWPORT);
        sel.on_filter_changed(&decluster(&finds));
        sel.select(&FindId::from("2"));

        assert!(!sel.on_filter_changed(&decluster(&filter_finds("baja", &finds))));
        assert!(sel.is_selected(&FindId::from("2")));
    }
}
