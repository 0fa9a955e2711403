//! The public map view: loaded finds, search box, markers, sidebar and
//! selection, composed into one owned state object.
//!
//! Loads are the only I/O. Everything else (filtered set, marker positions,
//! aggregates, selection validity) is derived synchronously in `recompute`
//! whenever an input changes.

use std::sync::Arc;

use dewmap_client::{validate_new_find, ClientError, Result};
use dewmap_common::{Find, FindId, FlavorList, NewFind};
use tracing::{info, warn};

use crate::aggregate::Summary;
use crate::camera::{CameraFeed, CameraTransition, Viewport};
use crate::decluster::{decluster, PlacedFind};
use crate::filter::{filter_finds, normalize_query};
use crate::format::short_timestamp;
use crate::loader::{DataLoader, LoadOutcome, LoadStatus, Resource};
use crate::selection::SelectionController;
use crate::traits::FindSource;

/// Rows shown under the search box while typing.
pub const SEARCH_PREVIEW_LIMIT: usize = 8;

/// Everything needed to draw the board.
#[derive(Debug, Clone)]
pub struct BoardView {
    pub query: String,
    pub placed: Vec<PlacedFind>,
    pub summary: Summary,
    /// Newest find's short timestamp.
    pub latest_activity: Option<String>,
    /// Empty unless a query is entered.
    pub preview: Vec<Find>,
    /// A query is entered and nothing matches it.
    pub no_match: bool,
    pub selected: Option<FindId>,
    pub status: LoadStatus,
    pub error: Option<String>,
    pub flavors: Arc<FlavorList>,
    pub flavor_error: Option<String>,
    pub submit_error: Option<String>,
}

pub struct MapBoard {
    loader: Arc<DataLoader>,
    query: String,
    filtered: Vec<Find>,
    placed: Vec<PlacedFind>,
    summary: Summary,
    selection: SelectionController,
    submit_error: Option<String>,
}

impl MapBoard {
    pub fn new(source: Arc<dyn FindSource>) -> (Self, CameraFeed) {
        let (selection, feed) = SelectionController::new(Viewport::default());
        let board = Self {
            loader: Arc::new(DataLoader::new(source)),
            query: String::new(),
            filtered: Vec::new(),
            placed: Vec::new(),
            summary: Summary::of::<Find>(&[]),
            selection,
            submit_error: None,
        };
        (board, feed)
    }

    /// Shared handle for issuing loads outside the board; call `sync` after.
    pub fn loader(&self) -> Arc<DataLoader> {
        Arc::clone(&self.loader)
    }

    /// First load: finds and flavors together.
    pub async fn hydrate(&mut self) -> (LoadOutcome, LoadOutcome) {
        let outcomes = tokio::join!(self.loader.load_finds(), self.loader.load_flavors());
        self.recompute();
        outcomes
    }

    pub async fn load(&mut self) -> LoadOutcome {
        let outcome = self.loader.load_finds().await;
        self.recompute();
        outcome
    }

    pub async fn load_flavors(&mut self) -> LoadOutcome {
        self.loader.load_flavors().await
    }

    /// Re-derive from whatever the loader currently holds.
    pub fn sync(&mut self) {
        self.recompute();
    }

    pub fn set_query(&mut self, query: &str) {
        if self.query == query {
            return;
        }
        self.query = query.to_string();
        self.recompute();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn filtered(&self) -> &[Find] {
        &self.filtered
    }

    pub fn placed(&self) -> &[PlacedFind] {
        &self.placed
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn selected(&self) -> Option<&FindId> {
        self.selection.selected()
    }

    pub fn select(&mut self, id: &FindId) -> Option<CameraTransition> {
        self.selection.select(id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn on_viewport_changed(&mut self, viewport: Viewport) {
        self.selection.on_viewport_changed(viewport);
    }

    /// Validate locally, submit, then reset the search and reload.
    ///
    /// Invalid forms never reach the network.
    pub async fn submit(&mut self, new: NewFind) -> Result<Find> {
        let result = self.try_submit(&new).await;
        match &result {
            Ok(find) => {
                info!(find_id = %find.id, flavor = %find.flavor, "Find submitted");
                self.submit_error = None;
                self.query.clear();
                self.selection.clear();
                self.load().await;
            }
            Err(err) => {
                warn!(error = %err, "Find submission rejected");
                self.submit_error = Some(err.to_string());
            }
        }
        result
    }

    async fn try_submit(&self, new: &NewFind) -> Result<Find> {
        let validated = validate_new_find(new).map_err(ClientError::from)?;
        self.loader.source().submit(&validated).await
    }

    /// Cancel outstanding loads. Also done on drop.
    pub fn shutdown(&self) {
        self.loader.shutdown();
    }

    pub fn view(&self) -> BoardView {
        let searching = !normalize_query(&self.query).is_empty();
        BoardView {
            query: self.query.clone(),
            placed: self.placed.clone(),
            summary: self.summary.clone(),
            latest_activity: self.summary.newest().map(short_timestamp),
            preview: if searching {
                self.filtered.iter().take(SEARCH_PREVIEW_LIMIT).cloned().collect()
            } else {
                Vec::new()
            },
            no_match: searching && self.filtered.is_empty(),
            selected: self.selection.selected().cloned(),
            status: self.loader.status(Resource::Finds),
            error: self.loader.error(Resource::Finds),
            flavors: self.loader.flavors(),
            flavor_error: self.loader.error(Resource::Flavors),
            submit_error: self.submit_error.clone(),
        }
    }

    fn recompute(&mut self) {
        let all = self.loader.finds();
        self.filtered = filter_finds(&self.query, all.as_slice());
        self.placed = decluster(&self.filtered);
        self.summary = Summary::of(&self.filtered);
        self.selection.on_filter_changed(&self.placed);
    }
}

impl Drop for MapBoard {
    fn drop(&mut self) {
        self.loader.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{find_at, find_created, MockFindSource};
    use dewmap_common::ImageAttachment;

    fn source() -> Arc<MockFindSource> {
        Arc::new(
            MockFindSource::new()
                .with_finds(vec![
                    find_at("1", "Code Red", 40.0, -75.0),
                    find_at("2", "Baja Blast", 40.0, -75.0),
                    find_at("3", "Voltage", 34.0, -118.0),
                ])
                .with_flavors(vec!["Code Red".into(), "Baja Blast".into(), "Voltage".into()]),
        )
    }

    fn form() -> NewFind {
        NewFind {
            flavor: " Voltage ".to_string(),
            size: "12oz".to_string(),
            location_name: "Corner Mart".to_string(),
            address: "1 Elm St".to_string(),
            image_url: Some("   ".to_string()),
            image: None,
        }
    }

    #[tokio::test]
    async fn hydrate_populates_view() {
        let (mut board, _feed) = MapBoard::new(source());
        board.hydrate().await;

        let view = board.view();
        assert_eq!(view.status, LoadStatus::Idle);
        assert_eq!(view.summary.total, 3);
        assert_eq!(view.summary.flavor_count, 3);
        assert_eq!(view.flavors.len(), 3);
        assert!(view.preview.is_empty());
        assert!(!view.no_match);
        assert!(view.latest_activity.is_some());
    }

    #[tokio::test]
    async fn query_drives_preview_and_summary() {
        let (mut board, _feed) = MapBoard::new(source());
        board.load().await;

        board.set_query("  BAJA ");
        let view = board.view();
        assert_eq!(view.summary.total, 1);
        assert_eq!(view.preview.len(), 1);
        assert_eq!(view.preview[0].id, FindId::from("2"));

        board.set_query("dr pepper");
        let view = board.view();
        assert!(view.no_match);
        assert!(view.placed.is_empty());
    }

    #[tokio::test]
    async fn preview_is_capped() {
        let finds = (0..12)
            .map(|i| find_at(&i.to_string(), "Code Red", i as f64, 0.0))
            .collect();
        let (mut board, _feed) = MapBoard::new(Arc::new(MockFindSource::new().with_finds(finds)));
        board.load().await;
        board.set_query("code");
        assert_eq!(board.view().preview.len(), SEARCH_PREVIEW_LIMIT);
    }

    #[tokio::test]
    async fn latest_activity_uses_newest_find() {
        let source = MockFindSource::new().with_finds(vec![
            find_created("old", "Code Red", "2026-01-04T10:00:00Z"),
            find_created("new", "Voltage", "2026-01-05T15:04:00Z"),
        ]);
        let (mut board, _feed) = MapBoard::new(Arc::new(source));
        board.load().await;
        assert_eq!(board.view().latest_activity.as_deref(), Some("Jan 5, 3:04 PM"));
    }

    #[tokio::test]
    async fn invalid_submission_never_hits_network() {
        let source = source();
        let (mut board, _feed) = MapBoard::new(source.clone());
        let mut new = form();
        new.image = Some(ImageAttachment {
            file_name: "scan.bmp".to_string(),
            content_type: "image/bmp".to_string(),
            bytes: vec![0; 1024 * 1024],
        });

        let err = board.submit(new).await.unwrap_err();
        assert_eq!(err.to_string(), "only png, jpg, webp, or gif files are allowed");
        assert!(source.submitted().is_empty());
        assert_eq!(source.find_calls(), 0);
        assert_eq!(
            board.view().submit_error.as_deref(),
            Some("only png, jpg, webp, or gif files are allowed")
        );
    }

    #[tokio::test]
    async fn successful_submission_resets_search_and_reloads() {
        let source = source();
        let (mut board, _feed) = MapBoard::new(source.clone());
        board.load().await;
        board.set_query("code");
        board.select(&FindId::from("1"));

        let created = board.submit(form()).await.unwrap();
        assert_eq!(created.flavor, "Voltage");
        assert_eq!(source.submitted()[0].image_url, None);

        assert_eq!(board.query(), "");
        assert!(board.selected().is_none());
        assert_eq!(board.view().summary.total, 4);
        assert_eq!(source.find_calls(), 2);
    }

    #[tokio::test]
    async fn server_rejected_submission_keeps_search_and_selection() {
        let source = source();
        let (mut board, _feed) = MapBoard::new(source.clone());
        board.load().await;
        board.set_query("code");
        board.select(&FindId::from("1"));

        source.fail_submit(ClientError::Api {
            status: 422,
            message: "invalid_flavor".to_string(),
        });
        let err = board.submit(form()).await.unwrap_err();
        assert_eq!(err.status(), Some(422));

        let view = board.view();
        assert_eq!(view.submit_error.as_deref(), Some("invalid_flavor"));
        assert_eq!(view.query, "code");
        assert_eq!(view.summary.total, 1);
        assert_eq!(board.selected(), Some(&FindId::from("1")));
        assert!(source.submitted().is_empty());
        assert_eq!(source.find_calls(), 1);
    }

    #[tokio::test]
    async fn failed_reload_keeps_markers_and_shows_banner() {
        let source = source();
        let (mut board, _feed) = MapBoard::new(source.clone());
        board.load().await;

        source.fail_finds(ClientError::Network("connection refused".to_string()));
        assert_eq!(board.load().await, LoadOutcome::Failed);

        let view = board.view();
        assert_eq!(view.placed.len(), 3);
        assert_eq!(view.status, LoadStatus::Error);
        assert_eq!(view.error.as_deref(), Some("Network error: connection refused"));
    }

    #[tokio::test]
    async fn selection_is_cleared_when_filtered_out() {
        let (mut board, feed) = MapBoard::new(source());
        board.load().await;

        assert!(board.select(&FindId::from("1")).is_some());
        board.set_query("baja");
        assert!(board.selected().is_none());
        assert!(feed.borrow().is_none());
    }
}
