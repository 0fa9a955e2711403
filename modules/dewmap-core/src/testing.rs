// Test mocks for the client core.
//
// Four mocks matching the trait boundaries:
// - MockFindSource (FindSource): canned responses, call counting
// - GatedSource (FindSource): each finds() call waits on a oneshot gate,
//   so tests decide completion order
// - MockAdminApi (AdminApi): in-memory server with a session flag,
//   injectable failures, held deletes and held pages
// - RecordingSurface (MapSurface): records every camera call
//
// Plus builders for Find fixtures.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dewmap_client::{ClientError, Result};
use dewmap_common::{parse_instant, AdminProfile, Find, FindId, FlavorList, NewFind};
use tokio::sync::oneshot;

use crate::camera::Viewport;
use crate::traits::{AdminApi, FindSource, MapSurface};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_717_243_200, 0).unwrap_or_default()
}

/// Minimal find at a coordinate.
pub fn find_at(id: &str, flavor: &str, lat: f64, lng: f64) -> Find {
    Find {
        id: FindId::from(id),
        flavor: flavor.to_string(),
        size: "20oz".to_string(),
        location_name: format!("Store {id}"),
        address: format!("{id} Main St"),
        latitude: lat,
        longitude: lng,
        created_at: epoch(),
        time_zone: None,
        submitted_by: None,
        image_url: None,
    }
}

/// Find with a specific creation instant (RFC 3339).
pub fn find_created(id: &str, flavor: &str, created_at: &str) -> Find {
    let mut find = find_at(id, flavor, 0.0, 0.0);
    find.created_at = parse_instant(created_at)
        .unwrap_or_else(|| panic!("bad fixture timestamp {created_at}"));
    find
}

// ---------------------------------------------------------------------------
// MockFindSource
// ---------------------------------------------------------------------------

/// Canned find/flavor responses. Failures, once set, persist until the
/// matching `set_*` call.
pub struct MockFindSource {
    finds: Mutex<Result<Vec<Find>>>,
    flavors: Mutex<Result<FlavorList>>,
    submitted: Mutex<Vec<NewFind>>,
    submit_error: Mutex<Option<ClientError>>,
    find_calls: AtomicUsize,
}

impl MockFindSource {
    pub fn new() -> Self {
        Self {
            finds: Mutex::new(Ok(Vec::new())),
            flavors: Mutex::new(Ok(Vec::new())),
            submitted: Mutex::new(Vec::new()),
            submit_error: Mutex::new(None),
            find_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_finds(self, finds: Vec<Find>) -> Self {
        self.set_finds(finds);
        self
    }

    pub fn with_flavors(self, flavors: FlavorList) -> Self {
        *self.flavors.lock().unwrap() = Ok(flavors);
        self
    }

    pub fn set_finds(&self, finds: Vec<Find>) {
        *self.finds.lock().unwrap() = Ok(finds);
    }

    pub fn fail_finds(&self, err: ClientError) {
        *self.finds.lock().unwrap() = Err(err);
    }

    pub fn fail_flavors(&self, err: ClientError) {
        *self.flavors.lock().unwrap() = Err(err);
    }

    pub fn fail_submit(&self, err: ClientError) {
        *self.submit_error.lock().unwrap() = Some(err);
    }

    pub fn submitted(&self) -> Vec<NewFind> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockFindSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FindSource for MockFindSource {
    async fn finds(&self) -> Result<Vec<Find>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.finds.lock().unwrap().clone()
    }

    async fn flavors(&self) -> Result<FlavorList> {
        self.flavors.lock().unwrap().clone()
    }

    async fn submit(&self, new: &NewFind) -> Result<Find> {
        if let Some(err) = self.submit_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.submitted.lock().unwrap().push(new.clone());

        let mut finds = self.finds.lock().unwrap();
        let list = finds.as_mut().map_err(|e| e.clone())?;
        let mut created = find_at(&format!("new-{}", list.len() + 1), &new.flavor, 0.0, 0.0);
        created.size = new.size.clone();
        created.location_name = new.location_name.clone();
        created.address = new.address.clone();
        created.image_url = new.image_url.clone();
        list.push(created.clone());
        Ok(created)
    }
}

// ---------------------------------------------------------------------------
// GatedSource
// ---------------------------------------------------------------------------

pub type FindsGate = oneshot::Sender<Result<Vec<Find>>>;

/// Each `finds()` call takes the next gate in creation order and resolves
/// when the test sends on it.
pub struct GatedSource {
    gates: Mutex<VecDeque<oneshot::Receiver<Result<Vec<Find>>>>>,
}

impl GatedSource {
    pub fn new(calls: usize) -> (Self, Vec<FindsGate>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) =
            (0..calls).map(|_| oneshot::channel()).unzip();
        (
            Self {
                gates: Mutex::new(receivers),
            },
            senders,
        )
    }
}

#[async_trait]
impl FindSource for GatedSource {
    async fn finds(&self) -> Result<Vec<Find>> {
        let gate = self.gates.lock().unwrap().pop_front();
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ClientError::Network("gate dropped".to_string()))),
            None => Err(ClientError::Network("no gate left".to_string())),
        }
    }

    async fn flavors(&self) -> Result<FlavorList> {
        Ok(Vec::new())
    }

    async fn submit(&self, _new: &NewFind) -> Result<Find> {
        Err(ClientError::Network("GatedSource does not accept submissions".to_string()))
    }
}

// ---------------------------------------------------------------------------
// MockAdminApi
// ---------------------------------------------------------------------------

/// In-memory admin server. `rows` is kept most-recent-first, like the real
/// endpoint.
pub struct MockAdminApi {
    username: String,
    password: String,
    authenticated: Mutex<bool>,
    rows: Mutex<Vec<Find>>,
    delete_failures: Mutex<HashMap<FindId, ClientError>>,
    held_deletes: Mutex<HashMap<FindId, oneshot::Receiver<()>>>,
    held_pages: Mutex<HashMap<u32, oneshot::Receiver<()>>>,
    page_failure: Mutex<Option<ClientError>>,
    calls: Mutex<Vec<String>>,
}

impl MockAdminApi {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            authenticated: Mutex::new(false),
            rows: Mutex::new(Vec::new()),
            delete_failures: Mutex::new(HashMap::new()),
            held_deletes: Mutex::new(HashMap::new()),
            held_pages: Mutex::new(HashMap::new()),
            page_failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_rows(self, rows: Vec<Find>) -> Self {
        *self.rows.lock().unwrap() = rows;
        self
    }

    /// Start with a live session, as if the cookie were already set.
    pub fn signed_in(self) -> Self {
        *self.authenticated.lock().unwrap() = true;
        self
    }

    pub fn expire_session(&self) {
        *self.authenticated.lock().unwrap() = false;
    }

    pub fn fail_delete(&self, id: &str, err: ClientError) {
        self.delete_failures
            .lock()
            .unwrap()
            .insert(FindId::from(id), err);
    }

    pub fn fail_pages(&self, err: Option<ClientError>) {
        *self.page_failure.lock().unwrap() = err;
    }

    /// Make the next delete of `id` wait until the returned sender fires.
    pub fn hold_delete(&self, id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.held_deletes
            .lock()
            .unwrap()
            .insert(FindId::from(id), rx);
        tx
    }

    /// Make the next page request with `limit` wait until the returned
    /// sender fires. Rows are read after the wait.
    pub fn hold_page(&self, limit: u32) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.held_pages.lock().unwrap().insert(limit, rx);
        tx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn delete_calls(&self, id: &str) -> usize {
        let needle = format!("delete {id}");
        self.calls().iter().filter(|c| **c == needle).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn require_session(&self) -> Result<()> {
        if *self.authenticated.lock().unwrap() {
            Ok(())
        } else {
            Err(ClientError::Unauthorized("not_authenticated".to_string()))
        }
    }
}

#[async_trait]
impl AdminApi for MockAdminApi {
    async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.record(format!("login {username}"));
        if username == self.username && password == self.password {
            *self.authenticated.lock().unwrap() = true;
            Ok(())
        } else {
            Err(ClientError::Unauthorized("invalid_credentials".to_string()))
        }
    }

    async fn logout(&self) -> Result<()> {
        self.record("logout".to_string());
        *self.authenticated.lock().unwrap() = false;
        Ok(())
    }

    async fn profile(&self) -> Result<AdminProfile> {
        self.record("me".to_string());
        self.require_session()?;
        Ok(AdminProfile {
            username: self.username.clone(),
        })
    }

    async fn finds(&self, limit: u32) -> Result<Vec<Find>> {
        self.record(format!("finds {limit}"));
        self.require_session()?;

        let held = self.held_pages.lock().unwrap().remove(&limit);
        if let Some(rx) = held {
            let _ = rx.await;
        }

        if let Some(err) = self.page_failure.lock().unwrap().clone() {
            return Err(err);
        }
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().take(limit as usize).cloned().collect())
    }

    async fn delete_find(&self, id: &FindId) -> Result<()> {
        self.record(format!("delete {id}"));
        self.require_session()?;

        let held = self.held_deletes.lock().unwrap().remove(id);
        if let Some(rx) = held {
            let _ = rx.await;
        }

        if let Some(err) = self.delete_failures.lock().unwrap().get(id).cloned() {
            return Err(err);
        }

        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|f| &f.id != id);
        if rows.len() == before {
            return Err(ClientError::Api {
                status: 404,
                message: "find_not_found".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingSurface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    View(Viewport),
    Popup(FindId),
    ClosePopup,
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub events: Vec<SurfaceEvent>,
}

impl RecordingSurface {
    pub fn views(&self) -> impl Iterator<Item = Viewport> + '_ {
        self.events.iter().filter_map(|e| match e {
            SurfaceEvent::View(v) => Some(*v),
            _ => None,
        })
    }

    pub fn view_count(&self) -> usize {
        self.views().count()
    }

    pub fn last_view(&self) -> Option<Viewport> {
        self.views().last()
    }

    pub fn popups(&self) -> Vec<FindId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Popup(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }
}

impl MapSurface for RecordingSurface {
    fn set_view(&mut self, viewport: Viewport) {
        self.events.push(SurfaceEvent::View(viewport));
    }

    fn open_popup(&mut self, id: &FindId) {
        self.events.push(SurfaceEvent::Popup(id.clone()));
    }

    fn close_popup(&mut self) {
        self.events.push(SurfaceEvent::ClosePopup);
    }
}
