//! Cancellable, generation-stamped loading of the public find and flavor
//! lists.
//!
//! Each load bumps its resource's generation and cancels the load it
//! replaces. When a load completes it may write only if its generation is
//! still current, so the most recently issued load wins regardless of
//! completion order. Superseded and cancelled loads resolve to
//! `LoadOutcome::Discarded` and touch nothing.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dewmap_client::ClientError;
use dewmap_common::{Find, FlavorList};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::traits::FindSource;

pub const FLAVOR_LOAD_ERROR: &str = "unable to load flavor list right now";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Loading,
    Idle,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Finds,
    Flavors,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Finds => write!(f, "finds"),
            Resource::Flavors => write!(f, "flavors"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Result written to shared state.
    Applied,
    /// Fetch failed; status is `Error`, previous data kept.
    Failed,
    /// Superseded or cancelled; nothing written.
    Discarded,
}

struct Slot<T> {
    data: Arc<T>,
    status: LoadStatus,
    error: Option<String>,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

impl<T: Default> Slot<T> {
    fn new() -> Self {
        Self {
            data: Arc::new(T::default()),
            status: LoadStatus::Loading,
            error: None,
            generation: 0,
            in_flight: None,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct DataLoader {
    source: Arc<dyn FindSource>,
    shutdown: CancellationToken,
    finds: Mutex<Slot<Vec<Find>>>,
    flavors: Mutex<Slot<FlavorList>>,
}

impl DataLoader {
    pub fn new(source: Arc<dyn FindSource>) -> Self {
        Self {
            source,
            shutdown: CancellationToken::new(),
            finds: Mutex::new(Slot::new()),
            flavors: Mutex::new(Slot::new()),
        }
    }

    pub fn source(&self) -> Arc<dyn FindSource> {
        Arc::clone(&self.source)
    }

    pub async fn load_finds(&self) -> LoadOutcome {
        self.run(Resource::Finds, &self.finds, self.source.finds(), |err| {
            err.to_string()
        })
        .await
    }

    pub async fn load_flavors(&self) -> LoadOutcome {
        self.run(Resource::Flavors, &self.flavors, self.source.flavors(), |_| {
            FLAVOR_LOAD_ERROR.to_string()
        })
        .await
    }

    /// Cancel every outstanding load. Used when the owning view goes away.
    pub fn shutdown(&self) {
        debug!("Loader shutting down, cancelling outstanding loads");
        self.shutdown.cancel();
    }

    pub fn finds(&self) -> Arc<Vec<Find>> {
        Arc::clone(&lock(&self.finds).data)
    }

    pub fn flavors(&self) -> Arc<FlavorList> {
        Arc::clone(&lock(&self.flavors).data)
    }

    pub fn status(&self, resource: Resource) -> LoadStatus {
        match resource {
            Resource::Finds => lock(&self.finds).status,
            Resource::Flavors => lock(&self.flavors).status,
        }
    }

    pub fn error(&self, resource: Resource) -> Option<String> {
        match resource {
            Resource::Finds => lock(&self.finds).error.clone(),
            Resource::Flavors => lock(&self.flavors).error.clone(),
        }
    }

    pub fn generation(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Finds => lock(&self.finds).generation,
            Resource::Flavors => lock(&self.flavors).generation,
        }
    }

    async fn run<T, Fut>(
        &self,
        resource: Resource,
        slot: &Mutex<Slot<T>>,
        fetch: Fut,
        describe: fn(&ClientError) -> String,
    ) -> LoadOutcome
    where
        Fut: Future<Output = dewmap_client::Result<T>>,
    {
        let (generation, token) = {
            let mut s = lock(slot);
            s.generation += 1;
            if let Some(previous) = s.in_flight.take() {
                previous.cancel();
            }
            let token = self.shutdown.child_token();
            s.in_flight = Some(token.clone());
            s.status = LoadStatus::Loading;
            (s.generation, token)
        };
        debug!(%resource, generation, "Load started");

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(%resource, generation, "Load cancelled");
                return LoadOutcome::Discarded;
            }
            result = fetch => result,
        };

        let mut s = lock(slot);
        if s.generation != generation {
            debug!(%resource, generation, current = s.generation, "Discarding superseded load");
            return LoadOutcome::Discarded;
        }
        s.in_flight = None;

        match result {
            Ok(data) => {
                s.data = Arc::new(data);
                s.status = LoadStatus::Idle;
                s.error = None;
                info!(%resource, generation, "Load applied");
                LoadOutcome::Applied
            }
            Err(err) => {
                warn!(%resource, generation, error = %err, "Load failed, keeping previous data");
                s.status = LoadStatus::Error;
                s.error = Some(describe(&err));
                LoadOutcome::Failed
            }
        }
    }
}

impl Drop for DataLoader {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{find_at, GatedSource, MockFindSource};

    #[tokio::test]
    async fn successful_load_replaces_data_and_goes_idle() {
        let source = MockFindSource::new().with_finds(vec![find_at("1", "Code Red", 40.0, -75.0)]);
        let loader = DataLoader::new(Arc::new(source));
        assert_eq!(loader.status(Resource::Finds), LoadStatus::Loading);

        assert_eq!(loader.load_finds().await, LoadOutcome::Applied);
        assert_eq!(loader.status(Resource::Finds), LoadStatus::Idle);
        assert_eq!(loader.finds().len(), 1);
        assert!(loader.error(Resource::Finds).is_none());
    }

    #[tokio::test]
    async fn failure_keeps_previous_data() {
        let source = Arc::new(
            MockFindSource::new().with_finds(vec![find_at("1", "Code Red", 40.0, -75.0)]),
        );
        let loader = DataLoader::new(source.clone());
        loader.load_finds().await;

        source.fail_finds(ClientError::Api {
            status: 503,
            message: "request failed (status 503)".to_string(),
        });
        assert_eq!(loader.load_finds().await, LoadOutcome::Failed);
        assert_eq!(loader.status(Resource::Finds), LoadStatus::Error);
        assert_eq!(loader.finds().len(), 1);
        assert_eq!(
            loader.error(Resource::Finds).as_deref(),
            Some("request failed (status 503)")
        );
    }

    #[tokio::test]
    async fn next_success_clears_error() {
        let source = Arc::new(MockFindSource::new());
        source.fail_finds(ClientError::Network("connection reset".to_string()));
        let loader = DataLoader::new(source.clone());
        assert_eq!(loader.load_finds().await, LoadOutcome::Failed);

        source.set_finds(vec![find_at("1", "Voltage", 1.0, 1.0)]);
        assert_eq!(loader.load_finds().await, LoadOutcome::Applied);
        assert!(loader.error(Resource::Finds).is_none());
    }

    #[tokio::test]
    async fn flavor_failure_uses_fixed_message() {
        let source = Arc::new(MockFindSource::new().with_flavors(vec!["Code Red".into()]));
        let loader = DataLoader::new(source.clone());
        loader.load_flavors().await;

        source.fail_flavors(ClientError::Network("dns".to_string()));
        assert_eq!(loader.load_flavors().await, LoadOutcome::Failed);
        assert_eq!(loader.error(Resource::Flavors).as_deref(), Some(FLAVOR_LOAD_ERROR));
        assert_eq!(loader.flavors().as_slice(), ["Code Red".to_string()]);
        // finds slot untouched
        assert!(loader.error(Resource::Finds).is_none());
    }

    #[tokio::test]
    async fn older_load_resolving_last_is_discarded() {
        let (source, gates) = GatedSource::new(2);
        let loader = DataLoader::new(Arc::new(source));
        let [gate_a, gate_b] = <[_; 2]>::try_from(gates).unwrap();

        let (a, b, ()) = tokio::join!(loader.load_finds(), loader.load_finds(), async {
            let _ = gate_b.send(Ok(vec![find_at("b", "Baja Blast", 1.0, 1.0)]));
            tokio::task::yield_now().await;
            let _ = gate_a.send(Ok(vec![find_at("a", "Code Red", 2.0, 2.0)]));
        });

        assert_eq!(a, LoadOutcome::Discarded);
        assert_eq!(b, LoadOutcome::Applied);
        let finds = loader.finds();
        let ids: Vec<&str> = finds.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test]
    async fn superseded_failure_is_silent() {
        let (source, gates) = GatedSource::new(2);
        let loader = DataLoader::new(Arc::new(source));
        let [gate_a, gate_b] = <[_; 2]>::try_from(gates).unwrap();

        let (a, b, ()) = tokio::join!(loader.load_finds(), loader.load_finds(), async {
            let _ = gate_a.send(Err(ClientError::Network("timeout".to_string())));
            let _ = gate_b.send(Ok(vec![find_at("b", "Baja Blast", 1.0, 1.0)]));
        });

        assert_eq!(a, LoadOutcome::Discarded);
        assert_eq!(b, LoadOutcome::Applied);
        assert_eq!(loader.status(Resource::Finds), LoadStatus::Idle);
        assert!(loader.error(Resource::Finds).is_none());
    }

    #[tokio::test]
    async fn shutdown_cancels_without_touching_state() {
        let (source, gates) = GatedSource::new(1);
        let loader = Arc::new(DataLoader::new(Arc::new(source)));

        let task = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load_finds().await }
        });
        tokio::task::yield_now().await;
        loader.shutdown();

        assert_eq!(task.await.unwrap(), LoadOutcome::Discarded);
        drop(gates);
        assert!(loader.finds().is_empty());
        assert!(loader.error(Resource::Finds).is_none());
    }
}
