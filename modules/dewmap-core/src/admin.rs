//! Admin console session stages.
//!
//! `Loading` until the first profile check settles, then `Guest` or
//! `Authed`. Any moderation call rejected as unauthorized drops the console
//! back to `Guest` and clears the list.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dewmap_client::{ClientError, Result, ValidationError};
use dewmap_common::{AdminProfile, FindId};
use tracing::{info, warn};

use crate::loader::LoadOutcome;
use crate::moderation::{DeleteOutcome, ModerationStore};
use crate::traits::AdminApi;

#[derive(Debug, Clone, PartialEq)]
pub enum AdminStage {
    Loading,
    Guest,
    Authed(AdminProfile),
}

impl AdminStage {
    pub fn is_authed(&self) -> bool {
        matches!(self, AdminStage::Authed(_))
    }
}

struct Session {
    stage: AdminStage,
    login_error: Option<String>,
}

pub struct AdminConsole {
    api: Arc<dyn AdminApi>,
    store: ModerationStore,
    session: Mutex<Session>,
}

impl AdminConsole {
    pub fn new(api: Arc<dyn AdminApi>, page_size: u32) -> Self {
        Self {
            store: ModerationStore::with_limit(Arc::clone(&api), page_size),
            api,
            session: Mutex::new(Session {
                stage: AdminStage::Loading,
                login_error: None,
            }),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stage(&self) -> AdminStage {
        self.session().stage.clone()
    }

    pub fn login_error(&self) -> Option<String> {
        self.session().login_error.clone()
    }

    pub fn store(&self) -> &ModerationStore {
        &self.store
    }

    /// Resume an existing session if there is one.
    pub async fn bootstrap(&self) -> AdminStage {
        self.session().stage = AdminStage::Loading;

        match self.api.profile().await {
            Ok(profile) => {
                info!(username = %profile.username, "Admin session resumed");
                self.enter(profile).await;
            }
            Err(err) => {
                info!(error = %err, "No admin session");
                self.to_guest();
            }
        }
        self.stage()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AdminProfile> {
        // Passwords are compared exactly; only the username is trimmed.
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            let err = ClientError::from(ValidationError::MissingCredentials);
            self.session().login_error = Some(err.to_string());
            return Err(err);
        }

        let attempt = async {
            self.api.login(username, password).await?;
            self.api.profile().await
        };
        match attempt.await {
            Ok(profile) => {
                info!(username = %profile.username, "Admin signed in");
                self.session().login_error = None;
                self.enter(profile.clone()).await;
                Ok(profile)
            }
            Err(err) => {
                warn!(username, error = %err, "Admin sign-in failed");
                let mut s = self.session();
                s.stage = AdminStage::Guest;
                s.login_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Local state is cleared even if the server call fails.
    pub async fn logout(&self) {
        if let Err(err) = self.api.logout().await {
            warn!(error = %err, "Logout request failed");
        }
        info!("Admin signed out");
        self.to_guest();
    }

    pub async fn refresh(&self) -> Result<LoadOutcome> {
        let result = self.store.reload().await;
        self.route(result)
    }

    pub async fn set_page_size(&self, limit: u32) -> Result<LoadOutcome> {
        let result = self.store.set_limit(limit).await;
        self.route(result)
    }

    pub async fn delete(&self, id: &FindId) -> Result<DeleteOutcome> {
        let result = self.store.delete(id).await;
        self.route(result)
    }

    async fn enter(&self, profile: AdminProfile) {
        self.session().stage = AdminStage::Authed(profile);
        // Load failures are kept on the store for display.
        let _ = self.refresh().await;
    }

    fn to_guest(&self) {
        self.store.clear();
        self.session().stage = AdminStage::Guest;
    }

    fn route<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_unauthorized() {
                warn!("Admin session expired");
                self.to_guest();
            }
        }
        result
    }
}
