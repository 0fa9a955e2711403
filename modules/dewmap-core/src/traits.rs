// Trait seams between the client core and the outside world.
//
// FindSource: public read/submit endpoints (DewClient in production).
// AdminApi:   session + moderation endpoints (DewClient in production).
// MapSurface: whatever actually draws the map; receives camera frames.
//
// Mocks for all three live in `testing`.

use async_trait::async_trait;
use dewmap_client::{DewClient, Result};
use dewmap_common::{AdminProfile, Find, FindId, FlavorList, NewFind};
use tracing::debug;

use crate::camera::Viewport;

// ---------------------------------------------------------------------------
// FindSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FindSource: Send + Sync {
    /// Every find the server knows about.
    async fn finds(&self) -> Result<Vec<Find>>;

    /// Flavor names offered in the submission form.
    async fn flavors(&self) -> Result<FlavorList>;

    /// Create a find from an already-validated form.
    async fn submit(&self, new: &NewFind) -> Result<Find>;
}

#[async_trait]
impl FindSource for DewClient {
    async fn finds(&self) -> Result<Vec<Find>> {
        DewClient::finds(self).await
    }

    async fn flavors(&self) -> Result<FlavorList> {
        DewClient::flavors(self).await
    }

    async fn submit(&self, new: &NewFind) -> Result<Find> {
        self.submit_find(new).await
    }
}

// ---------------------------------------------------------------------------
// AdminApi
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<()>;

    async fn logout(&self) -> Result<()>;

    /// Current session's profile, or `Unauthorized`.
    async fn profile(&self) -> Result<AdminProfile>;

    /// Most-recent-first page of at most `limit` finds.
    async fn finds(&self, limit: u32) -> Result<Vec<Find>>;

    async fn delete_find(&self, id: &FindId) -> Result<()>;
}

#[async_trait]
impl AdminApi for DewClient {
    async fn login(&self, username: &str, password: &str) -> Result<()> {
        let accepted = self.admin_login(username, password).await?;
        debug!(ok = accepted.ok, username = %accepted.username, "Admin login accepted");
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        self.admin_logout().await
    }

    async fn profile(&self) -> Result<AdminProfile> {
        self.admin_profile().await
    }

    async fn finds(&self, limit: u32) -> Result<Vec<Find>> {
        self.admin_finds(limit).await
    }

    async fn delete_find(&self, id: &FindId) -> Result<()> {
        self.admin_delete_find(id).await
    }
}

// ---------------------------------------------------------------------------
// MapSurface
// ---------------------------------------------------------------------------

/// Rendering side of the camera. Calls arrive from `CameraAnimator` only.
pub trait MapSurface: Send {
    fn set_view(&mut self, viewport: Viewport);

    fn open_popup(&mut self, id: &FindId);

    fn close_popup(&mut self);
}
