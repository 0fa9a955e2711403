//! Camera transitions toward a selected find.
//!
//! `SelectionController` publishes the latest `CameraTransition` on a watch
//! channel. `CameraAnimator` owns the `MapSurface` and flies toward whatever
//! was published last. A transition published mid-flight replaces the one in
//! progress; the new flight starts from wherever the camera currently is.

use std::time::Duration;

use dewmap_common::{FindId, GeoPoint};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::traits::MapSurface;

/// Zoom at which a single find is readable on the map.
pub const MIN_DETAIL_ZOOM: f64 = 14.0;

pub const FLY_DURATION: Duration = Duration::from_millis(800);

/// ~60 fps.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Continental US overview.
pub const DEFAULT_VIEWPORT: Viewport = Viewport {
    center: GeoPoint {
        lat: 39.8283,
        lng: -98.5795,
    },
    zoom: 4.0,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(center: GeoPoint, zoom: f64) -> Self {
        Self { center, zoom }
    }

    /// Linear interpolation; `t` is clamped to [0, 1].
    pub fn lerp(&self, to: &Viewport, t: f64) -> Viewport {
        let t = t.clamp(0.0, 1.0);
        Viewport {
            center: GeoPoint::new(
                self.center.lat + (to.center.lat - self.center.lat) * t,
                self.center.lng + (to.center.lng - self.center.lng) * t,
            ),
            zoom: self.zoom + (to.zoom - self.zoom) * t,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        DEFAULT_VIEWPORT
    }
}

pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// One requested flight. `seq` increases with every selection.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraTransition {
    pub seq: u64,
    pub find_id: FindId,
    pub target: Viewport,
    pub duration: Duration,
}

/// `None` on the channel means "nothing selected": close the popup.
pub type CameraFeed = watch::Receiver<Option<CameraTransition>>;

enum Flight {
    Landed,
    Redirected(Option<CameraTransition>),
}

pub struct CameraAnimator<S: MapSurface> {
    surface: S,
    current: Viewport,
}

impl<S: MapSurface> CameraAnimator<S> {
    pub fn new(surface: S, start: Viewport) -> Self {
        Self {
            surface,
            current: start,
        }
    }

    pub fn current(&self) -> Viewport {
        self.current
    }

    /// Follow the feed until its sender is dropped, then hand the surface
    /// back.
    pub async fn run(mut self, mut feed: CameraFeed) -> S {
        while feed.changed().await.is_ok() {
            let mut command = feed.borrow_and_update().clone();
            loop {
                let Some(transition) = command else {
                    self.surface.close_popup();
                    break;
                };
                match self.fly(&transition, &mut feed).await {
                    Flight::Landed => break,
                    Flight::Redirected(next) => command = next,
                }
            }
        }
        self.surface
    }

    async fn fly(&mut self, transition: &CameraTransition, feed: &mut CameraFeed) -> Flight {
        let from = self.current;
        self.surface.open_popup(&transition.find_id);

        let start = Instant::now();
        let mut ticker = tokio::time::interval(FRAME_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            if feed.has_changed().unwrap_or(false) {
                debug!(seq = transition.seq, "Camera transition superseded");
                return Flight::Redirected(feed.borrow_and_update().clone());
            }

            let progress = if transition.duration.is_zero() {
                1.0
            } else {
                (start.elapsed().as_secs_f64() / transition.duration.as_secs_f64()).min(1.0)
            };

            if progress >= 1.0 {
                self.current = transition.target;
                self.surface.set_view(self.current);
                return Flight::Landed;
            }

            self.current = from.lerp(&transition.target, ease_in_out_cubic(progress));
            self.surface.set_view(self.current);
        }
    }
}
