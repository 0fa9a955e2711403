pub mod admin;
pub mod aggregate;
pub mod board;
pub mod camera;
pub mod decluster;
pub mod export;
pub mod filter;
pub mod format;
pub mod loader;
pub mod moderation;
pub mod selection;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use admin::{AdminConsole, AdminStage};
pub use aggregate::{FlavorCount, Summary};
pub use board::{BoardView, MapBoard};
pub use camera::{CameraAnimator, CameraFeed, CameraTransition, Viewport};
pub use decluster::{decluster, PlacedFind};
pub use filter::filter_finds;
pub use loader::{DataLoader, LoadOutcome, LoadStatus, Resource};
pub use moderation::{AdminStats, DeleteOutcome, ModerationStore};
pub use selection::SelectionController;
pub use traits::{AdminApi, FindSource, MapSurface};
