// Event Overlay Module
// Live event payloads, the expiry clock and ephemeral edge management

pub mod clock;
pub mod events;
pub mod manager;

pub use clock::{Clock, ManualClock, TokioClock};
pub use events::{Communication, DashboardEvent, LogRecord};
pub use manager::{DropReason, EphemeralEdge, OverlayManager, OverlayOutcome};
