//! Placement core: decide whether the tracked window needs correcting and apply
//! the correction. Display and window state is read fresh on every pass.

pub mod decoration;
pub mod enforcer;
pub mod oracle;
pub mod style;

pub use decoration::strip_decorations;
pub use enforcer::{EnforcerExit, PassOutcome, PlacementEnforcer, TrackingState};
pub use oracle::{decide, Decision, WindowGeometrySnapshot};
pub use style::WindowStyleFlags;
