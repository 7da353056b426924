/// Safety rules for canal ice.
///
/// Submodules:
/// - `thresholds` — per-reading classification from ice thickness.
/// - `overall` — reduction of per-location labels to a system label.
pub mod overall;
pub mod thresholds;

pub use overall::overall_status;
pub use thresholds::{classify, resolve_status};
