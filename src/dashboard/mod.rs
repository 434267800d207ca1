// =============================================================================
// Dashboard view models
// =============================================================================
//
// Immutable, per-request views built from the published snapshot. Nothing
// here holds state between requests; the rendering surface receives plain
// serialisable structs.

pub mod crossovers;
pub mod detail;
pub mod format;
pub mod summary;

pub use crossovers::{build_golden_cross, GoldenCrossView};
pub use detail::{build_detail, DetailView};
pub use summary::{build_summary, SortColumn, SummaryView};
