pub mod graph_api;
pub mod pagination;
pub mod reconcile;
pub mod series;
pub mod sync_engine;
pub mod window;

#[cfg(test)]
mod test_support;

pub use graph_api::{CalendarProvider, DeltaPage, EventPage, GraphCalendarClient, ProviderError};
pub use pagination::{DeltaOutcome, PaginationDriver, ProtocolViolation};
pub use reconcile::{ReconcileReport, Reconciler};
pub use sync_engine::{SyncEngine, SyncError, SyncOutcome};
pub use window::{SyncWindow, WindowAnchor, WindowSpec};
