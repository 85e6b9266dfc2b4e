pub mod calendar;
pub mod storage;
pub mod sync;

pub use calendar::{Event, RawEvent, User};
pub use sync::{SyncEngine, SyncError, SyncOutcome};
