pub mod event;
pub mod new_event;
pub mod raw_event;
pub mod user;

pub use event::{Attendee, Event, Location};
pub use new_event::{GraphEventBody, NewEventError, NewEventRequest};
pub use raw_event::{EventKind, PhysicalAddress, RawAttendee, RawEvent, RawLocation};
pub use user::User;
