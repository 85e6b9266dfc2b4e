use chrono::Utc;

use crate::calendar::{Attendee, Event, Location, RawAttendee, RawEvent, RawLocation};
use crate::storage::{StoreError, SyncStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub events_stored: usize,
    pub events_skipped: usize,
    pub attendees_stored: usize,
    pub attendees_skipped: usize,
    pub locations_stored: usize,
    pub locations_skipped: usize,
    pub entries_ignored: usize,
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "events {}/{} stored/skipped, attendees {}/{}, locations {}/{}, {} ignored",
            self.events_stored,
            self.events_skipped,
            self.attendees_stored,
            self.attendees_skipped,
            self.locations_stored,
            self.locations_skipped,
            self.entries_ignored,
        )
    }
}

pub struct Reconciler<'a, S: SyncStore + ?Sized> {
    store: &'a S,
    user_id: String,
    report: ReconcileReport,
}

impl<'a, S: SyncStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            report: ReconcileReport::default(),
        }
    }

    pub fn report(&self) -> ReconcileReport {
        self.report
    }

    // Children are reconciled even when the event row already existed.
    pub fn reconcile(&mut self, raw: &RawEvent) -> Result<Option<Event>, StoreError> {
        self.reconcile_in_series(raw, None)
    }

    pub fn reconcile_instance(&mut self, raw: &RawEvent, master_key: &str) -> Result<Option<Event>, StoreError> {
        self.reconcile_in_series(raw, Some(master_key))
    }

    fn reconcile_in_series(&mut self, raw: &RawEvent, master_key: Option<&str>) -> Result<Option<Event>, StoreError> {
        let Some(natural_key) = raw.natural_key() else {
            if raw.is_removed() {
                tracing::debug!("Ignoring removed entry {}", raw.id);
            } else {
                tracing::warn!("Ignoring event {} without iCalUId", raw.id);
            }
            self.report.entries_ignored += 1;
            return Ok(None);
        };

        let mut event = Event::from_raw(&self.user_id, natural_key, raw, Utc::now());
        if let Some(master_key) = master_key {
            event = event.in_series(master_key);
        }
        self.store_event(&event)?;

        for attendee in &raw.attendees {
            self.upsert_attendee(natural_key, attendee)?;
        }

        for location in &raw.locations {
            self.upsert_location(natural_key, location)?;
        }

        Ok(Some(event))
    }

    pub fn upsert_event(&mut self, natural_key: &str, raw: &RawEvent) -> Result<(Event, bool), StoreError> {
        let event = Event::from_raw(&self.user_id, natural_key, raw, Utc::now());
        let stored = self.store_event(&event)?;
        Ok((event, stored))
    }

    fn store_event(&mut self, event: &Event) -> Result<bool, StoreError> {
        let stored = self.store.insert_event_if_absent(event)?;

        if stored {
            tracing::debug!("Stored event {} ({})", event.ical_uid, event.title);
            self.report.events_stored += 1;
        } else {
            self.report.events_skipped += 1;
        }
        Ok(stored)
    }

    pub fn upsert_attendee(&mut self, natural_key: &str, raw: &RawAttendee) -> Result<bool, StoreError> {
        let Some(attendee) = Attendee::from_raw(&self.user_id, natural_key, raw, Utc::now()) else {
            self.report.entries_ignored += 1;
            return Ok(false);
        };

        let stored = self.store.insert_attendee_if_absent(&attendee)?;
        if stored {
            self.report.attendees_stored += 1;
        } else {
            self.report.attendees_skipped += 1;
        }
        Ok(stored)
    }

    pub fn upsert_location(&mut self, natural_key: &str, raw: &RawLocation) -> Result<bool, StoreError> {
        let Some(location) = Location::from_raw(natural_key, raw, Utc::now()) else {
            self.report.entries_ignored += 1;
            return Ok(false);
        };

        let stored = self.store.insert_location_if_absent(&location)?;
        if stored {
            self.report.locations_stored += 1;
        } else {
            self.report.locations_skipped += 1;
        }
        Ok(stored)
    }
}
