use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::TimeZone;

use uuid::Uuid;

use crate::calendar::{Attendee, Event, GraphEventBody, Location, RawEvent, User};
use crate::storage::{Store, StoreError, SyncStore};
use crate::sync::graph_api::{CalendarProvider, DeltaPage, EventPage, ProviderError};
use crate::sync::window::SyncWindow;

#[derive(Default)]
pub struct ScriptedProvider {
    delta_pages: Mutex<VecDeque<Result<DeltaPage, ProviderError>>>,
    window_pages: Mutex<VecDeque<Result<EventPage, ProviderError>>>,
    instances: HashMap<String, EventPage>,
    linked_pages: HashMap<String, EventPage>,
    delta_calls: Mutex<Vec<Option<String>>>,
    instance_calls: Mutex<Vec<String>>,
    next_page_calls: Mutex<Vec<String>>,
    created: Mutex<Vec<GraphEventBody>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delta_page(self, page: DeltaPage) -> Self {
        self.delta_pages.lock().unwrap().push_back(Ok(page));
        self
    }

    pub fn with_delta_error(self, error: ProviderError) -> Self {
        self.delta_pages.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn with_window_page(self, page: EventPage) -> Self {
        self.window_pages.lock().unwrap().push_back(Ok(page));
        self
    }

    pub fn with_instances(self, series_id: &str, events: Vec<RawEvent>) -> Self {
        self.with_instance_page(series_id, EventPage { events, next_link: None })
    }

    pub fn with_instance_page(mut self, series_id: &str, page: EventPage) -> Self {
        self.instances.insert(series_id.to_string(), page);
        self
    }

    pub fn with_linked_page(mut self, link: &str, page: EventPage) -> Self {
        self.linked_pages.insert(link.to_string(), page);
        self
    }

    pub fn delta_calls(&self) -> Vec<Option<String>> {
        self.delta_calls.lock().unwrap().clone()
    }

    pub fn instance_calls(&self) -> Vec<String> {
        self.instance_calls.lock().unwrap().clone()
    }

    pub fn next_page_calls(&self) -> Vec<String> {
        self.next_page_calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<GraphEventBody> {
        self.created.lock().unwrap().clone()
    }
}

fn not_scripted(what: &str) -> ProviderError {
    ProviderError::ApiError {
        status: 404,
        code: "ErrorItemNotFound".to_string(),
        message: format!("nothing scripted for {what}"),
    }
}

#[async_trait]
impl CalendarProvider for ScriptedProvider {
    async fn fetch_calendar_window(
        &self,
        _user_id: &str,
        _window: &SyncWindow,
    ) -> Result<EventPage, ProviderError> {
        self.window_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(not_scripted("calendar view")))
    }

    async fn fetch_delta_window(
        &self,
        _user_id: &str,
        _window: &SyncWindow,
        token: Option<&str>,
    ) -> Result<DeltaPage, ProviderError> {
        self.delta_calls.lock().unwrap().push(token.map(str::to_string));
        self.delta_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(not_scripted("delta page")))
    }

    async fn fetch_series_instances(
        &self,
        _user_id: &str,
        series_id: &str,
        _window: &SyncWindow,
    ) -> Result<EventPage, ProviderError> {
        self.instance_calls.lock().unwrap().push(series_id.to_string());
        self.instances
            .get(series_id)
            .cloned()
            .ok_or_else(|| not_scripted(series_id))
    }

    async fn fetch_next_page(&self, link: &str) -> Result<EventPage, ProviderError> {
        self.next_page_calls.lock().unwrap().push(link.to_string());
        self.linked_pages
            .get(link)
            .cloned()
            .ok_or_else(|| not_scripted(link))
    }

    async fn create_event(&self, _user_id: &str, event: &GraphEventBody) -> Result<RawEvent, ProviderError> {
        let mut created = self.created.lock().unwrap();
        created.push(event.clone());

        Ok(RawEvent {
            id: format!("created-{}", created.len()),
            ical_uid: Some(format!("uid-created-{}", created.len())),
            subject: Some(event.subject.clone()),
            ..RawEvent::default()
        })
    }
}

/// Store wrapper that counts the user-level writes.
pub struct CountingStore {
    inner: Store,
    create_user_calls: Cell<usize>,
    set_cursor_calls: Cell<usize>,
}

impl CountingStore {
    pub fn new(inner: Store) -> Self {
        Self {
            inner,
            create_user_calls: Cell::new(0),
            set_cursor_calls: Cell::new(0),
        }
    }

    pub fn inner(&self) -> &Store {
        &self.inner
    }

    pub fn create_user_calls(&self) -> usize {
        self.create_user_calls.get()
    }

    pub fn set_cursor_calls(&self) -> usize {
        self.set_cursor_calls.get()
    }
}

impl SyncStore for CountingStore {
    fn get_user(&self, user_id: &Uuid) -> Result<Option<User>, StoreError> {
        self.inner.get_user(user_id)
    }

    fn create_user(&self, user_id: &Uuid) -> Result<User, StoreError> {
        self.create_user_calls.set(self.create_user_calls.get() + 1);
        self.inner.create_user(user_id)
    }

    fn set_current_cursor(&self, user_id: &Uuid, token: &str) -> Result<(), StoreError> {
        self.set_cursor_calls.set(self.set_cursor_calls.get() + 1);
        self.inner.set_current_cursor(user_id, token)
    }

    fn insert_event_if_absent(&self, event: &Event) -> Result<bool, StoreError> {
        self.inner.insert_event_if_absent(event)
    }

    fn insert_attendee_if_absent(&self, attendee: &Attendee) -> Result<bool, StoreError> {
        self.inner.insert_attendee_if_absent(attendee)
    }

    fn insert_location_if_absent(&self, location: &Location) -> Result<bool, StoreError> {
        self.inner.insert_location_if_absent(location)
    }
}

pub fn raw_event(uid: &str, kind: Option<&str>) -> RawEvent {
    RawEvent {
        id: format!("instance-{uid}"),
        ical_uid: Some(uid.to_string()),
        subject: Some(format!("Event {uid}")),
        event_type: kind.map(str::to_string),
        ..RawEvent::default()
    }
}

pub fn delta_page(events: Vec<RawEvent>, continuation: Option<&str>, resume: Option<&str>) -> DeltaPage {
    DeltaPage {
        events,
        continuation: continuation.map(str::to_string),
        resume: resume.map(str::to_string),
    }
}

pub fn test_window() -> SyncWindow {
    SyncWindow::new(
        chrono::Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        chrono::Utc.with_ymd_and_hms(2025, 4, 30, 23, 59, 59).unwrap(),
    )
}
