use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::calendar::{Event, NewEventError, NewEventRequest, RawEvent, User};
use crate::storage::config::{Config, SyncConfig};
use crate::storage::{Store, StoreError, SyncStore};
use crate::sync::graph_api::{CalendarProvider, GraphCalendarClient, ProviderError};
use crate::sync::pagination::{PaginationDriver, ProtocolViolation, TokenGuard};
use crate::sync::reconcile::{ReconcileReport, Reconciler};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid user id '{0}'")]
    InvalidUserId(String),
    #[error("API error: {0}")]
    ApiError(#[from] ProviderError),
    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Protocol error: {0}")]
    ProtocolError(#[from] ProtocolViolation),
    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] NewEventError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub user: User,
    pub created_user: bool,
    pub resume_token: String,
    pub pages: usize,
    pub report: ReconcileReport,
}

pub struct SyncEngine<P, S> {
    provider: P,
    store: S,
    config: SyncConfig,
}

impl SyncEngine<GraphCalendarClient, Store> {
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        let provider = GraphCalendarClient::new(config.access_token())
            .with_base_url(config.provider.base_url.clone())
            .with_page_size(config.provider.page_size);
        let store = Store::open(&config.storage.database_path)?;

        Ok(Self::new(provider, store, config.sync.clone()))
    }
}

impl<P: CalendarProvider, S: SyncStore> SyncEngine<P, S> {
    pub fn new(provider: P, store: S, config: SyncConfig) -> Self {
        Self { provider, store, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // The cursor is only replaced after the provider hands back a resume token.
    pub async fn delta_sync(&self, user_id: &str) -> Result<SyncOutcome, SyncError> {
        let uuid = parse_user_id(user_id)?;
        let (user, created_user) = self.get_or_create_user(&uuid)?;
        let window = self
            .config
            .delta_window
            .resolve(Utc::now(), self.config.utc_offset_hours);

        if user.has_cursor() {
            tracing::info!("Resuming delta sync for {}", uuid);
        } else {
            tracing::info!(
                "Starting delta sync for {} from {} to {}",
                uuid,
                window.start_param(),
                window.end_param()
            );
        }

        let owner = uuid.to_string();
        let outcome = PaginationDriver::new(&self.provider, &self.store, &owner, window)
            .run(user.current_delta.clone())
            .await?;

        self.store.set_current_cursor(&uuid, &outcome.resume_token)?;
        let user = self.store.get_user(&uuid)?.ok_or(StoreError::UnknownUser(uuid))?;
        tracing::info!("Delta sync for {} stored a new cursor after {} page(s)", uuid, outcome.pages);

        Ok(SyncOutcome {
            user,
            created_user,
            resume_token: outcome.resume_token,
            pages: outcome.pages,
            report: outcome.report,
        })
    }

    pub async fn view_window(&self, user_id: &str) -> Result<Vec<Event>, SyncError> {
        let uuid = parse_user_id(user_id)?;
        let window = self
            .config
            .view_window
            .resolve(Utc::now(), self.config.utc_offset_hours);
        let owner = uuid.to_string();
        let mut reconciler = Reconciler::new(&self.store, owner.as_str());
        let mut guard = TokenGuard::new(None);
        let mut events = Vec::new();

        let mut page = self.provider.fetch_calendar_window(&owner, &window).await?;
        let mut pages = 1;
        loop {
            for raw in &page.events {
                if let Some(event) = reconciler.reconcile(raw)? {
                    events.push(event);
                }
            }

            let Some(link) = page.next_link.take() else {
                break;
            };
            guard.advance(&link, pages)?;
            page = self.provider.fetch_next_page(&link).await?;
            pages += 1;
        }

        tracing::info!("Calendar view for {} over {} day(s): {}", uuid, window.days(), reconciler.report());
        Ok(events)
    }

    // The created event is not stored here; the next delta sync picks it up.
    pub async fn create_event(&self, user_id: &str, request: &NewEventRequest) -> Result<RawEvent, SyncError> {
        let uuid = parse_user_id(user_id)?;
        let body = request.to_graph_body()?;

        let created = self.provider.create_event(&uuid.to_string(), &body).await?;
        tracing::info!("Created event {} for {}", created.id, uuid);
        Ok(created)
    }

    fn get_or_create_user(&self, user_id: &Uuid) -> Result<(User, bool), SyncError> {
        if let Some(user) = self.store.get_user(user_id)? {
            return Ok((user, false));
        }

        tracing::info!("Creating user {}", user_id);
        Ok((self.store.create_user(user_id)?, true))
    }
}

fn parse_user_id(user_id: &str) -> Result<Uuid, SyncError> {
    Uuid::parse_str(user_id.trim()).map_err(|_| SyncError::InvalidUserId(user_id.to_string()))
}
