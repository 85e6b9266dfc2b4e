use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::calendar::{GraphEventBody, RawEvent};
use crate::sync::window::SyncWindow;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Provider rejected request ({status}): {code}: {message}")]
    ApiError {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Authentication failed")]
    AuthenticationFailed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPage {
    pub events: Vec<RawEvent>,
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaPage {
    pub events: Vec<RawEvent>,
    pub continuation: Option<String>,
    pub resume: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    value: Vec<RawEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
    #[serde(rename = "@odata.deltaLink")]
    delta_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ODataErrorResponse {
    error: ODataError,
}

#[derive(Debug, Deserialize)]
struct ODataError {
    code: Option<String>,
    message: Option<String>,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn fetch_calendar_window(
        &self,
        user_id: &str,
        window: &SyncWindow,
    ) -> Result<EventPage, ProviderError>;

    async fn fetch_delta_window(
        &self,
        user_id: &str,
        window: &SyncWindow,
        token: Option<&str>,
    ) -> Result<DeltaPage, ProviderError>;

    async fn fetch_series_instances(
        &self,
        user_id: &str,
        series_id: &str,
        window: &SyncWindow,
    ) -> Result<EventPage, ProviderError>;

    async fn fetch_next_page(&self, link: &str) -> Result<EventPage, ProviderError>;

    async fn create_event(&self, user_id: &str, event: &GraphEventBody) -> Result<RawEvent, ProviderError>;
}

pub struct GraphCalendarClient {
    base_url: String,
    access_token: String,
    page_size: u32,
    client: reqwest::Client,
}

impl GraphCalendarClient {
    pub fn new(access_token: String) -> Self {
        Self {
            base_url: "https://graph.microsoft.com/v1.0".to_string(),
            access_token,
            page_size: 2,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn user_url(&self, user_id: &str) -> String {
        format!("{}/users/{}", self.base_url, urlencoding::encode(user_id))
    }

    fn prefer_header(&self) -> String {
        format!("odata.maxpagesize={}", self.page_size)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        label: &str,
    ) -> Result<T, ProviderError> {
        let started = Instant::now();
        let response = request.bearer_auth(&self.access_token).send().await?;

        let status = response.status();
        tracing::info!("{} responded {} in {:?}", label, status, started.elapsed());

        if !status.is_success() {
            let body = response.text().await?;
            return Err(error_from_response(status.as_u16(), &body));
        }

        Ok(response.json().await?)
    }

    async fn get_collection(
        &self,
        request: reqwest::RequestBuilder,
        label: &str,
    ) -> Result<CollectionResponse, ProviderError> {
        let request = request.header("Prefer", self.prefer_header());
        let collection: CollectionResponse = self.execute(request, label).await?;
        tracing::debug!("{} returned {} events", label, collection.value.len());
        Ok(collection)
    }
}

fn error_from_response(status: u16, body: &str) -> ProviderError {
    if let Ok(parsed) = serde_json::from_str::<ODataErrorResponse>(body) {
        let code = parsed.error.code.unwrap_or_else(|| "unknown".to_string());
        let message = parsed.error.message.unwrap_or_default();
        tracing::error!("Provider error {}: {}: {}", status, code, message);
        return ProviderError::ApiError { status, code, message };
    }

    match status {
        401 => {
            tracing::error!("Authentication failed");
            ProviderError::AuthenticationFailed
        }
        429 => {
            tracing::warn!("Rate limit exceeded");
            ProviderError::RateLimited
        }
        _ => {
            tracing::error!("Request failed. Status: {}, Body: {}", status, body);
            ProviderError::RequestError(format!("Status {}: {}", status, body))
        }
    }
}

#[async_trait]
impl CalendarProvider for GraphCalendarClient {
    async fn fetch_calendar_window(
        &self,
        user_id: &str,
        window: &SyncWindow,
    ) -> Result<EventPage, ProviderError> {
        let url = format!("{}/calendarView", self.user_url(user_id));
        tracing::info!("Fetching calendar view from {} to {}", window.start_param(), window.end_param());

        let request = self.client.get(&url).query(&[
            ("startDateTime", window.start_param()),
            ("endDateTime", window.end_param()),
        ]);
        let collection = self.get_collection(request, "Calendar view").await?;

        Ok(EventPage {
            events: collection.value,
            next_link: collection.next_link,
        })
    }

    async fn fetch_delta_window(
        &self,
        user_id: &str,
        window: &SyncWindow,
        token: Option<&str>,
    ) -> Result<DeltaPage, ProviderError> {
        let request = match token {
            Some(link) => self.client.get(link),
            None => {
                let url = format!("{}/calendarView/delta", self.user_url(user_id));
                tracing::info!("Starting delta query from {} to {}", window.start_param(), window.end_param());
                self.client.get(&url).query(&[
                    ("startDateTime", window.start_param()),
                    ("endDateTime", window.end_param()),
                ])
            }
        };
        let collection = self.get_collection(request, "Delta query").await?;

        Ok(DeltaPage {
            events: collection.value,
            continuation: collection.next_link,
            resume: collection.delta_link,
        })
    }

    async fn fetch_series_instances(
        &self,
        user_id: &str,
        series_id: &str,
        window: &SyncWindow,
    ) -> Result<EventPage, ProviderError> {
        let url = format!(
            "{}/events/{}/instances",
            self.user_url(user_id),
            urlencoding::encode(series_id)
        );

        let request = self.client.get(&url).query(&[
            ("startDateTime", window.start_param()),
            ("endDateTime", window.end_param()),
        ]);
        let collection = self.get_collection(request, "Series instances").await?;

        Ok(EventPage {
            events: collection.value,
            next_link: collection.next_link,
        })
    }

    async fn fetch_next_page(&self, link: &str) -> Result<EventPage, ProviderError> {
        let collection = self.get_collection(self.client.get(link), "Next page").await?;

        Ok(EventPage {
            events: collection.value,
            next_link: collection.next_link,
        })
    }

    async fn create_event(&self, user_id: &str, event: &GraphEventBody) -> Result<RawEvent, ProviderError> {
        let url = format!("{}/events", self.user_url(user_id));
        tracing::info!("Creating event '{}'", event.subject);

        let created: RawEvent = self
            .execute(self.client.post(&url).json(event), "Create event")
            .await?;
        tracing::info!("Created event {}", created.id);
        Ok(created)
    }
}
