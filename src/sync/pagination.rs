use std::collections::HashSet;

use thiserror::Error;

use crate::calendar::{EventKind, RawEvent};
use crate::storage::SyncStore;
use crate::sync::graph_api::{CalendarProvider, DeltaPage};
use crate::sync::reconcile::{ReconcileReport, Reconciler};
use crate::sync::series::expand_series;
use crate::sync::sync_engine::SyncError;
use crate::sync::window::SyncWindow;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("token repeated after {pages} page(s): {token}")]
    RepeatedToken { token: String, pages: usize },
    #[error("page {page} carried neither a continuation nor a resume token")]
    MissingToken { page: usize },
}

#[derive(Debug, Default)]
pub struct TokenGuard {
    seen: HashSet<String>,
}

impl TokenGuard {
    pub fn new(start: Option<&str>) -> Self {
        let mut guard = Self::default();
        if let Some(token) = start {
            guard.seen.insert(token.to_string());
        }
        guard
    }

    pub fn advance(&mut self, token: &str, pages: usize) -> Result<(), ProtocolViolation> {
        if !self.seen.insert(token.to_string()) {
            return Err(ProtocolViolation::RepeatedToken {
                token: token.to_string(),
                pages,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Skip,
    Expand,
    Reconcile,
}

pub fn classify(event: &RawEvent) -> Disposition {
    match event.kind() {
        kind if kind.is_series_satellite() => Disposition::Skip,
        EventKind::SeriesMaster => Disposition::Expand,
        _ => Disposition::Reconcile,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    Fetching(Option<String>),
    Done(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaOutcome {
    pub resume_token: String,
    pub pages: usize,
    pub report: ReconcileReport,
}

pub struct PaginationDriver<'a, P: CalendarProvider + ?Sized, S: SyncStore + ?Sized> {
    provider: &'a P,
    reconciler: Reconciler<'a, S>,
    user_id: &'a str,
    window: SyncWindow,
}

impl<'a, P: CalendarProvider + ?Sized, S: SyncStore + ?Sized> PaginationDriver<'a, P, S> {
    pub fn new(provider: &'a P, store: &'a S, user_id: &'a str, window: SyncWindow) -> Self {
        Self {
            provider,
            reconciler: Reconciler::new(store, user_id),
            user_id,
            window,
        }
    }

    pub async fn run(mut self, start_token: Option<String>) -> Result<DeltaOutcome, SyncError> {
        let mut guard = TokenGuard::new(start_token.as_deref());
        let mut state = DriverState::Fetching(start_token);
        let mut pages = 0;

        let resume_token = loop {
            let token = match state {
                DriverState::Fetching(token) => token,
                DriverState::Done(resume) => break resume,
            };

            let page = self
                .provider
                .fetch_delta_window(self.user_id, &self.window, token.as_deref())
                .await?;
            pages += 1;
            tracing::debug!("Delta page {} carried {} events", pages, page.events.len());

            self.process_page(&page).await?;
            state = next_state(page, &mut guard, pages)?;
        };

        let report = self.reconciler.report();
        tracing::info!("Delta query finished after {} page(s): {}", pages, report);
        Ok(DeltaOutcome {
            resume_token,
            pages,
            report,
        })
    }

    async fn process_page(&mut self, page: &DeltaPage) -> Result<(), SyncError> {
        for event in &page.events {
            match classify(event) {
                Disposition::Skip => {
                    tracing::debug!("Skipping series satellite {}", event.id);
                }
                Disposition::Expand => {
                    let instances =
                        expand_series(self.provider, self.user_id, event, &self.window).await?;
                    for instance in &instances {
                        match event.natural_key() {
                            Some(master_key) => self.reconciler.reconcile_instance(instance, master_key)?,
                            None => self.reconciler.reconcile(instance)?,
                        };
                    }
                    self.reconciler.reconcile(event)?;
                }
                Disposition::Reconcile => {
                    self.reconciler.reconcile(event)?;
                }
            }
        }
        Ok(())
    }
}

fn next_state(page: DeltaPage, guard: &mut TokenGuard, pages: usize) -> Result<DriverState, ProtocolViolation> {
    match (page.resume, page.continuation) {
        (Some(resume), _) => Ok(DriverState::Done(resume)),
        (None, Some(continuation)) => {
            guard.advance(&continuation, pages)?;
            Ok(DriverState::Fetching(Some(continuation)))
        }
        (None, None) => Err(ProtocolViolation::MissingToken { page: pages }),
    }
}
