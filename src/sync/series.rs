use crate::calendar::RawEvent;
use crate::sync::graph_api::CalendarProvider;
use crate::sync::pagination::TokenGuard;
use crate::sync::sync_engine::SyncError;
use crate::sync::window::SyncWindow;

pub async fn expand_series<P: CalendarProvider + ?Sized>(
    provider: &P,
    user_id: &str,
    master: &RawEvent,
    window: &SyncWindow,
) -> Result<Vec<RawEvent>, SyncError> {
    let mut page = provider
        .fetch_series_instances(user_id, &master.id, window)
        .await?;
    let mut instances = std::mem::take(&mut page.events);
    let mut guard = TokenGuard::new(None);
    let mut pages = 1;

    while let Some(link) = page.next_link.take() {
        guard.advance(&link, pages)?;
        page = provider.fetch_next_page(&link).await?;
        pages += 1;
        instances.append(&mut page.events);
    }

    tracing::debug!(
        "Expanded series {} into {} instance(s) over {} page(s)",
        master.id,
        instances.len(),
        pages
    );
    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::graph_api::EventPage;
    use crate::sync::pagination::ProtocolViolation;
    use crate::sync::test_support::{ScriptedProvider, raw_event, test_window};

    #[tokio::test]
    async fn expansion_returns_instances_of_the_master() {
        let master = raw_event("uid-master", Some("seriesMaster"));
        let provider = ScriptedProvider::new().with_instances(
            "instance-uid-master",
            vec![raw_event("uid-o1", Some("occurrence")), raw_event("uid-x1", Some("exception"))],
        );

        let instances = expand_series(&provider, "user-1", &master, &test_window())
            .await
            .unwrap();

        let keys: Vec<_> = instances.iter().filter_map(|e| e.natural_key()).collect();
        assert_eq!(keys, vec!["uid-o1", "uid-x1"]);
    }

    #[tokio::test]
    async fn expansion_follows_next_links() {
        let master = raw_event("uid-master", Some("seriesMaster"));
        let provider = ScriptedProvider::new()
            .with_instance_page(
                "instance-uid-master",
                EventPage {
                    events: vec![raw_event("uid-o1", Some("occurrence"))],
                    next_link: Some("next-1".to_string()),
                },
            )
            .with_linked_page(
                "next-1",
                EventPage {
                    events: vec![raw_event("uid-o2", Some("occurrence"))],
                    next_link: None,
                },
            );

        let instances = expand_series(&provider, "user-1", &master, &test_window())
            .await
            .unwrap();

        assert_eq!(instances.len(), 2);
        assert_eq!(provider.next_page_calls(), vec!["next-1".to_string()]);
    }

    #[tokio::test]
    async fn repeated_instances_link_is_a_protocol_violation() {
        let master = raw_event("uid-master", Some("seriesMaster"));
        let looping = EventPage {
            events: vec![],
            next_link: Some("next-1".to_string()),
        };
        let provider = ScriptedProvider::new()
            .with_instance_page("instance-uid-master", looping.clone())
            .with_linked_page("next-1", looping);

        let result = expand_series(&provider, "user-1", &master, &test_window()).await;

        assert!(matches!(
            result,
            Err(SyncError::ProtocolError(ProtocolViolation::RepeatedToken { .. }))
        ));
    }

    #[tokio::test]
    async fn provider_error_aborts_the_expansion() {
        let master = raw_event("uid-unknown", Some("seriesMaster"));
        let provider = ScriptedProvider::new();

        let result = expand_series(&provider, "user-1", &master, &test_window()).await;

        assert!(matches!(result, Err(SyncError::ApiError(_))));
    }
}
