use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::raw_event::{RawAttendee, RawEvent, RawLocation};

/// One calendar occurrence as held by the local store. `ical_uid` is the
/// natural key; `event_id` is the provider's mutable per-instance id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Option<i64>,
    pub user_id: String,
    pub ical_uid: String,
    pub event_id: String,
    pub title: String,
    pub description: String,
    pub locations_count: i64,
    pub start_time: String,
    pub end_time: String,
    pub is_online: bool,
    pub is_all_day: bool,
    pub is_cancelled: bool,
    pub organizer_user_id: Option<String>,
    pub created_time: Option<String>,
    pub updated_time: Option<String>,
    pub timezone: String,
    pub platform_url: String,
    pub meeting_url: Option<String>,
    pub event_type: String,
    pub is_recurring: bool,
    pub series_master_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: Option<i64>,
    pub user_id: String,
    pub name: String,
    pub email_address: String,
    pub ical_uid: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: Option<i64>,
    pub ical_uid: String,
    pub display_name: String,
    pub location_uri: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn from_raw(user_id: &str, natural_key: &str, raw: &RawEvent, now: DateTime<Utc>) -> Self {
        let start = raw.start.as_ref();
        let end = raw.end.as_ref();

        Self {
            id: None,
            user_id: user_id.to_string(),
            ical_uid: natural_key.to_string(),
            event_id: raw.id.clone(),
            title: raw.subject.clone().unwrap_or_default(),
            description: raw
                .body
                .as_ref()
                .and_then(|body| body.content.clone())
                .unwrap_or_default(),
            locations_count: raw.locations.len() as i64,
            start_time: start.map(|s| s.date_time.clone()).unwrap_or_default(),
            end_time: end.map(|e| e.date_time.clone()).unwrap_or_default(),
            is_online: raw.is_online_meeting.unwrap_or(false),
            is_all_day: raw.is_all_day.unwrap_or(false),
            is_cancelled: raw.is_cancelled.unwrap_or(false),
            organizer_user_id: raw.organizer_address().map(str::to_string),
            created_time: raw.created_date_time.clone(),
            updated_time: raw.last_modified_date_time.clone(),
            timezone: start
                .and_then(|s| s.time_zone.clone())
                .unwrap_or_default(),
            platform_url: raw.web_link.clone().unwrap_or_default(),
            meeting_url: raw.meeting_url().map(str::to_string),
            event_type: raw
                .event_type
                .clone()
                .unwrap_or_else(|| "singleInstance".to_string()),
            is_recurring: raw.series_master_id.is_some(),
            series_master_id: raw.series_master_id.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Points the event at its series master by the master's natural key.
    pub fn in_series(mut self, master_key: &str) -> Self {
        self.is_recurring = true;
        self.series_master_id = Some(master_key.to_string());
        self
    }
}

impl Attendee {
    /// Returns `None` when the attendee has no email address to key on.
    pub fn from_raw(
        user_id: &str,
        natural_key: &str,
        raw: &RawAttendee,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let email_address = raw.address()?;

        Some(Self {
            id: None,
            user_id: user_id.to_string(),
            name: raw.name().to_string(),
            email_address: email_address.to_string(),
            ical_uid: natural_key.to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}

impl Location {
    /// Returns `None` when the location has no display name to key on.
    pub fn from_raw(natural_key: &str, raw: &RawLocation, now: DateTime<Utc>) -> Option<Self> {
        let display_name = raw.display_name()?;

        Some(Self {
            id: None,
            ical_uid: natural_key.to_string(),
            display_name: display_name.to_string(),
            location_uri: raw.location_uri.clone().filter(|uri| !uri.is_empty()),
            address: raw.composed_address(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::raw_event::{
        DateTimeTimeZone, EmailAddress, OnlineMeetingInfo, PhysicalAddress,
    };

    fn create_raw_event() -> RawEvent {
        RawEvent {
            id: "instance-1".to_string(),
            ical_uid: Some("uid-1".to_string()),
            subject: Some("Standup".to_string()),
            start: Some(DateTimeTimeZone {
                date_time: "2025-03-10T09:00:00.0000000".to_string(),
                time_zone: Some("Pacific Standard Time".to_string()),
            }),
            end: Some(DateTimeTimeZone {
                date_time: "2025-03-10T09:15:00.0000000".to_string(),
                time_zone: Some("Pacific Standard Time".to_string()),
            }),
            series_master_id: Some("master-1".to_string()),
            event_type: Some("occurrence".to_string()),
            ..RawEvent::default()
        }
    }

    #[test]
    fn event_from_raw_copies_provider_fields() {
        let now = Utc::now();
        let event = Event::from_raw("user-1", "uid-1", &create_raw_event(), now);

        assert_eq!(event.ical_uid, "uid-1");
        assert_eq!(event.event_id, "instance-1");
        assert_eq!(event.title, "Standup");
        assert_eq!(event.timezone, "Pacific Standard Time");
        assert_eq!(event.event_type, "occurrence");
        assert!(event.is_recurring);
        assert_eq!(event.series_master_id.as_deref(), Some("master-1"));
        assert_eq!(event.meeting_url, None);
        assert_eq!(event.created_at, now);
    }

    #[test]
    fn series_reference_uses_master_natural_key() {
        let event = Event::from_raw("user-1", "uid-1", &create_raw_event(), Utc::now())
            .in_series("uid-master");

        assert!(event.is_recurring);
        assert_eq!(event.series_master_id.as_deref(), Some("uid-master"));
        assert_eq!(event.event_id, "instance-1");
    }

    #[test]
    fn event_from_raw_takes_join_url_when_present() {
        let mut raw = create_raw_event();
        raw.online_meeting = Some(OnlineMeetingInfo {
            join_url: Some("https://teams.example/join".to_string()),
        });

        let event = Event::from_raw("user-1", "uid-1", &raw, Utc::now());

        assert_eq!(event.meeting_url.as_deref(), Some("https://teams.example/join"));
    }

    #[test]
    fn attendee_without_email_is_skipped() {
        let raw = RawAttendee {
            attendee_type: Some("required".to_string()),
            email_address: Some(EmailAddress {
                name: Some("Nobody".to_string()),
                address: None,
            }),
        };

        assert!(Attendee::from_raw("user-1", "uid-1", &raw, Utc::now()).is_none());
    }

    #[test]
    fn location_keeps_composed_address() {
        let raw = RawLocation {
            display_name: Some("HQ".to_string()),
            location_uri: Some(String::new()),
            address: Some(PhysicalAddress {
                city: Some("Oslo".to_string()),
                ..PhysicalAddress::default()
            }),
            ..RawLocation::default()
        };

        let location = Location::from_raw("uid-1", &raw, Utc::now()).unwrap();

        assert_eq!(location.display_name, "HQ");
        assert_eq!(location.location_uri, None);
        assert_eq!(location.address.as_deref(), Some(", Oslo, , , "));
    }
}
