use serde::{Deserialize, Serialize};

/// Provider-reported event type. Satellites of a series (occurrences and
/// exceptions) are only ever stored through their master's expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SingleInstance,
    Occurrence,
    Exception,
    SeriesMaster,
    Unknown,
}

impl EventKind {
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            None | Some("singleInstance") => EventKind::SingleInstance,
            Some("occurrence") => EventKind::Occurrence,
            Some("exception") => EventKind::Exception,
            Some("seriesMaster") => EventKind::SeriesMaster,
            Some(_) => EventKind::Unknown,
        }
    }

    pub fn is_series_satellite(&self) -> bool {
        matches!(self, EventKind::Occurrence | EventKind::Exception)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEvent {
    pub id: String,
    #[serde(rename = "iCalUId")]
    pub ical_uid: Option<String>,
    pub subject: Option<String>,
    pub body: Option<ItemBody>,
    pub start: Option<DateTimeTimeZone>,
    pub end: Option<DateTimeTimeZone>,
    pub is_online_meeting: Option<bool>,
    pub is_all_day: Option<bool>,
    pub is_cancelled: Option<bool>,
    pub organizer: Option<Recipient>,
    pub created_date_time: Option<String>,
    pub last_modified_date_time: Option<String>,
    pub web_link: Option<String>,
    pub online_meeting: Option<OnlineMeetingInfo>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub series_master_id: Option<String>,
    pub attendees: Vec<RawAttendee>,
    pub locations: Vec<RawLocation>,
    #[serde(rename = "@removed", skip_serializing_if = "Option::is_none")]
    pub removed: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemBody {
    pub content_type: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateTimeTimeZone {
    pub date_time: String,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailAddress {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recipient {
    pub email_address: Option<EmailAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnlineMeetingInfo {
    pub join_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAttendee {
    #[serde(rename = "type")]
    pub attendee_type: Option<String>,
    pub email_address: Option<EmailAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLocation {
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_uri: Option<String>,
    pub address: Option<PhysicalAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicalAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country_or_region: Option<String>,
}

impl PhysicalAddress {
    /// Joins the postal fields with ", ". An address whose fields are all
    /// empty composes to `None` rather than a run of bare separators.
    pub fn compose(&self) -> Option<String> {
        let parts = [
            &self.street,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country_or_region,
        ]
        .map(|field| field.as_deref().unwrap_or("").trim());

        if parts.iter().all(|part| part.is_empty()) {
            return None;
        }

        Some(parts.join(", "))
    }
}

impl RawEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::from_wire(self.event_type.as_deref())
    }

    pub fn natural_key(&self) -> Option<&str> {
        self.ical_uid.as_deref().filter(|uid| !uid.is_empty())
    }

    /// Delta responses mark deleted items with `@removed` and little else.
    pub fn is_removed(&self) -> bool {
        self.removed.is_some()
    }

    pub fn meeting_url(&self) -> Option<&str> {
        self.online_meeting
            .as_ref()
            .and_then(|meeting| meeting.join_url.as_deref())
            .filter(|url| !url.is_empty())
    }

    pub fn organizer_address(&self) -> Option<&str> {
        self.organizer
            .as_ref()
            .and_then(|organizer| organizer.email_address.as_ref())
            .and_then(|email| email.address.as_deref())
    }
}

impl RawAttendee {
    pub fn address(&self) -> Option<&str> {
        self.email_address
            .as_ref()
            .and_then(|email| email.address.as_deref())
            .filter(|address| !address.is_empty())
    }

    pub fn name(&self) -> &str {
        self.email_address
            .as_ref()
            .and_then(|email| email.name.as_deref())
            .unwrap_or("")
    }
}

impl RawLocation {
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn composed_address(&self) -> Option<String> {
        self.address.as_ref().and_then(PhysicalAddress::compose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn address(street: &str, city: &str, state: &str, postal_code: &str, country: &str) -> PhysicalAddress {
        PhysicalAddress {
            street: Some(street.to_string()),
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            postal_code: Some(postal_code.to_string()),
            country_or_region: Some(country.to_string()),
        }
    }

    #[test]
    fn deserializes_graph_event_payload() {
        let payload = r#"{
            "id": "AAMkAGI2",
            "iCalUId": "040000008200E00074C5B7101A82E008",
            "subject": "Planning",
            "body": { "contentType": "html", "content": "<p>Agenda</p>" },
            "start": { "dateTime": "2025-03-10T09:00:00.0000000", "timeZone": "UTC" },
            "end": { "dateTime": "2025-03-10T10:00:00.0000000", "timeZone": "UTC" },
            "isOnlineMeeting": true,
            "isAllDay": false,
            "isCancelled": false,
            "type": "seriesMaster",
            "webLink": "https://outlook.office365.com/owa/?itemid=AAMkAGI2",
            "onlineMeeting": { "joinUrl": "https://teams.microsoft.com/l/meetup-join/abc" },
            "organizer": { "emailAddress": { "name": "Ada", "address": "ada@example.com" } },
            "attendees": [
                { "type": "required", "emailAddress": { "name": "Grace", "address": "grace@example.com" } }
            ],
            "locations": [
                { "displayName": "Room 1", "address": { "street": "1 Main St", "city": "Springfield" } }
            ]
        }"#;

        let event: RawEvent = serde_json::from_str(payload).unwrap();

        assert_eq!(event.natural_key(), Some("040000008200E00074C5B7101A82E008"));
        assert_eq!(event.kind(), EventKind::SeriesMaster);
        assert_eq!(event.meeting_url(), Some("https://teams.microsoft.com/l/meetup-join/abc"));
        assert_eq!(event.organizer_address(), Some("ada@example.com"));
        assert_eq!(event.attendees[0].address(), Some("grace@example.com"));
        assert_eq!(event.locations[0].display_name(), Some("Room 1"));
        assert!(!event.is_removed());
    }

    #[test]
    fn removed_marker_has_no_natural_key() {
        let payload = r#"{ "id": "AAMkAGI3", "@removed": { "reason": "deleted" } }"#;

        let event: RawEvent = serde_json::from_str(payload).unwrap();

        assert!(event.is_removed());
        assert_eq!(event.natural_key(), None);
    }

    #[test]
    fn null_online_meeting_has_no_meeting_url() {
        let payload = r#"{ "id": "a", "iCalUId": "uid-a", "onlineMeeting": null }"#;

        let event: RawEvent = serde_json::from_str(payload).unwrap();

        assert_eq!(event.meeting_url(), None);
    }

    #[test]
    fn event_kind_maps_wire_values() {
        assert_eq!(EventKind::from_wire(None), EventKind::SingleInstance);
        assert_eq!(EventKind::from_wire(Some("occurrence")), EventKind::Occurrence);
        assert_eq!(EventKind::from_wire(Some("exception")), EventKind::Exception);
        assert_eq!(EventKind::from_wire(Some("somethingNew")), EventKind::Unknown);
        assert!(EventKind::Exception.is_series_satellite());
        assert!(!EventKind::SeriesMaster.is_series_satellite());
    }

    #[test]
    fn empty_address_composes_to_none() {
        assert_eq!(address("", "", "", "", "").compose(), None);
        assert_eq!(PhysicalAddress::default().compose(), None);
    }

    #[test]
    fn full_address_is_joined_with_commas() {
        let composed = address("1 Main St", "Springfield", "IL", "62701", "USA").compose();

        assert_eq!(composed.as_deref(), Some("1 Main St, Springfield, IL, 62701, USA"));
    }

    #[test]
    fn location_without_address_has_no_composed_address() {
        let location = RawLocation {
            display_name: Some("Teams".to_string()),
            ..RawLocation::default()
        };

        assert_eq!(location.composed_address(), None);
    }

    proptest! {
        #[test]
        fn any_single_non_empty_field_yields_an_address(
            value in "[A-Za-z0-9][A-Za-z0-9 ]{0,15}",
            slot in 0usize..5,
        ) {
            let mut fields = ["", "", "", "", ""];
            fields[slot] = value.as_str();
            let composed = address(fields[0], fields[1], fields[2], fields[3], fields[4]).compose();

            prop_assert!(composed.is_some());
            prop_assert!(composed.unwrap().contains(value.trim()));
        }
    }
}
