use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::raw_event::{
    DateTimeTimeZone, EmailAddress, ItemBody, PhysicalAddress, RawAttendee, RawLocation,
};

const ATTENDEE_TYPES: &[&str] = &["required", "optional", "resource"];
const PATTERN_TYPES: &[&str] = &[
    "daily",
    "weekly",
    "absoluteMonthly",
    "relativeMonthly",
    "absoluteYearly",
    "relativeYearly",
];
const DAYS_OF_WEEK: &[&str] = &[
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];
const RANGE_TYPES: &[&str] = &["endDate", "noEnd", "numbered"];
const MEETING_PROVIDERS: &[&str] = &[
    "unknown",
    "skypeForBusiness",
    "skypeForConsumer",
    "teamsForBusiness",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NewEventError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Event creation request as accepted from the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewEventRequest {
    pub subject: String,
    pub content: String,
    pub start_time: String,
    pub end_time: String,
    pub time_zone: String,
    pub attendees: Vec<NewAttendee>,
    pub locations: Vec<NewLocation>,
    pub is_recurring: bool,
    pub pattern_type: Option<String>,
    pub pattern_interval: Option<i32>,
    pub pattern_days_of_week: Vec<String>,
    pub recurrence_type: Option<String>,
    pub recurrence_start: Option<String>,
    pub recurrence_end: Option<String>,
    pub is_online_meeting: bool,
    pub online_meeting_provider: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewAttendee {
    pub email_address: String,
    pub name: String,
    pub attendee_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewLocation {
    pub display_name: String,
    pub address: Option<NewAddress>,
    pub default_location: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEventBody {
    pub subject: String,
    pub body: ItemBody,
    pub start: DateTimeTimeZone,
    pub end: DateTimeTimeZone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<PatternedRecurrence>,
    pub attendees: Vec<RawAttendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<RawLocation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<RawLocation>,
    pub is_online_meeting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online_meeting_provider: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternedRecurrence {
    pub pattern: RecurrencePattern,
    pub range: RecurrenceRange,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrencePattern {
    #[serde(rename = "type")]
    pub pattern_type: String,
    pub interval: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub days_of_week: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRange {
    #[serde(rename = "type")]
    pub range_type: String,
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

fn one_of(field: &'static str, value: &str, allowed: &[&str]) -> Result<String, NewEventError> {
    if allowed.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(NewEventError::InvalidValue {
            field,
            value: value.to_string(),
        })
    }
}

fn date_only(field: &'static str, value: Option<&str>) -> Result<String, NewEventError> {
    let value = value.ok_or(NewEventError::MissingField(field))?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|_| NewEventError::InvalidValue {
            field,
            value: value.to_string(),
        })
}

impl NewEventRequest {
    pub fn to_graph_body(&self) -> Result<GraphEventBody, NewEventError> {
        if self.subject.trim().is_empty() {
            return Err(NewEventError::MissingField("subject"));
        }
        if self.start_time.is_empty() {
            return Err(NewEventError::MissingField("start_time"));
        }
        if self.end_time.is_empty() {
            return Err(NewEventError::MissingField("end_time"));
        }

        let attendees = self
            .attendees
            .iter()
            .map(NewAttendee::to_wire)
            .collect::<Result<Vec<_>, _>>()?;

        let locations: Vec<RawLocation> = self.locations.iter().map(NewLocation::to_wire).collect();
        let primary = self
            .locations
            .iter()
            .position(|location| location.default_location)
            .unwrap_or(0);
        let location = locations.get(primary).cloned();

        let recurrence = if self.is_recurring {
            Some(self.recurrence()?)
        } else {
            None
        };

        let online_meeting_provider = match (&self.online_meeting_provider, self.is_online_meeting) {
            (Some(provider), true) => Some(one_of("online_meeting_provider", provider, MEETING_PROVIDERS)?),
            _ => None,
        };

        Ok(GraphEventBody {
            subject: self.subject.clone(),
            body: ItemBody {
                content_type: Some("html".to_string()),
                content: Some(self.content.clone()),
            },
            start: self.date_time(&self.start_time),
            end: self.date_time(&self.end_time),
            recurrence,
            attendees,
            location,
            locations: if locations.len() > 1 { locations } else { Vec::new() },
            is_online_meeting: self.is_online_meeting,
            online_meeting_provider,
        })
    }

    fn date_time(&self, value: &str) -> DateTimeTimeZone {
        DateTimeTimeZone {
            date_time: value.to_string(),
            time_zone: Some(self.time_zone.clone()).filter(|zone| !zone.is_empty()),
        }
    }

    fn recurrence(&self) -> Result<PatternedRecurrence, NewEventError> {
        let pattern_type = self
            .pattern_type
            .as_deref()
            .ok_or(NewEventError::MissingField("pattern_type"))?;
        let interval = self.pattern_interval.unwrap_or(1);
        if interval < 1 {
            return Err(NewEventError::InvalidValue {
                field: "pattern_interval",
                value: interval.to_string(),
            });
        }
        let days_of_week = self
            .pattern_days_of_week
            .iter()
            .map(|day| one_of("pattern_days_of_week", day, DAYS_OF_WEEK))
            .collect::<Result<Vec<_>, _>>()?;

        let range_type = self
            .recurrence_type
            .as_deref()
            .ok_or(NewEventError::MissingField("recurrence_type"))?;
        let range_type = one_of("recurrence_type", range_type, RANGE_TYPES)?;
        let end_date = if range_type == "endDate" {
            Some(date_only("recurrence_end", self.recurrence_end.as_deref())?)
        } else {
            None
        };

        Ok(PatternedRecurrence {
            pattern: RecurrencePattern {
                pattern_type: one_of("pattern_type", pattern_type, PATTERN_TYPES)?,
                interval,
                days_of_week,
            },
            range: RecurrenceRange {
                range_type,
                start_date: date_only("recurrence_start", self.recurrence_start.as_deref())?,
                end_date,
            },
        })
    }
}

impl NewAttendee {
    fn to_wire(&self) -> Result<RawAttendee, NewEventError> {
        if self.email_address.is_empty() {
            return Err(NewEventError::MissingField("attendees.email_address"));
        }

        Ok(RawAttendee {
            attendee_type: Some(one_of("attendees.attendee_type", &self.attendee_type, ATTENDEE_TYPES)?),
            email_address: Some(EmailAddress {
                name: Some(self.name.clone()),
                address: Some(self.email_address.clone()),
            }),
        })
    }
}

impl NewLocation {
    fn to_wire(&self) -> RawLocation {
        RawLocation {
            display_name: Some(self.display_name.clone()),
            address: self.address.as_ref().map(|address| PhysicalAddress {
                street: Some(address.street.clone()),
                city: Some(address.city.clone()),
                state: Some(address.state.clone()),
                postal_code: Some(address.postal_code.clone()),
                country_or_region: Some(address.country.clone()),
            }),
            location_type: self.default_location.then(|| "default".to_string()),
            ..RawLocation::default()
        }
    }
}
