use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;
use uuid::Uuid;

use crate::calendar::{Attendee, Event, Location, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("No user with id {0}")]
    UnknownUser(Uuid),
    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Inserts report whether a row was created; lookups return `None` for a missing row.
pub trait SyncStore {
    fn get_user(&self, user_id: &Uuid) -> Result<Option<User>, StoreError>;
    fn create_user(&self, user_id: &Uuid) -> Result<User, StoreError>;
    fn set_current_cursor(&self, user_id: &Uuid, token: &str) -> Result<(), StoreError>;
    fn insert_event_if_absent(&self, event: &Event) -> Result<bool, StoreError>;
    fn insert_attendee_if_absent(&self, attendee: &Attendee) -> Result<bool, StoreError>;
    fn insert_location_if_absent(&self, location: &Location) -> Result<bool, StoreError>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL UNIQUE,
        current_delta TEXT,
        previous_delta TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        subscription_id TEXT,
        subscription_expires_at TEXT
    );

    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        ical_uid TEXT NOT NULL,
        event_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        locations_count INTEGER NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        is_online INTEGER NOT NULL,
        is_all_day INTEGER NOT NULL,
        is_cancelled INTEGER NOT NULL,
        organizer_user_id TEXT,
        created_time TEXT,
        updated_time TEXT,
        timezone TEXT NOT NULL,
        platform_url TEXT NOT NULL,
        meeting_url TEXT,
        type TEXT NOT NULL,
        is_recurring INTEGER NOT NULL,
        series_master_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (user_id, ical_uid)
    );

    CREATE TABLE IF NOT EXISTS attendees (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        email_address TEXT NOT NULL,
        ical_uid TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (ical_uid, email_address)
    );

    CREATE TABLE IF NOT EXISTS locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ical_uid TEXT NOT NULL,
        display_name TEXT NOT NULL,
        location_uri TEXT,
        address TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (ical_uid, display_name)
    );
";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self::new(Connection::open(path)?);
        store.initialize()?;
        Ok(store)
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn find_event(&self, user_id: &str, ical_uid: &str) -> Result<Option<Event>, StoreError> {
        let event = self
            .conn
            .query_row(
                "SELECT id, user_id, ical_uid, event_id, title, description, locations_count,
                        start_time, end_time, is_online, is_all_day, is_cancelled,
                        organizer_user_id, created_time, updated_time, timezone, platform_url,
                        meeting_url, type, is_recurring, series_master_id, created_at, updated_at
                 FROM events WHERE user_id = ?1 AND ical_uid = ?2",
                params![user_id, ical_uid],
                event_from_row,
            )
            .optional()?;
        Ok(event)
    }

    pub fn find_attendee(&self, ical_uid: &str, email_address: &str) -> Result<Option<Attendee>, StoreError> {
        let attendee = self
            .conn
            .query_row(
                "SELECT id, user_id, name, email_address, ical_uid, created_at, updated_at
                 FROM attendees WHERE ical_uid = ?1 AND email_address = ?2",
                params![ical_uid, email_address],
                |row| {
                    Ok(Attendee {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        name: row.get(2)?,
                        email_address: row.get(3)?,
                        ical_uid: row.get(4)?,
                        created_at: timestamp(row, 5)?,
                        updated_at: timestamp(row, 6)?,
                    })
                },
            )
            .optional()?;
        Ok(attendee)
    }

    pub fn find_location(&self, ical_uid: &str, display_name: &str) -> Result<Option<Location>, StoreError> {
        let location = self
            .conn
            .query_row(
                "SELECT id, ical_uid, display_name, location_uri, address, created_at, updated_at
                 FROM locations WHERE ical_uid = ?1 AND display_name = ?2",
                params![ical_uid, display_name],
                |row| {
                    Ok(Location {
                        id: row.get(0)?,
                        ical_uid: row.get(1)?,
                        display_name: row.get(2)?,
                        location_uri: row.get(3)?,
                        address: row.get(4)?,
                        created_at: timestamp(row, 5)?,
                        updated_at: timestamp(row, 6)?,
                    })
                },
            )
            .optional()?;
        Ok(location)
    }

    pub fn count_rows(&self, table: StoreTable) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    pub fn table_exists(&self, table_name: &str) -> bool {
        let result: rusqlite::Result<i32> = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        );
        result.unwrap_or(0) > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTable {
    Users,
    Events,
    Attendees,
    Locations,
}

impl StoreTable {
    fn name(&self) -> &'static str {
        match self {
            StoreTable::Users => "users",
            StoreTable::Events => "events",
            StoreTable::Attendees => "attendees",
            StoreTable::Locations => "locations",
        }
    }
}

impl SyncStore for Store {
    fn get_user(&self, user_id: &Uuid) -> Result<Option<User>, StoreError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, user_id, current_delta, previous_delta, subscription_id,
                        subscription_expires_at, created_at, updated_at
                 FROM users WHERE user_id = ?1",
                [user_id.to_string()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn create_user(&self, user_id: &Uuid) -> Result<User, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO users (user_id, current_delta, previous_delta, created_at, updated_at)
             VALUES (?1, NULL, NULL, ?2, ?2)
             ON CONFLICT (user_id) DO NOTHING",
            params![user_id.to_string(), now],
        )?;

        self.get_user(user_id)?
            .ok_or(StoreError::UnknownUser(*user_id))
    }

    fn set_current_cursor(&self, user_id: &Uuid, token: &str) -> Result<(), StoreError> {
        // SQLite evaluates every SET expression against the old row, so the
        // outgoing cursor lands in previous_delta.
        let changed = self.conn.execute(
            "UPDATE users
             SET previous_delta = current_delta, current_delta = ?2, updated_at = ?3
             WHERE user_id = ?1",
            params![user_id.to_string(), token, Utc::now().to_rfc3339()],
        )?;

        if changed == 0 {
            return Err(StoreError::UnknownUser(*user_id));
        }
        Ok(())
    }

    fn insert_event_if_absent(&self, event: &Event) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            "INSERT INTO events
                (user_id, ical_uid, event_id, title, description, locations_count,
                 start_time, end_time, is_online, is_all_day, is_cancelled,
                 organizer_user_id, created_time, updated_time, timezone, platform_url,
                 meeting_url, type, is_recurring, series_master_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20, ?21, ?22)
             ON CONFLICT (user_id, ical_uid) DO NOTHING",
            params![
                &event.user_id,
                &event.ical_uid,
                &event.event_id,
                &event.title,
                &event.description,
                event.locations_count,
                &event.start_time,
                &event.end_time,
                event.is_online,
                event.is_all_day,
                event.is_cancelled,
                &event.organizer_user_id,
                &event.created_time,
                &event.updated_time,
                &event.timezone,
                &event.platform_url,
                &event.meeting_url,
                &event.event_type,
                event.is_recurring,
                &event.series_master_id,
                event.created_at.to_rfc3339(),
                event.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted == 1)
    }

    fn insert_attendee_if_absent(&self, attendee: &Attendee) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            "INSERT INTO attendees (user_id, name, email_address, ical_uid, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (ical_uid, email_address) DO NOTHING",
            params![
                &attendee.user_id,
                &attendee.name,
                &attendee.email_address,
                &attendee.ical_uid,
                attendee.created_at.to_rfc3339(),
                attendee.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted == 1)
    }

    fn insert_location_if_absent(&self, location: &Location) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            "INSERT INTO locations (ical_uid, display_name, location_uri, address, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (ical_uid, display_name) DO NOTHING",
            params![
                &location.ical_uid,
                &location.display_name,
                &location.location_uri,
                &location.address,
                location.created_at.to_rfc3339(),
                location.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted == 1)
    }
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw, idx)
}

fn optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| parse_timestamp(&value, idx)).transpose()
}

fn parse_timestamp(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let raw_user_id: String = row.get(1)?;
    let user_id = Uuid::parse_str(&raw_user_id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(User {
        id: row.get(0)?,
        user_id,
        current_delta: row.get(2)?,
        previous_delta: row.get(3)?,
        subscription_id: row.get(4)?,
        subscription_expires_at: optional_timestamp(row, 5)?,
        created_at: timestamp(row, 6)?,
        updated_at: timestamp(row, 7)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        user_id: row.get(1)?,
        ical_uid: row.get(2)?,
        event_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        locations_count: row.get(6)?,
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        is_online: row.get(9)?,
        is_all_day: row.get(10)?,
        is_cancelled: row.get(11)?,
        organizer_user_id: row.get(12)?,
        created_time: row.get(13)?,
        updated_time: row.get(14)?,
        timezone: row.get(15)?,
        platform_url: row.get(16)?,
        meeting_url: row.get(17)?,
        event_type: row.get(18)?,
        is_recurring: row.get(19)?,
        series_master_id: row.get(20)?,
        created_at: timestamp(row, 21)?,
        updated_at: timestamp(row, 22)?,
    })
}
