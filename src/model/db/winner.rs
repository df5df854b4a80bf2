use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core winner record data: the persisted outcome of one position's
/// election within one voting event.
///
/// Written exclusively by the election closer (including its post-hoc tie
/// resolution path); the unique index on (event, position) makes double
/// processing impossible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecordCore {
    pub event_id: Id,
    pub position_id: Id,
    pub candidate_id: Id,
    pub nomination_id: Id,
    pub member_id: Id,
    /// Vote count at the time of resolution.
    pub votes: u64,
    /// True iff this result required manual tie resolution; preserved for
    /// the audit history.
    pub tied: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub decided_at: DateTime<Utc>,
}

/// A winner record without an ID.
pub type NewWinnerRecord = WinnerRecordCore;

/// A winner record from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinnerRecord {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub record: WinnerRecordCore,
}

impl Deref for WinnerRecord {
    type Target = WinnerRecordCore;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}
