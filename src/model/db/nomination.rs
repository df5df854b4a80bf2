use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    error::Error as DbError,
};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{CandidateStatus, NominationStatus},
    mongodb::{Coll, Id},
};

/// Core nomination period data: a time-boxed window during which members
/// apply to contest a club's positions.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominationCore {
    pub club_id: Id,
    pub title: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    pub status: NominationStatus,
}

/// A nomination period without an ID.
pub type NewNomination = NominationCore;

/// A nomination period from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Nomination {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub nomination: NominationCore,
}

impl Deref for Nomination {
    type Target = NominationCore;

    fn deref(&self) -> &Self::Target {
        &self.nomination
    }
}

impl Nomination {
    /// Flip every active nomination past its end time to closed.
    /// Returns how many were flipped. The election closer does not depend on
    /// this having run; it reads approved candidates regardless of
    /// nomination status.
    pub async fn close_expired(nominations: &Coll<Nomination>) -> Result<u64, DbError> {
        let filter = doc! {
            "status": NominationStatus::Active,
            "end_time": { "$lt": BsonDateTime::now() },
        };
        let update = doc! {
            "$set": { "status": NominationStatus::Closed },
        };
        let result = nominations.update_many(filter, update, None).await?;
        Ok(result.modified_count)
    }
}

/// Core candidate data: one member's application to contest one position,
/// made during a nomination period. Only approved candidates are eligible
/// to receive votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub nomination_id: Id,
    /// Denormalized from the nomination so eligibility lookups are one query.
    pub club_id: Id,
    pub member_id: Id,
    pub position_id: Id,
    pub status: CandidateStatus,
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}
