use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::VotingEventState, mongodb::Id};

/// Core voting event data: a time-boxed election for one club's positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingEventCore {
    pub club_id: Id,
    pub title: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    pub state: VotingEventState,
}

impl VotingEventCore {
    /// A new draft event.
    pub fn new(
        club_id: Id,
        title: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            club_id,
            title,
            start_time,
            end_time,
            state: VotingEventState::Draft,
        }
    }

    /// Is the event open for ballots right now?
    pub fn accepts_votes_at(&self, now: DateTime<Utc>) -> bool {
        self.state == VotingEventState::Active && self.start_time <= now && now <= self.end_time
    }
}

/// A voting event without an ID.
pub type NewVotingEvent = VotingEventCore;

/// A voting event from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingEvent {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub event: VotingEventCore,
}

impl Deref for VotingEvent {
    type Target = VotingEventCore;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}

impl DerefMut for VotingEvent {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.event
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use chrono::Duration;

    use super::*;

    impl VotingEventCore {
        /// A draft event currently within its voting window.
        pub fn current_example(club_id: Id) -> Self {
            Self::new(
                club_id,
                "Committee Elections 2024".to_string(),
                Utc::now() - Duration::hours(1),
                Utc::now() + Duration::days(7),
            )
        }

        /// A draft event whose window has already passed.
        pub fn past_example(club_id: Id) -> Self {
            Self::new(
                club_id,
                "Committee Elections 2023".to_string(),
                Utc::now() - Duration::days(8),
                Utc::now() - Duration::days(1),
            )
        }

        /// A draft event whose window has not started.
        pub fn future_example(club_id: Id) -> Self {
            Self::new(
                club_id,
                "Committee Elections 2025".to_string(),
                Utc::now() + Duration::days(30),
                Utc::now() + Duration::days(37),
            )
        }
    }
}
