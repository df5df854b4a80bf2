use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core club position data: an electable office within a club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubPositionCore {
    pub club_id: Id,
    pub name: String,
    /// Inactive positions are retained for history but not contested.
    pub active: bool,
}

/// A club position without an ID.
pub type NewClubPosition = ClubPositionCore;

/// A club position from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClubPosition {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub position: ClubPositionCore,
}

impl Deref for ClubPosition {
    type Target = ClubPositionCore;

    fn deref(&self) -> &Self::Target {
        &self.position
    }
}
