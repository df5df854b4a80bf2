use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime},
    error::Error as DbError,
    options::UpdateOptions,
    ClientSession,
};
use serde::{Deserialize, Serialize};

use crate::model::{common::MembershipStatus, mongodb::Coll, mongodb::Id};

/// Core club data. Club administration is out of scope; everything else
/// hangs off the club by reference.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubCore {
    pub name: String,
}

/// A club without an ID.
pub type NewClub = ClubCore;

/// A club from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Club {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub club: ClubCore,
}

impl Deref for Club {
    type Target = ClubCore;

    fn deref(&self) -> &Self::Target {
        &self.club
    }
}

/// Core membership data: the club-member pivot, including the position the
/// member currently holds (if any). This is the Position Holder record.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipCore {
    pub club_id: Id,
    pub member_id: Id,
    pub status: MembershipStatus,
    pub position_id: Option<Id>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub joined_at: DateTime<Utc>,
}

impl MembershipCore {
    /// A fresh active membership with no position.
    pub fn new(club_id: Id, member_id: Id) -> Self {
        Self {
            club_id,
            member_id,
            status: MembershipStatus::Active,
            position_id: None,
            joined_at: Utc::now(),
        }
    }
}

/// A membership without an ID.
pub type NewMembership = MembershipCore;

/// A membership from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Membership {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub membership: MembershipCore,
}

impl Deref for Membership {
    type Target = MembershipCore;

    fn deref(&self) -> &Self::Target {
        &self.membership
    }
}

impl DerefMut for Membership {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.membership
    }
}

impl Membership {
    /// Make the given member the holder of the given position within the club.
    ///
    /// This is an upsert against the club-member pivot: an existing
    /// membership has its position overwritten; a missing one is created
    /// active and holding the position. Runs inside the caller's session so
    /// it commits or rolls back with the rest of the close-out.
    pub async fn assign_position(
        memberships: &Coll<Membership>,
        club_id: Id,
        member_id: Id,
        position_id: Id,
        session: &mut ClientSession,
    ) -> Result<(), DbError> {
        let filter = doc! {
            "club_id": club_id,
            "member_id": member_id,
        };
        let update = doc! {
            "$set": {
                "position_id": position_id,
            },
            "$setOnInsert": {
                "club_id": club_id,
                "member_id": member_id,
                "status": MembershipStatus::Active,
                "joined_at": Bson::DateTime(BsonDateTime::now()),
            },
        };
        let options = UpdateOptions::builder().upsert(true).build();
        memberships
            .update_one_with_session(filter, update, options, session)
            .await?;
        Ok(())
    }
}
