use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    admin::{Admin, NewAdmin},
    club::{Club, Membership, NewClub, NewMembership},
    member::{Member, NewMember},
    nomination::{Candidate, NewCandidate, NewNomination, Nomination},
    notification::{NewNotification, Notification},
    position::{ClubPosition, NewClubPosition},
    vote::{NewVote, Vote},
    voting_event::{NewVotingEvent, VotingEvent},
    winner::{NewWinnerRecord, WinnerRecord},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// Admin collection.
const ADMINS: &str = "admins";
impl MongoCollection for Admin {
    const NAME: &'static str = ADMINS;
}
impl MongoCollection for NewAdmin {
    const NAME: &'static str = ADMINS;
}

// Member collection.
const MEMBERS: &str = "members";
impl MongoCollection for Member {
    const NAME: &'static str = MEMBERS;
}
impl MongoCollection for NewMember {
    const NAME: &'static str = MEMBERS;
}

// Club and membership collections.
const CLUBS: &str = "clubs";
impl MongoCollection for Club {
    const NAME: &'static str = CLUBS;
}
impl MongoCollection for NewClub {
    const NAME: &'static str = CLUBS;
}
const MEMBERSHIPS: &str = "memberships";
impl MongoCollection for Membership {
    const NAME: &'static str = MEMBERSHIPS;
}
impl MongoCollection for NewMembership {
    const NAME: &'static str = MEMBERSHIPS;
}

// Club position collection.
const POSITIONS: &str = "positions";
impl MongoCollection for ClubPosition {
    const NAME: &'static str = POSITIONS;
}
impl MongoCollection for NewClubPosition {
    const NAME: &'static str = POSITIONS;
}

// Nomination and candidate collections.
const NOMINATIONS: &str = "nominations";
impl MongoCollection for Nomination {
    const NAME: &'static str = NOMINATIONS;
}
impl MongoCollection for NewNomination {
    const NAME: &'static str = NOMINATIONS;
}
const CANDIDATES: &str = "candidates";
impl MongoCollection for Candidate {
    const NAME: &'static str = CANDIDATES;
}
impl MongoCollection for NewCandidate {
    const NAME: &'static str = CANDIDATES;
}

// Voting event collection.
const VOTING_EVENTS: &str = "voting_events";
impl MongoCollection for VotingEvent {
    const NAME: &'static str = VOTING_EVENTS;
}
impl MongoCollection for NewVotingEvent {
    const NAME: &'static str = VOTING_EVENTS;
}

// Vote collection.
const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for NewVote {
    const NAME: &'static str = VOTES;
}

// Winner record collection.
const WINNER_RECORDS: &str = "winner_records";
impl MongoCollection for WinnerRecord {
    const NAME: &'static str = WINNER_RECORDS;
}
impl MongoCollection for NewWinnerRecord {
    const NAME: &'static str = WINNER_RECORDS;
}

// Notification collection.
const NOTIFICATIONS: &str = "notifications";
impl MongoCollection for Notification {
    const NAME: &'static str = NOTIFICATIONS;
}
impl MongoCollection for NewNotification {
    const NAME: &'static str = NOTIFICATIONS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Admin collection.
    let admin_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<Admin>::from_db(db)
        .create_index(admin_index, None)
        .await?;

    // Member collection.
    let member_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<Member>::from_db(db)
        .create_index(member_index, None)
        .await?;

    // Membership collection: one pivot row per (club, member).
    let membership_index = IndexModel::builder()
        .keys(doc! {"club_id": 1, "member_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Membership>::from_db(db)
        .create_index(membership_index, None)
        .await?;

    // Vote collection: one ballot per (event, voter, position).
    let vote_index = IndexModel::builder()
        .keys(doc! {"event_id": 1, "voter_id": 1, "position_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // Winner record collection: at most one result per (event, position).
    let winner_index = IndexModel::builder()
        .keys(doc! {"event_id": 1, "position_id": 1})
        .options(unique)
        .build();
    Coll::<WinnerRecord>::from_db(db)
        .create_index(winner_index, None)
        .await?;

    Ok(())
}
