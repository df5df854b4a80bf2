use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    error::Error as DbError,
    Client, Database,
};
use rocket::{
    fairing::{Fairing, Info, Kind},
    futures::{
        future::{BoxFuture, FutureExt},
        TryStreamExt,
    },
    http::Status,
    tokio::sync::Mutex,
    Build, Rocket,
};

use crate::{
    error::Error,
    model::{
        common::{Notifiable, VotingEventState},
        db::{
            admin::Admin,
            club::{Club, Membership},
            member::Member,
            nomination::Candidate,
            notification::{NewNotification, Notification},
            position::ClubPosition,
            vote::Vote,
            winner::{NewWinnerRecord, WinnerRecord},
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    scheduled_task::ScheduledTask,
};

use super::{
    base::VotingEvent,
    resolve::{resolve_position, Resolution},
    tally::tally_event,
};

/// Manual tie-break choices supplied by an administrator:
/// position ID to the chosen candidate ID.
pub type TieBreaks = HashMap<Id, Id>;

/// A position whose race ended in a tie, surfaced to the operator for a
/// later explicit decision.
#[derive(Debug, Clone)]
pub struct TieNotice {
    pub position_id: Id,
    pub candidate_ids: Vec<Id>,
    pub votes: u64,
}

/// The outcome of closing one voting event.
#[derive(Debug, Clone)]
pub struct CloseReport {
    pub event_id: Id,
    /// True iff the event was already closed and nothing was done.
    pub already_closed: bool,
    /// Winner records written by this close-out.
    pub decided: Vec<NewWinnerRecord>,
    /// Positions left undecided pending manual tie resolution.
    pub ties: Vec<TieNotice>,
}

impl CloseReport {
    fn noop(event_id: Id) -> Self {
        Self {
            event_id,
            already_closed: true,
            decided: Vec::new(),
            ties: Vec::new(),
        }
    }
}

/// The outcome of one event within a sweep.
pub struct SweepOutcome {
    pub event_id: Id,
    pub result: Result<CloseReport, Error>,
}

/// Close one voting event: tally every position, record winners, update
/// position holders, and mark the event closed, all as one atomic unit.
///
/// Concurrent close attempts for the same event serialize through a
/// compare-and-swap on the event state (`Active` -> `Closing`); the loser
/// gets a conflict error. Re-closing an already-closed event is a no-op.
/// On failure every write is rolled back and the event returns to `Active`.
pub async fn close_event(
    db_client: &Client,
    db: &Database,
    event_id: Id,
    tie_breaks: &TieBreaks,
) -> Result<CloseReport, Error> {
    let events = Coll::<VotingEvent>::from_db(db);

    // Take the close guard. Exactly one concurrent caller wins this swap.
    let guard_filter = doc! {
        "_id": event_id,
        "state": VotingEventState::Active,
    };
    let to_closing = doc! {
        "$set": { "state": VotingEventState::Closing },
    };
    let result = events.update_one(guard_filter, to_closing, None).await?;
    if result.modified_count != 1 {
        // Lost the swap, or there was nothing to close; find out which.
        let event = events
            .find_one(event_id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Voting event {event_id}")))?;
        return match event.state {
            VotingEventState::Closed | VotingEventState::Archived => {
                debug!("Voting event {event_id} is already closed; nothing to do");
                Ok(CloseReport::noop(event_id))
            }
            VotingEventState::Closing => {
                Err(Error::already_processing(format!("Voting event {event_id}")))
            }
            _ => Err(Error::Status(
                Status::BadRequest,
                format!("Voting event {event_id} is not active; cannot close"),
            )),
        };
    }

    // The guard just matched the event, so it must exist.
    let event = events
        .find_one(event_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voting event {event_id}")))?;

    match close_guarded(db_client, db, &event, tie_breaks).await {
        Ok(report) => {
            info!(
                "Closed voting event {event_id}: {} decided, {} tied",
                report.decided.len(),
                report.ties.len()
            );
            // Notifications must never undo a committed close-out, so they
            // happen outside the transaction and tolerate failure.
            announce_results(db, &event, &report).await;
            Ok(report)
        }
        Err(err) => {
            // Release the guard so a later attempt can retry.
            let release_filter = doc! {
                "_id": event_id,
                "state": VotingEventState::Closing,
            };
            let to_active = doc! {
                "$set": { "state": VotingEventState::Active },
            };
            if let Err(e) = events.update_one(release_filter, to_active, None).await {
                error!("Failed to release close guard for voting event {event_id}: {e}");
            }
            Err(err)
        }
    }
}

/// The transactional body of the close-out. The caller holds the `Closing`
/// guard and releases it if we fail; an error return rolls back every write.
async fn close_guarded(
    db_client: &Client,
    db: &Database,
    event: &VotingEvent,
    tie_breaks: &TieBreaks,
) -> Result<CloseReport, Error> {
    let positions = Coll::<ClubPosition>::from_db(db);
    let candidates = Coll::<Candidate>::from_db(db);
    let votes = Coll::<Vote>::from_db(db);
    let winners = Coll::<NewWinnerRecord>::from_db(db);
    let memberships = Coll::<Membership>::from_db(db);
    let events = Coll::<VotingEvent>::from_db(db);

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let tallies = tally_event(event, &positions, &candidates, &votes, Some(&mut session)).await?;

    // Decide every position.
    let mut decided = Vec::new();
    let mut ties = Vec::new();
    let mut unused_tie_breaks: HashSet<Id> = tie_breaks.keys().copied().collect();
    for (position_id, group) in tallies {
        if group.is_empty() {
            debug!("Position {position_id} has no approved candidates; skipping");
            continue;
        }
        match resolve_position(&group) {
            Resolution::NoVotes => {
                warn!(
                    "Position {position_id} received no votes in event {}; leaving it vacant",
                    event.id
                );
            }
            Resolution::Winner { candidate, votes } => {
                decided.push(winner_record(event.id, position_id, &candidate, votes, false));
            }
            Resolution::Tie { candidates, votes } => match tie_breaks.get(&position_id) {
                Some(choice) => {
                    unused_tie_breaks.remove(&position_id);
                    let chosen = candidates.iter().find(|c| c.id == *choice).ok_or_else(|| {
                        Error::Status(
                            Status::BadRequest,
                            format!(
                                "Candidate {choice} is not among the tied candidates \
for position {position_id}"
                            ),
                        )
                    })?;
                    decided.push(winner_record(event.id, position_id, chosen, votes, true));
                }
                None => {
                    let candidate_ids: Vec<Id> = candidates.iter().map(|c| c.id).collect();
                    warn!(
                        "Tie in event {} for position {position_id}: {} candidates at {votes} \
votes; awaiting manual resolution",
                        event.id,
                        candidate_ids.len()
                    );
                    ties.push(TieNotice {
                        position_id,
                        candidate_ids,
                        votes,
                    });
                }
            },
        }
    }

    // Every supplied tie-break must have applied to an actual tie; a
    // leftover entry means the admin named a position that was not tied.
    if let Some(position_id) = unused_tie_breaks.into_iter().next() {
        return Err(Error::Status(
            Status::BadRequest,
            format!("Tie-break for position {position_id} does not match a tied race"),
        ));
    }

    // Persist the results and update position holders.
    for record in &decided {
        winners
            .insert_one_with_session(record, None, &mut session)
            .await
            .map_err(|err| winner_insert_error(err, record.position_id))?;
        Membership::assign_position(
            &memberships,
            event.club_id,
            record.member_id,
            record.position_id,
            &mut session,
        )
        .await?;
    }

    // The event reaches its terminal state inside the same transaction.
    let filter = doc! {
        "_id": event.id,
        "state": VotingEventState::Closing,
    };
    let update = doc! {
        "$set": { "state": VotingEventState::Closed },
    };
    let result = events
        .update_one_with_session(filter, update, None, &mut session)
        .await?;
    assert_eq!(result.modified_count, 1); // We hold the guard; nothing else can move it.

    session.commit_transaction().await?;

    Ok(CloseReport {
        event_id: event.id,
        already_closed: false,
        decided,
        ties,
    })
}

/// Resolve a tie left open by a previous close-out: verify the chosen
/// candidate is among the tied leaders, record the winner with the tie flag
/// set, and assign the position, atomically.
pub async fn resolve_tie(
    db_client: &Client,
    db: &Database,
    event_id: Id,
    position_id: Id,
    choice: Id,
) -> Result<NewWinnerRecord, Error> {
    let events = Coll::<VotingEvent>::from_db(db);
    let positions = Coll::<ClubPosition>::from_db(db);
    let candidates = Coll::<Candidate>::from_db(db);
    let votes = Coll::<Vote>::from_db(db);
    let winners = Coll::<NewWinnerRecord>::from_db(db);
    let memberships = Coll::<Membership>::from_db(db);

    let event = events
        .find_one(event_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voting event {event_id}")))?;
    if !matches!(
        event.state,
        VotingEventState::Closed | VotingEventState::Archived
    ) {
        return Err(Error::Status(
            Status::BadRequest,
            format!("Voting event {event_id} is not closed; close it before resolving ties"),
        ));
    }

    let record = {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        // Votes are immutable once the event is closed, so this reproduces
        // the tally the close-out saw.
        let tallies =
            tally_event(&event, &positions, &candidates, &votes, Some(&mut session)).await?;
        let group = tallies
            .get(&position_id)
            .ok_or_else(|| Error::not_found(format!("Position {position_id}")))?;

        let record = match resolve_position(group) {
            Resolution::Tie { candidates, votes } => {
                let chosen = candidates.iter().find(|c| c.id == choice).ok_or_else(|| {
                    Error::Status(
                        Status::BadRequest,
                        format!(
                            "Candidate {choice} is not among the tied candidates \
for position {position_id}"
                        ),
                    )
                })?;
                winner_record(event.id, position_id, chosen, votes, true)
            }
            _ => {
                return Err(Error::Status(
                    Status::BadRequest,
                    format!("Position {position_id} was not tied in event {event_id}"),
                ))
            }
        };

        winners
            .insert_one_with_session(&record, None, &mut session)
            .await
            .map_err(|err| winner_insert_error(err, position_id))?;
        Membership::assign_position(
            &memberships,
            event.club_id,
            record.member_id,
            record.position_id,
            &mut session,
        )
        .await?;

        session.commit_transaction().await?;
        record
    };

    info!("Tie for position {position_id} in event {event_id} resolved manually");
    announce_winner(db, &event, &record).await;
    Ok(record)
}

/// Close every active event whose end time has passed. One event's failure
/// never aborts the sweep; each outcome is reported individually.
pub async fn close_due_events(
    db_client: &Client,
    db: &Database,
) -> Result<Vec<SweepOutcome>, Error> {
    let events = Coll::<VotingEvent>::from_db(db);
    let filter = doc! {
        "state": VotingEventState::Active,
        "end_time": { "$lt": BsonDateTime::now() },
    };
    let due: Vec<VotingEvent> = events.find(filter, None).await?.try_collect().await?;

    let mut outcomes = Vec::with_capacity(due.len());
    for event in due {
        let result = close_event(db_client, db, event.id, &TieBreaks::new()).await;
        if let Err(ref e) = result {
            error!("Sweep failed to close voting event {}: {e}", event.id);
        }
        outcomes.push(SweepOutcome {
            event_id: event.id,
            result,
        });
    }
    Ok(outcomes)
}

fn winner_record(
    event_id: Id,
    position_id: Id,
    candidate: &Candidate,
    votes: u64,
    tied: bool,
) -> NewWinnerRecord {
    NewWinnerRecord {
        event_id,
        position_id,
        candidate_id: candidate.id,
        nomination_id: candidate.nomination_id,
        member_id: candidate.member_id,
        votes,
        tied,
        decided_at: Utc::now(),
    }
}

/// Map a duplicate-key failure on the winner record insert, i.e. a violation
/// of the (event, position) uniqueness constraint, to a conflict.
fn winner_insert_error(err: DbError, position_id: Id) -> Error {
    if is_duplicate_key_error(&err) {
        Error::Status(
            Status::Conflict,
            format!("Position {position_id} has already been decided"),
        )
    } else {
        err.into()
    }
}

/// Record the post-commit notifications for a close-out: one to each winner,
/// and one to every admin per unresolved tie. All failure-tolerant.
async fn announce_results(db: &Database, event: &VotingEvent, report: &CloseReport) {
    for record in &report.decided {
        announce_winner(db, event, record).await;
    }

    if report.ties.is_empty() {
        return;
    }
    let notifications = Coll::<NewNotification>::from_db(db);
    let admins: Vec<Admin> = match Coll::<Admin>::from_db(db).find(None, None).await {
        Ok(cursor) => cursor.try_collect().await.unwrap_or_default(),
        Err(e) => {
            warn!("Failed to load admins for tie notifications: {e}");
            return;
        }
    };
    for tie in &report.ties {
        let position_name = position_name(db, tie.position_id).await;
        let candidate_list = tied_candidate_names(db, &tie.candidate_ids).await;
        for admin in &admins {
            Notification::send(
                &notifications,
                Notifiable::Admin(admin.id),
                format!(
                    "Tie detected in \"{}\" for {position_name}: {candidate_list} \
at {} votes each",
                    event.title, tie.votes
                ),
            )
            .await;
        }
    }
}

async fn announce_winner(db: &Database, event: &VotingEvent, record: &NewWinnerRecord) {
    let notifications = Coll::<NewNotification>::from_db(db);
    let position_name = position_name(db, record.position_id).await;
    let club_name = Coll::<Club>::from_db(db)
        .find_one(event.club_id.as_doc(), None)
        .await
        .ok()
        .flatten()
        .map(|club| club.name.clone())
        .unwrap_or_else(|| "your club".to_string());
    Notification::send(
        &notifications,
        Notifiable::Member(record.member_id),
        format!("You have been elected as {position_name} in {club_name}"),
    )
    .await;
}

/// Tied candidates listed by the display names of the members standing,
/// falling back to the raw ID when a lookup fails.
async fn tied_candidate_names(db: &Database, candidate_ids: &[Id]) -> String {
    let candidates = Coll::<Candidate>::from_db(db);
    let members = Coll::<Member>::from_db(db);
    let mut names = Vec::with_capacity(candidate_ids.len());
    for candidate_id in candidate_ids {
        let name = match candidates
            .find_one(candidate_id.as_doc(), None)
            .await
            .ok()
            .flatten()
        {
            Some(candidate) => members
                .find_one(candidate.member_id.as_doc(), None)
                .await
                .ok()
                .flatten()
                .map(|member| member.display_name.clone()),
            None => None,
        };
        names.push(name.unwrap_or_else(|| candidate_id.to_string()));
    }
    names.join(", ")
}

async fn position_name(db: &Database, position_id: Id) -> String {
    Coll::<ClubPosition>::from_db(db)
        .find_one(position_id.as_doc(), None)
        .await
        .ok()
        .flatten()
        .map(|position| position.name.clone())
        .unwrap_or_else(|| position_id.to_string())
}

/// Map from voting event IDs to their scheduled close tasks.
type TaskMap = HashMap<Id, ScheduledTask<Result<(), Error>>>;

/// Election closers: scheduled tasks that close each active voting event at
/// its end time. An admin close cancels the schedule and runs immediately.
pub struct ElectionClosers {
    tasks: Arc<Mutex<TaskMap>>,
}

impl ElectionClosers {
    /// Create an empty set of election closers.
    pub fn new() -> Self {
        Self {
            tasks: Default::default(),
        }
    }

    /// Does the given event have a close task scheduled?
    pub async fn has_task(&self, event_id: Id) -> bool {
        self.tasks.lock().await.contains_key(&event_id)
    }

    /// Schedule a close task for every active voting event, first recovering
    /// any event orphaned mid-close.
    pub async fn schedule_all_active(
        &self,
        db_client: &Client,
        db: &Database,
    ) -> Result<(), DbError> {
        // No close can be in flight during startup, so an event found in
        // `Closing` was orphaned by a crash and its transaction has rolled
        // back. Return it to `Active` and close it via the normal schedule.
        let orphaned = doc! {
            "state": VotingEventState::Closing,
        };
        let to_active = doc! {
            "$set": { "state": VotingEventState::Active },
        };
        let recovered = Coll::<VotingEvent>::from_db(db)
            .update_many(orphaned, to_active, None)
            .await?;
        if recovered.modified_count > 0 {
            warn!(
                "Recovered {} voting event(s) orphaned mid-close",
                recovered.modified_count
            );
        }

        let filter = doc! {
            "state": VotingEventState::Active,
        };
        let active: Vec<VotingEvent> = Coll::<VotingEvent>::from_db(db)
            .find(filter, None)
            .await?
            .try_collect()
            .await?;
        for event in active {
            self.schedule_event(db_client.clone(), db.clone(), &event)
                .await;
        }
        Ok(())
    }

    /// Schedule a close task for the given event at its end time.
    /// If one already exists, it is rescheduled.
    pub async fn schedule_event(&self, db_client: Client, db: Database, event: &VotingEvent) {
        let closer = Self::closer(event.id, db_client, db, self.tasks.clone());
        let mut tasks_locked = self.tasks.lock().await;
        if let Some(task) = tasks_locked.remove(&event.id) {
            let already_completed = task.cancel().await;
            if already_completed {
                // Don't re-schedule a close that already ran.
                warn!("schedule_event: cancelled a close task that had already completed");
                return;
            }
        }
        tasks_locked.insert(event.id, ScheduledTask::new(closer, event.end_time));
    }

    /// Close the given event now, with the given manual tie-break choices.
    /// Any scheduled task for it is cancelled first; this call then drives
    /// the close itself so the choices apply.
    pub async fn close_now(
        &self,
        db_client: &Client,
        db: &Database,
        event_id: Id,
        tie_breaks: &TieBreaks,
    ) -> Result<CloseReport, Error> {
        let task = self.tasks.lock().await.remove(&event_id);
        if let Some(task) = task {
            // Only the deadline wait is cancelled. A close already in
            // flight keeps running and holds the state guard, in which
            // case close_event below reports the conflict.
            task.cancel().await;
        }
        close_event(db_client, db, event_id, tie_breaks).await
    }

    /// The scheduled close task for one event. Since this is a recursive
    /// async function (it reschedules itself on failure), we must use
    /// `BoxFuture` to avoid an infinitely-recursive state machine.
    fn closer(
        event_id: Id,
        db_client: Client,
        db: Database,
        tasks: Arc<Mutex<TaskMap>>,
    ) -> BoxFuture<'static, Result<(), Error>> {
        async move {
            debug!("Running scheduled close for voting event {event_id}");
            let result = close_event(&db_client, &db, event_id, &TieBreaks::new()).await;
            match result {
                Ok(_) => {
                    tasks.lock().await.remove(&event_id);
                    trace!("Close task completed; removed self from list");
                    Ok(())
                }
                Err(Error::Status(status, msg)) if status == Status::Conflict => {
                    // Someone else is closing this event; leave them to it.
                    debug!("Scheduled close of voting event {event_id} skipped: {msg}");
                    tasks.lock().await.remove(&event_id);
                    Ok(())
                }
                Err(e) => {
                    error!("Scheduled close of voting event {event_id} failed: {e}");
                    // Re-schedule ourselves to retry.
                    let retry = Self::closer(event_id, db_client, db, tasks.clone());
                    const RETRY_INTERVAL_SECONDS: i64 = 300;
                    let retry_time = Utc::now() + Duration::seconds(RETRY_INTERVAL_SECONDS);
                    let mut tasks_locked = tasks.lock().await;
                    tasks_locked.insert(event_id, ScheduledTask::new(retry, retry_time));
                    warn!("Failed close task will be retried in {RETRY_INTERVAL_SECONDS} seconds");
                    Err(e)
                }
            }
        }
        .boxed()
    }
}

impl Default for ElectionClosers {
    fn default() -> Self {
        Self::new()
    }
}

/// A fairing that schedules close tasks for all active voting events during
/// Rocket ignition, and places an `ElectionClosers` into managed state.
/// This fairing depends on the database being available in managed state,
/// and so must be attached after the fairing responsible for that.
pub struct ElectionCloserFairing;

#[rocket::async_trait]
impl Fairing for ElectionCloserFairing {
    fn info(&self) -> Info {
        Info {
            name: "Election Closers",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        info!("Scheduling election closers...");
        let closers = ElectionClosers::new();
        let (db_client, db) = match (rocket.state::<Client>(), rocket.state::<Database>()) {
            (Some(client), Some(db)) => (client, db),
            _ => {
                error!("Database was not available when scheduling election closers");
                return Err(rocket);
            }
        };
        if let Err(e) = closers.schedule_all_active(db_client, db).await {
            error!("Failed to schedule election closers: {e}");
            return Err(rocket);
        }
        info!("...election closers scheduled!");

        rocket = rocket.manage(closers);
        Ok(rocket)
    }
}
