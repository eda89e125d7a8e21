//! Poll lifecycle operations.
//!
//! The request/response surface consumed by an API layer: create a poll,
//! cast a vote, close and publish results. Each operation authenticates the
//! actor, runs the precondition chain in a fixed order, and returns a
//! discriminated [`EngineError`] on any failure.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::db::dbclient::DBClient;
use crate::db::model;
use crate::db::schema::{Poll, PollKind, VotingMethod};
use crate::directory::MemberDirectory;
use crate::eligibility::check_eligibility;
use crate::error::{EngineError, EngineResult};
use crate::identity::{derive_identity, IdentityKey, VotePepper};
use crate::roles::{can_manage_polls, Visibility};
use crate::tally::{build_snapshot, ResultsSnapshot};

pub struct CreatePollInput {
    pub org_id: String,
    pub title: String,
    pub description: String,
    pub kind: PollKind,
    pub visibility: Visibility,
    pub voting_method: VotingMethod,
    /// 0–100; only honored at close when `kind` is formal.
    pub quorum_percentage: Option<u8>,
    pub end_time: Option<DateTime<Utc>>,
    pub options: Vec<String>,
}

/// Resolve the actor and require the admin/editor poll-management role in
/// `org_id`. Used by creation and close, which share the same gate.
async fn require_manager(
    directory: &dyn MemberDirectory,
    actor: Option<&str>,
    org_id: &str,
) -> EngineResult<String> {
    let user_id = actor.ok_or(EngineError::Unauthorized)?;

    let profile = directory
        .profile(user_id)
        .await
        .ok_or(EngineError::PermissionDenied)?;

    if profile.org_id != org_id || !can_manage_polls(&profile.role) {
        return Err(EngineError::PermissionDenied);
    }

    Ok(profile.user_id)
}

fn validate_input(input: &CreatePollInput) -> EngineResult<Vec<String>> {
    if input.title.trim().is_empty() {
        return Err(EngineError::Validation("title must not be empty".to_owned()));
    }

    if let Some(quorum) = input.quorum_percentage {
        if quorum > 100 {
            return Err(EngineError::Validation(format!(
                "quorum_percentage must be between 0 and 100; got {}",
                quorum
            )));
        }
    }

    let mut options = Vec::new();
    for (i, label) in input.options.iter().enumerate() {
        let label = label.trim();
        if label.is_empty() {
            return Err(EngineError::Validation(format!("option {} is empty", i + 1)));
        }
        options.push(label.to_owned());
    }

    if options.len() < 2 {
        return Err(EngineError::Validation(format!(
            "a poll requires at least 2 options; got {}",
            options.len()
        )));
    }

    Ok(options)
}

/// Create a poll and its options. The poll is live immediately; there is no
/// draft state.
pub async fn create_poll(
    db: &DBClient,
    directory: &dyn MemberDirectory,
    actor: Option<&str>,
    input: CreatePollInput,
) -> EngineResult<Poll> {
    let creator = require_manager(directory, actor, &input.org_id).await?;
    let options = validate_input(&input)?;

    let poll = model::add_poll(
        db.conn(),
        &input.org_id,
        &creator,
        input.title.trim(),
        &input.description,
        input.kind,
        input.visibility,
        input.voting_method,
        input.quorum_percentage,
        input.end_time,
        &options,
    )
    .await?;

    info!(
        poll_id = poll.id,
        org = %poll.id_org,
        kind = ?poll.kind,
        visibility = ?poll.visibility,
        voting_method = ?poll.voting_method,
        options = poll.options.len(),
        "poll created"
    );

    Ok(poll)
}

pub async fn get_poll(db: &DBClient, poll_id: i64) -> EngineResult<Poll> {
    model::get_poll(db.conn(), poll_id)
        .await?
        .ok_or(EngineError::PollNotFound)
}

pub async fn list_open_polls(db: &DBClient, org_id: &str) -> EngineResult<Vec<Poll>> {
    model::list_open_polls(db.conn(), org_id).await
}

/// Cast the actor's vote on a poll.
///
/// Precondition order: poll exists → poll open → not expired → actor
/// eligible (org, status, role) → option belongs to the poll → identity has
/// not voted yet. The final duplicate check is enforced inside the ledger
/// insert itself, so concurrent submissions for the same identity cannot
/// both land.
pub async fn cast_vote(
    db: &DBClient,
    directory: &dyn MemberDirectory,
    pepper: &VotePepper,
    actor: Option<&str>,
    poll_id: i64,
    option_id: i64,
) -> EngineResult<()> {
    let user_id = actor.ok_or(EngineError::Unauthorized)?;

    let poll = get_poll(db, poll_id).await?;

    if !poll.open {
        return Err(EngineError::PollNotActive);
    }
    if let Some(end) = poll.end_time {
        if end <= Utc::now() {
            return Err(EngineError::PollExpired);
        }
    }

    let profile = directory
        .profile(user_id)
        .await
        .ok_or(EngineError::NotMember)?;

    if let Err(e) = check_eligibility(&profile, &poll) {
        debug!(poll_id, kind = e.kind(), "vote rejected by eligibility resolver");
        return Err(e);
    }

    if !poll.options.iter().any(|o| o.id == option_id) {
        return Err(EngineError::InvalidOption);
    }

    let identity = derive_identity(&poll, user_id, pepper);

    model::add_vote(db.conn(), poll.id, option_id, &identity).await?;

    // Never log the identity key itself; the hash would link anonymous
    // ballots to request logs.
    info!(
        poll_id,
        option_id,
        anonymous = matches!(identity, IdentityKey::Hashed(_)),
        "vote recorded"
    );

    Ok(())
}

/// Close a poll: tally the ledger, evaluate quorum, publish the immutable
/// results snapshot, and move the poll to its terminal state.
pub async fn close_poll(
    db: &DBClient,
    directory: &dyn MemberDirectory,
    actor: Option<&str>,
    poll_id: i64,
) -> EngineResult<ResultsSnapshot> {
    // Authenticate before touching the poll so unauthenticated callers
    // cannot probe which poll ids exist.
    if actor.is_none() {
        return Err(EngineError::Unauthorized);
    }

    let poll = get_poll(db, poll_id).await?;
    require_manager(directory, actor, &poll.id_org).await?;

    if !poll.open {
        return Err(EngineError::PollAlreadyClosed);
    }

    let votes = model::get_votes(db.conn(), poll.id).await?;

    // Eligible-member count is read live at close; the directory decides
    // whether to serve a frozen snapshot instead.
    let eligible = match (poll.kind, poll.quorum_percentage) {
        (PollKind::Formal, Some(_)) => {
            directory
                .eligible_member_count(&poll.id_org, poll.visibility)
                .await
        }
        _ => 0,
    };

    let snapshot = build_snapshot(&poll, &votes, eligible);

    let results_json = serde_json::to_string(&snapshot)
        .map_err(|e| EngineError::Storage(sqlx::Error::Encode(Box::new(e))))?;

    if !model::close_poll(db.conn(), poll.id, &results_json).await? {
        // Lost a race against another close; the published snapshot stands.
        warn!(poll_id, "close raced an earlier close, keeping published results");
        return Err(EngineError::PollAlreadyClosed);
    }

    info!(
        poll_id,
        total = snapshot.total,
        passed = snapshot.passed,
        participation = ?snapshot.participation_percent,
        "poll closed"
    );

    Ok(snapshot)
}
