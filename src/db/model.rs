use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tokio_stream::StreamExt;

use crate::db::schema::{Poll, PollKind, PollOption, Vote, VotingMethod};
use crate::error::{EngineError, EngineResult};
use crate::identity::IdentityKey;
use crate::roles::Visibility;

fn poll_from_row(row: SqliteRow) -> Result<Poll, sqlx::Error> {
    let final_results = match row.try_get::<Option<String>, _>("final_results")? {
        None => None,
        Some(json) => {
            Some(serde_json::from_str(&json).map_err(|e| sqlx::Error::Decode(Box::new(e)))?)
        }
    };

    Ok(Poll {
        id: row.try_get("id")?,
        time_created: row.try_get("time_created")?,
        id_org: row.try_get("id_org")?,
        id_created_by: row.try_get("id_created_by")?,
        open: row.try_get("open")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        kind: row.try_get("kind")?,
        visibility: row.try_get("visibility")?,
        voting_method: row.try_get("voting_method")?,
        quorum_percentage: row
            .try_get::<Option<i64>, _>("quorum_percentage")?
            .and_then(|v| u8::try_from(v).ok()),
        end_time: row.try_get("end_time")?,
        final_results,
        options: Vec::new(),
    })
}

async fn get_poll_options(conn: &SqlitePool, id_poll: i64) -> EngineResult<Vec<PollOption>> {
    let mut stream = sqlx::query(
        "SELECT id, id_poll, label, display_order FROM poll_option
         WHERE id_poll = ?1 ORDER BY display_order;",
    )
    .bind(id_poll)
    .try_map(|row: SqliteRow| {
        Ok(PollOption {
            id_poll: row.try_get("id_poll")?,
            id: row.try_get("id")?,
            label: row.try_get("label")?,
            display_order: row.try_get("display_order")?,
        })
    })
    .fetch(conn);

    let mut options = Vec::new();
    while let Some(opt) = stream.try_next().await? {
        options.push(opt);
    }

    Ok(options)
}

pub async fn get_poll(conn: &SqlitePool, id: i64) -> EngineResult<Option<Poll>> {
    let row = sqlx::query("SELECT * FROM poll WHERE id = ?1;")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    let mut poll = match row {
        None => return Ok(None),
        Some(row) => poll_from_row(row)?,
    };

    poll.options = get_poll_options(conn, poll.id).await?;

    Ok(Some(poll))
}

pub async fn list_open_polls(conn: &SqlitePool, id_org: &str) -> EngineResult<Vec<Poll>> {
    let rows = sqlx::query("SELECT * FROM poll WHERE id_org = ?1 AND open = TRUE;")
        .bind(id_org)
        .fetch_all(conn)
        .await?;

    let mut result = Vec::new();
    for row in rows {
        let mut poll = poll_from_row(row)?;
        poll.options = get_poll_options(conn, poll.id).await?;
        result.push(poll);
    }

    Ok(result)
}

pub async fn add_poll(
    conn: &SqlitePool,
    id_org: &str,
    id_created_by: &str,
    title: &str,
    description: &str,
    kind: PollKind,
    visibility: Visibility,
    voting_method: VotingMethod,
    quorum_percentage: Option<u8>,
    end_time: Option<DateTime<Utc>>,
    options: &[String],
) -> EngineResult<Poll> {
    let time_created = Utc::now();

    let mut tx = conn.begin().await?;

    let row = sqlx::query(
        "INSERT INTO poll (time_created, id_org, id_created_by, open, title, description,
                           kind, visibility, voting_method, quorum_percentage, end_time, final_results)
         VALUES (?1, ?2, ?3, TRUE, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL)
         RETURNING id;",
    )
    .bind(time_created)
    .bind(id_org)
    .bind(id_created_by)
    .bind(title)
    .bind(description)
    .bind(kind)
    .bind(visibility)
    .bind(voting_method)
    .bind(quorum_percentage.map(i64::from))
    .bind(end_time)
    .fetch_one(&mut *tx)
    .await?;

    let id_poll: i64 = row.try_get("id")?;

    let mut opt_result = Vec::new();

    for (order, label) in options.iter().enumerate() {
        let option_row = sqlx::query(
            "INSERT INTO poll_option (id_poll, label, display_order)
             VALUES (?1, ?2, ?3)
             RETURNING id;",
        )
        .bind(id_poll)
        .bind(label)
        .bind(order as i64)
        .fetch_one(&mut *tx)
        .await?;

        opt_result.push(PollOption {
            id_poll,
            id: option_row.try_get("id")?,
            label: label.clone(),
            display_order: order as i64,
        });
    }

    tx.commit().await?;

    Ok(Poll {
        id: id_poll,
        time_created,
        id_org: id_org.to_owned(),
        id_created_by: id_created_by.to_owned(),
        open: true,
        title: title.to_owned(),
        description: description.to_owned(),
        kind,
        visibility,
        voting_method,
        quorum_percentage,
        end_time,
        final_results: None,
        options: opt_result,
    })
}

/// Append one vote row for `(id_poll, identity)`.
///
/// The statement only inserts while the poll row is still open, so the open
/// check and the insert are one atomic operation: a vote racing a close
/// inserts nothing, and a concurrent duplicate loses against the ledger's
/// uniqueness constraint and surfaces as `AlreadyVoted`.
pub async fn add_vote(
    conn: &SqlitePool,
    id_poll: i64,
    id_option: i64,
    identity: &IdentityKey,
) -> EngineResult<()> {
    let (id_member, hashed_identifier) = match identity {
        IdentityKey::Member(m) => (Some(m.as_str()), None),
        IdentityKey::Hashed(h) => (None, Some(h.as_str())),
    };

    let result = sqlx::query(
        "INSERT INTO vote (id_poll, id_option, id_member, hashed_identifier, time_created)
         SELECT ?1, ?2, ?3, ?4, ?5
         WHERE EXISTS (SELECT 1 FROM poll WHERE id = ?1 AND open = TRUE);",
    )
    .bind(id_poll)
    .bind(id_option)
    .bind(id_member)
    .bind(hashed_identifier)
    .bind(Utc::now())
    .execute(conn)
    .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => Err(EngineError::PollNotActive),
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(EngineError::AlreadyVoted),
        Err(e) => Err(e.into()),
    }
}

pub async fn get_votes(conn: &SqlitePool, id_poll: i64) -> EngineResult<Vec<Vote>> {
    let mut stream = sqlx::query(
        "SELECT id_poll, id_option, id_member, hashed_identifier, time_created
         FROM vote WHERE id_poll = ?1;",
    )
    .bind(id_poll)
    .try_map(|row: SqliteRow| {
        Ok(Vote {
            id_poll: row.try_get("id_poll")?,
            id_option: row.try_get("id_option")?,
            id_member: row.try_get("id_member")?,
            hashed_identifier: row.try_get("hashed_identifier")?,
            time_created: row.try_get("time_created")?,
        })
    })
    .fetch(conn);

    let mut votes = Vec::new();
    while let Some(vote) = stream.try_next().await? {
        votes.push(vote);
    }

    Ok(votes)
}

/// Close a poll and publish its results, if it is still open.
///
/// Returns `false` when the poll was already closed; the conditional UPDATE
/// means a previously published snapshot can never be overwritten.
pub async fn close_poll(conn: &SqlitePool, id_poll: i64, results_json: &str) -> EngineResult<bool> {
    let result = sqlx::query(
        "UPDATE poll SET open = FALSE, final_results = ?2
         WHERE id = ?1 AND open = TRUE;",
    )
    .bind(id_poll)
    .bind(results_json)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
