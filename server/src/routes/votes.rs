//! Voting endpoint.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    db::{coins::CoinRepository, votes::VoteRepository},
    error::AppError,
    state::AppState,
    utils::voter_fingerprint,
};

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub slug: String,
    pub votes: i64,
}

/// One vote per voter per coin per day; the unique index in the votes
/// table is the authority, this handler just maps its verdict to HTTP.
/// The vote row and the counter bump commit together.
pub async fn cast_vote(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Json<VoteResponse>, AppError> {
    let coin = CoinRepository::find_by_slug(&state.db, &slug)
        .await?
        .filter(|c| c.approved)
        .ok_or(AppError::NotFound)?;

    let voter = voter_fingerprint(&headers);
    let today = Utc::now().date_naive();

    if !VoteRepository::cast_and_count(&state.db, &coin.slug, &voter, today).await? {
        return Err(AppError::AlreadyVoted);
    }

    // Re-read so the reported total includes concurrent votes too.
    let votes = CoinRepository::find_by_slug(&state.db, &coin.slug)
        .await?
        .map_or(coin.votes + 1, |c| c.votes);

    Ok(Json(VoteResponse {
        slug: coin.slug,
        votes,
    }))
}
