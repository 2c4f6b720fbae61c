//! Admin endpoints: listing review, metadata edits, promoted slots.
//!
//! Authentication gating lives in the reverse proxy in front of this
//! service; robots.txt additionally disallows the /api/admin/ prefix.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::{
    db::{
        coins::{CoinMetaPatch, CoinRepository, Model as Coin},
        promoted::{Model as Promotion, PromotedRepository},
        votes::VoteRepository,
    },
    error::AppError,
    seo::SITEMAP_CACHE_KEY,
    state::AppState,
};

pub async fn list_pending(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Coin>>, AppError> {
    Ok(Json(CoinRepository::list_pending(&state.db).await?))
}

pub async fn approve_coin(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Coin>, AppError> {
    let coin = CoinRepository::approve(&state.db, &slug)
        .await?
        .ok_or(AppError::NotFound)?;

    // The public url set just changed; next sitemap read rebuilds.
    state.cache.invalidate(SITEMAP_CACHE_KEY).await;

    Ok(Json(coin))
}

pub async fn update_coin(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(patch): Json<CoinMetaPatch>,
) -> Result<Json<Coin>, AppError> {
    let coin = CoinRepository::update_meta(&state.db, &slug, patch)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(coin))
}

pub async fn delete_coin(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<StatusCode, AppError> {
    VoteRepository::delete_for_coin(&state.db, &slug).await?;

    if !CoinRepository::delete(&state.db, &slug).await? {
        return Err(AppError::NotFound);
    }

    state.cache.invalidate(&format!("price:{slug}")).await;
    state.cache.invalidate(SITEMAP_CACHE_KEY).await;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PromoteRequest {
    #[serde(default = "default_position")]
    pub position: i32,
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_position() -> i32 {
    1
}

fn default_days() -> i64 {
    7
}

pub async fn promote_coin(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(request): Json<PromoteRequest>,
) -> Result<(StatusCode, Json<Promotion>), AppError> {
    if request.days <= 0 {
        return Err(AppError::MalformedPayload);
    }

    let coin = CoinRepository::find_by_slug(&state.db, &slug)
        .await?
        .filter(|c| c.approved)
        .ok_or(AppError::NotFound)?;

    let now = Utc::now();
    let promotion = PromotedRepository::create(
        &state.db,
        &coin.slug,
        request.position,
        now,
        now + Duration::days(request.days),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(promotion)))
}

pub async fn end_promotion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !PromotedRepository::delete(&state.db, id).await? {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}
