//! Public browse endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    db::{
        coins::{CoinRepository, CoinSort},
        promoted::PromotedRepository,
        trending::TrendingRepository,
    },
    error::AppError,
    state::AppState,
};

use super::{CoinDetail, CoinSummary};

const MAX_PER_PAGE: u64 = 100;

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub sort: CoinSort,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    50
}

pub async fn list_coins(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<CoinSummary>>, AppError> {
    let per_page = params.per_page.clamp(1, MAX_PER_PAGE);
    let page = params.page.max(1);

    let coins = CoinRepository::list_approved(&state.db, params.sort, page, per_page).await?;

    Ok(Json(coins.into_iter().map(CoinSummary::from).collect()))
}

pub async fn get_coin(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<CoinDetail>, AppError> {
    let coin = CoinRepository::find_by_slug(&state.db, &slug)
        .await?
        .filter(|c| c.approved)
        .ok_or(AppError::NotFound)?;

    let quote = state.prices.quote(&state.db, &coin.slug).await?;

    Ok(Json(CoinDetail::new(coin, quote)))
}

/// Current trending ranking, rank order preserved.
pub async fn list_trending(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CoinSummary>>, AppError> {
    let ranking = TrendingRepository::list(&state.db).await?;
    let slugs: Vec<String> = ranking.iter().map(|r| r.coin_slug.clone()).collect();

    let mut by_slug: HashMap<String, _> = CoinRepository::find_by_slugs(&state.db, &slugs)
        .await?
        .into_iter()
        .map(|c| (c.slug.clone(), c))
        .collect();

    let coins = ranking
        .iter()
        .filter_map(|r| by_slug.remove(&r.coin_slug))
        .filter(|c| c.approved)
        .map(CoinSummary::from)
        .collect();

    Ok(Json(coins))
}

/// Active promoted listings in slot order.
pub async fn list_promoted(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CoinSummary>>, AppError> {
    let active = PromotedRepository::active(&state.db, Utc::now()).await?;
    let slugs: Vec<String> = active.iter().map(|p| p.coin_slug.clone()).collect();

    let mut by_slug: HashMap<String, _> = CoinRepository::find_by_slugs(&state.db, &slugs)
        .await?
        .into_iter()
        .map(|c| (c.slug.clone(), c))
        .collect();

    let coins = active
        .iter()
        .filter_map(|p| by_slug.remove(&p.coin_slug))
        .filter(|c| c.approved)
        .map(CoinSummary::from)
        .collect();

    Ok(Json(coins))
}
