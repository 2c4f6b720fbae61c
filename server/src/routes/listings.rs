//! Public listing submission.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        coins::{CoinLinks, CoinRepository, Model as Coin},
        users::UserRepository,
    },
    error::AppError,
    state::AppState,
    utils::slugify,
};

#[derive(Debug, Deserialize)]
pub struct SubmitListing {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub links: Option<CoinLinks>,
    #[serde(default)]
    pub is_presale: bool,
    #[serde(default)]
    pub launched_at: Option<DateTime<Utc>>,
    /// Submitter contact; creates or reuses a users row.
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub slug: String,
    pub approved: bool,
}

/// New submissions land unapproved and invisible until admin review.
pub async fn submit_listing(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitListing>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let slug = slugify(&payload.name);
    let symbol = payload.symbol.trim().to_uppercase();

    if slug.is_empty() || symbol.is_empty() {
        return Err(AppError::MalformedPayload);
    }

    let submitted_by = match payload.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => {
            Some(UserRepository::upsert_by_email(&state.db, email).await?.id)
        }
        _ => None,
    };

    // The insert itself is the uniqueness check: a taken slug conflicts
    // on the primary key, so concurrent duplicates both get 409.
    let now = Utc::now();
    let inserted = CoinRepository::insert(
        &state.db,
        Coin {
            slug: slug.clone(),
            name: payload.name.trim().to_string(),
            symbol,
            description: payload.description,
            chain: payload.chain,
            contract_address: payload.contract_address,
            logo_url: payload.logo_url,
            links: payload.links,
            is_presale: payload.is_presale,
            approved: false,
            votes: 0,
            submitted_by,
            price_usd: None,
            market_cap_usd: None,
            change_24h: None,
            price_updated_at: None,
            launched_at: payload.launched_at,
            created_at: now,
            updated_at: now,
        },
    )
    .await;

    let coin = match inserted {
        Ok(coin) => coin,
        Err(DbErr::RecordNotInserted) => return Err(AppError::AlreadyListed),
        Err(e) => return Err(e.into()),
    };

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            slug: coin.slug,
            approved: coin.approved,
        }),
    ))
}
