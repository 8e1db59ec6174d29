//! The HTTP surface. Every route is a POST under /api/vlr and requires a
//! valid `x-api-key` header before any work happens.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use logger::{now_iso, BetPlacedEvent, EventLogger};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use vlr_scraper::{
    assemble_live_summaries, extract_live_scoreboard, extract_match_detail, extract_schedule,
    walk_schedule, LiveScoreboardRow, MatchDayGroup, PageFetcher, ScheduledMatch, VlrClient,
    SCHEDULE_PAGE_DELAY,
};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::match_store::{MatchStore, NewBet, TeamSide};

#[derive(Clone)]
pub struct ApiState {
    pub cfg: Arc<Config>,
    pub client: VlrClient,
    pub store: Arc<MatchStore>,
    pub events: Arc<EventLogger>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/vlr/scheduledMatches", post(scheduled_matches))
        .route(
            "/api/vlr/retrieveExtendedScheduledMatches",
            post(retrieve_extended_scheduled_matches),
        )
        .route("/api/vlr/retrieveMatchStats", post(retrieve_match_stats))
        .route("/api/vlr/liveScoreboard", post(live_scoreboard))
        .route("/api/vlr/placeBet", post(place_bet))
        .with_state(state)
}

fn require_api_key(state: &ApiState, headers: &HeaderMap) -> Result<()> {
    let presented = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    match presented {
        Some(key) if state.cfg.api_key_valid(key) => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduledMatchesBody {
    pub only_live: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchStatsBody {
    pub match_url: Option<String>,
    pub is_live: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetBody {
    #[serde(rename = "matchID")]
    pub match_id: String,
    pub team: TeamSide,
    pub odds: Option<f64>,
    pub amount: Option<f64>,
    pub transaction_hash: Option<String>,
    pub wallet_address: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// First schedule page as date groups. With `onlyLive` the groups are cut
/// down to running matches and each one gets its betting odds attached.
async fn scheduled_matches(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Option<Json<ScheduledMatchesBody>>,
) -> Result<Json<Vec<MatchDayGroup>>> {
    require_api_key(&state, &headers)?;
    let only_live = body.map(|Json(b)| b.only_live).unwrap_or_default();

    let url = format!("{}/matches", state.client.base_url());
    let html = state.client.fetch_page(&url).await?;
    let mut groups = extract_schedule(&html, state.client.base_url());

    if only_live {
        for group in &mut groups {
            group.matches.retain(|m| m.is_live());
        }
        groups.retain(|g| !g.matches.is_empty());
        for group in &mut groups {
            for m in &mut group.matches {
                attach_betting(&state, m).await;
            }
        }
    }

    Ok(Json(groups))
}

/// The odds are garnish on this route: a failed detail fetch keeps the
/// match listed, just without betting data.
async fn attach_betting(state: &ApiState, m: &mut ScheduledMatch) {
    let Some(url) = m.match_url.clone() else {
        return;
    };
    match state.client.fetch_page(&url).await {
        Ok(html) => {
            m.betting = extract_match_detail(&html, state.client.base_url()).betting;
        }
        Err(e) => warn!("betting fetch for {} failed: {}", url, e),
    }
}

/// Every schedule page, walked and merged. A mid-walk failure still returns
/// what was gathered, marked as partial with a 502.
async fn retrieve_extended_scheduled_matches(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response> {
    require_api_key(&state, &headers)?;

    let start = format!("{}/matches", state.client.base_url());
    let walk = walk_schedule(&state.client, &start, SCHEDULE_PAGE_DELAY).await;

    if let Some(e) = walk.error {
        warn!(
            "extended schedule walk failed after {} pages: {}",
            walk.pages_processed, e
        );
        let body = json!({
            "error": e.to_string(),
            "pagesProcessed": walk.pages_processed,
            "partialData": walk.groups,
        });
        return Ok((StatusCode::BAD_GATEWAY, Json(body)).into_response());
    }

    Ok(Json(json!({
        "totalPages": walk.pages_processed,
        "totalMatchGroups": walk.groups.len(),
        "totalMatches": walk.total_matches(),
        "data": walk.groups,
    }))
    .into_response())
}

/// Stats for one match page, or the live scoreboard when `isLive` is set
/// (the scoreboard needs no URL, so `matchUrl` is only required without it).
async fn retrieve_match_stats(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Option<Json<MatchStatsBody>>,
) -> Result<Response> {
    require_api_key(&state, &headers)?;
    let body = body.map(|Json(b)| b).unwrap_or_default();

    if body.is_live {
        let rows = live_rows(&state).await?;
        let summaries = assemble_live_summaries(&state.client, rows).await;
        return Ok(Json(summaries).into_response());
    }

    let Some(match_url) = body.match_url.filter(|u| !u.trim().is_empty()) else {
        return Err(AppError::BadRequest("matchUrl is required".into()));
    };
    let html = state.client.fetch_page(&match_url).await?;
    let stats = extract_match_detail(&html, state.client.base_url());
    Ok(Json(stats).into_response())
}

async fn live_scoreboard(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Response> {
    require_api_key(&state, &headers)?;
    let rows = live_rows(&state).await?;
    let summaries = assemble_live_summaries(&state.client, rows).await;
    Ok(Json(summaries).into_response())
}

async fn live_rows(state: &ApiState) -> Result<Vec<LiveScoreboardRow>> {
    let url = format!("{}/", state.client.base_url());
    let html = state.client.fetch_page(&url).await?;
    Ok(extract_live_scoreboard(&html, state.client.base_url()))
}

/// Record a bet. Unknown matches get a tracking stub first, so a bet on a
/// match the populate pass has not seen yet still lands somewhere settleable.
async fn place_bet(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: std::result::Result<Json<PlaceBetBody>, JsonRejection>,
) -> Result<Response> {
    require_api_key(&state, &headers)?;
    let Json(body) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    if body.match_id.trim().is_empty() {
        return Err(AppError::BadRequest("matchID is required".into()));
    }

    state.store.find_or_create_live_match(&body.match_id)?;
    let bet = state.store.insert_bet(NewBet {
        match_id: body.match_id,
        team: body.team,
        odds: body.odds,
        amount: body.amount,
        transaction_hash: body.transaction_hash,
        wallet_address: body.wallet_address,
    })?;

    info!("bet {} placed on {} ({})", bet.id, bet.match_id, bet.team.as_str());
    let _ = state.events.log(&BetPlacedEvent {
        ts: now_iso(),
        event: "BET_PLACED",
        match_id: bet.match_id.clone(),
        team: bet.team.as_str().to_string(),
        odds: bet.odds,
        amount: bet.amount,
        wallet_address: bet.wallet_address.clone(),
    });

    Ok(Json(json!({ "success": true, "data": bet })).into_response())
}
