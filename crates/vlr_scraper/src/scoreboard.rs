//! Live scoreboard extraction from the vlr.gg front page, plus the detail
//! fetches that fill in logos and the current map.
//!
//! The summary shape keeps the snake_case field names the existing frontend
//! consumes, so this module does not share the camelCase convention of the
//! schedule and detail types.

use chrono::{DateTime, NaiveDateTime};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::warn;

use crate::fetch::PageFetcher;
use crate::util::{absolutize, clean_text, select_attr, select_text};

const NA: &str = "N/A";
const UNKNOWN: &str = "Unknown";

/// One live match as served to the frontend. Every field is a string; `N/A`
/// and `Unknown` stand in for anything the page did not provide.
#[derive(Debug, Clone, Serialize)]
pub struct LiveMatchSummary {
    pub team1: String,
    pub team2: String,
    pub flag1: String,
    pub flag2: String,
    pub team1_logo: String,
    pub team2_logo: String,
    pub score1: String,
    pub score2: String,
    pub team1_round_ct: String,
    pub team1_round_t: String,
    pub team2_round_ct: String,
    pub team2_round_t: String,
    pub map_number: String,
    pub current_map: String,
    pub time_until_match: String,
    pub match_event: String,
    pub match_series: String,
    pub unix_timestamp: String,
    pub match_page: String,
}

/// What the front-page card alone can tell us about a live match.
#[derive(Debug, Clone)]
pub struct LiveScoreboardRow {
    pub team1: String,
    pub team2: String,
    pub flag1: String,
    pub flag2: String,
    pub score1: String,
    pub score2: String,
    pub team1_round_ct: String,
    pub team1_round_t: String,
    pub team2_round_ct: String,
    pub team2_round_t: String,
    pub time_until_match: String,
    pub match_event: String,
    pub match_series: String,
    pub unix_timestamp: String,
    pub match_page: String,
}

/// The bits only the match page knows: team logos and the live map.
#[derive(Debug, Clone)]
pub struct LiveDetailExtras {
    pub team1_logo: String,
    pub team2_logo: String,
    pub map_number: String,
    pub current_map: String,
}

impl Default for LiveDetailExtras {
    fn default() -> Self {
        Self {
            team1_logo: NA.to_string(),
            team2_logo: NA.to_string(),
            map_number: UNKNOWN.to_string(),
            current_map: UNKNOWN.to_string(),
        }
    }
}

/// Pull the live rows out of the front page's upcoming-matches column.
/// Cards without the live marker are upcoming, not live, and are skipped.
pub fn extract_live_scoreboard(html: &str, base_url: &str) -> Vec<LiveScoreboardRow> {
    let document = Html::parse_document(html);
    let card_sel = Selector::parse(".js-home-matches-upcoming a.wf-module-item").unwrap();
    let live_sel = Selector::parse(".h-match-eta.mod-live").unwrap();

    document
        .select(&card_sel)
        .filter_map(|card| {
            let marker = card.select(&live_sel).next()?;
            Some(extract_row(card, marker, base_url))
        })
        .collect()
}

fn extract_row(card: ElementRef, marker: ElementRef, base_url: &str) -> LiveScoreboardRow {
    let team_sel = Selector::parse(".h-match-team").unwrap();
    let name_sel = Selector::parse(".h-match-team-name").unwrap();
    let score_sel = Selector::parse(".h-match-team-score").unwrap();
    let flag_sel = Selector::parse(".flag").unwrap();
    let ct_sel = Selector::parse(".h-match-team-rounds .mod-ct").unwrap();
    let t_sel = Selector::parse(".h-match-team-rounds .mod-t").unwrap();
    let event_sel = Selector::parse(".h-match-preview-event").unwrap();
    let series_sel = Selector::parse(".h-match-preview-series").unwrap();
    let ts_sel = Selector::parse(".moment-tz-convert").unwrap();

    let teams: Vec<ElementRef> = card.select(&team_sel).take(2).collect();
    let side = |idx: usize, sel: &Selector| -> String {
        teams
            .get(idx)
            .and_then(|team| select_text(*team, sel))
            .unwrap_or_else(|| NA.to_string())
    };
    let flag = |idx: usize| -> String {
        teams
            .get(idx)
            .and_then(|team| team.select(&flag_sel).next())
            .and_then(|el| el.value().attr("class"))
            .map(|class| class.trim().replace(" mod-", "_"))
            .unwrap_or_else(|| NA.to_string())
    };

    LiveScoreboardRow {
        team1: side(0, &name_sel),
        team2: side(1, &name_sel),
        flag1: flag(0),
        flag2: flag(1),
        score1: side(0, &score_sel),
        score2: side(1, &score_sel),
        team1_round_ct: side(0, &ct_sel),
        team1_round_t: side(0, &t_sel),
        team2_round_ct: side(1, &ct_sel),
        team2_round_t: side(1, &t_sel),
        time_until_match: clean_text(&marker.text().collect::<String>()),
        match_event: select_text(card, &event_sel).unwrap_or_else(|| UNKNOWN.to_string()),
        match_series: select_text(card, &series_sel).unwrap_or_else(|| UNKNOWN.to_string()),
        unix_timestamp: render_timestamp(select_attr(card, &ts_sel, "data-utc-ts")),
        match_page: card
            .value()
            .attr("href")
            .map(|href| absolutize(base_url, href))
            .unwrap_or_else(|| UNKNOWN.to_string()),
    }
}

/// Read logos and the active map off a match page.
pub fn extract_live_detail_extras(html: &str, base_url: &str) -> LiveDetailExtras {
    let document = Html::parse_document(html);
    let logo_sel = Selector::parse("div.match-header-vs img").unwrap();
    let map_sel =
        Selector::parse(".vm-stats-gamesnav-item.js-map-switch.mod-active.mod-live").unwrap();

    let mut extras = LiveDetailExtras::default();

    let logos: Vec<String> = document
        .select(&logo_sel)
        .filter_map(|img| img.value().attr("src"))
        .map(|src| absolutize(base_url, src))
        .take(2)
        .collect();
    if let Some(logo) = logos.first() {
        extras.team1_logo = logo.clone();
    }
    if let Some(logo) = logos.get(1) {
        extras.team2_logo = logo.clone();
    }

    // The nav tab reads like "2 Haven": leading digits are the map number,
    // the rest is the map name.
    if let Some(tab) = document.select(&map_sel).next() {
        let text = clean_text(&tab.text().collect::<String>());
        let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            extras.map_number = digits.clone();
            let name = text[digits.len()..].trim();
            if !name.is_empty() {
                extras.current_map = name.to_string();
            }
        } else if !text.is_empty() {
            extras.current_map = text;
        }
    }

    extras
}

/// Fetch each live match's page and combine it with its front-page row.
/// A failed detail fetch keeps the row, with the extras left at defaults.
pub async fn assemble_live_summaries(
    fetcher: &impl PageFetcher,
    rows: Vec<LiveScoreboardRow>,
) -> Vec<LiveMatchSummary> {
    let mut summaries = Vec::with_capacity(rows.len());
    for row in rows {
        let extras = match fetcher.fetch_page(&row.match_page).await {
            Ok(html) => extract_live_detail_extras(&html, fetcher.base_url()),
            Err(e) => {
                warn!("live detail fetch for {} failed: {}", row.match_page, e);
                LiveDetailExtras::default()
            }
        };
        summaries.push(combine(row, extras));
    }
    summaries
}

fn combine(row: LiveScoreboardRow, extras: LiveDetailExtras) -> LiveMatchSummary {
    LiveMatchSummary {
        team1: row.team1,
        team2: row.team2,
        flag1: row.flag1,
        flag2: row.flag2,
        team1_logo: extras.team1_logo,
        team2_logo: extras.team2_logo,
        score1: row.score1,
        score2: row.score2,
        team1_round_ct: row.team1_round_ct,
        team1_round_t: row.team1_round_t,
        team2_round_ct: row.team2_round_ct,
        team2_round_t: row.team2_round_t,
        map_number: extras.map_number,
        current_map: extras.current_map,
        time_until_match: row.time_until_match,
        match_event: row.match_event,
        match_series: row.match_series,
        unix_timestamp: row.unix_timestamp,
        match_page: row.match_page,
    }
}

/// The page carries timestamps either as "YYYY-MM-DD HH:MM:SS" or as epoch
/// seconds; both render to the former. Anything else passes through as-is.
fn render_timestamp(raw: Option<String>) -> String {
    let Some(raw) = raw else {
        return UNKNOWN.to_string();
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return UNKNOWN.to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return dt.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    if let Ok(epoch) = raw.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(epoch, 0) {
            return dt.format("%Y-%m-%d %H:%M:%S").to_string();
        }
    }
    raw.to_string()
}
