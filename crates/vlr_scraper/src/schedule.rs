//! Schedule listing extraction (`/matches` pages).
//!
//! The listing is a sequence of date labels, each followed by a card of
//! match rows. A label with no adjacent card, or a card with zero rows,
//! contributes nothing.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::detail::BettingSnapshot;
use crate::util::{absolutize, clean_text, has_class, next_element, select_text, text_excluding};

/// Status text vlr.gg shows on running matches; the lifecycle manager keys
/// off this exact value.
pub const LIVE_STATUS: &str = "LIVE";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDayGroup {
    pub date: String,
    pub matches: Vec<ScheduledMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledMatch {
    pub match_url: Option<String>,
    /// Relative href path, e.g. `/510602/g2-vs-sen-champions-2026`. Doubles
    /// as the store key for tracked matches.
    #[serde(rename = "matchID")]
    pub match_id: Option<String>,
    pub time: Option<String>,
    pub team1: Option<String>,
    pub team2: Option<String>,
    pub status: Option<String>,
    pub eta: Option<String>,
    pub stats: Option<String>,
    pub vods: Option<String>,
    pub event: Option<String>,
    /// Only populated by the only-live API path, from a fresh detail fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub betting: Option<BettingSnapshot>,
}

impl ScheduledMatch {
    pub fn is_live(&self) -> bool {
        self.status.as_deref() == Some(LIVE_STATUS)
    }
}

/// Parse a `/matches` listing into date groups, in page order.
pub fn extract_schedule(html: &str, base_url: &str) -> Vec<MatchDayGroup> {
    let document = Html::parse_document(html);

    let label_sel = Selector::parse("div.wf-label.mod-large").unwrap();
    let row_sel = Selector::parse("a.wf-module-item.match-item").unwrap();

    let mut groups = Vec::new();
    for label in document.select(&label_sel) {
        // the label's own text, minus the "Today"/"Yesterday" span
        let date = text_excluding(label, |child| child.value().name() == "span");
        if date.is_empty() {
            continue;
        }
        let Some(card) = next_element(label).filter(|el| has_class(*el, "wf-card")) else {
            continue;
        };
        let matches: Vec<ScheduledMatch> = card
            .select(&row_sel)
            .map(|row| extract_row(row, base_url))
            .collect();
        if matches.is_empty() {
            continue;
        }
        groups.push(MatchDayGroup { date, matches });
    }
    groups
}

fn extract_row(row: ElementRef<'_>, base_url: &str) -> ScheduledMatch {
    let time_sel = Selector::parse("div.match-item-time").unwrap();
    let team_sel = Selector::parse("div.match-item-vs-team-name div.text-of").unwrap();
    let status_sel = Selector::parse("div.match-item-eta div.ml-status").unwrap();
    let eta_sel = Selector::parse("div.match-item-eta div.ml-eta").unwrap();
    let event_sel = Selector::parse("div.match-item-event").unwrap();

    let match_id = row.value().attr("href").map(str::to_string);
    let match_url = match_id.as_deref().map(|href| absolutize(base_url, href));

    let teams: Vec<String> = row
        .select(&team_sel)
        .map(|el| clean_text(&el.text().collect::<String>()))
        .collect();
    let team_at = |idx: usize| teams.get(idx).filter(|t| !t.is_empty()).cloned();

    let event = row
        .select(&event_sel)
        .next()
        .map(|el| text_excluding(el, |child| has_class(child, "match-item-event-series")))
        .filter(|t| !t.is_empty());

    let (stats, vods) = vod_labels(row);

    ScheduledMatch {
        match_url,
        match_id,
        time: select_text(row, &time_sel),
        team1: team_at(0),
        team2: team_at(1),
        status: select_text(row, &status_sel),
        eta: select_text(row, &eta_sel),
        stats,
        vods,
        event,
        betting: None,
    }
}

/// The row footer carries label/value pairs; only "Stats" and "VODs" are
/// interesting.
fn vod_labels(row: ElementRef<'_>) -> (Option<String>, Option<String>) {
    let label_sel = Selector::parse("div.match-item-vod div.wf-module-label").unwrap();

    let mut stats = None;
    let mut vods = None;
    for label_el in row.select(&label_sel) {
        let label = clean_text(&label_el.text().collect::<String>());
        if label.is_empty() {
            continue;
        }
        let Some(parent) = label_el.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        let full = clean_text(&parent.text().collect::<String>());
        let value = clean_text(&full.replacen(&label, "", 1));
        if value.is_empty() {
            continue;
        }
        // labels render with or without a trailing colon
        match label.trim_end_matches(':') {
            "Stats" => stats = Some(value),
            "VODs" => vods = Some(value),
            _ => {}
        }
    }
    (stats, vods)
}
