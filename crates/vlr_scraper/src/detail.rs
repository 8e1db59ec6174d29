//! Match detail page extraction: header, per-player stat tables, betting
//! odds.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::util::{absolutize, clean_text, first_digit_run, has_class, select_attr, select_text};

/// Player stat rows carry this many cells; anything shorter is a header or
/// filler row.
const STAT_CELL_COUNT: usize = 14;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatistics {
    pub match_url: Option<String>,
    pub event_name: Option<String>,
    /// Raw `data-utc-ts` attribute text, untouched.
    pub match_time: Option<String>,
    /// `None` until the score-area probe decides; a probe text containing
    /// "live" means running, one containing a digit means finished.
    pub is_live: Option<bool>,
    pub team1: TeamDetail,
    pub team2: TeamDetail,
    pub betting: Option<BettingSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDetail {
    pub name: Option<String>,
    #[serde(rename = "logo")]
    pub logo_url: Option<String>,
    pub score: Option<u32>,
    /// Set only on finished matches with both scores parsed; a tie leaves
    /// both teams at false.
    pub is_won: bool,
    pub players: Vec<PlayerStatLine>,
}

/// One scoreboard row. Stats stay as trimmed text; the site formats them
/// inconsistently ("+6", "72%", "1.24") and the consumer renders them as-is.
/// No serde renames here: the snake_case keys are the shape the frontend
/// reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStatLine {
    pub player_name: String,
    pub player_link: Option<String>,
    pub team_code: String,
    pub rating: String,
    pub average_combat_score: String,
    pub kills: String,
    pub deaths: String,
    pub assists: String,
    pub kills_deaths: String,
    pub kill_assist_trade_survive_percentage: String,
    pub average_damage_per_round: String,
    pub headshot_percentage: String,
    pub first_kills: String,
    pub first_deaths: String,
    pub first_kills_first_deaths: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BettingSnapshot {
    pub team1: BettingSide,
    pub team2: BettingSide,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BettingSide {
    pub odds: Option<f64>,
    pub direction: Option<OddsDirection>,
}

/// Which way the odds moved since the last refresh, as shown by the arrow
/// next to them. Serialized capitalized ("Up"/"Down"), the shape the
/// frontend already consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OddsDirection {
    Up,
    Down,
}

/// Parse a match page. Absent optional data degrades to `None`; the whole
/// document is never rejected because one field is missing.
pub fn extract_match_detail(html: &str, base_url: &str) -> MatchStatistics {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let canonical_sel = Selector::parse("link[rel='canonical']").unwrap();
    let event_sel = Selector::parse("a.match-header-event div div").unwrap();
    let time_sel = Selector::parse(".moment-tz-convert").unwrap();
    let name_sel = Selector::parse("a.match-header-link div.wf-title-med").unwrap();
    let score_wrap_sel = Selector::parse("div.match-header-vs-score").unwrap();
    let score_span_sel = Selector::parse("div span").unwrap();
    let logo_sel = Selector::parse("div.match-header-vs img").unwrap();

    let match_url = select_attr(root, &canonical_sel, "href");
    let event_name = select_text(root, &event_sel);
    let match_time = select_attr(root, &time_sel, "data-utc-ts");

    let names: Vec<String> = root
        .select(&name_sel)
        .map(|el| clean_text(&el.text().collect::<String>()))
        .collect();
    let name_at = |idx: usize| names.get(idx).filter(|n| !n.is_empty()).cloned();

    // Liveness probe: the score block reads "live" while running and shows
    // plain numbers once finished.
    let score_wrap = root.select(&score_wrap_sel).next();
    let is_live = score_wrap.and_then(|el| {
        let text = clean_text(&el.text().collect::<String>()).to_lowercase();
        if text.contains("live") {
            Some(true)
        } else if text.chars().any(|c| c.is_ascii_digit()) {
            Some(false)
        } else {
            None
        }
    });

    let score_spans: Vec<String> = score_wrap
        .map(|el| {
            el.select(&score_span_sel)
                .map(|s| clean_text(&s.text().collect::<String>()))
                .collect()
        })
        .unwrap_or_default();
    let score1 = score_spans.first().and_then(|t| first_digit_run(t));
    let score2 = score_spans.get(2).and_then(|t| first_digit_run(t));

    let logos: Vec<String> = root
        .select(&logo_sel)
        .filter_map(|img| img.value().attr("src"))
        .map(|src| absolutize(base_url, src))
        .collect();

    let (players1, players2) = extract_player_tables(&document, base_url);

    let mut team1 = TeamDetail {
        name: name_at(0),
        logo_url: logos.first().cloned(),
        score: score1,
        is_won: false,
        players: players1,
    };
    let mut team2 = TeamDetail {
        name: name_at(1),
        logo_url: logos.get(1).cloned(),
        score: score2,
        is_won: false,
        players: players2,
    };

    if is_live == Some(false) {
        if let (Some(s1), Some(s2)) = (team1.score, team2.score) {
            team1.is_won = s1 > s2;
            team2.is_won = s2 > s1;
        }
    }

    let betting = extract_betting(&document);

    MatchStatistics {
        match_url,
        event_name,
        match_time,
        is_live,
        team1,
        team2,
        betting,
    }
}

/// The active game container holds exactly two stat tables: team1 first,
/// team2 second.
fn extract_player_tables(
    document: &Html,
    base_url: &str,
) -> (Vec<PlayerStatLine>, Vec<PlayerStatLine>) {
    let table_sel = Selector::parse("div.vm-stats-game.mod-active table").unwrap();
    let row_sel = Selector::parse("tbody tr").unwrap();

    let mut tables = document.select(&table_sel);
    let mut parse = |table: Option<ElementRef<'_>>| -> Vec<PlayerStatLine> {
        table
            .map(|t| {
                t.select(&row_sel)
                    .filter_map(|row| extract_player_row(row, base_url))
                    .collect()
            })
            .unwrap_or_default()
    };
    let team1 = parse(tables.next());
    let team2 = parse(tables.next());
    (team1, team2)
}

fn extract_player_row(row: ElementRef<'_>, base_url: &str) -> Option<PlayerStatLine> {
    let cell_sel = Selector::parse("td").unwrap();
    let name_sel = Selector::parse("div.text-of").unwrap();
    let link_sel = Selector::parse("a").unwrap();
    let code_sel = Selector::parse("div.ge-text-light").unwrap();

    let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
    if cells.len() < STAT_CELL_COUNT {
        return None;
    }

    let name_cell = cells[0];
    let player_name = select_text(name_cell, &name_sel)?;
    let player_link =
        select_attr(name_cell, &link_sel, "href").map(|href| absolutize(base_url, &href));
    let team_code = select_text(name_cell, &code_sel).unwrap_or_default();

    // cell 1 is the agent icon column
    Some(PlayerStatLine {
        player_name,
        player_link,
        team_code,
        rating: stat_text(cells[2]),
        average_combat_score: stat_text(cells[3]),
        kills: stat_text(cells[4]),
        deaths: both_sides_text(cells[5]),
        assists: stat_text(cells[6]),
        kills_deaths: stat_text(cells[7]),
        kill_assist_trade_survive_percentage: stat_text(cells[8]),
        average_damage_per_round: stat_text(cells[9]),
        headshot_percentage: stat_text(cells[10]),
        first_kills: stat_text(cells[11]),
        first_deaths: stat_text(cells[12]),
        first_kills_first_deaths: stat_text(cells[13]),
    })
}

/// Stat cells nest per-side spans; the first inner span carries the
/// both-sides value.
fn stat_text(cell: ElementRef<'_>) -> String {
    let inner_sel = Selector::parse("span span").unwrap();
    cell.select(&inner_sel)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .unwrap_or_else(|| clean_text(&cell.text().collect::<String>()))
}

/// The deaths cell marks the both-sides value explicitly.
fn both_sides_text(cell: ElementRef<'_>) -> String {
    let both_sel = Selector::parse("span.mod-both").unwrap();
    cell.select(&both_sel)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .unwrap_or_else(|| stat_text(cell))
}

/// Odds extraction order is fixed: the card block wins when it has any
/// cards; the flat fallback list is consulted only when it does not, and
/// results are never merged across the two shapes.
fn extract_betting(document: &Html) -> Option<BettingSnapshot> {
    let card_sel = Selector::parse("a.match-bet-item").unwrap();
    let odds_sel = Selector::parse("span.match-bet-item-odds").unwrap();
    let arrow_sel = Selector::parse("span.match-bet-item-arrow").unwrap();

    let cards: Vec<ElementRef<'_>> = document.select(&card_sel).collect();
    if !cards.is_empty() {
        let side = |card: Option<&ElementRef<'_>>| -> BettingSide {
            let Some(card) = card else {
                return BettingSide::default();
            };
            let odds = select_text(*card, &odds_sel)
                .as_deref()
                .and_then(parse_odds);
            let direction = card.select(&arrow_sel).next().and_then(|el| {
                if has_class(el, "mod-up") {
                    Some(OddsDirection::Up)
                } else if has_class(el, "mod-down") {
                    Some(OddsDirection::Down)
                } else {
                    None
                }
            });
            BettingSide { odds, direction }
        };
        let team1 = side(cards.first());
        let team2 = side(cards.get(1));
        if team1.odds.is_none() && team2.odds.is_none() {
            return None;
        }
        return Some(BettingSnapshot { team1, team2 });
    }

    // legacy flat layout: bare odds spans, first two in document order
    let flat_sel = Selector::parse("span.match-bet-odds").unwrap();
    let odds: Vec<f64> = document
        .select(&flat_sel)
        .filter_map(|el| parse_odds(&clean_text(&el.text().collect::<String>())))
        .take(2)
        .collect();
    if odds.is_empty() {
        return None;
    }
    Some(BettingSnapshot {
        team1: BettingSide {
            odds: odds.first().copied(),
            direction: None,
        },
        team2: BettingSide {
            odds: odds.get(1).copied(),
            direction: None,
        },
    })
}

/// First decimal number in the text ("1.85", "2.4x", "odds 3.10").
fn parse_odds(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_digit())?;
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    text[start..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_row(name: &str, link: &str, code: &str, kills: &str, deaths: &str) -> String {
        format!(
            r#"<tr>
              <td class="mod-player"><div><a href="{link}"><div class="text-of">{name}</div><div class="ge-text-light">{code}</div></a></div></td>
              <td class="mod-agents"></td>
              <td class="mod-stat"><span><span>1.24</span><span class="mod-t">1.30</span></span></td>
              <td class="mod-stat"><span><span>230</span></span></td>
              <td class="mod-stat"><span><span>{kills}</span></span></td>
              <td class="mod-stat"><span><span class="mod-both">{deaths}</span></span></td>
              <td class="mod-stat"><span><span>7</span></span></td>
              <td class="mod-stat"><span><span>+6</span></span></td>
              <td class="mod-stat"><span><span>72%</span></span></td>
              <td class="mod-stat"><span><span>145</span></span></td>
              <td class="mod-stat"><span><span>28%</span></span></td>
              <td class="mod-stat"><span><span>3</span></span></td>
              <td class="mod-stat"><span><span>1</span></span></td>
              <td class="mod-stat"><span><span>+2</span></span></td>
            </tr>"#
        )
    }

    fn finished_page() -> String {
        format!(
            r##"<html><head><link rel="canonical" href="https://www.vlr.gg/510602/g2-vs-sen"></head><body>
            <a class="match-header-event" href="/event/2097"><div><div>Valorant Champions 2026</div><div class="match-header-event-series">Grand Final</div></div></a>
            <div class="match-header-date"><div class="moment-tz-convert" data-utc-ts="2026-08-20 14:00:00">Thu, August 20</div></div>
            <div class="match-header-vs">
              <a class="match-header-link mod-1" href="/team/11058/g2"><img src="//owcdn.net/img/g2.png"><div class="wf-title-med">G2 Esports</div></a>
              <div class="match-header-vs-score">
                <div class="js-spoiler"><span class="match-header-vs-score-winner">2</span><span>:</span><span class="match-header-vs-score-loser">0</span></div>
                <div class="match-header-vs-note">final</div>
              </div>
              <a class="match-header-link mod-2" href="/team/2/sen"><img src="https://owcdn.net/img/sen.png"><div class="wf-title-med">Sentinels</div></a>
            </div>
            <div class="vm-stats-game mod-active" data-game-id="all">
              <table class="wf-table-inset mod-overview"><tbody>
                {row1}
              </tbody></table>
              <table class="wf-table-inset mod-overview"><tbody>
                {row2}
              </tbody></table>
            </div>
            <div class="match-bet">
              <a class="match-bet-item" href="#"><span class="match-bet-item-team">G2</span><span class="match-bet-item-odds">1.85</span><span class="match-bet-item-arrow mod-up"></span></a>
              <a class="match-bet-item" href="#"><span class="match-bet-item-team">SEN</span><span class="match-bet-item-odds">2.10</span><span class="match-bet-item-arrow mod-down"></span></a>
            </div>
            <span class="match-bet-odds">9.99</span>
            </body></html>"##,
            row1 = player_row("nukkye", "/player/4004/nukkye", "G2", "18", "12"),
            row2 = player_row("zekken", "/player/9801/zekken", "SEN", "14", "16"),
        )
    }

    #[test]
    fn finished_match_extracts_header_and_winner() {
        let stats = extract_match_detail(&finished_page(), "https://www.vlr.gg");
        assert_eq!(stats.match_url.as_deref(), Some("https://www.vlr.gg/510602/g2-vs-sen"));
        assert_eq!(stats.event_name.as_deref(), Some("Valorant Champions 2026"));
        assert_eq!(stats.match_time.as_deref(), Some("2026-08-20 14:00:00"));
        assert_eq!(stats.is_live, Some(false));
        assert_eq!(stats.team1.name.as_deref(), Some("G2 Esports"));
        assert_eq!(stats.team2.name.as_deref(), Some("Sentinels"));
        assert_eq!(stats.team1.score, Some(2));
        assert_eq!(stats.team2.score, Some(0));
        assert!(stats.team1.is_won);
        assert!(!stats.team2.is_won);
        assert_eq!(
            stats.team1.logo_url.as_deref(),
            Some("https://owcdn.net/img/g2.png"),
            "protocol-relative logo gets https"
        );
    }

    #[test]
    fn player_tables_split_by_team() {
        let stats = extract_match_detail(&finished_page(), "https://www.vlr.gg");
        assert_eq!(stats.team1.players.len(), 1);
        assert_eq!(stats.team2.players.len(), 1);

        let p = &stats.team1.players[0];
        assert_eq!(p.player_name, "nukkye");
        assert_eq!(p.player_link.as_deref(), Some("https://www.vlr.gg/player/4004/nukkye"));
        assert_eq!(p.team_code, "G2");
        assert_eq!(p.rating, "1.24", "first inner span, not the per-side ones");
        assert_eq!(p.average_combat_score, "230");
        assert_eq!(p.kills, "18");
        assert_eq!(p.deaths, "12");
        assert_eq!(p.assists, "7");
        assert_eq!(p.kills_deaths, "+6");
        assert_eq!(p.kill_assist_trade_survive_percentage, "72%");
        assert_eq!(p.average_damage_per_round, "145");
        assert_eq!(p.headshot_percentage, "28%");
        assert_eq!(p.first_kills, "3");
        assert_eq!(p.first_deaths, "1");
        assert_eq!(p.first_kills_first_deaths, "+2");
        assert_eq!(stats.team2.players[0].player_name, "zekken");
    }

    #[test]
    fn primary_betting_cards_win_over_fallback() {
        let stats = extract_match_detail(&finished_page(), "https://www.vlr.gg");
        let betting = stats.betting.expect("cards present");
        assert_eq!(betting.team1.odds, Some(1.85));
        assert_eq!(betting.team1.direction, Some(OddsDirection::Up));
        assert_eq!(betting.team2.odds, Some(2.10));
        assert_eq!(betting.team2.direction, Some(OddsDirection::Down));
    }

    #[test]
    fn fallback_odds_used_only_without_cards() {
        let html = r#"<html><body>
          <span class="match-bet-odds">1.50</span>
          <span class="match-bet-odds">2.50</span>
          <span class="match-bet-odds">7.00</span>
        </body></html>"#;
        let stats = extract_match_detail(html, "https://www.vlr.gg");
        let betting = stats.betting.expect("fallback present");
        assert_eq!(betting.team1.odds, Some(1.50));
        assert_eq!(betting.team2.odds, Some(2.50), "first two in document order");
        assert_eq!(betting.team1.direction, None);
    }

    #[test]
    fn unparseable_card_odds_do_not_fall_back() {
        let html = r##"<html><body>
          <a class="match-bet-item" href="#"><span class="match-bet-item-odds">TBD</span></a>
          <span class="match-bet-odds">1.50</span>
        </body></html>"##;
        let stats = extract_match_detail(html, "https://www.vlr.gg");
        assert!(stats.betting.is_none(), "shapes are never merged");
    }

    #[test]
    fn live_match_has_no_winner() {
        let html = r#"<html><body>
          <div class="match-header-vs">
            <div class="match-header-vs-score">
              <div class="match-header-vs-note">live</div>
              <div class="js-spoiler"><span>1</span><span>:</span><span>0</span></div>
            </div>
          </div>
        </body></html>"#;
        let stats = extract_match_detail(html, "https://www.vlr.gg");
        assert_eq!(stats.is_live, Some(true));
        assert_eq!(stats.team1.score, Some(1));
        assert!(!stats.team1.is_won, "winner only decided on finished matches");
        assert!(!stats.team2.is_won);
    }

    #[test]
    fn tie_leaves_both_flags_false() {
        let html = r#"<html><body>
          <div class="match-header-vs-score">
            <div><span>1</span><span>:</span><span>1</span></div>
          </div>
        </body></html>"#;
        let stats = extract_match_detail(html, "https://www.vlr.gg");
        assert_eq!(stats.is_live, Some(false));
        assert!(!stats.team1.is_won);
        assert!(!stats.team2.is_won);
    }

    #[test]
    fn malformed_score_text_parses_to_none() {
        let html = r#"<html><body>
          <div class="match-header-vs-score">
            <div><span>N/a</span><span>:</span><span>2</span></div>
          </div>
        </body></html>"#;
        let stats = extract_match_detail(html, "https://www.vlr.gg");
        assert_eq!(stats.is_live, Some(false), "digits in the probe mean finished");
        assert_eq!(stats.team1.score, None);
        assert_eq!(stats.team2.score, Some(2));
        assert!(!stats.team2.is_won, "one missing score blocks the winner rule");
    }

    #[test]
    fn empty_page_degrades_to_defaults() {
        let stats = extract_match_detail("<html><body></body></html>", "https://www.vlr.gg");
        assert_eq!(stats.match_url, None);
        assert_eq!(stats.event_name, None);
        assert_eq!(stats.match_time, None);
        assert_eq!(stats.is_live, None);
        assert_eq!(stats.team1, TeamDetail::default());
        assert_eq!(stats.team2, TeamDetail::default());
        assert!(stats.betting.is_none());
    }

    #[test]
    fn direction_serializes_capitalized() {
        assert_eq!(serde_json::to_string(&OddsDirection::Up).unwrap(), "\"Up\"");
        assert_eq!(serde_json::to_string(&OddsDirection::Down).unwrap(), "\"Down\"");
    }
}
