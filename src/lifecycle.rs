//! Live-match lifecycle: discover matches that are live right now, then
//! keep re-checking them until they finish and settle.
//!
//! Discovery fails loud (a broken walk means the whole cycle is suspect);
//! settlement fails soft per match, so one bad page never blocks the rest.

use std::sync::Arc;
use std::time::Duration;

use logger::{
    now_iso, EventLogger, MatchSettledEvent, MatchTrackedEvent, ScrapeStatusEvent,
    SettlementCallEvent,
};
use tokio::time::interval;
use tracing::{debug, info, warn};
use vlr_scraper::{extract_match_detail, walk_schedule, PageFetcher, SCHEDULE_PAGE_DELAY};

use crate::error::Result;
use crate::match_store::{MatchStore, TeamSide};
use crate::settlement::SettlementClient;

#[derive(Debug, Default, PartialEq)]
pub struct PopulateSummary {
    pub live_seen: usize,
    pub inserted: usize,
}

#[derive(Debug, Default, PartialEq)]
pub struct SettleSummary {
    pub checked: usize,
    pub settled: usize,
    pub still_live: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum SettleOutcome {
    StillLive,
    /// Live flag unreadable, tie, or already settled; retried next cycle
    /// (or dropped, if another worker settled it).
    Skipped,
    Settled(TeamSide),
}

pub struct LifecycleTracker<F: PageFetcher> {
    client: F,
    store: Arc<MatchStore>,
    settlement: Arc<SettlementClient>,
    events: Arc<EventLogger>,
    populate_interval: Duration,
    settle_interval: Duration,
}

impl<F: PageFetcher + 'static> LifecycleTracker<F> {
    pub fn new(
        client: F,
        store: Arc<MatchStore>,
        settlement: Arc<SettlementClient>,
        events: Arc<EventLogger>,
        populate_interval: Duration,
        settle_interval: Duration,
    ) -> Self {
        Self {
            client,
            store,
            settlement,
            events,
            populate_interval,
            settle_interval,
        }
    }

    /// Walk the schedule and start tracking every live match in the nearest
    /// date group. Matches further out are picked up once their day arrives.
    pub async fn populate_live_matches(&self) -> Result<PopulateSummary> {
        let start = format!("{}/matches", self.client.base_url());
        let walk = walk_schedule(&self.client, &start, SCHEDULE_PAGE_DELAY).await;
        if let Some(e) = walk.error {
            return Err(e.into());
        }

        let mut summary = PopulateSummary::default();
        let Some(group) = walk.groups.first() else {
            return Ok(summary);
        };

        for m in group.matches.iter().filter(|m| m.is_live()) {
            summary.live_seen += 1;
            let Some(match_id) = m.match_id.as_deref() else {
                warn!("live match without an id in group {}, skipping", group.date);
                continue;
            };
            if self.store.find_live_match(match_id)?.is_some() {
                continue;
            }
            if self.store.insert_live_match(match_id)? {
                summary.inserted += 1;
                info!("tracking live match {}", match_id);
                let _ = self.events.log(&MatchTrackedEvent {
                    ts: now_iso(),
                    event: "MATCH_TRACKED",
                    match_id: match_id.to_string(),
                    team1: m.team1.clone(),
                    team2: m.team2.clone(),
                    event_name: m.event.clone(),
                });
            }
        }

        Ok(summary)
    }

    /// Re-check every tracked live match and settle the finished ones.
    pub async fn settle_live_matches(&self) -> Result<SettleSummary> {
        let ids = self.store.live_match_ids()?;
        let mut summary = SettleSummary::default();

        for match_id in ids {
            summary.checked += 1;
            match self.settle_one(&match_id).await {
                Ok(SettleOutcome::StillLive) => summary.still_live += 1,
                Ok(SettleOutcome::Skipped) => summary.skipped += 1,
                Ok(SettleOutcome::Settled(winner)) => {
                    summary.settled += 1;
                    info!("match {} settled, winner {}", match_id, winner.as_str());
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!("settle check for {} failed: {}", match_id, e);
                }
            }
        }

        Ok(summary)
    }

    async fn settle_one(&self, match_id: &str) -> Result<SettleOutcome> {
        let url = format!("{}{}", self.client.base_url(), match_id);
        let html = self.client.fetch_page(&url).await?;
        let stats = extract_match_detail(&html, self.client.base_url());

        match stats.is_live {
            Some(true) => return Ok(SettleOutcome::StillLive),
            None => {
                debug!("liveness unreadable for {}, retrying next cycle", match_id);
                return Ok(SettleOutcome::Skipped);
            }
            Some(false) => {}
        }

        let winner = if stats.team1.is_won {
            TeamSide::Team1
        } else if stats.team2.is_won {
            TeamSide::Team2
        } else {
            warn!("{} finished without a readable winner, retrying next cycle", match_id);
            return Ok(SettleOutcome::Skipped);
        };

        if !self.store.mark_settled(match_id, winner)? {
            debug!("{} was already settled", match_id);
            return Ok(SettleOutcome::Skipped);
        }
        let _ = self.events.log(&MatchSettledEvent {
            ts: now_iso(),
            event: "MATCH_SETTLED",
            match_id: match_id.to_string(),
            winner: winner.as_str().to_string(),
            score1: stats.team1.score,
            score2: stats.team2.score,
        });

        self.call_settlement(match_id, winner).await;
        Ok(SettleOutcome::Settled(winner))
    }

    /// The store transition above is the source of truth; a failed endpoint
    /// call is logged for replay, never rolled back.
    async fn call_settlement(&self, match_id: &str, winner: TeamSide) {
        let Some(challenge) = challenge_id(match_id) else {
            warn!("no challenge id in {}, settlement call skipped", match_id);
            return;
        };

        match self.settlement.settle(challenge, winner.player_id()).await {
            Ok(outcome) => {
                if outcome.success {
                    info!("settlement for challenge {} succeeded", challenge);
                } else {
                    warn!(
                        "settlement for challenge {} reported failure: {:?}",
                        challenge, outcome.error
                    );
                }
                let _ = self.events.log(&SettlementCallEvent {
                    ts: now_iso(),
                    event: "SETTLEMENT_CALL",
                    match_id: match_id.to_string(),
                    challenge_id: challenge,
                    player_id: winner.player_id(),
                    success: outcome.success,
                    tx_hash: outcome.tx_hash,
                    error: outcome.error,
                });
            }
            Err(e) => {
                warn!("settlement call for challenge {} failed: {}", challenge, e);
                let _ = self.events.log(&SettlementCallEvent {
                    ts: now_iso(),
                    event: "SETTLEMENT_CALL",
                    match_id: match_id.to_string(),
                    challenge_id: challenge,
                    player_id: winner.player_id(),
                    success: false,
                    tx_hash: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    /// Start the two background loops. Both run their first pass right away.
    pub fn spawn(self: Arc<Self>) {
        let tracker = Arc::clone(&self);
        tokio::spawn(async move {
            let mut ticker = interval(tracker.populate_interval);
            loop {
                ticker.tick().await;
                match tracker.populate_live_matches().await {
                    Ok(summary) => {
                        info!(
                            "populate pass: {} live, {} newly tracked",
                            summary.live_seen, summary.inserted
                        );
                        let _ = tracker.events.log(&ScrapeStatusEvent {
                            ts: now_iso(),
                            event: "SCRAPE_STATUS",
                            scope: "populate".to_string(),
                            ok: true,
                            detail: format!(
                                "{} live, {} inserted",
                                summary.live_seen, summary.inserted
                            ),
                        });
                    }
                    Err(e) => {
                        warn!("populate pass failed: {}", e);
                        let _ = tracker.events.log(&ScrapeStatusEvent {
                            ts: now_iso(),
                            event: "SCRAPE_STATUS",
                            scope: "populate".to_string(),
                            ok: false,
                            detail: e.to_string(),
                        });
                    }
                }
            }
        });

        let tracker = self;
        tokio::spawn(async move {
            let mut ticker = interval(tracker.settle_interval);
            loop {
                ticker.tick().await;
                match tracker.settle_live_matches().await {
                    Ok(summary) => {
                        info!(
                            "settle pass: {} checked, {} settled, {} still live, {} skipped, {} failed",
                            summary.checked,
                            summary.settled,
                            summary.still_live,
                            summary.skipped,
                            summary.failed
                        );
                        let _ = tracker.events.log(&ScrapeStatusEvent {
                            ts: now_iso(),
                            event: "SCRAPE_STATUS",
                            scope: "settle".to_string(),
                            ok: true,
                            detail: format!(
                                "{} checked, {} settled, {} failed",
                                summary.checked, summary.settled, summary.failed
                            ),
                        });
                    }
                    Err(e) => {
                        warn!("settle pass failed: {}", e);
                        let _ = tracker.events.log(&ScrapeStatusEvent {
                            ts: now_iso(),
                            event: "SCRAPE_STATUS",
                            scope: "settle".to_string(),
                            ok: false,
                            detail: e.to_string(),
                        });
                    }
                }
            }
        });
    }
}

/// Challenge ids are minted from the numeric lead of the match path, so
/// "/510602/fnatic-vs-sentinels" settles challenge 510602.
fn challenge_id(match_id: &str) -> Option<u64> {
    let digits: String = match_id
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use vlr_scraper::ScrapeError;

    use super::*;

    struct FakeFetcher {
        pages: HashMap<String, String>,
    }

    impl FakeFetcher {
        fn new(pages: Vec<(&str, String)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(url, html)| (url.to_string(), html))
                    .collect(),
            }
        }
    }

    impl PageFetcher for FakeFetcher {
        fn base_url(&self) -> &str {
            "https://vlr.test"
        }

        async fn fetch_page(&self, url: &str) -> vlr_scraper::Result<String> {
            self.pages.get(url).cloned().ok_or_else(|| ScrapeError::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
        }
    }

    fn tracker(fetcher: FakeFetcher) -> LifecycleTracker<FakeFetcher> {
        let log_dir = std::env::temp_dir().join(format!(
            "vlrbet-lifecycle-{}-{:p}",
            std::process::id(),
            &fetcher
        ));
        LifecycleTracker::new(
            fetcher,
            Arc::new(MatchStore::open_in_memory().unwrap()),
            Arc::new(SettlementClient::new(None)),
            Arc::new(EventLogger::new(log_dir)),
            Duration::from_secs(60),
            Duration::from_secs(300),
        )
    }

    fn schedule_row(href: &str, status: &str) -> String {
        format!(
            r#"<a href="{href}" class="wf-module-item match-item">
              <div class="match-item-vs-team-name"><div class="text-of">A</div></div>
              <div class="match-item-vs-team-name"><div class="text-of">B</div></div>
              <div class="match-item-eta"><div class="ml-status">{status}</div></div>
            </a>"#
        )
    }

    fn schedule_page(groups: &[(&str, Vec<String>)]) -> String {
        let mut html = String::from("<html><body>");
        for (date, rows) in groups {
            html.push_str(&format!(
                "<div class=\"wf-label mod-large\">{date}</div><div class=\"wf-card\">{}</div>",
                rows.join("")
            ));
        }
        html.push_str("</body></html>");
        html
    }

    fn match_page(score_block: &str) -> String {
        format!(
            r#"<html><body><div class="match-header-vs">
              <div class="match-header-vs-score">{score_block}</div>
            </div></body></html>"#
        )
    }

    fn finished(score1: u32, score2: u32) -> String {
        match_page(&format!(
            "<div><span>{score1}</span><span>:</span><span>{score2}</span></div>"
        ))
    }

    fn live() -> String {
        match_page(
            r#"<span class="match-header-vs-note">live</span>
               <div><span>1</span><span>:</span><span>0</span></div>"#,
        )
    }

    #[tokio::test]
    async fn populate_tracks_live_matches_from_the_nearest_group_only() {
        let listing = schedule_page(&[
            (
                "Thu, August 21",
                vec![
                    schedule_row("/510602/fnatic-vs-sentinels", "LIVE"),
                    schedule_row("/510603/drx-vs-prx", "3h 10m"),
                ],
            ),
            (
                "Fri, August 22",
                vec![schedule_row("/510604/eg-vs-loud", "LIVE")],
            ),
        ]);
        let tracker = tracker(FakeFetcher::new(vec![("https://vlr.test/matches", listing)]));

        let summary = tracker.populate_live_matches().await.unwrap();
        assert_eq!(summary, PopulateSummary { live_seen: 1, inserted: 1 });
        assert!(tracker
            .store
            .find_live_match("/510602/fnatic-vs-sentinels")
            .unwrap()
            .is_some());
        assert!(
            tracker.store.find_live_match("/510604/eg-vs-loud").unwrap().is_none(),
            "later groups are not touched"
        );

        // A second pass re-sees the same live match without re-inserting.
        let summary = tracker.populate_live_matches().await.unwrap();
        assert_eq!(summary, PopulateSummary { live_seen: 1, inserted: 0 });
    }

    #[tokio::test]
    async fn populate_propagates_a_failed_walk() {
        let tracker = tracker(FakeFetcher::new(vec![]));
        let err = tracker.populate_live_matches().await.unwrap_err();
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[tokio::test]
    async fn settle_pass_handles_each_match_on_its_own() {
        let fetcher = FakeFetcher::new(vec![
            ("https://vlr.test/1/finished", finished(0, 2)),
            ("https://vlr.test/2/live", live()),
            ("https://vlr.test/3/tie", finished(1, 1)),
            // /4/missing is not served: that fetch fails
        ]);
        let tracker = tracker(fetcher);
        for id in ["/1/finished", "/2/live", "/3/tie", "/4/missing"] {
            tracker.store.insert_live_match(id).unwrap();
        }

        let summary = tracker.settle_live_matches().await.unwrap();
        assert_eq!(
            summary,
            SettleSummary {
                checked: 4,
                settled: 1,
                still_live: 1,
                skipped: 1,
                failed: 1,
            }
        );

        let settled = tracker.store.find_live_match("/1/finished").unwrap().unwrap();
        assert!(!settled.is_live);
        assert_eq!(settled.team_won, Some(TeamSide::Team2));

        // Everything that did not finish cleanly stays live for the next pass.
        for id in ["/2/live", "/3/tie", "/4/missing"] {
            assert!(tracker.store.find_live_match(id).unwrap().unwrap().is_live);
        }
    }

    #[tokio::test]
    async fn settled_matches_leave_the_live_set() {
        let fetcher = FakeFetcher::new(vec![("https://vlr.test/1/finished", finished(2, 1))]);
        let tracker = tracker(fetcher);
        tracker.store.insert_live_match("/1/finished").unwrap();

        let first = tracker.settle_live_matches().await.unwrap();
        assert_eq!(first.settled, 1);

        let second = tracker.settle_live_matches().await.unwrap();
        assert_eq!(second.checked, 0, "settled matches are not re-checked");

        let record = tracker.store.find_live_match("/1/finished").unwrap().unwrap();
        assert_eq!(record.team_won, Some(TeamSide::Team1));
    }

    #[test]
    fn challenge_ids_are_the_numeric_path_lead() {
        assert_eq!(challenge_id("/510602/fnatic-vs-sentinels"), Some(510602));
        assert_eq!(challenge_id("510602"), Some(510602));
        assert_eq!(challenge_id("/tbd/fnatic-vs-sentinels"), None);
        assert_eq!(challenge_id(""), None);
    }
}
