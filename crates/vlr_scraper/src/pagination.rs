//! Schedule pagination: single-page state plus the multi-page walker.

use std::time::Duration;

use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ScrapeError;
use crate::fetch::PageFetcher;
use crate::schedule::{extract_schedule, MatchDayGroup};
use crate::util::{absolutize, clean_text, first_digit_run};

/// Hard cap on schedule pages fetched in one walk.
pub const MAX_SCHEDULE_PAGES: u32 = 50;
/// Pause between page fetches when another page follows.
pub const SCHEDULE_PAGE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationState {
    pub current_page: u32,
    pub next_page_url: Option<String>,
    pub has_more_pages: bool,
}

/// Read the pager block. A page without one is a single-page listing.
pub fn extract_pagination(html: &str, base_url: &str) -> PaginationState {
    let document = Html::parse_document(html);
    let container_sel = Selector::parse("div.action-container-pages").unwrap();
    let active_sel = Selector::parse("span.btn.mod-page.mod-active").unwrap();
    let link_sel = Selector::parse("a.btn.mod-page").unwrap();

    let Some(container) = document.select(&container_sel).next() else {
        return PaginationState {
            current_page: 1,
            next_page_url: None,
            has_more_pages: false,
        };
    };

    let current_page = container
        .select(&active_sel)
        .next()
        .and_then(|el| first_digit_run(&el.text().collect::<String>()))
        .unwrap_or(1);

    // The next page is the smallest page number strictly greater than the
    // active one, wherever its link happens to sit in the pager.
    let mut next: Option<(u32, String)> = None;
    for link in container.select(&link_sel) {
        let Some(page) = first_digit_run(&clean_text(&link.text().collect::<String>())) else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if page > current_page && next.as_ref().map_or(true, |(best, _)| page < *best) {
            next = Some((page, absolutize(base_url, href)));
        }
    }

    let has_more_pages = next.is_some();
    let next_page_url = next.map(|(_, url)| url);
    PaginationState {
        current_page,
        next_page_url,
        has_more_pages,
    }
}

/// Outcome of a schedule walk. A failed page fetch stops the walk but keeps
/// everything gathered so far; `error` tells the caller the data is partial.
#[derive(Debug)]
pub struct ScheduleWalk {
    pub pages_processed: u32,
    pub groups: Vec<MatchDayGroup>,
    pub error: Option<ScrapeError>,
}

impl ScheduleWalk {
    pub fn total_matches(&self) -> usize {
        self.groups.iter().map(|g| g.matches.len()).sum()
    }
}

/// Walk the schedule pagination from `start_url`, merging date groups
/// across pages. Stops silently at [`MAX_SCHEDULE_PAGES`].
pub async fn walk_schedule(
    fetcher: &impl PageFetcher,
    start_url: &str,
    page_delay: Duration,
) -> ScheduleWalk {
    let mut walk = ScheduleWalk {
        pages_processed: 0,
        groups: Vec::new(),
        error: None,
    };
    let mut url = start_url.to_string();

    loop {
        let html = match fetcher.fetch_page(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("schedule walk stopped at page {}: {}", walk.pages_processed + 1, e);
                walk.error = Some(e);
                break;
            }
        };
        walk.pages_processed += 1;

        merge_groups(&mut walk.groups, extract_schedule(&html, fetcher.base_url()));

        let pagination = extract_pagination(&html, fetcher.base_url());
        match pagination.next_page_url {
            Some(next) if walk.pages_processed < MAX_SCHEDULE_PAGES => {
                debug!("schedule page {} done, next {}", walk.pages_processed, next);
                url = next;
                sleep(page_delay).await;
            }
            _ => break,
        }
    }

    walk
}

/// Groups whose date was already seen extend that group in place; new dates
/// append. First-seen order is preserved.
fn merge_groups(into: &mut Vec<MatchDayGroup>, from: Vec<MatchDayGroup>) {
    for group in from {
        match into.iter_mut().find(|g| g.date == group.date) {
            Some(existing) => existing.matches.extend(group.matches),
            None => into.push(group),
        }
    }
}
