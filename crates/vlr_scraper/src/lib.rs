//! vlr.gg scraping: schedule listings, match details, pagination walking
//! and the homepage live scoreboard.
//!
//! Extraction functions are pure (HTML in, typed data out) and never fail
//! on missing page furniture; network failures stay in the fetch layer.

pub mod detail;
pub mod error;
pub mod fetch;
pub mod pagination;
pub mod schedule;
pub mod scoreboard;
mod util;

pub use detail::{
    extract_match_detail, BettingSide, BettingSnapshot, MatchStatistics, OddsDirection,
    PlayerStatLine, TeamDetail,
};
pub use error::{Result, ScrapeError};
pub use fetch::{PageFetcher, UserAgentProfile, VlrClient, USER_AGENT_PROFILES, VLR_BASE_URL};
pub use pagination::{
    extract_pagination, walk_schedule, PaginationState, ScheduleWalk, MAX_SCHEDULE_PAGES,
    SCHEDULE_PAGE_DELAY,
};
pub use schedule::{extract_schedule, MatchDayGroup, ScheduledMatch, LIVE_STATUS};
pub use scoreboard::{
    assemble_live_summaries, extract_live_detail_extras, extract_live_scoreboard,
    LiveDetailExtras, LiveMatchSummary, LiveScoreboardRow,
};
