//! One-shot probe for the vlr.gg scraper
//! Run: cargo run --bin vlr-probe [live | <match url or path>]

use anyhow::Result;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use vlr_scraper::{
    assemble_live_summaries, extract_live_scoreboard, extract_match_detail, extract_pagination,
    extract_schedule, PageFetcher, VlrClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let client = VlrClient::new();

    match std::env::args().nth(1).as_deref() {
        None => probe_schedule(&client).await,
        Some("live") => probe_live(&client).await,
        Some(target) => probe_match(&client, target).await,
    }

    Ok(())
}

async fn probe_schedule(client: &VlrClient) {
    info!("🩺 Probing {}/matches ...", client.base_url());
    let html = match client.fetch_page(&format!("{}/matches", client.base_url())).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Schedule fetch failed: {}", e);
            return;
        }
    };

    let groups = extract_schedule(&html, client.base_url());
    info!("Found {} date groups:", groups.len());
    for group in &groups {
        let live = group.matches.iter().filter(|m| m.is_live()).count();
        info!("  {} -> {} matches ({} live)", group.date, group.matches.len(), live);
        if let Some(first) = group.matches.first() {
            info!(
                "    e.g. {} vs {} [{}]",
                first.team1.as_deref().unwrap_or("?"),
                first.team2.as_deref().unwrap_or("?"),
                first.status.as_deref().unwrap_or("-"),
            );
        }
    }

    let pagination = extract_pagination(&html, client.base_url());
    info!(
        "Pagination: page {}, next: {}",
        pagination.current_page,
        pagination.next_page_url.as_deref().unwrap_or("none"),
    );
}

async fn probe_live(client: &VlrClient) {
    info!("🔍 Fetching the live scoreboard from {} ...", client.base_url());
    let html = match client.fetch_page(&format!("{}/", client.base_url())).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Front page fetch failed: {}", e);
            return;
        }
    };

    let rows = extract_live_scoreboard(&html, client.base_url());
    if rows.is_empty() {
        info!("No live matches right now.");
        return;
    }
    info!("{} live matches, fetching details...", rows.len());

    for s in assemble_live_summaries(client, rows).await {
        info!(
            "📡 {} {} : {} {} | map {} ({}) | {}",
            s.team1, s.score1, s.score2, s.team2, s.map_number, s.current_map, s.match_event,
        );
    }
}

async fn probe_match(client: &VlrClient, target: &str) {
    let url = if target.starts_with("http") {
        target.to_string()
    } else {
        format!("{}{}", client.base_url(), target)
    };
    info!("🔍 Fetching match page {} ...", url);

    let html = match client.fetch_page(&url).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Match fetch failed: {}", e);
            return;
        }
    };

    let stats = extract_match_detail(&html, client.base_url());
    info!(
        "Teams: {} vs {}",
        stats.team1.name.as_deref().unwrap_or("?"),
        stats.team2.name.as_deref().unwrap_or("?"),
    );
    info!(
        "Score: {:?}-{:?} live: {:?} won: {}/{}",
        stats.team1.score, stats.team2.score, stats.is_live, stats.team1.is_won, stats.team2.is_won,
    );
    info!(
        "Players parsed: {} + {}",
        stats.team1.players.len(),
        stats.team2.players.len(),
    );
    match stats.betting {
        Some(b) => info!(
            "Betting: {:?} ({:?}) vs {:?} ({:?})",
            b.team1.odds, b.team1.direction, b.team2.odds, b.team2.direction,
        ),
        None => info!("Betting: no odds on the page"),
    }
}
