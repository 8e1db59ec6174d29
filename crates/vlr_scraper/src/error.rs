use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Failures talking to vlr.gg. Extraction itself never fails: missing
/// nodes degrade to `None` fields on the extracted structs.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}
