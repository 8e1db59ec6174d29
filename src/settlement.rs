//! On-chain settlement calls. The endpoint resolves challenges by match:
//! one call per settled match, naming the winning side.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct SettlementOutcome {
    pub success: bool,
    #[serde(rename = "txHash", default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub struct SettlementClient {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl SettlementClient {
    pub fn new(endpoint: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, endpoint }
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Report the winner for a challenge. With no endpoint configured this
    /// is a logged no-op that reports success, so matches still settle
    /// locally in development.
    pub async fn settle(&self, challenge_id: u64, player_id: u8) -> Result<SettlementOutcome> {
        let Some(endpoint) = &self.endpoint else {
            info!(
                "settlement disabled, skipping call for challenge {} player {}",
                challenge_id, player_id
            );
            return Ok(SettlementOutcome {
                success: true,
                tx_hash: None,
                error: None,
            });
        };

        let body = serde_json::json!({
            "challengeId": challenge_id,
            "playerId": player_id,
        });
        let response = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Settlement(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Settlement(format!(
                "endpoint returned HTTP {status}"
            )));
        }
        response
            .json::<SettlementOutcome>()
            .await
            .map_err(|e| AppError::Settlement(format!("bad response body: {e}")))
    }
}
