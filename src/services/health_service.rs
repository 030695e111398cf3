//! Health check logic.

use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness, flagging degraded mode when storage is unreachable.
pub async fn health(state: &SharedState) -> HealthResponse {
    match state.require_venue_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test]
    async fn reports_degraded_while_no_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        let response = health(&state).await;
        assert_eq!(response.status, "degraded");
    }
}
