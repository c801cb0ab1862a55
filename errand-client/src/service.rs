//! Service-level API endpoints

use errand_core::dto::service::{HealthResponse, ServiceInfo, StatsResponse};

use crate::ErrandClient;
use crate::error::Result;

impl ErrandClient {
    /// Fetch the service banner
    pub async fn info(&self) -> Result<ServiceInfo> {
        let url = self.endpoint([""])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    /// Check that the orchestrator is up
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.endpoint(["health"])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }

    /// Fetch executor load and job counts per status
    pub async fn stats(&self) -> Result<StatsResponse> {
        let url = self.endpoint(["stats"])?;
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }
}
