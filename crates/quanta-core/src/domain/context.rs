use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::ports::{ExperimentState, Transport, TransportRequest, TransportResponse};

/// Everything a task kind needs to attempt its delivery.
#[derive(Clone)]
pub struct DeliveryContext {
    transport: Arc<dyn Transport>,
    experiments: Arc<dyn ExperimentState>,
    endpoint: Url,
}

impl DeliveryContext {
    pub fn new(
        transport: Arc<dyn Transport>,
        experiments: Arc<dyn ExperimentState>,
        endpoint: Url,
    ) -> Self {
        Self {
            transport,
            experiments,
            endpoint,
        }
    }

    /// Ingest base URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn experiments(&self) -> &dyn ExperimentState {
        self.experiments.as_ref()
    }

    /// Send and collapse transport errors into `None`.
    pub async fn send(&self, request: TransportRequest) -> Option<TransportResponse> {
        let url = request.url.clone();
        match self.transport.send(request).await {
            Ok(response) => Some(response),
            Err(e) => {
                debug!(%url, error = %e, "delivery request failed");
                None
            }
        }
    }
}
