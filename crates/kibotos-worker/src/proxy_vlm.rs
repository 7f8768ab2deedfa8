//! `VlmClient` implementation that proxies scoring calls through
//! `kibotos-api` instead of calling the VLM provider directly, so this
//! worker never needs `VLM_API_KEY`. The default wiring in `main`.

use std::sync::Arc;

use async_trait::async_trait;
use kibotos_types::{VlmProxyRequest, VlmProxyResponse};
use kibotos_vlm::VlmError;

use crate::client::GatewayClient;

pub struct ProxyVlmClient {
    gateway: Arc<GatewayClient>,
}

impl ProxyVlmClient {
    pub fn new(gateway: Arc<GatewayClient>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl kibotos_vlm::VlmClient for ProxyVlmClient {
    async fn score(&self, req: &VlmProxyRequest) -> Result<VlmProxyResponse, VlmError> {
        self.gateway
            .score_vlm(req.clone())
            .await
            .map_err(|e| VlmError::Malformed(e.to_string()))
    }
}
