//! Thin `reqwest` client over `kibotos-api`'s internal worker-facing
//! surface. Holds no database or object-store credentials: every
//! capability is mediated by the gateway.

use kibotos_types::{
    DedupCheckRequest, DedupCheckResponse, ErrorBody, FetchRequest, FetchResponse, RenewRequest,
    RenewResponse, SubmitRequest, SubmissionView, VlmProxyRequest, VlmProxyResponse,
};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway rejected request: {code} ({message})")]
    Api { code: String, message: String },
}

pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post_json<Req: serde::Serialize, Res: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        req: &Req,
    ) -> Result<Res, ClientError> {
        let response = self.http.post(self.url(path)).json(req).send().await?;
        if response.status().is_success() {
            Ok(response.json::<Res>().await?)
        } else {
            let body = response.json::<ErrorBody>().await?;
            Err(ClientError::Api {
                code: body.code,
                message: body.message,
            })
        }
    }

    pub async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, ClientError> {
        self.post_json("/v1/evaluate/fetch", &req).await
    }

    pub async fn submit(&self, req: SubmitRequest) -> Result<SubmissionView, ClientError> {
        self.post_json("/v1/evaluate/submit", &req).await
    }

    pub async fn renew(
        &self,
        worker_id: &str,
        uuid: Uuid,
        lease_duration_sec: u32,
    ) -> Result<RenewResponse, ClientError> {
        let req = RenewRequest {
            worker_id: worker_id.to_string(),
            uuid,
            lease_duration_sec,
        };
        self.post_json("/v1/evaluate/renew", &req).await
    }

    pub async fn score_vlm(&self, req: VlmProxyRequest) -> Result<VlmProxyResponse, ClientError> {
        self.post_json("/v1/evaluate/vlm", &req).await
    }

    pub async fn dedup_check(
        &self,
        cycle_id: i64,
        phash: String,
    ) -> Result<DedupCheckResponse, ClientError> {
        let req = DedupCheckRequest { cycle_id, phash };
        self.post_json("/v1/evaluate/dedup", &req).await
    }

    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
