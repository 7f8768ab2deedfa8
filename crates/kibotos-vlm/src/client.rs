use crate::error::VlmError;
use crate::request::{build_payload, parse_scores};
use async_trait::async_trait;
use kibotos_types::{VlmProxyRequest, VlmProxyResponse};
use std::time::Duration;

/// Backoff delays between attempts: 3 attempts total, waiting 1s then 3s
/// between them.
const RETRY_BACKOFF: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(3)];
const MAX_ATTEMPTS: u32 = 3;
const PER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
pub trait VlmClient: Send + Sync {
    async fn score(&self, req: &VlmProxyRequest) -> Result<VlmProxyResponse, VlmError>;
}

/// Talks to any OpenAI-compatible chat-completions endpoint (vLLM, an
/// aggregator, or OpenAI itself). Used either directly by a worker trusted
/// with `VLM_API_KEY`, or internally by `kibotos-api` behind the
/// credential-minimizing `/v1/evaluate/vlm` proxy endpoint.
pub struct HttpVlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpVlmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    async fn call_once(&self, payload: &serde_json::Value) -> Result<VlmProxyResponse, VlmError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .timeout(PER_ATTEMPT_TIMEOUT)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let raw_content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| VlmError::Malformed("missing choices[0].message.content".into()))?;

        let (action_match, perspective, demo_quality, training_utility) =
            parse_scores(raw_content).map_err(VlmError::Malformed)?;

        Ok(VlmProxyResponse {
            action_match,
            perspective,
            demo_quality,
            training_utility,
            model_version: self.model.clone(),
        })
    }
}

#[async_trait]
impl VlmClient for HttpVlmClient {
    async fn score(&self, req: &VlmProxyRequest) -> Result<VlmProxyResponse, VlmError> {
        let payload = build_payload(&self.model, req);

        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.call_once(&payload).await {
                Ok(scores) => return Ok(scores),
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "vlm call failed");
                    last_err = Some(err);
                    if let Some(delay) = RETRY_BACKOFF.get(attempt as usize) {
                        tokio::time::sleep(*delay).await;
                    }
                }
            }
        }

        tracing::error!(attempts = MAX_ATTEMPTS, "vlm exhausted all retry attempts");
        Err(last_err.unwrap_or(VlmError::Exhausted {
            attempts: MAX_ATTEMPTS,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kibotos_types::{ActorType, CameraType};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_request() -> VlmProxyRequest {
        VlmProxyRequest {
            scenario: "pick up the red cube".into(),
            action_description: None,
            camera_type: CameraType::EgoHead,
            actor_type: ActorType::Human,
            keyframes_base64: vec!["AAA=".into()],
        }
    }

    fn chat_response(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "message": { "content": content } }]
        })
    }

    #[tokio::test]
    async fn scores_a_successful_response() {
        let server = MockServer::start().await;
        let body = chat_response(
            r#"{"action_match": 0.8, "perspective": 0.6, "demo_quality": 0.7, "training_utility": 0.9}"#,
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpVlmClient::new(server.uri(), "test-key", "gpt-4o-mini");
        let result = client.score(&sample_request()).await.unwrap();

        assert_eq!(result.action_match, 0.8);
        assert_eq!(result.training_utility, 0.9);
    }

    #[tokio::test]
    async fn retries_on_server_error_then_succeeds() {
        let server = MockServer::start().await;
        let body = chat_response(
            r#"{"action_match": 0.5, "perspective": 0.5, "demo_quality": 0.5, "training_utility": 0.5}"#,
        );

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = HttpVlmClient::new(server.uri(), "test-key", "gpt-4o-mini");
        let result = client.score(&sample_request()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn gives_up_after_exhausting_all_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpVlmClient::new(server.uri(), "test-key", "gpt-4o-mini");
        let result = client.score(&sample_request()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn surfaces_malformed_content_as_an_error() {
        let server = MockServer::start().await;
        let body = chat_response("not json");
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = HttpVlmClient::new(server.uri(), "test-key", "gpt-4o-mini");
        let result = client.score(&sample_request()).await;
        assert!(matches!(result, Err(VlmError::Malformed(_))));
    }
}
