use kibotos_types::KibotosError;

#[derive(Debug, thiserror::Error)]
pub enum VlmError {
    #[error("vlm request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vlm returned an unparseable response: {0}")]
    Malformed(String),

    #[error("vlm unavailable after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Every `VlmError` is an intermittent-infrastructure failure, never a
/// miner fault, so callers route it through `VLM_UNAVAILABLE` handling at
/// the evaluation commit layer rather than treating it as a hard error.
impl From<VlmError> for KibotosError {
    fn from(err: VlmError) -> Self {
        KibotosError::Internal(err.to_string())
    }
}
