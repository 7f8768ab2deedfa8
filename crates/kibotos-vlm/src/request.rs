//! Builds an OpenAI-compatible chat-completions payload from a scoring
//! request: a system rubric prompt plus one user message carrying the task
//! context and the extracted keyframes as base64 image content parts.

use kibotos_types::VlmProxyRequest;
use serde_json::{json, Value};

const SYSTEM_PROMPT: &str = "You are evaluating a robot-task demonstration video against a \
prompt. Score four dimensions in [0, 1]: action_match (does the action match the described \
task), perspective (does the camera/actor framing match the requested setup), demo_quality \
(is the demonstration clear and usable), training_utility (would this clip be useful training \
data). Respond with a single JSON object with exactly those four numeric keys.";

pub fn build_payload(model: &str, req: &VlmProxyRequest) -> Value {
    let mut content: Vec<Value> = vec![json!({
        "type": "text",
        "text": format!(
            "scenario: {}\ncamera_type: {}\nactor_type: {}\naction_description: {}",
            req.scenario,
            req.camera_type.as_str(),
            req.actor_type.as_str(),
            req.action_description.as_deref().unwrap_or("(none provided)"),
        ),
    })];

    for frame in &req.keyframes_base64 {
        content.push(json!({
            "type": "image_url",
            "image_url": { "url": format!("data:image/jpeg;base64,{frame}") },
        }));
    }

    json!({
        "model": model,
        "response_format": { "type": "json_object" },
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": content },
        ],
    })
}

/// Extracts the four sub-scores from the model's `message.content` JSON
/// string. Each score is clamped into `[0, 1]`: a VLM that returns a value
/// slightly outside range (e.g. `1.0000001` from float formatting) shouldn't
/// fail the whole evaluation.
pub fn parse_scores(raw_content: &str) -> Result<(f64, f64, f64, f64), String> {
    let parsed: Value = serde_json::from_str(raw_content)
        .map_err(|e| format!("response content is not valid JSON: {e}"))?;

    let field = |name: &str| -> Result<f64, String> {
        parsed
            .get(name)
            .and_then(Value::as_f64)
            .map(|v| v.clamp(0.0, 1.0))
            .ok_or_else(|| format!("missing or non-numeric field `{name}`"))
    };

    Ok((
        field("action_match")?,
        field("perspective")?,
        field("demo_quality")?,
        field("training_utility")?,
    ))
}
