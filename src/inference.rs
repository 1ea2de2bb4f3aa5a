//! The inference gateway: the plain prompt relay and the essay-grading
//! variant.
//!
//! Both handlers treat the model output as opaque text. The grader asks the
//! model for a specific JSON shape but does not parse or validate what comes
//! back; the caller receives it verbatim under `completion`.

use lambda_runtime::tracing;
use serde_json::{json, Value};

use crate::model::{InferenceError, ModelClient, ModelFamily};
use crate::prompts::GradingTemplate;
use crate::response::ApiResponse;

// The relay keeps the original short-completion budget; the grader needs
// room for dozens of suggestion objects.
const RELAY_MAX_TOKENS: u32 = 300;
const GRADER_MAX_TOKENS: u32 = 2048;

/// Relay a free-form prompt to the model. The body is parsed leniently and
/// `prompt` defaults to the empty string, so the only failure mode is the
/// upstream invocation itself.
pub async fn handle_generate(
    raw_body: Option<&str>,
    model: &dyn ModelClient,
    model_id: &str,
) -> ApiResponse {
    let body = crate::lenient_body(raw_body);
    let prompt = body.get("prompt").and_then(Value::as_str).unwrap_or("");

    let family = ModelFamily::for_model_id(model_id);
    let envelope = family.request_envelope(None, prompt, RELAY_MAX_TOKENS);

    complete(model, model_id, family, &envelope).await
}

/// Grade a question/answer pair. Unlike the relay, malformed input is
/// rejected with a 400 carrying the parse or key error.
pub async fn handle_grade(
    raw_body: Option<&str>,
    model: &dyn ModelClient,
    model_id: &str,
    template: &GradingTemplate,
) -> ApiResponse {
    let graded = parse_grade_request(raw_body);
    let (question, answer) = match &graded {
        Ok(pair) => pair,
        Err(err) => {
            tracing::error!("rejected grading request: {err}");
            return ApiResponse::json(400, json!({ "error": err.to_string() }));
        }
    };

    let task = template.render(question, answer);
    let family = ModelFamily::for_model_id(model_id);
    let envelope = family.request_envelope(Some(template.system), &task, GRADER_MAX_TOKENS);

    complete(model, model_id, family, &envelope).await
}

fn parse_grade_request(raw: Option<&str>) -> Result<(String, String), InferenceError> {
    let raw = raw.ok_or_else(|| InferenceError::BadRequest("request body is required".into()))?;
    let body: Value = serde_json::from_str(raw)
        .map_err(|e| InferenceError::BadRequest(format!("invalid JSON body: {e}")))?;

    let question = require_str(&body, "question")?;
    let answer = require_str(&body, "answer")?;
    Ok((question.to_owned(), answer.to_owned()))
}

fn require_str<'a>(body: &'a Value, field: &str) -> Result<&'a str, InferenceError> {
    body.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| InferenceError::BadRequest(format!("missing required field `{field}`")))
}

async fn complete(
    model: &dyn ModelClient,
    model_id: &str,
    family: ModelFamily,
    envelope: &Value,
) -> ApiResponse {
    let outcome = match model.invoke(model_id, envelope).await {
        Ok(reply) => family.completion_text(&reply),
        Err(err) => Err(err),
    };

    match outcome {
        Ok(text) => ApiResponse::json(200, json!({ "completion": text })),
        Err(err) => {
            tracing::error!("model invocation failed: {err}");
            ApiResponse::json(500, json!({ "error": err.to_string() }))
        }
    }
}
