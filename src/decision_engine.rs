use crate::errors::AppError;
use crate::models::{ApplicationRequest, DecisionResult, APPROVED_LABEL, REJECTED_LABEL};
use serde_json::Value;
use std::time::Duration;

/// Client for the external credit decision engine.
///
/// One POST per call. No retries, no authentication.
#[derive(Clone)]
pub struct DecisionEngineClient {
    client: reqwest::Client,
    url: String,
}

impl DecisionEngineClient {
    /// Creates a new `DecisionEngineClient`.
    ///
    /// # Arguments
    ///
    /// * `url` - Full URL of the decision endpoint.
    /// * `timeout` - Optional deadline for the whole exchange; `None` waits indefinitely.
    pub fn new(url: String, timeout: Option<Duration>) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            AppError::TransportFailure(format!("Failed to create decision engine client: {}", e))
        })?;

        Ok(Self { client, url })
    }

    /// Posts the application and returns the engine's raw JSON answer.
    ///
    /// # Returns
    ///
    /// * `Result<Value, AppError>` - The parsed response body, `ServiceUnavailable` on a
    ///   non-success status, `TransportFailure` when the exchange itself fails.
    pub async fn submit(&self, application: &ApplicationRequest) -> Result<Value, AppError> {
        tracing::info!("Submitting credit application to decision engine: {}", self.url);
        tracing::debug!("Application payload: {:?}", application);

        let response = self
            .client
            .post(&self.url)
            .json(application)
            .send()
            .await
            .map_err(|e| {
                AppError::TransportFailure(format!("Decision engine request failed: {}", e))
            })?;

        let status = response.status();
        tracing::info!("Decision engine response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!("Decision engine returned {}: {}", status, error_text);
            return Err(AppError::ServiceUnavailable(error_text));
        }

        let data: Value = response.json().await.map_err(|e| {
            AppError::TransportFailure(format!("Failed to parse decision engine response: {}", e))
        })?;
        tracing::debug!("Decision engine response: {}", data);

        Ok(data)
    }
}

/// Translates an engine response into the UI-facing result.
///
/// Any missing or mistyped field falls back to its empty value.
pub fn map_decision(raw: &Value, requested_amount: f64) -> DecisionResult {
    let details = raw.get("details");

    let approved = details
        .and_then(|d| d.get("decision"))
        .and_then(|d| d.as_str())
        == Some("APPROVED");

    let reasons_positive = string_list(details.and_then(|d| d.get("reasons_positive")));
    let reasons_negative = string_list(details.and_then(|d| d.get("reasons_negative")));

    let decision_reason = reasons_positive
        .iter()
        .chain(reasons_negative.iter())
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");

    let monthly_installment = details
        .and_then(|d| d.get("features"))
        .and_then(|f| f.get("monthly_installment"))
        .and_then(|m| m.as_f64());

    DecisionResult {
        decision: if approved {
            APPROVED_LABEL
        } else {
            REJECTED_LABEL
        }
        .to_string(),
        approved,
        credit_score: raw.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0),
        decision_reason: (!decision_reason.is_empty()).then_some(decision_reason),
        recommended_amount: requested_amount,
        conditions: (!reasons_negative.is_empty()).then_some(reasons_negative),
        monthly_installment,
    }
}

// Non-string entries are dropped
fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
