//! Handoff Policy Rule REST API Routes
//!
//! The validator endpoint is pure: violations come back as data in the 200
//! response body, never as HTTP errors, so admin tooling can render them
//! field by field.

use axum::{response::IntoResponse, Json};

use convoy_core::policy::{normalize_rules, validate_rules};

use crate::error::ApiResult;
use crate::types::{ValidatePolicyRulesRequest, ValidatePolicyRulesResponse};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/handoff-policy-rules/validate - Validate and normalize rules
#[utoipa::path(
    post,
    path = "/api/v1/handoff-policy-rules/validate",
    tag = "Policies",
    request_body = ValidatePolicyRulesRequest,
    responses(
        (status = 200, description = "Validation outcome with normalized rules", body = ValidatePolicyRulesResponse),
    )
)]
pub async fn validate_policy_rules(
    Json(req): Json<ValidatePolicyRulesRequest>,
) -> ApiResult<impl IntoResponse> {
    let errors = validate_rules(&req.rules);
    let normalized = normalize_rules(req.rules);
    Ok(Json(ValidatePolicyRulesResponse { errors, normalized }))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> axum::Router {
    axum::Router::new().route("/validate", axum::routing::post(validate_policy_rules))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_request_deserializes_raw_rules() {
        let req: ValidatePolicyRulesRequest = serde_json::from_value(serde_json::json!({
            "rules": [
                {
                    "trigger_type": "confidence_below_threshold",
                    "criteria": { "threshold": 0.4 },
                },
                {
                    "trigger_type": "something_custom",
                    "criteria": {},
                }
            ]
        }))
        .unwrap();
        assert_eq!(req.rules.len(), 2);

        let errors = validate_rules(&req.rules);
        assert!(errors.is_empty());
        // Unknown trigger types are dropped by the normalizer, not rejected.
        let normalized = normalize_rules(req.rules);
        assert_eq!(normalized.len(), 1);
    }
}
