use leasegate_domain::rate_limit_key;

use super::*;

/// Returns the advisory limiter preset for an identity and address pair.
pub async fn risk_assessment_handler(
    State(state): State<AppState>,
    Query(query): Query<RiskAssessmentQuery>,
) -> ApiResult<Json<RiskAssessmentResponse>> {
    let key = rate_limit_key(query.identity.as_deref(), query.address.as_str());
    let assessment = state.adaptive_rate_limit_service.assess(&key).await?;

    Ok(Json(RiskAssessmentResponse::from(assessment)))
}
