use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use mesa_core::CompanyKey;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "X-API-Key";

// ============================================================================
// Company API key
// ============================================================================

/// Resolves `{company}` and checks `X-API-Key` against its token.
/// On success the [`mesa_core::Company`] is available to handlers as an extension.
pub async fn company_api_key_middleware(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Resolve tenant by id or slug
    let key = CompanyKey::parse(&segment);
    let company = state
        .companies
        .find(&key)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Company lookup failed: {}", e)))?;

    // 2. Compare key
    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    let company = match company {
        Some(company) if company.verify_api_key(presented) => company,
        Some(company) => {
            warn!(company_id = company.id, "Rejected API key");
            return Err(AppError::Unauthorized);
        }
        None => {
            warn!(company = %key, "Unknown company");
            return Err(AppError::Unauthorized);
        }
    };

    // 3. Hand the tenant to the handler
    req.extensions_mut().insert(company);

    Ok(next.run(req).await)
}
