use crate::AppState;
use crate::models::SessionContext;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-session-id";
/// Identity set by the hosting platform in front of this service.
pub const USER_HEADER: &str = "x-user";
pub const MODEL_HEADER: &str = "x-model";

const ANONYMOUS: &str = "anonymous";

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(SessionContext {
            session_id: header(parts, SESSION_HEADER).unwrap_or_else(|| Uuid::new_v4().to_string()),
            user: header(parts, USER_HEADER).unwrap_or_else(|| ANONYMOUS.to_string()),
            stage_name: state.config.stage_name.clone(),
            model: header(parts, MODEL_HEADER).unwrap_or_else(|| state.config.default_model.clone()),
        })
    }
}
