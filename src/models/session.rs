use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-caller state passed explicitly into every ledger operation.
///
/// Everything here is plain data so a session can be persisted, logged or
/// rebuilt in tests without any request machinery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionContext {
    pub session_id: String,
    /// Identity recorded as uploader / analyzer.
    pub user: String,
    pub stage_name: String,
    pub model: String,
}

impl SessionContext {
    pub fn new(user: impl Into<String>, stage_name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            user: user.into(),
            stage_name: stage_name.into(),
            model: model.into(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}
