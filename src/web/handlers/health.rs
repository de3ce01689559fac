use crate::web::response::{ApiResult, ok};

/// GET /api/health
pub async fn health() -> ApiResult<&'static str> {
    ok("ok")
}
