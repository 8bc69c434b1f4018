use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lead Capture API",
        version = "1.0.0",
        description = r#"
# Lead Capture API

Stores sales leads submitted from a public contact form and exposes them
for review.

Leads are addressed by their public identifier (`LEAD-` followed by twelve
uppercase hex digits). Failures share one JSON envelope:

```json
{
  "error": "Bad Request",
  "message": "Name and phone are required",
  "request_id": "3f1c...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
"#
    ),
    tags(
        (name = "leads", description = "Lead capture and review endpoints"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::health::readiness_check,
        crate::handlers::leads::create_lead,
        crate::handlers::leads::list_leads,
        crate::handlers::leads::get_lead,
        crate::handlers::leads::delete_lead,
        crate::handlers::leads::lead_stats,
    ),
    components(
        schemas(
            crate::handlers::health::HealthResponse,
            crate::handlers::health::ReadinessResponse,
            crate::handlers::leads::CreateLeadRequest,
            crate::handlers::leads::CreateLeadResponse,
            crate::handlers::leads::LeadResponse,
            crate::handlers::leads::MessageResponse,
            crate::handlers::leads::StatsResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}
