use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::lead::Model as Lead;
use crate::errors::{ErrorResponse, ServiceError};
use crate::ids::is_public_id;
use crate::repositories::NewLead;
use crate::AppState;

pub const REQUIRED_FIELDS_MESSAGE: &str = "Name and phone are required";
pub const LEAD_NOT_FOUND_MESSAGE: &str = "Lead not found";
pub const LEAD_SAVED_MESSAGE: &str = "Lead saved successfully";
pub const LEAD_DELETED_MESSAGE: &str = "Lead deleted successfully";

/// Lead submission. `name` and `phone` must be present and non-empty.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLeadRequest {
    #[serde(default, deserialize_with = "required_text")]
    #[validate(required, length(min = 1))]
    #[schema(example = "Alice")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "required_text")]
    #[validate(required, length(min = 1))]
    #[schema(example = "555-1234")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub quantity: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
}

/// Accepts strings, numbers and booleans as text; `null` means absent.
/// Web forms routinely send `quantity` as a number.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(serde::de::Error::custom(
            "expected a string, number or boolean",
        )),
    }
}

/// Text for `name` and `phone`: booleans and zero count as absent.
fn required_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) | Some(Value::Bool(_)) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(serde::de::Error::custom("expected a string or number")),
    }
}

impl CreateLeadRequest {
    fn into_new_lead(self) -> Result<NewLead, ServiceError> {
        if self.validate().is_err() {
            return Err(ServiceError::ValidationError(
                REQUIRED_FIELDS_MESSAGE.to_string(),
            ));
        }
        match (self.name, self.phone) {
            (Some(name), Some(phone)) => Ok(NewLead {
                name,
                phone,
                city: self.city,
                quantity: self.quantity,
                message: self.message,
            }),
            _ => Err(ServiceError::ValidationError(
                REQUIRED_FIELDS_MESSAGE.to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateLeadResponse {
    /// Public id of the new lead
    #[schema(example = "LEAD-9F2C04A1B7E3")]
    pub id: String,
    pub message: String,
}

/// A stored lead as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeadResponse {
    #[schema(example = "LEAD-9F2C04A1B7E3")]
    pub public_id: String,
    pub name: String,
    pub phone: String,
    pub city: Option<String>,
    pub quantity: Option<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Lead> for LeadResponse {
    fn from(model: Lead) -> Self {
        Self {
            public_id: model.public_id,
            name: model.name,
            phone: model.phone,
            city: model.city,
            quantity: model.quantity,
            message: model.message,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    #[serde(rename = "totalLeads")]
    pub total_leads: u64,
}

/// Submit a new lead
#[utoipa::path(
    post,
    path = "/api/leads",
    request_body = CreateLeadRequest,
    responses(
        (status = 201, description = "Lead stored", body = CreateLeadResponse),
        (status = 400, description = "Name or phone missing", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "leads"
)]
pub async fn create_lead(
    State(state): State<AppState>,
    payload: Result<Json<CreateLeadRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection, "Rejected lead submission body");
        ServiceError::BadRequest(REQUIRED_FIELDS_MESSAGE.to_string())
    })?;

    let new_lead = request.into_new_lead()?;
    let public_id = state.store.insert(new_lead).await?;
    info!(public_id = %public_id, "Lead created");

    Ok((
        StatusCode::CREATED,
        Json(CreateLeadResponse {
            id: public_id,
            message: LEAD_SAVED_MESSAGE.to_string(),
        }),
    ))
}

/// List every lead, newest first
#[utoipa::path(
    get,
    path = "/api/leads",
    responses(
        (status = 200, description = "All leads", body = [LeadResponse]),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "leads"
)]
pub async fn list_leads(
    State(state): State<AppState>,
) -> Result<Json<Vec<LeadResponse>>, ServiceError> {
    let leads = state.store.list_all().await?;
    Ok(Json(leads.into_iter().map(LeadResponse::from).collect()))
}

/// Ids that cannot name a lead are answered without a storage round trip
fn ensure_public_id(id: &str) -> Result<(), ServiceError> {
    if is_public_id(id) {
        Ok(())
    } else {
        debug!(id = %id, "Malformed lead id");
        Err(ServiceError::NotFound(LEAD_NOT_FOUND_MESSAGE.to_string()))
    }
}

/// Fetch one lead by public id
#[utoipa::path(
    get,
    path = "/api/leads/{id}",
    params(("id" = String, Path, description = "Public lead id, e.g. LEAD-9F2C04A1B7E3")),
    responses(
        (status = 200, description = "The lead", body = LeadResponse),
        (status = 404, description = "No lead with this id", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "leads"
)]
pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LeadResponse>, ServiceError> {
    ensure_public_id(&id)?;
    state
        .store
        .find_by_public_id(&id)
        .await?
        .map(|lead| Json(LeadResponse::from(lead)))
        .ok_or_else(|| ServiceError::NotFound(LEAD_NOT_FOUND_MESSAGE.to_string()))
}

/// Delete one lead by public id
#[utoipa::path(
    delete,
    path = "/api/leads/{id}",
    params(("id" = String, Path, description = "Public lead id")),
    responses(
        (status = 200, description = "Lead deleted", body = MessageResponse),
        (status = 404, description = "No lead with this id", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "leads"
)]
pub async fn delete_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServiceError> {
    ensure_public_id(&id)?;
    if !state.store.delete_by_public_id(&id).await? {
        return Err(ServiceError::NotFound(LEAD_NOT_FOUND_MESSAGE.to_string()));
    }

    info!(public_id = %id, "Lead deleted");
    Ok(Json(MessageResponse {
        message: LEAD_DELETED_MESSAGE.to_string(),
    }))
}

/// Total number of stored leads
#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Lead count", body = StatsResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    ),
    tag = "leads"
)]
pub async fn lead_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, ServiceError> {
    let total_leads = state.store.count().await?;
    Ok(Json(StatsResponse { total_leads }))
}
