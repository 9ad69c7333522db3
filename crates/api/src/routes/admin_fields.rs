//! Staff field management routes.
//!
//! Field order stays contiguous per form: adding, moving and deleting
//! fields shift their neighbours.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::field::{
    generate_field_slug, CreateFieldRequest, Field, FieldLimits, ListFieldsResponse,
    UpdateFieldRequest,
};
use persistence::repositories::FieldRepository;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::admin_forms::find_form;
use crate::app::AppState;
use crate::error::{ApiError, ValidationDetail};

const FALLBACK_SLUG: &str = "field";

fn field_not_found() -> ApiError {
    ApiError::NotFound("Field not found".into())
}

/// Rejects field definitions exceeding the configured limits.
fn check_limits(limits: &FieldLimits, field: &Field) -> Result<(), ApiError> {
    let details: Vec<ValidationDetail> = limits
        .check(field)
        .into_iter()
        .map(|(attribute, message)| ValidationDetail {
            field: attribute.to_string(),
            message,
        })
        .collect();

    if details.is_empty() {
        Ok(())
    } else {
        Err(ApiError::invalid_fields(details))
    }
}

/// List the fields of a form in display order.
///
/// GET /api/v1/admin/forms/:form_id/fields
pub async fn list_fields(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> Result<Json<ListFieldsResponse>, ApiError> {
    find_form(&state, form_id).await?;

    let data = FieldRepository::new(state.pool.clone())
        .list_for_form(form_id)
        .await?;
    let count = data.len();

    Ok(Json(ListFieldsResponse { data, count }))
}

/// Add a field to a form.
///
/// POST /api/v1/admin/forms/:form_id/fields
///
/// Without an order the field is appended. Without a slug one is derived
/// from the label and made unique within the form.
pub async fn create_field(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<CreateFieldRequest>,
) -> Result<(StatusCode, Json<Field>), ApiError> {
    request.validate()?;
    find_form(&state, form_id).await?;

    let repo = FieldRepository::new(state.pool.clone());

    let slug = match request.slug.as_deref() {
        Some(slug) => slug.to_string(),
        None => {
            let mut base = generate_field_slug(&request.label);
            if base.is_empty() {
                base = FALLBACK_SLUG.to_string();
            }
            repo.generate_unique_slug(form_id, &base).await?
        }
    };

    let now = Utc::now();
    let field = Field {
        id: Uuid::new_v4(),
        form_id,
        label: request.label,
        slug,
        field_type: request.field_type,
        order: 0,
        required: request.required.unwrap_or(true),
        visible: request.visible.unwrap_or(true),
        choices: request.choices,
        default_value: request.default_value,
        placeholder_text: request.placeholder_text,
        help_text: request.help_text,
        created_at: now,
        updated_at: now,
    };
    check_limits(&state.config.forms.field_limits(), &field)?;

    let field = repo.create(&field, request.order).await?;

    info!(
        form_id = %form_id,
        field_id = %field.id,
        field_type = %field.field_type,
        order = field.order,
        "Field created"
    );

    Ok((StatusCode::CREATED, Json(field)))
}

/// Update a field, moving it when `order` is given.
///
/// PUT /api/v1/admin/forms/:form_id/fields/:field_id
pub async fn update_field(
    State(state): State<AppState>,
    Path((form_id, field_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateFieldRequest>,
) -> Result<Json<Field>, ApiError> {
    request.validate()?;

    let repo = FieldRepository::new(state.pool.clone());
    let existing = repo
        .find(form_id, field_id)
        .await?
        .ok_or_else(field_not_found)?;

    let updated = request.apply(&existing)?;
    check_limits(&state.config.forms.field_limits(), &updated)?;

    let field = repo
        .update(&updated, request.order)
        .await?
        .ok_or_else(field_not_found)?;

    info!(
        form_id = %form_id,
        field_id = %field.id,
        order = field.order,
        "Field updated"
    );

    Ok(Json(field))
}

/// Delete a field and close the gap in the form's field order.
///
/// DELETE /api/v1/admin/forms/:form_id/fields/:field_id
///
/// Stored answers for the field are kept.
pub async fn delete_field(
    State(state): State<AppState>,
    Path((form_id, field_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let deleted = FieldRepository::new(state.pool.clone())
        .delete(form_id, field_id)
        .await?;
    if !deleted {
        return Err(field_not_found());
    }

    info!(form_id = %form_id, field_id = %field_id, "Field deleted");
    Ok(StatusCode::NO_CONTENT)
}
