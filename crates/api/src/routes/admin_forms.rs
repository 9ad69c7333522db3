//! Staff form management routes.
//!
//! All routes require a staff principal.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use domain::models::entry::{Entry, ListEntriesResponse};
use domain::models::field::Field;
use domain::models::form::{
    generate_slug, AdminFormResponse, CreateFormRequest, EmailSettings, Form,
    ListAdminFormsResponse, UpdateFormRequest,
};
use persistence::repositories::{EntryRepository, FieldRepository, FormRepository};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

const DEFAULT_BUTTON_TEXT: &str = "Submit";
const FALLBACK_SLUG: &str = "form";

/// Builds a new form from a validated request.
fn new_form(request: CreateFormRequest, slug: String, default_site: i32) -> Form {
    let now = Utc::now();
    Form {
        id: Uuid::new_v4(),
        title: request.title,
        slug,
        intro: request.intro,
        button_text: request
            .button_text
            .unwrap_or_else(|| DEFAULT_BUTTON_TEXT.to_string()),
        response: request.response,
        view_policy: request.view.map(Into::into).unwrap_or_default(),
        submit_policy: request.submit.map(Into::into).unwrap_or_default(),
        responses_policy: request.responses.map(Into::into).unwrap_or_default(),
        publish_date: request.publish_date,
        expiry_date: request.expiry_date,
        anonymous_vote: request.anonymous_vote.unwrap_or(true),
        email: EmailSettings {
            send_email: request.send_email.unwrap_or(true),
            email_from: request.email_from.unwrap_or_default(),
            email_copies: request.email_copies.unwrap_or_default(),
            email_subject: request.email_subject.unwrap_or_default(),
            email_message: request.email_message.unwrap_or_default(),
        },
        site_ids: request.site_ids.unwrap_or_else(|| vec![default_site]),
        created_at: now,
        updated_at: now,
    }
}

/// Loads a form by ID or fails with 404.
pub(crate) async fn find_form(state: &AppState, form_id: Uuid) -> Result<Form, ApiError> {
    FormRepository::new(state.pool.clone())
        .find_by_id(form_id)
        .await?
        .ok_or_else(ApiError::form_not_found)
}

/// Create a form.
///
/// POST /api/v1/admin/forms
///
/// Without an explicit slug one is derived from the title and made unique
/// by appending `-2`, `-3`, ... An explicit slug that is taken is a conflict.
pub async fn create_form(
    State(state): State<AppState>,
    Json(request): Json<CreateFormRequest>,
) -> Result<(StatusCode, Json<AdminFormResponse>), ApiError> {
    request.validate()?;

    let repo = FormRepository::new(state.pool.clone());

    let slug = match request.slug.as_deref() {
        Some(slug) => slug.to_string(),
        None => {
            let mut base = generate_slug(&request.title);
            if base.is_empty() {
                base = FALLBACK_SLUG.to_string();
            }
            repo.generate_unique_slug(&base).await?
        }
    };

    let form = new_form(request, slug, state.config.forms.site_id);
    let form = repo.create(&form).await?;

    info!(
        form_id = %form.id,
        form_slug = %form.slug,
        "Form created"
    );

    Ok((
        StatusCode::CREATED,
        Json(AdminFormResponse {
            form,
            total_entries: 0,
        }),
    ))
}

/// List every form with its entry count.
///
/// GET /api/v1/admin/forms
pub async fn list_forms(
    State(state): State<AppState>,
) -> Result<Json<ListAdminFormsResponse>, ApiError> {
    let data: Vec<AdminFormResponse> = FormRepository::new(state.pool.clone())
        .list_all_with_counts()
        .await?
        .into_iter()
        .map(|(form, total_entries)| AdminFormResponse {
            form,
            total_entries,
        })
        .collect();
    let count = data.len();

    Ok(Json(ListAdminFormsResponse { data, count }))
}

/// Get a form.
///
/// GET /api/v1/admin/forms/:form_id
pub async fn get_form(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> Result<Json<AdminFormResponse>, ApiError> {
    let form = find_form(&state, form_id).await?;
    let total_entries = EntryRepository::new(state.pool.clone())
        .count_for_form(form_id)
        .await?;

    Ok(Json(AdminFormResponse {
        form,
        total_entries,
    }))
}

/// Update a form. The slug never changes.
///
/// PUT /api/v1/admin/forms/:form_id
pub async fn update_form(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<UpdateFormRequest>,
) -> Result<Json<AdminFormResponse>, ApiError> {
    request.validate()?;

    let existing = find_form(&state, form_id).await?;
    let updated = request.apply(&existing);
    shared::validation::validate_publish_window(updated.publish_date, updated.expiry_date)?;

    let form = FormRepository::new(state.pool.clone())
        .update(&updated)
        .await?
        .ok_or_else(ApiError::form_not_found)?;
    let total_entries = EntryRepository::new(state.pool.clone())
        .count_for_form(form_id)
        .await?;

    info!(form_id = %form.id, "Form updated");

    Ok(Json(AdminFormResponse {
        form,
        total_entries,
    }))
}

/// Delete a form with its fields and entries.
///
/// DELETE /api/v1/admin/forms/:form_id
pub async fn delete_form(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = FormRepository::new(state.pool.clone())
        .delete(form_id)
        .await?;
    if !deleted {
        return Err(ApiError::form_not_found());
    }

    info!(form_id = %form_id, "Form deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Raw entries of a form, oldest first.
///
/// GET /api/v1/admin/forms/:form_id/entries
pub async fn list_entries(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> Result<Json<ListEntriesResponse>, ApiError> {
    find_form(&state, form_id).await?;

    let data = EntryRepository::new(state.pool.clone())
        .list_for_form(form_id)
        .await?;
    let count = data.len();

    Ok(Json(ListEntriesResponse { data, count }))
}

/// Export the entries of a form as CSV.
///
/// GET /api/v1/admin/forms/:form_id/entries/export
pub async fn export_entries(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let form = find_form(&state, form_id).await?;
    let fields = FieldRepository::new(state.pool.clone())
        .list_for_form(form_id)
        .await?;
    let entries = EntryRepository::new(state.pool.clone())
        .list_for_form(form_id)
        .await?;

    let csv = entries_csv(&fields, &entries)
        .map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))?;

    info!(
        form_id = %form.id,
        entries = entries.len(),
        "Exported form entries"
    );

    let disposition = format!("attachment; filename=\"{}-entries.csv\"", form.slug);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// Renders entries as CSV: an "Entry time" column, then one column per
/// field in field order.
fn entries_csv(fields: &[Field], entries: &[Entry]) -> Result<String, csv::Error> {
    let mut ordered: Vec<&Field> = fields.iter().collect();
    ordered.sort_by_key(|f| f.order);

    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["Entry time".to_string()];
    header.extend(ordered.iter().map(|f| f.label.clone()));
    writer.write_record(&header)?;

    for entry in entries {
        let mut row = vec![entry.entry_time.format("%Y-%m-%d %H:%M:%S").to_string()];
        row.extend(
            ordered
                .iter()
                .map(|f| entry.value_for(f.id).unwrap_or_default().to_string()),
        );
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
