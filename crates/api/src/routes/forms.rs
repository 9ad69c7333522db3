//! Public form routes: listing, detail, submission and aggregated responses.
//!
//! A form that is missing, unpublished, or whose policy denies the action
//! is reported as not found.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use domain::models::entry::{NewEntry, SubmitEntryRequest, SubmitEntryResponse};
use domain::models::field::FieldDetail;
use domain::models::form::{
    Form, FormAction, FormDetail, FormSummary, ListFormsResponse, PublishContext,
};
use domain::models::principal::Principal;
use domain::models::FieldEntry;
use domain::services::{
    authorize, build_submission_mails, can_perform, clean_submission, dispatch_all, summarize,
    submitter_for, ResponsesSummary, SubmissionError,
};
use persistence::repositories::{
    CreateEntryError, EntryRepository, FieldRepository, FormRepository,
};
use tracing::{debug, info};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentPrincipal;
use crate::middleware::metrics::{
    record_duplicate_submission, record_entry_submitted, record_invalid_submission,
    record_mails_sent,
};

fn publish_context(state: &AppState) -> PublishContext {
    PublishContext::new(Utc::now(), state.config.forms.current_site())
}

/// Loads a form by slug and checks that the principal may perform `action`.
async fn authorized_form(
    state: &AppState,
    slug: &str,
    principal: &Principal,
    action: FormAction,
) -> Result<Form, ApiError> {
    let repo = FormRepository::new(state.pool.clone());
    let form = repo
        .find_by_slug(slug)
        .await?
        .ok_or_else(ApiError::form_not_found)?;

    if let Err(reason) = authorize(&form, principal, action, &publish_context(state)) {
        debug!(
            form_slug = %slug,
            action = %action,
            reason = %reason,
            "Form action refused"
        );
        return Err(reason.into());
    }
    Ok(form)
}

/// List the forms the principal may view.
///
/// GET /api/v1/forms
///
/// Anonymous and regular users see published forms whose view policy
/// admits them. Staff see every form.
pub async fn list_forms(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<ListFormsResponse>, ApiError> {
    let repo = FormRepository::new(state.pool.clone());

    let forms = if principal.is_staff {
        repo.list_all().await?
    } else {
        let ctx = publish_context(&state);
        repo.list_published(ctx.now, ctx.site_id).await?
    };

    let data: Vec<FormSummary> = forms
        .iter()
        .filter(|form| can_perform(form, &principal, FormAction::View))
        .map(FormSummary::from)
        .collect();
    let count = data.len();

    debug!(form_count = count, "Listed forms");

    Ok(Json(ListFormsResponse { data, count }))
}

/// Get a form with the fields to render.
///
/// GET /api/v1/forms/:slug
pub async fn get_form(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(slug): Path<String>,
) -> Result<Json<FormDetail>, ApiError> {
    let form = authorized_form(&state, &slug, &principal, FormAction::View).await?;

    let syntax = state.config.forms.choice_syntax();
    let fields = FieldRepository::new(state.pool.clone())
        .list_for_form(form.id)
        .await?
        .iter()
        .filter(|field| field.visible)
        .map(|field| FieldDetail::from_field(field, &syntax))
        .collect();

    Ok(Json(FormDetail {
        id: form.id,
        can_submit: can_perform(&form, &principal, FormAction::Submit),
        can_view_responses: can_perform(&form, &principal, FormAction::ViewResponses),
        login_required_to_submit: !form.anonymous_vote && !principal.is_authenticated(),
        slug: form.slug,
        title: form.title,
        intro: form.intro,
        button_text: form.button_text,
        fields,
    }))
}

/// Submit an entry.
///
/// POST /api/v1/forms/:slug/entries
///
/// Values are keyed by field slug. Forms without anonymous voting accept
/// one entry per user; a second one is a 409 conflict.
pub async fn submit_entry(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(slug): Path<String>,
    Json(request): Json<SubmitEntryRequest>,
) -> Result<(StatusCode, Json<SubmitEntryResponse>), ApiError> {
    let form = authorized_form(&state, &slug, &principal, FormAction::Submit).await?;
    let user_id = submitter_for(&form, &principal)?;

    let entries = EntryRepository::new(state.pool.clone());
    if let Some(user_id) = user_id {
        if entries.has_user_entry(user_id, form.id).await? {
            record_duplicate_submission(&form.slug);
            return Err(SubmissionError::AlreadySubmitted.into());
        }
    }

    let fields = FieldRepository::new(state.pool.clone())
        .list_for_form(form.id)
        .await?;
    let cleaned = match clean_submission(
        &fields,
        &request.fields,
        &state.config.forms.submission_rules(),
    ) {
        Ok(cleaned) => cleaned,
        Err(e) => {
            record_invalid_submission(&form.slug);
            return Err(e.into());
        }
    };

    let new_entry = NewEntry {
        form_id: form.id,
        entry_time: Utc::now(),
        fields: cleaned.iter().map(FieldEntry::from).collect(),
        user_id,
    };
    let entry = match entries.create_entry(&new_entry).await {
        Ok(entry) => entry,
        Err(CreateEntryError::AlreadySubmitted) => {
            record_duplicate_submission(&form.slug);
            return Err(SubmissionError::AlreadySubmitted.into());
        }
        Err(e) => return Err(e.into()),
    };
    record_entry_submitted(&form.slug);

    let mails = build_submission_mails(
        &form,
        entry.entry_time,
        &cleaned,
        &state.config.mail_settings(),
    );
    if !mails.is_empty() {
        let sent = dispatch_all(
            state.mailer.as_ref(),
            &mails,
            state.config.email.fail_silently,
        )
        .await?;
        record_mails_sent(sent);
    }

    info!(
        form_id = %form.id,
        entry_id = %entry.id,
        user_id = ?user_id,
        field_count = entry.fields.len(),
        "Form entry submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitEntryResponse {
            entry_id: entry.id,
            entry_time: entry.entry_time,
            message: form.response,
        }),
    ))
}

/// Aggregated responses of a form.
///
/// GET /api/v1/forms/:slug/responses
pub async fn get_responses(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(slug): Path<String>,
) -> Result<Json<ResponsesSummary>, ApiError> {
    let form = authorized_form(&state, &slug, &principal, FormAction::ViewResponses).await?;

    let fields = FieldRepository::new(state.pool.clone())
        .list_for_form(form.id)
        .await?;
    let entries = EntryRepository::new(state.pool.clone())
        .list_for_form(form.id)
        .await?;

    let summaries = summarize(&fields, &entries, &state.config.forms.choice_syntax());

    debug!(
        form_id = %form.id,
        entries = entries.len(),
        fields = summaries.len(),
        "Aggregated form responses"
    );

    Ok(Json(ResponsesSummary {
        form_id: form.id,
        slug: form.slug,
        title: form.title,
        total_entries: entries.len(),
        fields: summaries,
    }))
}
