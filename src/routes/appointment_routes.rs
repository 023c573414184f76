// src/routes/appointment_routes.rs

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, AppointmentView, CreateAppointmentResponse, SERVICE_CATALOG},
    services::appointments::{self, AppointmentForm},
    store::AppointmentScope,
    uploads::{MAX_IMAGE_BYTES, MAX_IMAGES, PendingImage},
};

/// Room for every image at full size plus the text fields.
const CREATE_BODY_LIMIT: usize = MAX_IMAGES * MAX_IMAGE_BYTES + 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services))
        .route(
            "/",
            post(create_appointment).layer(DefaultBodyLimit::max(CREATE_BODY_LIMIT)),
        )
        .route("/my", get(my_appointments))
}

/* ============================================================
   GET /appointments/services
   ============================================================ */

pub async fn list_services() -> Json<Vec<&'static str>> {
    Json(SERVICE_CATALOG.to_vec())
}

/* ============================================================
   POST /appointments (multipart)
   ============================================================ */

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest("INVALID_MULTIPART", e.body_text())
}

/// Split the multipart body into text fields and image parts. Unknown parts
/// are skipped; nothing touches the disk yet.
async fn read_form(
    mut multipart: Multipart,
) -> Result<(AppointmentForm, Vec<PendingImage>), ApiError> {
    let mut form = AppointmentForm::default();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" => {
                if images.len() == MAX_IMAGES {
                    return Err(ApiError::validation(format!(
                        "at most {MAX_IMAGES} images per appointment"
                    )));
                }
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                images.push(PendingImage::accept(
                    file_name.as_deref(),
                    content_type.as_deref(),
                    bytes.to_vec(),
                )?);
            }
            "appointment_date" => {
                form.appointment_date = Some(field.text().await.map_err(multipart_error)?)
            }
            "appointment_time" => {
                form.appointment_time = Some(field.text().await.map_err(multipart_error)?)
            }
            "notes" => form.notes = Some(field.text().await.map_err(multipart_error)?),
            "selectedServices" => {
                form.selected_services = Some(field.text().await.map_err(multipart_error)?)
            }
            _ => {}
        }
    }

    Ok((form, images))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    WithRejection(multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<(StatusCode, Json<CreateAppointmentResponse>), ApiError> {
    let (form, pending) = read_form(multipart).await?;

    // validate before any file is written
    let mut new = appointments::build_new_appointment(auth.user_id, &form, vec![])?;

    new.images = state.uploads.save_all(pending).await?;

    let appointment_id = match appointments::create(state.store.as_ref(), &new).await {
        Ok(id) => id,
        Err(e) => {
            state.uploads.discard(&new.images).await;
            return Err(e);
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateAppointmentResponse {
            message: "Appointment created".into(),
            appointment_id,
        }),
    ))
}

/* ============================================================
   GET /appointments/my
   ============================================================ */

pub async fn my_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<AppointmentView>>, ApiError> {
    let views =
        appointments::list(state.store.as_ref(), AppointmentScope::User(auth.user_id)).await?;
    Ok(Json(views))
}
