// src/services/appointments.rs

use chrono::{NaiveDate, NaiveTime};

use crate::{
    error::ApiError,
    models::{AppointmentStatus, AppointmentView, NewAppointment},
    store::{AppointmentScope, Store, StoreError},
    uploads::MAX_IMAGES,
};

/// Raw text fields of the booking form.
#[derive(Debug, Default, Clone)]
pub struct AppointmentForm {
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub notes: Option<String>,
    pub selected_services: Option<String>,
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::validation("appointment_date must be YYYY-MM-DD"))
}

/// Accepts `HH:MM` (what a time input sends) and `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<NaiveTime, ApiError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| ApiError::validation("appointment_time must be HH:MM or HH:MM:SS"))
}

/// `selectedServices` is a JSON-encoded array of service names. Missing or
/// blank means none; blank entries are dropped.
pub fn parse_selected_services(raw: Option<&str>) -> Result<Vec<String>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(vec![]);
    };

    let names: Vec<String> = serde_json::from_str(raw)
        .map_err(|_| ApiError::validation("selectedServices must be a JSON array of strings"))?;

    Ok(names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect())
}

/// Validate the form for `user_id`. `images` are references already produced
/// by the upload sink.
pub fn build_new_appointment(
    user_id: i32,
    form: &AppointmentForm,
    images: Vec<String>,
) -> Result<NewAppointment, ApiError> {
    let date = form
        .appointment_date
        .as_deref()
        .ok_or_else(|| ApiError::validation("appointment_date is required"))?;
    let time = form
        .appointment_time
        .as_deref()
        .ok_or_else(|| ApiError::validation("appointment_time is required"))?;

    if images.len() > MAX_IMAGES {
        return Err(ApiError::validation(format!(
            "at most {MAX_IMAGES} images per appointment"
        )));
    }

    Ok(NewAppointment {
        user_id,
        appointment_date: parse_date(date)?,
        appointment_time: parse_time(time)?,
        notes: form
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        services: parse_selected_services(form.selected_services.as_deref())?,
        images,
    })
}

pub async fn create(store: &dyn Store, new: &NewAppointment) -> Result<i32, ApiError> {
    let id = store.create_appointment(new).await?;
    tracing::info!(
        appointment_id = id,
        user_id = new.user_id,
        services = new.services.len(),
        images = new.images.len(),
        "appointment created"
    );
    Ok(id)
}

pub async fn list(
    store: &dyn Store,
    scope: AppointmentScope,
) -> Result<Vec<AppointmentView>, ApiError> {
    Ok(store.list_appointments(scope).await?)
}

/// Validate `raw` against the fixed status set, then overwrite the status.
/// Any status may follow any other.
pub async fn transition_status(
    store: &dyn Store,
    appointment_id: i32,
    raw: Option<&str>,
) -> Result<AppointmentStatus, ApiError> {
    let raw = raw.ok_or_else(|| ApiError::validation("status is required"))?;
    let status: AppointmentStatus = raw
        .parse()
        .map_err(|_| ApiError::validation(format!("invalid status: {raw}")))?;

    store
        .set_appointment_status(appointment_id, status)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => {
                ApiError::NotFound("APPOINTMENT_NOT_FOUND", "Appointment not found".into())
            }
            other => other.into(),
        })?;

    tracing::info!(appointment_id, %status, "appointment status updated");
    Ok(status)
}
