use std::{fmt, str::FromStr, sync::Arc};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{store::Store, uploads::UploadDir};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub uploads: UploadDir,
    pub session_ttl_hours: i64,
}

/* -------------------------
   Appointment status
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown appointment status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    /// Exact, case-sensitive match against the stored spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/* -------------------------
   Service catalog
--------------------------*/

pub const SERVICE_CATALOG: [&str; 9] = [
    "Bahçe Aydınlatma",
    "Çim Biçme",
    "Ağaç Budama",
    "Çim Havalandırma",
    "İlaçlama & Gübreleme",
    "Peyzaj Düzenleme",
    "Akıllı Bahçe",
    "Otomatik Sulama",
    "Tamir & Tadilat",
];

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user_id: i32,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentResponse {
    pub message: String,
    pub appointment_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// Kept loose so that a non-numeric rating is reported as a validation error.
    pub rating: Option<serde_json::Value>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateReviewResponse {
    pub id: i32,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_appointments: i64,
    pub pending_appointments: i64,
    pub total_users: i64,
    pub this_week_appointments: i64,
}

/* -------------------------
   Appointment views
--------------------------*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerContact {
    pub full_name: String,
    pub phone: String,
    pub email: String,
}

/// Appointment scalar fields merged with its service tags and image references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentView {
    pub id: i32,
    pub user_id: i32,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    #[serde(flatten)]
    pub owner: Option<OwnerContact>,
    pub services: Vec<String>,
    pub images: Vec<String>,
}

/// Validated input for the creation fan-out.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub user_id: i32,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub notes: Option<String>,
    pub services: Vec<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub phone: String,
    pub full_name: String,
    pub address: Option<String>,
    pub is_admin: bool,
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub password: String,
    pub is_admin: bool,
}

#[derive(Debug, FromRow)]
pub struct SessionRow {
    pub session_id: i32,
    pub user_id: i32,
    pub is_admin: bool,
}

/// Non-admin user as shown to administrators.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomerRow {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub full_name: String,
    pub address: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReviewRow {
    pub id: i32,
    pub user_id: i32,
    pub rating: i32,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReviewWithAuthorRow {
    pub id: i32,
    pub user_id: i32,
    pub rating: i32,
    pub comment: String,
    pub created_at: NaiveDateTime,
    pub full_name: String,
}

/// One row of the appointment/user/services/images outer join.
#[derive(Debug, Clone, FromRow)]
pub struct AppointmentJoinRow {
    pub id: i32,
    pub user_id: i32,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub service_id: Option<i32>,
    pub service_name: Option<String>,
    pub image_id: Option<i32>,
    pub image_path: Option<String>,
}
