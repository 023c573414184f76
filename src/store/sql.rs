//! Statements whose text is the same on every backend. Anything that binds a
//! parameter takes the backend's placeholder spelling from the caller.

use super::AppointmentScope;

const APPOINTMENT_SELECT: &str = r#"
    SELECT
      a.id,
      a.user_id,
      a.appointment_date,
      a.appointment_time,
      a.status,
      a.notes,
      a.created_at,

      u.full_name,
      u.phone,
      u.email,

      s.id AS service_id,
      s.service_name,
      i.id AS image_id,
      i.image_path

    FROM appointments a
    JOIN users u ON u.id = a.user_id
    LEFT JOIN appointment_services s ON s.appointment_id = a.id
    LEFT JOIN appointment_images i ON i.appointment_id = a.id
"#;

// children keep insertion order inside each appointment
const APPOINTMENT_ORDER: &str = r#"
    ORDER BY a.appointment_date DESC, a.appointment_time DESC, a.id DESC, s.id ASC, i.id ASC
"#;

/// Joined appointment listing; `user_param` is `$1` or `?`.
pub(crate) fn appointment_listing(scope: AppointmentScope, user_param: &str) -> String {
    match scope {
        AppointmentScope::User(_) => {
            format!("{APPOINTMENT_SELECT} WHERE a.user_id = {user_param} {APPOINTMENT_ORDER}")
        }
        AppointmentScope::All => format!("{APPOINTMENT_SELECT} {APPOINTMENT_ORDER}"),
    }
}

pub(crate) const LIST_REVIEWS: &str = r#"
    SELECT r.id, r.user_id, r.rating, r.comment, r.created_at, u.full_name
    FROM reviews r
    JOIN users u ON u.id = r.user_id
    ORDER BY r.created_at DESC, r.id DESC
"#;

pub(crate) const COUNT_APPOINTMENTS: &str = "SELECT COUNT(*) FROM appointments";
