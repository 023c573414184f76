// src/store/aggregate.rs

use std::collections::{HashMap, HashSet};

use crate::models::{AppointmentJoinRow, AppointmentView, OwnerContact};

#[derive(Default)]
struct Seen {
    services: HashSet<i32>,
    images: HashSet<i32>,
}

/// Fold the appointment x services x images outer join into one view per appointment.
///
/// Rows arrive in listing order; each appointment keeps the position of its
/// first row. Joining two child tables repeats every service once per image
/// (and the other way round), so children are deduplicated by their own row
/// id, never by value: two service rows with the same name both show up.
/// An appointment with no children still yields a view with empty lists.
pub fn fold_rows_into_views(
    rows: Vec<AppointmentJoinRow>,
    with_owner: bool,
) -> Vec<AppointmentView> {
    let mut views: Vec<AppointmentView> = Vec::new();
    let mut index: HashMap<i32, usize> = HashMap::new();
    let mut seen: Vec<Seen> = Vec::new();

    for r in rows {
        let pos = *index.entry(r.id).or_insert_with(|| {
            views.push(AppointmentView {
                id: r.id,
                user_id: r.user_id,
                appointment_date: r.appointment_date,
                appointment_time: r.appointment_time,
                status: r.status.clone(),
                notes: r.notes.clone(),
                created_at: r.created_at,
                owner: with_owner.then(|| OwnerContact {
                    full_name: r.full_name.clone(),
                    phone: r.phone.clone(),
                    email: r.email.clone(),
                }),
                services: vec![],
                images: vec![],
            });
            seen.push(Seen::default());
            views.len() - 1
        });

        let view = &mut views[pos];
        let seen = &mut seen[pos];

        if let (Some(service_id), Some(name)) = (r.service_id, r.service_name) {
            if seen.services.insert(service_id) {
                view.services.push(name);
            }
        }
        if let (Some(image_id), Some(path)) = (r.image_id, r.image_path) {
            if seen.images.insert(image_id) {
                view.images.push(path);
            }
        }
    }

    views
}
