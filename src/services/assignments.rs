//! In-memory link mutations on a service request's link lists.
//!
//! Resolving ids and persisting the result is left to the caller. After any
//! of these, at most one user link is flagged primary.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::service_request::{ServiceRequestEquipment, UserServiceRequest};

/// Link `user_id` to the request. A primary assignment first clears the flag
/// on every existing link. An already-linked user has its link updated in
/// place rather than duplicated.
pub fn assign(assignees: &mut Vec<UserServiceRequest>, user_id: i32, is_primary: bool, now: DateTime<Utc>) {
    if is_primary {
        for link in assignees.iter_mut() {
            link.is_primary_assignee = false;
        }
    }

    match assignees.iter_mut().find(|link| link.user_id == user_id) {
        Some(link) => {
            if is_primary {
                link.is_primary_assignee = true;
            }
        }
        None => assignees.push(UserServiceRequest {
            user_id,
            assigned_at: now,
            is_primary_assignee: is_primary,
        }),
    }
}

/// Remove the link to `user_id`. Returns whether anything was removed.
pub fn unassign(assignees: &mut Vec<UserServiceRequest>, user_id: i32) -> bool {
    let before = assignees.len();
    assignees.retain(|link| link.user_id != user_id);
    assignees.len() != before
}

/// Attach equipment; the same equipment may be attached more than once
pub fn attach(
    equipment: &mut Vec<ServiceRequestEquipment>,
    equipment_id: Uuid,
    notes: Option<String>,
    now: DateTime<Utc>,
) {
    equipment.push(ServiceRequestEquipment {
        equipment_id,
        attached_at: now,
        notes,
    });
}

/// Remove every link to `equipment_id`. Returns whether anything was removed.
pub fn detach(equipment: &mut Vec<ServiceRequestEquipment>, equipment_id: Uuid) -> bool {
    let before = equipment.len();
    equipment.retain(|link| link.equipment_id != equipment_id);
    equipment.len() != before
}
