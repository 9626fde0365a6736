//! Ownership resolution for the tenancy chain.
//!
//! Every authorization decision in the system routes through the predicates
//! in this module; use-cases and the credential gate never reimplement them
//! inline. All predicates are pure and total: given a caller's claims and a
//! target's owning identifiers they return allow/deny, never an error.

use uuid::Uuid;

use crate::auth::Claims;
use crate::database::models::user::Profile;

/// Filter pair applied to list queries so professionals see only their own
/// records and administrators see every record under their tenancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListScope {
    pub admin_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
}

/// Whether `caller` may read or write the user identified by `target_id`.
///
/// True for self-access, or for an administrator accessing a professional
/// they own. An administrator reading another administrator is handled by
/// the admin-listing endpoints, which require the administrator profile only.
pub fn can_access_user(caller: &Claims, target_id: Uuid, target_admin_id: Option<Uuid>) -> bool {
    if caller.user_id == target_id {
        return true;
    }
    caller.profile == Profile::Administrator && target_admin_id == Some(caller.user_id)
}

/// Whether `caller` may see or act on a health unit owned by `unit_admin_id`.
pub fn can_access_health_unit(caller: &Claims, unit_admin_id: Uuid) -> bool {
    match caller.profile {
        Profile::Administrator => unit_admin_id == caller.user_id,
        Profile::Professional => Some(unit_admin_id) == caller.admin_id,
    }
}

/// Whether `caller` may read, update or delete an attendance.
///
/// The recording professional always may. An administrator may only when the
/// attendance belongs to their own tenancy; an administrator from another
/// tenant is denied.
pub fn can_mutate_attendance(
    caller: &Claims,
    professional_id: Uuid,
    attendance_admin_id: Uuid,
) -> bool {
    if caller.user_id == professional_id {
        return true;
    }
    caller.profile == Profile::Administrator && attendance_admin_id == caller.user_id
}

/// Build the tenancy filter for read-list queries.
pub fn resolve_list_scope(caller: &Claims) -> ListScope {
    match caller.profile {
        Profile::Administrator => ListScope {
            admin_id: Some(caller.user_id),
            professional_id: None,
        },
        Profile::Professional => ListScope {
            admin_id: caller.admin_id,
            professional_id: Some(caller.user_id),
        },
    }
}
