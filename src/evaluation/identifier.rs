//! User identity stability check between trigger and delivery.

use crate::models::user::{Identifiers, DEVICE_ID, USER_ID};

/// Decides whether the user behind a dispatch has changed.
pub trait IdentifierChecker: Send + Sync {
    /// Whether `new` belongs to a different user than `old`.
    fn is_changed(&self, old: &Identifiers, new: &Identifiers) -> bool;
}

/// Compares `$userId` when both sides have one, `$deviceId` otherwise.
///
/// A login (no user id → user id) on the same device is not a change.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserIdentifierChecker;

impl IdentifierChecker for UserIdentifierChecker {
    fn is_changed(&self, old: &Identifiers, new: &Identifiers) -> bool {
        if let (Some(old_user), Some(new_user)) = (old.get(USER_ID), new.get(USER_ID)) {
            return old_user != new_user;
        }
        old.get(DEVICE_ID) != new.get(DEVICE_ID)
    }
}
