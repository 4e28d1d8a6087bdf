//! Mileage-based maintenance reminder rule.
//!
//! Decisions are derived from the current odometer reading every time and
//! never persisted, so saving the same mileage twice reminds twice.

/// Distance between two services.
pub const MAINTENANCE_INTERVAL_KM: u32 = 5000;

/// How close to the next service a reminder fires.
pub const REMINDER_THRESHOLD_KM: u32 = 500;

/// Kilometres left until the next service is due.
///
/// Always in `1..=MAINTENANCE_INTERVAL_KM`; a reading that lands exactly on
/// a multiple of the interval counts the full interval to the next service.
#[must_use]
pub fn remaining_km(mileage: u32) -> u32 {
    MAINTENANCE_INTERVAL_KM - mileage % MAINTENANCE_INTERVAL_KM
}

/// Check if a motorcycle at this mileage is due for a reminder.
#[must_use]
pub fn should_remind(mileage: u32) -> bool {
    remaining_km(mileage) <= REMINDER_THRESHOLD_KM
}
