/// Router Module Index
///
/// Organizes the application's routing into capability-segregated modules so
/// access control is applied explicitly at the module level (via Axum
/// layers) instead of being re-checked ad hoc inside handlers.

/// Routes accessible to any visitor: reading pages, registration, login.
pub mod public;

/// Routes requiring a logged-in user. Guarded by the login layer, which
/// redirects anonymous requests to the login page with a flash notice.
pub mod authenticated;

/// Routes restricted to the admin account. Guarded by the admin layer,
/// which rejects everyone else with 403 before any handler runs.
pub mod admin;
