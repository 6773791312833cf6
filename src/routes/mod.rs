/// Router Module Index
///
/// Routes are split by access level. Protection is applied per module in
/// `create_router`, so a handler cannot end up public by accident.

/// Routes reachable without a token: health check and login.
pub mod public;

/// Routes behind the token check (`AuthUser` middleware).
pub mod authenticated;
