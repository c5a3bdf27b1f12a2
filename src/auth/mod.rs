pub mod account;
mod extract;
pub mod password;
mod role;

pub use extract::{session_token, AdminUser, CurrentUser, ReviewerUser, SESSION_COOKIE};
pub use role::{Role, UnknownRole};

use uuid::Uuid;

/// Opaque session token handed to the client.
pub fn new_session_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
