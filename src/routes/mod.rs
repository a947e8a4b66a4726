mod auth;
mod health_check;

pub use auth::{get_current_user, login, logout, logout_all, refresh, refresh_payload_error};
pub use health_check::health_check;
