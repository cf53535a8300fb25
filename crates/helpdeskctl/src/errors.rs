//! Error codes and exit status for helpdeskctl

use helpdesk_common::ApiError;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when the route is not available to the current identity
pub const EXIT_FORBIDDEN: i32 = 64;

/// Exit code when the backend returns something we cannot decode
pub const EXIT_INVALID_RESPONSE: i32 = 65;

/// Exit code when the backend is unavailable/unreachable
pub const EXIT_BACKEND_UNAVAILABLE: i32 = 70;

/// Exit code when the command needs a signed-in identity
pub const EXIT_LOGIN_REQUIRED: i32 = 77;

/// Failures the command layer reports with a dedicated exit code
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("You do not have permission to access this page!")]
    Forbidden,

    #[error("Login required. Continue in the browser: {login_url}")]
    LoginRequired { login_url: String },
}

/// Map a command failure to its process exit code
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(cmd) = err.downcast_ref::<CommandError>() {
        return match cmd {
            CommandError::Forbidden => EXIT_FORBIDDEN,
            CommandError::LoginRequired { .. } => EXIT_LOGIN_REQUIRED,
        };
    }
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::Transport(_)) => EXIT_BACKEND_UNAVAILABLE,
        Some(ApiError::Unauthorized(_)) => EXIT_LOGIN_REQUIRED,
        Some(ApiError::Decode(_)) => EXIT_INVALID_RESPONSE,
        Some(ApiError::Rejected { .. }) | None => EXIT_GENERAL_ERROR,
    }
}
