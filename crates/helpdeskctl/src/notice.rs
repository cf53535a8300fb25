//! User-facing notices
//!
//! Every HTTP failure ends up here rather than as an error: the portal prints
//! one line, the dashboard shows it on its status line until it expires.

use owo_colors::OwoColorize;
use std::fmt;

use helpdesk_common::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: Option<String>,
}

impl Notice {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            description: None,
        }
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            description: None,
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: None,
        }
    }

    /// Error notice that carries the backend's message, or a generic fallback
    pub fn from_api_error(title: impl Into<String>, err: &ApiError) -> Self {
        let description = match err {
            ApiError::Transport(_) => "Server error".to_string(),
            ApiError::Unauthorized(_) => "Please sign in again".to_string(),
            other => other.backend_message().unwrap_or("Server error").to_string(),
        };
        Self::error(title).with_description(description)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }

    /// Colored single line for plain terminal output
    pub fn render_line(&self) -> String {
        let marker = match self.level {
            NoticeLevel::Success => "✓".green().to_string(),
            NoticeLevel::Info => "ℹ".cyan().to_string(),
            NoticeLevel::Error => "✗".red().to_string(),
        };
        match &self.description {
            Some(description) => format!("{} {} {}", marker, self.title.bold(), description.dimmed()),
            None => format!("{} {}", marker, self.title.bold()),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.title, description),
            None => f.write_str(&self.title),
        }
    }
}
