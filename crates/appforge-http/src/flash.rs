//! One-shot flash messages.
//!
//! Views queue user-facing notices ("Password Changed", "Invalid login...")
//! which the next rendered page drains and displays. Messages travel in the
//! session META entry `FLASH_MESSAGES` as a JSON array, the same
//! session-in-META channel the auth layer uses.

use serde::{Deserialize, Serialize};

use crate::request::HttpRequest;

/// META key holding the pending flash messages as JSON.
const FLASH_META_KEY: &str = "FLASH_MESSAGES";

/// Severity of a flash message, mapped to display styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    /// Neutral confirmation ("Password Changed").
    Info,
    /// Recoverable problem ("Invalid login. Please try again.").
    Warning,
    /// Access refused or hard failure.
    Danger,
}

/// A queued flash message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    /// The message text shown to the user.
    pub message: String,
    /// Display severity.
    pub level: FlashLevel,
}

/// Queues a flash message on the request's session.
pub fn flash(request: &mut HttpRequest, level: FlashLevel, message: impl Into<String>) {
    let mut messages = read_messages(request);
    messages.push(FlashMessage {
        message: message.into(),
        level,
    });
    write_messages(request, &messages);
}

/// Drains and returns all queued flash messages.
pub fn pop_flashes(request: &mut HttpRequest) -> Vec<FlashMessage> {
    let messages = read_messages(request);
    if !messages.is_empty() {
        write_messages(request, &[]);
    }
    messages
}

/// Returns queued messages without draining them.
pub fn peek_flashes(request: &HttpRequest) -> Vec<FlashMessage> {
    request
        .meta()
        .get(FLASH_META_KEY)
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default()
}

fn read_messages(request: &HttpRequest) -> Vec<FlashMessage> {
    peek_flashes(request)
}

fn write_messages(request: &mut HttpRequest, messages: &[FlashMessage]) {
    let json = serde_json::to_string(messages).unwrap_or_else(|_| "[]".to_string());
    request.meta_mut().insert(FLASH_META_KEY.to_string(), json);
    request
        .meta_mut()
        .insert("SESSION_MODIFIED".to_string(), "true".to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_and_pop() {
        let mut request = HttpRequest::builder().build();
        flash(&mut request, FlashLevel::Info, "Password Changed");

        let messages = pop_flashes(&mut request);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "Password Changed");
        assert_eq!(messages[0].level, FlashLevel::Info);
    }

    #[test]
    fn test_pop_drains_queue() {
        let mut request = HttpRequest::builder().build();
        flash(&mut request, FlashLevel::Warning, "first");
        pop_flashes(&mut request);
        assert!(pop_flashes(&mut request).is_empty());
    }

    #[test]
    fn test_multiple_messages_ordered() {
        let mut request = HttpRequest::builder().build();
        flash(&mut request, FlashLevel::Warning, "one");
        flash(&mut request, FlashLevel::Danger, "two");

        let messages = pop_flashes(&mut request);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message, "one");
        assert_eq!(messages[1].message, "two");
    }

    #[test]
    fn test_peek_does_not_drain() {
        let mut request = HttpRequest::builder().build();
        flash(&mut request, FlashLevel::Info, "kept");
        assert_eq!(peek_flashes(&request).len(), 1);
        assert_eq!(peek_flashes(&request).len(), 1);
    }

    #[test]
    fn test_empty_queue() {
        let mut request = HttpRequest::builder().build();
        assert!(pop_flashes(&mut request).is_empty());
    }

    #[test]
    fn test_flash_marks_session_modified() {
        let mut request = HttpRequest::builder().build();
        flash(&mut request, FlashLevel::Info, "x");
        assert_eq!(
            request.meta().get("SESSION_MODIFIED").map(String::as_str),
            Some("true")
        );
    }
}
