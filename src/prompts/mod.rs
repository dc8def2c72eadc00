//! Prompts and fixed reply copy
//!
//! This module provides the system-level persona sent with every
//! consultation request and the fallback reply used when a provider
//! returns empty text.

pub mod counselor_prompt;

pub use counselor_prompt::COUNSELOR_PERSONA;

/// Reply substituted when a provider returns an empty completion
pub const FALLBACK_REPLY: &str = "I'm here to listen, but I couldn't put together a response just now. Could you tell me a little more about what's on your mind?";

/// Replace an empty or whitespace-only reply with [`FALLBACK_REPLY`]
///
/// # Examples
///
/// ```
/// use campus_counsel::prompts::{non_empty_reply, FALLBACK_REPLY};
///
/// assert_eq!(non_empty_reply("Hello".to_string()), "Hello");
/// assert_eq!(non_empty_reply("  ".to_string()), FALLBACK_REPLY);
/// ```
pub fn non_empty_reply(reply: String) -> String {
    if reply.trim().is_empty() {
        FALLBACK_REPLY.to_string()
    } else {
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_mentions_boundaries_and_safety() {
        assert!(COUNSELOR_PERSONA.contains("college students"));
        assert!(COUNSELOR_PERSONA.contains("Safety Priority"));
        assert!(COUNSELOR_PERSONA.contains("cannot replace professional therapy"));
    }

    #[test]
    fn test_fallback_reply_is_not_empty() {
        assert!(!FALLBACK_REPLY.trim().is_empty());
    }

    #[test]
    fn test_non_empty_reply_keeps_text() {
        assert_eq!(
            non_empty_reply("Try breaking tasks down.".to_string()),
            "Try breaking tasks down."
        );
    }

    #[test]
    fn test_non_empty_reply_replaces_blank() {
        assert_eq!(non_empty_reply(String::new()), FALLBACK_REPLY);
        assert_eq!(non_empty_reply("\n\t".to_string()), FALLBACK_REPLY);
    }
}
