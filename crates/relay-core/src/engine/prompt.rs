//! System prompt synthesized for every completion run.

use chrono::{DateTime, Utc};

/// Assistant persona, stamped with the current date and time.
pub fn system_prompt(now: DateTime<Utc>) -> String {
    format!(
        "You are a helpful, knowledgeable AI assistant. The current date is {} and the current \
         time is {}. You have access to internal tools that can look up user profiles and \
         report system metrics; use them when a question needs that information, and otherwise \
         answer directly. Be concise and accurate.",
        now.format("%B %d, %Y"),
        now.format("%H:%M:%S UTC"),
    )
}
