//! Linear text renderings of a conversation.

use crate::core::types::{Message, ResultMap};

/// Serialize the message history into one line per message.
///
/// Executor messages render as `<origin> result: <content>`; untagged
/// messages render as their content.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| match &message.origin {
            Some(origin) => format!("{origin} result: {}", message.content),
            None => message.content.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `<id>: <last result>` line per executor, in first-invocation order.
pub fn summarize_results(results: &ResultMap) -> String {
    results
        .iter()
        .map(|(id, result)| format!("{id}: {result}"))
        .collect::<Vec<_>>()
        .join("\n")
}
