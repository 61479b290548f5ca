use crate::condenser::extract;
use crate::condenser::rules::{Blacklist, RuleSet};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Display name used for user-authored messages in the transcript sent
/// to the model, matching the host application's convention.
pub const USER_DISPLAY_NAME: &str = "用户";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub text: String,
    pub is_user: bool,
    pub is_system_note: bool,
    pub speaker_name: String,
    pub hidden: bool,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            text: String::new(),
            is_user: false,
            is_system_note: false,
            speaker_name: String::new(),
            hidden: false,
        }
    }
}

impl Message {
    pub fn display_name(&self) -> &str {
        if self.is_user {
            USER_DISPLAY_NAME
        } else {
            &self.speaker_name
        }
    }
}

pub fn load_chat(path: &Path) -> Result<Vec<Message>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let messages: Vec<Message> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse chat log {}", path.display()))?;
    Ok(messages)
}

pub fn save_chat(path: &Path, messages: &[Message]) -> Result<()> {
    let data = serde_json::to_string_pretty(messages)?;
    fs::write(path, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Concatenate the non-system messages of `[start, end)` into a
/// prompt-ready transcript, running each message through the extraction
/// pipeline first.
///
/// Returns `None` when the log is empty or the clamped range contains no
/// messages at all; returns `Some("")` when messages existed but every
/// one was a system note or extracted to nothing. Callers use the
/// distinction to report "no history" vs "nothing to summarize".
pub fn collect(
    messages: &[Message],
    start: usize,
    end: usize,
    rules: &RuleSet,
    blacklist: &Blacklist,
) -> Option<String> {
    if messages.is_empty() {
        return None;
    }

    let end = end.min(messages.len());
    if start >= end {
        return None;
    }

    let mut text = String::new();
    for message in &messages[start..end] {
        if message.is_system_note {
            continue;
        }

        let content = extract::process(&message.text, rules, blacklist);
        if content.trim().is_empty() {
            continue;
        }

        text.push_str(&format!("{}: {}\n\n", message.display_name(), content));
    }

    Some(text)
}

#[cfg(test)]
pub fn test_message(text: &str, is_user: bool) -> Message {
    Message {
        text: text.to_string(),
        is_user,
        is_system_note: false,
        speaker_name: if is_user {
            String::new()
        } else {
            "Aria".to_string()
        },
        hidden: false,
    }
}
