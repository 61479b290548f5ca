use crate::condenser::chat::Message;

/// Visible/hidden/total counts over non-system messages, for status
/// reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HideStatus {
    pub visible: usize,
    pub hidden: usize,
    pub total: usize,
}

/// Mark every non-system, not-yet-hidden message in `[start, end)` as
/// hidden. Returns how many messages changed. Hiding is monotonic; this
/// never unhides.
pub fn hide_range(messages: &mut [Message], start: usize, end: usize) -> usize {
    let end = end.min(messages.len());
    if start >= end {
        return 0;
    }

    let mut count = 0usize;
    for message in &mut messages[start..end] {
        if !message.is_system_note && !message.hidden {
            message.hidden = true;
            count += 1;
        }
    }
    count
}

/// Hide everything below the watermark, keeping the most recent
/// `keep_visible` messages untouched. Idempotent: a second pass with the
/// same watermark changes nothing further.
pub fn hide_below_watermark(messages: &mut [Message], keep_visible: usize) -> usize {
    let len = messages.len();
    if len <= keep_visible {
        return 0;
    }
    hide_range(messages, 0, len - keep_visible)
}

/// Clear the hidden flag on every message, system notes included.
/// Returns how many messages were unhidden.
pub fn unhide_all(messages: &mut [Message]) -> usize {
    let mut count = 0usize;
    for message in messages {
        if message.hidden {
            message.hidden = false;
            count += 1;
        }
    }
    count
}

pub fn status(messages: &[Message]) -> HideStatus {
    let mut visible = 0usize;
    let mut hidden = 0usize;
    for message in messages {
        if message.is_system_note {
            continue;
        }
        if message.hidden {
            hidden += 1;
        } else {
            visible += 1;
        }
    }
    HideStatus {
        visible,
        hidden,
        total: visible + hidden,
    }
}
