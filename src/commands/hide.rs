use crate::commands::CommandReport;
use crate::condenser::chat;
use crate::condenser::config::load_config;
use crate::condenser::hide;
use crate::condenser::paths::resolve_paths;
use anyhow::Result;
use std::path::PathBuf;

fn status_line(messages: &[chat::Message]) -> String {
    let st = hide::status(messages);
    format!(
        "visible={} hidden={} total={}",
        st.visible, st.hidden, st.total
    )
}

pub fn run_hide(chat_path: &PathBuf, keep: Option<usize>) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config(&paths)?;
    let mut report = CommandReport::new("hide");

    let keep_visible = keep.unwrap_or(config.hide.keep_visible);
    let mut messages = chat::load_chat(chat_path)?;
    let hidden = hide::hide_below_watermark(&mut messages, keep_visible);
    if hidden > 0 {
        chat::save_chat(chat_path, &messages)?;
    }

    report.detail(format!("keep_visible={keep_visible}"));
    report.detail(format!("newly_hidden={hidden}"));
    report.detail(status_line(&messages));
    Ok(report)
}

pub fn run_unhide(chat_path: &PathBuf) -> Result<CommandReport> {
    let mut report = CommandReport::new("unhide");

    let mut messages = chat::load_chat(chat_path)?;
    let unhidden = hide::unhide_all(&mut messages);
    if unhidden > 0 {
        chat::save_chat(chat_path, &messages)?;
    }

    report.detail(format!("unhidden={unhidden}"));
    report.detail(status_line(&messages));
    Ok(report)
}

pub fn run_status(chat_path: &PathBuf) -> Result<CommandReport> {
    let mut report = CommandReport::new("hide status");
    let messages = chat::load_chat(chat_path)?;
    report.detail(status_line(&messages));
    Ok(report)
}
