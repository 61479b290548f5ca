use crate::api::client::CompletionClient;
use crate::commands::CommandReport;
use crate::condenser::chat;
use crate::condenser::config::{CondenserConfig, load_config};
use crate::condenser::hide;
use crate::condenser::paths::{CondenserPaths, resolve_paths};
use crate::condenser::scheduler::{AutoOutcome, MemorySink, Scheduler};
use crate::condenser::state;
use crate::condenser::store::SummaryStore;
use crate::condenser::worldinfo::WorldInfoClient;
use anyhow::Result;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub chat: PathBuf,
    pub once: bool,
}

/// Run one evaluation cycle: continuous-hide pass, then the automatic
/// trigger. Mirrors the host's message-event handler.
fn run_cycle(
    opts: &WatchOptions,
    paths: &CondenserPaths,
    config: &CondenserConfig,
    report: &mut CommandReport,
) -> Result<()> {
    let mut messages = chat::load_chat(&opts.chat)?;
    let mut chat_dirty = false;

    if config.hide.auto_hide {
        let hidden = hide::hide_below_watermark(&mut messages, config.hide.keep_visible);
        if hidden > 0 {
            report.detail(format!("continuous_hide={hidden}"));
            chat_dirty = true;
        }
    }

    if config.summarize.auto_summarize {
        match CompletionClient::new(&config.api) {
            Ok(client) => {
                let sink = if config.world_info.enabled {
                    match WorldInfoClient::new(&config.world_info) {
                        Ok(sink) => Some(sink),
                        Err(err) => {
                            // The summary is still produced without the sink.
                            report.detail(format!("world info sink disabled: {err}"));
                            None
                        }
                    }
                } else {
                    None
                };
                let store = SummaryStore::new(paths);
                let mut scheduler = Scheduler::new(
                    config,
                    &client,
                    sink.as_ref().map(|s| s as &dyn MemorySink),
                    state::load(paths)?,
                );
                match scheduler.check_auto(&mut messages, &store) {
                    Ok(AutoOutcome::NotDue { pending }) => {
                        report.detail(format!("auto.not_due pending={pending}"));
                    }
                    Ok(AutoOutcome::SkippedEmpty { start, end }) => {
                        report.detail(format!(
                            "auto.skipped_empty range={}-{end}",
                            start + 1
                        ));
                        state::save(paths, scheduler.state())?;
                    }
                    Ok(AutoOutcome::Summarized(success)) => {
                        report.detail(format!(
                            "auto.summarized range={}",
                            success.record.range_label()
                        ));
                        if success.hidden > 0 {
                            report.detail(format!("hidden={}", success.hidden));
                            chat_dirty = true;
                        }
                        for note in &success.notes {
                            report.detail(note.clone());
                        }
                        state::save(paths, scheduler.state())?;

                        if let Some(sink) = &sink {
                            if !config.world_info.chat_id.trim().is_empty() {
                                if let Err(err) =
                                    sink.bind_to_chat(&config.world_info.chat_id)
                                {
                                    report.detail(format!("world info bind failed: {err}"));
                                }
                            }
                        }
                    }
                    Err(err) if err.is_retryable() => {
                        // Pointer untouched; retried on the next cycle.
                        report.issue(format!("auto summarize failed (will retry): {err}"));
                    }
                    Err(err) => {
                        report.issue(format!("auto summarize failed: {err}"));
                    }
                }
            }
            Err(err) => {
                report.issue(format!("auto summarize unavailable: {err}"));
            }
        }
    }

    if chat_dirty {
        chat::save_chat(&opts.chat, &messages)?;
    }
    Ok(())
}

pub fn run(opts: &WatchOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config(&paths)?;
    let mut report = CommandReport::new("watch");
    report.detail(format!("home={}", paths.condenser_home.display()));
    let st = state::load(&paths)?;
    report.detail(format!("pointer={}", st.last_summarized_index));
    if let Some(secs) = st.last_trigger_epoch_secs {
        report.detail(format!("last_trigger_epoch_secs={secs}"));
    }

    if opts.once {
        run_cycle(opts, &paths, &config, &mut report)?;
        return Ok(report);
    }

    // Loop mode never returns normally, so the header goes out now
    // instead of through the final report.
    for line in report.details.drain(..) {
        println!("{line}");
    }

    let mut last_len = chat::load_chat(&opts.chat).map(|m| m.len()).unwrap_or(0);
    loop {
        thread::sleep(Duration::from_secs(config.watch.poll_interval_secs));

        let len = match chat::load_chat(&opts.chat) {
            Ok(messages) => messages.len(),
            Err(err) => {
                report.issue(format!("failed to read chat log: {err:#}"));
                return Ok(report);
            }
        };
        if len == last_len {
            continue;
        }

        // Let the host finish appending before indices are read.
        thread::sleep(Duration::from_millis(config.watch.settle_delay_ms));

        let mut cycle_report = CommandReport::new("watch.cycle");
        run_cycle(opts, &paths, &config, &mut cycle_report)?;
        for line in &cycle_report.details {
            println!("{line}");
        }
        for line in &cycle_report.issues {
            eprintln!("{line}");
        }

        last_len = chat::load_chat(&opts.chat).map(|m| m.len()).unwrap_or(len);
    }
}
