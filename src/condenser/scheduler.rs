use crate::condenser::chat::{self, Message, USER_DISPLAY_NAME};
use crate::condenser::config::CondenserConfig;
use crate::condenser::hide;
use crate::condenser::state::SchedulerState;
use crate::condenser::store::{SummaryRecord, SummaryStore};
use crate::error::CondenserError;
use tracing::warn;

/// Seam to the completions endpoint so the scheduler can be exercised
/// without a network.
pub trait CompletionApi {
    fn complete(&self, prompt: &str) -> Result<String, CondenserError>;
}

/// Optional long-term memory sink for generated summaries. Failures are
/// surfaced as notes, never as roll-backs.
pub trait MemorySink {
    fn append(&self, entry_key: &str, text: &str) -> Result<(), CondenserError>;
}

#[derive(Debug)]
pub struct SummarizeSuccess {
    pub record: SummaryRecord,
    pub hidden: usize,
    /// Non-fatal persistence issues (summary store, memory sink).
    pub notes: Vec<String>,
}

#[derive(Debug)]
pub enum AutoOutcome {
    /// Not enough new messages since the pointer.
    NotDue { pending: usize },
    /// The range extracted to nothing; the pointer was advanced past it
    /// so over-aggressive rules cannot cause an endless retry loop.
    SkippedEmpty { start: usize, end: usize },
    Summarized(SummarizeSuccess),
}

/// Manual and automatic summarization sharing one progress pointer and
/// one in-flight guard. The pointer advances only on success (or on the
/// automatic path's empty-range skip); completion failures leave it
/// untouched so the same range is retried on the next cycle.
pub struct Scheduler<'a> {
    config: &'a CondenserConfig,
    api: &'a dyn CompletionApi,
    sink: Option<&'a dyn MemorySink>,
    state: SchedulerState,
    busy: bool,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        config: &'a CondenserConfig,
        api: &'a dyn CompletionApi,
        sink: Option<&'a dyn MemorySink>,
        state: SchedulerState,
    ) -> Self {
        Self {
            config,
            api,
            sink,
            state,
            busy: false,
        }
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    fn collect_range(&self, messages: &[Message], start: usize, end: usize) -> Option<String> {
        if self.config.extraction.enabled {
            chat::collect(
                messages,
                start,
                end,
                &self.config.extraction.rules,
                &self.config.extraction.blacklist,
            )
        } else {
            chat::collect(
                messages,
                start,
                end,
                &crate::condenser::rules::RuleSet::default(),
                &crate::condenser::rules::Blacklist::default(),
            )
        }
    }

    fn build_prompt(&self, transcript: &str) -> String {
        format!("{transcript}\n---\n{}", self.config.summarize.prompt)
    }

    fn entry_key(&self, messages: &[Message], start: usize, end: usize, time: &str) -> String {
        let speaker = messages[start..end.min(messages.len())]
            .iter()
            .find(|m| !m.is_user && !m.is_system_note && !m.speaker_name.trim().is_empty())
            .map(|m| m.speaker_name.clone())
            .unwrap_or_else(|| USER_DISPLAY_NAME.to_string());
        format!("{speaker} - {time}")
    }

    fn finish_success(
        &mut self,
        messages: &mut [Message],
        store: &SummaryStore,
        record: SummaryRecord,
    ) -> SummarizeSuccess {
        let mut notes = Vec::new();

        if let Err(err) = store.append(&record) {
            warn!(%err, "failed to persist summary record");
            notes.push(format!("summary store write failed: {err:#}"));
        }

        self.state.last_summarized_index = record.end;
        self.state.last_trigger_epoch_secs = now_epoch_secs();

        let hidden = if self.config.hide.auto_hide {
            hide::hide_below_watermark(messages, self.config.hide.keep_visible)
        } else {
            0
        };

        if let Some(sink) = self.sink {
            let key = self.entry_key(messages, record.start, record.end, &record.time);
            if let Err(err) = sink.append(&key, &record.content) {
                warn!(%err, entry_key = %key, "memory sink write failed");
                notes.push(format!("memory sink write failed: {err}"));
            }
        }

        SummarizeSuccess {
            record,
            hidden,
            notes,
        }
    }

    fn run_range(
        &mut self,
        messages: &mut [Message],
        store: &SummaryStore,
        start: usize,
        end: usize,
        auto: bool,
    ) -> Result<SummarizeSuccess, CondenserError> {
        let transcript = self
            .collect_range(messages, start, end)
            .ok_or(CondenserError::NoHistory)?;
        if transcript.trim().is_empty() {
            return Err(CondenserError::EmptyContent { start, end });
        }

        let summary = self.api.complete(&self.build_prompt(&transcript))?;
        let record = SummaryRecord {
            time: now_display_time(),
            start,
            end,
            content: summary,
            auto,
        };
        Ok(self.finish_success(messages, store, record))
    }

    /// Manual trigger: summarize the last `max_messages` messages
    /// regardless of the pointer, then rebase the pointer to the current
    /// length. User-initiated catch-ups deliberately skip untouched
    /// history.
    pub fn summarize_manual(
        &mut self,
        messages: &mut [Message],
        store: &SummaryStore,
    ) -> Result<SummarizeSuccess, CondenserError> {
        if self.busy {
            return Err(CondenserError::Busy);
        }
        self.busy = true;

        let len = messages.len();
        let start = len.saturating_sub(self.config.summarize.max_messages);
        let result = self.run_range(messages, store, start, len, false);

        self.busy = false;
        result
    }

    /// Automatic trigger: fires only when `trigger_interval` messages
    /// have accumulated past the pointer, summarizing exactly the
    /// untouched range.
    pub fn check_auto(
        &mut self,
        messages: &mut [Message],
        store: &SummaryStore,
    ) -> Result<AutoOutcome, CondenserError> {
        if self.busy {
            return Err(CondenserError::Busy);
        }
        self.busy = true;
        let result = self.check_auto_inner(messages, store);
        self.busy = false;
        result
    }

    fn check_auto_inner(
        &mut self,
        messages: &mut [Message],
        store: &SummaryStore,
    ) -> Result<AutoOutcome, CondenserError> {
        let len = messages.len();

        if self.state.last_summarized_index > len {
            // The log shrank underneath us (host-side deletion). Clamp
            // so the pointer invariant holds.
            warn!(
                pointer = self.state.last_summarized_index,
                len, "scheduler pointer beyond chat length, clamping"
            );
            self.state.last_summarized_index = len;
        }

        let start = self.state.last_summarized_index;
        let pending = len - start;
        if pending < self.config.summarize.trigger_interval {
            return Ok(AutoOutcome::NotDue { pending });
        }

        match self.run_range(messages, store, start, len, true) {
            Ok(success) => Ok(AutoOutcome::Summarized(success)),
            Err(CondenserError::EmptyContent { start, end }) => {
                // Decided behavior: a permanently-empty range must not be
                // retried forever, so the pointer moves past it.
                self.state.last_summarized_index = end;
                Ok(AutoOutcome::SkippedEmpty { start, end })
            }
            Err(err) => Err(err),
        }
    }
}

fn now_display_time() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn now_epoch_secs() -> Option<u64> {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condenser::chat::test_message;
    use crate::condenser::paths::CondenserPaths;
    use crate::condenser::rules::RuleKind;
    use std::cell::RefCell;

    struct ScriptedApi {
        calls: RefCell<usize>,
        fail: bool,
    }

    impl ScriptedApi {
        fn ok() -> Self {
            Self {
                calls: RefCell::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: RefCell::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl CompletionApi for ScriptedApi {
        fn complete(&self, _prompt: &str) -> Result<String, CondenserError> {
            *self.calls.borrow_mut() += 1;
            if self.fail {
                Err(CondenserError::Network("503".to_string()))
            } else {
                Ok("a short summary".to_string())
            }
        }
    }

    struct RecordingSink {
        entries: RefCell<Vec<(String, String)>>,
    }

    impl MemorySink for RecordingSink {
        fn append(&self, entry_key: &str, text: &str) -> Result<(), CondenserError> {
            self.entries
                .borrow_mut()
                .push((entry_key.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn temp_store() -> (tempfile::TempDir, SummaryStore) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let home = tmp.path().to_path_buf();
        let paths = CondenserPaths {
            condenser_home: home.clone(),
            state_file: home.join("state/scheduler.json"),
            summaries_file: home.join("summaries.jsonl"),
            credentials_file: home.join("credentials.json"),
            config_file: home.join("condenser.toml"),
        };
        let store = SummaryStore::new(&paths);
        (tmp, store)
    }

    fn log_of(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| test_message(&format!("message {i}"), i % 2 == 0))
            .collect()
    }

    #[test]
    fn auto_fires_exactly_at_interval() {
        let config = CondenserConfig::default(); // interval 20
        let api = ScriptedApi::ok();
        let (_tmp, store) = temp_store();
        let mut scheduler = Scheduler::new(&config, &api, None, SchedulerState::default());

        let mut messages = log_of(19);
        let out = scheduler.check_auto(&mut messages, &store).unwrap();
        assert!(matches!(out, AutoOutcome::NotDue { pending: 19 }));
        assert_eq!(api.calls(), 0);

        let mut messages = log_of(20);
        let out = scheduler.check_auto(&mut messages, &store).unwrap();
        assert!(matches!(out, AutoOutcome::Summarized(_)));
        assert_eq!(api.calls(), 1);
        assert_eq!(scheduler.state().last_summarized_index, 20);

        // One more message is not enough until the next interval.
        let mut messages = log_of(21);
        let out = scheduler.check_auto(&mut messages, &store).unwrap();
        assert!(matches!(out, AutoOutcome::NotDue { pending: 1 }));

        let mut messages = log_of(40);
        let out = scheduler.check_auto(&mut messages, &store).unwrap();
        assert!(matches!(out, AutoOutcome::Summarized(_)));
        assert_eq!(scheduler.state().last_summarized_index, 40);
        assert_eq!(api.calls(), 2);
    }

    #[test]
    fn failed_auto_does_not_advance_pointer() {
        let config = CondenserConfig::default();
        let api = ScriptedApi::failing();
        let (_tmp, store) = temp_store();
        let mut scheduler = Scheduler::new(&config, &api, None, SchedulerState::default());

        let mut messages = log_of(20);
        let err = scheduler.check_auto(&mut messages, &store).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(scheduler.state().last_summarized_index, 0);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn auto_skips_empty_range_and_advances() {
        let mut config = CondenserConfig::default();
        config.extraction.enabled = true;
        config
            .extraction
            .rules
            .add(RuleKind::Include, "content")
            .unwrap();
        let api = ScriptedApi::ok();
        let (_tmp, store) = temp_store();
        let mut scheduler = Scheduler::new(&config, &api, None, SchedulerState::default());

        // No message contains a <content> tag, so extraction empties the range.
        let mut messages = log_of(20);
        let out = scheduler.check_auto(&mut messages, &store).unwrap();
        assert!(matches!(out, AutoOutcome::SkippedEmpty { start: 0, end: 20 }));
        assert_eq!(api.calls(), 0);
        assert_eq!(scheduler.state().last_summarized_index, 20);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn manual_rebases_pointer_and_records() {
        let mut config = CondenserConfig::default();
        config.summarize.max_messages = 10;
        let api = ScriptedApi::ok();
        let (_tmp, store) = temp_store();
        let mut scheduler = Scheduler::new(&config, &api, None, SchedulerState::default());

        let mut messages = log_of(35);
        let success = scheduler.summarize_manual(&mut messages, &store).unwrap();
        assert_eq!(success.record.start, 25);
        assert_eq!(success.record.end, 35);
        assert!(!success.record.auto);
        assert_eq!(scheduler.state().last_summarized_index, 35);

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].range_label(), "26-35");
    }

    #[test]
    fn manual_empty_log_is_no_history() {
        let config = CondenserConfig::default();
        let api = ScriptedApi::ok();
        let (_tmp, store) = temp_store();
        let mut scheduler = Scheduler::new(&config, &api, None, SchedulerState::default());

        let mut messages: Vec<Message> = Vec::new();
        let err = scheduler.summarize_manual(&mut messages, &store).unwrap_err();
        assert!(matches!(err, CondenserError::NoHistory));
    }

    #[test]
    fn manual_all_filtered_is_empty_content() {
        let mut config = CondenserConfig::default();
        config.extraction.enabled = true;
        config
            .extraction
            .rules
            .add(RuleKind::Include, "content")
            .unwrap();
        let api = ScriptedApi::ok();
        let (_tmp, store) = temp_store();
        let mut scheduler = Scheduler::new(&config, &api, None, SchedulerState::default());

        let mut messages = log_of(5);
        let err = scheduler.summarize_manual(&mut messages, &store).unwrap_err();
        assert!(matches!(err, CondenserError::EmptyContent { .. }));
        assert_eq!(api.calls(), 0);
        assert_eq!(scheduler.state().last_summarized_index, 0);
    }

    #[test]
    fn busy_guard_rejects_reentry() {
        let config = CondenserConfig::default();
        let api = ScriptedApi::ok();
        let (_tmp, store) = temp_store();
        let mut scheduler = Scheduler::new(&config, &api, None, SchedulerState::default());
        scheduler.busy = true;

        let mut messages = log_of(20);
        assert!(matches!(
            scheduler.summarize_manual(&mut messages, &store),
            Err(CondenserError::Busy)
        ));
        assert!(matches!(
            scheduler.check_auto(&mut messages, &store),
            Err(CondenserError::Busy)
        ));
        assert_eq!(api.calls(), 0);
    }

    #[test]
    fn success_hides_below_watermark_when_auto_hide_on() {
        let mut config = CondenserConfig::default();
        config.hide.auto_hide = true;
        config.hide.keep_visible = 5;
        let api = ScriptedApi::ok();
        let (_tmp, store) = temp_store();
        let mut scheduler = Scheduler::new(&config, &api, None, SchedulerState::default());

        let mut messages = log_of(20);
        let success = scheduler.summarize_manual(&mut messages, &store).unwrap();
        assert_eq!(success.hidden, 15);
        assert!(messages[..15].iter().all(|m| m.hidden));
        assert!(messages[15..].iter().all(|m| !m.hidden));
    }

    #[test]
    fn memory_sink_receives_summary_with_speaker_key() {
        let config = CondenserConfig::default();
        let api = ScriptedApi::ok();
        let sink = RecordingSink {
            entries: RefCell::new(Vec::new()),
        };
        let (_tmp, store) = temp_store();
        let mut scheduler = Scheduler::new(&config, &api, Some(&sink), SchedulerState::default());

        let mut messages = log_of(20);
        scheduler.summarize_manual(&mut messages, &store).unwrap();

        let entries = sink.entries.borrow();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].0.starts_with("Aria - "));
        assert_eq!(entries[0].1, "a short summary");
    }

    #[test]
    fn auto_success_reaches_memory_sink() {
        let config = CondenserConfig::default();
        let api = ScriptedApi::ok();
        let sink = RecordingSink {
            entries: RefCell::new(Vec::new()),
        };
        let (_tmp, store) = temp_store();
        let mut scheduler = Scheduler::new(&config, &api, Some(&sink), SchedulerState::default());

        let mut messages = log_of(20);
        let out = scheduler.check_auto(&mut messages, &store).unwrap();
        assert!(matches!(out, AutoOutcome::Summarized(_)));

        let entries = sink.entries.borrow();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1, "a short summary");
    }

    #[test]
    fn pointer_clamps_when_log_shrinks() {
        let config = CondenserConfig::default();
        let api = ScriptedApi::ok();
        let (_tmp, store) = temp_store();
        let state = SchedulerState {
            last_summarized_index: 50,
            ..Default::default()
        };
        let mut scheduler = Scheduler::new(&config, &api, None, state);

        let mut messages = log_of(10);
        let out = scheduler.check_auto(&mut messages, &store).unwrap();
        assert!(matches!(out, AutoOutcome::NotDue { pending: 0 }));
        assert_eq!(scheduler.state().last_summarized_index, 10);
    }
}
