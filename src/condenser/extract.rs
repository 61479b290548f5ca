use crate::condenser::rules::{Blacklist, RuleSet};
use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;
use tracing::warn;

static NEWLINE_RUNS: OnceLock<Regex> = OnceLock::new();

fn newline_runs() -> &'static Regex {
    NEWLINE_RUNS.get_or_init(|| Regex::new(r"\n{3,}").expect("static pattern"))
}

/// Remove every case-insensitive literal occurrence of every non-empty
/// blacklist entry. Entries are escaped, so they are always literals.
pub fn apply_blacklist(text: &str, blacklist: &Blacklist) -> String {
    let mut working = text.to_string();
    for entry in blacklist.iter() {
        if entry.trim().is_empty() {
            continue;
        }
        let pattern = RegexBuilder::new(&regex::escape(entry))
            .case_insensitive(true)
            .build()
            .expect("escaped literal always compiles");
        working = pattern.replace_all(&working, "").into_owned();
    }
    working
}

fn collapse_whitespace(text: &str) -> String {
    newline_runs().replace_all(text, "\n\n").trim().to_string()
}

/// Run the full extraction pipeline: exclusion rules, then inclusion
/// rules (pass-through when none exist), then the blacklist, then
/// newline collapsing. Stage order is fixed; see the rule docs for why
/// excludes always run first.
pub fn process(raw: &str, rules: &RuleSet, blacklist: &Blacklist) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut working = raw.to_string();

    for rule in rules.iter().filter(|r| r.kind.is_exclude()) {
        match rule.compile() {
            Ok(re) => {
                working = re.replace_all(&working, "").into_owned();
            }
            Err(err) => {
                // Rejected at insertion for custom rules; anything that
                // slips through is skipped, never fatal.
                warn!(pattern = %rule.pattern, %err, "skipping exclude rule with invalid pattern");
            }
        }
    }

    if rules.has_include_rules() {
        let mut fragments: Vec<String> = Vec::new();
        for rule in rules.iter().filter(|r| r.kind.is_include()) {
            let re = match rule.compile() {
                Ok(re) => re,
                Err(err) => {
                    warn!(pattern = %rule.pattern, %err, "skipping include rule with invalid pattern");
                    continue;
                }
            };
            for caps in re.captures_iter(&working) {
                let fragment = caps
                    .get(1)
                    .map(|m| m.as_str())
                    .unwrap_or_else(|| caps.get(0).map(|m| m.as_str()).unwrap_or(""));
                let trimmed = fragment.trim();
                if !trimmed.is_empty() {
                    fragments.push(trimmed.to_string());
                }
            }
        }
        working = fragments.join("\n\n");
    }

    collapse_whitespace(&apply_blacklist(&working, blacklist))
}
