use crate::error::CondenserError;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    Include,
    Exclude,
    RegexInclude,
    RegexExclude,
}

impl RuleKind {
    pub fn is_exclude(self) -> bool {
        matches!(self, Self::Exclude | Self::RegexExclude)
    }

    pub fn is_include(self) -> bool {
        matches!(self, Self::Include | Self::RegexInclude)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Exclude => "exclude",
            Self::RegexInclude => "regex-include",
            Self::RegexExclude => "regex-exclude",
        }
    }
}

impl std::str::FromStr for RuleKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "include" => Ok(Self::Include),
            "exclude" => Ok(Self::Exclude),
            "regex-include" | "regex_include" => Ok(Self::RegexInclude),
            "regex-exclude" | "regex_exclude" => Ok(Self::RegexExclude),
            other => Err(format!(
                "unknown rule kind `{other}`; use include, exclude, regex-include, or regex-exclude"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub kind: RuleKind,
    pub pattern: String,
}

/// Build the tag-matching pattern for `Include`/`Exclude` rules. The tag
/// name is escaped so user input like `a.b` stays a literal tag name and
/// cannot inject regex syntax.
pub fn tag_pattern(tag: &str) -> String {
    let escaped = regex::escape(tag.trim());
    format!("<{escaped}[^>]*>(.*?)</{escaped}>")
}

fn compile_case_insensitive(pattern: &str) -> Result<regex::Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
}

impl ExtractionRule {
    /// Compile the effective pattern. Tag-kind rules always compile since
    /// the tag name is escaped; regex-kind rules carry user input and can
    /// fail.
    pub fn compile(&self) -> Result<regex::Regex, regex::Error> {
        match self.kind {
            RuleKind::Include | RuleKind::Exclude => {
                compile_case_insensitive(&tag_pattern(&self.pattern))
            }
            RuleKind::RegexInclude | RuleKind::RegexExclude => {
                compile_case_insensitive(&self.pattern)
            }
        }
    }
}

/// Ordered rule list. Insertion order is significant: the extraction
/// engine applies every exclude-kind rule before any include-kind rule,
/// each group in list order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<ExtractionRule>,
}

impl RuleSet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractionRule> {
        self.rules.iter()
    }

    pub fn has_include_rules(&self) -> bool {
        self.rules.iter().any(|r| r.kind.is_include())
    }

    /// Add a rule, rejecting regex-kind rules that do not compile.
    /// Invalid patterns are never stored, so extraction never sees them.
    pub fn add(&mut self, kind: RuleKind, pattern: &str) -> Result<(), CondenserError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(CondenserError::Pattern {
                pattern: String::new(),
                reason: "pattern cannot be empty".to_string(),
            });
        }

        let rule = ExtractionRule {
            kind,
            pattern: pattern.to_string(),
        };
        if let Err(err) = rule.compile() {
            return Err(CondenserError::Pattern {
                pattern: pattern.to_string(),
                reason: err.to_string(),
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Add a rule only if an identical one is not already present.
    /// Used by preset installation.
    pub fn add_unique(&mut self, kind: RuleKind, pattern: &str) -> Result<bool, CondenserError> {
        let exists = self
            .rules
            .iter()
            .any(|r| r.kind == kind && r.pattern == pattern.trim());
        if exists {
            return Ok(false);
        }
        self.add(kind, pattern)?;
        Ok(true)
    }

    pub fn remove(&mut self, index: usize) -> Option<ExtractionRule> {
        if index < self.rules.len() {
            Some(self.rules.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }
}

/// Flat list of literal strings scrubbed from text after rule-based
/// extraction. Entries are deduplicated on insert; matching is
/// case-insensitive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blacklist {
    entries: Vec<String>,
}

impl Blacklist {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }

    pub fn add(&mut self, entry: &str) -> bool {
        let entry = entry.trim();
        if entry.is_empty() {
            return false;
        }
        if self.entries.iter().any(|e| e == entry) {
            return false;
        }
        self.entries.push(entry.to_string());
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub struct PresetRules {
    pub key: &'static str,
    pub name: &'static str,
    pub rules: &'static [(RuleKind, &'static str)],
}

/// Rule bundles for common transcript formats, addable by key.
pub const PRESET_RULES: &[PresetRules] = &[
    PresetRules {
        key: "content-tag",
        name: "content tag",
        rules: &[(RuleKind::Include, "content")],
    },
    PresetRules {
        key: "details-summary",
        name: "details summary block",
        rules: &[(
            RuleKind::RegexInclude,
            "<details><summary>摘要</summary>([\\s\\S]*?)</details>",
        )],
    },
    PresetRules {
        key: "html-comment",
        name: "strip HTML comments",
        rules: &[(RuleKind::RegexExclude, "<!--[\\s\\S]*?-->")],
    },
    PresetRules {
        key: "game-loadall",
        name: "game.loadAll payload",
        rules: &[(
            RuleKind::RegexInclude,
            "game\\.loadAll\\(`([\\s\\S]*?)`\\)",
        )],
    },
];

pub fn find_preset(key: &str) -> Option<&'static PresetRules> {
    PRESET_RULES.iter().find(|p| p.key == key)
}

/// Install every rule of a preset that is not already present. Returns
/// the number of rules actually added.
pub fn apply_preset(rules: &mut RuleSet, key: &str) -> Result<usize, CondenserError> {
    let Some(preset) = find_preset(key) else {
        return Err(CondenserError::Pattern {
            pattern: key.to_string(),
            reason: "unknown preset key".to_string(),
        });
    };

    let mut added = 0usize;
    for (kind, pattern) in preset.rules {
        if rules.add_unique(*kind, pattern)? {
            added += 1;
        }
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_regex_is_rejected_at_insertion() {
        let mut rules = RuleSet::default();
        let err = rules.add(RuleKind::RegexExclude, "([unclosed").unwrap_err();
        assert!(matches!(err, CondenserError::Pattern { .. }));
        assert!(rules.is_empty());
    }

    #[test]
    fn tag_names_with_metacharacters_compile() {
        let mut rules = RuleSet::default();
        rules.add(RuleKind::Exclude, "a.b(c)").unwrap();
        let compiled = rules.iter().next().unwrap().compile().unwrap();
        assert!(compiled.is_match("<a.b(c)>x</a.b(c)>"));
        assert!(!compiled.is_match("<aXb(c)>x</aXb(c)>"));
    }

    #[test]
    fn blacklist_deduplicates() {
        let mut bl = Blacklist::default();
        assert!(bl.add("foo"));
        assert!(!bl.add("foo"));
        assert!(!bl.add("  "));
        assert_eq!(bl.len(), 1);
    }

    #[test]
    fn presets_install_once() {
        let mut rules = RuleSet::default();
        assert_eq!(apply_preset(&mut rules, "content-tag").unwrap(), 1);
        assert_eq!(apply_preset(&mut rules, "content-tag").unwrap(), 0);
        assert!(apply_preset(&mut rules, "no-such-preset").is_err());
    }

    #[test]
    fn rule_kind_parses_both_separators() {
        assert_eq!(
            "regex-exclude".parse::<RuleKind>().unwrap(),
            RuleKind::RegexExclude
        );
        assert_eq!(
            "regex_exclude".parse::<RuleKind>().unwrap(),
            RuleKind::RegexExclude
        );
        assert!("regexexclude".parse::<RuleKind>().is_err());
    }
}
