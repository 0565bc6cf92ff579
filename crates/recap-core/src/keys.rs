use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// `HCMBUGS-16852`: an uppercase letter, more uppercase letters or digits, a
/// hyphen, then digits.
static ISSUE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][A-Z0-9]+-[0-9]+").unwrap());

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Every issue key in `text`, in order of appearance (duplicates kept). A key
/// glued to a word on either side (`abcHCM-1`, `HCM-1abc`) does not count.
pub fn keys_in(text: &str) -> Vec<String> {
    ISSUE_KEY
        .find_iter(text)
        .filter(|m| {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            !before.is_some_and(is_word) && !after.is_some_and(is_word)
        })
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Deduplicated key set accumulated over several text sources.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeySet {
    keys: BTreeSet<String>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan(&mut self, text: &str) {
        self.keys.extend(keys_in(text));
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.keys
    }

    pub fn into_set(self) -> BTreeSet<String> {
        self.keys
    }
}

/// Keys mentioned anywhere in a set of strings, first occurrence wins.
pub fn keys_in_all<'a, I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for text in texts {
        for key in keys_in(text) {
            if seen.insert(key.clone()) {
                out.push(key);
            }
        }
    }
    out
}
