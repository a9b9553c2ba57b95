//! URL-aware detection of degenerate action loops.

use std::collections::VecDeque;

/// How many recent actions the detector remembers.
pub const RECENT_ACTIONS_CAP: usize = 10;

/// One executed (or proposed) action and the URL it ran against.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentAction {
    pub action: String,
    pub url: String,
}

/// Bounded ring of the most recent actions.
#[derive(Debug, Default)]
pub struct RecentActions {
    entries: VecDeque<RecentAction>,
}

impl RecentActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: impl Into<String>, url: impl Into<String>) {
        self.entries.push_back(RecentAction {
            action: action.into(),
            url: url.into(),
        });
        while self.entries.len() > RECENT_ACTIONS_CAP {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Would executing `action` on `url` continue a degenerate loop?
    ///
    /// Two signals:
    /// - *Exact repetition*: the proposal would be the third identical
    ///   `(action, url)` in a row.
    /// - *Oscillation*: counting a "visit" as an entry whose predecessor had
    ///   a different URL, the proposal would be at least the third visit to
    ///   its URL in the window. Repeated actions on one page are a single
    ///   visit, so clicking "next" ten times in a mail reader is fine.
    pub fn is_stuck(&self, action: &str, url: &str) -> bool {
        let mut last_two = self.entries.iter().rev().take(2);
        if self.entries.len() >= 2
            && last_two.all(|e| e.action == action && e.url == url)
        {
            return true;
        }

        let mut visits = 0usize;
        let mut prev_url: Option<&str> = None;
        for entry_url in self
            .entries
            .iter()
            .map(|e| e.url.as_str())
            .chain(std::iter::once(url))
        {
            if prev_url != Some(entry_url) && entry_url == url {
                visits += 1;
            }
            prev_url = Some(entry_url);
        }
        visits >= 3
    }
}
