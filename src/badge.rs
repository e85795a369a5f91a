//! Status badge reflecting the stored record count.

use std::sync::{Arc, Mutex};
use tracing::debug;

/// Short text label shown to the user.
pub trait Badge: Send + Sync {
    fn set_text(&self, text: &str);
}

/// Label for `count` records: the count itself, or empty when there are none.
pub fn badge_text(count: usize) -> String {
    if count == 0 {
        String::new()
    } else {
        count.to_string()
    }
}

/// Badge that keeps the latest label in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBadge {
    text: Arc<Mutex<String>>,
}

impl MemoryBadge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.text.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl Badge for MemoryBadge {
    fn set_text(&self, text: &str) {
        debug!("Badge: {:?}", text);
        if let Ok(mut current) = self.text.lock() {
            *current = text.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_text() {
        assert_eq!(badge_text(0), "");
        assert_eq!(badge_text(1), "1");
        assert_eq!(badge_text(100), "100");
    }

    #[test]
    fn test_memory_badge_shares_label() {
        let badge = MemoryBadge::new();
        let view = badge.clone();
        badge.set_text("42");
        assert_eq!(view.text(), "42");
    }
}
