//! Load progress for the active directory.

/// Share of the bar given to placeholder creation; the rest is previews.
const PLACEHOLDER_WEIGHT: u32 = 40;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub total: usize,
    pub placeholders: usize,
    /// Previews that reached a terminal state in the current context.
    pub settled: usize,
}

impl LoadProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn is_done(&self) -> bool {
        self.placeholders >= self.total && self.settled >= self.total
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let total = self.total as u32;
        let placeholders = self.placeholders.min(self.total) as u32;
        let settled = self.settled.min(self.total) as u32;
        let pct = (PLACEHOLDER_WEIGHT * placeholders + (100 - PLACEHOLDER_WEIGHT) * settled) / total;
        pct.min(100) as u8
    }

    pub fn message(&self) -> String {
        if self.total == 0 {
            "No complete themes found".to_string()
        } else if self.placeholders < self.total {
            format!("Loading themes {}/{}", self.placeholders, self.total)
        } else if self.settled < self.total {
            format!("Generating previews {}/{}", self.settled, self.total)
        } else {
            format!("Loaded {} themes", self.total)
        }
    }
}
