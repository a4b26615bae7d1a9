use std::collections::VecDeque;

/// Lines held per instance while waiting for a durable flush. Durability is
/// database-backed, so the buffer is lossy: past the cap the oldest line is
/// dropped rather than growing without bound during a store outage.
pub const LOG_BUFFER_CAP: usize = 100;

/// At most this many rows go to the log sink per instance per tick.
pub const LOG_FLUSH_BATCH: usize = 20;

#[derive(Debug, Default)]
pub struct LogBuffer {
    lines: VecDeque<String>,
}

impl LogBuffer {
    pub fn push(&mut self, line: String) {
        if self.lines.len() == LOG_BUFFER_CAP {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// The next flush batch, oldest first. Lines stay buffered until the
    /// flush succeeds and `pop_front` removes them.
    pub fn peek_batch(&self, max: usize) -> Vec<String> {
        self.lines.iter().take(max).cloned().collect()
    }

    pub fn pop_front(&mut self, n: usize) {
        for _ in 0..n {
            if self.lines.pop_front().is_none() {
                break;
            }
        }
    }
}
