//! Configuration for reconciliation passes.

/// Configuration shared by the initializer, synchronizer and cleaner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Keep going after a per-item failure and report it, instead of
    /// aborting the pass with the first error.
    pub continue_on_error: bool,
    /// Maximum number of items one pass processes.
    pub max_items: Option<usize>,
}

impl SyncConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            continue_on_error: true,
            max_items: None,
        }
    }

    /// Sets whether per-item failures abort the pass.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Caps the number of items one pass processes.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Returns true once `processed` items reach the cap.
    pub(crate) fn limit_reached(&self, processed: usize) -> bool {
        self.max_items.is_some_and(|max| processed >= max)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
