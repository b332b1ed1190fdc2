/// Fetch worker state definitions
///
/// A worker cycles through these states once per frontier item.
use std::fmt;

/// Represents where a fetch worker is in its per-item cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Waiting on the frontier
    Idle,

    /// Holding a popped item, running skip checks
    Dequeued,

    /// Holding a domain admission token
    Admitted,

    /// Page load in progress (including retry backoff)
    Navigating,

    /// Page loaded; interaction and snapshots
    Rendering,

    /// Running the extractor over captured markup
    Extracting,

    /// Handing the record to the sinks and enqueueing links
    Persisting,

    /// Item abandoned after retry exhaustion, capture or extraction failure
    Errored,
}

impl WorkerState {
    /// Checks whether the worker may move from `self` to `next`
    pub fn can_transition_to(&self, next: WorkerState) -> bool {
        use WorkerState::*;

        matches!(
            (self, next),
            (Idle, Dequeued)
                | (Dequeued, Idle)
                | (Dequeued, Admitted)
                | (Admitted, Navigating)
                | (Navigating, Rendering)
                | (Navigating, Errored)
                | (Rendering, Extracting)
                | (Rendering, Errored)
                | (Extracting, Persisting)
                | (Extracting, Errored)
                | (Persisting, Idle)
                | (Errored, Idle)
        )
    }

    /// Returns true if the worker is holding a domain admission token in this state
    pub fn holds_admission(&self) -> bool {
        matches!(
            self,
            Self::Admitted | Self::Navigating | Self::Rendering | Self::Extracting | Self::Persisting
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dequeued => "dequeued",
            Self::Admitted => "admitted",
            Self::Navigating => "navigating",
            Self::Rendering => "rendering",
            Self::Extracting => "extracting",
            Self::Persisting => "persisting",
            Self::Errored => "errored",
        }
    }
}

impl Default for WorkerState {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
