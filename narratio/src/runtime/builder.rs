use super::Runtime;

/// Default number of tasks polled between two timer checks.
const DEFAULT_EVENT_BUDGET: usize = 64;

/// Builder for configuring and creating a runtime.
///
/// `RuntimeBuilder` allows customizing runtime parameters before
/// constructing the runtime. Currently, it supports configuring the event
/// budget: how many ready tasks the executor polls before it looks at the
/// timer heap again. A smaller budget makes timers fire more promptly under
/// heavy load; a larger one favours throughput.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .event_budget(16)
///     .build();
/// ```
pub struct RuntimeBuilder {
    /// Number of tasks polled per executor tick.
    event_budget: usize,
}

impl RuntimeBuilder {
    /// Creates a new `RuntimeBuilder` with default configuration.
    pub fn new() -> Self {
        Self {
            event_budget: DEFAULT_EVENT_BUDGET,
        }
    }

    /// Sets the number of tasks polled before timers are checked again.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn event_budget(mut self, n: usize) -> Self {
        assert!(n > 0, "event_budget must be > 0");

        self.event_budget = n;
        self
    }

    /// Builds the runtime with the configured options.
    pub fn build(self) -> Runtime {
        Runtime::new(self.event_budget)
    }
}

impl Default for RuntimeBuilder {
    /// Creates a default `RuntimeBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
