//! Executor configuration

/// Name used in log output when none is configured
pub const DEFAULT_NAME: &str = "bounded-executor";

/// Settings for a [`BoundedExecutor`](crate::BoundedExecutor)
///
/// # Example
///
/// ```rust
/// use bounded_executor::ExecutorConfig;
///
/// let config = ExecutorConfig::new(8).with_name("uploads");
/// assert_eq!(config.capacity, 8);
/// assert_eq!(config.name, "uploads");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Maximum number of work units running at once. Zero admits nothing.
    pub capacity: usize,

    /// Label attached to the executor's log events
    pub name: String,
}

impl ExecutorConfig {
    /// Configuration with the given capacity and the default name
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            name: DEFAULT_NAME.to_string(),
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for ExecutorConfig {
    /// One slot per logical CPU
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
