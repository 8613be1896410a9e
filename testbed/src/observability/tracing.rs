use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

/// Configuration for the tracing/logging system.
///
/// Test suites usually call [`TracingConfig::try_init`] from every test,
/// since only the first subscriber installed in a process takes effect:
///
/// ```
/// use testbed::observability::TracingConfig;
/// use tracing::Level;
///
/// TracingConfig::new().level(Level::DEBUG).try_init();
/// ```
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output logs as JSON.
    pub json: bool,
    /// The minimum log level.
    pub level: Level,
    /// Include the target (module path) in logs.
    pub with_target: bool,
    /// Include the source file in logs.
    pub with_file: bool,
    /// Include line numbers in logs.
    pub with_line_number: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: Level::INFO,
            with_target: true,
            with_file: false,
            with_line_number: false,
        }
    }
}

impl TracingConfig {
    /// Creates a new tracing configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables JSON output format.
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Sets the minimum log level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Configures whether to include the target in logs.
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Configures whether to include file names in logs.
    pub fn with_file(mut self, enabled: bool) -> Self {
        self.with_file = enabled;
        self
    }

    /// Configures whether to include line numbers in logs.
    pub fn with_line_number(mut self, enabled: bool) -> Self {
        self.with_line_number = enabled;
        self
    }

    /// Installs the global subscriber.
    ///
    /// # Panics
    ///
    /// Panics if a global subscriber is already installed.
    pub fn init(self) {
        if !self.try_init() {
            panic!("a global tracing subscriber is already installed");
        }
    }

    /// Installs the global subscriber unless one already exists, writing
    /// through the test writer so output is captured per test. Returns
    /// whether this call installed it.
    pub fn try_init(self) -> bool {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_string()));

        let builder = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(self.with_target)
            .with_file(self.with_file)
            .with_line_number(self.with_line_number);

        if self.json {
            builder.json().try_init().is_ok()
        } else {
            builder.try_init().is_ok()
        }
    }
}
