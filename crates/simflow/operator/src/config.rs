//! Configuration for simflow-operator

use crate::error::{OperatorError, OperatorResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Main operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// How the Kubernetes client connects. Required; there is no default.
    #[serde(default)]
    pub execution_mode: Option<ExecutionMode>,

    /// Only watch Simulations in this namespace (all namespaces when unset)
    #[serde(default)]
    pub watch_namespace: Option<String>,

    /// Reconciler configuration
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Building block retry policy
    #[serde(default)]
    pub blocks: BlockPolicy,

    /// Health server configuration
    #[serde(default)]
    pub health: HealthServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            execution_mode: None,
            watch_namespace: None,
            reconciler: ReconcilerConfig::default(),
            blocks: BlockPolicy::default(),
            health: HealthServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// How the workload client authenticates and connects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExecutionMode {
    /// Running outside the cluster, e.g. on a dev machine (uses the kubeconfig)
    Local,

    /// Running inside the cluster (uses the pod's service account)
    InCluster,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Local => "Local",
            ExecutionMode::InCluster => "InCluster",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(ExecutionMode::Local),
            "incluster" => Ok(ExecutionMode::InCluster),
            other => Err(format!(
                "unknown execution mode '{}', expected Local or InCluster",
                other
            )),
        }
    }
}

impl TryFrom<String> for ExecutionMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExecutionMode> for String {
    fn from(mode: ExecutionMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Delay before re-evaluating a non-terminal Simulation
    #[serde(default = "default_requeue_interval")]
    pub requeue_interval_secs: u64,

    /// Deadline for a single reconciliation pass
    #[serde(default = "default_pass_timeout")]
    pub pass_timeout_secs: u64,

    /// Delay before retrying a pass that hit a version conflict
    #[serde(default = "default_conflict_requeue")]
    pub conflict_requeue_millis: u64,

    /// First delay of the exponential backoff after a failed pass
    #[serde(default = "default_backoff_base")]
    pub error_backoff_base_millis: u64,

    /// Upper bound of the exponential backoff
    #[serde(default = "default_backoff_max")]
    pub error_backoff_max_secs: u64,

    /// Maximum passes running at once across keys (0 = unbounded)
    #[serde(default)]
    pub max_concurrent_reconciles: u16,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            requeue_interval_secs: default_requeue_interval(),
            pass_timeout_secs: default_pass_timeout(),
            conflict_requeue_millis: default_conflict_requeue(),
            error_backoff_base_millis: default_backoff_base(),
            error_backoff_max_secs: default_backoff_max(),
            max_concurrent_reconciles: 0,
        }
    }
}

impl ReconcilerConfig {
    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_interval_secs)
    }

    pub fn pass_timeout(&self) -> Duration {
        Duration::from_secs(self.pass_timeout_secs)
    }

    pub fn conflict_requeue(&self) -> Duration {
        Duration::from_millis(self.conflict_requeue_millis)
    }

    pub fn error_backoff_base(&self) -> Duration {
        Duration::from_millis(self.error_backoff_base_millis)
    }

    pub fn error_backoff_max(&self) -> Duration {
        Duration::from_secs(self.error_backoff_max_secs)
    }
}

/// How many times a block may hit a transient error before it is failed
///
/// A budget of 1 fails the block on its first error of any kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockPolicy {
    /// Create calls allowed per block, counting the one that succeeds
    #[serde(default = "default_attempts")]
    pub max_create_attempts: u32,

    /// Failed status queries tolerated per block
    #[serde(default = "default_attempts")]
    pub max_status_failures: u32,
}

impl Default for BlockPolicy {
    fn default() -> Self {
        Self {
            max_create_attempts: default_attempts(),
            max_status_failures: default_attempts(),
        }
    }
}

/// Health server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthServerConfig {
    /// Serve /healthz, /readyz and /status
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Listen address
    #[serde(default = "default_health_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: default_health_addr(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_requeue_interval() -> u64 {
    10
}

fn default_pass_timeout() -> u64 {
    30
}

fn default_conflict_requeue() -> u64 {
    500
}

fn default_backoff_base() -> u64 {
    1000
}

fn default_backoff_max() -> u64 {
    300
}

fn default_attempts() -> u32 {
    1
}

fn default_health_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8081))
}

fn default_log_level() -> String {
    "info".to_string()
}

impl OperatorConfig {
    /// Load configuration: defaults, then the optional file, then `SIMFLOW_*`
    /// environment variables (`__` separates nested keys).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&OperatorConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables with SIMFLOW_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("SIMFLOW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Resolve the connection mode once at startup.
    ///
    /// An explicit override wins over the configured value. No mode at all is a
    /// fatal configuration error.
    pub fn resolve_execution_mode(
        &self,
        overridden: Option<ExecutionMode>,
    ) -> OperatorResult<ExecutionMode> {
        overridden.or(self.execution_mode).ok_or_else(|| {
            OperatorError::Config(
                "EXECUTION_MODE is not set. Cannot load Local or InCluster kubernetes configuration"
                    .to_string(),
            )
        })
    }

    /// Reject values the operator cannot run with
    pub fn validate(&self) -> OperatorResult<()> {
        if self.reconciler.requeue_interval_secs == 0 {
            return Err(OperatorError::Config(
                "reconciler.requeue_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.reconciler.pass_timeout_secs == 0 {
            return Err(OperatorError::Config(
                "reconciler.pass_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.blocks.max_create_attempts == 0 || self.blocks.max_status_failures == 0 {
            return Err(OperatorError::Config(
                "blocks.max_create_attempts and blocks.max_status_failures must be at least 1"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
