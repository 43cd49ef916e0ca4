use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration. Environment variables are read exactly once,
/// at construction; the resolver never consults ambient state
/// mid-request.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Filesystem root for `local` node definitions (`NODES_PATH`).
    pub nodes_path: Option<PathBuf>,
    pub remote: RemoteRuntimeConfig,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self {
            nodes_path: std::env::var("NODES_PATH").ok().map(PathBuf::from),
            remote: RemoteRuntimeConfig::from_env(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            nodes_path: None,
            remote: RemoteRuntimeConfig::default(),
        }
    }
}

/// Endpoint of the external python3 runtime used by the
/// `runtime.python3` resolution strategy.
#[derive(Debug, Clone)]
pub struct RemoteRuntimeConfig {
    pub host: String,
    pub port: u16,
    /// Timeout for one remote invocation. Expiry is a normal step
    /// failure; there is no automatic retry.
    pub timeout: Duration,
}

impl RemoteRuntimeConfig {
    pub fn from_env() -> Self {
        let host =
            std::env::var("RUNTIME_PYTHON3_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = std::env::var("RUNTIME_PYTHON3_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(50051);

        Self {
            host,
            port,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for RemoteRuntimeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 50051,
            timeout: Duration::from_secs(30),
        }
    }
}
