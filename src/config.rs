use std::env;
use anyhow::{Context, Result, bail};

/// Which storage backend holds routes and users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Spanner,
    Memory,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreBackend::Spanner => "spanner",
            StoreBackend::Memory => "memory",
        }
    }
}

/// Spanner coordinates, only present for the Spanner backend
#[derive(Debug, Clone)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: StoreBackend,
    pub spanner: Option<SpannerConfig>,
    pub service_port: u16,
    pub service_host: String,
    pub fault_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let backend = match env::var("ROUTE_STORE")
            .unwrap_or_else(|_| "spanner".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "spanner" => StoreBackend::Spanner,
            "memory" => StoreBackend::Memory,
            other => bail!("ROUTE_STORE must be 'spanner' or 'memory', got '{}'", other),
        };

        let spanner = match backend {
            StoreBackend::Spanner => Some(SpannerConfig::from_env()?),
            StoreBackend::Memory => None,
        };

        let service_port = env::var("SERVICE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = env::var("SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let fault_seed = env::var("FAULT_SEED")
            .ok()
            .map(|seed| seed.parse::<u64>())
            .transpose()
            .context("FAULT_SEED must be an unsigned 64-bit integer")?;

        Ok(Config {
            backend,
            spanner,
            service_port,
            service_host,
            fault_seed,
        })
    }

    /// Origin used for pagination links when the request carries no Host header
    pub fn default_origin(&self) -> String {
        format!("http://{}:{}", self.service_host, self.service_port)
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Route store: {}", self.backend.as_str());
        if let Some(spanner) = &self.spanner {
            tracing::info!("  Spanner emulator: {}",
                spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
            tracing::info!("  Spanner project: {}", spanner.project);
            tracing::info!("  Spanner instance: {}", spanner.instance);
            tracing::info!("  Spanner database: {}", spanner.database);
        }
        match self.fault_seed {
            Some(seed) => tracing::info!("  Fault injection seed: {}", seed),
            None => tracing::info!("  Fault injection seed: random"),
        }
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}

impl SpannerConfig {
    fn from_env() -> Result<Self> {
        let emulator_host = env::var("SPANNER_EMULATOR_HOST").ok();

        let project = env::var("SPANNER_PROJECT")
            .context("SPANNER_PROJECT environment variable is required")?;

        let instance = env::var("SPANNER_INSTANCE")
            .context("SPANNER_INSTANCE environment variable is required")?;

        let database = env::var("SPANNER_DATABASE")
            .context("SPANNER_DATABASE environment variable is required")?;

        Ok(SpannerConfig {
            emulator_host,
            project,
            instance,
            database,
        })
    }

    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}
