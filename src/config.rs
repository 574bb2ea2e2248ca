//! Configuration management for the service.
//!
//! Runtime configuration comes from the environment, matching the way the
//! service is deployed: `PORT` selects the listening port, `API_KEY`
//! optionally enables header authentication, and `BUFFER_KM` overrides the
//! buffer distance used by the batch pipeline. Command line flags may
//! override individual values after loading.

use anyhow::{Context, Result};

use crate::constants::{DEFAULT_BUFFER_KM, DEFAULT_HOST, DEFAULT_PORT};

/// Runtime configuration for the service.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// TCP port to listen on.
    pub port: u16,
    /// Host address to bind to.
    pub host: String,
    /// Optional API key; when set, POST routes require a matching
    /// `x-api-key` header.
    pub api_key: Option<String>,
    /// Buffer distance for the batch pipeline, in kilometres.
    pub buffer_km: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
            api_key: None,
            buffer_km: DEFAULT_BUFFER_KM,
        }
    }
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` or `BUFFER_KM` is present but not
    /// parseable.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("API_KEY").ok().as_deref(),
            std::env::var("BUFFER_KM").ok().as_deref(),
        )
    }

    /// Builds a configuration from raw variable values.
    ///
    /// Separated from [`Config::from_env`] so parsing can be tested without
    /// mutating the process environment.
    pub fn from_vars(
        port: Option<&str>,
        api_key: Option<&str>,
        buffer_km: Option<&str>,
    ) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = port {
            config.port = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {raw:?}"))?;
        }

        // An empty API_KEY means authentication stays disabled.
        config.api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(ToString::to_string);

        if let Some(raw) = buffer_km {
            config.buffer_km = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid BUFFER_KM value: {raw:?}"))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer distance is not a positive, finite
    /// number.
    pub fn validate(&self) -> Result<()> {
        if !self.buffer_km.is_finite() || self.buffer_km <= 0.0 {
            anyhow::bail!(
                "Buffer distance must be a positive number of kilometres, got {}",
                self.buffer_km
            );
        }
        Ok(())
    }
}
