// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! World configuration
//!
//! # Environment Configuration
//!
//! [`WorldConfig::from_env`] reads:
//! ```bash
//! export SPARSE_ECS_INITIAL_CAPACITY=1024   # per-container reservation
//! export SPARSE_ECS_LOG_RESOLVES=1          # trace every batch resolution
//! ```

use crate::EcsError;

/// Environment variable holding [`WorldConfig::initial_capacity`]
pub const ENV_INITIAL_CAPACITY: &str = "SPARSE_ECS_INITIAL_CAPACITY";

/// Environment variable holding [`WorldConfig::log_resolves`]
pub const ENV_LOG_RESOLVES: &str = "SPARSE_ECS_LOG_RESOLVES";

/// Configuration for a [`crate::World`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldConfig {
    /// Capacity reserved by every container when it is created
    pub initial_capacity: usize,
    /// Whether to log a trace line each time a container resolves
    pub log_resolves: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            initial_capacity: 0,
            log_resolves: false,
        }
    }
}

impl WorldConfig {
    /// Create a configuration with custom capacity
    pub fn new(initial_capacity: usize) -> Self {
        WorldConfig {
            initial_capacity,
            ..Self::default()
        }
    }

    /// Set the per-container reservation
    pub fn with_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Enable logging for resolutions
    pub fn with_resolve_logging(mut self) -> Self {
        self.log_resolves = true;
        self
    }

    /// Load settings from the environment, defaulting unset variables
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, EcsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EcsError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_INITIAL_CAPACITY) {
            config.initial_capacity = raw.trim().parse().map_err(|_| EcsError::InvalidConfig {
                key: ENV_INITIAL_CAPACITY,
                value: raw.clone(),
            })?;
        }

        if let Some(raw) = lookup(ENV_LOG_RESOLVES) {
            config.log_resolves = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                _ => {
                    return Err(EcsError::InvalidConfig {
                        key: ENV_LOG_RESOLVES,
                        value: raw,
                    })
                }
            };
        }

        Ok(config)
    }
}
