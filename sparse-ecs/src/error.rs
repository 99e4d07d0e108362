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
//! Error type for the few checked operations
//!
//! Soft misuse (removing an absent component, reading a missing value)
//! degrades to a no-op or `None` and never reaches this type.

use thiserror::Error;

/// Errors returned by checked lookups and configuration loading
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    /// Positional lookup past the end of a container
    #[error("index {index} out of range for {component} (count {count})")]
    IndexOutOfRange {
        /// Component type name
        component: &'static str,
        /// Requested position
        index: usize,
        /// Number of holders
        count: usize,
    },

    /// Positional lookup while the container has unresolved changes
    #[error("{component} has unresolved changes from an open batch")]
    BatchInProgress {
        /// Component type name
        component: &'static str,
    },

    /// A configuration value could not be parsed
    #[error("invalid value {value:?} for {key}")]
    InvalidConfig {
        /// Setting name
        key: &'static str,
        /// Raw value
        value: String,
    },
}
