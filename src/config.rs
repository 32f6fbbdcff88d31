//! Service Configuration
//!
//! Limits applied by the axum adapter and the paging defaults handed to
//! query functions.

use serde::{Deserialize, Serialize};

use crate::options::QueryOptions;

/// Adapter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Largest request body accepted, in bytes (default: 1 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Body chunks buffered between the handler and the client (default: 16)
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,

    /// Page size used when a request names none (default: 30)
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Largest page size a request may ask for (default: 30)
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_stream_buffer() -> usize {
    16
}

fn default_limit() -> usize {
    30
}

fn default_max_limit() -> usize {
    30
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            stream_buffer: default_stream_buffer(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl ServiceConfig {
    /// Page size for `options` under this config's limits
    pub fn limit_for(&self, options: &QueryOptions) -> usize {
        options.effective_limit(self.default_limit, self.max_limit)
    }

    /// Channel capacity, never zero
    pub(crate) fn channel_capacity(&self) -> usize {
        self.stream_buffer.max(1)
    }
}
