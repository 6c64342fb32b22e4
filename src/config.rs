/*
 * config.rs
 * Copyright (C) 2026 webclient_core contributors
 *
 * This file is part of webclient_core.
 *
 * webclient_core is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * webclient_core is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with webclient_core.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Webclient tuning knobs. All timeouts are milliseconds; all defaults match
//! the values called out in the design document.

/// Configuration for a [`crate::webclient::facade::Webclient`] /
/// [`crate::webclient::pool::DataObjectPool`] pair.
#[derive(Debug, Clone, Copy)]
pub struct WebclientConfig {
    /// Max live destinations / acsocket slots. Must be in `[1, 100]`.
    pub pool_size: usize,
    /// Starting size of each acsocket slot's receive buffer; grows on demand.
    pub buffer_size: usize,
    /// How long an operative-but-empty connection stays open before closing.
    pub idle_timeout_ms: u64,
    /// How long a dataobject with no connection and an empty queue survives
    /// before it is evicted from the pool.
    pub free_timeout_ms: u64,
    /// Retry backoff exponent cap: `RETRY_MAX` in the design document. Delay
    /// is `2^attempt` seconds, capped; at `attempt >= retry_max` we give up.
    pub retry_max: u32,
    /// Resolves the design document's open question about when a clean
    /// close latches `pipeline_flag = No`. When `true`, matches the source's
    /// literal (but racy) behaviour: *any* disconnect with a pending queue
    /// latches `No`. When `false` (default), a disconnect only latches `No`
    /// if at least one response has already completed on that connection —
    /// a close before the first response completes is treated as a plain
    /// connect failure, not a pipelining verdict.
    pub latch_no_pipeline_before_first_response: bool,
}

impl WebclientConfig {
    pub const MIN_POOL_SIZE: usize = 1;
    pub const MAX_POOL_SIZE: usize = 100;

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.pool_size < Self::MIN_POOL_SIZE || self.pool_size > Self::MAX_POOL_SIZE {
            return Err(crate::error::WebclientError::InvalidParam("pool_size"));
        }
        if self.buffer_size == 0 {
            return Err(crate::error::WebclientError::InvalidParam("buffer_size"));
        }
        Ok(())
    }
}

impl Default for WebclientConfig {
    fn default() -> Self {
        Self {
            pool_size: 16,
            buffer_size: 2048,
            idle_timeout_ms: 30_000,
            free_timeout_ms: 30_000,
            retry_max: 3,
            latch_no_pipeline_before_first_response: false,
        }
    }
}
