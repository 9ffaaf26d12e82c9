//! Resilience for span export.
//!
//! # Data Flow
//! ```text
//! Batch export attempt fails:
//!     → retries.rs (retryable failure with attempts left? capped
//!       exponential delay, half of it jittered)
//!     → next attempt, or drop the batch with one diagnostic
//! ```
//!
//! # Design Decisions
//! - Attempts are bounded; export never retries forever
//! - Jittered backoff prevents many processes hammering a recovering collector
//! - Connection errors always retryable; 4xx rejections are not (except 408/429)

pub mod retries;
