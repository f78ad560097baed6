//! The agent-side dispatch machinery, interfacing between the shared broker
//! queue and the local worker pool

/// Manager orchestrating the ventilator and worker threads
pub mod manager;
/// Response publisher with bounded, acknowledgment-keyed retries
pub mod sink;
/// Schema and business constraints on decoded jobs
pub mod validate;
/// Fetch loop pulling, validating and staleness-checking queued jobs
pub mod ventilator;
