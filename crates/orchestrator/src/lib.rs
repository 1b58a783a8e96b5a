//! Workflow orchestrator: gates every heavy evaluation run behind a
//! verify → init → launch state machine.
//!
//! The single public operation, [`Orchestrator::prepare_workflow`], never
//! errors across the boundary. Rate-limit rejections, verification failures,
//! and internal faults all come back as a
//! [`LaunchResponse`](levelapp_core::LaunchResponse) the caller inspects.

pub mod background;
pub mod orchestrator;
pub mod ratelimit;
pub mod token;
pub mod verifier;

pub use background::{SWEEP_INTERVAL, spawn_sweeper};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use ratelimit::{RateLimitExceeded, RateLimiter};
pub use token::{LAUNCH_TOKEN_AUDIENCE, LAUNCH_TOKEN_TTL, LaunchClaims, LaunchTokenIssuer, TokenError};
pub use verifier::{PROBE_TIMEOUT, PrerequisiteVerifier, Verifier};
