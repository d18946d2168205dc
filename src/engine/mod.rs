//! Request execution subsystem.
//!
//! # Data Flow
//! ```text
//! Client::fetch(options)
//!     → RequestSpec::resolve (defaults applied once)
//!     → redirect.rs loop:
//!         headers::normalize
//!         → ConnectionConfig::from_spec (fresh per attempt)
//!         → executor.rs (connect → send → headers → body, under one Settlement)
//!         → Redirect: follow() and loop  |  Complete: return Response
//! ```
//!
//! # Design Decisions
//! - Exactly one outcome per attempt, enforced by `settle.rs`
//! - Redirects are an explicit loop, not recursion
//! - The timer bounds a whole attempt, including tunnel setup and body

pub mod client;
pub mod executor;
pub mod redirect;
pub mod settle;

pub use client::{fetch, Client, ClientBuilder};
