//! Command execution for cascade-merge.
//!
//! The service has a single command, [`serve`], which wires the hosting
//! service client, the orchestrator and the worker pool behind the webhook
//! server and runs until the listener stops.
pub mod serve;
