//! # fab-core
//!
//! Pipeline coordination and execution engine for fabflow.
//!
//! This crate provides:
//! - The stage/state model and dispatch bookkeeping around each pipeline stage
//! - A supervised child-process runner with output tee and memory monitoring
//! - An asynchronous stage-executor model that keeps interactive hosts alive
//! - Cooperative cancellation shared by every layer
//! - Configuration loading from the `.fabflow/` directory
//!
//! ## Modules
//!
//! - [`cancel`]: Stop flag and sticky one-shot error state
//! - [`runner`]: External tool invocation and monitoring
//! - [`executor`]: Worker execution model and live-executor registry
//! - [`coordinator`]: Top-level compile dispatch and flow state machine
//! - [`stages`]: Per-stage logic boundary and built-in implementations
//! - [`config`]: Project and tool-profile configuration
//! - [`init`]: Project scaffolding from embedded templates

pub mod cancel;
pub mod config;
pub mod coordinator;
pub mod executor;
pub mod init;
pub mod runner;
pub mod stages;
