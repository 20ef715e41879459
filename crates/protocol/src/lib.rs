//! # fab-protocol
//!
//! Shared data model for the fabflow compilation pipeline.
//!
//! This crate defines the vocabulary that every other crate in the workspace
//! speaks: the pipeline [`Stage`](stage_models::Stage) identifiers, per-call
//! [`StageOptions`](stage_models::StageOptions), the ordered
//! [`FlowState`](flow_models::FlowState) progress marker, and the
//! status/utilization types reported to external task collaborators.
//!
//! ## Modules
//!
//! - [`stage_models`]: Stage identifiers and per-call options
//! - [`flow_models`]: Flow progress, stage status, and utilization samples

pub mod flow_models;
pub mod stage_models;
