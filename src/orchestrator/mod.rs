//! Search orchestration: per-provider pipelines, ranking, fan-out.
//!
//! Each selected provider runs the same counting pipeline in isolation;
//! outcomes are merged into a per-provider keyed [`crate::types::RunReport`].

pub mod ranking;
pub mod run;
