//! I/O-free rules shared by the service layer: naming, materialized paths, metadata
//! enrichment, and result ranking.

pub mod enrich;
pub mod hierarchy;
pub mod metadata;
pub mod naming;
pub mod ranking;
