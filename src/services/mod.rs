pub mod billing;
pub mod enrichment;
pub mod occupancy;
