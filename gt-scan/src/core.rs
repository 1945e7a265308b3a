//! Core module for the aggregation stage
//!
//! Three pieces make up the stage: the classifier decides whether an
//! unaligned mate carries a tail signature, the measurer reports the
//! tail-run length under a bounded error tolerance, and the aggregator
//! drives both over a name-sorted paired-end stream while keeping the
//! per-transcript aggregates and diagnostic counters.

pub mod aggregate;
pub mod classify;
pub mod tail;
