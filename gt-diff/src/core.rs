//! Core module for the testing stage
//!
//! Datasets wrap one replicate's snapshot and its fragment-size model,
//! DataGroups pool replicates per treatment, the Tester compares two
//! groups per transcript and genome-wide, and the ResultStore carries
//! the fixed-schema outcome table.

pub mod dataset;
pub mod group;
pub mod results;
pub mod tester;
