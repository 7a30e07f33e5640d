// Stormstem: clustering storm event types by damage profile
//
// This is the library root. Each module corresponds to one stage of the
// pipeline, from raw CSV records to flat stem clusters.

pub mod cluster;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod records;
pub mod report;
pub mod text;
