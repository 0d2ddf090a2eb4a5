// Job runner behind the `ptstats` binary.

pub mod job;
pub mod output;
