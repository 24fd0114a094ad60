//! Dogwatch binaries
//!
//! - `dogwatch-events`: send a start and an exit event
//! - `dogwatch-reporter`: report this process's runtime stats until Ctrl+C or a trip
//! - `dogwatch-listen`: print every datagram a local agent would receive

pub mod common;
