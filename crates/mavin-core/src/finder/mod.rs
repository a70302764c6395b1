pub mod dates;
pub mod engine;
pub mod matcher;
pub mod report;
pub mod resolver;
pub mod scanner;

pub use dates::{DateSelector, ProbeSlot};
pub use engine::{CellResult, CellStatus, FindEngine, FindReport, FindRequest};
pub use matcher::{Completeness, IdMatcher, MatchCandidate};
