mod envelope;
mod finding;
pub mod priority;

pub use envelope::{CommandError, ResponseEnvelope, RunStats, SCHEMA_VERSION};
pub use finding::{Finding, abbrev_of, normalize_lines};
pub use priority::PriorityTier;
