mod issue;
mod reference;
mod time_tracking;

pub use issue::{Field, FieldValue, Issue, CUSTOM_FIELD_PREFIX, TIME_TRACKING};
pub use reference::{RefKey, Reference};
pub use time_tracking::{is_valid_duration, EstimateKind, TimeTracking};
