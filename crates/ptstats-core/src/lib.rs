// Library root: record schemas, typed records and the summation engines.
// Pure data transforms, no I/O.

pub mod record;
pub mod schema;
pub mod shots;
pub mod summation;

pub use record::{EntityIdentity, RawRow, RecordContext, RecordError, StatRecord};
pub use schema::{CategorySchema, StatCategory, UnknownCategory};
pub use shots::{sum_shot_totals, sum_shot_totals_named, ShotCounts, ShotRates, ShotStatRecord};
pub use summation::{sum_totals, sum_totals_named, GroupingMode, Summable, SummationError, Totals};
