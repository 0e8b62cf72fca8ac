// Pipeline stages: record processing for the expiry-filter transform and
// query orchestration for the aggregation job.

pub mod aggregation;
pub mod processing;
