use crate::domain::Facility;
use tracing::warn;

/// Parses a newline-delimited JSON body into facility records, one per
/// non-empty line. A line that fails to deserialize is logged and skipped;
/// the batch continues. Input line order is preserved for parsed records.
pub fn parse_facility_lines(body: &str) -> Vec<Facility> {
    let mut facilities = Vec::new();
    for (idx, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Facility>(line) {
            Ok(facility) => facilities.push(facility),
            Err(e) => {
                warn!("Skipping malformed facility record on line {}: {}", idx + 1, e);
            }
        }
    }
    facilities
}
