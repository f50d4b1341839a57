//! Severity scoring over classified rows.

use labreport_contracts::lab::{ClassifiedRow, TestStatus};

/// Points added per High row.
pub const HIGH_WEIGHT: u32 = 2;
/// Points added per Low row.
pub const LOW_WEIGHT: u32 = 1;

/// `2 * #High + 1 * #Low`. Empty input scores 0.
pub fn severity_score(rows: &[ClassifiedRow]) -> u32 {
    rows.iter()
        .map(|row| match row.status {
            TestStatus::High => HIGH_WEIGHT,
            TestStatus::Low => LOW_WEIGHT,
            TestStatus::Normal | TestStatus::Unknown => 0,
        })
        .sum()
}
