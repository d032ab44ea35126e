//! Size-delta reporting for the compress and image-compress modes.
//!
//! Re-encoding pages as JPEG does not always shrink a document: a text-only
//! PDF rasterised at 1.5× can easily grow. The report therefore always names
//! the direction instead of printing an unsigned percentage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the output got smaller or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeDirection {
    Reduction,
    /// Also used when sizes are equal.
    Increase,
}

impl fmt::Display for SizeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeDirection::Reduction => f.write_str("reduction"),
            SizeDirection::Increase => f.write_str("increase"),
        }
    }
}

/// Input vs. output byte sizes of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeReport {
    pub original_bytes: u64,
    pub output_bytes: u64,
}

impl SizeReport {
    pub fn new(original_bytes: u64, output_bytes: u64) -> Self {
        Self {
            original_bytes,
            output_bytes,
        }
    }

    pub fn direction(&self) -> SizeDirection {
        if self.output_bytes < self.original_bytes {
            SizeDirection::Reduction
        } else {
            SizeDirection::Increase
        }
    }

    /// Absolute change as a percentage of the original size.
    ///
    /// An empty original reports 0.
    pub fn percent_change(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        let delta = self.original_bytes as f64 - self.output_bytes as f64;
        (delta / self.original_bytes as f64 * 100.0).abs()
    }

    /// Signed delta: negative when the output shrank.
    pub fn signed_percent(&self) -> f64 {
        match self.direction() {
            SizeDirection::Reduction => -self.percent_change(),
            SizeDirection::Increase => self.percent_change(),
        }
    }
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "New size: {} ({:.1}% {})",
            format_size(self.output_bytes),
            self.percent_change(),
            self.direction()
        )
    }
}

/// Human-readable byte size: `0 B`, `512 B`, `1.5 KB`, `2 MB`.
///
/// Two decimals at most, trailing zeros dropped.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_048_576), "1 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[test]
    fn format_size_caps_at_gigabytes() {
        assert_eq!(format_size(2048 * 1024 * 1024 * 1024), "2048 GB");
    }

    #[test]
    fn reduction_report() {
        let r = SizeReport::new(1000, 250);
        assert_eq!(r.direction(), SizeDirection::Reduction);
        assert!((r.percent_change() - 75.0).abs() < 1e-9);
        assert!(r.signed_percent() < 0.0);
        assert_eq!(r.to_string(), "New size: 250 B (75.0% reduction)");
    }

    #[test]
    fn increase_report() {
        let r = SizeReport::new(1000, 1500);
        assert_eq!(r.direction(), SizeDirection::Increase);
        assert!((r.percent_change() - 50.0).abs() < 1e-9);
        assert!(r.to_string().ends_with("(50.0% increase)"));
    }

    #[test]
    fn equal_sizes_are_reported_as_increase() {
        let r = SizeReport::new(800, 800);
        assert_eq!(r.direction(), SizeDirection::Increase);
        assert_eq!(r.percent_change(), 0.0);
    }

    #[test]
    fn empty_original_does_not_divide_by_zero() {
        let r = SizeReport::new(0, 10);
        assert_eq!(r.percent_change(), 0.0);
    }
}
