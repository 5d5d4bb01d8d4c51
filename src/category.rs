//! Grade category mapping
//!
//! Grades live on the 0-20 scale. Bands are closed on the lower bound and
//! open on the upper bound, except the last one.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_GRADE: f64 = 0.0;
pub const MAX_GRADE: f64 = 20.0;

const PASS_THRESHOLD: f64 = 10.0;
const GOOD_THRESHOLD: f64 = 14.0;
const EXCELLENT_THRESHOLD: f64 = 17.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Fail,
    Pass,
    Good,
    Excellent,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fail => "Fail",
            Category::Pass => "Pass",
            Category::Good => "Good",
            Category::Excellent => "Excellent",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a raw model output into the valid grade range
pub fn clamp_score(score: f64) -> f64 {
    // `+ 0.0` turns -0.0 into 0.0
    score.clamp(MIN_GRADE, MAX_GRADE) + 0.0
}

/// Map a score to its category. Out-of-range input is clamped first.
pub fn categorize(score: f64) -> Category {
    let score = clamp_score(score);

    if score < PASS_THRESHOLD {
        Category::Fail
    } else if score < GOOD_THRESHOLD {
        Category::Pass
    } else if score < EXCELLENT_THRESHOLD {
        Category::Good
    } else {
        Category::Excellent
    }
}

/// Round to two decimals for the response body
pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}
