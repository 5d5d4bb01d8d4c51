//! Student feature schema
//!
//! **CRITICAL: this file controls the model input layout.**
//!
//! The regression model was trained on a 41-column matrix in the exact
//! order of [`FEATURE_LAYOUT`]. Nothing in the artifact format (ONNX in
//! particular) tells us when a request field lands in the wrong column:
//! a reordering here silently produces wrong grades.
//!
//! ## Rules (NEVER break these):
//! 1. [`FEATURE_LAYOUT`] and [`StudentFeatures::to_vector`] change together
//! 2. Any change is reviewed against the model artifact being deployed
//! 3. A retrained model with a different column order needs a new layout
//!    here, not a shuffled request

use crc32fast::Hasher;
use serde::Deserialize;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Total number of model inputs
pub const FEATURE_COUNT: usize = 41;

/// Leading columns holding original/scaled numeric attributes
pub const NUMERIC_FEATURE_COUNT: usize = 27;

/// Request field names in the order the model consumes them.
/// This is the SINGLE SOURCE OF TRUTH for the feature layout.
pub const FEATURE_LAYOUT: [&str; FEATURE_COUNT] = [
    // === Original / scaled numeric (0-26) ===
    "gender",                   // 0
    "age",                      // 1
    "home_location",            // 2
    "family_size",              // 3
    "parent_status",            // 4
    "mother_education",         // 5
    "father_education",         // 6
    "travel_time",              // 7
    "study_time",               // 8
    "past_failures",            // 9
    "schoolsup",                // 10
    "famsup",                   // 11
    "paid",                     // 12
    "activities",               // 13
    "nursery",                  // 14
    "higher",                   // 15
    "internet",                 // 16
    "romantic",                 // 17
    "family_relationship",      // 18
    "free_time",                // 19
    "social_outing",            // 20
    "weekday_alcohol",          // 21
    "weekend_alcohol",          // 22
    "health_status",            // 23
    "absences",                 // 24
    "grade_period1",            // 25
    "grade_period2",            // 26

    // === One-hot indicators (27-40) ===
    "school_name_MS",           // 27
    "mother_job_health",        // 28
    "mother_job_other",         // 29
    "mother_job_services",      // 30
    "mother_job_teacher",       // 31
    "father_job_health",        // 32
    "father_job_other",         // 33
    "father_job_services",      // 34
    "father_job_teacher",       // 35
    "school_reason_home",       // 36
    "school_reason_other",      // 37
    "school_reason_reputation", // 38
    "primary_guardian_mother",  // 39
    "primary_guardian_other",   // 40
];

/// Model input vector. Kept at full request precision; engines that need
/// narrower floats convert internally.
pub type FeatureVector = [f64; FEATURE_COUNT];

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over the layout names in order. Reported by `/model` so operators
/// can compare a running server against the layout a model was trained on.
pub fn layout_hash() -> u32 {
    compute_layout_hash(&FEATURE_LAYOUT)
}

fn compute_layout_hash(names: &[&str]) -> u32 {
    let mut hasher = Hasher::new();
    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }
    hasher.finalize()
}

// ============================================================================
// REQUEST SCHEMA
// ============================================================================

/// `POST /predict` body. Every field is required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StudentFeatures {
    // --- Original / scaled numeric ---
    #[serde(deserialize_with = "coerce::number")]
    pub gender: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub age: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub home_location: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub family_size: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub parent_status: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub mother_education: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub father_education: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub travel_time: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub study_time: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub past_failures: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub schoolsup: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub famsup: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub paid: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub activities: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub nursery: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub higher: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub internet: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub romantic: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub family_relationship: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub free_time: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub social_outing: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub weekday_alcohol: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub weekend_alcohol: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub health_status: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub absences: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub grade_period1: f64,
    #[serde(deserialize_with = "coerce::number")]
    pub grade_period2: f64,

    // --- One-hot indicators ---
    #[serde(rename = "school_name_MS", deserialize_with = "coerce::indicator")]
    pub school_name_ms: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub mother_job_health: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub mother_job_other: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub mother_job_services: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub mother_job_teacher: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub father_job_health: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub father_job_other: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub father_job_services: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub father_job_teacher: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub school_reason_home: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub school_reason_other: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub school_reason_reputation: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub primary_guardian_mother: i64,
    #[serde(deserialize_with = "coerce::indicator")]
    pub primary_guardian_other: i64,
}

impl StudentFeatures {
    /// Assemble the model input in [`FEATURE_LAYOUT`] order.
    ///
    /// Position `i` of the result MUST be the field named `FEATURE_LAYOUT[i]`.
    pub fn to_vector(&self) -> FeatureVector {
        [
            self.gender,
            self.age,
            self.home_location,
            self.family_size,
            self.parent_status,
            self.mother_education,
            self.father_education,
            self.travel_time,
            self.study_time,
            self.past_failures,
            self.schoolsup,
            self.famsup,
            self.paid,
            self.activities,
            self.nursery,
            self.higher,
            self.internet,
            self.romantic,
            self.family_relationship,
            self.free_time,
            self.social_outing,
            self.weekday_alcohol,
            self.weekend_alcohol,
            self.health_status,
            self.absences,
            self.grade_period1,
            self.grade_period2,
            self.school_name_ms as f64,
            self.mother_job_health as f64,
            self.mother_job_other as f64,
            self.mother_job_services as f64,
            self.mother_job_teacher as f64,
            self.father_job_health as f64,
            self.father_job_other as f64,
            self.father_job_services as f64,
            self.father_job_teacher as f64,
            self.school_reason_home as f64,
            self.school_reason_other as f64,
            self.school_reason_reputation as f64,
            self.primary_guardian_mother as f64,
            self.primary_guardian_other as f64,
        ]
    }
}

// ============================================================================
// TYPE COERCION
// ============================================================================

/// Lenient scalar parsing: numbers or numeric strings, nothing else.
mod coerce {
    use serde::de::{self, Deserializer, Unexpected, Visitor};
    use std::fmt;

    struct NumberVisitor;

    impl<'de> Visitor<'de> for NumberVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number or a numeric string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
        }
    }

    struct IndicatorVisitor;

    impl<'de> Visitor<'de> for IndicatorVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an integer or an integer string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            // 1.0 is an integer, 0.5 is not
            if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                Ok(v as i64)
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            let trimmed = v.trim();
            if let Ok(int) = trimmed.parse::<i64>() {
                return Ok(int);
            }
            match trimmed.parse::<f64>() {
                Ok(float) => self.visit_f64(float),
                Err(_) => Err(E::invalid_value(Unexpected::Str(v), &self)),
            }
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(NumberVisitor)
    }

    pub fn indicator<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        deserializer.deserialize_any(IndicatorVisitor)
    }
}

/// Well-formed request body: numeric columns set to `numeric`, indicators to 0.
#[cfg(test)]
pub(crate) fn sample_body(numeric: f64) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    for (i, name) in FEATURE_LAYOUT.iter().enumerate() {
        let value = if i < NUMERIC_FEATURE_COUNT {
            serde_json::json!(numeric)
        } else {
            serde_json::json!(0)
        };
        body.insert(name.to_string(), value);
    }
    serde_json::Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn parse(body: serde_json::Value) -> Result<StudentFeatures, serde_json::Error> {
        serde_json::from_value(body)
    }

    #[test]
    fn test_layout_shape() {
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
        assert_eq!(FEATURE_COUNT - NUMERIC_FEATURE_COUNT, 14);
        let unique: HashSet<_> = FEATURE_LAYOUT.iter().collect();
        assert_eq!(unique.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_vector_follows_layout() {
        // Field at layout position i carries value i; the vector must read 0..41
        let mut body = serde_json::Map::new();
        for (i, name) in FEATURE_LAYOUT.iter().enumerate() {
            body.insert(name.to_string(), json!(i));
        }
        let features = parse(serde_json::Value::Object(body)).unwrap();

        let vector = features.to_vector();
        for (i, value) in vector.iter().enumerate() {
            assert_eq!(*value, i as f64, "column {} ({})", i, FEATURE_LAYOUT[i]);
        }
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut body = sample_body(5.0);
        body.as_object_mut().unwrap().remove("grade_period2");
        let err = parse(body).unwrap_err();
        assert!(err.to_string().contains("grade_period2"));
    }

    #[test]
    fn test_numeric_strings_coerced() {
        let mut body = sample_body(5.0);
        body["age"] = json!(" 17 ");
        body["absences"] = json!("4.5");
        body["father_job_other"] = json!("1");
        let features = parse(body).unwrap();
        assert_eq!(features.age, 17.0);
        assert_eq!(features.absences, 4.5);
        assert_eq!(features.father_job_other, 1);
    }

    #[test]
    fn test_mistyped_values_rejected() {
        for (field, value) in [
            ("age", json!("seventeen")),
            ("age", json!(null)),
            ("study_time", json!([2])),
            ("health_status", json!("NaN")),
            ("school_name_MS", json!(0.5)),
            ("primary_guardian_other", json!("yes")),
        ] {
            let mut body = sample_body(5.0);
            body[field] = value.clone();
            assert!(parse(body).is_err(), "{} = {} should be rejected", field, value);
        }
    }

    #[test]
    fn test_integral_float_indicator_accepted() {
        let mut body = sample_body(5.0);
        body["mother_job_teacher"] = json!(1.0);
        assert_eq!(parse(body).unwrap().mother_job_teacher, 1);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let mut body = sample_body(5.0);
        body["student_name"] = json!("anonymous");
        assert!(parse(body).is_ok());
    }

    #[test]
    fn test_layout_hash_tracks_order() {
        assert_eq!(layout_hash(), compute_layout_hash(&FEATURE_LAYOUT));

        let mut swapped = FEATURE_LAYOUT;
        swapped.swap(25, 26);
        assert_ne!(layout_hash(), compute_layout_hash(&swapped));
    }
}
