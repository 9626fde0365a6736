use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// AI model that produced a diagnostic result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticModel {
    Respiratory,
    Tuberculosis,
    Osteoporosis,
    Breast,
}

impl DiagnosticModel {
    pub const VALID_MODELS: &'static str = "respiratory, tuberculosis, osteoporosis, breast";

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticModel::Respiratory => "respiratory",
            DiagnosticModel::Tuberculosis => "tuberculosis",
            DiagnosticModel::Osteoporosis => "osteoporosis",
            DiagnosticModel::Breast => "breast",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "respiratory" => Some(DiagnosticModel::Respiratory),
            "tuberculosis" => Some(DiagnosticModel::Tuberculosis),
            "osteoporosis" => Some(DiagnosticModel::Osteoporosis),
            "breast" => Some(DiagnosticModel::Breast),
            _ => None,
        }
    }
}

/// Aggregation window for statistics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Day,
    Week,
    Month,
    Year,
}

impl StatsPeriod {
    pub const VALID_PERIODS: &'static str = "day, week, month, year";

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "day" => Some(StatsPeriod::Day),
            "week" => Some(StatsPeriod::Week),
            "month" => Some(StatsPeriod::Month),
            "year" => Some(StatsPeriod::Year),
            _ => None,
        }
    }

    /// Postgres interval literal for the window
    pub fn as_interval(&self) -> &'static str {
        match self {
            StatsPeriod::Day => "1 day",
            StatsPeriod::Week => "1 week",
            StatsPeriod::Month => "1 month",
            StatsPeriod::Year => "1 year",
        }
    }
}

/// One diagnostic event recorded by a professional against a patient image.
///
/// `admin_id` is a denormalized copy of the professional's administrator,
/// fixed at creation. `bounding_boxes` is populated only for the breast model.
#[derive(Debug, Clone, Serialize)]
pub struct Attendance {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub health_unit_id: Uuid,
    pub admin_id: Uuid,
    pub model_used: DiagnosticModel,
    pub model_result: String,
    pub expected_result: Option<String>,
    pub correct_diagnosis: Option<bool>,
    pub image_base64: String,
    pub observations: Option<String>,
    pub attendance_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_boxes: Option<Vec<BoundingBox>>,
}

/// Rectangular image annotation, valid only for the breast model.
/// Lifecycle is tied to its attendance: fully replaced on update, deleted
/// with the parent.
#[derive(Debug, Clone, Serialize)]
pub struct BoundingBox {
    pub id: Uuid,
    pub attendance_id: Uuid,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
    pub observations: Option<String>,
}

/// Box payload on create/update. Geometry is required, but checked by the
/// use-case so a missing field answers with the API's own 400 envelope
/// instead of a deserialization rejection. Confidence defaults to 0.0.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundingBoxInput {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    #[serde(default)]
    pub confidence: f64,
    pub observations: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAttendance {
    pub health_unit_id: Uuid,
    pub model_used: String,
    pub model_result: String,
    pub expected_result: Option<String>,
    pub correct_diagnosis: Option<bool>,
    pub image_base64: String,
    pub observations: Option<String>,
    pub bounding_boxes: Option<Vec<BoundingBoxInput>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateAttendance {
    pub model_used: Option<String>,
    pub model_result: Option<String>,
    pub expected_result: Option<String>,
    pub correct_diagnosis: Option<bool>,
    pub observations: Option<String>,
    pub bounding_boxes: Option<Vec<BoundingBoxInput>>,
}

/// Per-model accuracy over records that carry an expected result.
#[derive(Debug, Clone, Serialize)]
pub struct ModelAccuracy {
    pub correct: i64,
    pub total: i64,
    pub accuracy_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub period: StatsPeriod,
    pub model_usage: HashMap<String, i64>,
    pub model_accuracy: HashMap<String, ModelAccuracy>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_parse_covers_the_closed_set() {
        assert_eq!(DiagnosticModel::parse("breast"), Some(DiagnosticModel::Breast));
        assert_eq!(
            DiagnosticModel::parse("respiratory"),
            Some(DiagnosticModel::Respiratory)
        );
        assert_eq!(DiagnosticModel::parse("xray"), None);
        assert_eq!(DiagnosticModel::parse("Breast"), None);
        assert_eq!(DiagnosticModel::parse(""), None);
    }

    #[test]
    fn period_parse_and_interval() {
        assert_eq!(StatsPeriod::parse("month"), Some(StatsPeriod::Month));
        assert_eq!(StatsPeriod::parse("quarter"), None);
        assert_eq!(StatsPeriod::Week.as_interval(), "1 week");
    }
}
