//! Required traffic-violation schema and the typed view behind it.

use chrono::NaiveDate;

use crate::error::{DashboardError, Result};
use crate::types::{ColumnKind, Dataset, Value};

/// A required column and the kind its values are coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn field(name: &'static str, kind: ColumnKind) -> FieldSpec {
    FieldSpec { name, kind }
}

pub const REQUIRED_SCHEMA: &[FieldSpec] = &[
    field("Violation_ID", ColumnKind::Text),
    field("Violation_Type", ColumnKind::Text),
    field("Fine_Amount", ColumnKind::Integer),
    field("Location", ColumnKind::Text),
    field("Date", ColumnKind::Date),
    field("Time", ColumnKind::Text),
    field("Vehicle_Type", ColumnKind::Text),
    field("Vehicle_Color", ColumnKind::Text),
    field("Vehicle_Model_Year", ColumnKind::Integer),
    field("Registration_State", ColumnKind::Text),
    field("Driver_Age", ColumnKind::Integer),
    field("Driver_Gender", ColumnKind::Text),
    field("License_Type", ColumnKind::Text),
    field("Penalty_Points", ColumnKind::Integer),
    field("Weather_Condition", ColumnKind::Text),
    field("Road_Condition", ColumnKind::Text),
    field("Officer_ID", ColumnKind::Text),
    field("Issuing_Agency", ColumnKind::Text),
    field("License_Validity", ColumnKind::Text),
    field("Number_of_Passengers", ColumnKind::Integer),
    field("Helmet_Worn", ColumnKind::Text),
    field("Seatbelt_Worn", ColumnKind::Text),
    field("Traffic_Light_Status", ColumnKind::Text),
    field("Speed_Limit", ColumnKind::Integer),
    field("Recorded_Speed", ColumnKind::Integer),
    field("Alcohol_Level", ColumnKind::Float),
    field("Breathalyzer_Result", ColumnKind::Text),
    field("Towed", ColumnKind::Text),
    field("Fine_Paid", ColumnKind::Text),
    field("Payment_Method", ColumnKind::Text),
    field("Court_Appearance_Required", ColumnKind::Text),
    field("Previous_Violations", ColumnKind::Integer),
    field("Comments", ColumnKind::Text),
];

/// Outcome of comparing a dataset's columns with a required set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaCheck {
    pub expected: Vec<String>,
    pub actual: Vec<String>,
    pub missing: Vec<String>,
}

impl SchemaCheck {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Extra columns are fine; missing ones are listed in `required` order.
pub fn check_columns(dataset: &Dataset, required: &[FieldSpec]) -> SchemaCheck {
    let actual = dataset.column_names();
    let missing = required
        .iter()
        .filter(|f| !actual.iter().any(|a| a == f.name))
        .map(|f| f.name.to_string())
        .collect();
    SchemaCheck {
        expected: required.iter().map(|f| f.name.to_string()).collect(),
        actual,
        missing,
    }
}

/// A dataset that passed [`validate`]. Only obtainable through it.
#[derive(Debug, Clone)]
pub struct ValidatedDataset {
    dataset: Dataset,
}

/// Schema mismatch is reported before emptiness, so a headerless-but-wrong
/// file is diagnosed by its columns.
pub fn validate(dataset: Dataset, required: &[FieldSpec]) -> Result<ValidatedDataset> {
    let check = check_columns(&dataset, required);
    if !check.is_valid() {
        tracing::warn!(missing = ?check.missing, "dataset failed schema validation");
        return Err(DashboardError::SchemaMismatch {
            missing: check.missing,
            actual: check.actual,
        });
    }
    if dataset.is_empty() {
        tracing::warn!("dataset has no rows");
        return Err(DashboardError::EmptyDataset);
    }
    Ok(ValidatedDataset { dataset })
}

impl ValidatedDataset {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    /// Row-wise typed view. Unparsable cells become `None`.
    pub fn records(&self) -> Vec<ViolationRecord> {
        let ds = &self.dataset;
        // validate() guarantees every required column exists.
        let col = |name: &str| ds.column(name).map(|c| c.values.as_slice()).unwrap_or(&[]);
        let text = |vals: &[Value], i: usize| vals.get(i).and_then(|v| match v {
            Value::Null => None,
            other => Some(other.to_string()),
        });
        let float = |vals: &[Value], i: usize| vals.get(i).and_then(Value::as_f64);
        let int = |vals: &[Value], i: usize| vals.get(i).and_then(Value::as_i64);

        let (id, vtype, fine, location, date) = (
            col("Violation_ID"),
            col("Violation_Type"),
            col("Fine_Amount"),
            col("Location"),
            col("Date"),
        );
        let (vehicle, state, age, gender) = (
            col("Vehicle_Type"),
            col("Registration_State"),
            col("Driver_Age"),
            col("Driver_Gender"),
        );
        let (weather, limit, speed, alcohol) = (
            col("Weather_Condition"),
            col("Speed_Limit"),
            col("Recorded_Speed"),
            col("Alcohol_Level"),
        );
        let (paid, court) = (col("Fine_Paid"), col("Court_Appearance_Required"));

        (0..ds.height())
            .map(|i| ViolationRecord {
                violation_id: text(id, i),
                violation_type: text(vtype, i),
                fine_amount: float(fine, i),
                location: text(location, i),
                date: date.get(i).and_then(Value::as_date),
                vehicle_type: text(vehicle, i),
                registration_state: text(state, i),
                driver_age: int(age, i),
                driver_gender: text(gender, i),
                weather_condition: text(weather, i),
                speed_limit: float(limit, i),
                recorded_speed: float(speed, i),
                alcohol_level: float(alcohol, i),
                fine_paid: text(paid, i),
                court_appearance_required: text(court, i),
            })
            .collect()
    }
}

/// The subset of a violation row the summaries read.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationRecord {
    pub violation_id: Option<String>,
    pub violation_type: Option<String>,
    pub fine_amount: Option<f64>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub vehicle_type: Option<String>,
    pub registration_state: Option<String>,
    pub driver_age: Option<i64>,
    pub driver_gender: Option<String>,
    pub weather_condition: Option<String>,
    pub speed_limit: Option<f64>,
    pub recorded_speed: Option<f64>,
    pub alcohol_level: Option<f64>,
    pub fine_paid: Option<String>,
    pub court_appearance_required: Option<String>,
}

impl ViolationRecord {
    /// `Fine_Paid` read as a YES/NO flag, case and padding ignored.
    pub fn is_fine_paid(&self) -> Option<bool> {
        match self.fine_paid.as_deref().map(|s| s.trim().to_ascii_uppercase()) {
            Some(s) if s == "YES" => Some(true),
            Some(s) if s == "NO" => Some(false),
            _ => None,
        }
    }

    pub fn speed_exceeded(&self) -> Option<f64> {
        Some(self.recorded_speed? - self.speed_limit?)
    }
}
