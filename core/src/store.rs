use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GatewayError;
use crate::models::{MealEntry, NewMeal};

pub const DEFAULT_TABLE: &str = "meal_entries";
pub const SELECT_COLUMNS: &str = "id,name,calories,protein,carbs,fat,created_at";

/// A `meal_entries` row as returned by the hosted row store.
#[derive(Debug, Deserialize)]
pub struct StoreRow {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct StoreInsert<'a> {
    pub name: &'a str,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl<'a> From<&'a NewMeal> for StoreInsert<'a> {
    fn from(meal: &'a NewMeal) -> Self {
        Self {
            name: &meal.name,
            calories: meal.calories,
            protein: meal.protein_g,
            carbs: meal.carbs_g,
            fat: meal.fat_g,
        }
    }
}

/// Ids may be uuid strings or bigint keys depending on the table definition.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// `timestamptz` columns carry an offset; plain `timestamp` columns do not and
/// are read as UTC.
fn parse_created_at(raw: &str) -> Result<DateTime<Utc>, GatewayError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| GatewayError::Decode(format!("invalid created_at '{raw}': {e}")))
}

pub fn row_to_meal(row: StoreRow) -> Result<MealEntry, GatewayError> {
    let logged_at = parse_created_at(&row.created_at)?;

    Ok(MealEntry {
        id: row.id,
        name: row.name.unwrap_or_default(),
        calories: row.calories.unwrap_or(0.0),
        protein_g: row.protein.unwrap_or(0.0),
        carbs_g: row.carbs.unwrap_or(0.0),
        fat_g: row.fat.unwrap_or(0.0),
        logged_at,
    }
    .sanitized())
}
