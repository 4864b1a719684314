use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Display name used when the store hands back a row with a blank name.
pub const UNTITLED_MEAL: &str = "Untitled meal";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealEntry {
    pub id: String,
    pub name: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub logged_at: DateTime<Utc>,
}

impl MealEntry {
    /// Coerce every numeric field to a finite, non-negative value and trim the name.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.calories = non_negative(self.calories);
        self.protein_g = non_negative(self.protein_g);
        self.carbs_g = non_negative(self.carbs_g);
        self.fat_g = non_negative(self.fat_g);
        let trimmed = self.name.trim();
        self.name = if trimmed.is_empty() {
            UNTITLED_MEAL.to_string()
        } else {
            trimmed.to_string()
        };
        self
    }
}

/// A validated meal ready to be sent to the store. The store assigns `id` and `logged_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMeal {
    pub name: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// Raw quick-add input exactly as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAddForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub calories: String,
    #[serde(default)]
    pub protein: String,
    #[serde(default)]
    pub carbs: String,
    #[serde(default)]
    pub fat: String,
}

impl QuickAddForm {
    #[must_use]
    pub fn has_any_nutrition(&self) -> bool {
        [&self.calories, &self.protein, &self.carbs, &self.fat]
            .iter()
            .any(|field| !field.trim().is_empty())
    }

    /// Check the form and build the create payload.
    ///
    /// The name must be non-blank and at least one nutrition field must be filled in.
    /// Nutrition values themselves never fail validation; see [`parse_lenient`].
    pub fn validate(&self) -> Result<NewMeal, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !self.has_any_nutrition() {
            return Err(ValidationError::NoNutrition);
        }
        Ok(NewMeal {
            name: name.to_string(),
            calories: parse_lenient(&self.calories),
            protein_g: parse_lenient(&self.protein),
            carbs_g: parse_lenient(&self.carbs),
            fat_g: parse_lenient(&self.fat),
        })
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Parse a nutrition field, falling back to 0 for blank, unparsable, non-finite or negative input.
#[must_use]
pub fn parse_lenient(raw: &str) -> f64 {
    raw.trim().parse::<f64>().map_or(0.0, non_negative)
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Fixed daily goals the dashboard measures against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionTargets {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl Default for NutritionTargets {
    fn default() -> Self {
        Self {
            calories: 1700.0,
            protein_g: 170.0,
            carbs_g: 130.0,
            fat_g: 55.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyTotals {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Macro {
    Protein,
    Carbs,
    Fat,
}

impl Macro {
    pub const ALL: [Macro; 3] = [Macro::Protein, Macro::Carbs, Macro::Fat];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Macro::Protein => "Protein",
            Macro::Carbs => "Carbs",
            Macro::Fat => "Fat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacroProgress {
    pub nutrient: Macro,
    pub consumed: f64,
    pub target: f64,
    pub percent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalorieProgress {
    pub consumed: f64,
    pub target: f64,
    pub remaining: f64,
    pub percent: u32,
}
