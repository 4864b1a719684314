//! Derived nutrition figures. Everything here is recomputed from the full entry list.

use crate::models::{
    CalorieProgress, DailyTotals, Macro, MacroProgress, MealEntry, NutritionTargets,
};

#[must_use]
pub fn daily_totals(entries: &[MealEntry]) -> DailyTotals {
    entries
        .iter()
        .fold(DailyTotals::default(), |mut acc, e| {
            acc.calories += e.calories;
            acc.protein_g += e.protein_g;
            acc.carbs_g += e.carbs_g;
            acc.fat_g += e.fat_g;
            acc
        })
}

#[must_use]
pub fn remaining_budget(totals: &DailyTotals, target_calories: f64) -> f64 {
    (target_calories - totals.calories).max(0.0)
}

/// Whole-number percentage of `target` reached by `value`, capped at 100.
/// A zero target always yields 0.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn percent_of_target(value: f64, target: f64) -> u32 {
    if target <= 0.0 || !value.is_finite() {
        return 0;
    }
    (value / target * 100.0).round().clamp(0.0, 100.0) as u32
}

#[must_use]
pub fn calorie_progress(totals: &DailyTotals, targets: &NutritionTargets) -> CalorieProgress {
    CalorieProgress {
        consumed: totals.calories,
        target: targets.calories,
        remaining: remaining_budget(totals, targets.calories),
        percent: percent_of_target(totals.calories, targets.calories),
    }
}

#[must_use]
pub fn macro_progress(totals: &DailyTotals, targets: &NutritionTargets) -> Vec<MacroProgress> {
    Macro::ALL
        .iter()
        .map(|&nutrient| {
            let (consumed, target) = match nutrient {
                Macro::Protein => (totals.protein_g, targets.protein_g),
                Macro::Carbs => (totals.carbs_g, targets.carbs_g),
                Macro::Fat => (totals.fat_g, targets.fat_g),
            };
            MacroProgress {
                nutrient,
                consumed,
                target,
                percent: percent_of_target(consumed, target),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: &str, calories: f64, protein: f64, carbs: f64, fat: f64) -> MealEntry {
        MealEntry {
            id: id.to_string(),
            name: format!("meal {id}"),
            calories,
            protein_g: protein,
            carbs_g: carbs,
            fat_g: fat,
            logged_at: Utc::now(),
        }
    }

    #[test]
    fn test_totals_empty() {
        assert_eq!(daily_totals(&[]), DailyTotals::default());
    }

    #[test]
    fn test_totals_field_wise_sum() {
        let entries = vec![
            entry("a", 488.0, 32.0, 34.0, 22.0),
            entry("b", 250.0, 10.0, 40.0, 5.5),
            entry("c", 0.0, 0.0, 0.0, 0.0),
        ];
        let totals = daily_totals(&entries);
        assert!((totals.calories - 738.0).abs() < 1e-9);
        assert!((totals.protein_g - 42.0).abs() < 1e-9);
        assert!((totals.carbs_g - 74.0).abs() < 1e-9);
        assert!((totals.fat_g - 27.5).abs() < 1e-9);
    }

    #[test]
    fn test_remaining_budget() {
        let totals = DailyTotals {
            calories: 488.0,
            ..DailyTotals::default()
        };
        assert!((remaining_budget(&totals, 1700.0) - 1212.0).abs() < f64::EPSILON);

        let over = DailyTotals {
            calories: 2100.0,
            ..DailyTotals::default()
        };
        assert_eq!(remaining_budget(&over, 1700.0).to_bits(), 0.0_f64.to_bits());
    }

    #[test]
    fn test_percent_of_target_rounds() {
        assert_eq!(percent_of_target(488.0, 1700.0), 29);
        assert_eq!(percent_of_target(850.0, 1700.0), 50);
        assert_eq!(percent_of_target(0.0, 1700.0), 0);
    }

    #[test]
    fn test_percent_of_target_clamped() {
        assert_eq!(percent_of_target(1700.0, 1700.0), 100);
        assert_eq!(percent_of_target(5000.0, 1700.0), 100);
        for v in [0.0, 1.0, 55.0, 999.0, 1e9] {
            assert!(percent_of_target(v, 55.0) <= 100);
        }
    }

    #[test]
    fn test_percent_of_zero_target() {
        for v in [0.0, 1.0, 100.0, 1e12] {
            assert_eq!(percent_of_target(v, 0.0), 0);
        }
    }

    #[test]
    fn test_calorie_progress_example_day() {
        let totals = daily_totals(&[entry("a", 488.0, 32.0, 34.0, 22.0)]);
        let progress = calorie_progress(&totals, &NutritionTargets::default());
        assert!((progress.consumed - 488.0).abs() < f64::EPSILON);
        assert!((progress.remaining - 1212.0).abs() < f64::EPSILON);
        assert_eq!(progress.percent, 29);
    }

    #[test]
    fn test_macro_progress_order_and_values() {
        let totals = daily_totals(&[entry("a", 488.0, 32.0, 34.0, 22.0)]);
        let macros = macro_progress(&totals, &NutritionTargets::default());
        assert_eq!(macros.len(), 3);
        assert_eq!(macros[0].nutrient, Macro::Protein);
        // 32 / 170 = 18.8%
        assert_eq!(macros[0].percent, 19);
        assert_eq!(macros[1].nutrient, Macro::Carbs);
        // 34 / 130 = 26.2%
        assert_eq!(macros[1].percent, 26);
        assert_eq!(macros[2].nutrient, Macro::Fat);
        // 22 / 55 = 40%
        assert_eq!(macros[2].percent, 40);
        assert!((macros[2].target - 55.0).abs() < f64::EPSILON);
    }
}
