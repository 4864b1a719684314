use anyhow::Result;
use chrono::{DateTime, Local};
use std::fmt::Write;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use platelog_core::engine::{MealLogEngine, MealLogSnapshot};

use super::helpers::{format_day, format_time, json_error, truncate, whole};

pub(crate) async fn cmd_today(engine: &MealLogEngine, json: bool) -> Result<()> {
    if let Err(err) = engine.initialize().await {
        if json {
            println!("{}", json_error(&err.to_string()));
            process::exit(1);
        }
        return Err(anyhow::Error::new(err).context("Could not load today's meals"));
    }

    let snapshot = engine.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render_snapshot(&snapshot, Local::now()));
    }
    Ok(())
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Meal")]
    name: String,
    #[tabled(rename = "kcal")]
    calories: String,
    #[tabled(rename = "Protein")]
    protein: String,
    #[tabled(rename = "Carbs")]
    carbs: String,
    #[tabled(rename = "Fat")]
    fat: String,
}

#[derive(Tabled)]
struct MacroRow {
    #[tabled(rename = "Macro")]
    label: String,
    #[tabled(rename = "Eaten")]
    consumed: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "%")]
    percent: String,
}

pub(crate) fn render_snapshot(snapshot: &MealLogSnapshot, now: DateTime<Local>) -> String {
    let mut out = String::new();
    let day = format_day(now);
    let _ = writeln!(out, "=== {day} ===\n");

    if snapshot.entries.is_empty() {
        let _ = writeln!(out, "  No meals logged yet.\n");
    } else {
        let rows: Vec<EntryRow> = snapshot
            .entries
            .iter()
            .map(|e| EntryRow {
                id: e.id.clone(),
                time: format_time(e.logged_at),
                name: truncate(&e.name, 32),
                calories: whole(e.calories),
                protein: format!("{}g", whole(e.protein_g)),
                carbs: format!("{}g", whole(e.carbs_g)),
                fat: format!("{}g", whole(e.fat_g)),
            })
            .collect();
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
            .to_string();
        let _ = writeln!(out, "{table}\n");
    }

    let cal = &snapshot.calories;
    let eaten = whole(cal.consumed);
    let target = whole(cal.target);
    let remaining = whole(cal.remaining);
    let percent = cal.percent;
    let _ = writeln!(
        out,
        "  TODAY: {eaten} kcal | Target {target} | Remaining {remaining} | {percent}% of target\n"
    );

    let macro_rows: Vec<MacroRow> = snapshot
        .macros
        .iter()
        .map(|m| MacroRow {
            label: m.nutrient.label().to_string(),
            consumed: format!("{}g", whole(m.consumed)),
            target: format!("{}g", whole(m.target)),
            percent: format!("{}%", m.percent),
        })
        .collect();
    let table = Table::new(&macro_rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    let _ = writeln!(out, "{table}");

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use platelog_core::aggregate::{calorie_progress, daily_totals, macro_progress};
    use platelog_core::models::{MealEntry, NutritionTargets};

    fn snapshot_of(entries: Vec<MealEntry>) -> MealLogSnapshot {
        let targets = NutritionTargets::default();
        let totals = daily_totals(&entries);
        MealLogSnapshot {
            totals,
            calories: calorie_progress(&totals, &targets),
            macros: macro_progress(&totals, &targets),
            entries,
            loading: false,
            loaded: true,
            saving: false,
            last_error: None,
        }
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_render_empty_day() {
        let out = render_snapshot(&snapshot_of(vec![]), now());
        assert!(out.starts_with("=== Friday, 16 October ==="));
        assert!(out.contains("No meals logged yet."));
        assert!(out.contains("TODAY: 0 kcal | Target 1700 | Remaining 1700 | 0% of target"));
    }

    #[test]
    fn test_render_eggs_day() {
        let eggs = MealEntry {
            id: "7f1c".to_string(),
            name: "Eggs".to_string(),
            calories: 488.0,
            protein_g: 32.0,
            carbs_g: 34.0,
            fat_g: 22.0,
            logged_at: Utc::now(),
        };
        let out = render_snapshot(&snapshot_of(vec![eggs]), now());
        assert!(out.contains("Eggs"));
        assert!(out.contains("7f1c"));
        assert!(out.contains("TODAY: 488 kcal | Target 1700 | Remaining 1212 | 29% of target"));
        assert!(out.contains("Protein"));
        assert!(out.contains("40%"));
        assert!(!out.contains("No meals logged yet."));
    }

    #[test]
    fn test_render_keeps_full_store_id() {
        let id = "3f2b8c1e-9a4d-4e77-b0c5-6d1f2a7e9b10";
        let toast = MealEntry {
            id: id.to_string(),
            name: "Toast".to_string(),
            calories: 180.0,
            protein_g: 6.0,
            carbs_g: 30.0,
            fat_g: 3.0,
            logged_at: Utc::now(),
        };
        let out = render_snapshot(&snapshot_of(vec![toast]), now());
        assert!(out.contains(id));
    }
}
