use anyhow::Result;
use std::process;

use platelog_core::engine::MealLogEngine;
use platelog_core::error::MealLogError;
use platelog_core::models::QuickAddForm;

use super::helpers::{json_error, whole};

pub(crate) async fn cmd_add(
    engine: &MealLogEngine,
    mut form: QuickAddForm,
    json: bool,
) -> Result<()> {
    match engine.quick_add(&mut form).await {
        Ok(entry) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                let name = &entry.name;
                let cal = whole(entry.calories);
                let p = whole(entry.protein_g);
                let c = whole(entry.carbs_g);
                let f = whole(entry.fat_g);
                let id = &entry.id;
                println!("Added {name} — {cal} kcal | P:{p}g C:{c}g F:{f}g (id {id})");
            }
            Ok(())
        }
        Err(MealLogError::Validation(err)) => {
            if json {
                println!("{}", json_error(&err.to_string()));
            } else {
                eprintln!("{err}");
            }
            process::exit(2);
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn cmd_delete(engine: &MealLogEngine, id: &str, json: bool) -> Result<()> {
    engine.delete_meal(id).await?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted entry {id}");
    }
    Ok(())
}
