use anyhow::{Result, bail};
use chrono::Local;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitlog_core::controller::ExerciseController;
use fitlog_core::models::{ExerciseEntry, display_time};
use fitlog_core::service::FitnessServices;

use super::helpers::{not_found, truncate};

pub(crate) async fn cmd_exercise_list(services: &FitnessServices, json: bool) -> Result<()> {
    let ctrl = ExerciseController::new(services);
    ctrl.refresh().await?;
    let entries = ctrl.state().items;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No exercises logged");
        return Ok(());
    }

    print_exercise_table(&entries);
    let total = ctrl.total_burned();
    println!("\n  TOTAL BURNED: {total} kcal");
    Ok(())
}

pub(crate) async fn cmd_exercise_add(
    services: &FitnessServices,
    activity: &str,
    minutes: i32,
    time: Option<String>,
    json: bool,
) -> Result<()> {
    let ctrl = ExerciseController::new(services);
    let time = time.unwrap_or_else(|| display_time(Local::now().naive_local()));
    let entry = ctrl.add(activity, minutes, &time).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let ExerciseEntry {
            id,
            activity_type,
            duration_minutes,
            calories,
            ..
        } = &entry;
        println!("Logged [{id}] {activity_type} for {duration_minutes} min ({calories} kcal)");
    }
    Ok(())
}

pub(crate) async fn cmd_exercise_update(
    services: &FitnessServices,
    id: i64,
    activity: Option<String>,
    minutes: Option<i32>,
    time: Option<String>,
    json: bool,
) -> Result<()> {
    if activity.is_none() && minutes.is_none() && time.is_none() {
        bail!("Nothing to update. Provide at least one of --activity, --minutes, or --time");
    }

    let ctrl = ExerciseController::new(services);
    ctrl.refresh().await?;
    let Some(mut entry) = ctrl.state().items.into_iter().find(|e| e.id == id) else {
        not_found(&format!("Exercise {id} not found"), json);
    };

    if let Some(activity) = activity {
        entry.activity_type = activity;
    }
    if let Some(minutes) = minutes {
        entry.duration_minutes = minutes;
    }
    if let Some(time) = time {
        entry.display_time = time;
    }

    let Some(updated) = ctrl.update(&entry).await? else {
        not_found(&format!("Exercise {id} not found"), json);
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        let activity = &updated.activity_type;
        let minutes = updated.duration_minutes;
        let calories = updated.calories;
        println!("Updated exercise {id}: {activity} for {minutes} min ({calories} kcal)");
    }
    Ok(())
}

pub(crate) async fn cmd_exercise_delete(
    services: &FitnessServices,
    id: i64,
    json: bool,
) -> Result<()> {
    let ctrl = ExerciseController::new(services);
    if !ctrl.delete(id).await? {
        not_found(&format!("Exercise {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted exercise {id}");
    }
    Ok(())
}

fn print_exercise_table(entries: &[ExerciseEntry]) {
    #[derive(Tabled)]
    struct ExerciseRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Activity")]
        activity: String,
        #[tabled(rename = "Minutes")]
        minutes: i32,
        #[tabled(rename = "kcal")]
        calories: i32,
        #[tabled(rename = "When")]
        when: String,
    }

    let rows: Vec<ExerciseRow> = entries
        .iter()
        .map(|e| ExerciseRow {
            id: e.id,
            activity: truncate(&e.activity_type, 25),
            minutes: e.duration_minutes,
            calories: e.calories,
            when: e.display_time.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
