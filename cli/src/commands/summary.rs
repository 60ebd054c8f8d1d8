use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitlog_core::models::DailyDashboard;
use fitlog_core::service::FitnessServices;

use super::helpers::parse_date_label;

pub(crate) async fn cmd_summary(
    services: &FitnessServices,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let label = parse_date_label(date)?;
    let dashboard = services.dashboard(&label).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    print_dashboard(&dashboard);
    Ok(())
}

fn print_dashboard(dash: &DailyDashboard) {
    #[derive(Tabled)]
    struct MealRow {
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "kcal")]
        calories: String,
    }

    let date = &dash.date_label;
    println!("=== {date} ===\n");

    let rows: Vec<MealRow> = dash
        .meals
        .iter()
        .map(|m| MealRow {
            meal: m.meal_type.to_string(),
            calories: match m.recommended {
                Some(rec) => format!("0 (recommended {rec})"),
                None => m.calories.to_string(),
            },
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}\n");

    let goal = dash.goal;
    let eaten = dash.eaten;
    let burned = dash.burned;
    let eaten_pct = percent(dash.eaten_progress);
    let burned_pct = percent(dash.burned_progress);
    println!("  EATEN:  {eaten} / {goal} kcal ({eaten_pct}%)");
    println!("  BURNED: {burned} kcal ({burned_pct}% of goal)");
    let remaining = remaining_calories(dash);
    println!("  REMAINING: {remaining} kcal");
}

/// Goal minus eaten plus burned, widened so large totals cannot wrap.
fn remaining_calories(dash: &DailyDashboard) -> i64 {
    i64::from(dash.goal) - i64::from(dash.eaten) + i64::from(dash.burned)
}

#[allow(clippy::cast_sign_loss)]
fn percent(fraction: f64) -> u32 {
    (fraction * 100.0).round() as u32
}
