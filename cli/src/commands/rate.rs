use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitlog_core::service::FitnessServices;

pub(crate) async fn cmd_rate_set(
    services: &FitnessServices,
    activity: &str,
    kcal_per_minute: i32,
    json: bool,
) -> Result<()> {
    let rate = services.exercise.set_rate(activity, kcal_per_minute).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rate)?);
    } else {
        let activity = &rate.activity_type;
        let kcal = rate.kcal_per_minute;
        println!("{activity}: {kcal} kcal/min");
    }
    Ok(())
}

pub(crate) async fn cmd_rate_list(services: &FitnessServices, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RateRow {
        #[tabled(rename = "Activity")]
        activity: String,
        #[tabled(rename = "kcal/min")]
        kcal_per_minute: i32,
    }

    let mut rates = services.exercise.rates().await?;
    rates.sort_by(|a, b| a.activity_type.cmp(&b.activity_type));

    if json {
        println!("{}", serde_json::to_string_pretty(&rates)?);
        return Ok(());
    }

    if rates.is_empty() {
        println!("No activity rates defined");
        return Ok(());
    }

    let rows: Vec<RateRow> = rates
        .into_iter()
        .map(|r| RateRow {
            activity: r.activity_type,
            kcal_per_minute: r.kcal_per_minute,
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
