use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitlog_core::catalog::search_catalog;
use fitlog_core::models::FoodItem;

use super::helpers::{json_error, truncate};

pub(crate) fn cmd_food_search(query: Option<&str>, json: bool) -> Result<()> {
    let query = query.unwrap_or_default();
    let foods = search_catalog(query);

    if json {
        if foods.is_empty() {
            println!("{}", json_error(&format!("No foods match '{query}'")));
            process::exit(2);
        }
        println!("{}", serde_json::to_string_pretty(&foods)?);
        return Ok(());
    }

    if foods.is_empty() {
        eprintln!("No foods match '{query}'");
        process::exit(2);
    }

    print_food_table(&foods);
    Ok(())
}

fn print_food_table(foods: &[FoodItem]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "kcal")]
        calories: i32,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .enumerate()
        .map(|(i, f)| FoodRow {
            idx: i + 1,
            name: truncate(&f.name, 35),
            calories: f.calories,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
