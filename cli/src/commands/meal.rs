use anyhow::Result;

use fitlog_core::controller::NutritionController;
use fitlog_core::models::{FoodEntry, FoodItem};
use fitlog_core::service::FitnessServices;

use super::helpers::{not_found, parse_date_label, parse_meal_type};

pub(crate) async fn cmd_meal_show(
    services: &FitnessServices,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let label = parse_date_label(date)?;
    let ctrl = NutritionController::new(services, label.as_str());
    ctrl.refresh().await?;
    let meals = ctrl.state().items;

    if json {
        println!("{}", serde_json::to_string_pretty(&meals)?);
        return Ok(());
    }

    if meals.is_empty() {
        not_found(&format!("No meals logged for {label}"), json);
    }

    println!("=== {label} ===\n");
    for meal in &meals {
        let meal_label = meal.meal_type.as_str().to_uppercase();
        let subtotal = meal.total_calories();
        println!("  {meal_label} ({subtotal} kcal)");
        for food in &meal.foods {
            let id = food.id;
            let name = &food.name;
            let cal = food.calories;
            println!("    [{id}] {name} — {cal} kcal");
        }
        println!();
    }
    let total = ctrl.total_calories();
    println!("  TOTAL: {total} kcal");
    Ok(())
}

pub(crate) async fn cmd_meal_add(
    services: &FitnessServices,
    meal: &str,
    name: &str,
    calories: i32,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let meal_type = parse_meal_type(meal)?;
    let label = parse_date_label(date)?;
    let ctrl = NutritionController::new(services, label.as_str());
    let food = ctrl
        .add_food(meal_type, &FoodItem::new(name, calories))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        let id = food.id;
        let name = &food.name;
        let cal = food.calories;
        println!("Logged [{id}] {name} for {meal_type} on {label} — {cal} kcal");
    }
    Ok(())
}

/// Replace a logged food through the controller's edit target.
pub(crate) async fn cmd_meal_edit(
    services: &FitnessServices,
    meal: &str,
    food_id: i64,
    name: &str,
    calories: i32,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let meal_type = parse_meal_type(meal)?;
    let label = parse_date_label(date)?;
    let ctrl = NutritionController::new(services, label.as_str());
    ctrl.refresh().await?;

    let logged = ctrl
        .meal(meal_type)
        .is_some_and(|m| m.foods.iter().any(|f| f.id == food_id));
    if !logged {
        not_found(
            &format!("Food {food_id} not found in {meal_type} on {label}"),
            json,
        );
    }

    ctrl.begin_edit(meal_type, food_id);
    let food = ctrl
        .select_food(meal_type, &FoodItem::new(name, calories))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        println!("{}", edit_message(food_id, &food));
    }
    Ok(())
}

/// The edited food can vanish before the update lands, in which case it is
/// logged again under a new id.
fn edit_message(requested_id: i64, food: &FoodEntry) -> String {
    let id = food.id;
    let name = &food.name;
    let cal = food.calories;
    if id == requested_id {
        format!("Updated food {id}: {name} — {cal} kcal")
    } else {
        format!("Food {requested_id} no longer exists; logged [{id}] {name} — {cal} kcal")
    }
}

pub(crate) async fn cmd_meal_remove(
    services: &FitnessServices,
    food_id: i64,
    json: bool,
) -> Result<()> {
    let ctrl = NutritionController::new(services, parse_date_label(None)?);
    if !ctrl.remove_food(food_id).await? {
        not_found(&format!("Food {food_id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "removed": food_id }));
    } else {
        println!("Removed food {food_id}");
    }
    Ok(())
}

pub(crate) async fn cmd_meal_delete(
    services: &FitnessServices,
    meal: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let meal_type = parse_meal_type(meal)?;
    let label = parse_date_label(date)?;
    let ctrl = NutritionController::new(services, label.as_str());
    if !ctrl.delete_meal(meal_type).await? {
        not_found(&format!("No {meal_type} logged on {label}"), json);
    }
    if json {
        println!(
            "{}",
            serde_json::json!({ "deleted": meal_type, "date_label": label })
        );
    } else {
        println!("Deleted {meal_type} on {label}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64) -> FoodEntry {
        FoodEntry {
            id,
            meal_id: 1,
            owner_id: "demo-user-1".to_string(),
            name: "Tempe Goreng".to_string(),
            calories: 120,
        }
    }

    #[test]
    fn test_edit_message_in_place() {
        assert_eq!(
            edit_message(4, &entry(4)),
            "Updated food 4: Tempe Goreng — 120 kcal"
        );
    }

    #[test]
    fn test_edit_message_reports_new_id_after_reinsert() {
        let message = edit_message(4, &entry(9));
        assert_eq!(
            message,
            "Food 4 no longer exists; logged [9] Tempe Goreng — 120 kcal"
        );
        assert!(!message.starts_with("Updated"));
    }
}
