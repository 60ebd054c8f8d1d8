mod exercise;
mod food;
mod helpers;
mod meal;
mod rate;
mod schema;
mod summary;

pub(crate) use exercise::{
    cmd_exercise_add, cmd_exercise_delete, cmd_exercise_list, cmd_exercise_update,
};
pub(crate) use food::cmd_food_search;
pub(crate) use meal::{cmd_meal_add, cmd_meal_delete, cmd_meal_edit, cmd_meal_remove, cmd_meal_show};
pub(crate) use rate::{cmd_rate_list, cmd_rate_set};
pub(crate) use schema::cmd_schema;
pub(crate) use summary::cmd_summary;
