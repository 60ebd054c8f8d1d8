mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    cmd_exercise_add, cmd_exercise_delete, cmd_exercise_list, cmd_exercise_update,
    cmd_food_search, cmd_meal_add, cmd_meal_delete, cmd_meal_edit, cmd_meal_remove,
    cmd_meal_show, cmd_rate_list, cmd_rate_set, cmd_schema, cmd_summary,
};
use crate::config::Config;
use fitlog_core::service::FitnessServices;

#[derive(Parser)]
#[command(
    name = "fitlog",
    version,
    about = "Log exercise and meals, and see calories eaten vs burned"
)]
struct Cli {
    /// Use the local database even when a hosted store is configured
    #[arg(long, global = true)]
    local: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log and manage exercises
    Exercise {
        #[command(subcommand)]
        command: ExerciseCommands,
    },
    /// Log and manage meals for a day
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },
    /// Browse the built-in food list
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Show calories eaten vs burned against the daily goal
    Summary {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage calories-per-minute rates used for exercises
    Rate {
        #[command(subcommand)]
        command: RateCommands,
    },
    /// Print the SQL migration a hosted store needs
    Schema {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ExerciseCommands {
    /// List logged exercises
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log an exercise; calories come from the activity's rate
    Add {
        /// Activity name (e.g. Running, Cycling)
        activity: String,
        /// Duration in minutes
        minutes: i32,
        /// Display time (default: now)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an exercise; calories are recomputed
    Update {
        /// Exercise ID
        id: i64,
        /// New activity name
        #[arg(long)]
        activity: Option<String>,
        /// New duration in minutes
        #[arg(long)]
        minutes: Option<i32>,
        /// New display time
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an exercise by ID
    Delete {
        /// Exercise ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MealCommands {
    /// Show meals and foods for a day
    Show {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a food to a meal, creating the meal if needed
    Add {
        /// Meal: breakfast, lunch, dinner, snack
        meal: String,
        /// Food name
        name: String,
        /// Calories
        calories: i32,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace a food already logged in a meal
    Edit {
        /// Meal: breakfast, lunch, dinner, snack
        meal: String,
        /// Food ID
        food_id: i64,
        /// New food name
        name: String,
        /// New calories
        calories: i32,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove one food by ID
    Remove {
        /// Food ID
        food_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a whole meal with all its foods
    Delete {
        /// Meal: breakfast, lunch, dinner, snack
        meal: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Search the food list by name (all foods when no query)
    Search {
        /// Search query
        query: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RateCommands {
    /// Set the calories burned per minute for an activity
    Set {
        /// Activity name
        activity: String,
        /// Calories per minute
        kcal_per_minute: i32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all activity rates
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // The food list and schema are built in; only store-backed commands load config.
    let local = cli.local;
    let services = move || -> Result<FitnessServices> { Config::load()?.services(local) };

    match cli.command {
        Commands::Exercise { command } => match command {
            ExerciseCommands::List { json } => cmd_exercise_list(&services()?, json).await,
            ExerciseCommands::Add {
                activity,
                minutes,
                time,
                json,
            } => cmd_exercise_add(&services()?, &activity, minutes, time, json).await,
            ExerciseCommands::Update {
                id,
                activity,
                minutes,
                time,
                json,
            } => cmd_exercise_update(&services()?, id, activity, minutes, time, json).await,
            ExerciseCommands::Delete { id, json } => cmd_exercise_delete(&services()?, id, json).await,
        },
        Commands::Meal { command } => match command {
            MealCommands::Show { date, json } => cmd_meal_show(&services()?, date, json).await,
            MealCommands::Add {
                meal,
                name,
                calories,
                date,
                json,
            } => cmd_meal_add(&services()?, &meal, &name, calories, date, json).await,
            MealCommands::Edit {
                meal,
                food_id,
                name,
                calories,
                date,
                json,
            } => cmd_meal_edit(&services()?, &meal, food_id, &name, calories, date, json).await,
            MealCommands::Remove { food_id, json } => {
                cmd_meal_remove(&services()?, food_id, json).await
            }
            MealCommands::Delete { meal, date, json } => {
                cmd_meal_delete(&services()?, &meal, date, json).await
            }
        },
        Commands::Food { command } => match command {
            FoodCommands::Search { query, json } => cmd_food_search(query.as_deref(), json),
        },
        Commands::Summary { date, json } => cmd_summary(&services()?, date, json).await,
        Commands::Rate { command } => match command {
            RateCommands::Set {
                activity,
                kcal_per_minute,
                json,
            } => cmd_rate_set(&services()?, &activity, kcal_per_minute, json).await,
            RateCommands::List { json } => cmd_rate_list(&services()?, json).await,
        },
        Commands::Schema { json } => {
            cmd_schema(json);
            Ok(())
        }
    }
}
