use anyhow::{anyhow, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use eatwise::client::EatWiseClient;
use eatwise::config::Config;
use eatwise::consumption::MealDraft;
use eatwise::error::ValidationError;
use eatwise::models::{parse_amount, ActivityLevel, DietType, MealEntry, MealSlot, Sex};
use eatwise::profile::RegistrationForm;

#[derive(Parser)]
#[command(name = "eatwise", version, about = "Calorie goals, meal logging and weight tracking")]
struct Cli {
    /// Day to work on (YYYY-MM-DD), today if omitted
    #[arg(long, global = true)]
    date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and profile
    Register(RegisterArgs),
    /// Search the food database
    Search { query: String },
    /// Goal and meals for the day
    Today,
    /// Add foods to a meal, each given as QUERY:GRAMS (first search hit is used)
    AddMeal {
        slot: MealSlot,
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Add a hand-typed product to a meal
    AddManual {
        slot: MealSlot,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        kcal: String,
        #[arg(long, default_value = "")]
        protein: String,
        #[arg(long, default_value = "")]
        fat: String,
        #[arg(long, default_value = "")]
        carbs: String,
    },
    /// Remove a meal from the day
    DeleteMeal { slot: MealSlot },
    /// Record a new weight in kg
    LogWeight { kg: f64 },
    /// Daily weight since registration
    History,
    /// Weight progress and BMI
    Profile,
    SetDiet { diet: DietType },
    SetGoal { kg: f64 },
    SetActivity { level: ActivityLevel },
    /// Consumed vs goal calories for a month
    Calendar { year: Option<i32>, month: Option<u32> },
}

#[derive(Args)]
struct RegisterArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    current_weight: f64,
    #[arg(long)]
    goal_weight: f64,
    /// Height in cm
    #[arg(long)]
    height: f64,
    #[arg(long)]
    birth_date: NaiveDate,
    #[arg(long)]
    sex: Sex,
    #[arg(long, default_value = "low")]
    activity: ActivityLevel,
}

async fn register(config: &Config, args: RegisterArgs, today: NaiveDate) -> Result<()> {
    let form = RegistrationForm {
        current_weight: args.current_weight,
        goal_weight: args.goal_weight,
        height: args.height,
        birth_year: args.birth_date.year(),
        birth_month: args.birth_date.month(),
        birth_day: args.birth_date.day(),
        sex: args.sex,
        activity: args.activity,
    };
    let (client, profile) =
        EatWiseClient::register(config, &args.email, &args.password, form, today).await?;
    println!("Account created (age {}, diet value {})", profile.age, profile.diet_value);
    println!("Refresh token: {}", client.auth.refresh_token().await);
    Ok(())
}

async fn connect(config: &Config) -> Result<EatWiseClient> {
    if let Ok(token) = std::env::var("EATWISE_REFRESH_TOKEN") {
        return Ok(EatWiseClient::new(config, token));
    }
    let email = std::env::var("EATWISE_EMAIL")
        .map_err(|_| anyhow!("Set EATWISE_REFRESH_TOKEN or EATWISE_EMAIL/EATWISE_PASSWORD"))?;
    let password = std::env::var("EATWISE_PASSWORD")
        .map_err(|_| anyhow!("EATWISE_PASSWORD is not set"))?;
    EatWiseClient::login(config, &email, &password).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eatwise=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());

    let command = match cli.command {
        Command::Register(args) => return register(&config, args, date).await,
        command => command,
    };
    let mut client = connect(&config).await?;

    match command {
        Command::Register(_) => return Err(anyhow!("register does not take an existing session")),
        Command::Search { query } => {
            let products = client.search_foods(&query).await?;
            if products.is_empty() {
                println!("No products found, try add-manual");
            }
            for p in products {
                println!(
                    "{} - {} kcal, {} g protein, {} g fat, {} g carbs per 100 g",
                    p.name,
                    fmt_opt(p.kcal_per_100g),
                    fmt_opt(p.protein_per_100g),
                    fmt_opt(p.fat_per_100g),
                    fmt_opt(p.carbs_per_100g),
                );
            }
        }
        Command::Today => {
            let day = client.refresh_day(date).await?;
            println!("{}", day.date);
            println!("kcal    {:>5} / {}", day.consumed.kcal, day.goal.kcal);
            println!("carbs   {:>5} / {} g", day.consumed.carbs, day.goal.carbs);
            println!("protein {:>5} / {} g", day.consumed.protein, day.goal.protein);
            println!("fat     {:>5} / {} g", day.consumed.fat, day.goal.fat);
            for (slot, summary) in day.meals.iter() {
                println!("  {:<10} {:>5} kcal", slot, summary.kcal);
            }
        }
        Command::AddMeal { slot, items } => {
            let mut draft = MealDraft::new();
            for item in &items {
                let (query, grams) = item
                    .rsplit_once(':')
                    .ok_or_else(|| anyhow!("Expected QUERY:GRAMS, got '{}'", item))?;
                let grams = parse_amount(grams);
                let products = client.search_foods(query).await?;
                let product = products
                    .first()
                    .ok_or_else(|| anyhow!("No products found for '{}'", query))?;
                let entry = MealEntry::from_product(product, grams)
                    .ok_or(ValidationError::PortionWeight(grams))?;
                println!("{} g {} ({:.0} kcal)", grams, product.name, entry.kcal);
                draft.push(entry);
            }
            let summary = client.save_meal(date, slot, &draft.take()).await?;
            println!("Saved {} ({} kcal total)", slot, summary.kcal);
        }
        Command::AddManual {
            slot,
            name,
            kcal,
            protein,
            fat,
            carbs,
        } => {
            let entry = MealEntry::manual(&name, "product", &kcal, &protein, &fat, &carbs);
            let summary = client.save_meal(date, slot, &[entry]).await?;
            println!("Saved {} ({} kcal total)", slot, summary.kcal);
        }
        Command::DeleteMeal { slot } => {
            let consumed = client.delete_meal(date, slot).await?;
            println!("Deleted {}; {} kcal consumed", slot, consumed.kcal);
        }
        Command::LogWeight { kg } => {
            match client.log_weight(date, kg).await? {
                Some(update) => {
                    println!("Weight {} kg, diet value {}", update.weight, update.diet_value);
                    if update.goal_achieved {
                        println!("CONGRATULATIONS! You've achieved your goal weight!");
                    }
                }
                None => println!("Added {} kg to the history for {}", kg, date),
            }
        }
        Command::History => {
            for entry in client.weight_history(date).await? {
                println!("{} {:.1}", entry.date, entry.weight);
            }
        }
        Command::Profile => {
            let report = client.profile_report().await?;
            println!("Current weight: {} kg", report.profile.current_weight);
            println!("Goal weight: {} kg", report.profile.goal_weight);
            if let Some(sex) = Sex::from_offset(report.profile.sex_offset) {
                println!("Sex: {}", sex);
            }
            println!("Diet: {}", report.profile.diet_type);
            println!("Progress: {}", report.progress);
            match report.bmi {
                Some(bmi) => println!("BMI: {}", bmi),
                None => println!("BMI: unavailable"),
            }
        }
        Command::SetDiet { diet } => {
            let profile = client.set_diet_type(diet).await?;
            println!("Diet set to {}", profile.diet_type);
        }
        Command::SetGoal { kg } => {
            let profile = client.set_goal_weight(kg).await?;
            println!("Goal weight {} kg, diet value {}", profile.goal_weight, profile.diet_value);
        }
        Command::SetActivity { level } => {
            client.set_activity_level(level).await?;
            println!("Activity level set to {}", level.label());
        }
        Command::Calendar { year, month } => {
            let year = year.unwrap_or(date.year());
            let month = month.unwrap_or(date.month());
            for day in client.month_overview(year, month).await? {
                let mark = if day.is_logged() { "*" } else { " " };
                let goal = day.goal.map(|g| g.kcal.to_string()).unwrap_or_else(|| "-".into());
                let left = day
                    .remaining_kcal()
                    .map(|kcal| format!(" ({} left)", kcal))
                    .unwrap_or_default();
                println!("{} {} {:>5} / {}{}", mark, day.date, day.consumed.kcal, goal, left);
            }
        }
    }

    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "?".to_string())
}
