use clap::{Parser, Subcommand};
use forkly::api::{ApiKeyStatus, IngredientSearch, RecipeApi};
use forkly::auth::{IdentityProvider, InMemoryIdentityProvider};
use forkly::favorites::{FavoritesEngine, FavoritesOptions, FileStore, InMemoryRemoteStore};
use forkly::viewmodels::{FeaturedRecipesViewModel, RecipeDetailViewModel, SearchViewModel};
use forkly::{ForklyConfig, ForklyError, Recipe, RecipeId, SpoonacularClient};
use log::debug;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "forkly", version, about = "Discover recipes and keep favorites")]
struct Cli {
    /// Keep favorites on this machine only
    #[arg(long, global = true)]
    preview: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search recipes by text and filters
    Search {
        query: Option<String>,
        #[arg(long)]
        cuisine: Option<String>,
        #[arg(long)]
        diet: Option<String>,
        #[arg(long)]
        intolerances: Option<String>,
        #[arg(long = "type")]
        meal_type: Option<String>,
        /// Comma-separated ingredients that must be used
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,
        /// Comma-separated ingredients to avoid
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
        #[arg(long)]
        max_ready_time: Option<u32>,
        #[arg(long)]
        sort: Option<String>,
    },
    /// Show one recipe with cleaned summary and steps
    Details { id: RecipeId },
    /// Featured recipes, with the ingredient fallback
    Featured {
        /// Bypass the featured cache
        #[arg(long)]
        refresh: bool,
    },
    /// Recipes that use the given comma-separated ingredients
    ByIngredients {
        ingredients: String,
        #[arg(long, default_value_t = 10)]
        number: u32,
    },
    /// Verify the configured API key
    CheckKey,
    /// Hit every endpoint once to see which ones currently work
    CheckEndpoints,
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
}

#[derive(Subcommand)]
enum FavoritesAction {
    List,
    /// Add the recipe if absent, remove it otherwise
    Toggle { id: RecipeId },
}

fn print_recipes(recipes: &[Recipe]) {
    for recipe in recipes {
        match recipe.ready_in_minutes {
            Some(minutes) => println!("{:>8}  {} ({} min)", recipe.id, recipe.title, minutes),
            None => println!("{:>8}  {}", recipe.id, recipe.title),
        }
    }
}

async fn run(cli: Cli) -> Result<(), ForklyError> {
    let mut config = ForklyConfig::load()?;
    config.preview |= cli.preview;

    match cli.command {
        Command::Search {
            query,
            cuisine,
            diet,
            intolerances,
            meal_type,
            include,
            exclude,
            max_ready_time,
            sort,
        } => {
            let client = Arc::new(SpoonacularClient::new(&config.api)?);
            let vm = SearchViewModel::new(client);
            vm.update_criteria(|c| {
                c.query = query;
                c.cuisine = cuisine;
                c.diet = diet;
                c.intolerances = intolerances;
                c.meal_type = meal_type;
                c.include_ingredients = include;
                c.exclude_ingredients = exclude;
                c.max_ready_time = max_ready_time;
                c.sort = sort;
            });
            vm.search().await;
            print_recipes(&vm.results());
            if let Some(message) = vm.error_message() {
                eprintln!("{}", message);
            }
        }
        Command::Details { id } => {
            let client = Arc::new(SpoonacularClient::new(&config.api)?);
            let vm = RecipeDetailViewModel::new(client);
            vm.load(id).await;
            if let Some(message) = vm.error_message() {
                eprintln!("{}", message);
                return Ok(());
            }
            if let Some(detail) = vm.detail() {
                println!("{}\n", detail.title);
                println!("{}\n", vm.cleaned_summary());
                for ingredient in detail.ingredients() {
                    if let Some(line) = ingredient.original.as_deref().or(ingredient.name.as_deref()) {
                        println!("  - {}", line);
                    }
                }
                println!();
                for (n, step) in vm.instruction_steps().iter().enumerate() {
                    println!("{}. {}", n + 1, step);
                }
            }
        }
        Command::Featured { refresh } => {
            let client = Arc::new(SpoonacularClient::new(&config.api)?);
            let vm = FeaturedRecipesViewModel::new(client, &config.featured);
            vm.load(refresh).await;
            print_recipes(&vm.recipes());
            if let Some(message) = vm.error_message() {
                eprintln!("{}", message);
            }
        }
        Command::ByIngredients {
            ingredients,
            number,
        } => {
            let client = SpoonacularClient::new(&config.api)?;
            let query = IngredientSearch::from_list(&ingredients).number(number);
            print_recipes(&client.find_by_ingredients(&query).await?);
        }
        Command::CheckKey => {
            let client = SpoonacularClient::new(&config.api)?;
            println!("API key: {}", client.masked_api_key());
            match client.check_api_key().await? {
                ApiKeyStatus::Valid => println!("API key is valid"),
                ApiKeyStatus::Invalid(message) => println!("API key is invalid: {}", message),
                ApiKeyStatus::Unexpected(status, message) => {
                    println!("Unexpected response ({}): {}", status, message)
                }
            }
        }
        Command::CheckEndpoints => {
            let client = SpoonacularClient::new(&config.api)?;
            println!("Testing endpoints with API key {}", client.masked_api_key());
            let report = client.check_endpoints().await;
            for endpoint in &report.endpoints {
                println!("{}", endpoint);
            }
            match report.api_key {
                Ok(ApiKeyStatus::Valid) => println!("API key: valid"),
                Ok(ApiKeyStatus::Invalid(message)) => println!("API key: invalid - {}", message),
                Ok(ApiKeyStatus::Unexpected(status, message)) => {
                    println!("API key: unexpected response ({}) - {}", status, message)
                }
                Err(e) => println!("API key: check failed - {}", e),
            }
        }
        Command::Favorites { action } => run_favorites(&config, action).await?,
    }

    Ok(())
}

async fn run_favorites(config: &ForklyConfig, action: FavoritesAction) -> Result<(), ForklyError> {
    let identity = if config.preview {
        InMemoryIdentityProvider::preview()
    } else {
        InMemoryIdentityProvider::new()
    };
    let engine = FavoritesEngine::start(
        identity.subscribe(),
        Arc::new(FileStore::new(config.favorites.storage_dir.clone())),
        Arc::new(InMemoryRemoteStore::new()),
        FavoritesOptions {
            storage_key: config.favorites.storage_key.clone(),
            preview: config.preview,
        },
    )
    .await;
    debug!("Favorites loaded for {:?}", engine.current_user_id());

    match action {
        FavoritesAction::List => print_recipes(&engine.favorites()),
        FavoritesAction::Toggle { id } => {
            let recipe = match engine.get_favorite(id) {
                Some(recipe) => recipe,
                None => {
                    let client = SpoonacularClient::new(&config.api)?;
                    client.get_details(id).await?.summary_recipe()
                }
            };
            engine.toggle(&recipe).wait().await?;
            let verb = if engine.is_favorite(&recipe) { "Added" } else { "Removed" };
            println!("{} {} ({})", verb, recipe.title, recipe.id);
        }
    }

    if let Some(message) = engine.error_message() {
        eprintln!("{}", message);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
