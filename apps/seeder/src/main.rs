//! Seeder CLI: fills a database with categories, tags and sample comments.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use migration::{Migrator, MigratorTrait};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use quill_infra::database::{self, DatabaseConfig, PostgresRepositories};
use quill_infra::seed;

#[derive(Parser, Debug)]
#[command(name = "seeder", author, version, about = "Seed the Quill database.")]
struct Cli {
    /// Which seeder to run.
    #[arg(value_enum, default_value_t = Target::All)]
    target: Target,

    /// Database URL; falls back to DATABASE_URL.
    #[arg(long, env = "DATABASE_URL", value_name = "URL")]
    database_url: String,

    /// Seed for the random generator, for reproducible comment threads.
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Apply pending migrations first.
    #[arg(long)]
    migrate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    All,
    Categories,
    Tags,
    Comments,
}

impl Target {
    fn includes(self, other: Target) -> bool {
        self == Target::All || self == other
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = DatabaseConfig::new(&cli.database_url);
    config.max_connections = 5;
    config.min_connections = 1;
    let db = database::connect(&config)
        .await
        .context("connecting to the database")?;

    if cli.migrate {
        Migrator::up(&db, None).await.context("running migrations")?;
    }

    let repos = PostgresRepositories::new(db);
    let mut rng = match cli.seed {
        Some(n) => StdRng::seed_from_u64(n),
        None => StdRng::from_entropy(),
    };

    if cli.target.includes(Target::Categories) {
        seed::seed_categories(&repos.categories).await?;
    }
    if cli.target.includes(Target::Tags) {
        seed::seed_tags(&repos.tags).await?;
    }
    if cli.target.includes(Target::Comments) {
        seed::seed_comments(&repos.users, &repos.posts, &repos.comments, &mut rng).await?;
    }

    tracing::info!(target = ?cli.target, "Seeding finished");
    Ok(())
}
