use anyhow::Context;
use clap::Parser;
use criteria_sql::config::{self, DialectKind};
use criteria_sql::{CriteriaTranslator, EntityCatalog, QuerySpecification};
use std::path::PathBuf;

/// Criteria SQL - translate a criteria query file into SQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Entity catalog YAML file
    #[arg(long)]
    catalog: PathBuf,

    /// Query specification file (YAML or JSON)
    #[arg(long)]
    query: PathBuf,

    /// Target SQL dialect (generic, postgres, mysql, sql_server)
    #[arg(long)]
    dialect: Option<DialectKind>,

    /// Bound on implicit fetch join expansion
    #[arg(long)]
    max_fetch_depth: Option<u32>,

    /// Prefix the SQL with the query comment
    #[arg(long)]
    comments: bool,

    /// Print the full translation as JSON instead of SQL and bind values
    #[arg(long)]
    json: bool,
}

fn main() {
    dotenvy::dotenv().ok();
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // Environment first, explicit flags override it
    let env_config = config::TranslatorConfig::from_env().context("reading environment")?;
    let cli_config = config::CliConfig {
        dialect: cli.dialect.unwrap_or(env_config.dialect),
        max_fetch_depth: cli.max_fetch_depth.unwrap_or(env_config.max_fetch_depth),
        use_sql_comments: cli.comments || env_config.use_sql_comments,
    };
    let config = config::TranslatorConfig::from_cli(cli_config).context("invalid configuration")?;

    let catalog = EntityCatalog::from_yaml_file(&cli.catalog)
        .with_context(|| format!("loading catalog {}", cli.catalog.display()))?;
    log::info!(
        "Loaded {} entities from {}",
        catalog.entities().count(),
        cli.catalog.display()
    );

    let content = std::fs::read_to_string(&cli.query)
        .with_context(|| format!("reading query {}", cli.query.display()))?;
    let spec: QuerySpecification = serde_yaml::from_str(&content)
        .with_context(|| format!("parsing query {}", cli.query.display()))?;

    let translator = CriteriaTranslator::new(&catalog, config);
    let query = translator
        .translate(&spec)
        .with_context(|| format!("translating criteria on {}", spec.entity))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&query)?);
        return Ok(());
    }

    println!("{}", query.sql);
    for (i, value) in query.parameters.typed_values().iter().enumerate() {
        println!("  ?{} = {} ({})", i + 1, value.value, value.ty);
    }
    for (alias, mode) in &query.parameters.lock_modes {
        println!("  lock {} {:?}", alias, mode);
    }
    println!("  aliases: {}", query.aliases().join(", "));
    println!(
        "  query spaces: {}",
        query.query_spaces.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    if !query.duplicate_joins.is_empty() {
        println!("  duplicate joins: {}", query.duplicate_joins.len());
    }
    Ok(())
}
