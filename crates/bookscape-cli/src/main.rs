use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "bookscape-cli")]
#[command(about = "BookScape Explorer command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch one keyword search and store previously unseen volumes.
    Ingest {
        #[arg(long)]
        query: String,
    },
    /// Run one named report and print its rows.
    Report {
        #[arg(long)]
        name: String,
    },
    /// List the report catalog.
    Reports,
    /// Apply the database schema migrations.
    Migrate,
    /// Serve the web shell.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Ingest { query } => {
            let client = bookscape_source::VolumesClient::from_env()?;
            let page = client.search(&query).await?;
            let mut store = bookscape_store::BookStore::connect_from_env().await?;
            let summary = store.ingest(&page, &query).await?;
            println!(
                "ingest complete: query={} seen={} skipped={} stored={}",
                query, summary.seen, summary.skipped, summary.stored
            );
        }
        Commands::Report { name } => {
            let report = bookscape_reports::find(&name)?;
            let mut store = bookscape_store::BookStore::connect_from_env().await?;
            let table = bookscape_reports::execute(report, store.connection()).await?;
            if table.is_empty() {
                println!("no rows");
            } else {
                println!("{}", table.columns.join("\t"));
                for row in &table.rows {
                    let cells = row.iter().map(ToString::to_string).collect::<Vec<_>>();
                    println!("{}", cells.join("\t"));
                }
            }
        }
        Commands::Reports => {
            for name in bookscape_reports::names() {
                println!("{name}");
            }
        }
        Commands::Migrate => {
            let mut store = bookscape_store::BookStore::connect_from_env().await?;
            store.run_migrations().await?;
            println!("migrations applied");
        }
        Commands::Serve => {
            bookscape_web::serve_from_env().await?;
        }
    }

    Ok(())
}
