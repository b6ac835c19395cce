// Book Tracker - Reading Progress Tracker
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::Context;
use book_tracker::{
    BookPayload, BookService, Config, Database, ListParams, OpContext, SqliteBookStore,
    TrackerError,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "book-tracker-cli")]
#[command(about = "Book Tracker CLI - manage a reading list", long_about = None)]
struct Cli {
    /// SQLite database file (overrides DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Per-operation timeout in seconds (overrides QUERY_TIMEOUT_SECS)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a book
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        author: String,
        /// unread, reading or complete
        #[arg(short, long, default_value = "unread")]
        status: String,
    },
    /// Show one book
    Get {
        id: String,
    },
    /// List books, ordered by title
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Replace title, author and status of a book
    Update {
        id: String,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        author: String,
        #[arg(short, long)]
        status: String,
    },
    /// Delete a book
    Delete {
        id: String,
    },
    /// Show reading statistics
    Stats,
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "failed to encode output"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(path) = cli.db {
        config = config.with_database_path(path);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_query_timeout(Duration::from_secs(secs));
    }

    let db = Database::new(&config.database_path)
        .await
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    let service = BookService::new(SqliteBookStore::from_database(&db));

    let (ctx, cancel) = OpContext::background()
        .with_timeout(config.query_timeout)
        .cancellable();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = run(&service, &ctx, cli.command).await;
    db.close().await?;

    result.map_err(|e| anyhow::anyhow!(e.user_message()))?;
    Ok(())
}

async fn run(
    service: &BookService<SqliteBookStore>,
    ctx: &OpContext,
    command: Commands,
) -> Result<(), TrackerError> {
    match command {
        Commands::Add { title, author, status } => {
            let book = service.create(ctx, BookPayload::new(title, author, status)).await?;
            print_json(&book);
        }
        Commands::Get { id } => print_json(&service.get(ctx, &id).await?),
        Commands::List { status, title, author, limit, offset } => {
            let params = ListParams { status, title, author, limit, offset };
            print_json(&service.list(ctx, params).await?);
        }
        Commands::Update { id, title, author, status } => {
            let book = service.update(ctx, &id, BookPayload::new(title, author, status)).await?;
            print_json(&book);
        }
        Commands::Delete { id } => {
            service.delete(ctx, &id).await?;
            print_json(&serde_json::json!({ "deleted": id }));
        }
        Commands::Stats => print_json(&service.stats(ctx).await?),
    }
    Ok(())
}
