//! Tessera CLI: run queries against a database directory, manage databases
//! under a catalog root, or open an interactive shell with transactions.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tessera::{
    Database, DatabaseCatalog, DatabaseConfig, Label, PropertyMap, QueryResponse, QueryResult,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tessera", version, about = "Tessera graph store CLI")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "TESSERA_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a query against a database directory
    Query {
        /// Database directory
        path: PathBuf,

        /// The query string
        cypher: String,

        /// Skip index probes and always scan
        #[arg(long)]
        no_index: bool,
    },
    /// Create a named database under a root directory
    CreateDb {
        /// Catalog root directory
        root: PathBuf,

        /// Database name
        name: String,

        /// Hex password digest stored alongside the database
        #[arg(long)]
        password_digest: String,
    },
    /// List databases under a root directory
    List {
        /// Catalog root directory
        root: PathBuf,
    },
    /// Build an index on label.property
    Index {
        /// Database directory
        path: PathBuf,
        label: String,
        property: String,
    },
    /// Start an interactive shell on a database directory
    Shell {
        /// Database directory
        path: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Query {
            path,
            cypher,
            no_index,
        } => {
            let db = Database::open(&path, config)?;
            let response = db.execute_response(&cypher, !no_index);
            print_response(&response, cli.format)?;
            if let Some(error) = response.error_message() {
                bail!("{}", error);
            }
            Ok(())
        }
        Commands::CreateDb {
            root,
            name,
            password_digest,
        } => {
            let path = DatabaseCatalog::new(&root).create_database(&name, &password_digest)?;
            println!("Created database '{}' at {}", name, path.display());
            Ok(())
        }
        Commands::List { root } => {
            let names = DatabaseCatalog::new(&root).list()?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
                OutputFormat::Table => {
                    if names.is_empty() {
                        println!("(no databases)");
                    }
                    for name in names {
                        println!("{}", name);
                    }
                }
            }
            Ok(())
        }
        Commands::Index {
            path,
            label,
            property,
        } => {
            let db = Database::open(&path, config)?;
            let distinct = db.create_index(&Label::new(label.as_str()), &property)?;
            println!(
                "Index created for :{} on property '{}' ({} distinct values)",
                label, property, distinct
            );
            Ok(())
        }
        Commands::Shell { path } => {
            let db = Database::open(&path, config)?;
            run_shell(&db, cli.format)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<DatabaseConfig> {
    match path {
        Some(path) => DatabaseConfig::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(DatabaseConfig::default()),
    }
}

fn run_shell(db: &Database, format: OutputFormat) -> Result<()> {
    println!("Tessera Interactive Shell on {}", db.path().display());
    println!("Type queries, or :help for commands. :quit to exit.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let prompt = if db.in_transaction() { "tessera(tx)> " } else { "tessera> " };
        eprint!("{}", prompt);
        io::stderr().flush()?;

        let Some(line) = lines.next() else {
            break; // EOF
        };
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match trimmed {
            ":quit" | ":exit" | ":q" => break,
            ":help" | ":h" => {
                println!("Commands:");
                println!("  :begin     Start a transaction");
                println!("  :commit    Commit the active transaction");
                println!("  :rollback  Roll back the active transaction");
                println!("  :indexes   List defined indexes");
                println!("  :quit      Exit shell");
                println!("  <query>    Execute a query");
            }
            ":begin" => report(db.begin().map(|_| "Transaction started.")),
            ":commit" => report(db.commit().map(|_| "Changes committed to database.")),
            ":rollback" => report(db.rollback().map(|_| "Transaction rolled back.")),
            ":indexes" => {
                let indexes = db.list_indexes();
                if indexes.is_empty() {
                    println!("(no indexes)");
                }
                for (label, property) in indexes {
                    println!(":{}({})", label, property);
                }
            }
            query => {
                let response = db.execute_response(query, db.config().use_index_by_default);
                if let Err(e) = print_response(&response, format) {
                    eprintln!("Error: {}", e);
                }
            }
        }
    }

    if db.in_transaction() {
        db.rollback()?;
        println!("Transaction rolled back before exit.");
    }
    println!("Bye!");
    Ok(())
}

fn report<E: std::fmt::Display>(outcome: std::result::Result<&str, E>) {
    match outcome {
        Ok(message) => println!("{}", message),
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn print_response(response: &QueryResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(response)?),
        OutputFormat::Table => match response {
            QueryResponse::Success(result) => print_tables(result),
            QueryResponse::Error { error } => eprintln!("Error: {}", error),
        },
    }
    Ok(())
}

fn print_tables(result: &QueryResult) {
    println!("{}", result.message);

    if !result.nodes.is_empty() {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["id", "labels", "properties"]);
        for node in &result.nodes {
            let labels: Vec<&str> = node.labels.iter().map(|l| l.as_str()).collect();
            table.add_row(vec![
                node.id.to_string(),
                labels.join(":"),
                format_properties(&node.properties),
            ]);
        }
        println!("{}", table);
    }

    if !result.relationships.is_empty() {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["id", "start_node", "type", "end_node", "properties"]);
        for rel in &result.relationships {
            table.add_row(vec![
                rel.id.to_string(),
                rel.start_node.to_string(),
                rel.rel_type.to_string(),
                rel.end_node.to_string(),
                format_properties(&rel.properties),
            ]);
        }
        println!("{}", table);
    }
}

fn format_properties(properties: &PropertyMap) -> String {
    let parts: Vec<String> = properties
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect();
    format!("{{{}}}", parts.join(", "))
}
