//! schemadoc command-line tool.
//!
//! Provides the `schemadoc` binary for evolving schemas and reading or
//! writing documents kept in a JSON workspace file. Every command prints
//! JSON on stdout; diagnostics go to stderr and honour `RUST_LOG`.
//!
//! Store behaviour is configured through `SCHEMADOC_READ_POLICY` and
//! `SCHEMADOC_LINEAGE_POLICY`, same as for library users.

mod workspace;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use schemadoc_core::{apply, Lens};
use schemadoc_store::{StoreConfig, StoreError};

use workspace::{parse_assignment, read_json, CliError, Workspace};

/// Schema-versioned document store.
#[derive(Parser)]
#[command(name = "schemadoc", about = "Schema-versioned document store")]
struct Cli {
    /// Path to the workspace file.
    #[arg(short, long, global = true, default_value = "schemadoc.json")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Start (or re-root) a lineage.
    Lineage {
        /// Lineage name.
        name: String,
    },

    /// Register a new schema version from a lens file.
    Register {
        /// JSON file holding the lens (an array of lens ops).
        lens: PathBuf,

        /// Append to this lineage and advance its head.
        #[arg(long, conflicts_with = "from", required_unless_present = "from")]
        lineage: Option<String>,

        /// Derive from this schema identity; no head moves.
        #[arg(long)]
        from: Option<String>,
    },

    /// Splice a lens edge between two existing schemas.
    Connect {
        /// JSON file holding the lens.
        lens: PathBuf,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,
    },

    /// List lineage heads.
    Heads,

    /// Create a document from an initial value.
    Init {
        /// Document name.
        doc: String,

        /// Schema identity or lineage name.
        #[arg(long)]
        schema: String,

        /// Initial value as JSON.
        #[arg(long)]
        value: String,
    },

    /// Print a document as seen under a schema.
    Read {
        doc: String,

        #[arg(long)]
        schema: String,
    },

    /// Append a change made under a schema.
    Write {
        doc: String,

        #[arg(long)]
        schema: String,

        /// Assignment `<pointer>=<json>`; may be repeated.
        #[arg(long = "set", required = true)]
        sets: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match run(&cli.workspace, cli.command) {
        Ok(output) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&output).expect("JSON output should never fail")
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    process::exit(exit_code);
}

/// Executes one command against the workspace at `path`.
///
/// Read-only commands never write the workspace back.
fn run(path: &Path, command: Commands) -> Result<Value, CliError> {
    let mut ws = Workspace::load(path, StoreConfig::from_env())?;

    let (output, dirty) = match command {
        Commands::Lineage { name } => {
            let id = ws.store.create_lineage(&name)?;
            (json!({"lineage": name, "id": id}), true)
        }
        Commands::Register {
            lens,
            lineage,
            from,
        } => {
            let lens: Lens = read_json(&lens)?;
            let id = match (lineage, from) {
                (Some(name), _) => ws.store.register_version(lens, &name)?,
                (None, Some(from)) => {
                    let from = ws.resolve_schema(&from)?;
                    ws.store.register_version_by_id(lens, from)?
                }
                (None, None) => {
                    return Err(CliError::Argument("one of --lineage or --from is required".into()))
                }
            };
            (json!({"id": id}), true)
        }
        Commands::Connect { lens, from, to } => {
            let lens: Lens = read_json(&lens)?;
            let from = ws.resolve_schema(&from)?;
            let to = ws.resolve_schema(&to)?;
            ws.store.connect(lens, from, to)?;
            (json!({"from": from, "to": to}), true)
        }
        Commands::Heads => {
            let heads: serde_json::Map<String, Value> = ws
                .store
                .graph()
                .heads()
                .map(|(name, id)| (name.to_string(), Value::String(id.to_hex())))
                .collect();
            (Value::Object(heads), false)
        }
        Commands::Init { doc, schema, value } => {
            if ws.documents.contains_key(&doc) {
                return Err(CliError::DocumentExists(doc));
            }
            let schema = ws.resolve_schema(&schema)?;
            let initial: Value = serde_json::from_str(&value)
                .map_err(|e| CliError::Argument(format!("invalid --value JSON: {e}")))?;
            let created = ws.store.init_doc(&initial, schema)?;
            ws.put_document(doc.clone(), created);
            (json!({"document": doc, "schema": schema}), true)
        }
        Commands::Read { doc, schema } => {
            let schema = ws.resolve_schema(&schema)?;
            let value = ws.store.read_as(ws.document(&doc)?, schema)?;
            (value, false)
        }
        Commands::Write { doc, schema, sets } => {
            let writer = ws.resolve_schema(&schema)?;
            let ops = sets
                .iter()
                .map(|s| parse_assignment(s))
                .collect::<Result<Vec<_>, _>>()?;
            let document = ws
                .documents
                .get_mut(&doc)
                .ok_or_else(|| CliError::UnknownDocument(doc.clone()))?;
            let entry = ws.store.try_change_typed_doc(document, writer, |value| {
                *value = apply(value, &ops).map_err(StoreError::from)?;
                Ok::<(), CliError>(())
            })?;
            (serde_json::to_value(entry).map_err(StoreError::from)?, true)
        }
    };

    if dirty {
        ws.save(path)?;
    }
    Ok(output)
}
