//! JSON workspace file for the `schemadoc` CLI.
//!
//! A workspace holds one serialized [`SchemaGraph`] and a set of named
//! documents. It is loaded whole, modified in memory and written back whole
//! after each command.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use schemadoc_core::{CoreError, JsonPointer, PatchOp, SchemaGraph, SchemaId};
use schemadoc_store::{Document, DocumentStore, StoreConfig, StoreError};

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("unknown document '{0}'")]
    UnknownDocument(String),

    #[error("document '{0}' already exists")]
    DocumentExists(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::Store(err.into())
    }
}

impl CliError {
    /// Process exit code: 3 for file-system failures, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Io { .. } => 3,
            _ => 1,
        }
    }
}

/// On-disk form. Documents stay raw JSON until [`Document::from_json`]
/// has checked them.
#[derive(Deserialize)]
struct WorkspaceFile {
    graph: SchemaGraph,
    #[serde(default)]
    documents: IndexMap<String, Value>,
}

#[derive(Serialize)]
struct WorkspaceFileRef<'a> {
    graph: &'a SchemaGraph,
    documents: &'a IndexMap<String, Document>,
}

/// A loaded workspace: the store built over the saved graph plus its
/// named documents.
#[derive(Debug)]
pub struct Workspace {
    pub store: DocumentStore,
    pub documents: IndexMap<String, Document>,
}

impl Workspace {
    /// Loads `path`, or starts an empty workspace if the file does not exist.
    pub fn load(path: &Path, config: StoreConfig) -> Result<Self, CliError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "starting new workspace");
                return Ok(Workspace {
                    store: DocumentStore::with_config(config),
                    documents: IndexMap::new(),
                });
            }
            Err(source) => {
                return Err(CliError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(path, &text, config)
    }

    fn parse(path: &Path, text: &str, config: StoreConfig) -> Result<Self, CliError> {
        let file: WorkspaceFile = serde_json::from_str(text).map_err(|source| CliError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let documents = file
            .documents
            .into_iter()
            .map(|(name, raw)| Ok((name, Document::from_json(&raw)?)))
            .collect::<Result<IndexMap<_, _>, StoreError>>()?;
        tracing::debug!(
            path = %path.display(),
            schemas = file.graph.schema_count(),
            documents = documents.len(),
            "loaded workspace"
        );
        Ok(Workspace {
            store: DocumentStore::from_graph(file.graph, config),
            documents,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        let file = WorkspaceFileRef {
            graph: self.store.graph(),
            documents: &self.documents,
        };
        let text =
            serde_json::to_string_pretty(&file).expect("workspace serialization should never fail");
        fs::write(path, text).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolves a schema argument: a 64-character hex identity, or else the
    /// name of a lineage standing for its current head.
    pub fn resolve_schema(&self, arg: &str) -> Result<SchemaId, CliError> {
        if arg.len() == 64 && arg.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(arg.parse::<SchemaId>()?);
        }
        Ok(self.store.head(arg)?)
    }

    pub fn document(&self, name: &str) -> Result<&Document, CliError> {
        self.documents
            .get(name)
            .ok_or_else(|| CliError::UnknownDocument(name.to_string()))
    }

    pub fn put_document(&mut self, name: String, doc: Document) {
        self.documents.insert(name, doc);
    }
}

/// Reads and parses a JSON file.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a `--set` argument of the form `<pointer>=<json>`.
pub fn parse_assignment(arg: &str) -> Result<PatchOp, CliError> {
    let (pointer, json) = arg
        .split_once('=')
        .ok_or_else(|| CliError::Argument(format!("expected <pointer>=<json>, got '{arg}'")))?;
    let pointer = JsonPointer::parse(pointer)?;
    let value: Value = serde_json::from_str(json)
        .map_err(|e| CliError::Argument(format!("invalid JSON value in '{arg}': {e}")))?;
    Ok(PatchOp::replace(pointer, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemadoc_core::{DataType, Lens, LensOp};
    use serde_json::json;

    fn workspace() -> (Workspace, SchemaId) {
        let mut store = DocumentStore::new();
        store.create_lineage("Project").unwrap();
        let v1 = store
            .register_version(Lens::new(vec![LensOp::add("title", DataType::String)]), "Project")
            .unwrap();
        (
            Workspace {
                store,
                documents: IndexMap::new(),
            },
            v1,
        )
    }

    #[test]
    fn schema_argument_accepts_hex_or_lineage_name() {
        let (ws, v1) = workspace();
        assert_eq!(ws.resolve_schema("Project").unwrap(), v1);
        assert_eq!(ws.resolve_schema(&v1.to_hex()).unwrap(), v1);
        assert!(matches!(
            ws.resolve_schema("Nope"),
            Err(CliError::Store(StoreError::Core(CoreError::UnknownLineage { .. })))
        ));
    }

    #[test]
    fn assignment_splits_on_first_equals() {
        let op = parse_assignment("/title=\"a=b\"").unwrap();
        assert_eq!(
            op,
            PatchOp::replace(JsonPointer::parse("/title").unwrap(), json!("a=b"))
        );
    }

    #[test]
    fn malformed_assignments_are_argument_errors() {
        assert!(matches!(parse_assignment("/title"), Err(CliError::Argument(_))));
        assert!(matches!(parse_assignment("/title=nope"), Err(CliError::Argument(_))));
    }

    #[test]
    fn workspace_file_round_trips_through_json() {
        let (mut ws, v1) = workspace();
        let doc = ws.store.init_doc(&json!({"title": "hi"}), v1).unwrap();
        ws.put_document("readme".into(), doc);

        let text = serde_json::to_string(&WorkspaceFileRef {
            graph: ws.store.graph(),
            documents: &ws.documents,
        })
        .unwrap();
        let reloaded = Workspace::parse(Path::new("ws.json"), &text, StoreConfig::default()).unwrap();

        assert_eq!(reloaded.store.head("Project").unwrap(), v1);
        assert_eq!(
            reloaded
                .store
                .read_as(reloaded.document("readme").unwrap(), v1)
                .unwrap(),
            json!({"title": "hi"})
        );
    }

    #[test]
    fn malformed_stored_document_is_reported_as_such() {
        let (ws, _) = workspace();
        let text = serde_json::to_string(&json!({
            "graph": serde_json::to_value(ws.store.graph()).unwrap(),
            "documents": {"readme": {"patches": []}},
        }))
        .unwrap();
        let err = Workspace::parse(Path::new("ws.json"), &text, StoreConfig::default()).unwrap_err();
        assert!(matches!(err, CliError::Store(StoreError::MalformedDocument { .. })));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn io_errors_exit_with_three() {
        let err = CliError::Io {
            path: PathBuf::from("x"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(CliError::UnknownDocument("d".into()).exit_code(), 1);
    }
}
