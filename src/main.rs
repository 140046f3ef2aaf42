use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::info;

use store_inspector::config::InspectorConfig;
use store_inspector::devtools::{MemoryHost, StoreDevtools};
use store_inspector::module::ModuleSpec;
use store_inspector::path::SEPARATOR;
use store_inspector::store::Store;

/// Store Inspector - query a JSON-described store the way devtools does
#[derive(Parser, Debug)]
#[command(name = "store-inspector", version, about)]
struct Args {
    /// Store definition (JSON module tree)
    #[arg(short, long)]
    store: PathBuf,

    /// Devtools configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the module tree, or a flat list of modules matching a filter
    Tree {
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Print the state panel of a node ("root" or "a/b/")
    State { node_id: String },
    /// Print the getters visible from a namespace
    Getters { namespace: String },
    /// Overwrite a state field and print the node's new state panel
    Edit {
        node_id: String,
        /// Dot-separated field path, e.g. "items.0.qty"
        field_path: String,
        /// New value as JSON; bare words are taken as strings
        value: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr, JSON results to stdout
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => InspectorConfig::from_file(path)?,
        None => InspectorConfig::default(),
    };

    let spec = ModuleSpec::from_json(&std::fs::read_to_string(&args.store)?)?;
    let mut store = Store::from_spec(spec)?;
    let host = Rc::new(MemoryHost::new());
    let devtools = StoreDevtools::install(&mut store, host, config);
    info!(store = %args.store.display(), "store loaded");

    let output = match args.command {
        Command::Tree { filter } => {
            serde_json::to_value(devtools.inspector_tree(&store, filter.as_deref()))?
        }
        Command::State { node_id } => {
            serde_json::to_value(devtools.inspector_state(&store, &node_id)?)?
        }
        Command::Getters { namespace } => {
            let namespace = normalize_namespace(&namespace);
            let view = store.local_getters(&namespace);
            let entries: Map<String, Value> = view.entries(&store).into_iter().collect();
            Value::Object(entries)
        }
        Command::Edit {
            node_id,
            field_path,
            value,
        } => {
            let field_path: Vec<String> = field_path.split('.').map(String::from).collect();
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            devtools.edit_inspector_state(&mut store, &node_id, &field_path, value)?;
            serde_json::to_value(devtools.inspector_state(&store, &node_id)?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Accept `cart` as shorthand for the namespace `cart/`.
fn normalize_namespace(namespace: &str) -> String {
    if namespace == "root" || namespace.is_empty() || namespace.ends_with(SEPARATOR) {
        namespace.to_string()
    } else {
        format!("{}{}", namespace, SEPARATOR)
    }
}
