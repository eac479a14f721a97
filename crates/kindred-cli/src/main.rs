use chrono::{DateTime, Utc};
use futures::executor::block_on;
use kindred::{
    Diagnostic, EngineConfig, FamilyTree, FileStore, GenerationConflict, GenerationPolicy,
    Layout, LayoutStats, LayoutStore, LayoutView, MemoryStore, Person, RepositionNode,
    TreeExport, TreeSession, TreeStats, generation_conflicts,
};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::str::FromStr;
use std::sync::Arc;

const DEFAULT_TREE_ID: &str = "default";

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Kindred(kindred::Error),
    Json(serde_json::Error),
    TooManyNodes { count: usize, cap: usize },
    NoLayout,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Kindred(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::TooManyNodes { count, cap } => write!(
                f,
                "tree has {count} members; at most {cap} can be laid out at once"
            ),
            CliError::NoLayout => write!(f, "no layout could be produced"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<kindred::Error> for CliError {
    fn from(value: kindred::Error) -> Self {
        Self::Kindred(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Layout,
    Stats,
    Export,
    Import,
    Reposition,
}

#[derive(Debug, Clone, Copy, Default)]
enum Format {
    #[default]
    Json,
    Csv,
}

impl FromStr for Format {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    config: Option<String>,
    cache_dir: Option<String>,
    tree_id: Option<String>,
    format: Format,
    derive_generations: bool,
    node: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
}

/// Accepted tree inputs: a previous export, a `{ treeId, persons }` document or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum TreeInput {
    Export(TreeExport),
    Document {
        #[serde(default, rename = "treeId")]
        tree_id: Option<String>,
        persons: Vec<Person>,
    },
    Persons(Vec<Person>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsOut<'a> {
    tree_id: &'a str,
    #[serde(flatten)]
    tree: TreeStats,
    layout: Option<LayoutStats>,
    diagnostics: Vec<Diagnostic>,
    generation_conflicts: Vec<GenerationConflict>,
}

fn usage() -> &'static str {
    "kindred-cli\n\
\n\
USAGE:\n\
  kindred-cli [layout] [--pretty] [<common>] [<path>|-]\n\
  kindred-cli stats [--pretty] [<common>] [<path>|-]\n\
  kindred-cli export [--format json|csv] [--pretty] [<common>] [<path>|-]\n\
  kindred-cli import [--format json|csv] [--pretty] [<common>] [<path>|-]\n\
  kindred-cli reposition --node <id> --x <x> --y <y> [--pretty] [<common>] [<path>|-]\n\
\n\
COMMON:\n\
  --config <path>          engine config JSON (partial; missing fields take defaults)\n\
  --cache-dir <dir>        persist layouts under <dir> between runs\n\
  --tree-id <id>           override the tree id (required context for CSV input)\n\
  --derive-generations     derive rows from relations instead of stored generations\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - Tree input is an export, a {\"treeId\", \"persons\"} document or an array of persons.\n\
  - Set RUST_LOG to see diagnostics on stderr (default: warn).\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_f64(raw: &str) -> Result<f64, CliError> {
    let v = raw.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
    if !v.is_finite() {
        return Err(CliError::Usage(usage()));
    }
    Ok(v)
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "layout" => args.command = Command::Layout,
            "stats" => args.command = Command::Stats,
            "export" => args.command = Command::Export,
            "import" => args.command = Command::Import,
            "reposition" => args.command = Command::Reposition,
            "--pretty" => args.pretty = true,
            "--derive-generations" => args.derive_generations = true,
            "--format" => {
                args.format = next_value(&mut it)?
                    .parse::<Format>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--config" => args.config = Some(next_value(&mut it)?.clone()),
            "--cache-dir" => args.cache_dir = Some(next_value(&mut it)?.clone()),
            "--tree-id" => args.tree_id = Some(next_value(&mut it)?.clone()),
            "--node" => args.node = Some(next_value(&mut it)?.clone()),
            "--x" => args.x = Some(parse_f64(next_value(&mut it)?)?),
            "--y" => args.y = Some(parse_f64(next_value(&mut it)?)?),
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    if matches!(args.command, Command::Reposition)
        && (args.node.is_none() || args.x.is_none() || args.y.is_none())
    {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<EngineConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    if args.derive_generations {
        config.layout.generation_policy = GenerationPolicy::Derived;
    }
    Ok(config)
}

fn open_session<'s>(
    text: &str,
    tree_id: Option<&str>,
    store: &'s dyn LayoutStore,
    config: EngineConfig,
    now: DateTime<Utc>,
) -> Result<TreeSession<&'s dyn LayoutStore>, CliError> {
    let (id, persons) = match serde_json::from_str::<TreeInput>(text)? {
        TreeInput::Export(mut export) => {
            if let Some(id) = tree_id {
                export.tree_id = id.to_string();
            }
            return Ok(block_on(TreeSession::restore(export, store, config, now))?);
        }
        TreeInput::Document {
            tree_id: doc_id,
            persons,
        } => (tree_id.map(str::to_string).or(doc_id), persons),
        TreeInput::Persons(persons) => (tree_id.map(str::to_string), persons),
    };

    let tree = FamilyTree::from_persons(id.unwrap_or_else(|| DEFAULT_TREE_ID.to_string()), persons);
    let mut session = TreeSession::new(tree, store, config);
    block_on(session.refresh(now))?;
    Ok(session)
}

fn import_session<'s>(
    text: &str,
    args: &Args,
    store: &'s dyn LayoutStore,
    config: EngineConfig,
    now: DateTime<Utc>,
) -> Result<TreeSession<&'s dyn LayoutStore>, CliError> {
    let mut export = match args.format {
        Format::Json => TreeExport::from_json(text)?,
        Format::Csv => TreeExport::from_csv(
            args.tree_id.as_deref().unwrap_or(DEFAULT_TREE_ID),
            text,
            now,
        )?,
    };
    if let Some(id) = &args.tree_id {
        export.tree_id = id.clone();
    }
    Ok(block_on(TreeSession::restore(export, store, config, now))?)
}

fn current_layout<S: LayoutStore>(session: &TreeSession<S>) -> Result<Arc<Layout>, CliError> {
    match session.view() {
        LayoutView::Ready(layout) => Ok(Arc::clone(layout)),
        LayoutView::Empty => Ok(Arc::new(Layout::empty(session.config().layout.canvas()))),
        LayoutView::TooManyNodes { count, cap } => Err(CliError::TooManyNodes {
            count: *count,
            cap: *cap,
        }),
        LayoutView::Failed(err) => Err(CliError::Kindred(kindred::Error::Layout(err.clone()))),
        LayoutView::Loading => Err(CliError::NoLayout),
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(&args)?;
    let text = read_input(args.input.as_deref())?;
    let now = Utc::now();

    let memory: MemoryStore;
    let file: FileStore;
    let store: &dyn LayoutStore = match &args.cache_dir {
        Some(dir) => {
            file = FileStore::new(dir);
            &file
        }
        None => {
            memory = MemoryStore::new();
            &memory
        }
    };

    let mut session = match args.command {
        Command::Import => import_session(&text, &args, store, config, now)?,
        _ => open_session(&text, args.tree_id.as_deref(), store, config, now)?,
    };

    match args.command {
        Command::Layout | Command::Import => write_json(current_layout(&session)?.as_ref(), args.pretty),
        Command::Stats => {
            let mut diagnostics = session.tree().load_diagnostics().to_vec();
            let layout = session.layout();
            if let Some(layout) = layout {
                diagnostics.extend(layout.diagnostics.iter().cloned());
            }
            let out = StatsOut {
                tree_id: session.tree().id(),
                tree: session.stats(),
                layout: layout.map(|l| l.stats()),
                diagnostics,
                generation_conflicts: generation_conflicts(session.tree().persons()),
            };
            write_json(&out, args.pretty)
        }
        Command::Export => {
            let export = session.export(now);
            match args.format {
                Format::Json => print!("{}", export.to_json(args.pretty)?),
                Format::Csv => print!("{}", export.to_csv()?),
            }
            Ok(())
        }
        Command::Reposition => {
            current_layout(&session)?;
            let (Some(node), Some(x), Some(y)) = (args.node.as_deref(), args.x, args.y) else {
                return Err(CliError::Usage(usage()));
            };
            let layout = session.reposition(&RepositionNode::new(node, x, y), now)?;
            block_on(session.flush(now));
            write_json(layout.as_ref(), args.pretty)
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_tracing();
    tracing::debug!(command = ?args.command, input = ?args.input, "starting");

    match run(args) {
        Ok(()) => {}
        Err(err @ CliError::TooManyNodes { .. }) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
