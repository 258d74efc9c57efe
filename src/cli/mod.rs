//! Command-line interface for qcat.
//!
//! Provides commands for importing category documents into the category
//! database, exporting stored categories, listing the stored tree and
//! showing the resolved configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{self, ResolvedConfig};
use crate::core::{resolve_path, ContextResolver, ExportSession, Importer, MissingParentPolicy};
use crate::domain::{CategoryId, CategoryPath, CategoryRecord, ContextScope};
use crate::store::{CategoryStore, SqliteStore};

/// qcat - Question-bank category import and export
#[derive(Parser, Debug)]
#[command(name = "qcat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database file (overrides config and QCAT_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import category blocks from documents
    Import {
        /// Document files or glob patterns (e.g. "banks/*.xml")
        #[arg(required = true)]
        files: Vec<String>,

        /// Abort (and store nothing) on the first bad block
        #[arg(long)]
        stop_on_error: bool,

        /// Ignore the $scope$ prefix of paths and use the default context
        #[arg(long)]
        no_context_from_file: bool,

        /// What to do when a parent category cannot be found
        #[arg(long, value_enum)]
        missing_parent: Option<MissingParentArg>,
    },

    /// Export categories (with their ancestors) as a document
    Export {
        /// Category ids or paths (e.g. 12 or '$course$/Beta/Gamma')
        targets: Vec<String>,

        /// Export every stored category
        #[arg(long, conflicts_with = "targets")]
        all: bool,

        /// Output file (writes to stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Leave the $scope$ prefix off exported paths
        #[arg(long)]
        no_context: bool,
    },

    /// List stored categories
    List {
        /// Only show this storage context (id or scope name, e.g. 2 or course)
        #[arg(short, long)]
        context: Option<String>,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Missing-parent policy for CLI (maps to MissingParentPolicy)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MissingParentArg {
    /// Create the category at the top level
    TopLevel,

    /// Create the missing ancestors
    CreatePath,

    /// Skip the category and its descendants
    Skip,
}

impl From<MissingParentArg> for MissingParentPolicy {
    fn from(p: MissingParentArg) -> Self {
        match p {
            MissingParentArg::TopLevel => MissingParentPolicy::TopLevel,
            MissingParentArg::CreatePath => MissingParentPolicy::CreatePath,
            MissingParentArg::Skip => MissingParentPolicy::Skip,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let mut cfg = config::load_config()?;
        if let Some(db) = self.db {
            cfg.database = db;
        }

        match self.command {
            Commands::Import {
                files,
                stop_on_error,
                no_context_from_file,
                missing_parent,
            } => {
                if stop_on_error {
                    cfg.codec.stop_on_error = true;
                }
                if no_context_from_file {
                    cfg.codec.context_from_file = false;
                }
                if let Some(policy) = missing_parent {
                    cfg.codec.missing_parent = policy.into();
                }
                import_files(&cfg, &files)
            }
            Commands::Export {
                targets,
                all,
                output,
                no_context,
            } => {
                if no_context {
                    cfg.codec.context_to_file = false;
                }
                export_categories(&cfg, &targets, all, output.as_deref())
            }
            Commands::List { context, json } => {
                let context = context.map(|c| parse_context(&cfg, &c)).transpose()?;
                list_categories(&cfg, context, json)
            }
            Commands::Config => show_config(&cfg),
        }
    }
}

fn open_store(cfg: &ResolvedConfig) -> Result<SqliteStore> {
    SqliteStore::open(&cfg.database)
        .with_context(|| format!("Failed to open database: {}", cfg.database.display()))
}

/// Expand file arguments, treating anything with glob characters as a pattern
fn collect_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        if !pattern.contains(&['*', '?', '['][..]) {
            files.push(PathBuf::from(pattern));
            continue;
        }

        let before = files.len();
        for entry in glob::glob(pattern).with_context(|| format!("Invalid pattern: {}", pattern))? {
            let path = entry.with_context(|| format!("Failed to read match of {}", pattern))?;
            if path.is_file() {
                files.push(path);
            }
        }
        if files.len() == before {
            anyhow::bail!("No files match: {}", pattern);
        }
    }

    Ok(files)
}

/// Import documents into the database
fn import_files(cfg: &ResolvedConfig, patterns: &[String]) -> Result<()> {
    let files = collect_inputs(patterns)?;
    let mut store = open_store(cfg)?;
    let stamps = cfg.stamps();
    let importer = Importer::new(&cfg.codec, &cfg.contexts, &stamps);

    let mut failed = 0;
    for path in &files {
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;

        match importer.import(&mut store, &document) {
            Ok(report) => {
                println!(
                    "{}: {} created, {} reused, {} skipped",
                    path.display(),
                    report.created(),
                    report.reused(),
                    report.skipped.len()
                );
                for skipped in &report.skipped {
                    let at = match (&skipped.path, skipped.block) {
                        (Some(p), _) => p.clone(),
                        (None, Some(block)) => format!("block {}", block),
                        (None, None) => "?".to_string(),
                    };
                    println!("  skipped {}: {}", at, skipped.reason);
                }
                if report.top_level_fallbacks > 0 {
                    println!("  {} placed at top level (parent missing)", report.top_level_fallbacks);
                }
                if report.ignored_categories > 0 {
                    println!("  {} category blocks ignored", report.ignored_categories);
                }
            }
            Err(e) if cfg.codec.stop_on_error => {
                return Err(e).with_context(|| format!("Import of {} aborted", path.display()));
            }
            Err(e) => {
                eprintln!("{}: import failed: {}", path.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files failed to import", failed, files.len());
    }
    Ok(())
}

/// Turn an export target into a category id
fn resolve_target(cfg: &ResolvedConfig, store: &SqliteStore, target: &str) -> Result<CategoryId> {
    if let Ok(id) = target.trim().parse::<CategoryId>() {
        return Ok(id);
    }
    let path = CategoryPath::parse(target).with_context(|| format!("Invalid target: {}", target))?;
    let record = resolve_path(store, &cfg.contexts, &cfg.codec, &path)?;
    Ok(record.id)
}

/// Export categories as a document
fn export_categories(
    cfg: &ResolvedConfig,
    targets: &[String],
    all: bool,
    output: Option<&Path>,
) -> Result<()> {
    let store = open_store(cfg)?;

    let ids = if all {
        let mut ids = Vec::new();
        for context_id in store.contexts()? {
            ids.extend(store.list_context(context_id)?.into_iter().map(|r| r.id));
        }
        ids
    } else {
        if targets.is_empty() {
            anyhow::bail!("Nothing to export. Pass category ids or paths, or --all");
        }
        targets
            .iter()
            .map(|t| resolve_target(cfg, &store, t))
            .collect::<Result<Vec<_>>>()?
    };

    let mut session = ExportSession::new(&cfg.codec, &cfg.contexts);
    let document = session.export_document(&store, &ids)?;

    match output {
        Some(path) => {
            std::fs::write(path, &document)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            eprintln!("Wrote {} categories to {}", session.emitted().len(), path.display());
        }
        None => println!("{}", document),
    }

    Ok(())
}

/// A context given as an id or as a scope name
fn parse_context(cfg: &ResolvedConfig, value: &str) -> Result<i64> {
    if let Ok(id) = value.trim().parse::<i64>() {
        return Ok(id);
    }
    let scope: ContextScope = value.parse()?;
    cfg.contexts
        .context_id(scope)
        .with_context(|| format!("No context configured for scope {}", scope))
}

/// One line per category, children indented under their parent
fn render_tree(records: &[CategoryRecord]) -> Vec<String> {
    let mut children: HashMap<Option<CategoryId>, Vec<&CategoryRecord>> = HashMap::new();
    let known: std::collections::HashSet<CategoryId> = records.iter().map(|r| r.id).collect();

    for record in records {
        // Records whose parent is elsewhere are shown as roots
        let parent = record.parent.filter(|p| known.contains(p));
        children.entry(parent).or_default().push(record);
    }
    for list in children.values_mut() {
        list.sort_by_key(|r| (r.sort_order, r.id));
    }

    let mut lines = Vec::new();
    let mut stack: Vec<(&CategoryRecord, usize)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|r| (*r, 0)).collect())
        .unwrap_or_default();

    while let Some((record, depth)) = stack.pop() {
        lines.push(format!(
            "{}{} [{}] ({})",
            "  ".repeat(depth),
            record.name,
            record.id,
            record.info_format.markup_name()
        ));
        if let Some(kids) = children.get(&Some(record.id)) {
            stack.extend(kids.iter().rev().map(|k| (*k, depth + 1)));
        }
    }

    lines
}

/// List stored categories
fn list_categories(cfg: &ResolvedConfig, context: Option<i64>, json: bool) -> Result<()> {
    let store = open_store(cfg)?;

    let contexts = match context {
        Some(id) => vec![id],
        None => store.contexts()?,
    };

    if json {
        let mut records = Vec::new();
        for context_id in contexts {
            records.extend(store.list_context(context_id)?);
        }
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if contexts.is_empty() {
        println!("No categories stored. Use 'qcat import <file>' to add some.");
        return Ok(());
    }

    for context_id in contexts {
        let records = store.list_context(context_id)?;
        let scope = cfg
            .contexts
            .scope_of(context_id)
            .map(|s| s.to_string())
            .unwrap_or_else(|| "(unmapped)".to_string());

        println!("Context {} {}", context_id, scope);
        println!("{}", "-".repeat(40));
        for line in render_tree(&records) {
            println!("{}", line);
        }
        println!("\nTotal: {} categories\n", records.len());
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("qcat configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Database: {}", cfg.database.display());
    println!();
    println!("Contexts:");
    for (scope, id) in cfg.contexts.entries() {
        println!("  {:<18} {}", scope.to_string(), id);
    }
    println!();
    println!("Codec:");
    print!("{}", serde_yaml::to_string(&cfg.codec)?);
    println!("  stamp host: {}", cfg.stamp_host);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TextFormat;

    fn record(id: CategoryId, name: &str, parent: Option<CategoryId>) -> CategoryRecord {
        CategoryRecord {
            id,
            name: name.to_string(),
            info: String::new(),
            info_format: TextFormat::Html,
            parent,
            context_id: 2,
            sort_order: 999,
            stamp: format!("s{}", id),
        }
    }

    #[test]
    fn test_render_tree_nests_children() {
        let records = vec![
            record(1, "Mu", None),
            record(2, "Nu", Some(1)),
            record(3, "Alpha", None),
            record(4, "Xi", Some(1)),
        ];

        let lines = render_tree(&records);

        assert_eq!(
            lines,
            vec![
                "Mu [1] (html)",
                "  Nu [2] (html)",
                "  Xi [4] (html)",
                "Alpha [3] (html)",
            ]
        );
    }

    #[test]
    fn test_render_tree_orphan_as_root() {
        let lines = render_tree(&[record(7, "Lost", Some(99))]);
        assert_eq!(lines, vec!["Lost [7] (html)"]);
    }

    #[test]
    fn test_parse_context_id_or_scope() {
        let cfg = ResolvedConfig {
            home: PathBuf::from("/tmp/qcat"),
            database: PathBuf::from("/tmp/qcat/categories.db"),
            config_file: None,
            codec: Default::default(),
            contexts: crate::core::ContextMap::default(),
            stamp_host: "localhost".to_string(),
        };

        assert_eq!(parse_context(&cfg, "17").unwrap(), 17);
        assert_eq!(parse_context(&cfg, "system").unwrap(), 1);
        assert_eq!(parse_context(&cfg, "$course$").unwrap(), 2);
        assert!(parse_context(&cfg, "module").is_err());
        assert!(parse_context(&cfg, "galaxy").is_err());
    }

    #[test]
    fn test_collect_inputs_glob() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.xml"), "<quiz/>").unwrap();
        std::fs::write(temp.path().join("b.xml"), "<quiz/>").unwrap();
        std::fs::write(temp.path().join("notes.txt"), "").unwrap();

        let pattern = temp.path().join("*.xml").display().to_string();
        let files = collect_inputs(&[pattern]).unwrap();
        assert_eq!(files.len(), 2);

        let none = temp.path().join("*.json").display().to_string();
        assert!(collect_inputs(&[none]).is_err());

        let plain = collect_inputs(&["missing.xml".to_string()]).unwrap();
        assert_eq!(plain, vec![PathBuf::from("missing.xml")]);
    }

    #[test]
    fn test_cli_parses_import_flags() {
        let cli = Cli::parse_from([
            "qcat",
            "import",
            "bank.xml",
            "--stop-on-error",
            "--missing-parent",
            "create-path",
        ]);

        match cli.command {
            Commands::Import {
                files,
                stop_on_error,
                missing_parent,
                ..
            } => {
                assert_eq!(files, vec!["bank.xml".to_string()]);
                assert!(stop_on_error);
                assert!(matches!(missing_parent, Some(MissingParentArg::CreatePath)));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
