//! `topo-edit`: apply operation batches to topology documents

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use topo_editor::telemetry::{self, LogFormat};
use topo_editor::{
    ConstraintValueService, EditorConfig, EditorService, EditorServices, FsDocumentStore, GitWorkingTree,
    InMemoryTypeCatalog, LocalArtifactStore, LoggingWorkflow, Operation, OperationPayload, Principal,
    RoleAuthorizer, YamlDocumentCodec,
};
use topo_model::{DocumentId, TypeDescriptor};

fn cli() -> Command {
    Command::new("topo-edit")
        .version(topo_editor::VERSION)
        .about("Apply operations to topology documents and inspect their history")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("documents")
                .long("documents")
                .global(true)
                .default_value("work/documents")
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding the document records"),
        )
        .arg(
            Arg::new("types")
                .long("types")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("YAML list of type descriptors to register"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .default_value("topo-edit")
                .help("User recorded as the author of the operations"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("apply")
                .about("Execute a batch of operations on a document, then save")
                .arg(Arg::new("document").required(true).help("Document id"))
                .arg(
                    Arg::new("operations")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("YAML list of operation payloads"),
                ),
        )
        .subcommand(
            Command::new("history")
                .about("Print the commit log of a document, newest first")
                .arg(Arg::new("document").required(true).help("Document id"))
                .arg(
                    Arg::new("from")
                        .long("from")
                        .default_value("0")
                        .value_parser(value_parser!(usize))
                        .help("Number of newest commits to skip"),
                )
                .arg(
                    Arg::new("count")
                        .long("count")
                        .default_value("20")
                        .value_parser(value_parser!(usize))
                        .help("Maximum number of commits to print"),
                ),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let format = if matches.get_flag("json-logs") {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    telemetry::init(format)?;

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let editor = build_editor(config, &matches)?;
    let principal = Principal::new(
        matches
            .get_one::<String>("user")
            .map_or("topo-edit", String::as_str),
    );

    match matches.subcommand() {
        Some(("apply", args)) => apply(&editor, &principal, args),
        Some(("history", args)) => history(&editor, args),
        _ => unreachable!("subcommand_required"),
    }
}

fn build_editor(config: EditorConfig, matches: &ArgMatches) -> Result<EditorService> {
    let documents = matches
        .get_one::<PathBuf>("documents")
        .context("missing --documents")?;
    let catalog = match matches.get_one::<PathBuf>("types") {
        Some(path) => InMemoryTypeCatalog::with_types(read_types(path)?),
        None => InMemoryTypeCatalog::new(),
    };

    let services = EditorServices {
        documents: Arc::new(FsDocumentStore::open(documents)?),
        codec: Arc::new(YamlDocumentCodec),
        authorizer: Arc::new(RoleAuthorizer::permissive()),
        values: Arc::new(ConstraintValueService),
        catalog: Arc::new(catalog),
        workflow: Arc::new(LoggingWorkflow),
        version_control: Arc::new(GitWorkingTree::new(
            config.repository_root.clone(),
            config.commit_identity.clone(),
        )),
        artifacts: Arc::new(LocalArtifactStore::open(config.artifact_dir.clone())?),
    };
    Ok(EditorService::new(config, services)?)
}

fn read_types(path: &Path) -> Result<Vec<TypeDescriptor>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn apply(editor: &EditorService, principal: &Principal, args: &ArgMatches) -> Result<()> {
    let id = document_arg(args)?;
    let path = args
        .get_one::<PathBuf>("operations")
        .context("missing operations file")?;
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let payloads: Vec<OperationPayload> =
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let mut last = editor.snapshot(&id)?.last_operation_id;
    for (i, payload) in payloads.into_iter().enumerate() {
        let description = payload.commit_message();
        let snapshot = editor
            .execute(principal, &id, Operation::new(payload).after(last))
            .with_context(|| format!("operation #{i} ({description}) rejected"))?;
        println!("[{i}] {description} -> {}", snapshot.fingerprint.short());
        last = snapshot.last_operation_id;
    }

    let saved = editor.save(principal, &id, last.as_ref())?;
    println!(
        "saved <{}> ({} elements, fingerprint {})",
        saved.document_id,
        saved.document.elements.len(),
        saved.fingerprint.short()
    );
    Ok(())
}

fn history(editor: &EditorService, args: &ArgMatches) -> Result<()> {
    let id = document_arg(args)?;
    let from = args.get_one::<usize>("from").copied().unwrap_or(0);
    let count = args.get_one::<usize>("count").copied().unwrap_or(20);

    for entry in editor.history(&id, from, count)? {
        let short = entry.commit_id.get(..8).unwrap_or(&entry.commit_id);
        println!("{short} {} {}", entry.timestamp.to_rfc3339(), entry.author);
        for line in entry.message.lines() {
            println!("    {line}");
        }
    }
    Ok(())
}

fn document_arg(args: &ArgMatches) -> Result<DocumentId> {
    args.get_one::<String>("document")
        .map(|s| DocumentId::new(s.as_str()))
        .context("missing document id")
}
