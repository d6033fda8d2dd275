//! Acode CLI entry point.
//!
//! Provides `list`, `show`, `validate`, `compose`, and `hash` subcommands
//! for inspecting and composing prompt packs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use acode::config::AcodeConfig;
use acode::pack::embedded::{EmbeddedPackProvider, PackMaterializer};
use acode::pack::registry::{ActivePack, DiscoveryRoot, PackRegistry};
use acode::pack::types::{CompositionContext, PackManifest};
use acode::pack::{ContentHasher, PackLoader, PackSource, PromptComposer, Severity};

/// Acode — prompt pack manager for the acode coding agent.
#[derive(Parser)]
#[command(name = "acode", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// List all discovered packs.
    List {
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show a pack's manifest and components.
    Show {
        /// Pack ID.
        id: String,
    },
    /// Validate a pack and report errors and warnings.
    Validate {
        /// Pack ID.
        id: String,
        /// Emit machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
    /// Compose the final prompt from a pack.
    Compose {
        /// Pack ID. Defaults to the active pack.
        id: Option<String>,
        /// Role selector.
        #[arg(long)]
        role: Option<String>,
        /// Language selector.
        #[arg(long)]
        language: Option<String>,
        /// Framework selector.
        #[arg(long)]
        framework: Option<String>,
        /// Template variable binding, `name=value`. Repeatable.
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },
    /// Compute the content hash of a pack directory.
    Hash {
        /// Path to the pack directory.
        path: PathBuf,
        /// Also compare against the hash recorded in the manifest.
        #[arg(long)]
        verify: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let config = AcodeConfig::load().context("failed to load configuration")?;
    acode::logging::init_cli(&config.logging.level);

    let cli = Cli::parse();

    match cli.command {
        Command::List { json } => handle_list(&config, json),
        Command::Show { id } => handle_show(&config, &id),
        Command::Validate { id, json } => handle_validate(&config, &id, json),
        Command::Compose {
            id,
            role,
            language,
            framework,
            vars,
        } => handle_compose(&config, id.as_deref(), role, language, framework, &vars),
        Command::Hash { path, verify } => handle_hash(&path, verify),
    }
}

/// Build the registry: built-in packs materialized to disk first, the user
/// packs directory second so user packs override built-ins by ID.
fn build_registry(config: &AcodeConfig) -> anyhow::Result<(PackRegistry, EmbeddedPackProvider)> {
    let provider = EmbeddedPackProvider::new();
    let built_in_root = provider
        .materialize()
        .context("failed to materialize built-in packs")?;

    let mut roots = vec![DiscoveryRoot::built_in(built_in_root)];
    if let Some(user_dir) = config.user_packs_dir() {
        roots.push(DiscoveryRoot::user(user_dir));
    }

    let active = ActivePack::from_env(config.prompts.active_pack.clone());
    Ok((PackRegistry::new(roots, active), provider))
}

/// List all discovered packs.
fn handle_list(config: &AcodeConfig, json: bool) -> anyhow::Result<()> {
    let (registry, _provider) = build_registry(config)?;
    let manifests = registry.list();
    let active_id = registry.active_pack_id();

    if json {
        let entries: Vec<serde_json::Value> = manifests.iter().map(manifest_json).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if manifests.is_empty() {
        println!("no packs found");
        return Ok(());
    }

    for manifest in &manifests {
        let marker = if manifest.id == active_id { "*" } else { " " };
        println!(
            "{marker} {:<24} {:<10} {}",
            manifest.id, manifest.version, manifest.name
        );
    }
    Ok(())
}

/// Show one pack's manifest and component listing.
fn handle_show(config: &AcodeConfig, id: &str) -> anyhow::Result<()> {
    let (registry, _provider) = build_registry(config)?;
    let pack = registry.get(id)?;
    let manifest = &pack.manifest;

    println!("id:          {}", manifest.id);
    println!("name:        {}", manifest.name);
    println!("version:     {}", manifest.version);
    println!("description: {}", manifest.description);
    println!("source:      {:?}", manifest.source);
    println!("created:     {}", manifest.created_at.to_rfc3339());
    match &manifest.content_hash {
        Some(hash) => println!("hash:        {hash}"),
        None => println!("hash:        (none recorded)"),
    }
    println!("components:");
    for component in &pack.components {
        println!("  [{}] {}", component.component_type, component.path);
    }
    Ok(())
}

/// Validate a pack, printing the aggregated report. Exits non-zero when
/// the report contains errors; warnings alone do not fail.
fn handle_validate(config: &AcodeConfig, id: &str, json: bool) -> anyhow::Result<()> {
    let (registry, _provider) = build_registry(config)?;

    // Validation errors come back through the registry as a structured
    // report; anything else (not found, unreadable) is a plain failure.
    // Re-validate packs that pass so warnings still get printed.
    let report = match registry.get(id) {
        Ok(pack) => acode::pack::PackValidator::new().validate(&pack),
        Err(acode::pack::RegistryError::Invalid { report, .. }) => report,
        Err(e) => return Err(e.into()),
    };

    emit_report(id, report.errors(), json)
}

fn emit_report(
    id: &str,
    errors: &[acode::pack::ValidationError],
    json: bool,
) -> anyhow::Result<()> {
    let has_errors = errors.iter().any(|e| e.severity == Severity::Error);

    if json {
        let value = serde_json::json!({
            "pack_id": id,
            "valid": !has_errors,
            "errors": errors,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if errors.is_empty() {
        println!("{id}: valid");
    } else {
        for error in errors {
            let tag = match error.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            match &error.path {
                Some(path) => println!("{tag}: [{}] {} ({path})", error.code, error.message),
                None => println!("{tag}: [{}] {}", error.code, error.message),
            }
        }
    }

    if has_errors {
        std::process::exit(1);
    }
    Ok(())
}

/// Compose a prompt and print it to stdout.
fn handle_compose(
    config: &AcodeConfig,
    id: Option<&str>,
    role: Option<String>,
    language: Option<String>,
    framework: Option<String>,
    vars: &[String],
) -> anyhow::Result<()> {
    let (registry, _provider) = build_registry(config)?;
    let pack = match id {
        Some(id) => registry.get(id)?,
        None => registry.active_pack()?,
    };

    let mut context = CompositionContext::new();
    if let Some(role) = role {
        context = context.with_role(role);
    }
    if let Some(language) = language {
        context = context.with_language(language);
    }
    if let Some(framework) = framework {
        context = context.with_framework(framework);
    }
    for var in vars {
        let (name, value) = var
            .split_once('=')
            .with_context(|| format!("invalid --var '{var}': expected NAME=VALUE"))?;
        context = context.with_variable(name, value);
    }

    let prompt = PromptComposer::new().compose(&pack, &context)?;
    println!("{prompt}");
    Ok(())
}

/// Compute (and optionally verify) a pack directory's content hash.
fn handle_hash(path: &Path, verify: bool) -> anyhow::Result<()> {
    let pack = PackLoader::new()
        .load_pack(path, PackSource::User)
        .with_context(|| format!("failed to load pack at {}", path.display()))?;

    let computed = ContentHasher::new().compute(pack.hash_pairs());
    println!("{computed}");

    if verify {
        match &pack.manifest.content_hash {
            Some(recorded) if *recorded == computed => println!("hash matches manifest"),
            Some(recorded) => {
                bail!("hash mismatch: manifest records {recorded}, computed {computed}");
            }
            None => bail!("manifest records no content hash"),
        }
    }
    Ok(())
}

fn manifest_json(manifest: &PackManifest) -> serde_json::Value {
    serde_json::json!({
        "id": manifest.id,
        "name": manifest.name,
        "version": manifest.version.to_string(),
        "description": manifest.description,
        "source": format!("{:?}", manifest.source),
        "created_at": manifest.created_at.to_rfc3339(),
        "content_hash": manifest.content_hash.as_ref().map(|h| h.value().to_string()),
        "components": manifest.components.len(),
    })
}
