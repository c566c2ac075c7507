//! Rolecraft CLI - offline checker for role manifests
//!
//! The `rolecraft` command loads a manifest of role and type declarations,
//! binds placeholder bodies, and runs the composition engine over it.
//!
//! ## Commands
//!
//! - `check`: compose every declared type and print a report per type
//! - `audit`: check the role graph alone (cycles, dangling references) and
//!   list signatures an adopter will have to own or veto

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rolecraft_core::{
    ComposerConfig, CompositionEngine, CompositionReport, LifecycleAdapter, Manifest,
    MethodCatalog, RoleRegistry, RoleRegistryBuilder, StorageCheck,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "rolecraft")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check role composition manifests", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// When role storage declarations are rejected
    #[arg(long, global = true, value_enum, env = "ROLECRAFT_STORAGE_CHECK")]
    storage_check: Option<StorageCheckArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose every type declared in a manifest
    Check {
        /// Manifest path (.toml or .json)
        manifest: PathBuf,

        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Check the role graph without composing any type
    Audit {
        /// Manifest path (.toml or .json)
        manifest: PathBuf,

        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StorageCheckArg {
    Registration,
    Composition,
}

impl From<StorageCheckArg> for StorageCheck {
    fn from(arg: StorageCheckArg) -> Self {
        match arg {
            StorageCheckArg::Registration => StorageCheck::AtRegistration,
            StorageCheckArg::Composition => StorageCheck::AtComposition,
        }
    }
}

/// One role's standing in an audit.
#[derive(Debug, Serialize)]
struct RoleAudit {
    role: String,
    composes: Vec<String>,
    methods: usize,
    /// Signatures more than one origin role offers.
    contested: Vec<String>,
    error: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    rolecraft_core::telemetry::init_tracing(cli.json, level);

    let mut config = ComposerConfig::from_env().context("Invalid rolecraft configuration")?;
    if let Some(check) = cli.storage_check {
        config = config.with_storage_check(check.into());
    }

    match cli.command {
        Commands::Check { manifest, format } => {
            let reports = cmd_check(&manifest, config)?;
            print!("{}", render(&reports, format, CompositionReport::render_text)?);
            let failed = reports.iter().filter(|r| r.is_failed()).count();
            if failed > 0 {
                bail!("{} of {} types failed composition", failed, reports.len());
            }
            Ok(())
        }
        Commands::Audit { manifest, format } => {
            let audits = cmd_audit(&manifest, config)?;
            print!("{}", render(&audits, format, render_audit)?);
            let failed = audits.iter().filter(|a| a.error.is_some()).count();
            if failed > 0 {
                bail!("{} of {} roles failed the audit", failed, audits.len());
            }
            Ok(())
        }
    }
}

/// Parse a manifest, choosing TOML or JSON by file extension.
fn load_manifest(path: &Path) -> Result<Manifest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    let manifest = if is_toml {
        toml::from_str::<Manifest>(&text)
            .with_context(|| format!("Failed to parse TOML manifest {}", path.display()))?
    } else {
        Manifest::from_json_str(&text)
            .with_context(|| format!("Failed to parse JSON manifest {}", path.display()))?
    };
    Ok(manifest)
}

fn build_registry(manifest: &Manifest, config: ComposerConfig) -> Result<RoleRegistry> {
    let mut builder = RoleRegistryBuilder::from_config(&config);
    manifest
        .install(&MethodCatalog::with_placeholders(), &mut builder)
        .context("Failed to register roles")?;
    Ok(builder.freeze())
}

/// Compose every declared type and collect one report per type.
fn cmd_check(path: &Path, config: ComposerConfig) -> Result<Vec<CompositionReport>> {
    let manifest = load_manifest(path)?;
    let registry = build_registry(&manifest, config)?;
    let engine = Arc::new(CompositionEngine::new(Arc::new(registry), config));
    let handles = manifest
        .declare_types(&MethodCatalog::with_placeholders(), &engine)
        .context("Failed to declare types")?;

    let fatals = LifecycleAdapter::new(Arc::clone(&engine)).ensure_all();
    engine.metrics().flush();
    info!(
        types = handles.len(),
        failed = fatals.len(),
        "Composition check finished"
    );

    Ok(handles.iter().map(|h| engine.report(h)).collect())
}

/// Walk every registered role's closure without declaring any type.
fn cmd_audit(path: &Path, config: ComposerConfig) -> Result<Vec<RoleAudit>> {
    let manifest = load_manifest(path)?;
    let registry = build_registry(&manifest, config)?;

    let audits = registry
        .ids()
        .map(|id| {
            let composes: Vec<String> = registry
                .lookup(id)
                .map(|def| def.composed_roles().iter().map(ToString::to_string).collect())
                .unwrap_or_default();
            let (methods, contested, error) = match registry.closure(id) {
                Ok(closure) => (
                    closure.len(),
                    closure.contested().map(|(sig, _)| sig.to_string()).collect(),
                    None,
                ),
                Err(e) => (0, Vec::new(), Some(e.to_string())),
            };
            RoleAudit {
                role: id.to_string(),
                composes,
                methods,
                contested,
                error,
            }
        })
        .collect();
    Ok(audits)
}

fn render_audit(audit: &RoleAudit) -> String {
    let mut line = format!("{} ({} methods)", audit.role, audit.methods);
    if !audit.composes.is_empty() {
        line.push_str(&format!(" composes {}", audit.composes.join(", ")));
    }
    if !audit.contested.is_empty() {
        line.push_str(&format!("\n  contested: {}", audit.contested.join(", ")));
    }
    if let Some(error) = &audit.error {
        line.push_str(&format!("\n  error: {error}"));
    }
    line.push('\n');
    line
}

fn render<T: Serialize>(
    items: &[T],
    format: OutputFormat,
    text: fn(&T) -> String,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(items.iter().map(text).collect()),
        OutputFormat::Json => {
            let mut out =
                serde_json::to_string_pretty(items).context("Failed to serialize report")?;
            out.push('\n');
            Ok(out)
        }
    }
}
