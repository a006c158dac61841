//! nui-export - offline model compiler
//!
//! Converts glTF/GLB/OBJ scenes into `.nui` runtime assets.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use nui_export::config::DEFAULT_CONFIG_FILE;
use nui_export::nui_common::{decode_model, AssetModel};
use nui_export::{build_directory, compile_file, ExportConfig, SUPPORTED_EXTENSIONS};

#[derive(Parser)]
#[command(name = "nui-export")]
#[command(about = "Compile 3D models into .nui runtime assets")]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every stale model under a source directory
    Build {
        /// Source directory (overrides config)
        source: Option<PathBuf>,

        /// Output directory (overrides config)
        output: Option<PathBuf>,

        /// Path to nui-export.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Texture directory prefix (overrides config)
        #[arg(long)]
        texture_prefix: Option<String>,

        /// Recompile even when outputs are up to date
        #[arg(short, long)]
        force: bool,
    },

    /// Compile a single model file
    Compile {
        /// Input model file (glTF/GLB/OBJ)
        input: PathBuf,

        /// Output .nui file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to nui-export.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Texture directory prefix (overrides config)
        #[arg(long)]
        texture_prefix: Option<String>,
    },

    /// Print the structure of a compiled .nui file
    Inspect {
        /// Compiled .nui file
        file: PathBuf,
    },

    /// List recognised source formats
    Formats,
}

fn load_config(path: Option<&Path>, texture_prefix: Option<String>) -> Result<ExportConfig> {
    let mut config = match path {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    if let Some(prefix) = texture_prefix {
        config.texture_prefix = prefix;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match cli.command {
        Commands::Build {
            source,
            output,
            config,
            texture_prefix,
            force,
        } => {
            let config = load_config(config.as_deref(), texture_prefix)?;
            let source = source
                .or_else(|| config.paths.source.clone())
                .context("No source directory given (argument or [paths] source)")?;
            let output = output
                .or_else(|| config.paths.output.clone())
                .context("No output directory given (argument or [paths] output)")?;

            tracing::info!("Building {:?} -> {:?}", source, output);
            let report = build_directory(&source, &output, &config, force)?;
            if report.failed > 0 {
                anyhow::bail!("{} model(s) failed to compile", report.failed);
            }
            tracing::info!("Build complete!");
        }

        Commands::Compile {
            input,
            output,
            config,
            texture_prefix,
        } => {
            let config = load_config(config.as_deref(), texture_prefix)?;
            let output = output.unwrap_or_else(|| input.with_extension(&config.output_extension));
            tracing::info!("Compiling {:?} -> {:?}", input, output);

            let bytes = compile_file(&input, &config)?;
            if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {:?}", dir))?;
            }
            std::fs::write(&output, &bytes)
                .with_context(|| format!("Failed to write output: {:?}", output))?;
            tracing::info!("Done! ({} bytes)", bytes.len());
        }

        Commands::Inspect { file } => {
            let bytes =
                std::fs::read(&file).with_context(|| format!("Failed to read {:?}", file))?;
            let model =
                decode_model(&bytes).with_context(|| format!("Invalid .nui file: {:?}", file))?;
            print_summary(&file, &model);
        }

        Commands::Formats => {
            for ext in SUPPORTED_EXTENSIONS {
                println!(".{}", ext);
            }
        }
    }

    Ok(())
}

fn print_summary(path: &Path, model: &AssetModel) {
    tracing::info!(
        "{:?}: {} submeshes, {} bones, {} animations, primitive {:?}",
        path,
        model.submeshes.len(),
        model.bones.len(),
        model.animation_count(),
        model.primitive
    );

    for (i, submesh) in model.submeshes.iter().enumerate() {
        let skinned = submesh.vertices.iter().filter(|v| v.is_skinned()).count();
        tracing::info!(
            "  submesh {}: {} vertices ({} skinned), {} indices, material {}",
            i,
            submesh.vertices.len(),
            skinned,
            submesh.indices.len(),
            submesh
                .material
                .as_ref()
                .map(|m| format!("'{}'", m.name))
                .unwrap_or_else(|| "-".to_string())
        );
    }

    for (name, bone) in model.bones.iter() {
        tracing::debug!("  bone {}: '{}'", bone.id, name);
    }

    for (name, animation) in model.animations() {
        tracing::info!(
            "  animation '{}': {} ticks @ {} tps, {} tracks, {} nodes (depth {}), {} clip bones",
            name,
            animation.duration,
            animation.ticks_per_second,
            animation.bones.len(),
            animation.root_node.node_count(),
            animation.root_node.depth(),
            animation.bone_ids.len()
        );
    }
}
