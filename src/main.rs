//! Tablemail - convert design tree exports into table-based email HTML.
//!
//! # Usage
//!
//! ```bash
//! tablemail newsletter.json > newsletter.html
//! tablemail newsletter.json --out dist --mode download
//! tablemail newsletter.json --select 12:40 --confirm-cta 12:77
//! ```

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use tablemail::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    save_config_flags,
};
use tablemail::design::{self, DesignTree, NodeHandle};
use tablemail::host::{CtaPolicy, LocalHost};
use tablemail::perf;
use tablemail::render::{self, ImageExportMode, RenderOptions, RenderOutput};

/// File name of the rendered email inside `--out`.
const HTML_FILE: &str = "email.html";

/// Convert a design tree export into table-based email HTML
#[derive(Parser, Debug)]
#[command(name = "tablemail", version, about, long_about = None)]
struct Cli {
    /// Design tree JSON export
    #[arg(value_name = "DESIGN")]
    file: PathBuf,

    /// Directory for the HTML and exported assets (stdout when omitted)
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// How image-like layers are emitted
    #[arg(long, value_enum)]
    mode: Option<ImageExportMode>,

    /// Width of the outer table in pixels
    #[arg(long, value_name = "PX")]
    width: Option<f64>,

    /// Render only the layers with these ids
    #[arg(long, value_name = "ID")]
    select: Vec<String>,

    /// Render the button candidate with this id as a button
    #[arg(long, value_name = "ID")]
    confirm_cta: Vec<String>,

    /// Render every button candidate as a button
    #[arg(long)]
    all_cta: bool,

    /// Asset directory inside --out used by download mode
    #[arg(long, value_name = "DIR")]
    assets_dir: Option<String>,

    /// Print timing for each stage to stderr
    #[arg(long)]
    perf: bool,

    /// Write per-layer render decisions to a file
    #[arg(long, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

impl Cli {
    /// Flags given on this command line, in the saved-defaults shape.
    fn flags(&self) -> ConfigFlags {
        ConfigFlags {
            mode: self.mode,
            width: self.width.filter(|width| *width > 0.0),
            out: self.out.clone(),
            assets_dir: self.assets_dir.clone(),
            all_cta: self.all_cta,
            confirm_cta: self.confirm_cta.clone(),
            perf: self.perf,
            render_debug_log: self.render_debug_log.clone(),
        }
    }
}

fn select_nodes(tree: &DesignTree, ids: &[String]) -> Result<Vec<NodeHandle>> {
    if ids.is_empty() {
        return Ok(tree.roots().to_vec());
    }
    ids.iter()
        .map(|id| {
            tree.find_by_id(id)
                .with_context(|| format!("No layer with id {id}"))
        })
        .collect()
}

fn cta_policy(flags: &ConfigFlags) -> CtaPolicy {
    if flags.all_cta {
        CtaPolicy::All
    } else if flags.confirm_cta.is_empty() {
        CtaPolicy::None
    } else {
        CtaPolicy::Ids(flags.confirm_cta.iter().cloned().collect::<HashSet<_>>())
    }
}

fn write_output(out: Option<&Path>, options: &RenderOptions, output: &RenderOutput) -> Result<()> {
    let Some(out) = out else {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", output.html).context("Failed to write HTML to stdout")?;
        return Ok(());
    };

    fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output dir {}", out.display()))?;
    let html_path = out.join(HTML_FILE);
    fs::write(&html_path, &output.html)
        .with_context(|| format!("Failed to write {}", html_path.display()))?;

    if !output.assets.is_empty() {
        let asset_dir = out.join(&options.asset_dir);
        fs::create_dir_all(&asset_dir)
            .with_context(|| format!("Failed to create asset dir {}", asset_dir.display()))?;
        for asset in &output.assets {
            let path = asset_dir.join(&asset.name);
            fs::write(&path, &asset.data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }
    tracing::info!(
        html = %html_path.display(),
        assets = output.assets.len(),
        "wrote email"
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let global_path = global_config_path();
    let cli_flags = cli.flags();

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_override_path())?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_timing(effective.perf);
    let render_debug_log = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os(perf::DEBUG_LOG_ENV).map(PathBuf::from));
    if let Some(path) = &render_debug_log {
        if let Err(err) = perf::set_debug_log(Some(path)) {
            tracing::warn!("Failed to open render debug log {}: {err}", path.display());
        }
    }

    let defaults = RenderOptions::default();
    let options = RenderOptions {
        mode: effective.mode.unwrap_or(defaults.mode),
        page_width: effective.width.unwrap_or(defaults.page_width),
        asset_dir: effective.assets_dir.clone().unwrap_or(defaults.asset_dir),
    };
    if options.mode == ImageExportMode::Download && effective.out.is_none() {
        anyhow::bail!("--mode download needs --out to write assets to");
    }

    let tree = {
        let _scope = perf::scope("load");
        design::load(&cli.file)
            .with_context(|| format!("Failed to load design {}", cli.file.display()))?
    };
    let selection = select_nodes(&tree, &cli.select)?;

    let base_path = cli
        .file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let mut host = LocalHost::new(base_path).with_cta_policy(cta_policy(&effective));

    let output = render::parse(&tree, &selection, &options, &mut host);

    let _scope = perf::scope("write");
    write_output(effective.out.as_deref(), &options, &output)?;
    perf::set_debug_log(None).context("Failed to flush render debug log")
}
