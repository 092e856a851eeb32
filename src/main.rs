use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use image::RgbaImage;

use lassoedit::compose::AuxiliaryImage;
use lassoedit::config::{load_app_config, load_app_config_from};
use lassoedit::geometry::DisplaySize;
use lassoedit::input::PointerEvent;
use lassoedit::logging;
use lassoedit::storage::RequestStorage;
use lassoedit::Workspace;

#[derive(Parser, Debug)]
#[command(
    name = "lassoedit",
    version,
    about = "Turn a free-hand stroke into a native-resolution mask and a composited edit request."
)]
struct Cli {
    /// Read settings from this file instead of the XDG config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the full edit request and export its payloads.
    Compose(ComposeArgs),
    /// Rasterize the stroke and export only the mask.
    Mask(SelectionArgs),
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// Base image to select on.
    #[arg(long)]
    image: PathBuf,
    /// JSON array of `[x, y]` display-space points, in drawing order.
    #[arg(long)]
    stroke: PathBuf,
    /// Rendered size of the image the stroke was drawn on, as `WIDTHxHEIGHT`.
    #[arg(long, value_parser = parse_display_size)]
    display: DisplaySize,
    /// Output directory.
    #[arg(long)]
    out: PathBuf,
    /// Sub-directory name for this request.
    #[arg(long, default_value = "request")]
    id: String,
}

#[derive(Args, Debug)]
struct ComposeArgs {
    #[command(flatten)]
    selection: SelectionArgs,
    /// Editing instruction.
    #[arg(long)]
    text: Option<String>,
    /// Reference image to place into the selected region. Repeatable; order is kept.
    #[arg(long = "reference")]
    references: Vec<PathBuf>,
    /// Extra images passed to the engine after any reference.
    #[arg(long = "auxiliary")]
    auxiliaries: Vec<PathBuf>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => load_app_config_from(path),
        None => load_app_config(),
    };
    let mut workspace = Workspace::from_config(&config);

    match cli.command {
        Commands::Compose(args) => command_compose(&mut workspace, args),
        Commands::Mask(args) => command_mask(&mut workspace, args),
    }
}

fn command_compose(workspace: &mut Workspace, args: ComposeArgs) -> Result<()> {
    select_region(workspace, &args.selection)?;

    // The first reference travels with the instruction; the rest follow it in order.
    let mut references = args.references.iter();
    let reference = references.next().map(|path| load_rgba(path)).transpose()?;
    for path in references {
        workspace.add_auxiliary(AuxiliaryImage::Reference(load_rgba(path)?));
    }
    for path in &args.auxiliaries {
        workspace.add_auxiliary(AuxiliaryImage::Other(load_rgba(path)?));
    }
    workspace
        .provide_instruction(args.text, reference)
        .context("instruction rejected")?;

    let request = workspace
        .submit_selection()
        .context("failed to compose edit request")?;
    let storage = RequestStorage::with_root(&args.selection.out);
    let dir = storage.write_request(&args.selection.id, request)?;
    println!("{}", dir.display());
    Ok(())
}

fn command_mask(workspace: &mut Workspace, args: SelectionArgs) -> Result<()> {
    select_region(workspace, &args)?;
    let mask = workspace
        .encode_selection_mask()
        .context("failed to encode mask")?;
    let path = RequestStorage::with_root(&args.out).write_mask(&args.id, &mask)?;
    println!("{}", path.display());
    Ok(())
}

/// Replays the stroke as a single pointer gesture and finalizes it.
fn select_region(workspace: &mut Workspace, args: &SelectionArgs) -> Result<()> {
    workspace.set_primary(load_rgba(&args.image)?);
    workspace.activate_selection()?;

    let points = load_stroke(&args.stroke)?;
    let Some(((first_x, first_y), rest)) = points.split_first() else {
        bail!("stroke file {} contains no points", args.stroke.display());
    };
    workspace.handle_pointer(PointerEvent::down(0, *first_x, *first_y));
    for (x, y) in rest {
        workspace.handle_pointer(PointerEvent::moved(0, *x, *y));
    }
    let (last_x, last_y) = points[points.len() - 1];
    workspace.handle_pointer(PointerEvent::up(0, last_x, last_y));

    workspace
        .finalize_selection(args.display)
        .context("failed to finalize selection")?;
    Ok(())
}

fn load_rgba(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(image.to_rgba8())
}

fn load_stroke(path: &Path) -> Result<Vec<(f64, f64)>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let points: Vec<[f64; 2]> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of [x, y] pairs", path.display()))?;
    Ok(points.into_iter().map(|[x, y]| (x, y)).collect())
}

fn parse_display_size(value: &str) -> Result<DisplaySize, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let width: f64 = width
        .trim()
        .parse()
        .map_err(|err| format!("invalid width {width:?}: {err}"))?;
    let height: f64 = height
        .trim()
        .parse()
        .map_err(|err| format!("invalid height {height:?}: {err}"))?;
    let size = DisplaySize::new(width, height);
    if !size.is_laid_out() {
        return Err(format!("display size must be positive, got {value:?}"));
    }
    Ok(size)
}
