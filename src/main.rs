use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use digitsketch::{
    AppConfig, ClassifierWorker, Drawing, DrawingSession, InferenceEngine, LabelSet, RtenEngine, StrokeCanvas,
    SurfaceMapping, format_recognitions,
};

#[derive(Parser)]
#[command(name = "digitsketch")]
#[command(about = "Rasterize hand-drawn digits and classify them with a trained network")]
struct Cli {
    /// JSON config file (canvas, classifier, labels_path)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a recorded drawing
    Classify {
        /// Drawing JSON: {"width", "height", "strokes": [[{"x","y"}, ...], ...]}
        #[arg(value_name = "DRAWING")]
        drawing: PathBuf,

        /// Model file (.rten / .onnx), overrides the config
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,

        /// Label file, one label per line
        #[arg(long, value_name = "FILE")]
        labels: Option<PathBuf>,

        /// Save rasterized images to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,
    },
    /// Write the rasterized network input as a PNG
    Render {
        #[arg(value_name = "DRAWING")]
        drawing: PathBuf,

        #[arg(long, value_name = "PNG")]
        out: PathBuf,

        /// Also save the full-resolution canvas
        #[arg(long, value_name = "PNG")]
        full_res: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "digitsketch=debug" } else { "digitsketch=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

fn load_drawing(path: &Path) -> anyhow::Result<Drawing> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read drawing {}", path.display()))?;
    let drawing: Drawing =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse drawing {}", path.display()))?;
    drawing.validate().with_context(|| format!("Rejected drawing {}", path.display()))?;
    Ok(drawing)
}

/// The directory must be empty or non-existent
fn prepare_debug_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.exists() {
        let entries = std::fs::read_dir(dir)?;
        if entries.count() > 0 {
            anyhow::bail!("Debug directory is not empty: {}", dir.display());
        }
    } else {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn canvas_for(drawing: &Drawing, config: &AppConfig) -> StrokeCanvas {
    StrokeCanvas::from_drawing(Drawing::new(drawing.width, drawing.height), &config.canvas)
}

async fn classify(
    config: AppConfig,
    drawing_path: &Path,
    debug_out: Option<PathBuf>,
    verbose: bool,
) -> anyhow::Result<()> {
    let drawing = load_drawing(drawing_path)?;
    if verbose {
        println!(
            "Drawing loaded: {}x{}, {} strokes",
            drawing.width,
            drawing.height,
            drawing.strokes.len()
        );
    }

    let labels = match &config.labels_path {
        Some(path) => LabelSet::from_file(path)?,
        None => LabelSet::digits(config.classifier.num_classes),
    };

    let input_shape = config.classifier.input_shape.clone();
    let worker = ClassifierWorker::spawn(config.classifier.clone(), labels, move || {
        Box::new(RtenEngine::new(input_shape)) as Box<dyn InferenceEngine>
    })?;

    let mapping = SurfaceMapping::identity(drawing.width, drawing.height);
    let mut session = DrawingSession::new(canvas_for(&drawing, &config), mapping, worker);
    session.replay(&drawing);

    if let Some(dir) = &debug_out {
        prepare_debug_dir(dir)?;
        session.canvas().render_full().save(dir.join("00_canvas.png"))?;
        session.rasterize().to_image().save(dir.join("01_input.png"))?;
        if verbose {
            println!("  Debug: saved images to {}/", dir.display());
        }
    }

    if verbose {
        println!("Loading model: {}", config.classifier.model_source);
    }
    session.worker().wait_ready().await?;

    let results = session.detect().await?;
    session.close().await;

    if results.is_empty() {
        println!("No digit recognized.");
    } else {
        println!("Result:\n");
        println!("{}", format_recognitions(&results));
    }

    Ok(())
}

fn render(config: &AppConfig, drawing_path: &Path, out: &Path, full_res: Option<&Path>) -> anyhow::Result<()> {
    let drawing = load_drawing(drawing_path)?;
    let canvas = StrokeCanvas::from_drawing(drawing, &config.canvas);

    canvas.rasterize().to_image().save(out)?;
    if let Some(path) = full_res {
        canvas.render_full().save(path)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match args.command {
        Command::Classify {
            drawing,
            model,
            labels,
            debug_out,
        } => {
            if let Some(model) = model {
                config.classifier.model_source = model.display().to_string();
            }
            if labels.is_some() {
                config.labels_path = labels;
            }

            let runtime = tokio::runtime::Builder::new_current_thread().build()?;
            runtime.block_on(classify(config, &drawing, debug_out, args.verbose))
        }
        Command::Render {
            drawing,
            out,
            full_res,
        } => render(&config, &drawing, &out, full_res.as_deref()),
    }
}
