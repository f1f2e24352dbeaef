use anyhow::{Context, Result, bail};
use barcode_ensemble::config::{EnsembleConfig, LatencyMode};
use barcode_ensemble::localizer::{FullFrameLocalizer, Scanner};
use barcode_ensemble::models::BoundingBox;
use barcode_ensemble::region::{self, Crop};
use barcode_ensemble::synth::{self, Symbology, SynthOptions};
use barcode_ensemble::tools::{grayscale_stats, load_rgb, read_boxes, scale_box};
use barcode_ensemble::{EnsembleDecoder, variants};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "scantool", version, about = "Ensemble barcode decoding tools")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode an image and print the detection list as JSON
    Decode {
        #[arg(long)]
        image: PathBuf,
        /// Region to decode as x1,y1,x2,y2 (repeatable); whole image when absent
        #[arg(long = "box", value_name = "X1,Y1,X2,Y2")]
        boxes: Vec<BoundingBox>,
        /// File with one x1,y1,x2,y2 box per line
        #[arg(long)]
        boxes_file: Option<PathBuf>,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long)]
        margin: Option<u32>,
        /// Skip the fallback engine
        #[arg(long)]
        no_fallback: bool,
        /// Race deadline per box in milliseconds (0 disables)
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// frame or box
        #[arg(long)]
        latency: Option<LatencyMode>,
        #[arg(long)]
        pretty: bool,
    },
    /// Write the four preprocessing variants of a region as PNG files
    Variants {
        #[arg(long)]
        image: PathBuf,
        #[arg(long = "box", value_name = "X1,Y1,X2,Y2")]
        bbox: Option<BoundingBox>,
        #[arg(long, default_value_t = region::DEFAULT_MARGIN)]
        margin: u32,
        #[arg(long)]
        out: PathBuf,
    },
    /// Render a synthetic linear barcode to a PNG file
    Synth {
        /// code128, ean13 or code39
        #[arg(long, default_value = "code128")]
        symbology: Symbology,
        #[arg(long)]
        text: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 3)]
        module_px: u32,
        #[arg(long, default_value_t = 60)]
        height: u32,
        #[arg(long, default_value_t = 10)]
        quiet: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Decode {
            image,
            boxes,
            boxes_file,
            workers,
            margin,
            no_fallback,
            timeout_ms,
            latency,
            pretty,
        } => {
            let mut config = EnsembleConfig::from_env().context("reading BARCODE_* environment")?;
            if let Some(workers) = workers {
                config.workers = workers;
            }
            if let Some(margin) = margin {
                config.margin = margin;
            }
            if no_fallback {
                config.use_fallback = false;
            }
            if let Some(timeout_ms) = timeout_ms {
                config.decode_timeout_ms = timeout_ms;
            }
            if let Some(latency) = latency {
                config.latency = latency;
            }
            let mut boxes = boxes;
            if let Some(path) = boxes_file {
                boxes.extend(read_boxes(&path).with_context(|| format!("reading {}", path.display()))?);
            }
            decode_cmd(&image, &boxes, config, pretty)
        }
        Command::Variants {
            image,
            bbox,
            margin,
            out,
        } => variants_cmd(&image, bbox, margin, &out),
        Command::Synth {
            symbology,
            text,
            out,
            module_px,
            height,
            quiet,
        } => {
            let opts = SynthOptions {
                module_px,
                bar_height: height,
                quiet_modules: quiet,
            };
            synth_cmd(symbology, &text, &opts, &out)
        }
    }
}

fn decode_cmd(image: &Path, boxes: &[BoundingBox], config: EnsembleConfig, pretty: bool) -> Result<()> {
    let (frame, scale) = load_rgb(image).with_context(|| format!("loading {}", image.display()))?;
    info!(
        image = %image.display(),
        width = frame.width(),
        height = frame.height(),
        boxes = boxes.len(),
        "decoding"
    );

    let decoder = EnsembleDecoder::new(config)?;
    let detections = if boxes.is_empty() {
        Scanner::new(FullFrameLocalizer, decoder).scan(&frame)?
    } else {
        let scaled: Vec<BoundingBox> = boxes.iter().map(|b| scale_box(b, scale)).collect();
        decoder.process(&frame, &scaled)?
    };

    info!(decoded = detections.decoded_count(), total = detections.len(), "done");
    let json = if pretty {
        serde_json::to_string_pretty(&detections)?
    } else {
        serde_json::to_string(&detections)?
    };
    println!("{json}");
    Ok(())
}

fn variants_cmd(image: &Path, bbox: Option<BoundingBox>, margin: u32, out: &Path) -> Result<()> {
    let (frame, scale) = load_rgb(image).with_context(|| format!("loading {}", image.display()))?;
    let crop = match bbox {
        Some(b) => match region::extract(&frame, &scale_box(&b, scale), margin)? {
            Crop::Region { image, .. } => image,
            Crop::Empty => bail!("box {b} lies outside the {}x{} image", frame.width(), frame.height()),
        },
        None => frame,
    };

    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    for variant in variants::generate(&crop) {
        let path = out.join(format!("{}.png", variant.method));
        let stats = grayscale_stats(&variant.image);
        variant
            .image
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!(
            "{:<26} {}x{} min={} max={} avg={} -> {}",
            variant.method.as_str(),
            variant.image.width(),
            variant.image.height(),
            stats.min,
            stats.max,
            stats.avg,
            path.display()
        );
    }
    Ok(())
}

fn synth_cmd(symbology: Symbology, text: &str, opts: &SynthOptions, out: &Path) -> Result<()> {
    let Some(img) = synth::render(symbology, text, opts) else {
        bail!("{text:?} cannot be encoded as {symbology}");
    };
    img.save(out)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("{symbology} {text:?} -> {} ({}x{})", out.display(), img.width(), img.height());
    Ok(())
}
