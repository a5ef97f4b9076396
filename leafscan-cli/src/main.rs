// LeafScan Command Line Interface
// Apple-leaf disease detection on still images and frame streams

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use leafscan_core::knowledge::{all_profiles, canonical_profiles};
use leafscan_core::{resolve, BoxColor, HistoryLedger, LeafScanConfig};
use leafscan_eye::{CaptureLoop, DetectionPipeline, FrameReport, ModelManager, Session, VisionConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "leafscan")]
#[command(about = "LeafScan - apple leaf disease detection", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the disease catalog
    Diseases {
        /// Print full profiles as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a detector label to a disease profile
    Resolve {
        /// Free-form class label
        label: String,
    },

    /// Detect and annotate a single image
    Annotate {
        /// Input image
        #[arg(long, short)]
        image: PathBuf,

        /// Annotated output image
        #[arg(long, short)]
        output: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Run continuous capture over a directory of frames
    Watch {
        /// Frame directory (defaults to camera.frames_dir)
        #[arg(long)]
        frames: Option<PathBuf>,

        /// Target frame rate, 5-30
        #[arg(long)]
        fps: Option<u32>,

        /// Write annotated frames here
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Stop after this many processed frames
        #[arg(long)]
        max_frames: Option<u64>,

        #[command(flatten)]
        run: RunArgs,
    },
}

/// Detector and display overrides shared by `annotate` and `watch`
#[derive(Args)]
struct RunArgs {
    /// Detector weights (.onnx) or recorded detection fixture (.json); defaults to model.weights_path
    #[arg(long, short)]
    detections: Option<PathBuf>,

    /// Write the session history as JSON
    #[arg(long)]
    history_out: Option<PathBuf>,

    /// Confidence threshold, 0.10-0.95
    #[arg(long)]
    conf: Option<f32>,

    /// IoU threshold, 0.10-0.90
    #[arg(long)]
    iou: Option<f32>,

    /// Model input size
    #[arg(long)]
    input_size: Option<u32>,

    /// Box color: forest-green, gold, white or red
    #[arg(long)]
    color: Option<String>,

    /// Box line thickness, 1-10
    #[arg(long)]
    thickness: Option<u32>,

    #[arg(long)]
    no_labels: bool,

    #[arg(long)]
    no_confidence: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut LeafScanConfig) -> anyhow::Result<()> {
        let detection = &mut config.detection;
        if let Some(conf) = self.conf {
            detection.confidence_threshold = conf;
        }
        if let Some(iou) = self.iou {
            detection.iou_threshold = iou;
        }
        if let Some(size) = self.input_size {
            detection.input_size = size;
        }
        if let Some(color) = &self.color {
            detection.box_color = color.parse::<BoxColor>()?.rgb();
        }
        if let Some(thickness) = self.thickness {
            detection.line_thickness = thickness;
        }
        if self.no_labels {
            detection.show_labels = false;
        }
        if self.no_confidence {
            detection.show_confidence = false;
        }
        if let Some(path) = &self.detections {
            config.model.weights_path = path.clone();
        }
        config.validate()?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let config = match &cli.config {
        Some(path) => LeafScanConfig::load(path)?,
        None => LeafScanConfig::default(),
    };

    match cli.command {
        Commands::Diseases { json } => {
            list_diseases(json)?;
        }
        Commands::Resolve { label } => {
            let profile = resolve(&label);
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Annotate { image, output, run } => {
            annotate_image(config, &image, &output, &run)?;
        }
        Commands::Watch { frames, fps, output_dir, max_frames, run } => {
            watch_frames(config, frames, fps, output_dir, max_frames, &run).await?;
        }
    }

    Ok(())
}

fn list_diseases(json: bool) -> anyhow::Result<()> {
    if json {
        let profiles: Vec<_> = all_profiles().iter().collect();
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    println!("🍎 Apple leaf diseases:");
    for profile in canonical_profiles() {
        println!(
            "  {} {:<18} {:<9} {:>3}%  ({})",
            profile.icon,
            profile.display_name,
            profile.severity_tier.as_str(),
            profile.severity_percent(),
            profile.key
        );
    }
    Ok(())
}

fn build_pipeline(vision: VisionConfig) -> anyhow::Result<DetectionPipeline> {
    let manager = ModelManager::new(Arc::new(vision));
    let detector = manager.load_detector().context("failed to load detector")?;
    Ok(DetectionPipeline::new(detector))
}

fn write_history(ledger: &HistoryLedger, path: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = path {
        std::fs::write(path, ledger.export_json()?)
            .with_context(|| format!("cannot write history to {}", path.display()))?;
        println!("💾 History written to {}", path.display());
    }
    Ok(())
}

fn print_summary(ledger: &HistoryLedger) {
    let summary = ledger.summarize();
    println!(
        "📊 {} detections, {} distinct diseases",
        summary.total_count, summary.distinct_disease_count
    );
    for row in summary.ranked() {
        println!(
            "  {:<18} {:>4}  mean {:.2}  {:>5.1}%",
            row.disease,
            row.count,
            row.mean_confidence,
            row.share * 100.0
        );
    }
}

#[derive(Serialize)]
struct DetectionLine<'a> {
    disease: &'a str,
    key: &'a str,
    severity: &'a str,
    confidence: f32,
    #[serde(rename = "box")]
    bbox: [f32; 4],
}

fn annotate_image(mut config: LeafScanConfig, image: &Path, output: &Path, run: &RunArgs) -> anyhow::Result<()> {
    run.apply(&mut config)?;
    let pipeline = build_pipeline(VisionConfig::from(&config))?;
    let mut session = Session::from_config(&config);

    let frame = image::open(image)
        .with_context(|| format!("cannot read image {}", image.display()))?
        .to_rgb8();
    let annotation = session.analyze_upload(&pipeline, &frame)?;
    annotation
        .image
        .save(output)
        .with_context(|| format!("cannot write image {}", output.display()))?;

    if annotation.detections.is_empty() {
        println!("🌿 No disease detected");
    }
    let lines: Vec<DetectionLine> = annotation
        .detections
        .iter()
        .map(|d| DetectionLine {
            disease: d.display_name(),
            key: d.profile.key,
            severity: d.profile.severity_tier.as_str(),
            confidence: d.confidence,
            bbox: [d.bbox.x1, d.bbox.y1, d.bbox.x2, d.bbox.y2],
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&lines)?);
    println!("✅ Annotated image written to {}", output.display());

    write_history(session.ledger(), run.history_out.as_deref())
}

async fn watch_frames(
    mut config: LeafScanConfig,
    frames: Option<PathBuf>,
    fps: Option<u32>,
    output_dir: Option<PathBuf>,
    max_frames: Option<u64>,
    run: &RunArgs,
) -> anyhow::Result<()> {
    if let Some(fps) = fps {
        config.detection.target_frame_rate = fps;
    }
    run.apply(&mut config)?;

    let mut vision = VisionConfig::from(&config);
    if frames.is_some() {
        vision.frames_dir = frames;
    }
    vision.validate().map_err(|e| anyhow!(e))?;
    if vision.frames_dir.is_none() {
        bail!("no frame directory given (use --frames or camera.frames_dir)");
    }

    let source = vision.frame_source()?;
    let pipeline = Arc::new(build_pipeline(vision.clone())?);
    let mut session = Session::from_config(&config);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current frame");
            ctrl_c.cancel();
        }
    });

    let mut capture = CaptureLoop::from_config(source, pipeline, &vision)?;
    if let Some(limit) = max_frames {
        capture = capture.with_max_frames(limit);
    }

    let writer = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
            let (tx, rx) = mpsc::channel(64);
            capture = capture.with_reports(tx);
            Some(tokio::spawn(save_frames(rx, dir)))
        }
        None => None,
    };

    let summary = capture.run(&mut session, cancel).await?;
    if let Some(writer) = writer {
        let saved = writer.await?;
        println!("💾 {} annotated frames saved", saved);
    }

    println!(
        "✅ Capture stopped ({:?}): {} frames, {} skipped, {:.1} fps",
        summary.stop_reason, summary.frames_processed, summary.frames_skipped, summary.fps
    );
    print_summary(session.ledger());
    write_history(session.ledger(), run.history_out.as_deref())
}

async fn save_frames(mut rx: mpsc::Receiver<FrameReport>, dir: PathBuf) -> usize {
    let mut saved = 0;
    while let Some(report) = rx.recv().await {
        let path = dir.join(format!("frame_{:05}.png", report.frame_index));
        match report.image.save(&path) {
            Ok(()) => saved += 1,
            Err(e) => warn!("Failed to save {}: {}", path.display(), e),
        }
    }
    saved
}
