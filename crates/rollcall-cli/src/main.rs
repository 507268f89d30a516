use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{
    CosineMatcher, Frame, Matcher, RecognitionPipeline, RecognizeOutcome, StudentRecord,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;
mod gallery;

use config::Config;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face recognition attendance tool")]
struct Cli {
    /// Path to a rollcall.toml config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract an embedding from an image and add it to the gallery.
    Enroll {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        roll_no: String,
        #[arg(long, default_value = "students.json")]
        gallery: PathBuf,
    },
    /// Recognize the face in an image against the gallery.
    Recognize {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, default_value = "students.json")]
        gallery: PathBuf,
        /// Override the configured similarity threshold.
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Write a landmark overlay image for debugging.
    Landmarks {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Enroll {
            image,
            name,
            roll_no,
            gallery: gallery_path,
        } => enroll(&config, &image, name, roll_no, &gallery_path),
        Command::Recognize {
            image,
            gallery: gallery_path,
            threshold,
        } => recognize(&config, &image, &gallery_path, threshold),
        Command::Landmarks { image, out } => landmarks(&config, &image, &out),
    }
}

fn load_frame(path: &Path) -> Result<Frame> {
    let img = image::open(path)
        .with_context(|| format!("opening image {}", path.display()))?
        .to_rgb8();
    Frame::from_image(&img).context("converting image to frame")
}

fn run_pipeline(config: &Config, image: &Path) -> Result<RecognizeOutcome> {
    let mut pipeline = RecognitionPipeline::load(&config.model_dir, config.pipeline.clone())
        .context("loading pipeline models")?;
    let frame = load_frame(image)?;
    pipeline.recognize(&frame).context("recognizing face")
}

fn enroll(
    config: &Config,
    image: &Path,
    name: String,
    roll_no: String,
    gallery_path: &Path,
) -> Result<()> {
    let embedding = match run_pipeline(config, image)? {
        RecognizeOutcome::Embedded(embedding) => embedding,
        RecognizeOutcome::NoFace => bail!("no face detected in {}", image.display()),
        RecognizeOutcome::GeometryRejected(reason) => {
            bail!("face geometry unusable in {}: {reason}", image.display())
        }
    };

    let mut records = gallery::load(gallery_path)?;
    if records.iter().any(|r| r.roll_no == roll_no) {
        bail!("roll number {roll_no} is already enrolled");
    }
    records.push(StudentRecord {
        name: name.clone(),
        roll_no: roll_no.clone(),
        embedding,
    });
    gallery::save(gallery_path, &records)?;

    println!("enrolled {name} ({roll_no}), gallery now holds {} records", records.len());
    Ok(())
}

fn recognize(
    config: &Config,
    image: &Path,
    gallery_path: &Path,
    threshold: Option<f32>,
) -> Result<()> {
    let threshold = threshold.unwrap_or(config.threshold);

    let query = match run_pipeline(config, image)? {
        RecognizeOutcome::Embedded(embedding) => embedding,
        RecognizeOutcome::NoFace => {
            println!("no face detected");
            return Ok(());
        }
        RecognizeOutcome::GeometryRejected(reason) => {
            println!("no embedding produced: {reason}");
            return Ok(());
        }
    };

    let records = gallery::load(gallery_path)?;
    let result = CosineMatcher
        .compare(&query, &records, threshold)
        .context("matching against gallery")?;

    if result.verified {
        println!(
            "verified: {} ({}) score {:.3}",
            result.name.as_deref().unwrap_or("?"),
            result.roll_no.as_deref().unwrap_or("?"),
            result.similarity
        );
    } else {
        println!("not verified (best score {:.3})", result.similarity);
    }
    Ok(())
}

fn landmarks(config: &Config, image: &Path, out: &Path) -> Result<()> {
    let mut pipeline = RecognitionPipeline::load(&config.model_dir, config.pipeline.clone())
        .context("loading pipeline models")?;
    let frame = load_frame(image)?;

    match pipeline.landmark_overlay(&frame)? {
        Some(overlay) => {
            overlay
                .to_image()
                .save(out)
                .with_context(|| format!("writing overlay {}", out.display()))?;
            println!("overlay written to {}", out.display());
        }
        None => println!("no usable face in {}", image.display()),
    }
    Ok(())
}
