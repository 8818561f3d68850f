use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use serde::Serialize;

use emovision_core::analysis::recognizer::EmotionRecognizer;
use emovision_core::analysis::result::FrameAnalysis;
use emovision_core::analysis::tally::EmotionTally;
use emovision_core::classification::infrastructure::onnx_ferplus_classifier::OnnxFerPlusClassifier;
use emovision_core::detection::infrastructure::onnx_ultraface_detector::OnnxUltrafaceDetector;
use emovision_core::imaging::domain::image_reader::ImageReader;
use emovision_core::imaging::infrastructure::image_file_reader::ImageFileReader;
use emovision_core::shared::constants::{EMOTION_MODEL_NAME, FACE_MODEL_NAME, IMAGE_EXTENSIONS};
use emovision_core::shared::model_resolver;

/// Face emotion recognition for photos.
#[derive(Parser)]
#[command(name = "emovision")]
struct Cli {
    /// Input image file(s).
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Face detection model: a file path or known model name.
    #[arg(long, default_value = FACE_MODEL_NAME)]
    face_model: String,

    /// Emotion classification model: a file path or known model name.
    #[arg(long, default_value = EMOTION_MODEL_NAME)]
    emotion_model: String,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.7")]
    confidence: f32,

    /// Emit results as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    images: Vec<ImageReport>,
    predominant: Option<String>,
}

#[derive(Serialize)]
struct ImageReport {
    image: String,
    faces: Vec<FaceReport>,
}

#[derive(Serialize)]
struct FaceReport {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    confidence: f32,
    emotion: String,
    scores: BTreeMap<String, f32>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut recognizer = build_recognizer(&cli)?;
    let reader = ImageFileReader::new();
    let mut tally = EmotionTally::new();
    let mut reports = Vec::with_capacity(cli.images.len());

    for path in &cli.images {
        let frame = reader.read(path)?;
        let analysis = recognizer.analyze(&frame)?;
        tally.record_analysis(&analysis);

        if cli.json {
            reports.push(image_report(path, &analysis));
        } else {
            print_analysis(path, &analysis);
        }
    }

    let predominant = tally.predominant().map(|e| e.label().to_string());
    if cli.json {
        let report = Report {
            images: reports,
            predominant,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if cli.images.len() > 1 {
        match predominant {
            Some(label) => println!(
                "Predominant emotion across {} images: {label}",
                cli.images.len()
            ),
            None => println!("No faces detected in any image"),
        }
    }

    Ok(())
}

fn build_recognizer(cli: &Cli) -> Result<EmotionRecognizer, Box<dyn std::error::Error>> {
    log::info!("Resolving face model: {}", cli.face_model);
    let face_path = model_resolver::resolve(
        &cli.face_model,
        None,
        Some(Box::new(|d, t| download_progress("face", d, t))),
    )?;
    log::info!("Resolving emotion model: {}", cli.emotion_model);
    let emotion_path = model_resolver::resolve(
        &cli.emotion_model,
        None,
        Some(Box::new(|d, t| download_progress("emotion", d, t))),
    )?;
    eprint!("\r");

    let detector = OnnxUltrafaceDetector::new(&face_path, cli.confidence)?;
    let classifier = OnnxFerPlusClassifier::new(&emotion_path)?;

    let mut recognizer = EmotionRecognizer::new();
    recognizer.configure_with(Box::new(detector), Box::new(classifier));
    Ok(recognizer)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for path in &cli.images {
        if !path.exists() {
            return Err(format!("Input file not found: {}", path.display()).into());
        }
        if !is_image(path) {
            return Err(format!("Not a supported image file: {}", path.display()).into());
        }
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if cli.face_model.is_empty() || cli.emotion_model.is_empty() {
        return Err("Model identifiers must not be empty".into());
    }
    Ok(())
}

fn is_image(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn print_analysis(path: &std::path::Path, analysis: &FrameAnalysis) {
    if analysis.is_empty() {
        println!("{}: no faces detected", path.display());
        return;
    }

    println!(
        "{}: {} face{}",
        path.display(),
        analysis.len(),
        if analysis.len() == 1 { "" } else { "s" }
    );
    for (i, face) in analysis.faces().iter().enumerate() {
        let (emotion, score) = face.predominant();
        println!(
            "  face {} ({}x{} at {},{}): {emotion} {:.1}%",
            i + 1,
            face.region.width,
            face.region.height,
            face.region.x,
            face.region.y,
            score * 100.0
        );
    }
}

fn image_report(path: &std::path::Path, analysis: &FrameAnalysis) -> ImageReport {
    ImageReport {
        image: path.display().to_string(),
        faces: analysis
            .faces()
            .iter()
            .map(|face| {
                let (emotion, _) = face.predominant();
                FaceReport {
                    x: face.region.x,
                    y: face.region.y,
                    width: face.region.width,
                    height: face.region.height,
                    confidence: face.region.confidence,
                    emotion: emotion.label().to_string(),
                    scores: face
                        .scores
                        .iter()
                        .map(|(e, s)| (e.label().to_string(), s))
                        .collect(),
                }
            })
            .collect(),
    }
}

fn download_progress(which: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {which} model... {pct}%");
    } else {
        eprint!("\rDownloading {which} model... {downloaded} bytes");
    }
}
