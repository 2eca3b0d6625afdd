use std::path::PathBuf;
use std::process;

use clap::Parser;

use facelens_core::classification::domain::crop_classifier::CropClassifier;
use facelens_core::classification::domain::label_table::LabelTable;
use facelens_core::classification::domain::score_model::ScoreModel;
use facelens_core::classification::infrastructure::ort_score_model::OrtScoreModel;
use facelens_core::detection::domain::detector_bridge::{DetectionSink, DetectorBridge};
use facelens_core::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use facelens_core::ingest::raw_frame::RawFrame;
use facelens_core::overlay::geometry::letterbox_fit;
use facelens_core::pipeline::classify_faces_use_case::ClassifyFacesUseCase;
use facelens_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facelens_core::shared::constants::{
    DEFAULT_MIN_CONFIDENCE, FACE_MODEL_NAME, FACE_MODEL_URL,
};
use facelens_core::shared::model_resolver;

/// Detect and label faces in images using the live-camera pipeline.
#[derive(Parser)]
#[command(name = "facelens")]
struct Cli {
    /// Input image file(s).
    images: Vec<PathBuf>,

    /// Label classifier model (ONNX, NHWC float input).
    #[arg(long)]
    classifier: PathBuf,

    /// Label file: one label per line, line index == class index.
    #[arg(long)]
    labels: PathBuf,

    /// Face detector model (defaults to the cached BlazeFace model,
    /// downloading it on first use).
    #[arg(long)]
    face_model: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_MIN_CONFIDENCE)]
    confidence: f32,

    /// Detector-space to frame-space coordinate scale.
    #[arg(long, default_value = "1.0")]
    scale_factor: f32,

    /// Rotation metadata to apply before processing (0, 90, 180 or 270).
    #[arg(long, default_value = "0")]
    rotation: u32,

    /// Map detection boxes into a WxH viewport (e.g. 1080x2000) and print
    /// the display coordinates as well.
    #[arg(long)]
    viewport: Option<String>,

    /// Save face crops into this directory.
    #[arg(long)]
    save_crops: Option<PathBuf>,
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
    if cli.images.is_empty() {
        return Err("no input images given".into());
    }
    let viewport = cli
        .viewport
        .as_deref()
        .map(parse_viewport)
        .transpose()?;

    let face_model = match &cli.face_model {
        Some(path) => path.clone(),
        None => model_resolver::resolve(FACE_MODEL_NAME, FACE_MODEL_URL, None, None)?,
    };

    let sink = DetectionSink::new();
    let detector = OnnxBlazefaceDetector::spawn(&face_model, cli.confidence, sink.clone())?;
    let bridge = DetectorBridge::new(Box::new(detector), sink);

    let model = OrtScoreModel::load(&cli.classifier)?;
    let labels = LabelTable::load(&cli.labels)?;
    if labels.len() != model.num_classes() {
        log::warn!(
            "label file has {} entries but the model scores {} classes; \
             out-of-range winners will display as Unknown",
            labels.len(),
            model.num_classes()
        );
    }
    let classifier = CropClassifier::new(Box::new(model), labels);

    let mut pipeline = ClassifyFacesUseCase::new(
        bridge,
        classifier,
        Box::new(StdoutPipelineLogger::default()),
    );

    for path in &cli.images {
        let image = image::open(path)?.to_rgba8();
        let (width, height) = image.dimensions();
        let raw = RawFrame::new(image.into_raw(), width, height, cli.rotation);

        let result = pipeline.process_frame(raw, cli.scale_factor)?;

        println!(
            "{}: {} face(s) in {:.1}ms",
            path.display(),
            result.detections.len(),
            result.elapsed.as_secs_f64() * 1000.0
        );
        for (index, detection) in result.detections.iter().enumerate() {
            print!(
                "  [{index}] ({:.0}, {:.0})-({:.0}, {:.0})  {}",
                detection.left,
                detection.top,
                detection.right,
                detection.bottom,
                result.label_at(index),
            );
            if let Some(c) = result.classifications[index].as_ref() {
                print!(" ({:.2})", c.confidence);
            }
            if let Some((vw, vh)) = viewport {
                let mapped = letterbox_fit(
                    result.image_width as f32,
                    result.image_height as f32,
                    vw,
                    vh,
                )
                .map_box(detection);
                print!(
                    "  -> ({:.0}, {:.0})-({:.0}, {:.0})",
                    mapped.left, mapped.top, mapped.right, mapped.bottom
                );
            }
            println!();
        }

        if let Some(dir) = &cli.save_crops {
            save_crops(&pipeline, path, dir)?;
        }
    }

    pipeline.summary();
    Ok(())
}

fn parse_viewport(spec: &str) -> Result<(f32, f32), Box<dyn std::error::Error>> {
    let (w, h) = spec
        .split_once('x')
        .ok_or("viewport must be WxH, e.g. 1080x2000")?;
    Ok((w.trim().parse()?, h.trim().parse()?))
}

fn save_crops(
    pipeline: &ClassifyFacesUseCase,
    source: &PathBuf,
    dir: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());

    for (index, crop) in pipeline.last_crops().snapshot().iter().enumerate() {
        let out = dir.join(format!("{stem}_{index}.png"));
        let buffer = image::RgbaImage::from_raw(crop.width(), crop.height(), crop.data().to_vec())
            .ok_or("crop buffer has unexpected size")?;
        buffer.save(&out)?;
        log::info!("saved {}", out.display());
    }
    Ok(())
}
