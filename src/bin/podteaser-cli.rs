use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use podteaser::config::TeaserConfig;
use podteaser::markers::ContentMarker;
use podteaser::pipeline::{BatchTrack, TeaserPipeline};
use podteaser::wav::write_wav;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac", "ogg", "aac"];

fn main() -> Result<()> {
    podteaser::logging::init();
    let params = Params::parse();

    let config = load_config(&params)?;
    let markers = load_markers(params.markers.as_deref());
    let files = collect_inputs(&params.input)?;
    if files.is_empty() {
        bail!("no audio files found at '{}'", params.input.display());
    }

    fs::create_dir_all(&params.output_dir)
        .with_context(|| format!("failed to create '{}'", params.output_dir.display()))?;

    let mut pipeline = TeaserPipeline::new(config)?;
    if params.visualize {
        pipeline = pipeline.with_diagnostics();
    }

    let bar = ProgressBar::new(files.len() as u64).with_style(
        ProgressStyle::with_template("{spinner} {pos}/{len} tracks [{elapsed}]")
            .expect("static template"),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(120));

    let tracks: Vec<BatchTrack> = files.iter().map(BatchTrack::new).collect();
    let report = pipeline.run_batch(&tracks, &markers, None);
    bar.finish_and_clear();

    for track_report in &report.reports {
        let teaser = &track_report.teaser;
        let out_path = output_path(&params.output_dir, &teaser.source, "teaser", "wav");
        write_wav(&out_path, &teaser.samples, teaser.sample_rate)?;
        println!("teaser created: {}", out_path.display());

        if let Some(snapshot) = &track_report.snapshot {
            let json_path = output_path(&params.output_dir, &teaser.source, "analysis", "json");
            snapshot.write_json(&json_path)?;
            println!("analysis written: {}", json_path.display());
        }
    }

    for (path, err) in &report.failures {
        eprintln!("failed: {}: {err}", path.display());
    }

    if let Some(reel) = &report.summary {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = params.output_dir.join(format!("summary_teaser_{stamp}.wav"));
        write_wav(&path, &reel.samples, reel.sample_rate)?;
        println!("summary teaser created: {}", path.display());
    }

    println!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    if report.succeeded() == 0 {
        bail!("no teasers were created");
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "podteaser")]
#[command(about = "Generate teasers from podcast audio")]
struct Params {
    /// Input podcast file, or a directory of podcast files.
    input: PathBuf,

    #[arg(short = 'o', long = "output-dir", default_value = "output_teasers")]
    output_dir: PathBuf,

    /// Path to a JSON configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Path to a content-markers JSON file.
    #[arg(short = 'm', long = "markers")]
    markers: Option<PathBuf>,

    /// Target teaser duration in seconds.
    #[arg(short = 'd', long = "duration")]
    duration: Option<f32>,

    /// Also create a summary teaser from all processed tracks.
    #[arg(short = 's', long = "summary", default_value_t = false)]
    summary: bool,

    /// Exclude intro and outro sections from teasers.
    #[arg(short = 'n', long = "no-intro-outro", default_value_t = false)]
    no_intro_outro: bool,

    /// Disable transcription-based analysis.
    #[arg(long = "no-transcription", default_value_t = false)]
    no_transcription: bool,

    /// Write per-track analysis series as JSON for external plotting.
    #[arg(short = 'v', long = "visualize", default_value_t = false)]
    visualize: bool,
}

fn load_config(params: &Params) -> Result<TeaserConfig> {
    let mut config = match &params.config {
        Some(path) => TeaserConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from '{}'", path.display()))?,
        None => TeaserConfig::default(),
    };

    if let Some(duration) = params.duration {
        config.teaser_duration_secs = duration;
    }
    if params.summary {
        config.summary.enabled = true;
    }
    if params.no_intro_outro {
        config.exclude_intro_outro = true;
    }
    if params.no_transcription {
        config.transcription_enabled = false;
    }
    Ok(config)
}

/// Load markers, falling back to none when the file is missing or malformed —
/// a bad markers file shouldn't stop a long batch run.
fn load_markers(path: Option<&Path>) -> Vec<ContentMarker> {
    let Some(path) = path else {
        return Vec::new();
    };
    match fs::read_to_string(path).map_err(anyhow::Error::from).and_then(|text| {
        serde_json::from_str::<Vec<ContentMarker>>(&text).map_err(anyhow::Error::from)
    }) {
        Ok(markers) => markers,
        Err(err) => {
            eprintln!("ignoring markers file '{}': {err}", path.display());
            Vec::new()
        }
    }
}

fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("input path does not exist: {}", input.display());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(input)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| {
                    AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                })
        })
        .collect();
    files.sort();
    Ok(files)
}

fn output_path(dir: &Path, source: &Path, suffix: &str, ext: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("track");
    dir.join(format!("{stem}_{suffix}.{ext}"))
}
