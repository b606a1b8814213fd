use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use machine_sound_prep::config::PipelineConfig;
use machine_sound_prep::error::{log_audio_error, log_feature_error};
use machine_sound_prep::{
    check_data_shape, flatfield_audio, init_logging, locate_wav_files, AudioError, BatchSampler,
    FeatureError, FeaturePipeline, FileQuery, ScalerMode, StoragePaths,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "machine_prep",
    about = "Preprocess machine-sound recordings into training features"
)]
struct Cli {
    /// JSON pipeline configuration (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

/// Selects `{base}/{machine}/{id}/{condition}[/{extradir}]`
#[derive(Args, Debug)]
struct DatasetArgs {
    /// Dataset root directory
    #[arg(long)]
    base: PathBuf,
    #[arg(long)]
    machine: String,
    #[arg(long)]
    id: String,
    #[arg(long, default_value = "normal")]
    condition: String,
    /// Optional subdirectory, e.g. `flatfield`
    #[arg(long)]
    extradir: Option<String>,
}

impl DatasetArgs {
    fn query(&self) -> FileQuery {
        let query = FileQuery::new(&self.machine, &self.id, &self.condition);
        match &self.extradir {
            Some(extra) => query.with_extradir(extra),
            None => query,
        }
    }

    fn locate(&self) -> Result<Vec<PathBuf>> {
        let query = self.query();
        locate_wav_files(&self.base, &query)
            .with_context(|| format!("locating wav files for {}/{}", query.machine, query.id))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the wav files of one machine/id/condition directory
    Locate {
        #[command(flatten)]
        dataset: DatasetArgs,
    },
    /// Report the distinct clip lengths (in samples) of a directory
    Survey {
        #[command(flatten)]
        dataset: DatasetArgs,
    },
    /// Pad or trim every clip to the configured duration
    Flatfield {
        #[command(flatten)]
        dataset: DatasetArgs,
    },
    /// Fit the scaler or write standardized features
    Extract {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[arg(long, value_enum)]
        mode: ModeArg,
    },
    /// Build the batch sampler over stored features and walk its epochs
    Batches {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[arg(long, default_value_t = 1)]
        epochs: usize,
        /// Override the sampler seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Fit,
    Transform,
}

impl From<ModeArg> for ScalerMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fit => ScalerMode::Fit,
            ModeArg::Transform => ScalerMode::Transform,
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            if let Some(feature_err) = err.downcast_ref::<FeatureError>() {
                log_feature_error(feature_err, "machine_prep");
            } else if let Some(audio_err) = err.downcast_ref::<AudioError>() {
                log_audio_error(audio_err, "machine_prep");
            }
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Locate { dataset } => run_locate(&dataset),
        Commands::Survey { dataset } => run_survey(&dataset, &config),
        Commands::Flatfield { dataset } => run_flatfield(&dataset, &config),
        Commands::Extract { dataset, mode } => run_extract(&dataset, &config, mode.into()),
        Commands::Batches {
            dataset,
            epochs,
            seed,
        } => run_batches(&dataset, config, epochs, seed),
    }
}

fn run_locate(dataset: &DatasetArgs) -> Result<ExitCode> {
    let files = dataset.locate()?;
    emit(&LocatePayload {
        directory: dataset.query().directory(&dataset.base).display().to_string(),
        files: files.iter().map(|file| file.display().to_string()).collect(),
    })?;
    Ok(ExitCode::from(0))
}

fn run_survey(dataset: &DatasetArgs, config: &PipelineConfig) -> Result<ExitCode> {
    let files = dataset.locate()?;
    let lengths = check_data_shape(&files, config.audio.sample_rate).context("surveying clips")?;
    emit(&SurveyPayload {
        files: files.len(),
        sample_rate: config.audio.sample_rate,
        lengths: lengths.into_iter().collect(),
    })?;
    Ok(ExitCode::from(0))
}

fn run_flatfield(dataset: &DatasetArgs, config: &PipelineConfig) -> Result<ExitCode> {
    let files = dataset.locate()?;
    let report = flatfield_audio(&files, config.audio.target_seconds, config.audio.sample_rate)
        .context("flatfielding clips")?;
    emit(&FlatfieldPayload {
        output_dir: report.output_dir.display().to_string(),
        written: report.written.len(),
        padded: report.padded,
        trimmed: report.trimmed,
        unchanged: report.unchanged,
    })?;
    Ok(ExitCode::from(0))
}

fn run_extract(dataset: &DatasetArgs, config: &PipelineConfig, mode: ScalerMode) -> Result<ExitCode> {
    let files = dataset.locate()?;
    let storage = StoragePaths::from_file_list(&files, &config.storage)?;
    let mut pipeline = FeaturePipeline::new(config.spectrogram.clone(), storage)?;
    let features = pipeline
        .run(&files, mode)
        .with_context(|| format!("running feature extraction ({:?})", mode))?;

    let storage = pipeline.storage();
    emit(&ExtractPayload {
        mode,
        shape: features.shape().to_vec(),
        scaler: storage.scaler_path.display().to_string(),
        features: matches!(mode, ScalerMode::Transform)
            .then(|| storage.feature_path.display().to_string()),
    })?;
    Ok(ExitCode::from(0))
}

fn run_batches(
    dataset: &DatasetArgs,
    config: PipelineConfig,
    epochs: usize,
    seed: Option<u64>,
) -> Result<ExitCode> {
    let files = dataset.locate()?;
    let storage = StoragePaths::from_file_list(&files, &config.storage)?;
    let mut sampler_config = config.sampler;
    if seed.is_some() {
        sampler_config.seed = seed;
    }

    let mut sampler =
        BatchSampler::from_storage(&storage, sampler_config).context("building batch sampler")?;
    let mut served = 0;
    for _ in 0..epochs {
        served += sampler.iter().count();
        sampler.on_epoch_end();
    }

    let cfg = sampler.config();
    emit(&BatchesPayload {
        files: sampler.num_files(),
        starts_per_file: sampler.num_starts_per_file(),
        batches_per_epoch: sampler.len(),
        batch_shape: [cfg.batch_size, cfg.crop_height, cfg.crop_width, 1],
        epochs,
        batches_served: served,
    })?;
    Ok(ExitCode::from(0))
}

fn emit<T: Serialize>(payload: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

#[derive(Serialize)]
struct LocatePayload {
    directory: String,
    files: Vec<String>,
}

#[derive(Serialize)]
struct SurveyPayload {
    files: usize,
    sample_rate: u32,
    lengths: Vec<usize>,
}

#[derive(Serialize)]
struct FlatfieldPayload {
    output_dir: String,
    written: usize,
    padded: usize,
    trimmed: usize,
    unchanged: usize,
}

#[derive(Serialize)]
struct ExtractPayload {
    mode: ScalerMode,
    shape: Vec<usize>,
    scaler: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    features: Option<String>,
}

#[derive(Serialize)]
struct BatchesPayload {
    files: usize,
    starts_per_file: usize,
    batches_per_epoch: usize,
    batch_shape: [usize; 4],
    epochs: usize,
    batches_served: usize,
}
