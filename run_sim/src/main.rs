use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use refract::{FrameRecording, SceneConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod experiment;

use experiment::{ExperimentFile, Settings};

/// Run the experiments described in a JSON file, and write a report for each of them.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(help = "Experiment file, holding one experiment or a list of them")]
    experiment: PathBuf,

    #[arg(short, long, default_value = ".", help = "Directory reports are written to")]
    out: PathBuf,

    #[arg(short, long, help = "Seed of every random draw")]
    seed: Option<u64>,

    #[arg(long, help = "Propagate rays on a single thread")]
    serial: bool,

    #[arg(long, help = "Only record per frame statistics, not the rays themselves")]
    no_frames: bool,

    #[arg(long, help = "Give up on a scene after this many frames")]
    max_frames: Option<usize>,
}

impl Args {
    fn scene_config(&self) -> SceneConfig {
        let mut config = SceneConfig::default().with_parallel(!self.serial);

        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }

        if self.no_frames {
            config = config.with_recording(FrameRecording::Summary);
        }

        if let Some(max_frames) = self.max_frames {
            config = config.with_max_frames(max_frames);
        }

        config
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let file = ExperimentFile::load(&args.experiment)?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    let settings = Settings {
        config: args.scene_config(),
        out_dir: args.out.clone(),
    };

    for experiment in file.experiments() {
        for path in experiment.run(&settings)? {
            info!(path = %path.display(), "report written");
        }
    }

    Ok(())
}
