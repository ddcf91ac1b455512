use std::{error::Error, fs, path::Path};

use clap::Parser;
use cull::engine::SyntheticScenario;
use cull::pipeline::{optimize_sparse_cloud, RefineConfig};

/// Sparse-cloud refinement over a synthetic chunk.
#[derive(Debug, Parser)]
#[command(author, version, about = "Gradual-selection refinement pipeline")]
struct Args {
    /// Path to a JSON file containing a SyntheticScenario.
    #[arg(long)]
    scenario: String,

    /// Optional path to a JSON RefineConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<String>,
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let data = fs::read_to_string(path)?;
    let value = serde_json::from_str(&data)?;
    Ok(value)
}

fn run_refinement_from_files(
    scenario_path: &str,
    config_path: Option<&str>,
) -> Result<String, Box<dyn Error>> {
    let scenario: SyntheticScenario = load_json_file(Path::new(scenario_path))?;

    let config = if let Some(cfg_path) = config_path {
        load_json_file::<RefineConfig>(Path::new(cfg_path))?
    } else {
        RefineConfig::default()
    };

    let mut chunk = scenario.build()?;
    let report = optimize_sparse_cloud(&mut chunk, &config)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

fn main() {
    env_logger::init();
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let json = run_refinement_from_files(&args.scenario, args.config.as_deref())?;
    println!("{}", json);
    Ok(())
}
