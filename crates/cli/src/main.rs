#![deny(unsafe_code)]
//! CLI binary for the flow-field generative piece.
//!
//! Subcommands:
//! - `render`: run the simulation N ticks, write a PNG of the trails
//! - `grid`: build the vector grid and write it as JSON
//! - `list`: print available palettes and noise backends
//! - `schema`: print the parameter schema
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` for details.

mod cache;
mod error;

use clap::{Args, Parser, Subcommand};
use cache::CachedGrid;
use error::CliError;
use flow_field_core::{FlowConfig, NoiseBackend, Palette, ParticleField, Srgb};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "flow-field", about = "Perlin flow-field particle renderer")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Simulation parameters. Flags override keys given in `--params`.
#[derive(Args)]
struct SimArgs {
    /// Area width in pixels.
    #[arg(short = 'W', long)]
    width: Option<usize>,

    /// Area height in pixels.
    #[arg(short = 'H', long)]
    height: Option<usize>,

    /// Grid cell size in pixels.
    #[arg(short, long)]
    cell_size: Option<f64>,

    /// Number of particles.
    #[arg(short = 'n', long)]
    particles: Option<usize>,

    /// Noise-space increment per grid cell.
    #[arg(long)]
    noise_step: Option<f64>,

    /// Noise backend (lattice, library).
    #[arg(long)]
    noise: Option<String>,

    /// Palette name (mono, ocean, neon, fire, vapor).
    #[arg(short, long)]
    palette: Option<String>,

    /// Seed for deterministic output.
    #[arg(long)]
    seed: Option<u64>,

    /// Parameters as a JSON object.
    #[arg(long, default_value = "{}")]
    params: String,
}

impl SimArgs {
    fn to_config(&self) -> Result<FlowConfig, CliError> {
        let params: serde_json::Value = serde_json::from_str(&self.params)
            .map_err(|e| CliError::Input(format!("invalid --params JSON: {e}")))?;
        let mut config = FlowConfig::from_json(&params)?;
        if let Some(v) = self.width {
            config.width = v;
        }
        if let Some(v) = self.height {
            config.height = v;
        }
        if let Some(v) = self.cell_size {
            config.cell_size = v;
        }
        if let Some(v) = self.particles {
            config.particle_count = v;
        }
        if let Some(v) = self.noise_step {
            config.noise_step = v;
        }
        if let Some(name) = &self.noise {
            config.noise = NoiseBackend::from_name(name)?;
        }
        if let Some(name) = &self.palette {
            config.palette = name.clone();
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run the simulation for N ticks and write a PNG snapshot.
    Render {
        #[command(flatten)]
        sim: SimArgs,

        /// Number of simulation ticks.
        #[arg(short, long, default_value_t = 300)]
        steps: usize,

        /// Background color as hex.
        #[arg(long, default_value = "#000000")]
        background: String,

        /// Output file path.
        #[arg(short, long, default_value = "flow.png")]
        output: PathBuf,

        /// Reuse (or create) a JSON grid cache at this path.
        #[arg(long)]
        grid_cache: Option<PathBuf>,
    },
    /// Build the vector grid and write it as JSON.
    Grid {
        #[command(flatten)]
        sim: SimArgs,

        /// Output file path; stdout if omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List available palettes and noise backends.
    List,
    /// Print the parameter schema as JSON.
    Schema,
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::List => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&list_info()?)?);
            } else {
                println!("Palettes:");
                for name in Palette::list_names() {
                    let hexes: Vec<String> = Palette::from_name(name)?
                        .colors()
                        .iter()
                        .map(|c| c.to_hex())
                        .collect();
                    println!("  {name:<8} {}", hexes.join(" "));
                }
                println!("Noise backends:");
                println!("  {}", NoiseBackend::list_names().join(", "));
            }
        }
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&FlowConfig::param_schema())?);
        }
        Command::Grid { sim, output } => {
            let config = sim.to_config()?;
            let field = ParticleField::new(config)?;
            let cached = CachedGrid::from_field(&field);
            match output {
                Some(path) => {
                    cache::write_grid(&cached, &path)?;
                    if !cli.json {
                        eprintln!(
                            "wrote {}x{} grid -> {}",
                            cached.grid.cols(),
                            cached.grid.rows(),
                            path.display()
                        );
                    }
                }
                None => println!("{}", serde_json::to_string_pretty(&cached)?),
            }
        }
        Command::Render {
            sim,
            steps,
            background,
            output,
            grid_cache,
        } => {
            let config = sim.to_config()?;
            let background = Srgb::from_hex(&background)?;

            let mut field = match &grid_cache {
                Some(path) => cache::load_or_build(config, path)?,
                None => ParticleField::new(config)?,
            };

            let mut respawned = 0;
            for _ in 0..steps {
                respawned += field.tick().respawned;
            }
            log::debug!("{steps} ticks, {respawned} respawns");

            flow_field_render::snapshot::write_png(&field, background, &output)?;

            if cli.json {
                let info = serde_json::json!({
                    "params": field.params(),
                    "steps": steps,
                    "respawned": respawned,
                    "output": output.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                let c = field.config();
                eprintln!(
                    "rendered {}x{} flow field ({} particles, {steps} ticks, seed {}) -> {}",
                    c.width,
                    c.height,
                    c.particle_count,
                    c.seed,
                    output.display()
                );
            }
        }
    }

    Ok(())
}

/// Palettes (with their colors) and noise backends as a JSON object.
fn list_info() -> Result<serde_json::Value, CliError> {
    let mut palettes = serde_json::Map::new();
    for name in Palette::list_names() {
        let palette = Palette::from_name(name)?;
        palettes.insert((*name).to_string(), serde_json::to_value(&palette)?);
    }
    Ok(serde_json::json!({
        "palettes": palettes,
        "noise": NoiseBackend::list_names(),
    }))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
