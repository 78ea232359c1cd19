use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nalgebra::Vector3;
use prism::api::{arrival_direction, AnySurface, SamplingSurface, Surface};
use rand::{rngs::StdRng, SeedableRng};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

mod io;
mod provenance;

use provenance::{write_sidecar, Payload};

#[derive(Parser, Debug)]
#[command(name = "prism-cli")]
#[command(about = "Build and query detector sampling surfaces")]
struct Cmd {
    /// Optional VK ticket UUID; propagated to outputs and logs
    #[arg(long, global = true)]
    vk: Option<String>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Build an extruded hull from a `string,om,x,y,z` position table
    Import {
        #[arg(long)]
        positions: PathBuf,
        #[arg(long, default_value_t = 0.0)]
        padding: f64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Pad a surface outwards
    Expand {
        #[arg(long)]
        surface: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        padding: f64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Projected area seen from an arrival direction (degrees)
    Area {
        #[arg(long)]
        surface: PathBuf,
        #[arg(long)]
        zenith: f64,
        #[arg(long, default_value_t = 0.0)]
        azimuth: f64,
    },
    /// Entry and exit parameters of a ray
    Intersect {
        #[arg(long)]
        surface: PathBuf,
        /// `x,y,z`
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        origin: Vector3<f64>,
        /// `x,y,z`; need not be unit length
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        direction: Vector3<f64>,
    },
    /// Projected area integrated over a zenith band and all azimuths
    Acceptance {
        #[arg(long)]
        surface: PathBuf,
        #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
        cos_min: f64,
        #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
        cos_max: f64,
    },
    /// Draw impact rays from an isotropic flux (CSV, or Parquet by extension)
    Sample {
        #[arg(long)]
        surface: PathBuf,
        #[arg(long, default_value_t = 1000)]
        count: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
        cos_min: f64,
        #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
        cos_max: f64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Print a small provenance JSON block
    Report,
}

fn parse_vec3(s: &str) -> std::result::Result<Vector3<f64>, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("`{p}`: {e}")))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    match parts[..] {
        [x, y, z] => Ok(Vector3::new(x, y, z)),
        _ => Err(format!("expected x,y,z, got {} components", parts.len())),
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    run(Cmd::parse())
}

fn run(cmd: Cmd) -> Result<()> {
    let vk = cmd.vk;
    match cmd.action {
        Action::Import {
            positions,
            padding,
            out,
        } => import(positions, padding, out, vk),
        Action::Expand {
            surface,
            padding,
            out,
        } => expand(surface, padding, out, vk),
        Action::Area {
            surface,
            zenith,
            azimuth,
        } => area(surface, zenith, azimuth),
        Action::Intersect {
            surface,
            origin,
            direction,
        } => intersect(surface, origin, direction),
        Action::Acceptance {
            surface,
            cos_min,
            cos_max,
        } => acceptance(surface, cos_min, cos_max),
        Action::Sample {
            surface,
            count,
            seed,
            cos_min,
            cos_max,
            out,
        } => sample(surface, count, seed, (cos_min, cos_max), out, vk),
        Action::Report => report(vk),
    }
}

fn import(positions: PathBuf, padding: f64, out: PathBuf, vk: Option<String>) -> Result<()> {
    tracing::info!(positions = %positions.display(), padding, vk = ?vk, "import");
    let footprint = io::read_footprint(&positions)?;
    let surface = AnySurface::from(footprint.to_surface(padding)?);
    io::write_surface(&out, &surface)?;
    let params = json!({
        "positions": positions,
        "padding": padding,
        "strings": footprint.strings.len(),
    });
    write_sidecar(&out, Payload::new("import", params).with_vk(vk))?;
    Ok(())
}

fn expand(path: PathBuf, padding: f64, out: PathBuf, vk: Option<String>) -> Result<()> {
    tracing::info!(surface = %path.display(), padding, vk = ?vk, "expand");
    let surface = io::read_surface(&path)?;
    let expanded = surface
        .expand(padding)
        .with_context(|| format!("expanding {} by {padding}", path.display()))?;
    io::write_surface(&out, &expanded)?;
    let params = json!({ "surface": path, "padding": padding });
    write_sidecar(&out, Payload::new("expand", params).with_vk(vk))?;
    Ok(())
}

fn area(path: PathBuf, zenith: f64, azimuth: f64) -> Result<()> {
    let surface = io::read_surface(&path)?;
    let arrival = arrival_direction(zenith.to_radians().cos(), azimuth.to_radians());
    let area = surface.projected_area(-arrival)?;
    tracing::debug!(shape = surface.name(), zenith, azimuth, area, "projected area");
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "zenith_deg": zenith,
            "azimuth_deg": azimuth,
            "projected_area": area,
        }))?
    );
    Ok(())
}

fn intersect(path: PathBuf, origin: Vector3<f64>, direction: Vector3<f64>) -> Result<()> {
    let surface = io::read_surface(&path)?;
    let (t_near, t_far) = surface
        .intersect(origin, direction)
        .context("intersecting ray")?;
    let hit = !t_near.is_nan();
    let point = |t: f64| hit.then(|| <[f64; 3]>::from(origin + direction * t));
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "hit": hit,
            "t_near": t_near,
            "t_far": t_far,
            "entry": point(t_near),
            "exit": point(t_far),
        }))?
    );
    Ok(())
}

fn acceptance(path: PathBuf, cos_min: f64, cos_max: f64) -> Result<()> {
    let surface = io::read_surface(&path)?;
    let value = surface.acceptance(cos_min, cos_max)?;
    let peak = surface.as_upright().map(|s| s.max_differential_area());
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "shape": surface.name(),
            "cos_min": cos_min,
            "cos_max": cos_max,
            "acceptance": value,
            "max_differential_area": peak,
        }))?
    );
    Ok(())
}

fn sample(
    path: PathBuf,
    count: usize,
    seed: u64,
    (cos_min, cos_max): (f64, f64),
    out: PathBuf,
    vk: Option<String>,
) -> Result<()> {
    tracing::info!(surface = %path.display(), count, seed, cos_min, cos_max, vk = ?vk, "sample");
    let surface = io::read_surface(&path)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let rays = (0..count)
        .map(|_| surface.sample_impact_ray(&mut rng, cos_min, cos_max))
        .collect::<prism::Result<Vec<_>>>()
        .context("sampling impact rays")?;
    io::write_rays(&out, &rays)?;
    // Each ray carries acceptance / count of the total rate.
    let acceptance = surface.acceptance(cos_min, cos_max)?;
    let params = json!({
        "surface": path,
        "shape": surface.name(),
        "count": count,
        "seed": seed,
        "cos_min": cos_min,
        "cos_max": cos_max,
        "acceptance": acceptance,
    });
    write_sidecar(&out, Payload::new("sample", params).with_vk(vk))?;
    tracing::info!(rays = rays.len(), acceptance, out = %out.display(), "wrote samples");
    Ok(())
}

fn report(vk: Option<String>) -> Result<()> {
    let doc = provenance::document(&Payload::new("report", json!({})).with_vk(vk), &[]);
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
