//! meshshot CLI: render a glTF model to a PNG file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use meshshot::gltf;
use meshshot::rasterizer::{self, RenderOptions, Vec3, compute_world_aabb};

/// Render a glTF 2.0 model to PNG with a software rasterizer
#[derive(Parser, Debug)]
#[command(name = "meshshot", version, about = "Pure-CPU glTF renderer")]
struct Args {
    /// Path to the model (.gltf or .glb)
    model: PathBuf,

    /// Output PNG path
    #[arg(long, default_value = "out.png")]
    out: PathBuf,

    /// Output width in pixels
    #[arg(long = "w", default_value_t = 800)]
    width: usize,

    /// Output height in pixels
    #[arg(long = "h", default_value_t = 600)]
    height: usize,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 60.0)]
    fov: f32,

    /// Ambient light term (0..1)
    #[arg(long, default_value_t = 0.15)]
    ambient: f32,

    /// Light direction as x,y,z
    #[arg(long, value_parser = parse_vec3, default_value = "-0.4,-0.9,-0.2", allow_hyphen_values = true)]
    light: Vec3,

    /// Camera position as x,y,z; auto-framed from the scene when omitted
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    cam: Option<Vec3>,

    /// Look-at target as x,y,z; scene center when omitted
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    look: Option<Vec3>,

    /// Disable screen-space back-face culling
    #[arg(long = "noCull")]
    no_cull: bool,

    /// Disable the sRGB output encode
    #[arg(long = "noGamma")]
    no_gamma: bool,

    /// Draw a floor grid under the scene
    #[arg(long)]
    grid: bool,

    /// Force the grid extent instead of sizing it from the scene
    #[arg(long = "gridSize")]
    grid_size: Option<f32>,

    /// Background color as linear r,g,b in 0..1 (transparent when omitted)
    #[arg(long = "bg", value_parser = parse_rgb)]
    background: Option<[f32; 3]>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_components<const N: usize>(s: &str) -> Result<[f32; N], String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != N {
        return Err(format!("expected {N} comma-separated numbers, got {:?}", s));
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .trim()
            .parse::<f32>()
            .map_err(|e| format!("bad component {part:?}: {e}"))?;
    }
    Ok(out)
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let [x, y, z] = parse_components::<3>(s)?;
    Ok(Vec3::new(x, y, z))
}

fn parse_rgb(s: &str) -> Result<[f32; 3], String> {
    parse_components::<3>(s)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let draw_calls = gltf::load(&args.model)
        .with_context(|| format!("failed to load {}", args.model.display()))?;

    if args.verbose {
        let triangles: usize = draw_calls
            .iter()
            .map(|dc| dc.effective_indices().len() / dc.mode.arity())
            .sum();
        let aabb = compute_world_aabb(&draw_calls);
        debug!(
            "{} draw calls, {} primitives, bounds {:?} .. {:?}",
            draw_calls.len(),
            triangles,
            aabb.min,
            aabb.max
        );
    }

    let options = RenderOptions {
        width: args.width,
        height: args.height,
        fov: args.fov,
        cam_pos: args.cam,
        look_at: args.look,
        light_dir: args.light,
        ambient: args.ambient,
        cull: !args.no_cull,
        gamma: !args.no_gamma,
        background: args.background,
        grid: args.grid,
        grid_size: args.grid_size,
    };

    let output = rasterizer::render(&draw_calls, &options)?;
    output
        .bitmap
        .save_png(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    println!(
        "wrote {}x{} image to {}",
        output.bitmap.width,
        output.bitmap.height,
        args.out.display()
    );
    Ok(())
}
