use std::env;
use std::fs;
use std::path::PathBuf;

use engine::{EngineOptions, MapEngine};
use proj::{GeoPoint, Viewport};
use tiles::{HttpTileSource, JsonTileDecoder};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wgpu_backend::WgpuDevice;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<(), String> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let cmd = args[1].clone();
    args.drain(0..2);

    match cmd.as_str() {
        "render" => cmd_render(args).await,
        _ => Err(usage()),
    }
}

struct RenderArgs {
    output: PathBuf,
    base_url: String,
    center: GeoPoint,
    zoom: f64,
    width: u32,
    height: u32,
    layer: String,
    options: EngineOptions,
}

fn parse_render_args(args: Vec<String>) -> Result<RenderArgs, String> {
    if args.is_empty() {
        return Err(usage());
    }

    let mut parsed = RenderArgs {
        output: PathBuf::from(&args[0]),
        base_url: "http://localhost:3000".to_string(),
        center: GeoPoint::new(0.0, 0.0),
        zoom: 2.0,
        width: 800,
        height: 600,
        layer: "default".to_string(),
        options: EngineOptions::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--base-url" => {
                i += 1;
                if i >= args.len() {
                    return Err("--base-url requires a value".to_string());
                }
                parsed.base_url = args[i].clone();
            }
            "--center" => {
                i += 1;
                if i >= args.len() {
                    return Err("--center requires LON,LAT".to_string());
                }
                let (lon, lat) = args[i]
                    .split_once(',')
                    .ok_or_else(|| "--center must be LON,LAT".to_string())?;
                parsed.center = GeoPoint::new(
                    lon.trim()
                        .parse::<f64>()
                        .map_err(|_| "--center longitude must be a number".to_string())?,
                    lat.trim()
                        .parse::<f64>()
                        .map_err(|_| "--center latitude must be a number".to_string())?,
                );
            }
            "--zoom" => {
                i += 1;
                if i >= args.len() {
                    return Err("--zoom requires a value".to_string());
                }
                parsed.zoom = args[i]
                    .parse::<f64>()
                    .map_err(|_| "--zoom must be a number".to_string())?;
            }
            "--size" => {
                i += 1;
                if i >= args.len() {
                    return Err("--size requires WxH".to_string());
                }
                let (w, h) = args[i]
                    .split_once('x')
                    .ok_or_else(|| "--size must be WxH".to_string())?;
                parsed.width = w
                    .parse::<u32>()
                    .map_err(|_| "--size width must be an integer".to_string())?;
                parsed.height = h
                    .parse::<u32>()
                    .map_err(|_| "--size height must be an integer".to_string())?;
            }
            "--layer" => {
                i += 1;
                if i >= args.len() {
                    return Err("--layer requires a name".to_string());
                }
                parsed.layer = args[i].clone();
            }
            "--options" => {
                i += 1;
                if i >= args.len() {
                    return Err("--options requires a path".to_string());
                }
                let path = PathBuf::from(&args[i]);
                let text = fs::read_to_string(&path).map_err(|e| format!("read {path:?}: {e}"))?;
                parsed.options =
                    serde_json::from_str(&text).map_err(|e| format!("parse {path:?}: {e}"))?;
            }
            other => {
                return Err(format!("unknown arg: {other}\n\n{}", usage()));
            }
        }
        i += 1;
    }

    if parsed.width == 0 || parsed.height == 0 {
        return Err("--size must be non-zero".to_string());
    }

    Ok(parsed)
}

async fn cmd_render(args: Vec<String>) -> Result<(), String> {
    // slippy render <output.png> [--base-url URL] [--center LON,LAT]
    //               [--zoom Z] [--size WxH] [--layer NAME] [--options FILE]
    let args = parse_render_args(args)?;

    let device = WgpuDevice::headless(args.width, args.height).map_err(|e| format!("gpu: {e}"))?;
    let source = HttpTileSource::new(&args.base_url);
    let mut engine = MapEngine::new(device, source, JsonTileDecoder, args.options)
        .map_err(|e| format!("engine setup: {e}"))?;

    let viewport = Viewport::new(args.center, args.zoom, args.width, args.height, &args.layer);
    let stats = engine
        .render(&viewport)
        .await
        .map_err(|e| format!("render: {e}"))?;
    info!(
        tiles = stats.tiles_requested,
        features = stats.features_drawn,
        "frame complete"
    );

    let pixels = engine.device().read_pixels();
    let img = image::RgbaImage::from_raw(args.width, args.height, pixels)
        .ok_or_else(|| "pixel read-back size mismatch".to_string())?;
    img.save(&args.output)
        .map_err(|e| format!("write {:?}: {e}", args.output))?;

    engine.dispose();
    eprintln!("wrote {}", args.output.display());
    Ok(())
}

fn usage() -> String {
    let exe = env::args().next().unwrap_or_else(|| "slippy".to_string());
    format!(
        "Usage:\n  {exe} render <output.png> [--base-url URL] [--center LON,LAT] [--zoom Z] [--size WxH] [--layer NAME] [--options FILE]\n\nNotes:\n- Tiles are fetched from {{base-url}}/api/maps/tiles/{{z}}/{{x}}/{{y}}.mvt?layer={{layer}}.\n- The options file is JSON with the same fields as the engine defaults; missing fields keep their defaults.\n- Set RUST_LOG=debug for per-frame logging.\n"
    )
}
