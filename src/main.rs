//! Life Worker CLI - Run a headless worker session from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use life_worker::{
    runtime::{Canvas, Controller, DisplayLink, SessionStatus, SurfaceMode},
    schema::SessionConfig,
};

const STATUS_INTERVAL: Duration = Duration::from_millis(250);

/// How often to drain the worker's port.
///
/// Control-owned sessions receive a full frame per display refresh, so they
/// are drained at that cadence to keep the queue short.
fn poll_interval(mode: SurfaceMode) -> Duration {
    match mode {
        SurfaceMode::Control => DisplayLink::DEFAULT_INTERVAL,
        SurfaceMode::Worker => STATUS_INTERVAL,
    }
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [seconds] [--control-surface]", args[0]);
        eprintln!();
        eprintln!("Run a Game of Life worker session from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json        Path to session configuration file");
        eprintln!("  seconds            How long to run the session (default: 5)");
        eprintln!("  --control-surface  Keep the surface on this thread and receive frames");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let seconds: f64 = args
        .iter()
        .skip(2)
        .find_map(|s| s.parse().ok())
        .unwrap_or(5.0);
    let mode = if args.iter().any(|a| a == "--control-surface") {
        SurfaceMode::Control
    } else {
        SurfaceMode::Worker
    };

    let config = SessionConfig::from_path(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    let Some((surface_width, surface_height)) = config.surface_size() else {
        eprintln!("Error: drawable for this grid does not fit in u32");
        std::process::exit(1);
    };

    println!("Life Worker Session");
    println!("===================");
    println!("Grid: {}x{} (cell size {})", config.width, config.height, config.cell_size);
    println!("Surface: {}x{} px, {:?}-owned", surface_width, surface_height, mode);
    println!("Tick interval: {:.2}ms", config.tick_interval_ms);
    println!("Colors: dead {}, alive {}", config.dead_color, config.alive_color);
    println!("Duration: {}s", seconds);
    println!();

    let canvas = Canvas::new(surface_width, surface_height);
    let mut controller = Controller::spawn(canvas).unwrap_or_else(|e| {
        eprintln!("Error starting worker: {}", e);
        std::process::exit(1);
    });
    if let Err(e) = controller.initialize(&config, mode) {
        eprintln!("Error initializing session: {}", e);
        std::process::exit(1);
    }

    println!("Running session...");
    let start = Instant::now();
    let run_for = Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX);
    let poll_every = poll_interval(mode);
    let mut frames = 0u64;
    let mut fps_sum = 0u64;
    let mut last_status = start;
    let mut frames_since_status = 0usize;

    while start.elapsed() < run_for {
        thread::sleep(poll_every);
        let updates = controller.poll();
        frames += updates.len() as u64;
        fps_sum += updates.iter().map(|u| u64::from(u.fps)).sum::<u64>();
        frames_since_status += updates.len();

        if controller.status() == SessionStatus::Failed {
            eprintln!("Worker ended the session early");
            break;
        }
        if last_status.elapsed() >= STATUS_INTERVAL {
            println!(
                "  {:>6.2}s: {} fps ({} frames since last report)",
                start.elapsed().as_secs_f32(),
                controller.fps(),
                frames_since_status
            );
            last_status = Instant::now();
            frames_since_status = 0;
        }
    }

    let elapsed = start.elapsed();
    let live_cells = match controller.canvas().contents() {
        Ok(pixmap) => Some(count_live_cells(&config, pixmap)),
        Err(_) => None,
    };

    if let Err(e) = controller.shutdown() {
        eprintln!("Worker error: {}", e);
        std::process::exit(1);
    }

    println!();
    println!("Summary:");
    println!("  Frames received: {}", frames);
    if frames > 0 {
        println!("  Mean reported fps: {:.1}", fps_sum as f64 / frames as f64);
    }
    if let Some(live) = live_cells {
        println!("  Live cells in last frame: {}", live);
    }
    println!("  Time: {:.2}s", elapsed.as_secs_f32());
}

/// Count sprites drawn in the alive color in a committed frame.
fn count_live_cells(config: &SessionConfig, pixmap: &life_worker::runtime::Pixmap) -> usize {
    let alive = life_worker::runtime::Rgba::from(config.alive_color);
    let pitch = config.cell_pitch();
    (0..config.height)
        .flat_map(|row| (0..config.width).map(move |col| (row, col)))
        .filter(|&(row, col)| pixmap.pixel(col * pitch + 1, row * pitch + 1) == Some(alive))
        .count()
}

fn print_example_config() {
    let config = SessionConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
