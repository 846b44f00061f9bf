#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crossbeam_channel::bounded;
use gpui::Application;
use skeleton_viewer::{
    DepthRangePolicy, DisplayMode, SourceKind, ViewerConfig,
    frame_loop::{run_headless, start_frame_loop},
    types::Resolution,
    ui,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceArg {
    /// Built-in animated scene with tracked users
    Synthetic,
    /// Color from a webcam; no depth and no users
    #[cfg(feature = "camera-nokhwa")]
    Webcam,
}

#[derive(Parser, Debug)]
#[command(name = "skeleton-viewer")]
#[command(about = "Depth, color and skeleton tracking viewer")]
#[command(version)]
struct Cli {
    /// Frame source to open
    #[arg(long, value_enum, default_value = "synthetic")]
    source: SourceArg,

    /// Webcam index (from --list-webcams)
    #[arg(long, default_value = "0")]
    camera: u32,

    /// List available webcams and exit
    #[cfg(feature = "camera-nokhwa")]
    #[arg(long)]
    list_webcams: bool,

    /// Synthetic output width
    #[arg(long, default_value = "640")]
    width: u32,

    /// Synthetic output height
    #[arg(long, default_value = "480")]
    height: u32,

    /// Synthetic population size
    #[arg(long, default_value = "3")]
    users: usize,

    /// Synthetic frame rate; 0 runs as fast as possible
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Start in depth display mode
    #[arg(long)]
    depth_view: bool,

    /// Start mirrored
    #[arg(long)]
    mirror: bool,

    /// Fail on depth samples past the histogram range instead of clamping
    #[arg(long)]
    strict_depth: bool,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Ticks to run in headless mode
    #[arg(long, default_value = "300")]
    frames: u64,
}

impl Cli {
    fn viewer_config(&self) -> ViewerConfig {
        let source = match self.source {
            SourceArg::Synthetic => SourceKind::Synthetic,
            #[cfg(feature = "camera-nokhwa")]
            SourceArg::Webcam => SourceKind::Webcam { index: self.camera },
        };

        ViewerConfig {
            source,
            output: Resolution::new(self.width, self.height),
            users: self.users,
            fps: self.fps,
            display_mode: if self.depth_view {
                DisplayMode::Depth
            } else {
                DisplayMode::Color
            },
            mirror: self.mirror,
            depth_policy: if self.strict_depth {
                DepthRangePolicy::Reject
            } else {
                DepthRangePolicy::Clamp
            },
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    #[cfg(feature = "camera-nokhwa")]
    if cli.list_webcams {
        return list_webcams();
    }

    let config = cli.viewer_config();
    if cli.headless {
        let summary = run_headless(&config, cli.frames).context("headless run failed")?;
        log::info!(
            "headless run finished: {} frames, up to {} tracked users",
            summary.frames,
            summary.peak_tracked_users
        );
        return Ok(());
    }

    let (command_tx, command_rx) = bounded(8);
    let (event_tx, event_rx) = bounded(1);
    let frame_loop =
        start_frame_loop(config.clone(), command_rx, event_tx).context("failed to open source")?;

    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            if let Err(err) = ui::launch_ui(app, &config, frame_loop, event_rx, command_tx) {
                log::error!("failed to launch ui: {err:?}");
                app.quit();
            }
        });

    Ok(())
}

#[cfg(feature = "camera-nokhwa")]
fn list_webcams() -> Result<()> {
    let webcams =
        skeleton_viewer::source::available_webcams().context("failed to query webcams")?;
    if webcams.is_empty() {
        println!("No webcams found");
    }
    for webcam in webcams {
        println!("{}: {}", webcam.index, webcam.label);
    }
    Ok(())
}
