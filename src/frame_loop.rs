use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use anyhow::{Context, anyhow};
use crossbeam_channel::{Receiver, Sender, bounded};

use crate::{
    config::ViewerConfig,
    error::Result,
    render::CanvasRenderer,
    session::{FrameStats, Session, ViewerCommand},
    source::open_source,
    types::{Frame, Resolution},
};

const FAILURE_SEND_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct RenderedFrame {
    pub frame: Frame,
    pub stats: FrameStats,
}

#[derive(Debug)]
pub enum LoopEvent {
    Frame(RenderedFrame),
    /// The loop hit a fatal error and has exited.
    Failed(String),
}

/// Handle to the worker thread that owns the [`Session`].
#[derive(Debug)]
pub struct FrameLoop {
    resolution: Resolution,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FrameLoop {
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Opens the source on a worker thread and ticks it until stopped or failed.
///
/// Returns once the session is negotiated, so configuration errors surface
/// here rather than as a [`LoopEvent::Failed`].
pub fn start_frame_loop(
    config: ViewerConfig,
    command_rx: Receiver<ViewerCommand>,
    event_tx: Sender<LoopEvent>,
) -> anyhow::Result<FrameLoop> {
    let (ready_tx, ready_rx) = bounded::<std::result::Result<Resolution, String>>(1);
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::Builder::new()
        .name("frame-loop".into())
        .spawn(move || {
            // Sources may hold non-Send device handles, so they live and die here.
            let session = open_source(&config).and_then(|source| Session::new(source, &config));
            let mut session = match session {
                Ok(session) => {
                    let _ = ready_tx.send(Ok(session.resolution()));
                    session
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err.to_string()));
                    return;
                }
            };

            let mut renderer = CanvasRenderer::new();
            while !stop_flag.load(Ordering::Relaxed) {
                for command in command_rx.try_iter() {
                    session.apply(command);
                }

                match session.tick(&mut renderer) {
                    Ok(stats) => {
                        let frame = RenderedFrame {
                            frame: renderer.snapshot(),
                            stats,
                        };
                        // Drop if the window is busy, otherwise forward every frame.
                        let _ = event_tx.try_send(LoopEvent::Frame(frame));
                    }
                    Err(err) => {
                        log::error!("frame loop stopped: {err:?}");
                        let _ = event_tx
                            .send_timeout(LoopEvent::Failed(err.to_string()), FAILURE_SEND_TIMEOUT);
                        break;
                    }
                }
            }
            log::info!("{} frame loop finished", session.source_name());
        })
        .context("failed to spawn frame loop thread")?;

    let mut frame_loop = FrameLoop {
        resolution: Resolution::new(0, 0),
        stop,
        handle: Some(handle),
    };

    match ready_rx.recv() {
        Ok(Ok(resolution)) => {
            frame_loop.resolution = resolution;
            Ok(frame_loop)
        }
        Ok(Err(message)) => Err(anyhow!("failed to start session: {message}")),
        Err(_) => Err(anyhow!("frame loop exited during startup")),
    }
}

/// Totals from a headless run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeadlessSummary {
    pub frames: u64,
    pub peak_tracked_users: usize,
    pub last: Option<FrameStats>,
}

impl HeadlessSummary {
    fn record(&mut self, stats: FrameStats) {
        self.frames += 1;
        self.peak_tracked_users = self.peak_tracked_users.max(stats.tracked_users);
        self.last = Some(stats);
    }
}

/// Runs `frames` ticks on the calling thread against a canvas renderer.
pub fn run_headless(config: &ViewerConfig, frames: u64) -> Result<HeadlessSummary> {
    let source = open_source(config)?;
    let mut session = Session::new(source, config)?;
    run_ticks(&mut session, &mut CanvasRenderer::new(), frames)
}

fn run_ticks(
    session: &mut Session,
    renderer: &mut CanvasRenderer,
    frames: u64,
) -> Result<HeadlessSummary> {
    let mut summary = HeadlessSummary::default();
    for _ in 0..frames {
        let stats = session.tick(renderer)?;
        if stats.frame_index % 30 == 0 {
            log::info!(
                "frame {}: {} tracked users, {} primitives, {} valid depth pixels",
                stats.frame_index,
                stats.tracked_users,
                stats.primitives,
                stats.valid_depth_pixels
            );
        }
        summary.record(stats);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{SourceError, ViewerError},
        source::SyntheticSource,
    };

    fn fast_config() -> ViewerConfig {
        ViewerConfig {
            output: Resolution::new(80, 60),
            fps: 0,
            ..Default::default()
        }
    }

    #[test]
    fn loop_forwards_frames_and_commands() {
        let (command_tx, command_rx) = bounded(4);
        let (event_tx, event_rx) = bounded(1);
        let frame_loop = start_frame_loop(fast_config(), command_rx, event_tx).unwrap();
        assert_eq!(frame_loop.resolution(), Resolution::new(80, 60));

        command_tx
            .send(ViewerCommand::SetDisplayMode(crate::config::DisplayMode::Depth))
            .unwrap();

        let mut saw_depth_mode = false;
        for _ in 0..50 {
            match event_rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                LoopEvent::Frame(rendered) => {
                    assert_eq!(rendered.frame.rgba.len(), 80 * 60 * 4);
                    if rendered.stats.display_mode == crate::config::DisplayMode::Depth {
                        saw_depth_mode = true;
                        break;
                    }
                }
                LoopEvent::Failed(message) => panic!("loop failed: {message}"),
            }
        }
        assert!(saw_depth_mode);
        frame_loop.stop();
    }

    #[test]
    fn empty_output_mode_fails_at_startup() {
        let (_command_tx, command_rx) = bounded(1);
        let (event_tx, _event_rx) = bounded(1);
        let config = ViewerConfig {
            output: Resolution::new(0, 0),
            ..fast_config()
        };
        assert!(start_frame_loop(config, command_rx, event_tx).is_err());
    }

    #[test]
    fn headless_runs_requested_ticks() {
        let summary = run_headless(&fast_config(), 5).unwrap();
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.last.map(|s| s.frame_index), Some(5));
        assert_eq!(summary.peak_tracked_users, 0);
    }

    #[test]
    fn unbounded_tick_count_stops_at_source_end() {
        let config = fast_config();
        let source = SyntheticSource::new(config.output, 1, 0)
            .unwrap()
            .with_frame_limit(3);
        let mut session = Session::new(Box::new(source), &config).unwrap();

        let err = run_ticks(&mut session, &mut CanvasRenderer::new(), u64::MAX).unwrap_err();
        assert!(matches!(err, ViewerError::Source(SourceError::Disconnected)));
    }
}
