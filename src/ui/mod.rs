use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender};
use gpui::{
    AnyElement, App, AppContext, Bounds, Context, Hsla, IntoElement, ObjectFit, ParentElement, Render,
    RenderImage, SharedString, Styled, StyledImage, TitlebarOptions, Window, WindowBounds,
    WindowOptions, div, img, px, size,
};
use gpui_component::{
    ActiveTheme, Root,
    button::{Button, ButtonVariants},
    h_flex, v_flex,
};
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::{
    config::{DisplayMode, ViewerConfig},
    frame_loop::{FrameLoop, LoopEvent},
    session::{FrameStats, ViewerCommand},
    types::Resolution,
};

mod render_util;
mod status_bar;

use render_util::frame_to_image;
use status_bar::ControlState;

const STATUS_BAR_HEIGHT: f32 = 56.0;
const FAILURE_LINGER: Duration = Duration::from_secs(3);

pub fn launch_ui(
    app: &mut App,
    config: &ViewerConfig,
    frame_loop: FrameLoop,
    event_rx: Receiver<LoopEvent>,
    command_tx: Sender<ViewerCommand>,
) -> gpui::Result<()> {
    let resolution = frame_loop.resolution();
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some("Skeleton Viewer".into()),
            appears_transparent: false,
            traffic_light_position: None,
        }),
        window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
            None,
            size(
                px(resolution.width as f32),
                px(resolution.height as f32 + STATUS_BAR_HEIGHT),
            ),
            app,
        ))),
        ..Default::default()
    };

    let configured = ControlState {
        display_mode: config.display_mode,
        mirrored: config.mirror,
    };
    app.open_window(window_options, move |window, app| {
        let view = app.new(|_| ViewerView::new(frame_loop, event_rx, command_tx, configured));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct Failure {
    message: String,
    at: Instant,
}

struct ViewerView {
    event_rx: Receiver<LoopEvent>,
    command_tx: Sender<ViewerCommand>,
    resolution: Resolution,
    configured: ControlState,
    latest_image: Option<Arc<RenderImage>>,
    latest_stats: Option<FrameStats>,
    failure: Option<Failure>,
    _frame_loop: FrameLoop,
}

impl ViewerView {
    fn new(
        frame_loop: FrameLoop,
        event_rx: Receiver<LoopEvent>,
        command_tx: Sender<ViewerCommand>,
        configured: ControlState,
    ) -> Self {
        Self {
            event_rx,
            command_tx,
            resolution: frame_loop.resolution(),
            configured,
            latest_image: None,
            latest_stats: None,
            failure: None,
            _frame_loop: frame_loop,
        }
    }

    /// Controls as the frame loop last applied them.
    fn controls(&self) -> ControlState {
        ControlState::current(self.latest_stats.as_ref(), self.configured)
    }

    fn send(&self, command: ViewerCommand) {
        if let Err(err) = self.command_tx.try_send(command) {
            log::warn!("dropped viewer command {command:?}: {err:?}");
        }
    }

    fn poll_events(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let events: Vec<LoopEvent> = self.event_rx.try_iter().collect();
        for event in events {
            match event {
                LoopEvent::Frame(rendered) => {
                    if let Some(image) = frame_to_image(&rendered.frame) {
                        self.replace_latest_image(image, window, cx);
                    }
                    self.resolution = Resolution::new(rendered.frame.width, rendered.frame.height);
                    self.latest_stats = Some(rendered.stats);
                }
                LoopEvent::Failed(message) => {
                    log::error!("viewer stopping: {message}");
                    self.failure = Some(Failure {
                        message,
                        at: Instant::now(),
                    });
                }
            }
        }
    }

    fn replace_latest_image(
        &mut self,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if let Some(old_image) = self.latest_image.replace(new_image) {
            // The sprite atlas keeps every uploaded frame until told otherwise.
            cx.drop_image(old_image, Some(window));
        }
    }

    fn render_frame(&self) -> AnyElement {
        if let Some(image) = &self.latest_image {
            return img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .into_any_element();
        }

        div()
            .size_full()
            .flex()
            .items_center()
            .justify_center()
            .text_sm()
            .text_color(gpui::rgb(0x8b95a5))
            .child(format!("Waiting for {} frames...", self.resolution))
            .into_any_element()
    }
}

impl Render for ViewerView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) -> impl IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        self.poll_events(window, cx);
        if self
            .failure
            .as_ref()
            .is_some_and(|failure| failure.at.elapsed() >= FAILURE_LINGER)
        {
            cx.quit();
        }

        let frame_view = self.render_frame();
        let status_bar = self.render_status_bar(cx);

        v_flex()
            .size_full()
            .bg(gpui::rgb(0x000000))
            .child(div().flex_1().overflow_hidden().child(frame_view))
            .child(status_bar)
    }
}
