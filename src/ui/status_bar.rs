use super::{
    ActiveTheme, AnyElement, Button, ButtonVariants, Context, DisplayMode, FrameStats, Hsla,
    IntoElement, ParentElement, STATUS_BAR_HEIGHT, SharedString, Styled, ViewerCommand,
    ViewerView, div, h_flex, px,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct ControlState {
    pub display_mode: DisplayMode,
    pub mirrored: bool,
}

impl ControlState {
    /// Prefers what the last frame reports over the startup configuration.
    pub fn current(latest: Option<&FrameStats>, configured: Self) -> Self {
        latest.map_or(configured, |stats| Self {
            display_mode: stats.display_mode,
            mirrored: stats.mirrored,
        })
    }

    fn mirror_label(self) -> &'static str {
        if self.mirrored {
            "Mirror: on"
        } else {
            "Mirror: off"
        }
    }

    fn mode_label(self) -> String {
        format!("View: {}", self.display_mode.toggled().label())
    }
}

impl ViewerView {
    pub(super) fn render_status_bar(&self, cx: &mut Context<'_, Self>) -> AnyElement {
        let theme = cx.theme();
        let failure_color: Hsla = gpui::rgb(0xfca5a5).into();

        let (status_text, status_color) = match (&self.failure, &self.latest_stats) {
            (Some(failure), _) => (format!("Stopped: {}", failure.message), failure_color),
            (None, Some(stats)) => (
                format!(
                    "frame {} | {} tracked | {} mode",
                    stats.frame_index,
                    stats.tracked_users,
                    stats.display_mode.label()
                ),
                theme.success,
            ),
            (None, None) => ("Waiting for first frame".to_string(), theme.muted_foreground),
        };

        let controls = self.controls();

        h_flex()
            .h(px(STATUS_BAR_HEIGHT))
            .w_full()
            .px_3()
            .gap_2()
            .items_center()
            .justify_between()
            .bg(gpui::rgb(0x1a2332))
            .child(
                div()
                    .text_xs()
                    .text_color(status_color)
                    .overflow_hidden()
                    .text_ellipsis()
                    .whitespace_nowrap()
                    .child(status_text),
            )
            .child(
                h_flex()
                    .gap_2()
                    .child(
                        Button::new(SharedString::from("toggle-mirror"))
                            .outline()
                            .label(controls.mirror_label())
                            .on_click(cx.listener(|this, _, _, cx| {
                                this.send(ViewerCommand::ToggleMirror);
                                cx.notify();
                            })),
                    )
                    .child(
                        Button::new(SharedString::from("toggle-display-mode"))
                            .outline()
                            .label(controls.mode_label())
                            .on_click(cx.listener(|this, _, _, cx| {
                                let next = this.controls().display_mode.toggled();
                                this.send(ViewerCommand::SetDisplayMode(next));
                                cx.notify();
                            })),
                    )
                    .child(
                        Button::new(SharedString::from("quit"))
                            .outline()
                            .label("Quit")
                            .on_click(cx.listener(|_, _, _, cx| {
                                cx.quit();
                            })),
                    ),
            )
            .into_any_element()
    }
}
