use crate::{
    config::{DepthRangePolicy, DisplayMode, ViewerConfig},
    error::{Result, ViewerError},
    pipeline::{DepthNormalizer, TextureCompositor, build_overlay},
    render::{Renderer, draw_primitives},
    source::FrameSource,
    types::Resolution,
};

/// Runtime adjustments requested by the window between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerCommand {
    ToggleMirror,
    SetDisplayMode(DisplayMode),
}

/// What one tick produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub valid_depth_pixels: u32,
    pub tracked_users: usize,
    pub primitives: usize,
    pub display_mode: DisplayMode,
    pub mirrored: bool,
}

/// Everything a tick needs, built once after the source is negotiated.
pub struct Session {
    source: Box<dyn FrameSource>,
    normalizer: DepthNormalizer,
    compositor: TextureCompositor,
    display_mode: DisplayMode,
    frame_index: u64,
}

impl Session {
    pub fn new(mut source: Box<dyn FrameSource>, config: &ViewerConfig) -> Result<Self> {
        let output = source.output_resolution();
        if output.is_empty() {
            return Err(ViewerError::Configuration(format!(
                "{} source negotiated an empty output mode",
                source.name()
            )));
        }

        let depth = source.depth_frame().resolution();
        let color = source.color_frame().full_resolution();
        if depth != color {
            return Err(ViewerError::Configuration(format!(
                "depth resolution {depth} does not match color resolution {color}"
            )));
        }

        source.set_mirror(config.mirror);
        let normalizer = DepthNormalizer::new(config.depth_policy);
        log::info!(
            "session ready: {} source at {output}, {} mode, mirror {}, out-of-range depth {:?}",
            source.name(),
            config.display_mode.label(),
            if config.mirror { "on" } else { "off" },
            normalizer.policy()
        );

        Ok(Self {
            source,
            normalizer,
            compositor: TextureCompositor::new(output),
            display_mode: config.display_mode,
            frame_index: 0,
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.compositor.resolution()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn is_mirrored(&self) -> bool {
        self.source.is_mirrored()
    }

    pub fn depth_policy(&self) -> DepthRangePolicy {
        self.normalizer.policy()
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn apply(&mut self, command: ViewerCommand) {
        match command {
            ViewerCommand::ToggleMirror => {
                let mirrored = !self.source.is_mirrored();
                self.source.set_mirror(mirrored);
                log::info!("mirror {}", if mirrored { "on" } else { "off" });
            }
            ViewerCommand::SetDisplayMode(mode) => {
                if mode != self.display_mode {
                    log::info!("display mode {}", mode.label());
                }
                self.display_mode = mode;
            }
        }
    }

    /// Waits for the next frame and renders it: texture first, then overlay.
    ///
    /// A source failure aborts the tick before anything is drawn.
    pub fn tick<R>(&mut self, renderer: &mut R) -> Result<FrameStats>
    where
        R: Renderer + ?Sized,
    {
        self.source.wait_for_next_frame()?;
        self.frame_index += 1;

        let intensity = self.normalizer.normalize(self.source.depth_frame())?;
        let texture = match self.display_mode {
            DisplayMode::Color => self.compositor.composite(self.source.color_frame()),
            DisplayMode::Depth => self.compositor.composite_intensity(&intensity),
        };

        let users = self.source.tracked_users();
        let primitives = build_overlay(&users, &*self.source);

        renderer.upload_texture(texture);
        draw_primitives(renderer, &primitives);

        let stats = FrameStats {
            frame_index: self.frame_index,
            valid_depth_pixels: intensity.valid_pixels,
            tracked_users: users.iter().filter(|user| user.is_tracked()).count(),
            primitives: primitives.len(),
            display_mode: self.display_mode,
            mirrored: self.source.is_mirrored(),
        };
        log::debug!("{stats:?}");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::{
        error::SourceError,
        source::JointProvider,
        types::{
            ColorFrame, DepthFrame, Joint, JointName, Point2, Point3, Rgb, Texture, TrackedUser,
            UserId, UserState,
        },
    };

    #[derive(Debug, PartialEq)]
    enum Call {
        Texture(Texture),
        Line(Rgb),
        Point(Rgb),
    }

    #[derive(Default)]
    struct RecordingRenderer {
        calls: Vec<Call>,
    }

    impl Renderer for RecordingRenderer {
        fn upload_texture(&mut self, texture: &Texture) {
            self.calls.push(Call::Texture(texture.clone()));
        }

        fn draw_line(&mut self, _from: Point2, _to: Point2, _width: f32, color: Rgb) {
            self.calls.push(Call::Line(color));
        }

        fn draw_point(&mut self, _at: Point2, _radius: f32, color: Rgb) {
            self.calls.push(Call::Point(color));
        }
    }

    struct ScriptedSource {
        depth: DepthFrame,
        color: ColorFrame,
        users: Vec<TrackedUser>,
        failures: VecDeque<SourceError>,
        mirrored: bool,
    }

    impl ScriptedSource {
        fn new(depth: DepthFrame, color: ColorFrame) -> Self {
            Self {
                depth,
                color,
                users: Vec::new(),
                failures: VecDeque::new(),
                mirrored: false,
            }
        }

        fn tiny() -> Self {
            let full = Resolution::new(2, 2);
            Self::new(
                DepthFrame::new(2, 2, vec![0, 500, 500, 1_000]).unwrap(),
                ColorFrame::new(full, vec![[9, 8, 7]; 4]).unwrap(),
            )
        }
    }

    impl JointProvider for ScriptedSource {
        fn joint(&self, user: UserId, _name: JointName) -> Option<Joint> {
            self.users
                .iter()
                .any(|u| u.id == user)
                .then(|| Joint::new(Point3::new(0.0, 0.0, 1_000.0), 1.0))
        }

        fn project_to_screen(&self, points: &[Point3]) -> Vec<Point2> {
            points.iter().map(|p| Point2::new(p.x, p.y)).collect()
        }
    }

    impl FrameSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn wait_for_next_frame(&mut self) -> Result<(), SourceError> {
            match self.failures.pop_front() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn depth_frame(&self) -> &DepthFrame {
            &self.depth
        }

        fn color_frame(&self) -> &ColorFrame {
            &self.color
        }

        fn tracked_users(&self) -> Vec<TrackedUser> {
            self.users.clone()
        }

        fn output_resolution(&self) -> Resolution {
            self.depth.resolution()
        }

        fn set_mirror(&mut self, mirrored: bool) {
            self.mirrored = mirrored;
        }

        fn is_mirrored(&self) -> bool {
            self.mirrored
        }
    }

    #[test]
    fn mismatched_resolutions_fail_before_the_loop() {
        let source = ScriptedSource::new(
            DepthFrame::blank(Resolution::new(4, 4)),
            ColorFrame::blank(Resolution::new(4, 3)),
        );
        let err = Session::new(Box::new(source), &ViewerConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ViewerError::Configuration(_)));
    }

    #[test]
    fn texture_is_uploaded_before_the_overlay() {
        let mut source = ScriptedSource::tiny();
        source.users = vec![TrackedUser {
            id: UserId(1),
            slot: 1,
            state: UserState::Tracked,
        }];
        let mut session = Session::new(Box::new(source), &ViewerConfig::default()).unwrap();
        let mut renderer = RecordingRenderer::default();

        let stats = session.tick(&mut renderer).unwrap();

        assert!(matches!(&renderer.calls[0], Call::Texture(t) if t.pixels == vec![[9, 8, 7]; 4]));
        assert!(renderer.calls[1..]
            .iter()
            .all(|call| matches!(call, Call::Line(c) | Call::Point(c) if *c == [0, 0, 255])));
        assert_eq!(renderer.calls.len(), 1 + stats.primitives);
        assert_eq!(stats.tracked_users, 1);
        assert_eq!(stats.valid_depth_pixels, 3);
        assert_eq!(stats.frame_index, 1);
    }

    #[test]
    fn source_failure_aborts_the_tick() {
        let mut source = ScriptedSource::tiny();
        source.failures.push_back(SourceError::Disconnected);
        let mut session = Session::new(Box::new(source), &ViewerConfig::default()).unwrap();
        let mut renderer = RecordingRenderer::default();

        let err = session.tick(&mut renderer).unwrap_err();
        assert!(matches!(err, ViewerError::Source(SourceError::Disconnected)));
        assert!(renderer.calls.is_empty());

        assert!(session.tick(&mut renderer).is_ok());
    }

    #[test]
    fn depth_mode_shows_equalized_gray() {
        let config = ViewerConfig {
            display_mode: DisplayMode::Depth,
            ..Default::default()
        };
        let mut session = Session::new(Box::new(ScriptedSource::tiny()), &config).unwrap();
        let mut renderer = RecordingRenderer::default();
        session.tick(&mut renderer).unwrap();

        // Counts 0:0, 500:2, 1000:1 out of 3 samples.
        let Call::Texture(texture) = &renderer.calls[0] else {
            panic!("expected texture first");
        };
        assert_eq!(
            texture.pixels,
            vec![[0, 0, 0], [85, 85, 85], [85, 85, 85], [0, 0, 0]]
        );
    }

    #[test]
    fn out_of_range_depth_is_rejected_under_strict_policy() {
        let full = Resolution::new(2, 1);
        let source = ScriptedSource::new(
            DepthFrame::new(2, 1, vec![10_000, 5]).unwrap(),
            ColorFrame::blank(full),
        );
        let config = ViewerConfig {
            depth_policy: DepthRangePolicy::Reject,
            ..Default::default()
        };
        let mut session = Session::new(Box::new(source), &config).unwrap();
        assert_eq!(session.depth_policy(), DepthRangePolicy::Reject);
        let err = session.tick(&mut RecordingRenderer::default()).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::DataRange {
                value: 10_000,
                index: 0
            }
        ));
    }

    #[test]
    fn commands_toggle_mirror_and_mode() {
        let mut session =
            Session::new(Box::new(ScriptedSource::tiny()), &ViewerConfig::default()).unwrap();
        assert!(!session.is_mirrored());
        session.apply(ViewerCommand::ToggleMirror);
        assert!(session.is_mirrored());
        session.apply(ViewerCommand::SetDisplayMode(DisplayMode::Depth));
        assert_eq!(session.display_mode(), DisplayMode::Depth);
    }

    #[test]
    fn stats_report_the_applied_mirror_state() {
        let mut session =
            Session::new(Box::new(ScriptedSource::tiny()), &ViewerConfig::default()).unwrap();
        let mut renderer = RecordingRenderer::default();

        assert!(!session.tick(&mut renderer).unwrap().mirrored);
        session.apply(ViewerCommand::ToggleMirror);
        assert!(session.tick(&mut renderer).unwrap().mirrored);
        session.apply(ViewerCommand::ToggleMirror);
        assert!(!session.tick(&mut renderer).unwrap().mirrored);
    }

    #[test]
    fn missing_update_is_fatal_for_the_tick() {
        let mut source = ScriptedSource::tiny();
        source.failures.push_back(SourceError::NoUpdate);
        let mut session = Session::new(Box::new(source), &ViewerConfig::default()).unwrap();
        let mut renderer = RecordingRenderer::default();

        let err = session.tick(&mut renderer).unwrap_err();
        assert!(matches!(err, ViewerError::Source(SourceError::NoUpdate)));
        assert!(renderer.calls.is_empty());
    }
}
