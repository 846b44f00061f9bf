pub mod config;
pub mod error;
pub mod frame_loop;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod source;
pub mod types;
pub mod ui;

pub use config::{DepthRangePolicy, DisplayMode, SourceKind, ViewerConfig};
pub use error::{Result, SourceError, ViewerError};
pub use session::{FrameStats, Session, ViewerCommand};
