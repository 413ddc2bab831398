pub mod capture;

pub use capture::{Frame, FrameSource, LatestFrame};
