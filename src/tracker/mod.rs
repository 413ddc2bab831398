pub mod acquisition;
pub mod fps;
pub mod session;
pub mod smooth;

pub use acquisition::{AcquisitionLoop, LoopState, LoopStatus, TickOutcome};
pub use fps::FpsMeter;
pub use session::{FrameSample, Session};
pub use smooth::Smoother;
