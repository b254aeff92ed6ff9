//! Runtime side of the motion logger: the fixed-rate sampler, the source
//! pump feeding the latest-value cache, the throttled display feed and the
//! controller that owns a recording's lifecycle.

pub mod clock;
pub mod controller;
pub mod display;
pub mod sampler;
pub mod simulated;
pub mod source;

pub use clock::RuntimeClock;
pub use controller::AcquisitionController;
pub use display::DisplayFeed;
pub use sampler::FixedRateSampler;
pub use simulated::SimulatedSource;
