//! Ports - abstraction layer over the outside world.
//!
//! Each trait here is a narrow seam to something this crate does not own:
//! the device screen, the computer-vision stack, the input injector, the wall
//! clock. The controller only ever talks to these traits, so tests and the
//! CLI can swap in scripted or simulated implementations.

pub mod actuation;
pub mod capture;
pub mod clock;
pub mod decider;
pub mod id_generator;
pub mod perception;

pub use self::actuation::{ActuationPort, Point, ScreenLayout};
pub use self::capture::{CapturePort, Frame, FrameInfo};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::decider::Decider;
pub use self::id_generator::{SessionIdGenerator, UlidGenerator};
pub use self::perception::{BattleInfo, PerceptionPort};
