//! Injected seams for time and randomness

mod clock;
mod random;

pub use clock::{Clock, ManualClock, SystemClock};
pub use random::{OsRandom, RandomSource, SeededRandom};
