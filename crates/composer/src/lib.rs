//! Price-stream sonification core: indicators, musical mapping and
//! event scheduling, plus the offline score renderer that shares the
//! indicator and mapping pieces.

pub mod indicators;
pub mod mapping;
pub mod scheduler;
pub mod score;

pub use indicators::{Indicators, PriceBounds, SymbolState};
pub use mapping::{Mapper, MelodicEvent, MusicalPlan, PercussionHit};
pub use scheduler::EventScheduler;
