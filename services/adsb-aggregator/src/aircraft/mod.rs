//! Live aircraft state: registry, side store, trails and snapshot assembly

mod engine;
mod registry;
mod side_store;
mod snapshot;
mod trail;

pub use engine::{AircraftEngine, EngineSettings, SharedEngine, SweepReport};
pub use registry::{AircraftRegistry, AircraftState, TrackerStats};
pub use side_store::{ExtraFieldStore, ExtraFields};
pub use snapshot::{merge, AircraftView, Snapshot, UPDATE_MESSAGE_TYPE};
pub use trail::{HistoryPoint, TrailManager};
