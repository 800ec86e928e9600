mod days_of_week;
mod line;
pub mod network;
mod node;
mod path;
mod schedule;
mod station;
mod track;
pub mod track_graph;
mod train;

pub use days_of_week::DaysOfWeek;
pub use line::{format_train_number, LineStop, LineTemplate, RouteDirection, TaktPattern};
pub use network::NetworkModel;
pub use node::TrackNode;
pub use path::{Path, PathPosition, PathSegment, PathStop};
pub use schedule::{ScheduledStop, TimetableEntry};
pub use station::{normalize_platform_ref, PlatformSide, Station, StopCandidate};
pub use track::{TrackEdge, TravelDirection};
pub use track_graph::{PlannedStop, Positions, Routes, Stations, TrackGraph};
pub use train::{TrainState, TrainType};
