//! Round-based scheduling engine for pairwise device-to-device transfer
//! demand.
//!
//! Demand arrives as an undirected conflict multigraph: nodes back storage
//! devices with bounded concurrent-transfer capacity, edges are pending
//! transfers. A strategy turns the graph into a sequence of rounds, each a
//! conflict-free transfer set, until all demand is serviced. The engine
//! performs no I/O; an external round controller loops `select`/`commit`
//! and observes the stream of transfer records.

pub mod config;
pub mod device;
pub mod graph;
pub mod logging;
pub mod models;
pub mod strategy;

pub use config::{ScheduleConfig, StrategyKind};
pub use device::{Device, DeviceId, DevicePool};
pub use graph::{DemandGraph, NodeId};
pub use models::TransferRecord;
pub use strategy::{flatten_multiplicity, normalized_max_degree, ScheduleError, Scheduler};
