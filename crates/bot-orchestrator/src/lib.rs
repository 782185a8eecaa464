//! Run lifecycle orchestration: one actor per run, gated live execution,
//! and per-run serialization of all record mutation through the actor's
//! mailbox.

pub mod commands;
pub mod controls;
pub mod events;
pub mod gateway;
pub mod ledger;
pub mod registry;
pub mod run_actor;
pub mod run_handle;
pub mod store;

pub use commands::{RunCommand, RunConfig, RunSnapshot};
pub use controls::SafetyControls;
pub use events::RunEvent;
pub use gateway::GatewayWrapper;
pub use ledger::{OpenPosition, PositionLedger};
pub use registry::RunRegistry;
pub use run_actor::{RunActor, RunDeps};
pub use run_handle::RunHandle;
pub use store::MemoryRunStore;
