//! # coinhost-daemon: Node daemon lifecycle supervision.
//!
//! Keeps a set of coin node daemons alive:
//! - [`supervisor::Supervisor`]: registry, port assignment and the sweep loop
//! - [`daemon::Daemon`]: one supervised node and its observed health
//! - [`process::CommandLauncher`]: spawns node binaries as child processes
//! - [`config::SupervisorConfig`]: supervisor configuration

pub mod config;
pub mod daemon;
pub mod process;
pub mod supervisor;

pub use config::SupervisorConfig;
pub use daemon::{Daemon, DaemonState, DaemonStatus};
pub use process::{CommandLauncher, CommandProcess};
pub use supervisor::Supervisor;
