//! Infrastructure adapters that talk to the outside world.
//!
//! - [`HttpConnectivityProbe`]: authenticated handshakes against the services
//!   behind credentialed tool servers.
//! - [`CommandSupervisor`]: reloads the gateway by running a command
//!   (normally `docker compose restart`).

#![deny(unsafe_code)]

pub mod probe;
pub mod supervisor;

pub use probe::{HttpConnectivityProbe, ProbeEndpoints, ProbePlan};
pub use supervisor::CommandSupervisor;
