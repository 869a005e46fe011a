//! Static catalogs shipped with switchyard.

mod schemas;
mod servers;

pub use schemas::builtin_schemas;
pub use servers::builtin_servers;
