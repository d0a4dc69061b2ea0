pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod registry;
pub mod rpc;
pub mod transport;

use domain::calculator::Suma;
use registry::MethodRegistry;

/// Registry with every method this server exposes.
pub fn build_registry() -> MethodRegistry {
    MethodRegistry::new().register("suma", Suma)
}
