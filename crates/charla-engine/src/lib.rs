pub mod context;
pub mod error;
pub mod knowledge;
pub mod registry;
pub mod turn;

pub use error::TurnError;
pub use registry::{TenantConfig, TenantRegistry};
pub use turn::TurnOrchestrator;
