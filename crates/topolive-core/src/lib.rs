pub mod collab;
pub mod errors;
pub mod fields;
pub mod frame;
pub mod ids;
pub mod machine;
pub mod notifications;
pub mod operations;
pub mod routes;
pub mod session;
pub mod view;

pub use collab::{CapabilityApi, Navigator, ServiceInfo, Transport, TransportEvent};
pub use errors::{ApiError, TransportError};
pub use machine::{Effect, Input, MachineConfig, SessionMachine};
pub use session::{Session, SessionSnapshot};
