mod bootstrap;
mod collectives;
mod communicator;
mod messaging;

pub use collectives::RouteOutcome;
pub use communicator::{CancelHandle, Communicator};
