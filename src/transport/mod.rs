mod links;
mod mailbox;
mod relay;
mod router;

pub(crate) use links::{Inbound, Links, wire_mesh};
pub(crate) use mailbox::Mailbox;
pub(crate) use relay::{Hop, depart};
pub(crate) use router::{RouterSet, spawn_routers};
