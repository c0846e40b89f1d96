//! Topology-aware relay and collective communication between cooperating
//! ranks.
//!
//! A mesh of `P` ranks is linked according to a [`TopologyKind`]; ranks can
//! only send directly to their neighbors, and everything else is relayed hop
//! by hop along the route [`Topology::next_hop`] prescribes. On top of that
//! the [`Communicator`] offers broadcast, scatter, gather, reduce,
//! all-reduce, barrier and a traced point-to-point route.
//!
//! ```no_run
//! use topocoll::{CollConfig, Communicator, ReduceOp, TopologyKind};
//!
//! # async fn example() -> topocoll::Result<()> {
//! let comms = Communicator::bootstrap_local(4, CollConfig::with_topology(TopologyKind::Line)).await?;
//! let tasks: Vec<_> = comms
//!     .into_iter()
//!     .map(|comm| {
//!         tokio::spawn(async move {
//!             let rank = comm.rank() as i64;
//!             comm.all_reduce(rank, &ReduceOp::Sum).await
//!         })
//!     })
//!     .collect();
//! for t in tasks {
//!     assert_eq!(t.await.unwrap()?, 6);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
mod collective;
pub mod config;
pub mod error;
pub mod partition;
pub mod protocol;
pub mod reduce;
pub mod topology;
mod transport;
pub mod types;
pub mod validate;

pub use client::{CancelHandle, Communicator, RouteOutcome};
pub use config::CollConfig;
pub use error::{CollError, Result};
pub use partition::Partition;
pub use protocol::Wire;
pub use reduce::{Combine, FnOp, ReduceOp};
pub use topology::{Topology, TopologyKind};
pub use types::Rank;
pub use validate::{Operation, validate};
