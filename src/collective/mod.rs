mod barrier;
mod broadcast;
mod gather;
mod helpers;
mod reduce;
mod route;
mod scatter;
mod schedule;

pub(crate) use barrier::settle;
pub(crate) use broadcast::broadcast;
pub(crate) use gather::gather;
pub(crate) use reduce::{all_reduce, reduce};
pub(crate) use route::route;
pub(crate) use scatter::scatter;
