#![forbid(unsafe_code, clippy::unwrap_used)]
#![allow(clippy::needless_return)]
#![warn(clippy::await_holding_lock, clippy::inefficient_to_string)]

mod filter;
mod query;
mod value;

pub use filter::{CompareOp, Filter, FilterValue, IsValue};
pub use query::{Direction, Query, Sort};
pub use value::Value;
