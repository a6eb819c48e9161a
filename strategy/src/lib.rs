pub mod adapters;
pub mod error;
pub mod executor;
pub mod features;
pub mod liquidity;
pub mod planner;
pub mod ports;
pub mod resolver;
pub mod retry;
pub mod selection;
pub mod snapshot;

#[cfg(test)]
mod testing;


pub use error::LiquidityError;
pub use liquidity::{LiquidityFlow, LiquiditySettings};
