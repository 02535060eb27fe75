//! Log RPCs that survive flaky endpoints.
//!
//! [`RobustProvider`] wraps one primary Alloy [`RootProvider`](alloy::providers::RootProvider)
//! and any number of fallbacks. Every `eth_getLogs` and `eth_subscribe` call is:
//! * retried with exponential backoff on RPC errors
//! * bounded by a call timeout per endpoint
//! * moved on to the next fallback once an endpoint gives up
//!
//! It implements [`LogSource`](crate::LogSource), so an [`EventReader`](crate::EventReader) can run
//! on top of it directly.
//!
//! Subscriptions are only retried while being opened. Once open, a failing subscription is
//! reported through [`RobustLogSubscription`] and its live stream ends; it is never swapped for a
//! new one behind the caller's back.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use alloy::{network::Ethereum, providers::RootProvider, rpc::types::Filter};
//! use event_stream::robust_provider::RobustProviderBuilder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let primary = RootProvider::<Ethereum>::connect("ws://localhost:8545").await?;
//!
//! let robust = RobustProviderBuilder::new(primary)
//!     .fallback("ws://localhost:8546")
//!     .call_timeout(Duration::from_secs(30))
//!     .max_retries(5)
//!     .build()
//!     .await?;
//!
//! let logs = robust.get_logs(&Filter::new().from_block(1_000_000)).await?;
//! println!("{} logs", logs.len());
//! # Ok(()) }
//! ```

pub mod builder;
pub mod error;
pub mod provider;
pub mod provider_conversion;
pub mod subscription;

pub use builder::*;
pub use error::Error;
pub use provider::RobustProvider;
pub use provider_conversion::{IntoRobustProvider, IntoRootProvider};
pub use subscription::RobustLogSubscription;
