//! Service-to-service invocation routed through a logical consumer registry.
//!
//! Callers never hold addresses. They name a [`Consumer`], hand bytes to a
//! [`Transport`], and the transport resolves the name through the
//! process-wide [`ConsumerMap`] that was built once at startup.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   Consumer::Explore   ┌───────────────┐
//! │ Caller       │──────────────────────▶│   Transport   │ (trait)
//! │ (onboarding) │   encode(envelope)    └───────┬───────┘
//! └──────────────┘                               │
//!                           ┌────────────────────┴──────────────┐
//!                           ▼                                   ▼
//!                  ┌─────────────────┐                 ┌─────────────────┐
//!                  │  HttpTransport  │                 │  MockTransport  │
//!                  │ ConsumerMap →   │                 │ records calls,  │
//!                  │ POST endpoint   │                 │ no I/O          │
//!                  └─────────────────┘                 └─────────────────┘
//! ```
//!
//! Two call shapes exist:
//! - **push**: fire-and-forget. The caller learns only whether the target
//!   accepted the invocation.
//! - **request**: call-and-wait. The caller gets the response bytes back or
//!   a [`TransportError`].
//!
//! Both take a [`CallContext`] carrying a deadline and a cancellation token.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use transport::{CallContext, Consumer, ConsumerMap, HttpTransport, Transport, TransportConfig};
//!
//! let consumers = Arc::new(ConsumerMap::new().with(Consumer::Explore, "http://explore:8080/invoke"));
//! let transport = HttpTransport::new(consumers, TransportConfig::default())?;
//!
//! let ctx = CallContext::with_timeout(std::time::Duration::from_secs(5));
//! let reply = transport.request(&ctx, Consumer::Explore, payload).await?;
//! ```

mod config;
mod consumer;
mod context;
mod envelope;
mod error;
mod http;
mod invoke;
mod mock;

pub use config::TransportConfig;
pub use consumer::{Consumer, ConsumerMap};
pub use context::{CallContext, Interrupted};
pub use envelope::{Message, Reply, ReplyError, decode, decode_reply, decode_value, encode};
pub use error::{EnvelopeError, TransportError, TransportResult};
pub use http::HttpTransport;
pub use invoke::{INVOCATION_TYPE_HEADER, InvocationType, Transport};
pub use mock::{MockTransport, RecordedCall};
