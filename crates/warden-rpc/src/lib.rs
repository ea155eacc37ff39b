//! Warden RPC - request/reply over a topic exchange
//!
//! The broker only offers fire-and-forget publish and queue consumption.
//! This crate layers a call/return abstraction on top:
//!
//! - [`RpcTopology`]: the static (exchange, routing key, queue) bindings of
//!   every operation, fixed at startup
//! - [`CorrelationRegistry`]: pending calls keyed by correlation id
//! - [`RpcClient`]: publishes a request and waits for the matching reply
//! - [`RpcServer`]: explicit operation → handler table that always answers
//!   with exactly one reply envelope

pub mod client;
pub mod config;
pub mod error;
pub mod registry;
pub mod server;

pub use client::{ClientOptions, RpcClient};
pub use config::{OperationBinding, RpcTopology};
pub use error::{HandlerError, RpcError};
pub use registry::{CorrelationRegistry, PendingReply};
pub use server::{RpcServer, ServerHandle};
