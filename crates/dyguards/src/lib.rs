//! Privilege-separated state rotation.
//!
//! The binary is run from a network manager hook as root. It forks: the parent
//! keeps root and only answers privileged requests ([`Server`]); the child
//! drops to the configured user and runs the rotation engine, reaching the
//! filesystem and the controlled process only through [`RpcClient`].

#![deny(unsafe_code)]
#![deny(missing_docs)]

mod bootstrap;
mod client;
mod error;
mod privileges;
mod server;

pub use bootstrap::{Role, enter};
pub use client::RpcClient;
pub use error::{BootstrapError, ChannelError};
pub use privileges::Privileges;
pub use server::{POLL_TIMEOUT_MS, ServeStats, Server};
