//! Wire protocol for the dyguards privilege-separation channel.
//!
//! Two layers:
//!
//! - [`Frame`]: 8 ASCII digits of length followed by the payload. The framer
//!   knows nothing about the payload.
//! - [`Request`] / [`Response`]: CBOR envelopes carried in frames, validated
//!   into a typed [`Call`] on the privileged side.
//!
//! The operation set is closed ([`Operation::ALL`]); there is no way to name
//! anything else on the wire.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod call;
mod errors;
mod frame;
mod message;
mod operation;

pub use call::Call;
pub use errors::{DispatchError, ProtocolError, Result};
pub use frame::Frame;
pub use message::{Request, Response, Value};
pub use operation::Operation;
