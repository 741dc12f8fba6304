//! Privileged operation table and request dispatch.

use dyguards_proto::{Call, Operation, Request, Response};
use tracing::{info, warn};

use crate::privileged::{Privileged, invoke};

/// Allow-listed mapping from wire name to privileged operation.
///
/// Wraps the implementation that actually performs the operations. A request
/// is only ever executed after it validated into a [`Call`]; everything else
/// becomes a failed response and nothing runs.
#[derive(Debug)]
pub struct OperationTable<P> {
    ops: P,
}

impl<P: Privileged> OperationTable<P> {
    /// Table dispatching to `ops`.
    pub fn new(ops: P) -> Self {
        Self { ops }
    }

    /// Operation registered under `name`.
    pub fn lookup(name: &str) -> Option<Operation> {
        Operation::from_name(name)
    }

    /// Validate and run one request.
    pub fn handle(&mut self, request: &Request) -> Response {
        let call = match Call::from_request(request) {
            Ok(call) => call,
            Err(err) => {
                warn!(operation = %request.operation, %err, "rejected request");
                return Response::rejected(&err);
            },
        };

        info!(operation = %call.operation(), "running privileged operation");
        let response = invoke(&mut self.ops, &call);
        if let Some(detail) = &response.error_detail {
            warn!(operation = %call.operation(), %detail, "privileged operation failed");
        }
        response
    }

    /// The wrapped implementation.
    pub fn ops(&self) -> &P {
        &self.ops
    }
}
