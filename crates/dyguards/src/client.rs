//! Unprivileged end of the channel.

use std::io::{Read, Write};

use dyguards_core::{
    NetworkIdentity, PrivResult, Privileged, PrivilegedError, ProcessHandle, privileged::decode,
};
use dyguards_proto::{Call, Frame, Operation, Response, Value};
use tracing::{debug, info, warn};

use crate::ChannelError;

/// Synchronous RPC client over a pair of byte streams.
///
/// Writes one request frame, then blocks for exactly one response frame. There
/// is never more than one call in flight, which `&mut self` enforces.
#[derive(Debug)]
pub struct RpcClient<R, W> {
    reader: R,
    writer: W,
}

impl<R: Read, W: Write> RpcClient<R, W> {
    /// Client reading responses from `reader` and writing requests to `writer`.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Send one call and wait for its response.
    ///
    /// # Errors
    ///
    /// - `ChannelError::Protocol` if framing or encoding fails either way
    /// - `ChannelError::Disconnected` if the server closed before answering
    pub fn exchange(&mut self, call: Call) -> Result<Response, ChannelError> {
        let operation = call.operation();
        debug!(%operation, "sending request");

        call.into_request().to_frame()?.write_to(&mut self.writer)?;
        let frame = Frame::read_from(&mut self.reader)?.ok_or(ChannelError::Disconnected)?;
        Ok(Response::from_frame(&frame)?)
    }

    /// Send one call and return its success payload.
    ///
    /// Channel failures and failed responses both come back as
    /// [`PrivilegedError`], the latter with the server's error detail.
    pub fn call(&mut self, call: Call) -> PrivResult<Value> {
        let operation = call.operation();
        info!(%operation, "requesting privileged operation");

        let response = self.exchange(call).map_err(|err| {
            warn!(%operation, %err, "channel failure");
            PrivilegedError::Channel(err.to_string())
        })?;

        if response.failed {
            let err = PrivilegedError::from_response(&response);
            warn!(%operation, %err, "privileged operation failed");
            return Err(err);
        }
        Ok(response.result)
    }

    /// Give the streams back, closing nothing.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: Read, W: Write> Privileged for RpcClient<R, W> {
    fn dir_exists(&mut self, path: &str) -> PrivResult<bool> {
        let value = self.call(Call::DirExists { path: path.to_string() })?;
        decode::flag(Operation::DirExists, &value)
    }

    fn file_exists(&mut self, path: &str) -> PrivResult<bool> {
        let value = self.call(Call::FileExists { path: path.to_string() })?;
        decode::flag(Operation::FileExists, &value)
    }

    fn create_state_store(&mut self, path: &str) -> PrivResult<bool> {
        let value = self.call(Call::CreateStateStore { path: path.to_string() })?;
        decode::flag(Operation::CreateStateStore, &value)
    }

    fn move_file(&mut self, from: &str, to: &str) -> PrivResult<()> {
        let value = self.call(Call::MoveFile { from: from.to_string(), to: to.to_string() })?;
        decode::ack(Operation::MoveFile, &value)
    }

    fn copy_file(&mut self, from: &str, to: &str) -> PrivResult<()> {
        let value = self.call(Call::CopyFile { from: from.to_string(), to: to.to_string() })?;
        decode::ack(Operation::CopyFile, &value)
    }

    fn known_networks(&mut self, store: &str) -> PrivResult<Vec<NetworkIdentity>> {
        let value = self.call(Call::GetListOfKnownNetworks { path: store.to_string() })?;
        decode::networks(Operation::GetListOfKnownNetworks, &value)
    }

    fn update_last_ebssid(&mut self, path: &str, token: &str) -> PrivResult<()> {
        let call = Call::UpdateLastEbssidFile { path: path.to_string(), ebssid: token.to_string() };
        let value = self.call(call)?;
        decode::ack(Operation::UpdateLastEbssidFile, &value)
    }

    fn read_file(&mut self, path: &str) -> PrivResult<Option<String>> {
        let value = self.call(Call::ReadFile { path: path.to_string() })?;
        decode::optional_text(Operation::ReadFile, &value)
    }

    fn suspend_process(&mut self, process: ProcessHandle) -> PrivResult<()> {
        let value = self.call(Call::SuspendProcess { pid: process.to_raw() })?;
        decode::ack(Operation::SuspendProcess, &value)
    }

    fn resume_process(&mut self, process: ProcessHandle) -> PrivResult<()> {
        let value = self.call(Call::ResumeProcess { pid: process.to_raw() })?;
        decode::ack(Operation::ResumeProcess, &value)
    }

    fn start_process(&mut self, command: &str) -> PrivResult<()> {
        let value = self.call(Call::StartProcess { command: command.to_string() })?;
        decode::ack(Operation::StartProcess, &value)
    }

    fn stop_process(&mut self, command: &str) -> PrivResult<()> {
        let value = self.call(Call::StopProcess { command: command.to_string() })?;
        decode::ack(Operation::StopProcess, &value)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn canned(responses: &[Response]) -> Cursor<Vec<u8>> {
        let mut wire = Vec::new();
        for response in responses {
            response.to_frame().expect("encode").encode(&mut wire).expect("frame");
        }
        Cursor::new(wire)
    }

    #[test]
    fn request_is_framed_on_the_wire() {
        let mut client = RpcClient::new(canned(&[Response::success(true)]), Vec::new());

        assert_eq!(client.file_exists("/var/lib/tor/state"), Ok(true));

        let (_, written) = client.into_inner();
        let frame = Frame::decode(&written).expect("one frame");
        let request = dyguards_proto::Request::from_frame(&frame).expect("request");
        assert_eq!(
            Call::from_request(&request),
            Ok(Call::FileExists { path: "/var/lib/tor/state".to_string() })
        );
    }

    #[test]
    fn failed_response_becomes_error() {
        let failure = Response::failure(13, "Permission denied: '/root/state'");
        let mut client = RpcClient::new(canned(&[failure]), Vec::new());

        let err = client.move_file("/root/state", "/tmp/state").expect_err("failure");
        assert_eq!(
            err,
            PrivilegedError::Os { code: 13, detail: "Permission denied: '/root/state'".to_string() }
        );
    }

    #[test]
    fn closed_server_is_a_channel_error() {
        let mut client = RpcClient::new(canned(&[]), Vec::new());

        assert!(matches!(client.dir_exists("/"), Err(PrivilegedError::Channel(_))));
    }

    #[test]
    fn wrong_result_shape_is_reported() {
        let mut client = RpcClient::new(canned(&[Response::success("yes")]), Vec::new());

        assert!(matches!(
            client.dir_exists("/"),
            Err(PrivilegedError::UnexpectedResult { operation: Operation::DirExists, .. })
        ));
    }
}
