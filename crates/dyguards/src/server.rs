//! Privileged end of the channel.
//!
//! A single poll-driven loop over the inbound (request) and outbound
//! (response) streams. At most one response is pending at a time; while it is
//! pending the inbound stream is not read, so responses leave in request order
//! and the client's one-call-in-flight discipline is all the flow control
//! needed.

use std::{fs::File, os::fd::AsFd};

use dyguards_core::{OperationTable, Privileged};
use dyguards_proto::{DispatchError, Frame, Request, Response};
use nix::{
    errno::Errno,
    poll::{PollFd, PollFlags, PollTimeout, poll},
};
use tracing::{debug, info, warn};

use crate::ChannelError;

/// Poll timeout in milliseconds.
pub const POLL_TIMEOUT_MS: u16 = 10_000;

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// Requests read.
    pub requests: u64,
    /// Requests refused without invoking anything.
    pub rejected: u64,
    /// Poll rounds that timed out.
    pub idle_timeouts: u64,
}

/// Server loop state.
pub struct Server<P> {
    table: OperationTable<P>,
    inbound: File,
    outbound: File,
    pending: Option<Frame>,
    stats: ServeStats,
}

impl<P: Privileged> Server<P> {
    /// Serve `table` reading requests from `inbound`, answering on `outbound`.
    pub fn new(table: OperationTable<P>, inbound: File, outbound: File) -> Self {
        Self { table, inbound, outbound, pending: None, stats: ServeStats::default() }
    }

    /// Run until the client closes its write end.
    ///
    /// # Errors
    ///
    /// - `ChannelError::Protocol` on a framing error or stream failure
    /// - `ChannelError::Disconnected` if the client stops reading responses
    /// - `ChannelError::Poll` if poll(2) fails
    pub fn run(mut self) -> Result<ServeStats, ChannelError> {
        info!("privileged server started");
        loop {
            let (readable, writable) = match self.wait()? {
                Some(ready) => ready,
                None => continue,
            };

            if writable {
                self.flush()?;
            } else if readable {
                let Some(frame) = Frame::read_from(&mut self.inbound)? else {
                    info!(requests = self.stats.requests, "client closed the channel");
                    return Ok(self.stats);
                };
                self.pending = Some(self.answer(&frame)?);
            }
        }
    }

    /// Block until a stream is ready. `None` on timeout or interruption.
    fn wait(&mut self) -> Result<Option<(bool, bool)>, ChannelError> {
        let (in_events, out_events) = if self.pending.is_some() {
            (PollFlags::empty(), PollFlags::POLLOUT)
        } else {
            (PollFlags::POLLIN, PollFlags::empty())
        };

        let mut fds = [
            PollFd::new(self.inbound.as_fd(), in_events),
            PollFd::new(self.outbound.as_fd(), out_events),
        ];

        match poll(&mut fds, PollTimeout::from(POLL_TIMEOUT_MS)) {
            Ok(0) => {
                self.stats.idle_timeouts += 1;
                debug!("poll timed out");
                return Ok(None);
            },
            Ok(_) => {},
            Err(Errno::EINTR) => return Ok(None),
            Err(errno) => return Err(ChannelError::Poll(errno)),
        }

        let in_ready = fds[0].revents().unwrap_or(PollFlags::empty());
        let out_ready = fds[1].revents().unwrap_or(PollFlags::empty());

        let out_gone = out_ready.intersects(PollFlags::POLLERR | PollFlags::POLLNVAL);

        if self.pending.is_some() {
            if out_gone {
                warn!("client stopped reading responses");
                return Err(ChannelError::Disconnected);
            }
            return Ok(Some((false, out_ready.contains(PollFlags::POLLOUT))));
        }

        // A closed response pipe is reported even when nothing was asked of
        // it. With nothing pending the inbound stream decides: EOF ends the
        // loop cleanly, a further request fails once its answer is pending.
        let readable = out_gone
            || in_ready.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR);
        Ok(Some((readable, false)))
    }

    /// Decode, validate and run one request.
    fn answer(&mut self, frame: &Frame) -> Result<Frame, ChannelError> {
        self.stats.requests += 1;

        let response = match Request::from_frame(frame) {
            Ok(request) => self.table.handle(&request),
            Err(err) => {
                warn!(%err, "undecodable request");
                Response::rejected(&DispatchError::Malformed(err.to_string()))
            },
        };

        if response.is_rejection() {
            self.stats.rejected += 1;
        }
        Ok(response.to_frame()?)
    }

    fn flush(&mut self) -> Result<(), ChannelError> {
        if let Some(frame) = self.pending.take() {
            frame.write_to(&mut self.outbound)?;
            debug!(bytes = frame.encoded_len(), "response sent");
        }
        Ok(())
    }
}
