//! Multiplexed data-channel reader and writer.
//!
//! The data channel interleaves `Data` frames with control messages. The
//! free functions [`send_msg`] / [`recv_msg`] move single frames; the
//! [`MuxWriter`] and [`DemuxReader`] adapters expose the data stream as
//! ordinary [`Write`] / [`Read`] implementations while keeping control
//! frames ordered and queued for out-of-band delivery.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use logging::{debug_event, DebugFlag};

use crate::envelope::{EnvelopeError, MessageCode, MessageHeader, HEADER_LEN, MAX_PAYLOAD_LENGTH};

/// Batch size at which buffered data is flushed into a `Data` frame.
const DATA_BATCH_LEN: usize = 32 * 1024;

/// A received multiplex frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessageFrame {
    code: MessageCode,
    payload: Vec<u8>,
}

impl MessageFrame {
    /// Creates a frame from its parts.
    #[must_use]
    pub const fn new(code: MessageCode, payload: Vec<u8>) -> Self {
        Self { code, payload }
    }

    /// Returns the message code.
    #[must_use]
    pub const fn code(&self) -> MessageCode {
        self.code
    }

    /// Returns the payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub const fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Consumes the frame and returns its payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

fn envelope_to_io(err: EnvelopeError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

/// Writes one multiplexed frame.
///
/// # Errors
///
/// Returns [`io::ErrorKind::InvalidInput`] when the payload exceeds the
/// 24-bit length field and propagates writer failures otherwise.
pub fn send_msg<W: Write>(writer: &mut W, code: MessageCode, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|&len| len <= MAX_PAYLOAD_LENGTH)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "multiplexed payload of {} bytes exceeds the 24-bit length field",
                    payload.len()
                ),
            )
        })?;
    let header = MessageHeader::new(code, len).map_err(envelope_to_io)?;
    writer.write_all(&header.encode())?;
    writer.write_all(payload)
}

fn read_header<R: Read>(reader: &mut R) -> io::Result<MessageHeader> {
    let mut bytes = [0u8; HEADER_LEN];
    reader.read_exact(&mut bytes)?;
    MessageHeader::decode(&bytes).map_err(envelope_to_io)
}

fn read_payload<R: Read>(reader: &mut R, len: usize, buffer: &mut Vec<u8>) -> io::Result<()> {
    buffer.clear();
    buffer.resize(len, 0);
    let mut received = 0;
    while received < len {
        match reader.read(&mut buffer[received..]) {
            Ok(0) => {
                buffer.truncate(received);
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "multiplexed payload truncated: expected {len} bytes but received {received}"
                    ),
                ));
            }
            Ok(read) => received += read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Reads one multiplexed frame.
///
/// # Errors
///
/// Surfaces truncated headers and payloads as
/// [`io::ErrorKind::UnexpectedEof`] and malformed headers as
/// [`io::ErrorKind::InvalidData`].
pub fn recv_msg<R: Read>(reader: &mut R) -> io::Result<MessageFrame> {
    let mut payload = Vec::new();
    let code = recv_msg_into(reader, &mut payload)?;
    Ok(MessageFrame::new(code, payload))
}

/// Reads one multiplexed frame into a caller-provided buffer.
///
/// The buffer is cleared and then filled with the payload; on a truncated
/// payload it holds the bytes that did arrive.
///
/// # Errors
///
/// Same failure modes as [`recv_msg`].
pub fn recv_msg_into<R: Read>(reader: &mut R, buffer: &mut Vec<u8>) -> io::Result<MessageCode> {
    let header = read_header(reader)?;
    read_payload(reader, header.payload_len_usize(), buffer)?;
    Ok(header.code())
}

/// Writer side of the multiplexed data channel.
///
/// Plain [`Write`] calls batch bytes into `Data` frames whose payload never
/// exceeds the 24-bit length field. Control messages flush the pending
/// batch first so frames stay ordered.
#[derive(Debug)]
pub struct MuxWriter<W: Write> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: Write> MuxWriter<W> {
    /// Creates a writer over the provided transport.
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(DATA_BATCH_LEN),
        }
    }

    /// Sends a control message, flushing any batched data first.
    ///
    /// # Errors
    ///
    /// Propagates transport failures and oversized payloads.
    pub fn send_msg(&mut self, code: MessageCode, payload: &[u8]) -> io::Result<()> {
        self.flush_data()?;
        debug_event(DebugFlag::Io, 2, || {
            format!("mux send {} ({} bytes)", code, payload.len())
        });
        send_msg(&mut self.inner, code, payload)
    }

    /// Terminates the data channel with the zero-length end-of-session
    /// frame.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn write_eof(&mut self) -> io::Result<()> {
        self.send_msg(MessageCode::ErrorExit, &[])
    }

    /// Flushes batched data into a `Data` frame without touching the
    /// transport's own flush.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn flush_data(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let mut start = 0;
        while start < self.buffer.len() {
            let end = (start + MAX_PAYLOAD_LENGTH as usize).min(self.buffer.len());
            send_msg(&mut self.inner, MessageCode::Data, &self.buffer[start..end])?;
            start = end;
        }
        self.buffer.clear();
        Ok(())
    }

    /// Returns the wrapped transport, flushing batched data first.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush_data()?;
        Ok(self.inner)
    }

    /// Provides mutable access to the wrapped transport.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

impl<W: Write> Write for MuxWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() >= DATA_BATCH_LEN {
            self.flush_data()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_data()?;
        self.inner.flush()
    }
}

/// Reader side of the multiplexed data channel.
///
/// [`Read`] calls transparently unwrap `Data` frames; control frames are
/// queued in arrival order and retrieved with [`DemuxReader::take_message`].
/// A zero-length `ErrorExit` frame ends the data channel: subsequent reads
/// observe end-of-file, so `read_exact`-style consumers fail with
/// [`io::ErrorKind::UnexpectedEof`].
#[derive(Debug)]
pub struct DemuxReader<R: Read> {
    inner: R,
    data_remaining: usize,
    messages: VecDeque<MessageFrame>,
    finished: bool,
}

impl<R: Read> DemuxReader<R> {
    /// Creates a reader over the provided transport.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            data_remaining: 0,
            messages: VecDeque::new(),
            finished: false,
        }
    }

    /// Removes and returns the oldest queued control message.
    pub fn take_message(&mut self) -> Option<MessageFrame> {
        self.messages.pop_front()
    }

    /// Returns the number of queued control messages.
    #[must_use]
    pub fn queued_messages(&self) -> usize {
        self.messages.len()
    }

    /// Reports whether the end-of-session frame has been observed.
    #[must_use]
    pub const fn finished(&self) -> bool {
        self.finished
    }

    /// Returns the wrapped transport.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Provides mutable access to the wrapped transport.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    fn advance_to_data(&mut self) -> io::Result<()> {
        while self.data_remaining == 0 && !self.finished {
            let header = read_header(&mut self.inner)?;
            match header.code() {
                MessageCode::Data => self.data_remaining = header.payload_len_usize(),
                MessageCode::ErrorExit if header.payload_len() == 0 => {
                    self.finished = true;
                }
                code => {
                    let mut payload = Vec::new();
                    read_payload(&mut self.inner, header.payload_len_usize(), &mut payload)?;
                    debug_event(DebugFlag::Io, 2, || {
                        format!("demux queued {} ({} bytes)", code, payload.len())
                    });
                    self.messages.push_back(MessageFrame::new(code, payload));
                }
            }
        }
        Ok(())
    }
}

impl<R: Read> Read for DemuxReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.advance_to_data()?;
        if self.finished {
            return Ok(0);
        }
        let want = buf.len().min(self.data_remaining);
        let read = self.inner.read(&mut buf[..want])?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "multiplexed payload truncated: expected {} bytes but received 0",
                    self.data_remaining
                ),
            ));
        }
        self.data_remaining -= read;
        Ok(read)
    }
}
