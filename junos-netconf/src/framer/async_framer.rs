use crate::error::{NetconfClientError, NetconfClientResult};
use crate::framer::{Framer, MAX_CHUNK_SIZE, NETCONF_1_0_TERMINATOR};
use async_trait::async_trait;
use log::trace;
use memmem::{Searcher, TwoWaySearcher};
use std::collections::VecDeque;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// NETCONF message framing over a byte stream.
/// See [RFC6242](https://tools.ietf.org/html/rfc6242#section-4.1)
///
/// Bytes read past the end of one message stay buffered for the next, also
/// across the switch from end-of-message to chunked framing.
pub struct AsyncFramer<T> {
    read_buffer: VecDeque<u8>,
    upgraded: bool,

    channel: T,
}

impl<T: AsyncRead + AsyncWrite + Unpin> AsyncFramer<T> {
    pub fn new(channel: T) -> Self {
        AsyncFramer {
            read_buffer: VecDeque::new(),
            upgraded: false,
            channel,
        }
    }

    pub fn is_upgraded(&self) -> bool {
        self.upgraded
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.channel
    }

    async fn fill(&mut self) -> NetconfClientResult<()> {
        let mut buffer = [0u8; 4096];
        let bytes = self.channel.read(&mut buffer).await?;
        if bytes == 0 {
            return Err(NetconfClientError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed the channel before the message was complete",
            )));
        }
        trace!("Read {} bytes", bytes);
        self.read_buffer.extend(&buffer[..bytes]);
        Ok(())
    }

    async fn next_byte(&mut self) -> NetconfClientResult<u8> {
        loop {
            if let Some(byte) = self.read_buffer.pop_front() {
                return Ok(byte);
            }
            self.fill().await?;
        }
    }

    async fn take(&mut self, size: usize) -> NetconfClientResult<Vec<u8>> {
        while self.read_buffer.len() < size {
            self.fill().await?;
        }
        Ok(self.read_buffer.drain(..size).collect())
    }

    /// Reads `\n#<size>\n`, returning `None` for the end-of-chunks marker
    /// `\n##\n`. Whitespace ahead of the header is tolerated.
    async fn read_header(&mut self) -> NetconfClientResult<Option<usize>> {
        let mut byte = self.next_byte().await?;
        let mut newline = false;
        while byte.is_ascii_whitespace() {
            newline |= byte == b'\n';
            byte = self.next_byte().await?;
        }
        if !newline {
            return Err(NetconfClientError::MalformedChunk {
                expected: '\n',
                actual: byte.into(),
            });
        }
        if byte != b'#' {
            return Err(NetconfClientError::MalformedChunk {
                expected: '#',
                actual: byte.into(),
            });
        }

        let mut byte = self.next_byte().await?;
        if byte == b'#' {
            let last = self.next_byte().await?;
            if last != b'\n' {
                return Err(NetconfClientError::MalformedChunk {
                    expected: '\n',
                    actual: last.into(),
                });
            }
            return Ok(None);
        }

        let mut chunk_size: u64 = 0;
        while byte != b'\n' {
            if !byte.is_ascii_digit() {
                return Err(NetconfClientError::MalformedChunk {
                    expected: '0',
                    actual: byte.into(),
                });
            }
            chunk_size = chunk_size * 10 + u64::from(byte - b'0');
            if chunk_size > MAX_CHUNK_SIZE {
                return Err(NetconfClientError::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("chunk size exceeds {}", MAX_CHUNK_SIZE),
                )));
            }
            byte = self.next_byte().await?;
        }
        if chunk_size == 0 {
            return Err(NetconfClientError::MalformedChunk {
                expected: '1',
                actual: '0',
            });
        }
        let chunk_size = usize::try_from(chunk_size).map_err(|_| {
            NetconfClientError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("chunk size {} does not fit in memory", chunk_size),
            ))
        })?;
        Ok(Some(chunk_size))
    }

    async fn read_chunked(&mut self) -> NetconfClientResult<String> {
        let mut message = Vec::new();
        while let Some(chunk_size) = self.read_header().await? {
            let chunk = self.take(chunk_size).await?;
            message.extend_from_slice(&chunk);
        }
        into_message(message)
    }

    async fn read_delimited(&mut self) -> NetconfClientResult<String> {
        let search = TwoWaySearcher::new(NETCONF_1_0_TERMINATOR.as_bytes());
        loop {
            if let Some(pos) = search.search_in(self.read_buffer.make_contiguous()) {
                let message: Vec<u8> = self.read_buffer.drain(..pos).collect();
                self.read_buffer.drain(..NETCONF_1_0_TERMINATOR.len());
                return into_message(message);
            }
            self.fill().await?;
        }
    }
}

fn into_message(bytes: Vec<u8>) -> NetconfClientResult<String> {
    String::from_utf8(bytes)
        .map(|message| message.trim().to_string())
        .map_err(|err| {
            NetconfClientError::MalformedResponse(format!("message is not valid UTF-8: {}", err))
        })
}

#[async_trait]
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Framer for AsyncFramer<T> {
    async fn upgrade(&mut self) {
        self.upgraded = true;
    }

    async fn read_async(&mut self) -> NetconfClientResult<String> {
        if self.upgraded {
            self.read_chunked().await
        } else {
            self.read_delimited().await
        }
    }

    async fn write_async(&mut self, rpc: &str) -> NetconfClientResult<()> {
        trace!("Writing:\n{}", rpc);
        let bytes = rpc.as_bytes();
        if self.upgraded {
            self.channel
                .write_all(format!("\n#{}\n", bytes.len()).as_bytes())
                .await?;
            self.channel.write_all(bytes).await?;
            self.channel.write_all("\n##\n".as_bytes()).await?;
        } else {
            self.channel.write_all(bytes).await?;
            self.channel
                .write_all(NETCONF_1_0_TERMINATOR.as_bytes())
                .await?;
        }
        self.channel.flush().await?;
        Ok(())
    }
}
