//! JSON-RPC message framing for MCP stdio transport.
//!
//! Supports two framing modes:
//!
//! - **Content-Length**: `Content-Length: N\r\n\r\n<N bytes>` (the standard MCP
//!   stdio transport, and what the Stdio Bridge writes to stdout)
//! - **Newline-delimited**: one JSON object per `\n`-terminated line (some MCP
//!   clients speak this instead)
//!
//! The Stdio Bridge reads from stdin using [`UpstreamReader`], which
//! auto-detects framing so either kind of client can drive it.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Reads MCP messages from an async reader, auto-detecting Content-Length vs newline framing.
///
/// On each call to [`UpstreamReader::next_message`], the reader peeks at incoming bytes:
/// - If a line starts with `Content-Length:`, it parses the header and reads the body.
/// - Otherwise it treats the line as a complete JSON message.
pub struct UpstreamReader<R> {
    reader: BufReader<R>,
    buf: String,
}

impl<R: AsyncRead + Unpin> UpstreamReader<R> {
    /// Create a new upstream reader wrapping the given async reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: String::new(),
        }
    }

    /// Read the next JSON-RPC message, returning `None` on EOF.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading fails or Content-Length parsing encounters
    /// malformed headers.
    pub async fn next_message(&mut self) -> io::Result<Option<String>> {
        loop {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf).await?;
            if n == 0 {
                return Ok(None); // EOF
            }

            let trimmed = self.buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            // Check if this is a Content-Length header
            if let Some(rest) = trimmed.strip_prefix("Content-Length:") {
                let len: usize = rest
                    .trim()
                    .parse()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

                // Read until blank line (consume \r\n\r\n separator)
                loop {
                    self.buf.clear();
                    let header_n = self.reader.read_line(&mut self.buf).await?;
                    if header_n == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "EOF in Content-Length headers",
                        ));
                    }
                    if self.buf.trim().is_empty() {
                        break;
                    }
                    // Skip other headers (e.g. Content-Type)
                }

                // Read exactly `len` bytes of body
                let mut body = vec![0u8; len];
                self.reader.read_exact(&mut body).await?;
                let msg =
                    String::from_utf8(body).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                return Ok(Some(msg));
            }

            // Newline-delimited: the trimmed line IS the JSON message
            return Ok(Some(trimmed.to_string()));
        }
    }
}

/// Encode a JSON message in Content-Length framing format.
///
/// Returns a `Vec<u8>` containing `Content-Length: N\r\n\r\n<body>`.
pub fn encode_content_length(json: &str) -> Vec<u8> {
    let header = format!("Content-Length: {}\r\n\r\n", json.len());
    let mut buf = Vec::with_capacity(header.len() + json.len());
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(json.as_bytes());
    buf
}

/// Write a JSON message in Content-Length framing to the given writer.
///
/// # Errors
///
/// Returns an I/O error if writing or flushing fails.
pub async fn write_content_length<W: AsyncWrite + Unpin>(
    writer: &mut W,
    json: &str,
) -> io::Result<()> {
    writer.write_all(&encode_content_length(json)).await?;
    writer.flush().await?;
    Ok(())
}
