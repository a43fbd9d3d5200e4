//! Message Source
//!
//! The sniper does not speak any chat protocol itself. Messages arrive
//! through `MessageSource`; the bundled `JsonLinesSource` reads one JSON
//! object per line:
//!
//! ```text
//! {"channel": "gem_calls", "text": "new gem! outputCurrency=0x..."}
//! ```
//!
//! Any bridge (a userbot, a webhook relay, `tail -f` on a capture file) can
//! feed the bot by writing that format to stdin or a file.
//!
//! Stdin is read on a plain OS thread (`BlockingLines`). A read parked on
//! an idle terminal then never holds up runtime shutdown after a signal.

use crate::error::{Result, SniperError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::{self, BufRead};
use std::thread;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Lines buffered between the reader thread and the source
const READER_BUFFER: usize = 64;

static CHANNEL_HANDLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@?[A-Za-z][A-Za-z0-9_]{3,31}$").expect("valid channel pattern"));

/// One inbound event: (senderChannel, text)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    pub channel: String,
    pub text: String,
}

#[async_trait]
pub trait MessageSource: Send {
    /// Next message from a monitored channel. `None` when the stream ends.
    async fn next_message(&mut self) -> Result<Option<InboundMessage>>;
}

/// The set of monitored channels, resolved once at startup
#[derive(Debug, Clone)]
pub struct ChannelFilter {
    handles: HashSet<String>,
}

impl ChannelFilter {
    /// Validate every configured handle. One bad handle aborts startup.
    pub fn resolve(channels: &[String]) -> Result<Self> {
        let mut handles = HashSet::new();
        for channel in channels {
            if !CHANNEL_HANDLE.is_match(channel) {
                return Err(SniperError::ChannelResolution(format!(
                    "'{}' is not a valid channel handle",
                    channel
                )));
            }
            handles.insert(normalize(channel));
        }
        if handles.is_empty() {
            return Err(SniperError::ChannelResolution("no channels configured".into()));
        }
        info!("Monitoring {} channel(s)", handles.len());
        Ok(Self { handles })
    }

    pub fn accepts(&self, channel: &str) -> bool {
        self.handles.contains(&normalize(channel))
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

fn normalize(channel: &str) -> String {
    channel.trim().trim_start_matches('@').to_lowercase()
}

/// Raw text lines feeding a `JsonLinesSource`
#[async_trait]
pub trait LineStream: Send {
    async fn next_line(&mut self) -> io::Result<Option<String>>;
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LineStream for Lines<R> {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        Lines::next_line(self).await
    }
}

/// Lines from a blocking reader, pulled on a dedicated thread
pub struct BlockingLines {
    rx: mpsc::Receiver<io::Result<String>>,
}

impl BlockingLines {
    /// The thread stops at EOF, on a read error, or once this side is dropped.
    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel(READER_BUFFER);
        thread::Builder::new()
            .name("message-reader".into())
            .spawn(move || {
                for line in reader.lines() {
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
            })?;
        Ok(Self { rx })
    }
}

#[async_trait]
impl LineStream for BlockingLines {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.rx.recv().await.transpose()
    }
}

/// Newline-delimited JSON messages from any line stream
pub struct JsonLinesSource<L> {
    lines: L,
    filter: ChannelFilter,
    line_no: u64,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<Lines<R>> {
    pub fn new(reader: R, filter: ChannelFilter) -> Self {
        Self::with_lines(reader.lines(), filter)
    }
}

impl JsonLinesSource<BlockingLines> {
    /// Read from a blocking reader such as `std::io::stdin()`
    pub fn from_blocking<R: BufRead + Send + 'static>(reader: R, filter: ChannelFilter) -> Result<Self> {
        let lines = BlockingLines::spawn(reader).map_err(|e| SniperError::network("start message reader", e))?;
        Ok(Self::with_lines(lines, filter))
    }
}

impl<L: LineStream> JsonLinesSource<L> {
    pub fn with_lines(lines: L, filter: ChannelFilter) -> Self {
        Self {
            lines,
            filter,
            line_no: 0,
        }
    }
}

#[async_trait]
impl<L: LineStream> MessageSource for JsonLinesSource<L> {
    async fn next_message(&mut self) -> Result<Option<InboundMessage>> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(None),
                Err(e) => return Err(SniperError::network("read message", e)),
            };
            self.line_no += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message: InboundMessage = match serde_json::from_str(line) {
                Ok(m) => m,
                Err(e) => {
                    warn!("Skipping malformed message on line {}: {}", self.line_no, e);
                    continue;
                }
            };

            if !self.filter.accepts(&message.channel) {
                debug!("Ignoring message from unmonitored channel '{}'", message.channel);
                continue;
            }

            return Ok(Some(message));
        }
    }
}
