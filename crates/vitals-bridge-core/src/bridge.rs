//! Parse-and-forward loop
//!
//! Every record read from the input is parsed and, on success, transmitted.
//! Failures are logged and the record dropped; nothing is carried over to
//! the next record.

use std::io::{self, BufRead, Read};
use thiserror::Error;

use crate::link::ConnectionStatus;
use crate::reading::{LineParser, ParseError, MAX_RECORD_LEN};
use crate::transmit::{HttpStatus, TransmitError, Transmitter};

/// Why a single record was dropped
#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Transmit(#[from] TransmitError),
}

/// Connects a [`LineParser`] to a [`Transmitter`]
pub struct Bridge<L> {
    parser: LineParser,
    transmitter: Transmitter,
    link: L,
}

impl<L: ConnectionStatus> Bridge<L> {
    /// Create a bridge observing `link` for network availability
    pub fn new(parser: LineParser, transmitter: Transmitter, link: L) -> Self {
        Self {
            parser,
            transmitter,
            link,
        }
    }

    /// Process one raw line
    ///
    /// Returns `Ok(None)` for blank lines, otherwise the collector's status.
    pub fn handle_line(&self, raw: &str) -> Result<Option<HttpStatus>, RecordError> {
        let line = raw.trim();
        if line.is_empty() {
            return Ok(None);
        }

        tracing::info!("Received: {line}");
        let reading = self.parser.parse(line)?;
        let status = self.transmitter.transmit(&reading, &self.link)?;
        Ok(Some(status))
    }

    /// Read records until the input closes
    ///
    /// Read timeouts are not errors: a serial port with nothing to say just
    /// times out, and any partial line read so far is kept. Lines longer
    /// than [`MAX_RECORD_LEN`] are dropped up to the next newline.
    pub fn run<R: BufRead>(&self, mut reader: R) -> io::Result<()> {
        let mut buf = Vec::with_capacity(MAX_RECORD_LEN + 1);
        let mut discarding = false;

        loop {
            // Never buffer more than one byte past the limit
            let room = (MAX_RECORD_LEN + 1).saturating_sub(buf.len()) as u64;
            match reader.by_ref().take(room).read_until(b'\n', &mut buf) {
                Ok(0) => {
                    if !buf.is_empty() && !discarding {
                        self.dispatch(&buf);
                    }
                    tracing::info!("Input closed");
                    return Ok(());
                }
                Ok(_) if buf.ends_with(b"\n") => {
                    if !discarding {
                        self.dispatch(&buf);
                    }
                    discarding = false;
                    buf.clear();
                    continue;
                }
                // Limit reached, or input ended mid-line and the next read returns 0
                Ok(_) => {}
                Err(e) if is_transient(&e) => {}
                Err(e) => return Err(e),
            }

            if buf.len() > MAX_RECORD_LEN {
                if !discarding {
                    tracing::warn!(
                        "Invalid data format received: record exceeds {MAX_RECORD_LEN} bytes"
                    );
                }
                discarding = true;
                buf.clear();
            }
        }
    }

    fn dispatch(&self, bytes: &[u8]) {
        let line = String::from_utf8_lossy(bytes);
        report(self.handle_line(&line));
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

fn report(outcome: Result<Option<HttpStatus>, RecordError>) {
    match outcome {
        Ok(None) => tracing::debug!("skipping blank line"),
        Ok(Some(status)) if !status.is_success() => {
            tracing::warn!("Collector answered with status {status}")
        }
        Ok(Some(_)) => {}
        Err(RecordError::Parse(e)) => tracing::warn!("Invalid data format received: {e}"),
        Err(RecordError::Transmit(TransmitError::NotConnected)) => {
            tracing::warn!("Network not connected, reading dropped")
        }
        Err(RecordError::Transmit(e)) => tracing::error!("Transmission failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkFlag;
    use crate::reading::NumericPolicy;
    use reqwest::Url;
    use std::time::Duration;

    fn offline_bridge() -> Bridge<LinkFlag> {
        let transmitter = Transmitter::new(
            Url::parse("http://127.0.0.1:9/data").unwrap(),
            Duration::from_millis(100),
        );
        Bridge::new(
            LineParser::new(NumericPolicy::Strict),
            transmitter,
            LinkFlag::new(false),
        )
    }

    #[test]
    fn test_blank_line_is_skipped() {
        let bridge = offline_bridge();
        assert!(matches!(bridge.handle_line("   \r\n"), Ok(None)));
    }

    #[test]
    fn test_malformed_line_is_parse_error() {
        let bridge = offline_bridge();
        let err = bridge.handle_line("36.6,72,98\r\n").unwrap_err();
        assert!(matches!(
            err,
            RecordError::Parse(ParseError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_strict_policy_rejects_bad_number() {
        let bridge = offline_bridge();
        let err = bridge
            .handle_line("abc,72,98,Normal,1500,120,80")
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::Parse(ParseError::InvalidNumber { field: "temperature", .. })
        ));
    }

    #[test]
    fn test_offline_link_drops_valid_record() {
        let bridge = offline_bridge();
        let err = bridge
            .handle_line("36.6,72,98,Normal,1500,120,80")
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::Transmit(TransmitError::NotConnected)
        ));
    }

    #[test]
    fn test_run_propagates_hard_io_errors() {
        struct Broken;
        impl io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
            }
        }

        let bridge = offline_bridge();
        let err = bridge.run(io::BufReader::new(Broken)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::BrokenPipe)));
    }
}
