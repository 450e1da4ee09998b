//! Event source abstraction.
//!
//! The replay engine does not decode wire formats. It consumes an
//! [`EventSource`]: anything that can hand over already-decoded
//! [`FeedEvent`]s in arrival order, followed by end of stream.
//!
//! # Design Goals
//!
//! - **Scoped**: `events()` consumes the source; dropping the iterator
//!   releases whatever it holds, whether the replay finished or failed
//! - **Iterator-Based**: end of stream is iterator exhaustion
//! - **Fallible**: each item is a `Result` so decode failures stop the run
//!
//! # Example
//!
//! ```
//! use tob_residency::source::{EventSource, VecSource};
//! use tob_residency::{FeedEvent, Side};
//!
//! let source = VecSource::new(vec![
//!     FeedEvent::time(34_200),
//!     FeedEvent::add(1, "AAPL", Side::Buy, 100, 1_500_000),
//! ]);
//!
//! let count = source.events().unwrap().count();
//! assert_eq!(count, 2);
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::error::{Result, ResidencyError};
use crate::types::FeedEvent;

/// I/O buffer size for file reading.
pub const IO_BUFFER_SIZE: usize = 1024 * 1024;

// ============================================================================
// Source Metadata
// ============================================================================

/// Metadata about an event source, used for logging.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    /// Original file path (if loaded from file)
    pub file_path: Option<PathBuf>,

    /// Where the events come from (e.g., "memory", "jsonl", "stdin")
    pub provider: Option<String>,

    /// Estimated event count (for progress tracking)
    pub estimated_events: Option<u64>,

    /// File size in bytes (if applicable)
    pub file_size: Option<u64>,
}

impl SourceMetadata {
    /// Create new empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file path.
    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the estimated event count.
    pub fn with_estimated_events(mut self, count: u64) -> Self {
        self.estimated_events = Some(count);
        self
    }

    /// Set the file size.
    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    /// One-line description for logs.
    pub fn describe(&self) -> String {
        let provider = self.provider.as_deref().unwrap_or("unknown");
        match (&self.file_path, self.file_size) {
            (Some(path), Some(size)) => format!("{provider} {} ({size} bytes)", path.display()),
            (Some(path), None) => format!("{provider} {}", path.display()),
            (None, _) => match self.estimated_events {
                Some(n) => format!("{provider} ({n} events)"),
                None => provider.to_string(),
            },
        }
    }
}

// ============================================================================
// Event Source Trait
// ============================================================================

/// Trait for event sources.
///
/// # Implementation Notes
///
/// - `events()` consumes `self` to allow single-pass iteration
/// - Items are yielded in arrival order; the engine never reorders them
/// - A decoding failure is yielded as `Err` and ends the replay
pub trait EventSource {
    /// The iterator type for events.
    type Events: Iterator<Item = Result<FeedEvent>>;

    /// Consume the source and return an iterator over events.
    fn events(self) -> Result<Self::Events>;

    /// Get metadata about the source.
    fn metadata(&self) -> &SourceMetadata;
}

// ============================================================================
// Vector Source (for testing)
// ============================================================================

/// A simple in-memory source.
///
/// Useful for unit tests, benches and simulations.
pub struct VecSource {
    events: Vec<FeedEvent>,
    metadata: SourceMetadata,
}

impl VecSource {
    /// Create a new vector source.
    pub fn new(events: Vec<FeedEvent>) -> Self {
        Self {
            metadata: SourceMetadata::new()
                .with_provider("memory")
                .with_estimated_events(events.len() as u64),
            events,
        }
    }
}

impl EventSource for VecSource {
    type Events = std::iter::Map<std::vec::IntoIter<FeedEvent>, fn(FeedEvent) -> Result<FeedEvent>>;

    fn events(self) -> Result<Self::Events> {
        Ok(self.events.into_iter().map(Ok as fn(FeedEvent) -> Result<FeedEvent>))
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

// ============================================================================
// JSON Lines Source
// ============================================================================

/// Events encoded as one JSON object per line.
///
/// ```text
/// {"type":"time","seconds":34200}
/// {"type":"add_order","time_offset_ns":1500,"order_id":1,"side":"Buy","shares":100,"symbol":"AAPL","price":1500000}
/// {"type":"delete_order","time_offset_ns":9000,"order_id":1}
/// ```
///
/// Blank lines are skipped.
pub struct JsonLinesSource {
    reader: Box<dyn BufRead>,
    metadata: SourceMetadata,
}

impl JsonLinesSource {
    /// Read events from any buffered reader.
    pub fn from_reader<R: BufRead + 'static>(reader: R) -> Self {
        Self {
            reader: Box::new(reader),
            metadata: SourceMetadata::new().with_provider("jsonl"),
        }
    }

    /// Read events from standard input.
    pub fn stdin() -> Self {
        Self {
            reader: Box::new(BufReader::with_capacity(IO_BUFFER_SIZE, io::stdin())),
            metadata: SourceMetadata::new().with_provider("stdin"),
        }
    }

    /// Open a file; a `.zst` suffix selects zstd decompression.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ResidencyError::Io(format!("Failed to open {}: {e}", path.display()))
        })?;
        let mut metadata = SourceMetadata::new()
            .with_provider("jsonl")
            .with_file_path(path);
        if let Ok(meta) = file.metadata() {
            metadata = metadata.with_file_size(meta.len());
        }

        let buffered = BufReader::with_capacity(IO_BUFFER_SIZE, file);
        let reader: Box<dyn BufRead> = if path.extension().map_or(false, |e| e == "zst") {
            Self::zstd_reader(buffered)?
        } else {
            Box::new(buffered)
        };

        Ok(Self { reader, metadata })
    }

    #[cfg(feature = "zstd")]
    fn zstd_reader(buffered: BufReader<File>) -> Result<Box<dyn BufRead>> {
        let decoder = zstd::stream::read::Decoder::with_buffer(buffered)?;
        Ok(Box::new(BufReader::with_capacity(IO_BUFFER_SIZE, decoder)))
    }

    #[cfg(not(feature = "zstd"))]
    fn zstd_reader(_buffered: BufReader<File>) -> Result<Box<dyn BufRead>> {
        Err(ResidencyError::generic(
            "zstd input requires the `zstd` feature",
        ))
    }
}

impl EventSource for JsonLinesSource {
    type Events = JsonLinesIter;

    fn events(self) -> Result<Self::Events> {
        Ok(JsonLinesIter {
            lines: self.reader.lines(),
            line: 0,
        })
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

/// Iterator over the events of a [`JsonLinesSource`].
pub struct JsonLinesIter {
    lines: Lines<Box<dyn BufRead>>,
    line: u64,
}

impl Iterator for JsonLinesIter {
    type Item = Result<FeedEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;

            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Some(serde_json::from_str(trimmed).map_err(|e| ResidencyError::Decode {
                line: self.line,
                message: e.to_string(),
            }));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
