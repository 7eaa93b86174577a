//! Streaming zip assembly.
//!
//! [`ArchiveStream::spawn`] runs a zip writer on a blocking thread. Entries
//! arrive on a channel as they become ready and the archive bytes leave
//! through a bounded channel, so a slow consumer throttles the writer rather
//! than letting output pile up in memory. Dropping the stream cancels the
//! writer; it then stops at the next write, closes any open entry file, and
//! publishes [`ArchiveState::Aborted`].

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Outbound chunks buffered between the writer and the consumer.
const CHUNK_BUFFER: usize = 4;

/// Size of each outbound chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// One file to append to the archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Name inside the archive.
    pub name: String,
    /// File on disk holding the entry's bytes.
    pub path: PathBuf,
}

/// Lifecycle of one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    /// Entries are still being accepted.
    Dispatching,
    /// The entry list is closed; the central directory is being written.
    Finalizing,
    /// The archive was completely written.
    Closed,
    /// The consumer went away or a write failed before completion.
    Aborted,
}

impl ArchiveState {
    /// Whether the writer has stopped.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Aborted)
    }
}

/// `Write` adapter pushing bytes into the outbound channel.
struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    cancel: CancellationToken,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "archive consumer gone"));
        }
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive consumer gone"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A zip archive being produced incrementally.
///
/// Yields the archive bytes. Dropping it aborts the writer.
pub struct ArchiveStream {
    rx: mpsc::Receiver<io::Result<Bytes>>,
    state: watch::Receiver<ArchiveState>,
    _cancel: DropGuard,
}

impl std::fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStream")
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl ArchiveStream {
    /// Start a writer consuming `entries` until the channel closes.
    ///
    /// `cancel` is cancelled when the returned stream is dropped, and the
    /// writer also stops if it is cancelled from elsewhere.
    pub fn spawn(entries: mpsc::Receiver<ArchiveEntry>, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(CHUNK_BUFFER);
        let (state_tx, state_rx) = watch::channel(ArchiveState::Dispatching);

        let writer_cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let error_tx = tx.clone();
            let sink = ChannelWriter {
                tx,
                cancel: writer_cancel.clone(),
            };
            match write_archive(entries, sink, &state_tx, &writer_cancel) {
                Ok(count) => {
                    state_tx.send_replace(ArchiveState::Closed);
                    info!(entries = count, "Archive closed");
                }
                Err(e) => {
                    state_tx.send_replace(ArchiveState::Aborted);
                    if writer_cancel.is_cancelled() || e.kind() == io::ErrorKind::BrokenPipe {
                        debug!("Archive aborted by consumer");
                    } else {
                        warn!(error = %e, "Archive writer failed");
                        let _ = error_tx.blocking_send(Err(e));
                    }
                }
            }
        });

        Self {
            rx,
            state: state_rx,
            _cancel: cancel.drop_guard(),
        }
    }

    /// Observe the writer's lifecycle.
    pub fn state(&self) -> watch::Receiver<ArchiveState> {
        self.state.clone()
    }
}

fn write_archive(
    mut entries: mpsc::Receiver<ArchiveEntry>,
    sink: ChannelWriter,
    state: &watch::Sender<ArchiveState>,
    cancel: &CancellationToken,
) -> io::Result<usize> {
    let mut zip = ZipWriter::new_stream(BufWriter::with_capacity(CHUNK_SIZE, sink));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut count = 0usize;

    while let Some(entry) = entries.blocking_recv() {
        if cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "archive cancelled"));
        }
        let mut source = match File::open(&entry.path) {
            Ok(file) => file,
            Err(e) => {
                warn!(entry = %entry.name, error = %e, "Skipping unreadable archive entry");
                continue;
            }
        };
        zip.start_file(entry.name.as_str(), options)
            .map_err(io::Error::other)?;
        io::copy(&mut source, &mut zip)?;
        count += 1;
    }

    if cancel.is_cancelled() {
        return Err(io::Error::new(io::ErrorKind::BrokenPipe, "archive cancelled"));
    }
    state.send_replace(ArchiveState::Finalizing);
    let mut out = zip.finish().map_err(io::Error::other)?;
    out.flush()?;
    Ok(count)
}

impl Stream for ArchiveStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
