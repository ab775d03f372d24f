//! JSON Lines sink
//!
//! Layers, outermost first: a 4 MiB buffer, an optional gzip encoder, a byte
//! counter, and the target itself (file or standard output). Finalizing
//! unwinds them in that order so the gzip trailer is written before the
//! target is flushed.
//!
//! The layers are blocking `std::io` writers. Calls that reach past the
//! buffer (a spill into gzip and the target, or finalization) run under
//! `block_in_place` on a multi-threaded runtime.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::debug;

use crate::error::SinkError;
use crate::export::options::OutputTarget;

use super::{CountingWriter, OUTPUT_BUFFER_SIZE, RecordSink};

type Target = CountingWriter<Box<dyn Write + Send>>;

enum Encoder {
    Plain(Target),
    Gzip(GzEncoder<Target>),
}

impl Write for Encoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::Plain(w) => w.write(buf),
            Encoder::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::Plain(w) => w.flush(),
            Encoder::Gzip(w) => w.flush(),
        }
    }
}

/// Writer for newline-delimited JSON records
///
/// Dropping the sink without calling [`RecordSink::finalize`] still flushes
/// the buffer and closes the gzip stream, with errors ignored.
pub struct JsonLinesSink {
    /// Buffered writer, `None` once finalized
    writer: Option<BufWriter<Encoder>>,
    /// Target description for logging
    label: String,
    compressed: bool,
    /// Number of lines written
    written: u64,
    /// Target size recorded by the first finalize
    finalized: Option<u64>,
}

impl JsonLinesSink {
    /// Open the output target, truncating an existing file
    ///
    /// # Arguments
    /// * `target` - File path or standard output
    /// * `compress` - Whether to gzip everything written
    pub fn open(target: &OutputTarget, compress: bool) -> Result<Self, SinkError> {
        let inner: Box<dyn Write + Send> = match target {
            OutputTarget::Stdout => Box::new(io::stdout()),
            OutputTarget::File(path) => {
                let file = File::create(path).map_err(|source| SinkError::Open {
                    path: path.display().to_string(),
                    source,
                })?;
                Box::new(file)
            }
        };

        Ok(Self::from_writer(inner, compress, target.to_string()))
    }

    /// Build a sink over any writer
    pub fn from_writer(inner: Box<dyn Write + Send>, compress: bool, label: impl Into<String>) -> Self {
        let target = CountingWriter::new(inner);
        let encoder = if compress {
            Encoder::Gzip(GzEncoder::new(target, Compression::default()))
        } else {
            Encoder::Plain(target)
        };
        let label = label.into();

        debug!("Created JSON Lines sink for {} (gzip: {})", label, compress);

        Self {
            writer: Some(BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, encoder)),
            label,
            compressed: compress,
            written: 0,
            finalized: None,
        }
    }

    fn close_layers(writer: BufWriter<Encoder>) -> io::Result<u64> {
        let encoder = writer.into_inner().map_err(|e| e.into_error())?;
        let mut target = match encoder {
            Encoder::Plain(target) => target,
            Encoder::Gzip(gz) => gz.finish()?,
        };
        target.flush()?;
        Ok(target.count())
    }
}

/// Run blocking I/O without stalling other tasks on a multi-threaded runtime
fn blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn write_line(&mut self, line: &[u8]) -> Result<u64, SinkError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| SinkError::Write(io::Error::other("sink already finalized")))?;

        let spills = writer.buffer().len() + line.len() + 1 > writer.capacity();
        let mut put = || -> io::Result<()> {
            writer.write_all(line)?;
            writer.write_all(b"\n")
        };
        let result = if spills { blocking(put) } else { put() };
        result.map_err(SinkError::Write)?;
        self.written += 1;

        Ok(line.len() as u64 + 1)
    }

    async fn finalize(&mut self) -> Result<u64, SinkError> {
        if let Some(size) = self.finalized {
            return Ok(size);
        }
        let Some(writer) = self.writer.take() else {
            return Ok(0);
        };

        let size = blocking(|| Self::close_layers(writer)).map_err(SinkError::Finalize)?;
        self.finalized = Some(size);

        debug!(
            "Finalized JSON Lines output: {} ({} lines, {} bytes)",
            self.label, self.written, size
        );
        Ok(size)
    }

    fn is_compressed(&self) -> bool {
        self.compressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    async fn write_lines(target: &OutputTarget, compress: bool, lines: &[&str]) -> u64 {
        let mut sink = JsonLinesSink::open(target, compress).unwrap();
        for line in lines {
            sink.write_line(line.as_bytes()).await.unwrap();
        }
        sink.finalize().await.unwrap()
    }

    #[tokio::test]
    async fn test_plain_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = OutputTarget::File(dir.path().join("out.json"));

        let size = write_lines(&target, false, &[r#"{"a":1}"#, r#"{"b":2}"#]).await;

        let content = std::fs::read_to_string(dir.path().join("out.json")).unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"b\":2}\n");
        assert_eq!(size, content.len() as u64);
    }

    #[tokio::test]
    async fn test_gzip_decompresses_to_plain_output() {
        let dir = tempfile::tempdir().unwrap();
        let lines = [r#"{"_id":"1","_source":{"v":"x"}}"#, r#"{"_id":"2","_source":{"v":"y"}}"#];

        let plain_path = dir.path().join("plain.json");
        let gz_path = dir.path().join("packed.json.gz");
        write_lines(&OutputTarget::File(plain_path.clone()), false, &lines).await;
        let gz_size = write_lines(&OutputTarget::File(gz_path.clone()), true, &lines).await;

        let compressed = std::fs::read(&gz_path).unwrap();
        assert_eq!(gz_size, compressed.len() as u64);

        let mut decoded = Vec::new();
        GzDecoder::new(&compressed[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, std::fs::read(&plain_path).unwrap());
    }

    #[tokio::test]
    async fn test_open_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "stale content that is long\n").unwrap();

        write_lines(&OutputTarget::File(path.clone()), false, &["{}"]).await;
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[tokio::test]
    async fn test_open_invalid_directory() {
        let target = OutputTarget::File(PathBuf::from("/nonexistent/directory/out.json"));
        let result = JsonLinesSink::open(&target, false);
        assert!(matches!(result, Err(SinkError::Open { .. })));
    }

    #[tokio::test]
    async fn test_finalize_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonLinesSink::open(&OutputTarget::File(dir.path().join("o.gz")), true).unwrap();
        sink.write_line(b"{}").await.unwrap();

        let first = sink.finalize().await.unwrap();
        let second = sink.finalize().await.unwrap();
        assert_eq!(first, second);
        assert!(sink.write_line(b"{}").await.is_err());
    }

    #[tokio::test]
    async fn test_drop_flushes_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.json");
        {
            let mut sink = JsonLinesSink::open(&OutputTarget::File(path.clone()), false).unwrap();
            sink.write_line(br#"{"kept":true}"#).await.unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"kept\":true}\n");
    }

    /// Writer whose bytes stay readable after the sink takes ownership
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stream_writer_gzip() {
        let out = SharedBuffer::default();
        let mut sink = JsonLinesSink::from_writer(Box::new(out.clone()), true, "<stdout>");
        sink.write_line(br#"{"_id":"1"}"#).await.unwrap();
        sink.write_line(br#"{"_id":"2"}"#).await.unwrap();
        let size = sink.finalize().await.unwrap();

        let compressed = out.contents();
        assert_eq!(size, compressed.len() as u64);
        let mut decoded = String::new();
        GzDecoder::new(&compressed[..]).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, "{\"_id\":\"1\"}\n{\"_id\":\"2\"}\n");
    }

    #[tokio::test]
    async fn test_stdout_target_opens() {
        let mut sink = JsonLinesSink::open(&OutputTarget::Stdout, false).unwrap();
        assert!(!sink.is_compressed());
        assert_eq!(sink.finalize().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_spills_past_buffer_on_worker_threads() {
        let out = SharedBuffer::default();
        let mut sink = JsonLinesSink::from_writer(Box::new(out.clone()), false, "shared");
        let line = vec![b'x'; 64 * 1024];
        let lines = OUTPUT_BUFFER_SIZE / line.len() + 8;
        for _ in 0..lines {
            sink.write_line(&line).await.unwrap();
        }
        assert!(!out.contents().is_empty());

        let size = sink.finalize().await.unwrap();
        assert_eq!(size, (lines * (line.len() + 1)) as u64);
        assert_eq!(out.contents().len() as u64, size);
    }

    #[tokio::test]
    async fn test_finalize_surfaces_target_errors() {
        let mut sink = JsonLinesSink::from_writer(Box::new(BrokenPipe), false, "broken");
        assert_eq!(sink.write_line(b"{}").await.unwrap(), 3);
        assert!(matches!(sink.finalize().await, Err(SinkError::Finalize(_))));
    }
}
