use crate::buffer::SequenceBuffer;
use crate::clean::MarkerSet;
use crate::error::{IoContext, SourceError};
use crate::policy::{ChunkerOptions, InputMode};
use crate::util::{looks_like_gzip, open_file, trim_line_end};
use crate::window::Window;

#[cfg(feature = "gzip")]
use flate2::read::MultiGzDecoder;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Window bookkeeping shared by the sync and async readers: indices, source
/// offsets, and the line-mode accumulator. Byte transport stays with the caller.
pub(crate) struct WindowCutter {
    chunk_size: usize,
    markers: MarkerSet,
    next_index: usize,
    line_num: u64,
    byte_pos: u64,
    // Start of the source range for the next window.
    window_start: u64,
    content_bytes: u64,
    headers_skipped: u64,
    at_line_start: bool,
    in_header: bool,
    // A '\r' that ended a segment; it is content unless a '\n' follows.
    pending_cr: bool,
    pending: SequenceBuffer,
    pub(crate) eof: bool,
}

impl WindowCutter {
    pub(crate) fn new(opts: &ChunkerOptions) -> Self {
        let pending_cap = match opts.input_mode {
            InputMode::Lines => opts.chunk_size.min(16 * 1024 * 1024),
            InputMode::Fixed => 0,
        };
        Self {
            chunk_size: opts.chunk_size,
            markers: opts.markers.clone(),
            next_index: 0,
            line_num: 0,
            byte_pos: 0,
            window_start: 0,
            content_bytes: 0,
            headers_skipped: 0,
            at_line_start: true,
            in_header: false,
            pending_cr: false,
            pending: SequenceBuffer::with_capacity(pending_cap),
            eof: opts.chunk_size == 0,
        }
    }

    #[inline]
    pub(crate) fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Accepts the bytes of one fixed-size read; a short read marks end of input.
    pub(crate) fn take_fixed(&mut self, data: Vec<u8>) -> Option<Window> {
        if data.len() < self.chunk_size {
            self.eof = true;
        }
        if data.is_empty() {
            return None;
        }
        self.byte_pos += data.len() as u64;
        self.line_num += data.iter().filter(|&&b| b == b'\n').count() as u64;
        self.content_bytes += data.len() as u64;
        Some(self.emit(data))
    }

    /// Takes the next piece of a line from `buf`: up to and including the
    /// first `\n`, and never more than `chunk_size` bytes. Returns the number
    /// of bytes used. An empty `buf` means end of input.
    ///
    /// Long lines therefore reach the accumulator in bounded pieces, and the
    /// caller drains full windows between pieces.
    pub(crate) fn push_segment(&mut self, buf: &[u8]) -> usize {
        if buf.is_empty() {
            // "ACGT\r" at end of input: the '\r' was a terminator.
            self.pending_cr = false;
            self.eof = true;
            return 0;
        }
        let limit = buf.len().min(self.chunk_size.max(1));
        let used = buf[..limit]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(limit, |p| p + 1);
        let seg = &buf[..used];
        self.byte_pos += used as u64;

        if self.at_line_start {
            self.line_num += 1;
            self.in_header = seg[0] == b'>';
            if self.in_header {
                log::debug!("skipping header at line {}", self.line_num);
                self.headers_skipped += 1;
            }
        }
        let ends_line = seg.last() == Some(&b'\n');
        self.at_line_start = ends_line;
        if self.in_header {
            return used;
        }

        let held_cr = std::mem::take(&mut self.pending_cr);
        let content = trim_line_end(seg);
        if !ends_line && content.len() < seg.len() {
            self.pending_cr = true;
        }
        if held_cr && seg != b"\n" {
            self.append_content(b"\r");
        }
        self.append_content(content);
        used
    }

    fn append_content(&mut self, content: &[u8]) {
        if content.is_empty() {
            return;
        }
        self.content_bytes += content.len() as u64;
        let cleaned = self.markers.clean(content);
        self.pending.append(&cleaned);
    }

    pub(crate) fn drain_full(&mut self) -> Option<Window> {
        let data = self.pending.drain_full(self.chunk_size)?;
        Some(self.emit(data))
    }

    pub(crate) fn flush_remainder(&mut self) -> Option<Window> {
        let data = self.pending.flush_remainder()?;
        Some(self.emit(data))
    }

    fn emit(&mut self, data: Vec<u8>) -> Window {
        let index = self.next_index;
        self.next_index += 1;
        let source_range = self.window_start..self.byte_pos;
        self.window_start = self.byte_pos;
        Window {
            index,
            data,
            source_range,
        }
    }

    #[inline]
    pub(crate) fn content_bytes(&self) -> u64 {
        self.content_bytes
    }

    #[inline]
    pub(crate) fn headers_skipped(&self) -> u64 {
        self.headers_skipped
    }

    #[inline]
    pub(crate) fn ctx(&self) -> IoContext {
        IoContext {
            byte_pos: self.byte_pos,
            line_num: self.line_num,
        }
    }
}

/// Sequential window cursor over plain or gzip input. Never re-reads.
pub struct SourceReader {
    rdr: Box<dyn BufRead + Send>,
    mode: InputMode,
    cut: WindowCutter,
}

impl SourceReader {
    /// Open from a file path. Auto-detect `.gz` by extension or magic bytes.
    pub fn from_path<P: AsRef<Path>>(path: P, opts: &ChunkerOptions) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let f = open_file(path).map_err(|e| SourceError::io_err(e, IoContext::default()))?;

        let is_gz = path.extension().and_then(|s| s.to_str()) == Some("gz")
            || looks_like_gzip(&f).unwrap_or(false);

        let rdr: Box<dyn BufRead + Send> = if is_gz {
            #[cfg(feature = "gzip")]
            {
                let dec = MultiGzDecoder::new(f);
                Box::new(BufReader::with_capacity(256 * 1024, dec))
            }
            #[cfg(not(feature = "gzip"))]
            {
                return Err(SourceError::io_err(
                    std::io::Error::new(
                        std::io::ErrorKind::Unsupported,
                        "gzip input requires the `gzip` feature",
                    ),
                    IoContext::default(),
                ));
            }
        } else {
            #[cfg(feature = "mmap")]
            {
                use memmap2::Mmap;
                use std::io::Cursor;
                // Own the Mmap inside Cursor to avoid self-ref problems
                let mmap = unsafe { Mmap::map(&f) }
                    .map_err(|e| SourceError::io_err(e, IoContext::default()))?;
                Box::new(BufReader::with_capacity(512 * 1024, Cursor::new(mmap)))
            }
            #[cfg(not(feature = "mmap"))]
            {
                Box::new(BufReader::with_capacity(256 * 1024, f))
            }
        };

        Ok(Self::new(rdr, opts))
    }

    /// Wrap an arbitrary `BufRead` (stdin, etc.).
    pub fn from_bufread<R: BufRead + Send + 'static>(reader: R, opts: &ChunkerOptions) -> Self {
        Self::new(Box::new(reader), opts)
    }

    fn new(rdr: Box<dyn BufRead + Send>, opts: &ChunkerOptions) -> Self {
        Self {
            rdr,
            mode: opts.input_mode,
            cut: WindowCutter::new(opts),
        }
    }

    /// Content bytes taken from the source so far (headers and line ends excluded in line mode).
    pub fn content_bytes(&self) -> u64 {
        self.cut.content_bytes()
    }

    pub fn headers_skipped(&self) -> u64 {
        self.cut.headers_skipped()
    }

    /// Next window, or `None` at end of input.
    pub fn next_window(&mut self) -> Result<Option<Window>, SourceError> {
        match self.mode {
            InputMode::Fixed => self.next_fixed(),
            InputMode::Lines => self.next_from_lines(),
        }
    }

    fn next_fixed(&mut self) -> Result<Option<Window>, SourceError> {
        if self.cut.eof {
            return Ok(None);
        }
        let chunk_size = self.cut.chunk_size();
        let mut data = Vec::with_capacity(chunk_size);
        Read::by_ref(&mut self.rdr)
            .take(chunk_size as u64)
            .read_to_end(&mut data)
            .map_err(|e| SourceError::io_err(e, self.cut.ctx()))?;
        Ok(self.cut.take_fixed(data))
    }

    fn next_from_lines(&mut self) -> Result<Option<Window>, SourceError> {
        loop {
            if let Some(w) = self.cut.drain_full() {
                return Ok(Some(w));
            }
            if self.cut.eof {
                return Ok(self.cut.flush_remainder());
            }
            let buf = self
                .rdr
                .fill_buf()
                .map_err(|e| SourceError::io_err(e, self.cut.ctx()))?;
            let used = self.cut.push_segment(buf);
            self.rdr.consume(used);
        }
    }
}

impl Iterator for SourceReader {
    type Item = Result<Window, SourceError>;
    fn next(&mut self) -> Option<Self::Item> {
        self.next_window().transpose()
    }
}
