//! Source positions.
//!
//! Offsets produced by the matcher are byte offsets. Turning them into
//! line/column pairs needs the line boundaries of the source, which are
//! discovered incrementally and shared through a process-wide cache: one
//! entry per distinct source text, scanned at most once from start to end no
//! matter how many positions are asked for.
//!
//! Line and column are 0-based and the column counts characters, like the
//! 1-based columns of `MatchError`. `"\r\n"`, a lone `"\r"` and a lone
//! `"\n"` each end one line.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, OnceLock, PoisonError};

use htmpl_grammar::Span;

/// A 0-based line/column pair. The column counts characters from the line start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for LineColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.line, self.column)
    }
}

/// Start and end line/column of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineSpan {
    pub start: LineColumn,
    pub end: LineColumn,
}

// ---------------------------------------------------------------------------
// Cache entries
// ---------------------------------------------------------------------------

/// Line boundaries discovered so far in one source text.
#[derive(Debug)]
pub struct CacheEntry {
    /// Byte offset at which each known line starts. Always begins with 0 and
    /// only ever grows.
    line_starts: Vec<usize>,
    /// Bytes before this offset have been scanned.
    scanned: usize,
}

impl CacheEntry {
    fn new() -> Self {
        Self {
            line_starts: vec![0],
            scanned: 0,
        }
    }

    /// Line/column of `offset` in `source`, scanning only what has not been
    /// scanned before.
    fn line_column(&mut self, source: &str, offset: usize) -> LineColumn {
        let offset = offset.min(source.len());
        self.scan_to(source.as_bytes(), offset);

        // `line_starts[0] == 0`, so at least one start is <= offset.
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let column = source.as_bytes()[self.line_starts[line]..offset]
            .iter()
            .filter(|&&byte| !is_continuation(byte))
            .count();
        LineColumn { line, column }
    }

    /// Record every line start at or before `target`.
    fn scan_to(&mut self, bytes: &[u8], target: usize) {
        let mut i = self.scanned;
        while i < target {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    self.line_starts.push(i + 2);
                    i += 2;
                }
                b'\r' | b'\n' => {
                    self.line_starts.push(i + 1);
                    i += 1;
                }
                _ => i += 1,
            }
        }
        self.scanned = self.scanned.max(i);
    }

    /// Number of line starts discovered so far.
    pub fn known_lines(&self) -> usize {
        self.line_starts.len()
    }
}

// ---------------------------------------------------------------------------
// The cache
// ---------------------------------------------------------------------------

/// Maps source texts to their cache entries.
///
/// Looking up an entry holds the map lock only for the get-or-insert; scanning
/// holds the entry's own lock, so different sources never wait on each other.
#[derive(Debug, Default)]
pub struct SourceCache {
    entries: Mutex<HashMap<Arc<str>, Arc<Mutex<CacheEntry>>>>,
}

static GLOBAL: LazyLock<SourceCache> = LazyLock::new(SourceCache::new);

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache. Entries are never evicted.
    pub fn global() -> &'static SourceCache {
        &GLOBAL
    }

    /// The shared handle for `text`, creating its entry on first use.
    pub fn source(&self, text: &str) -> Source {
        let mut entries = lock(&self.entries);
        if let Some((key, entry)) = entries.get_key_value(text) {
            return Source {
                text: Arc::clone(key),
                entry: Arc::clone(entry),
            };
        }

        log::debug!(target: "htmpl.position", "new source cache entry ({} bytes)", text.len());
        let key: Arc<str> = Arc::from(text);
        let entry = Arc::new(Mutex::new(CacheEntry::new()));
        entries.insert(Arc::clone(&key), Arc::clone(&entry));
        Source { text: key, entry }
    }

    /// Start and end line/column of `span` in `source`.
    pub fn compute_position(&self, source: &str, span: Span) -> LineSpan {
        self.source(source).line_span(span)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Start and end line/column of `span` in `source`, using the global cache.
pub fn compute_position(source: &str, span: Span) -> LineSpan {
    SourceCache::global().compute_position(source, span)
}

/// Whether `byte` continues a multi-byte UTF-8 character.
fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// A poisoned lock only means another thread panicked mid-scan; the
/// boundaries recorded so far are still valid.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A source text together with its cache entry. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Source {
    text: Arc<str>,
    entry: Arc<Mutex<CacheEntry>>,
}

impl Source {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_column(&self, offset: usize) -> LineColumn {
        lock(&self.entry).line_column(&self.text, offset)
    }

    pub fn line_span(&self, span: Span) -> LineSpan {
        let mut entry = lock(&self.entry);
        LineSpan {
            start: entry.line_column(&self.text, span.start),
            end: entry.line_column(&self.text, span.end),
        }
    }

    /// A position covering `span` of this source.
    pub fn position(&self, span: Span) -> Position {
        Position::new(self.clone(), span)
    }

    pub fn known_lines(&self) -> usize {
        lock(&self.entry).known_lines()
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Where a CST node sits in its source.
///
/// Line/column pairs are computed on first request and kept.
#[derive(Debug, Clone)]
pub struct Position {
    source: Source,
    span: Span,
    lines: OnceLock<LineSpan>,
}

impl Position {
    pub fn new(source: Source, span: Span) -> Self {
        Self {
            source,
            span,
            lines: OnceLock::new(),
        }
    }

    /// Byte offset of the start.
    pub fn offset(&self) -> usize {
        self.span.start
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The text this position covers.
    pub fn source_slice(&self) -> &str {
        self.span.slice(self.source.text())
    }

    pub fn line_column(&self) -> LineSpan {
        *self.lines.get_or_init(|| self.source.line_span(self.span))
    }

    pub fn start(&self) -> LineColumn {
        self.line_column().start
    }

    pub fn end(&self) -> LineColumn {
        self.line_column().end
    }
}
