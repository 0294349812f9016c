//! Structural index of a TOML document.
//!
//! A single pass tokenizes just enough TOML to find where every table header
//! and key/value statement starts and ends: basic, literal and multi-line
//! strings, arrays and inline tables spanning lines, and comments are all
//! skipped correctly, so a `[` inside a string or a multi-line array is never
//! taken for a header. Offsets are byte positions into the original source,
//! which lets edits splice text without reserializing untouched regions.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemKind {
    /// `[a.b]`
    Table,
    /// `[[a.b]]`
    ArrayTable,
    /// `key = value`
    KeyValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Item {
    pub kind: ItemKind,
    /// Dotted key, unquoted
    pub key: Vec<String>,
    /// First byte of the statement line
    pub start: usize,
    /// One past the statement's terminating newline (or EOF)
    pub end: usize,
    /// Start of the comment lines directly above, or `start` if none
    pub leading: usize,
}

impl Item {
    pub fn is_header(&self) -> bool {
        self.kind != ItemKind::KeyValue
    }

    pub fn key_is(&self, key: &[&str]) -> bool {
        self.key.len() == key.len() && self.key.iter().zip(key).all(|(a, b)| a == b)
    }

    pub fn key_starts_with(&self, prefix: &[&str]) -> bool {
        self.key.len() >= prefix.len() && self.key.iter().zip(prefix).all(|(a, b)| a == b)
    }

    pub fn key_is_prefix_of(&self, path: &[&str]) -> bool {
        self.key.len() <= path.len() && self.key.iter().zip(path).all(|(a, b)| a == b)
    }
}

/// Bracket offsets of an array value written inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InlineArray {
    pub open: usize,
    pub close: usize,
    /// Last byte of the last element or separator, ignoring comments and blanks
    pub last: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct TomlLayout {
    items: Vec<Item>,
    len: usize,
}

impl TomlLayout {
    pub fn scan(src: &str) -> Self {
        Scanner::new(src).run()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn headers(&self) -> impl Iterator<Item = (usize, &Item)> {
        self.items.iter().enumerate().filter(|(_, i)| i.is_header())
    }

    /// Key/value statements before the first header.
    pub fn root_entries(&self) -> &[Item] {
        let first_header = self
            .items
            .iter()
            .position(Item::is_header)
            .unwrap_or(self.items.len());
        &self.items[..first_header]
    }

    /// Key/value statements owned by the header at `index`.
    pub fn entries(&self, index: usize) -> &[Item] {
        let from = index + 1;
        let to = self.items[from..]
            .iter()
            .position(Item::is_header)
            .map_or(self.items.len(), |p| from + p);
        &self.items[from..to]
    }

    /// Index of the `[key]` header (not array tables).
    pub fn find_table(&self, key: &[&str]) -> Option<usize> {
        self.headers()
            .find(|(_, h)| h.kind == ItemKind::Table && h.key_is(key))
            .map(|(i, _)| i)
    }

    /// Offset just after the last statement of the header at `index`.
    pub fn section_content_end(&self, index: usize) -> usize {
        self.entries(index)
            .last()
            .map_or(self.items[index].end, |kv| kv.end)
    }

    /// The key/value statement that assigns `path`, or one of its parents, inline.
    ///
    /// Every table that could own the statement is searched: `a.b.c` may be
    /// written as `a.b.c = ...` at the root, `b.c = ...` under `[a]`, or
    /// `c = ...` under `[a.b]`. The flag is true when the statement assigns
    /// `path` itself rather than a parent inline table.
    pub fn inline_assignment(&self, path: &[&str]) -> Option<(&Item, bool)> {
        (0..path.len()).find_map(|split| {
            let (table, rest) = path.split_at(split);
            let entries = if table.is_empty() {
                self.root_entries()
            } else {
                self.entries(self.find_table(table)?)
            };
            entries
                .iter()
                .find(|e| e.key_is_prefix_of(rest))
                .map(|e| (e, e.key.len() == rest.len()))
        })
    }

    /// Offset where top-level tables go: above the first `env` header, or EOF.
    pub fn top_level_insertion_point(&self) -> usize {
        self.headers()
            .find(|(_, h)| h.key.first().map(String::as_str) == Some("env"))
            .map_or(self.len, |(_, h)| h.leading)
    }

    /// Offset closing the first run of headers belonging to `env.<name>`.
    ///
    /// The run ends at the first following header that is not a sub-table of
    /// the same environment. `None` when the environment has no header.
    pub fn env_insertion_point(&self, name: &str) -> Option<usize> {
        let prefix = ["env", name];
        let (first, _) = self.headers().find(|(_, h)| h.key_starts_with(&prefix))?;
        let boundary = self
            .headers()
            .skip_while(|(i, _)| *i <= first)
            .find(|(_, h)| !h.key_starts_with(&prefix))
            .map_or(self.len, |(_, h)| h.leading);
        Some(boundary)
    }

    /// Byte ranges of every section under `prefix`, attached comments included.
    pub fn sections_under(&self, prefix: &[&str]) -> Vec<Range<usize>> {
        let headers: Vec<(usize, &Item)> = self.headers().collect();
        let mut ranges: Vec<Range<usize>> = Vec::new();

        for (pos, (_, header)) in headers.iter().enumerate() {
            if !header.key_starts_with(prefix) {
                continue;
            }
            let end = headers
                .get(pos + 1)
                .map_or(self.len, |(_, next)| next.leading);
            match ranges.last_mut() {
                Some(last) if last.end == header.leading => last.end = end,
                _ => ranges.push(header.leading..end),
            }
        }

        ranges
    }
}

/// Locate the inline array assigned by the statement `item`, if its value is one.
pub(crate) fn inline_array(src: &str, item: &Item) -> Option<InlineArray> {
    let scanner = Scanner::new(src);
    let from = scanner.skip_blanks(item.start);
    let (_, eq) = scanner.read_key(from, b'=');
    if scanner.src.get(eq) != Some(&b'=') {
        return None;
    }
    let open = scanner.skip_blanks(eq + 1);
    if scanner.src.get(open) != Some(&b'[') {
        return None;
    }
    scanner.array_bounds(open)
}

struct Scanner<'a> {
    src: &'a [u8],
    items: Vec<Item>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            items: Vec::new(),
        }
    }

    fn run(mut self) -> TomlLayout {
        let len = self.src.len();
        let mut pos = 0;
        let mut comments_from: Option<usize> = None;

        while pos < len {
            let line_start = pos;
            let p = self.skip_blanks(pos);
            if p >= len {
                break;
            }

            match self.src[p] {
                b'\n' | b'\r' => {
                    comments_from = None;
                    pos = self.next_line(p);
                }
                b'#' => {
                    comments_from.get_or_insert(line_start);
                    pos = self.next_line(p);
                }
                b'[' => {
                    let is_array = self.src.get(p + 1) == Some(&b'[');
                    let key_from = if is_array { p + 2 } else { p + 1 };
                    let (key, close) = self.read_key(key_from, b']');
                    let end = self.next_line(close);
                    self.items.push(Item {
                        kind: if is_array {
                            ItemKind::ArrayTable
                        } else {
                            ItemKind::Table
                        },
                        key,
                        start: line_start,
                        end,
                        leading: comments_from.take().unwrap_or(line_start),
                    });
                    pos = end;
                }
                _ => {
                    let (key, eq) = self.read_key(p, b'=');
                    let end = if self.src.get(eq) == Some(&b'=') {
                        self.skip_value(eq + 1)
                    } else {
                        self.next_line(eq)
                    };
                    self.items.push(Item {
                        kind: ItemKind::KeyValue,
                        key,
                        start: line_start,
                        end,
                        leading: comments_from.take().unwrap_or(line_start),
                    });
                    pos = end;
                }
            }
        }

        TomlLayout {
            items: self.items,
            len,
        }
    }

    fn skip_blanks(&self, mut pos: usize) -> usize {
        while pos < self.src.len() && matches!(self.src[pos], b' ' | b'\t') {
            pos += 1;
        }
        pos
    }

    fn next_line(&self, from: usize) -> usize {
        self.src[from.min(self.src.len())..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.src.len(), |p| from + p + 1)
    }

    /// Read a dotted key up to `stop`, returning segments and the stop offset.
    fn read_key(&self, from: usize, stop: u8) -> (Vec<String>, usize) {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut pos = from;

        while pos < self.src.len() {
            match self.src[pos] {
                b if b == stop => break,
                b'\n' => break,
                b'.' => {
                    segments.push(std::mem::take(&mut current).trim().to_string());
                    pos += 1;
                }
                quote @ (b'"' | b'\'') => {
                    let close = self.string_end(pos, quote);
                    let inner = &self.src[pos + 1..close.saturating_sub(1).max(pos + 1)];
                    current.push_str(&unescape_key(inner, quote == b'"'));
                    pos = close;
                }
                _ => {
                    let run_end = self.src[pos..]
                        .iter()
                        .position(|&b| matches!(b, b'.' | b'"' | b'\'' | b'\n') || b == stop)
                        .map_or(self.src.len(), |p| pos + p);
                    current.push_str(&String::from_utf8_lossy(&self.src[pos..run_end]));
                    pos = run_end;
                }
            }
        }
        segments.push(current.trim().to_string());
        (segments, pos.min(self.src.len()))
    }

    /// Offset one past the closing quote of a single-line string at `from`.
    fn string_end(&self, from: usize, quote: u8) -> usize {
        let mut pos = from + 1;
        while pos < self.src.len() {
            match self.src[pos] {
                b'\\' if quote == b'"' => pos += 2,
                b'\n' => return pos,
                b if b == quote => return pos + 1,
                _ => pos += 1,
            }
        }
        self.src.len()
    }

    /// Offset one past the closing delimiter of a multi-line string at `from`.
    fn multiline_end(&self, from: usize, quote: u8) -> usize {
        let delim = [quote; 3];
        let mut pos = from + 3;
        while pos < self.src.len() {
            if quote == b'"' && self.src[pos] == b'\\' {
                pos += 2;
                continue;
            }
            if self.src[pos..].starts_with(&delim) {
                pos += 3;
                // up to two quotes may directly precede the closing delimiter
                while pos < self.src.len() && self.src[pos] == quote {
                    pos += 1;
                }
                return pos;
            }
            pos += 1;
        }
        self.src.len()
    }

    /// Bracket offsets of the array opening at `open`.
    fn array_bounds(&self, open: usize) -> Option<InlineArray> {
        let mut depth = 0usize;
        let mut last = None;
        let mut pos = open;

        while pos < self.src.len() {
            match self.src[pos] {
                quote @ (b'"' | b'\'') => {
                    let end = if self.src[pos..].starts_with(&[quote; 3]) {
                        self.multiline_end(pos, quote)
                    } else {
                        self.string_end(pos, quote)
                    };
                    last = Some(end - 1);
                    pos = end;
                }
                b'[' | b'{' => {
                    if pos != open {
                        last = Some(pos);
                    }
                    depth += 1;
                    pos += 1;
                }
                b']' | b'}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(InlineArray {
                            open,
                            close: pos,
                            last,
                        });
                    }
                    last = Some(pos);
                    pos += 1;
                }
                b'#' => {
                    pos = self.src[pos..]
                        .iter()
                        .position(|&b| b == b'\n')
                        .map_or(self.src.len(), |p| pos + p);
                }
                b' ' | b'\t' | b'\r' | b'\n' => pos += 1,
                _ => {
                    last = Some(pos);
                    pos += 1;
                }
            }
        }
        None
    }

    /// Skip a value and return the offset after its statement's newline.
    fn skip_value(&self, from: usize) -> usize {
        let mut depth = 0usize;
        let mut pos = from;

        while pos < self.src.len() {
            match self.src[pos] {
                quote @ (b'"' | b'\'') => {
                    pos = if self.src[pos..].starts_with(&[quote; 3]) {
                        self.multiline_end(pos, quote)
                    } else {
                        self.string_end(pos, quote)
                    };
                }
                b'[' | b'{' => {
                    depth += 1;
                    pos += 1;
                }
                b']' | b'}' => {
                    depth = depth.saturating_sub(1);
                    pos += 1;
                }
                b'#' => {
                    pos = self.src[pos..]
                        .iter()
                        .position(|&b| b == b'\n')
                        .map_or(self.src.len(), |p| pos + p);
                }
                b'\n' if depth == 0 => return pos + 1,
                _ => pos += 1,
            }
        }
        self.src.len()
    }
}

fn unescape_key(raw: &[u8], basic: bool) -> String {
    let text = String::from_utf8_lossy(raw);
    if !basic {
        return text.into_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
