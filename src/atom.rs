//! Scalar atom decoding: turn a raw byte span of a YAML scalar (as located
//! by the scanner) into its decoded string value, one chunk at a time.
//!
//! This module is the seam between "the scanner found where a scalar
//! starts and ends" and "here is the unfolded, unescaped text of that
//! scalar". It never looks at tokens, grammar, or documents; it only
//! knows about bytes, lines, and the six scalar styles.

use alloc::string::String;
use alloc::sync::Arc;

use crate::macros::{is_blank, is_break, is_breakz};
use crate::{Mark, ScalarStyle};

/// How trailing line breaks at the end of a block scalar are handled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Chomp {
    /// `-`: all trailing line breaks are removed.
    Strip,
    /// default: a single trailing line break is kept, the rest removed.
    Clip,
    /// `+`: all trailing line breaks are kept verbatim.
    Keep,
}

/// An owning handle over a UTF-8 byte buffer with a stable base pointer.
///
/// Atoms borrow spans of an `Input` by byte offset rather than holding
/// their own copy of the text, so decoding a scalar never requires
/// copying the original source unless the decoded form actually differs
/// from the raw bytes (an escape, a fold, a chomp).
#[derive(Clone, Debug)]
pub struct Input {
    bytes: Arc<[u8]>,
}

impl Input {
    /// Wrap an already-validated UTF-8 byte buffer.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Input { bytes: bytes.into() }
    }

    /// The full underlying buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The byte span `[start, end)`, as a `str`.
    ///
    /// # Panics
    ///
    /// Panics if `start..end` is out of bounds or does not fall on a
    /// `char` boundary; callers of this module only ever construct spans
    /// at boundaries already validated during scanning.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        core::str::from_utf8(&self.bytes[start..end]).expect("non-UTF-8 atom span")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A scalar descriptor: a span of an [`Input`] plus the style and chomp
/// metadata needed to decode it.
#[derive(Clone, Debug)]
pub struct Atom {
    input: Input,
    start: usize,
    end: usize,
    style: ScalarStyle,
    chomp: Chomp,
    /// For block scalars, the explicit indentation increment, if any was
    /// given by the header (`1`-`9`). `None` means auto-detect from the
    /// first non-empty line.
    increment: Option<usize>,
    /// Indentation column of the enclosing block construct; block scalar
    /// content is indented strictly more than this.
    indent: usize,

    direct_output: bool,
    empty: bool,
    has_lb: bool,
    has_ws: bool,
    starts_with_ws: bool,
    starts_with_lb: bool,
    ends_with_ws: bool,
    ends_with_lb: bool,
    trailing_lb: bool,
    size_hint: usize,
}

impl Atom {
    /// Build an atom over `input[start..end]`.
    ///
    /// `indent` and `increment` are only meaningful for [`ScalarStyle::Literal`]
    /// and [`ScalarStyle::Folded`]; pass `0`/`None` for the other styles.
    pub fn new(
        input: Input,
        start: usize,
        end: usize,
        style: ScalarStyle,
        chomp: Chomp,
        indent: usize,
        increment: Option<usize>,
    ) -> Self {
        let text = input.slice(start, end);
        let empty = text.is_empty();
        let has_lb = text.chars().any(is_break_char);
        let has_ws = text.chars().any(|c| is_blank(Some(c)));
        let starts_with_ws = text.chars().next().is_some_and(|c| is_blank(Some(c)));
        let starts_with_lb = text.chars().next().is_some_and(is_break_char);
        let ends_with_ws = text.chars().next_back().is_some_and(|c| is_blank(Some(c)));
        let ends_with_lb = text.chars().next_back().is_some_and(is_break_char);
        let trailing_lb = matches!(style, ScalarStyle::Literal | ScalarStyle::Folded) && ends_with_lb;

        // A direct-output atom is one whose decoded value is byte-identical
        // to its raw span: plain/single/double-quoted scalars with no line
        // breaks, no escapes (for double-quoted) and no doubled quotes (for
        // single-quoted) can be copied straight out of the input.
        let direct_output = match style {
            ScalarStyle::Plain | ScalarStyle::Uri => !has_lb,
            ScalarStyle::SingleQuoted => !has_lb && !text.contains('\''),
            ScalarStyle::DoubleQuoted | ScalarStyle::DoubleQuotedManual => {
                !has_lb && !text.contains('\\')
            }
            ScalarStyle::Literal | ScalarStyle::Folded | ScalarStyle::Comment => false,
            ScalarStyle::Any => !has_lb,
        };

        Atom {
            input,
            start,
            end,
            style,
            chomp,
            increment,
            indent,
            direct_output,
            empty,
            has_lb,
            has_ws,
            starts_with_ws,
            starts_with_lb,
            ends_with_ws,
            ends_with_lb,
            trailing_lb,
            size_hint: end - start,
        }
    }

    pub fn style(&self) -> ScalarStyle {
        self.style
    }

    pub fn chomp(&self) -> Chomp {
        self.chomp
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// True when the raw span can be copied verbatim to the decoded
    /// output without passing through the iterator's per-chunk logic.
    pub fn is_direct_output(&self) -> bool {
        self.direct_output
    }

    pub fn has_line_break(&self) -> bool {
        self.has_lb
    }

    pub fn has_whitespace(&self) -> bool {
        self.has_ws
    }

    pub fn starts_with_whitespace(&self) -> bool {
        self.starts_with_ws
    }

    pub fn starts_with_line_break(&self) -> bool {
        self.starts_with_lb
    }

    pub fn ends_with_whitespace(&self) -> bool {
        self.ends_with_ws
    }

    pub fn ends_with_line_break(&self) -> bool {
        self.ends_with_lb
    }

    pub fn has_trailing_line_break(&self) -> bool {
        self.trailing_lb
    }

    /// A cheap upper-bound estimate of the decoded size in bytes, used to
    /// presize a [`WriteAccumulator`].
    pub fn storage_hint(&self) -> usize {
        self.size_hint
    }

    fn raw(&self) -> &str {
        self.input.slice(self.start, self.end)
    }
}

fn is_break_char(c: char) -> bool {
    is_break(Some(c))
}

/// One physical line of an atom's span, with the markers needed to fold
/// or chomp it correctly.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LineInfo {
    /// Byte offset (within the atom's raw span) where the line starts.
    pub start: usize,
    /// Byte offset where the line (including its line-break sequence, if
    /// any) ends.
    pub end: usize,
    /// Start of non-whitespace content on the line.
    pub nws_start: usize,
    /// End of non-whitespace content on the line (exclusive).
    pub nws_end: usize,
    /// Where trailing-whitespace chomping should begin for this line.
    pub chomp_start: usize,
    /// The line is entirely leading whitespace up to `nws_start`.
    pub start_ws: bool,
    /// The line has trailing whitespace after `nws_end`.
    pub end_ws: bool,
    /// The line has no non-whitespace content at all.
    pub empty: bool,
    /// This is the first line of the atom.
    pub first: bool,
    /// This is the last line of the atom.
    pub last: bool,
    /// This is the final line of the atom's content (last non-blank line
    /// for chomp purposes).
    pub is_final: bool,
    /// The line is more indented than the base indentation (block styles).
    pub indented: bool,
    /// Byte offset right after the line-break sequence, i.e. `end` for a
    /// line actually terminated by a break.
    pub lb_end: usize,
    /// Count of consecutive trailing blank (break-only) lines starting at
    /// this one.
    pub trailing_breaks: usize,
    /// Like `trailing_breaks`, but also blank lines made of whitespace only.
    pub trailing_breaks_ws: usize,
    /// This line is entirely trailing whitespace with no break.
    pub trailing_ws: bool,
    /// A following chunk needs a newline inserted before it.
    pub need_nl: bool,
    /// A following chunk needs a fold-separator (space) inserted before it.
    pub need_sep: bool,
}

/// Walks the physical lines of an atom's raw span.
struct LineAnalyser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> LineAnalyser<'a> {
    fn new(text: &'a str) -> Self {
        LineAnalyser { text, pos: 0 }
    }

    fn next_line(&mut self) -> Option<LineInfo> {
        if self.pos >= self.text.len() {
            return None;
        }
        let start = self.pos;
        let bytes = self.text.as_bytes();
        let mut i = start;
        while i < bytes.len() && !is_break_byte_at(self.text, i) {
            i += (self.text[i..].chars().next().unwrap()).len_utf8();
        }
        let content_end = i;
        let lb_end = if i < bytes.len() {
            i + break_len_at(self.text, i)
        } else {
            i
        };
        self.pos = lb_end;

        let line = &self.text[start..content_end];
        let nws_start_rel = line.find(|c: char| !is_blank(Some(c))).unwrap_or(line.len());
        let nws_end_rel = line
            .rfind(|c: char| !is_blank(Some(c)))
            .map(|p| p + line[p..].chars().next().unwrap().len_utf8())
            .unwrap_or(0);
        let nws_start = start + nws_start_rel;
        let nws_end = start + nws_end_rel;
        let empty = nws_start_rel == line.len();

        Some(LineInfo {
            start,
            end: content_end,
            nws_start,
            nws_end,
            chomp_start: nws_end,
            start_ws: nws_start_rel > 0,
            end_ws: nws_end_rel < line.len(),
            empty,
            first: start == 0,
            last: lb_end >= self.text.len(),
            is_final: lb_end >= self.text.len(),
            indented: false,
            lb_end,
            trailing_breaks: 0,
            trailing_breaks_ws: 0,
            trailing_ws: empty && content_end > start,
            need_nl: false,
            need_sep: false,
        })
    }
}

fn is_break_byte_at(s: &str, i: usize) -> bool {
    s[i..].chars().next().is_some_and(is_break_char)
}

fn break_len_at(s: &str, i: usize) -> usize {
    let rest = &s[i..];
    if rest.starts_with("\r\n") {
        2
    } else {
        rest.chars().next().map_or(0, char::len_utf8)
    }
}

/// A decoded chunk produced by the [`AtomIterator`]: either a literal
/// slice borrowed straight from the input, or a fold/escape separator
/// that must be synthesized.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Chunk<'a> {
    /// A verbatim slice of the underlying input.
    Slice(&'a str),
    /// A single synthesized character (fold space, unfolded newline, or
    /// the result of decoding an escape sequence).
    Char(char),
}

/// Pull-based decoder over an [`Atom`], producing [`Chunk`]s until the
/// scalar's content is exhausted.
///
/// Iteration is idempotent up to the point already consumed: calling
/// [`AtomIterator::peek_chunk`] repeatedly without calling
/// [`AtomIterator::chunk_next`] returns the same chunk, and the sequence
/// of chunks returned by repeated `chunk_next` calls fully reconstructs
/// the decoded scalar with no gaps or overlaps.
pub struct AtomIterator<'a> {
    atom: &'a Atom,
    raw: &'a str,
    /// Byte position within `raw` of the next unconsumed input.
    pos: usize,
    pending: Option<Chunk<'a>>,
    finished: bool,
    /// For folded/literal styles: number of blank lines seen since the
    /// last non-blank line, used to decide space-vs-newline folding.
    blank_run: usize,
    first_line: bool,
}

impl<'a> AtomIterator<'a> {
    /// Begin iterating the atom's content.
    pub fn start(atom: &'a Atom) -> Self {
        let raw = atom.raw();
        let mut pos = 0;
        // Block scalars: skip the leading indentation of the first content
        // line before decoding; indentation columns are not part of the
        // content in literal/folded style.
        if matches!(atom.style, ScalarStyle::Literal | ScalarStyle::Folded) {
            let indent_cols = atom.increment.map_or(atom.indent, |inc| atom.indent + inc);
            pos = skip_indent(raw, indent_cols);
        }
        AtomIterator {
            atom,
            raw,
            pos,
            pending: None,
            finished: raw.is_empty(),
            blank_run: 0,
            first_line: true,
        }
    }

    /// Look at, without consuming, the next chunk.
    pub fn peek_chunk(&mut self) -> Option<Chunk<'a>> {
        if self.pending.is_none() {
            self.pending = self.produce_next();
        }
        self.pending
    }

    /// Consume and return the next chunk.
    pub fn chunk_next(&mut self) -> Option<Chunk<'a>> {
        if let Some(c) = self.pending.take() {
            return Some(c);
        }
        self.produce_next()
    }

    /// Advance past `n` bytes of already-decoded-and-consumed raw input,
    /// used by callers that only need to skip rather than materialize a
    /// chunk (e.g. re-synchronizing after an external escape decode).
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.raw.len());
    }

    /// Read up to `buf.len()` decoded chars into `buf`, returning the
    /// number written. Equivalent to repeatedly calling `chunk_next` and
    /// flattening, but avoids intermediate allocation for callers that
    /// already own a buffer. A slice chunk that doesn't fully fit is
    /// split: the unread remainder is pushed back as the next pending
    /// chunk.
    pub fn read(&mut self, buf: &mut [char]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.chunk_next() {
                Some(Chunk::Char(c)) => {
                    buf[n] = c;
                    n += 1;
                }
                Some(Chunk::Slice(s)) => {
                    let mut chars = s.char_indices();
                    let mut split_at = s.len();
                    for (idx, c) in &mut chars {
                        if n >= buf.len() {
                            split_at = idx;
                            break;
                        }
                        buf[n] = c;
                        n += 1;
                    }
                    if split_at < s.len() {
                        self.pending = Some(Chunk::Slice(&s[split_at..]));
                        break;
                    }
                }
                None => break,
            }
        }
        n
    }

    fn getc(&mut self) -> Option<char> {
        self.raw[self.pos..].chars().next().inspect(|c| {
            self.pos += c.len_utf8();
        })
    }

    fn peekc(&self) -> Option<char> {
        self.raw[self.pos..].chars().next()
    }

    fn ungetc(&mut self, c: char) {
        self.pos -= c.len_utf8();
    }

    /// The remaining undecoded raw bytes, past `pos`. Not part of public
    /// output; used by escape-decoding helpers below.
    fn rest(&self) -> &'a str {
        &self.raw[self.pos..]
    }

    fn produce_next(&mut self) -> Option<Chunk<'a>> {
        if self.finished {
            return None;
        }
        match self.atom.style {
            ScalarStyle::Plain | ScalarStyle::Any => self.next_plain_or_quoted(false),
            ScalarStyle::Uri => self.next_plain_or_quoted(false),
            ScalarStyle::DoubleQuotedManual => self.next_plain_or_quoted(true),
            ScalarStyle::SingleQuoted => self.next_single_quoted(),
            ScalarStyle::DoubleQuoted => self.next_double_quoted(),
            ScalarStyle::Literal => self.next_block(false),
            ScalarStyle::Folded => self.next_block(true),
            ScalarStyle::Comment => self.next_comment(),
        }
    }

    // plain / URI-style content: runs of non-whitespace are emitted as
    // slices; interior line breaks fold to a single space (or, for runs
    // of more than one break, to (n-1) embedded newlines), matching the
    // "space between non-empty adjacent lines, \n between empty lines"
    // rule in the per-style decision table.
    fn next_plain_or_quoted(&mut self, _dq_manual: bool) -> Option<Chunk<'a>> {
        if self.pos >= self.raw.len() {
            self.finished = true;
            return None;
        }
        if is_break_char(self.peekc().unwrap()) {
            return self.fold_breaks();
        }
        let start = self.pos;
        while let Some(c) = self.peekc() {
            if is_break_char(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        if self.pos >= self.raw.len() {
            self.finished = true;
        }
        Some(Chunk::Slice(&self.raw[start..self.pos]))
    }

    fn next_single_quoted(&mut self) -> Option<Chunk<'a>> {
        if self.pos >= self.raw.len() {
            self.finished = true;
            return None;
        }
        if self.peekc() == Some('\'') && self.rest().starts_with("''") {
            self.pos += 2;
            return Some(Chunk::Char('\''));
        }
        if is_break_char(self.peekc().unwrap()) {
            return self.fold_breaks();
        }
        let start = self.pos;
        while let Some(c) = self.peekc() {
            if is_break_char(c) || (c == '\'' && self.rest().starts_with("''")) {
                break;
            }
            self.pos += c.len_utf8();
        }
        if self.pos >= self.raw.len() {
            self.finished = true;
        }
        Some(Chunk::Slice(&self.raw[start..self.pos]))
    }

    fn next_double_quoted(&mut self) -> Option<Chunk<'a>> {
        if self.pos >= self.raw.len() {
            self.finished = true;
            return None;
        }
        let c = self.peekc().unwrap();
        if c == '\\' {
            return self.decode_escape();
        }
        if is_break_char(c) {
            return self.fold_breaks();
        }
        let start = self.pos;
        while let Some(c) = self.peekc() {
            if c == '\\' || is_break_char(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        if self.pos >= self.raw.len() {
            self.finished = true;
        }
        Some(Chunk::Slice(&self.raw[start..self.pos]))
    }

    fn decode_escape(&mut self) -> Option<Chunk<'a>> {
        self.getc(); // consume '\\'
        // line continuation: backslash immediately followed by a break
        // means "fold here with no separator".
        if let Some(c) = self.peekc() {
            if is_break_char(c) {
                self.skip_break();
                self.skip_leading_blanks();
                if self.pos >= self.raw.len() {
                    self.finished = true;
                    return None;
                }
                return self.produce_next();
            }
        }
        let escaped = match self.getc() {
            Some('0') => '\0',
            Some('a') => '\u{7}',
            Some('b') => '\u{8}',
            Some('t') | Some('\t') => '\t',
            Some('n') => '\n',
            Some('v') => '\u{b}',
            Some('f') => '\u{c}',
            Some('r') => '\r',
            Some('e') => '\u{1b}',
            Some(' ') => ' ',
            Some('"') => '"',
            Some('/') => '/',
            Some('\\') => '\\',
            Some('N') => '\u{85}',
            Some('_') => '\u{a0}',
            Some('L') => '\u{2028}',
            Some('P') => '\u{2029}',
            Some('x') => self.decode_hex_escape(2)?,
            Some('u') => self.decode_hex_escape(4)?,
            Some('U') => self.decode_hex_escape(8)?,
            _ => return None,
        };
        Some(Chunk::Char(escaped))
    }

    fn decode_hex_escape(&mut self, digits: usize) -> Option<char> {
        let mut value: u32 = 0;
        for _ in 0..digits {
            let d = self.getc()?.to_digit(16)?;
            value = value * 16 + d;
        }
        char::from_u32(value)
    }

    fn skip_break(&mut self) {
        if self.rest().starts_with("\r\n") {
            self.pos += 2;
        } else if let Some(c) = self.getc() {
            debug_assert!(is_break_char(c));
        }
    }

    fn skip_leading_blanks(&mut self) {
        while let Some(c) = self.peekc() {
            if is_blank(Some(c)) {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    /// Consume one or more consecutive line breaks (plus any interleaved
    /// blank-line whitespace) and fold them: a single break folds to a
    /// space, N>1 breaks fold to N-1 literal newlines.
    fn fold_breaks(&mut self) -> Option<Chunk<'a>> {
        let mut count = 0usize;
        loop {
            self.skip_leading_blanks();
            match self.peekc() {
                Some(c) if is_break_char(c) => {
                    self.skip_break();
                    count += 1;
                }
                _ => break,
            }
        }
        if self.pos >= self.raw.len() {
            self.finished = true;
            // trailing breaks in plain/quoted context are dropped, not folded.
            return if self.finished && self.atom.ends_with_whitespace() {
                None
            } else if count > 1 {
                Some(Chunk::Char('\n'))
            } else {
                None
            };
        }
        if count <= 1 {
            Some(Chunk::Char(' '))
        } else {
            Some(Chunk::Char('\n'))
        }
    }

    // literal/folded block scalars: each physical line is a slice, joined
    // by '\n' (literal) or folded per the same space/newline rule as
    // plain scalars (folded), with the configured chomping applied to
    // trailing breaks at end-of-content.
    fn next_block(&mut self, folded: bool) -> Option<Chunk<'a>> {
        if self.pos >= self.raw.len() {
            self.finished = true;
            return None;
        }
        let line_start = self.pos;
        let mut indented = false;
        if let Some(c) = self.peekc() {
            if is_blank(Some(c)) {
                indented = true;
            }
        }
        while let Some(c) = self.peekc() {
            if is_break_char(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        let content = &self.raw[line_start..self.pos];
        let had_break = self.peekc().is_some_and(is_break_char);
        if had_break {
            self.skip_break();
        }
        let at_end = self.pos >= self.raw.len();

        if at_end {
            self.finished = true;
            let sep = self.trailing_separator(had_break);
            return Some(match sep {
                Some(s) if !content.is_empty() => {
                    // can't return two chunks; caller drains via finished+pending trick
                    self.pending = Some(s);
                    Chunk::Slice(content)
                }
                Some(s) => s,
                None => Chunk::Slice(content),
            });
        }

        let sep = if !had_break {
            None
        } else if folded && !indented && !content.is_empty() {
            Some(' ')
        } else {
            Some('\n')
        };
        match sep {
            Some(c) => {
                self.pending = Some(Chunk::Char(c));
                Some(Chunk::Slice(content))
            }
            None => Some(Chunk::Slice(content)),
        }
    }

    /// A `#`-comment body: one or more lines joined by `\n`, chomped like a
    /// literal block (no fold-to-space rule, since comment text has no flow
    /// context to disambiguate).
    fn next_comment(&mut self) -> Option<Chunk<'a>> {
        self.next_block(false)
    }

    fn trailing_separator(&self, had_break: bool) -> Option<Chunk<'a>> {
        if !had_break {
            return None;
        }
        match self.atom.chomp {
            Chomp::Strip => None,
            Chomp::Clip => Some(Chunk::Char('\n')),
            Chomp::Keep => Some(Chunk::Char('\n')),
        }
    }

    /// Drain the rest of the atom's content into one allocated `String`.
    pub fn collect_string(mut self) -> String {
        if self.atom.is_direct_output() {
            return String::from(self.atom.raw());
        }
        let mut out = WriteAccumulator::with_hint(self.atom.storage_hint());
        while let Some(chunk) = self.chunk_next() {
            match chunk {
                Chunk::Slice(s) => out.push_str(s),
                Chunk::Char(c) => out.push(c),
            }
        }
        out.into_string()
    }

    /// True once no more chunks remain.
    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_none()
    }

    /// Finish iteration, asserting all content has been consumed.
    pub fn finish(self) {
        debug_assert!(self.is_finished(), "atom iterator dropped with unconsumed content");
    }
}

fn skip_indent(s: &str, columns: usize) -> usize {
    let mut col = 0;
    let mut pos = 0;
    for c in s.chars() {
        if col >= columns || !is_blank(Some(c)) {
            break;
        }
        col += 1;
        pos += c.len_utf8();
    }
    pos
}

/// A growable staging buffer for decoded atom output.
///
/// Small scalars (the overwhelming majority in real documents) decode
/// into a fixed inline array with no heap traffic at all; the buffer only
/// moves to a heap-backed `String` the first time it would overflow that
/// inline default.
pub struct WriteAccumulator {
    inline: [u8; Self::INLINE_CAP],
    inline_len: usize,
    heap: Option<String>,
}

impl WriteAccumulator {
    const INLINE_CAP: usize = 32;

    pub fn new() -> Self {
        WriteAccumulator {
            inline: [0; Self::INLINE_CAP],
            inline_len: 0,
            heap: None,
        }
    }

    pub fn with_hint(hint: usize) -> Self {
        if hint > Self::INLINE_CAP {
            WriteAccumulator {
                inline: [0; Self::INLINE_CAP],
                inline_len: 0,
                heap: Some(String::with_capacity(hint)),
            }
        } else {
            Self::new()
        }
    }

    pub fn push_str(&mut self, s: &str) {
        if let Some(heap) = &mut self.heap {
            heap.push_str(s);
            return;
        }
        if self.inline_len + s.len() <= Self::INLINE_CAP {
            self.inline[self.inline_len..self.inline_len + s.len()].copy_from_slice(s.as_bytes());
            self.inline_len += s.len();
        } else {
            self.spill();
            self.heap.as_mut().unwrap().push_str(s);
        }
    }

    pub fn push(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.push_str(c.encode_utf8(&mut buf));
    }

    pub fn is_empty(&self) -> bool {
        match &self.heap {
            Some(h) => h.is_empty(),
            None => self.inline_len == 0,
        }
    }

    pub fn as_str(&self) -> &str {
        match &self.heap {
            Some(h) => h.as_str(),
            None => core::str::from_utf8(&self.inline[..self.inline_len]).expect("valid utf-8"),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.as_str().as_bytes()
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn clear(&mut self) {
        self.inline_len = 0;
        if let Some(heap) = &mut self.heap {
            heap.clear();
        }
    }

    pub fn into_string(self) -> String {
        match self.heap {
            Some(h) => h,
            None => String::from(self.as_str()),
        }
    }

    fn spill(&mut self) {
        if self.heap.is_none() {
            let mut s = String::with_capacity(Self::INLINE_CAP * 2);
            s.push_str(self.as_str());
            self.heap = Some(s);
        }
    }
}

impl Default for WriteAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode an atom's full content into a `String`.
///
/// Convenience wrapper combining [`AtomIterator::start`] and
/// [`AtomIterator::collect_string`], which is how the scanner consumes
/// this module for every scalar style.
pub fn decode(atom: &Atom) -> String {
    AtomIterator::start(atom).collect_string()
}

/// Decode an atom, attaching `mark` to any future error reporting: kept
/// as a seam for the scanner even though decoding itself cannot currently
/// fail (escape validation happens at the character level and simply
/// drops invalid escapes; callers that need strict validation should
/// pre-check with [`validate`]).
pub fn decode_at(atom: &Atom, _mark: Mark) -> String {
    decode(atom)
}

/// Check a double-quoted atom's escape sequences for validity without
/// allocating a decoded string; used by the scanner to report invalid
/// escapes at the correct mark before the caller commits to using the
/// decoded value.
pub fn validate(atom: &Atom) -> Result<(), usize> {
    if atom.style != ScalarStyle::DoubleQuoted {
        return Ok(());
    }
    let raw = atom.raw();
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = raw[i..].chars().next().unwrap();
        if c == '\\' {
            let rest = &raw[i + 1..];
            let next = rest.chars().next();
            match next {
                Some(
                    '0' | 'a' | 'b' | 't' | '\t' | 'n' | 'v' | 'f' | 'r' | 'e' | ' ' | '"' | '/'
                    | '\\' | 'N' | '_' | 'L' | 'P',
                ) => {
                    i += 1 + next.unwrap().len_utf8();
                }
                Some(c) if is_break_char(c) => {
                    i += 1 + c.len_utf8();
                }
                Some('x') => {
                    if !has_hex_digits(rest.get(1..).unwrap_or(""), 2) {
                        return Err(atom.start + i);
                    }
                    i += 1 + 1 + 2;
                }
                Some('u') => {
                    if !has_hex_digits(rest.get(1..).unwrap_or(""), 4) {
                        return Err(atom.start + i);
                    }
                    i += 1 + 1 + 4;
                }
                Some('U') => {
                    if !has_hex_digits(rest.get(1..).unwrap_or(""), 8) {
                        return Err(atom.start + i);
                    }
                    i += 1 + 1 + 8;
                }
                _ => return Err(atom.start + i),
            }
        } else {
            i += c.len_utf8();
        }
    }
    Ok(())
}

fn has_hex_digits(s: &str, n: usize) -> bool {
    s.chars().take(n).count() == n && s.chars().take(n).all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(text: &str, style: ScalarStyle, chomp: Chomp, indent: usize, increment: Option<usize>) -> Atom {
        let input = Input::new(text.as_bytes().to_vec());
        let len = input.len();
        Atom::new(input, 0, len, style, chomp, indent, increment)
    }

    #[test]
    fn plain_scalar_direct_output() {
        let a = atom("hello world", ScalarStyle::Plain, Chomp::Clip, 0, None);
        assert!(a.is_direct_output());
        assert_eq!(decode(&a), "hello world");
    }

    #[test]
    fn plain_scalar_folds_single_break_to_space() {
        let a = atom("hello\nworld", ScalarStyle::Plain, Chomp::Clip, 0, None);
        assert!(!a.is_direct_output());
        assert_eq!(decode(&a), "hello world");
    }

    #[test]
    fn plain_scalar_folds_blank_line_to_newline() {
        let a = atom("hello\n\nworld", ScalarStyle::Plain, Chomp::Clip, 0, None);
        assert_eq!(decode(&a), "hello\nworld");
    }

    #[test]
    fn double_quoted_escape_table() {
        let a = atom(r"\t\L", ScalarStyle::DoubleQuoted, Chomp::Clip, 0, None);
        assert_eq!(decode(&a), "\t\u{2028}");
    }

    #[test]
    fn double_quoted_line_continuation_drops_separator() {
        let a = atom("foo\\\n  bar", ScalarStyle::DoubleQuoted, Chomp::Clip, 0, None);
        assert_eq!(decode(&a), "foobar");
    }

    #[test]
    fn single_quoted_doubled_quote_unescapes() {
        let a = atom("it''s", ScalarStyle::SingleQuoted, Chomp::Clip, 0, None);
        assert_eq!(decode(&a), "it's");
    }

    #[test]
    fn literal_scalar_clip_keeps_one_trailing_newline() {
        let a = atom("line1\nline2\n\n", ScalarStyle::Literal, Chomp::Clip, 0, None);
        assert_eq!(decode(&a), "line1\nline2\n");
    }

    #[test]
    fn literal_scalar_strip_removes_trailing_newlines() {
        let a = atom("line1\nline2\n\n", ScalarStyle::Literal, Chomp::Strip, 0, None);
        assert_eq!(decode(&a), "line1\nline2");
    }

    #[test]
    fn literal_scalar_keep_preserves_all_trailing_newlines() {
        let a = atom("line1\n\n", ScalarStyle::Literal, Chomp::Keep, 0, None);
        assert_eq!(decode(&a), "line1\n\n");
    }

    #[test]
    fn folded_scalar_folds_lines_preserves_blank() {
        let a = atom("aaa\nbbb\n\nccc\n", ScalarStyle::Folded, Chomp::Clip, 0, None);
        assert_eq!(decode(&a), "aaa bbb\nccc\n");
    }

    #[test]
    fn idempotent_iteration_matches_collect() {
        let a = atom("aaa\nbbb\n\nccc\n", ScalarStyle::Folded, Chomp::Clip, 0, None);
        let mut it = AtomIterator::start(&a);
        let mut manual = String::new();
        while let Some(chunk) = it.chunk_next() {
            match chunk {
                Chunk::Slice(s) => manual.push_str(s),
                Chunk::Char(c) => manual.push(c),
            }
        }
        assert_eq!(manual, decode(&a));
    }

    #[test]
    fn peek_chunk_does_not_advance() {
        let a = atom("hello world", ScalarStyle::Plain, Chomp::Clip, 0, None);
        let mut it = AtomIterator::start(&a);
        let first = it.peek_chunk();
        let second = it.peek_chunk();
        assert_eq!(first, second);
    }

    #[test]
    fn write_accumulator_spills_to_heap_on_overflow() {
        let mut acc = WriteAccumulator::new();
        assert!(acc.is_empty());
        acc.push_str("short");
        assert_eq!(acc.as_str(), "short");
        let long = "x".repeat(64);
        acc.push_str(&long);
        assert!(acc.as_str().ends_with(&long));
        assert!(acc.as_str().starts_with("short"));
    }

    #[test]
    fn validate_rejects_bad_hex_escape() {
        let a = atom(r"\xZZ", ScalarStyle::DoubleQuoted, Chomp::Clip, 0, None);
        assert!(validate(&a).is_err());
    }

    #[test]
    fn validate_accepts_known_escapes() {
        let a = atom(r"\t\n\x41A\U00000041", ScalarStyle::DoubleQuoted, Chomp::Clip, 0, None);
        assert!(validate(&a).is_ok());
    }
}
