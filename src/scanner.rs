//! Turns the decoded character stream from [`crate::reader::Reader`] into a
//! queue of [`Token`]s. Scalar content itself is not unfolded here: this
//! module only locates the raw span of a scalar (tracking indentation,
//! chomping and style) and hands it to [`crate::atom`] for decoding.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use crate::atom::{self, Atom, Chomp, Input};
use crate::macros::{is_alpha, is_blank, is_blankz, is_break, is_breakz, vecdeque_starts_with};
use crate::parser::SimpleKey;
use crate::reader::{self, Reader};
use crate::token::{Token, TokenData};
use crate::{Encoding, Mark, ScalarStyle, ScannerError};

/// Turns decoded input into a stream of tokens, pulled lazily as the
/// parser asks for them.
#[non_exhaustive]
pub(crate) struct Scanner<'r> {
    reader: Reader<'r>,

    pub(crate) stream_start_produced: bool,
    pub(crate) stream_end_produced: bool,
    pub(crate) token_available: bool,
    pub(crate) tokens: VecDeque<Token>,
    pub(crate) tokens_parsed: usize,

    /// Current block indentation column, or `-1` at the top level.
    indent: i32,
    indents: Vec<i32>,
    flow_level: i32,
    simple_key_allowed: bool,
    simple_keys: Vec<SimpleKey>,
}

fn set_scanner_error<T>(
    context: &'static str,
    context_mark: Mark,
    problem: &'static str,
    problem_mark: Mark,
) -> Result<T, ScannerError> {
    Err(ScannerError::Problem {
        context,
        context_mark,
        problem,
        problem_mark,
    })
}

impl<'r> Scanner<'r> {
    pub(crate) fn new() -> Self {
        Scanner {
            reader: Reader::new(),
            stream_start_produced: false,
            stream_end_produced: false,
            token_available: false,
            tokens: VecDeque::new(),
            tokens_parsed: 0,
            indent: -1,
            indents: Vec::new(),
            flow_level: 0,
            simple_key_allowed: true,
            simple_keys: Vec::new(),
        }
    }

    pub(crate) fn set_input_string(&mut self, input: &'r mut &[u8]) {
        assert!(self.reader.read_handler.is_none());
        self.reader.read_handler = Some(input);
    }

    pub(crate) fn set_input(&mut self, input: &'r mut dyn std::io::BufRead) {
        assert!(self.reader.read_handler.is_none());
        self.reader.read_handler = Some(input);
    }

    pub(crate) fn set_encoding(&mut self, encoding: Encoding) {
        assert_eq!(self.reader.encoding, Encoding::Any);
        self.reader.encoding = encoding;
    }

    /// Ensure at least one token is queued, scanning as many as are needed
    /// to resolve pending simple keys and indentation.
    pub(crate) fn fetch_more_tokens(&mut self) -> Result<(), ScannerError> {
        loop {
            let mut need_more_tokens = false;
            if self.tokens.is_empty() {
                need_more_tokens = true;
            } else {
                self.stale_simple_keys()?;
                for simple_key in &self.simple_keys {
                    if simple_key.possible && simple_key.token_number == self.tokens_parsed {
                        need_more_tokens = true;
                        break;
                    }
                }
            }
            if !need_more_tokens {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;
        Ok(())
    }

    fn stale_simple_keys(&mut self) -> Result<(), ScannerError> {
        for i in 0..self.simple_keys.len() {
            let simple_key = self.simple_keys[i];
            if simple_key.possible
                && (simple_key.mark.line < self.reader.mark.line
                    || simple_key.mark.index.wrapping_add(1024) < self.reader.mark.index)
            {
                if simple_key.required {
                    return set_scanner_error(
                        "while scanning a simple key",
                        simple_key.mark,
                        "could not find expected ':'",
                        self.reader.mark,
                    );
                }
                self.simple_keys[i].possible = false;
            }
        }
        Ok(())
    }

    fn fetch_next_token(&mut self) -> Result<(), ScannerError> {
        self.cache(1)?;
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        self.unroll_indent(self.reader.mark.column as i32);
        self.cache(4)?;

        if self.reader.buffer.is_empty() {
            self.fetch_stream_end();
            return Ok(());
        }

        let start_of_line = self.reader.mark.column == 0;
        let c0 = self.peek(0);
        let c1 = self.peek(1);
        let c2 = self.peek(2);
        let c3 = self.peek(3);

        if c0 == Some('%') && start_of_line {
            return self.fetch_directive();
        }
        if start_of_line && c0 == Some('-') && c1 == Some('-') && c2 == Some('-') && is_blankz(c3)
        {
            return self.fetch_document_indicator(TokenData::DocumentStart);
        }
        if start_of_line && c0 == Some('.') && c1 == Some('.') && c2 == Some('.') && is_blankz(c3)
        {
            return self.fetch_document_indicator(TokenData::DocumentEnd);
        }
        match c0 {
            Some('[') => return self.fetch_flow_collection_start(TokenData::FlowSequenceStart),
            Some('{') => return self.fetch_flow_collection_start(TokenData::FlowMappingStart),
            Some(']') => return self.fetch_flow_collection_end(TokenData::FlowSequenceEnd),
            Some('}') => return self.fetch_flow_collection_end(TokenData::FlowMappingEnd),
            Some(',') => return self.fetch_flow_entry(),
            Some('-') if is_blankz(c1) => return self.fetch_block_entry(),
            Some('?') if self.flow_level > 0 || is_blankz(c1) => return self.fetch_key(),
            Some(':') if self.flow_level > 0 || is_blankz(c1) => return self.fetch_value(),
            Some('*') => return self.fetch_anchor_or_alias(true),
            Some('&') => return self.fetch_anchor_or_alias(false),
            Some('!') => return self.fetch_tag(),
            Some('|') if self.flow_level == 0 => return self.fetch_block_scalar(false),
            Some('>') if self.flow_level == 0 => return self.fetch_block_scalar(true),
            Some('\'') => return self.fetch_flow_scalar(true),
            Some('"') => return self.fetch_flow_scalar(false),
            _ => {}
        }
        if self.is_plain_start(c0, c1) {
            return self.fetch_plain_scalar();
        }
        set_scanner_error(
            "while scanning for the next token",
            self.reader.mark,
            "found character that cannot start any token",
            self.reader.mark,
        )
    }

    fn is_plain_start(&self, c0: Option<char>, c1: Option<char>) -> bool {
        let Some(c0) = c0 else { return false };
        if c0 == '-' || c0 == '?' || c0 == ':' {
            return !is_blankz(c1);
        }
        !matches!(
            c0,
            ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%'
                | '@' | '`'
        )
    }

    // --- low-level char/reader helpers -------------------------------

    fn cache(&mut self, length: usize) -> Result<(), ScannerError> {
        if self.reader.buffer.len() >= length {
            return Ok(());
        }
        reader::update_buffer(&mut self.reader, length)?;
        Ok(())
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.reader.buffer.get(offset).copied()
    }

    fn skip(&mut self) {
        self.reader
            .buffer
            .pop_front()
            .expect("skip with empty buffer");
        self.reader.mark.index += 1;
        self.reader.mark.column += 1;
        self.reader.unread -= 1;
    }

    fn skip_line(&mut self) {
        if vecdeque_starts_with(&self.reader.buffer, &['\r', '\n']) {
            self.reader.buffer.drain(0..2);
            self.reader.mark.index += 2;
            self.reader.unread -= 2;
        } else {
            self.reader.buffer.pop_front();
            self.reader.mark.index += 1;
            self.reader.unread -= 1;
        }
        self.reader.mark.line += 1;
        self.reader.mark.column = 0;
    }

    fn read(&mut self, string: &mut String) {
        let ch = self
            .reader
            .buffer
            .pop_front()
            .expect("read with empty buffer");
        string.push(ch);
        self.reader.mark.index += 1;
        self.reader.mark.column += 1;
        self.reader.unread -= 1;
    }

    /// Consume a line break, normalizing it to `\n` in `string`.
    fn read_line(&mut self, string: &mut String) {
        if vecdeque_starts_with(&self.reader.buffer, &['\r', '\n']) {
            self.reader.buffer.drain(0..2);
            self.reader.mark.index += 2;
            self.reader.unread -= 2;
        } else {
            self.reader.buffer.pop_front();
            self.reader.mark.index += 1;
            self.reader.unread -= 1;
        }
        self.reader.mark.line += 1;
        self.reader.mark.column = 0;
        string.push('\n');
    }

    // --- simple key bookkeeping ---------------------------------------

    fn save_simple_key(&mut self) -> Result<(), ScannerError> {
        let required =
            self.flow_level == 0 && self.indent as i64 == self.reader.mark.column as i64;
        if self.simple_key_allowed {
            self.remove_simple_key()?;
            let token_number = self.tokens_parsed.wrapping_add(self.tokens.len());
            self.simple_keys.push(SimpleKey {
                possible: true,
                required,
                token_number,
                mark: self.reader.mark,
            });
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<(), ScannerError> {
        if let Some(last) = self.simple_keys.last_mut() {
            if last.possible && last.required {
                return set_scanner_error(
                    "while scanning a simple key",
                    last.mark,
                    "could not find expected ':'",
                    self.reader.mark,
                );
            }
            last.possible = false;
        }
        Ok(())
    }

    fn increase_flow_level(&mut self) {
        self.simple_keys.push(SimpleKey {
            possible: false,
            required: false,
            token_number: 0,
            mark: Mark::default(),
        });
        self.flow_level += 1;
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
    }

    fn roll_indent(&mut self, column: i32, number: Option<usize>, data: TokenData, mark: Mark) {
        if self.flow_level > 0 {
            return;
        }
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            let token = Token {
                data,
                start_mark: mark,
                end_mark: mark,
            };
            match number {
                None => self.tokens.push_back(token),
                Some(number) => {
                    let pos = number.wrapping_sub(self.tokens_parsed);
                    self.tokens.insert(pos, token);
                }
            }
        }
    }

    fn unroll_indent(&mut self, column: i32) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.reader.mark;
            self.tokens.push_back(Token {
                data: TokenData::BlockEnd,
                start_mark: mark,
                end_mark: mark,
            });
            self.indent = self.indents.pop().expect("indents underflow");
        }
    }

    // --- per-token fetchers --------------------------------------------

    fn fetch_stream_start(&mut self) {
        let mark = self.reader.mark;
        self.indent = -1;
        self.stream_start_produced = true;
        self.simple_key_allowed = true;
        self.tokens.push_back(Token {
            data: TokenData::StreamStart {
                encoding: self.reader.encoding,
            },
            start_mark: mark,
            end_mark: mark,
        });
    }

    fn fetch_stream_end(&mut self) {
        if self.reader.mark.column != 0 {
            self.reader.mark.column = 0;
            self.reader.mark.line += 1;
        }
        self.unroll_indent(-1);
        self.simple_key_allowed = false;
        let mark = self.reader.mark;
        self.tokens.push_back(Token {
            data: TokenData::StreamEnd,
            start_mark: mark,
            end_mark: mark,
        });
    }

    fn fetch_directive(&mut self) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_directive()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark;
        self.skip();
        self.skip();
        self.skip();
        let end_mark = self.reader.mark;
        self.tokens.push_back(Token {
            data,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.increase_flow_level();
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark;
        self.skip();
        let end_mark = self.reader.mark;
        self.tokens.push_back(Token {
            data,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark;
        self.skip();
        let end_mark = self.reader.mark;
        self.tokens.push_back(Token {
            data,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark;
        self.skip();
        let end_mark = self.reader.mark;
        self.tokens.push_back(Token {
            data: TokenData::FlowEntry,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return set_scanner_error(
                    "",
                    Mark::default(),
                    "block sequence entries are not allowed in this context",
                    self.reader.mark,
                );
            }
            let mark = self.reader.mark;
            self.roll_indent(
                mark.column as i32,
                None,
                TokenData::BlockSequenceStart,
                mark,
            );
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark;
        self.skip();
        let end_mark = self.reader.mark;
        self.tokens.push_back(Token {
            data: TokenData::BlockEntry,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return set_scanner_error(
                    "",
                    Mark::default(),
                    "mapping keys are not allowed in this context",
                    self.reader.mark,
                );
            }
            let mark = self.reader.mark;
            self.roll_indent(mark.column as i32, None, TokenData::BlockMappingStart, mark);
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;
        let start_mark = self.reader.mark;
        self.skip();
        let end_mark = self.reader.mark;
        self.tokens.push_back(Token {
            data: TokenData::Key,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), ScannerError> {
        let maybe_simple_key = self.simple_keys.last().copied();
        if let Some(simple_key) = maybe_simple_key {
            if simple_key.possible {
                let mark = simple_key.mark;
                self.simple_keys.last_mut().unwrap().possible = false;
                let token = Token {
                    data: TokenData::Key,
                    start_mark: mark,
                    end_mark: mark,
                };
                let number = Some(simple_key.token_number);
                self.roll_indent(
                    mark.column as i32,
                    number,
                    TokenData::BlockMappingStart,
                    mark,
                );
                let pos = simple_key.token_number.wrapping_sub(self.tokens_parsed);
                self.tokens.insert(pos, token);
                self.simple_key_allowed = false;
                let start_mark = self.reader.mark;
                self.skip();
                let end_mark = self.reader.mark;
                self.tokens.push_back(Token {
                    data: TokenData::Value,
                    start_mark,
                    end_mark,
                });
                return Ok(());
            }
        }
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return set_scanner_error(
                    "",
                    Mark::default(),
                    "mapping values are not allowed in this context",
                    self.reader.mark,
                );
            }
            let mark = self.reader.mark;
            self.roll_indent(mark.column as i32, None, TokenData::BlockMappingStart, mark);
        }
        self.simple_key_allowed = self.flow_level == 0;
        let start_mark = self.reader.mark;
        self.skip();
        let end_mark = self.reader.mark;
        self.tokens.push_back(Token {
            data: TokenData::Value,
            start_mark,
            end_mark,
        });
        Ok(())
    }

    fn fetch_anchor_or_alias(&mut self, is_alias: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_anchor(is_alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, folded: bool) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let token = self.scan_block_scalar(folded)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_flow_scalar(single)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain_scalar(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_plain_scalar()?;
        self.tokens.push_back(token);
        Ok(())
    }

    // --- whitespace / comment skipping ----------------------------------

    fn scan_to_next_token(&mut self) -> Result<(), ScannerError> {
        loop {
            self.cache(1)?;
            if self.reader.mark.column == 0 && self.peek(0) == Some('\u{feff}') {
                self.skip();
            }
            self.cache(1)?;
            while self.peek(0) == Some(' ')
                || ((self.flow_level > 0 || !self.simple_key_allowed) && self.peek(0) == Some('\t'))
            {
                self.skip();
                self.cache(1)?;
            }
            if self.peek(0) == Some('#') {
                while !is_breakz(self.peek(0)) {
                    self.skip();
                    self.cache(1)?;
                }
            }
            if is_break(self.peek(0)) {
                self.cache(2)?;
                self.skip_line();
                if self.flow_level == 0 {
                    self.simple_key_allowed = true;
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    // --- directives -------------------------------------------------

    fn scan_directive(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        self.skip();
        let name = self.scan_directive_name(start_mark)?;
        let data = if name == "YAML" {
            let (major, minor) = self.scan_version_directive_value(start_mark)?;
            TokenData::VersionDirective { major, minor }
        } else if name == "TAG" {
            let (handle, prefix) = self.scan_tag_directive_value(start_mark)?;
            TokenData::TagDirective { handle, prefix }
        } else {
            return set_scanner_error(
                "while scanning a directive",
                start_mark,
                "found unknown directive name",
                start_mark,
            );
        };
        self.cache(1)?;
        while is_blank(self.peek(0)) {
            self.skip();
            self.cache(1)?;
        }
        if self.peek(0) == Some('#') {
            while !is_breakz(self.peek(0)) {
                self.skip();
                self.cache(1)?;
            }
        }
        self.cache(1)?;
        if !is_breakz(self.peek(0)) {
            return set_scanner_error(
                "while scanning a directive",
                start_mark,
                "did not find expected comment or line break",
                self.reader.mark,
            );
        }
        if is_break(self.peek(0)) {
            self.cache(2)?;
            self.skip_line();
        }
        let end_mark = self.reader.mark;
        Ok(Token {
            data,
            start_mark,
            end_mark,
        })
    }

    fn scan_directive_name(&mut self, start_mark: Mark) -> Result<String, ScannerError> {
        let mut string = String::new();
        self.cache(1)?;
        while is_alpha(self.peek(0)) {
            self.read(&mut string);
            self.cache(1)?;
        }
        if string.is_empty() {
            return set_scanner_error(
                "while scanning a directive",
                start_mark,
                "could not find expected directive name",
                self.reader.mark,
            );
        }
        if !is_blankz(self.peek(0)) {
            return set_scanner_error(
                "while scanning a directive",
                start_mark,
                "found unexpected non-alphabetical character",
                self.reader.mark,
            );
        }
        Ok(string)
    }

    fn scan_version_directive_value(
        &mut self,
        start_mark: Mark,
    ) -> Result<(i32, i32), ScannerError> {
        self.cache(1)?;
        while is_blank(self.peek(0)) {
            self.skip();
            self.cache(1)?;
        }
        let major = self.scan_version_directive_number(start_mark)?;
        if self.peek(0) != Some('.') {
            return set_scanner_error(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected digit or '.' character",
                self.reader.mark,
            );
        }
        self.skip();
        let minor = self.scan_version_directive_number(start_mark)?;
        Ok((major, minor))
    }

    fn scan_version_directive_number(&mut self, start_mark: Mark) -> Result<i32, ScannerError> {
        const MAX_NUMBER_LENGTH: usize = 9;
        let mut value = 0i32;
        let mut length = 0usize;
        self.cache(1)?;
        while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            length += 1;
            if length > MAX_NUMBER_LENGTH {
                return set_scanner_error(
                    "while scanning a %YAML directive",
                    start_mark,
                    "found extremely long version number",
                    self.reader.mark,
                );
            }
            value = value * 10 + self.peek(0).unwrap().to_digit(10).unwrap() as i32;
            self.skip();
            self.cache(1)?;
        }
        if length == 0 {
            return set_scanner_error(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected version number",
                self.reader.mark,
            );
        }
        Ok(value)
    }

    fn scan_tag_directive_value(
        &mut self,
        start_mark: Mark,
    ) -> Result<(String, String), ScannerError> {
        self.cache(1)?;
        while is_blank(self.peek(0)) {
            self.skip();
            self.cache(1)?;
        }
        let handle = self.scan_tag_handle(true, start_mark)?;
        self.cache(1)?;
        if !is_blank(self.peek(0)) {
            return set_scanner_error(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace",
                self.reader.mark,
            );
        }
        while is_blank(self.peek(0)) {
            self.skip();
            self.cache(1)?;
        }
        let prefix = self.scan_tag_uri(true, start_mark)?;
        self.cache(1)?;
        if !is_blankz(self.peek(0)) {
            return set_scanner_error(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace or line break",
                self.reader.mark,
            );
        }
        Ok((handle, prefix))
    }

    // --- anchors / aliases / tags -----------------------------------

    fn scan_anchor(&mut self, is_alias: bool) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        self.skip();
        let mut string = String::new();
        self.cache(1)?;
        while self.peek(0).is_some_and(|c| is_alpha(Some(c))) {
            self.read(&mut string);
            self.cache(1)?;
        }
        if string.is_empty()
            || !matches!(
                self.peek(0),
                None | Some(
                    '?' | ':' | ',' | ']' | '}' | '%' | '@' | '`' | ' ' | '\t' | '\r' | '\n'
                        | '\u{85}' | '\u{2028}' | '\u{2029}'
                )
            )
        {
            return set_scanner_error(
                if is_alias {
                    "while scanning an alias"
                } else {
                    "while scanning an anchor"
                },
                start_mark,
                "did not find expected alphabetic or numeric character",
                self.reader.mark,
            );
        }
        let end_mark = self.reader.mark;
        Ok(Token {
            data: if is_alias {
                TokenData::Alias { value: string }
            } else {
                TokenData::Anchor { value: string }
            },
            start_mark,
            end_mark,
        })
    }

    fn scan_tag(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        let mut handle = String::new();
        let suffix;

        self.cache(2)?;
        if self.peek(1) == Some('<') {
            self.skip();
            self.skip();
            suffix = self.scan_tag_uri(false, start_mark)?;
            self.cache(1)?;
            if self.peek(0) != Some('>') {
                return set_scanner_error(
                    "while scanning a tag",
                    start_mark,
                    "did not find the expected '>'",
                    self.reader.mark,
                );
            }
            self.skip();
        } else {
            handle = self.scan_tag_handle(false, start_mark)?;
            suffix = self.scan_tag_uri(false, start_mark)?;
            if handle.is_empty() {
                handle = String::from("!");
            }
        }
        self.cache(1)?;
        if !is_blankz(self.peek(0)) {
            return set_scanner_error(
                "while scanning a tag",
                start_mark,
                "did not find expected whitespace or line break",
                self.reader.mark,
            );
        }
        let end_mark = self.reader.mark;
        Ok(Token {
            data: TokenData::Tag { handle, suffix },
            start_mark,
            end_mark,
        })
    }

    fn scan_tag_handle(
        &mut self,
        directive: bool,
        start_mark: Mark,
    ) -> Result<String, ScannerError> {
        let context = if directive {
            "while scanning a tag directive"
        } else {
            "while scanning a tag"
        };
        self.cache(1)?;
        if self.peek(0) != Some('!') {
            return set_scanner_error(
                context,
                start_mark,
                "did not find expected '!'",
                self.reader.mark,
            );
        }
        let mut string = String::new();
        self.read(&mut string);
        self.cache(1)?;
        while self.peek(0).is_some_and(|c| is_alpha(Some(c))) {
            self.read(&mut string);
            self.cache(1)?;
        }
        if self.peek(0) == Some('!') {
            self.read(&mut string);
        } else if directive && string != "!" {
            return set_scanner_error(
                context,
                start_mark,
                "did not find expected '!'",
                self.reader.mark,
            );
        }
        Ok(string)
    }

    fn scan_tag_uri(&mut self, directive: bool, start_mark: Mark) -> Result<String, ScannerError> {
        let context = if directive {
            "while parsing a %TAG directive"
        } else {
            "while parsing a tag"
        };
        let mut string = String::new();
        self.cache(1)?;
        while matches!(self.peek(0), Some(c) if is_alpha(Some(c)) || matches!(c,
            ';' | '/' | '?' | ':' | '@' | '&' | '=' | '+' | '$' | ',' | '.' | '!' | '~' | '*'
                | '\'' | '(' | ')' | '[' | ']' | '%'))
        {
            if self.peek(0) == Some('%') {
                self.scan_uri_escape(context, start_mark, &mut string)?;
            } else {
                self.read(&mut string);
            }
            self.cache(1)?;
        }
        if string.is_empty() {
            return set_scanner_error(
                context,
                start_mark,
                "did not find expected tag URI",
                self.reader.mark,
            );
        }
        Ok(string)
    }

    fn scan_uri_escape(
        &mut self,
        context: &'static str,
        start_mark: Mark,
        string: &mut String,
    ) -> Result<(), ScannerError> {
        let mut bytes = Vec::new();
        loop {
            self.cache(3)?;
            if !(self.peek(0) == Some('%')
                && self.peek(1).is_some_and(|c| c.is_ascii_hexdigit())
                && self.peek(2).is_some_and(|c| c.is_ascii_hexdigit()))
            {
                return set_scanner_error(
                    context,
                    start_mark,
                    "did not find URI escaped octet",
                    self.reader.mark,
                );
            }
            let high = self.peek(1).unwrap().to_digit(16).unwrap();
            let low = self.peek(2).unwrap().to_digit(16).unwrap();
            bytes.push((high * 16 + low) as u8);
            self.skip();
            self.skip();
            self.skip();
            self.cache(1)?;
            if self.peek(0) != Some('%') {
                break;
            }
        }
        match core::str::from_utf8(&bytes) {
            Ok(decoded) => string.push_str(decoded),
            Err(_) => {
                return set_scanner_error(
                    context,
                    start_mark,
                    "invalid UTF-8 octet sequence in URI escape",
                    self.reader.mark,
                )
            }
        }
        Ok(())
    }

    // --- scalar scanning: locate the raw span, hand off to atom::decode --

    fn scan_block_scalar(&mut self, folded: bool) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        self.skip();

        let mut chomp = Chomp::Clip;
        let mut increment: Option<usize> = None;

        self.cache(1)?;
        if matches!(self.peek(0), Some('+') | Some('-')) {
            chomp = if self.peek(0) == Some('+') {
                Chomp::Keep
            } else {
                Chomp::Strip
            };
            self.skip();
            self.cache(1)?;
            if self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                if self.peek(0) == Some('0') {
                    return set_scanner_error(
                        "while scanning a block scalar",
                        start_mark,
                        "found an indentation indicator equal to 0",
                        self.reader.mark,
                    );
                }
                increment = Some(self.peek(0).unwrap().to_digit(10).unwrap() as usize);
                self.skip();
            }
        } else if self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            if self.peek(0) == Some('0') {
                return set_scanner_error(
                    "while scanning a block scalar",
                    start_mark,
                    "found an indentation indicator equal to 0",
                    self.reader.mark,
                );
            }
            increment = Some(self.peek(0).unwrap().to_digit(10).unwrap() as usize);
            self.skip();
            self.cache(1)?;
            if matches!(self.peek(0), Some('+') | Some('-')) {
                chomp = if self.peek(0) == Some('+') {
                    Chomp::Keep
                } else {
                    Chomp::Strip
                };
                self.skip();
            }
        }

        self.cache(1)?;
        while is_blank(self.peek(0)) {
            self.skip();
            self.cache(1)?;
        }
        if self.peek(0) == Some('#') {
            while !is_breakz(self.peek(0)) {
                self.skip();
                self.cache(1)?;
            }
        }
        self.cache(1)?;
        if !is_breakz(self.peek(0)) {
            return set_scanner_error(
                "while scanning a block scalar",
                start_mark,
                "did not find expected comment or line break",
                self.reader.mark,
            );
        }
        if is_break(self.peek(0)) {
            self.cache(2)?;
            self.skip_line();
        }

        let base_indent = if self.indent >= 0 { self.indent + 1 } else { 1 };
        let mut max_indent = 0usize;
        let mut raw = String::new();
        let mut end_mark = self.reader.mark;
        let mut trailing_breaks = 0usize;

        // Leading blank lines before the first content line, consumed to
        // determine the auto-detected indentation.
        loop {
            self.cache(1)?;
            while self.peek(0) == Some(' ') {
                self.skip();
            }
            if self.reader.mark.column as usize > max_indent {
                max_indent = self.reader.mark.column as usize;
            }
            self.cache(1)?;
            if is_break(self.peek(0)) {
                trailing_breaks += 1;
                self.cache(2)?;
                self.skip_line();
            } else {
                break;
            }
        }

        let indent = increment.map_or(core::cmp::max(max_indent, base_indent as usize), |inc| {
            base_indent as usize + inc
        });

        for _ in 0..trailing_breaks {
            raw.push('\n');
        }

        loop {
            self.cache(1)?;
            if (self.reader.mark.column as usize) < indent && !is_blank(self.peek(0)) {
                break;
            }
            while self.reader.mark.column as usize >= indent && self.peek(0) == Some(' ') {
                self.skip();
                self.cache(1)?;
            }
            while !is_breakz(self.peek(0)) {
                self.read(&mut raw);
                self.cache(1)?;
            }
            end_mark = self.reader.mark;
            if self.peek(0).is_none() {
                break;
            }
            self.cache(2)?;
            self.read_line(&mut raw);

            // leading indentation of the next line
            self.cache(1)?;
            let mut col = 0usize;
            while self.peek(0) == Some(' ') && col < indent {
                self.skip();
                col += 1;
            }
            self.cache(1)?;
            if self.peek(0).is_none() {
                break;
            }
        }

        let atom = Atom::new(
            Input::new(raw.as_bytes().to_vec()),
            0,
            raw.len(),
            if folded {
                ScalarStyle::Folded
            } else {
                ScalarStyle::Literal
            },
            chomp,
            0,
            None,
        );
        let value = atom::decode(&atom);

        Ok(Token {
            data: TokenData::Scalar {
                value,
                style: if folded {
                    ScalarStyle::Folded
                } else {
                    ScalarStyle::Literal
                },
            },
            start_mark,
            end_mark,
        })
    }

    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        self.skip();
        let mut raw = String::new();

        loop {
            self.cache(1)?;
            match self.peek(0) {
                None => {
                    return set_scanner_error(
                        "while scanning a quoted scalar",
                        start_mark,
                        "found unexpected end of stream",
                        self.reader.mark,
                    );
                }
                Some('\'') if single => {
                    self.cache(2)?;
                    if self.peek(1) == Some('\'') {
                        self.read(&mut raw);
                        self.read(&mut raw);
                        continue;
                    }
                    break;
                }
                Some('"') if !single => break,
                Some('\\') if !single => {
                    raw.push('\\');
                    self.skip();
                    self.cache(1)?;
                    if is_break(self.peek(0)) {
                        self.cache(2)?;
                        self.read_line(&mut raw);
                    } else {
                        let n = match self.peek(0) {
                            Some('x') => 3,
                            Some('u') => 5,
                            Some('U') => 9,
                            _ => 1,
                        };
                        self.cache(n)?;
                        for _ in 0..n {
                            if self.peek(0).is_none() {
                                break;
                            }
                            self.read(&mut raw);
                        }
                    }
                }
                Some(c) if is_break(Some(c)) => {
                    self.cache(2)?;
                    self.read_line(&mut raw);
                    while self.peek(0) == Some(' ') || self.peek(0) == Some('\t') {
                        self.skip();
                        self.cache(1)?;
                    }
                }
                _ => {
                    self.read(&mut raw);
                }
            }
        }
        self.skip();
        let end_mark = self.reader.mark;

        let style = if single {
            ScalarStyle::SingleQuoted
        } else {
            ScalarStyle::DoubleQuoted
        };
        let atom = Atom::new(
            Input::new(raw.as_bytes().to_vec()),
            0,
            raw.len(),
            style,
            Chomp::Clip,
            0,
            None,
        );
        if !single {
            atom::validate(&atom).map_err(|_| ScannerError::Problem {
                context: "while parsing a quoted scalar",
                context_mark: start_mark,
                problem: "found unknown escape character",
                problem_mark: end_mark,
            })?;
        }
        let value = atom::decode(&atom);

        Ok(Token {
            data: TokenData::Scalar { value, style },
            start_mark,
            end_mark,
        })
    }

    fn scan_plain_scalar(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark;
        let indent = self.indent + 1;
        let mut raw = String::new();
        let mut end_mark = start_mark;

        loop {
            self.cache(4)?;
            if self.peek(0) == Some('#') && raw.chars().last().is_some_and(|c| is_blank(Some(c)))
            {
                break;
            }
            if self.reader.mark.column == 0
                && self.peek(0) == Some('-')
                && self.peek(1) == Some('-')
                && self.peek(2) == Some('-')
                && is_blankz(self.peek(3))
            {
                break;
            }
            if self.reader.mark.column == 0
                && self.peek(0) == Some('.')
                && self.peek(1) == Some('.')
                && self.peek(2) == Some('.')
                && is_blankz(self.peek(3))
            {
                break;
            }
            if is_breakz(self.peek(0)) {
                break;
            }
            if self.flow_level > 0 && matches!(self.peek(0), Some(',' | '[' | ']' | '{' | '}')) {
                break;
            }
            if self.peek(0) == Some(':')
                && (is_blankz(self.peek(1)) || (self.flow_level > 0 && self.peek(1) == Some(',')))
            {
                break;
            }
            end_mark = self.reader.mark;
            if is_break(self.peek(0)) {
                self.cache(2)?;
                self.read_line(&mut raw);
                self.cache(1)?;
                while self.peek(0) == Some(' ') || self.peek(0) == Some('\t') {
                    self.skip();
                    self.cache(1)?;
                }
                if (self.reader.mark.column as i32) < indent {
                    break;
                }
            } else {
                self.read(&mut raw);
            }
        }

        if raw.is_empty() {
            return set_scanner_error(
                "while scanning a plain scalar",
                start_mark,
                "did not find expected alphabetic or numeric character",
                self.reader.mark,
            );
        }

        if raw
            .chars()
            .last()
            .is_some_and(|c| is_blank(Some(c)) || c == '\n')
        {
            self.simple_key_allowed = true;
        }

        let atom = Atom::new(
            Input::new(raw.as_bytes().to_vec()),
            0,
            raw.len(),
            ScalarStyle::Plain,
            Chomp::Clip,
            0,
            None,
        );
        let value = atom::decode(&atom);

        Ok(Token {
            data: TokenData::Scalar {
                value,
                style: ScalarStyle::Plain,
            },
            start_mark,
            end_mark,
        })
    }
}

/// Scan an input string into a vector of tokens, without constructing a
/// full [`crate::Parser`]. Mainly useful for debugging and tests.
pub fn yaml_parser_scan(input: &mut &[u8]) -> Result<Vec<Token>, ScannerError> {
    let mut scanner = Scanner::new();
    scanner.set_input_string(input);
    let mut tokens = Vec::new();
    loop {
        scanner.fetch_more_tokens()?;
        let token = scanner
            .tokens
            .pop_front()
            .expect("token_available but empty queue");
        scanner.token_available = false;
        scanner.tokens_parsed = scanner.tokens_parsed.wrapping_add(1);
        let is_end = matches!(token.data, TokenData::StreamEnd);
        tokens.push(token);
        if is_end {
            break;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &str) -> Vec<TokenData> {
        let bytes = input.as_bytes();
        let mut slice = bytes;
        yaml_parser_scan(&mut slice)
            .unwrap()
            .into_iter()
            .map(|t| t.data)
            .collect()
    }

    #[test]
    fn scans_stream_start_and_end() {
        let tokens = scan("");
        assert!(matches!(tokens[0], TokenData::StreamStart { .. }));
        assert!(matches!(tokens.last().unwrap(), TokenData::StreamEnd));
    }

    #[test]
    fn scans_plain_scalar() {
        let tokens = scan("hello");
        assert!(tokens.iter().any(|t| matches!(
            t,
            TokenData::Scalar { value, style: ScalarStyle::Plain } if value == "hello"
        )));
    }

    #[test]
    fn scans_block_mapping() {
        let tokens = scan("a: 1\nb: 2\n");
        assert!(tokens
            .iter()
            .any(|t| matches!(t, TokenData::BlockMappingStart)));
        assert!(tokens.iter().any(|t| matches!(t, TokenData::Key)));
        assert!(tokens.iter().any(|t| matches!(t, TokenData::Value)));
    }

    #[test]
    fn scans_flow_sequence() {
        let tokens = scan("[1, 2, 3]\n");
        assert!(tokens
            .iter()
            .any(|t| matches!(t, TokenData::FlowSequenceStart)));
        assert!(tokens
            .iter()
            .any(|t| matches!(t, TokenData::FlowSequenceEnd)));
    }

    #[test]
    fn scans_single_quoted_scalar_with_doubled_quote() {
        let tokens = scan("'it''s'\n");
        assert!(tokens.iter().any(|t| matches!(
            t,
            TokenData::Scalar { value, .. } if value == "it's"
        )));
    }
}
