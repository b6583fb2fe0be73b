use alloc::collections::VecDeque;

use crate::macros::vecdeque_starts_with;
use crate::{Encoding, Mark, ReaderError, INPUT_RAW_BUFFER_SIZE};

/// Decodes raw bytes from a source into a ring buffer of `char`s, sniffing
/// the encoding from a byte-order mark if the caller hasn't pinned one.
///
/// Owned by [`crate::scanner::Scanner`]; the scanner never touches raw
/// bytes directly, only the decoded `char`s this produces.
#[non_exhaustive]
pub(crate) struct Reader<'r> {
    pub(crate) read_handler: Option<&'r mut dyn std::io::BufRead>,
    pub(crate) eof: bool,
    pub(crate) raw_buffer: VecDeque<u8>,
    pub(crate) buffer: VecDeque<char>,
    pub(crate) unread: usize,
    pub(crate) encoding: Encoding,
    pub(crate) offset: usize,
    pub(crate) mark: Mark,
}

impl<'r> Reader<'r> {
    pub(crate) fn new() -> Self {
        Reader {
            read_handler: None,
            eof: false,
            raw_buffer: VecDeque::new(),
            buffer: VecDeque::new(),
            unread: 0,
            encoding: Encoding::Any,
            offset: 0,
            mark: Mark::default(),
        }
    }
}

fn set_reader_error<T>(problem: &'static str, offset: usize, value: i32) -> Result<T, ReaderError> {
    Err(ReaderError::Problem {
        problem,
        offset,
        value,
    })
}

const BOM_UTF8: &[u8] = b"\xEF\xBB\xBF";
const BOM_UTF16LE: &[u8] = b"\xFF\xFE";
const BOM_UTF16BE: &[u8] = b"\xFE\xFF";

fn determine_encoding(reader: &mut Reader) -> Result<(), ReaderError> {
    while !reader.eof && reader.raw_buffer.len() < 3 {
        update_raw_buffer(reader)?;
    }
    if vecdeque_starts_with(&reader.raw_buffer, BOM_UTF16LE) {
        reader.encoding = Encoding::Utf16Le;
        reader.raw_buffer.drain(0..2);
        reader.offset += 2;
    } else if vecdeque_starts_with(&reader.raw_buffer, BOM_UTF16BE) {
        reader.encoding = Encoding::Utf16Be;
        reader.raw_buffer.drain(0..2);
        reader.offset += 2;
    } else if vecdeque_starts_with(&reader.raw_buffer, BOM_UTF8) {
        reader.encoding = Encoding::Utf8;
        reader.raw_buffer.drain(0..3);
        reader.offset += 3;
    } else {
        reader.encoding = Encoding::Utf8;
    }
    Ok(())
}

fn update_raw_buffer(reader: &mut Reader) -> Result<(), ReaderError> {
    if reader.raw_buffer.len() >= INPUT_RAW_BUFFER_SIZE {
        return Ok(());
    }
    if reader.eof {
        return Ok(());
    }

    let len_before = reader.raw_buffer.len();
    debug_assert!(len_before < INPUT_RAW_BUFFER_SIZE);
    reader.raw_buffer.resize(INPUT_RAW_BUFFER_SIZE, 0);
    let contiguous = reader.raw_buffer.make_contiguous();
    let write_to = &mut contiguous[len_before..];

    let size_read = reader
        .read_handler
        .as_mut()
        .expect("non-null read handler")
        .read(write_to)?;

    let valid_size = len_before + size_read;
    reader.raw_buffer.truncate(valid_size);
    if size_read == 0 {
        reader.eof = true;
    }
    Ok(())
}

fn utf8_char_width_and_initial_value(initial: u8) -> (usize, u32) {
    let initial = initial as u32;
    if initial & 0x80 == 0 {
        (1, initial & 0x7f)
    } else if initial & 0xE0 == 0xC0 {
        (2, initial & 0x1f)
    } else if initial & 0xF0 == 0xE0 {
        (3, initial & 0x0f)
    } else if initial & 0xF8 == 0xF0 {
        (4, initial & 0x07)
    } else {
        (0, 0)
    }
}

enum Utf8Error {
    Incomplete,
    InvalidLeadingOctet,
    InvalidTrailingOctet(usize),
    InvalidLength,
    InvalidUnicode(u32),
}

fn read_char_utf8(raw: &mut VecDeque<u8>) -> Option<Result<char, Utf8Error>> {
    let first = raw.front().copied()?;
    let (width, mut value) = utf8_char_width_and_initial_value(first);
    if width == 0 {
        return Some(Err(Utf8Error::InvalidLeadingOctet));
    }
    if raw.len() < width {
        return Some(Err(Utf8Error::Incomplete));
    }
    for (i, trailing) in raw.iter().enumerate().take(width).skip(1) {
        if trailing & 0xc0 != 0x80 {
            return Some(Err(Utf8Error::InvalidTrailingOctet(i)));
        }
        value <<= 6;
        value += *trailing as u32 & 0x3f;
    }
    if !(width == 1
        || width == 2 && value >= 0x80
        || width == 3 && value >= 0x800
        || width == 4 && value >= 0x10000)
    {
        return Some(Err(Utf8Error::InvalidLength));
    }
    if let Some(ch) = char::from_u32(value) {
        raw.drain(..width);
        Some(Ok(ch))
    } else {
        Some(Err(Utf8Error::InvalidUnicode(value)))
    }
}

enum Utf16Error {
    Incomplete,
    UnexpectedLowSurrogateArea(u32),
    ExpectedLowSurrogateArea(u32),
    InvalidUnicode(u32),
}

fn read_char_utf16<const BIG_ENDIAN: bool>(
    raw: &mut VecDeque<u8>,
) -> Option<Result<char, Utf16Error>> {
    if raw.is_empty() {
        return None;
    }
    if raw.len() < 2 {
        return Some(Err(Utf16Error::Incomplete));
    }
    let bytes = [raw[0], raw[1]];
    let mut value = if BIG_ENDIAN {
        u16::from_be_bytes(bytes) as u32
    } else {
        u16::from_le_bytes(bytes) as u32
    };
    if value & 0xfc00 == 0xdc00 {
        return Some(Err(Utf16Error::UnexpectedLowSurrogateArea(value)));
    }
    let width;
    if value & 0xfc00 == 0xd800 {
        width = 4;
        if raw.len() < width {
            return Some(Err(Utf16Error::Incomplete));
        }
        let bytes2 = [raw[2], raw[3]];
        let value2 = if BIG_ENDIAN {
            u16::from_be_bytes(bytes2) as u32
        } else {
            u16::from_le_bytes(bytes2) as u32
        };
        if value2 & 0xfc00 != 0xdc00 {
            return Some(Err(Utf16Error::ExpectedLowSurrogateArea(value2)));
        }
        value = (0x10000 + (value & 0x3ff)) << (10 + (value2 & 0x3ff));
    } else {
        width = 2;
    }

    if let Some(ch) = char::from_u32(value) {
        raw.drain(..width);
        Some(Ok(ch))
    } else {
        Some(Err(Utf16Error::InvalidUnicode(value)))
    }
}

fn push_char(reader: &mut Reader, ch: char) -> Result<(), ReaderError> {
    if !(ch == '\x09'
        || ch == '\x0A'
        || ch == '\x0D'
        || ch >= '\x20' && ch <= '\x7E'
        || ch == '\u{0085}'
        || ch >= '\u{00A0}' && ch <= '\u{D7FF}'
        || ch >= '\u{E000}' && ch <= '\u{FFFD}'
        || ch >= '\u{10000}' && ch <= '\u{10FFFF}')
    {
        return set_reader_error(
            "control characters are not allowed",
            reader.offset,
            ch as _,
        );
    }
    reader.buffer.push_back(ch);
    reader.offset += ch.len_utf8();
    reader.unread += 1;
    Ok(())
}

pub(crate) fn update_buffer(reader: &mut Reader, length: usize) -> Result<(), ReaderError> {
    let mut first = true;
    assert!((reader.read_handler).is_some());
    if reader.eof && reader.raw_buffer.is_empty() {
        return Ok(());
    }
    if reader.unread >= length {
        return Ok(());
    }
    if reader.encoding == Encoding::Any {
        determine_encoding(reader)?;
    }

    while reader.unread < length {
        if reader.eof && reader.raw_buffer.is_empty() {
            return Ok(());
        }
        if !first || reader.raw_buffer.is_empty() {
            update_raw_buffer(reader)?;
        }
        first = false;
        match reader.encoding {
            Encoding::Utf8 => match read_char_utf8(&mut reader.raw_buffer) {
                Some(Ok(ch)) => {
                    push_char(reader, ch)?;
                }
                Some(Err(Utf8Error::Incomplete)) => {
                    if reader.eof {
                        return set_reader_error(
                            "incomplete UTF-8 octet sequence",
                            reader.offset,
                            -1,
                        );
                    }
                }
                Some(Err(Utf8Error::InvalidLeadingOctet)) => {
                    return set_reader_error(
                        "invalid leading UTF-8 octet",
                        reader.offset,
                        reader.raw_buffer[0] as _,
                    );
                }
                Some(Err(Utf8Error::InvalidTrailingOctet(offset))) => {
                    return set_reader_error(
                        "invalid trailing UTF-8 octet",
                        reader.offset + offset,
                        reader.raw_buffer[offset] as _,
                    );
                }
                Some(Err(Utf8Error::InvalidLength)) => {
                    return set_reader_error("invalid length of a UTF-8 sequence", reader.offset, -1);
                }
                Some(Err(Utf8Error::InvalidUnicode(value))) => {
                    return set_reader_error("invalid Unicode character", reader.offset, value as _);
                }
                None => (),
            },
            Encoding::Utf16Le | Encoding::Utf16Be => {
                let is_big_endian = reader.encoding == Encoding::Utf16Be;
                let res = if is_big_endian {
                    read_char_utf16::<true>(&mut reader.raw_buffer)
                } else {
                    read_char_utf16::<false>(&mut reader.raw_buffer)
                };
                match res {
                    Some(Ok(ch)) => {
                        push_char(reader, ch)?;
                    }
                    Some(Err(Utf16Error::Incomplete)) => {
                        if reader.eof {
                            return set_reader_error(
                                "incomplete UTF-16 character",
                                reader.offset,
                                -1,
                            );
                        }
                    }
                    Some(Err(Utf16Error::UnexpectedLowSurrogateArea(value))) => {
                        return set_reader_error(
                            "unexpected low surrogate area",
                            reader.offset,
                            value as i32,
                        );
                    }
                    Some(Err(Utf16Error::ExpectedLowSurrogateArea(value))) => {
                        return set_reader_error(
                            "expected low surrogate area",
                            reader.offset + 2,
                            value as i32,
                        );
                    }
                    Some(Err(Utf16Error::InvalidUnicode(value))) => {
                        return set_reader_error("invalid Unicode character", reader.offset, value as i32);
                    }
                    None => (),
                }
            }
            Encoding::Any => panic!("unhandled encoded enum variant"),
        }
    }

    if reader.offset >= (!0_usize).wrapping_div(2_usize) {
        return set_reader_error("input is too long", reader.offset, -1);
    }
    Ok(())
}
