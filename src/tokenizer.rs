//! # Diagnostic Stream Tokenizers
//!
//! ffmpeg writes two kinds of text to stderr: log lines ending in `\n` and
//! in-place status updates ending in a bare `\r`. Both are terminators here.
//!
//! ## Strategies:
//! - [`LineCodec`]: one token per CR- or LF-terminated line (default)
//! - [`StatsWordCodec`]: legacy regrouping of `key=value` words, seven
//!   groups per token. Seven is roughly the number of stats fields ffmpeg
//!   printed per status line in the version it was written against and means
//!   nothing beyond that.
//!
//! Both implement [`Decoder`], so `FramedRead` feeds them whatever chunks the
//! pipe delivers and calls `decode_eof` once the stream ends. Output never
//! depends on where chunk boundaries fall.
//!
//! `\r\n` is always one terminator, even when the two bytes arrive in separate
//! reads, so an empty line between a `\r` and the following `\n` is never emitted.
//! Text that runs past [`MAX_TOKEN_LEN`] bytes without a terminator is cut into
//! tokens of that length.

use crate::config::TokenizerKind;
use std::io;
use tokio_util::bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

fn drop_cr(data: &[u8]) -> &[u8] {
    match data.split_last() {
        Some((&b'\r', rest)) => rest,
        _ => data,
    }
}

fn to_text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

/// Longest token [`LineCodec`] buffers before cutting it, in bytes
pub const MAX_TOKEN_LEN: usize = 64 * 1024;

/// Splits on the first `\n` or `\r`, treating `\r\n` as a single terminator
#[derive(Debug)]
pub struct LineCodec {
    // Last token ended on a bare `\r`; a `\n` right after it belongs to it
    after_cr: bool,
    max_length: usize,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::with_max_length(MAX_TOKEN_LEN)
    }
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cut unterminated text into tokens of at most `max_length` bytes
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            after_cr: false,
            max_length: max_length.max(1),
        }
    }

    fn skip_lf_after_cr(&mut self, buf: &mut BytesMut) {
        if self.after_cr && !buf.is_empty() {
            if buf[0] == b'\n' {
                buf.advance(1);
            }
            self.after_cr = false;
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        self.skip_lf_after_cr(buf);

        // A terminator right at `max_length` still ends a full-length token
        let window = buf.len().min(self.max_length + 1);
        let Some(pos) = buf[..window].iter().position(|&b| b == b'\n' || b == b'\r') else {
            if buf.len() > self.max_length {
                let token = buf.split_to(self.max_length);
                return Ok(Some(to_text(&token)));
            }
            return Ok(None);
        };

        let terminator = buf[pos];
        let line = buf.split_to(pos + 1);
        let token = &line[..pos];

        if terminator == b'\n' {
            return Ok(Some(to_text(drop_cr(token))));
        }

        // `\r\n` already in the buffer: consume it whole
        if buf.first() == Some(&b'\n') {
            buf.advance(1);
        } else {
            self.after_cr = true;
        }
        Ok(Some(to_text(token)))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(token) = self.decode(buf)? {
            return Ok(Some(token));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        let rest = buf.split();
        Ok(Some(to_text(drop_cr(&rest))))
    }
}

/// Number of `key=value` groups joined into one legacy status token
pub const STATS_GROUPS_PER_TOKEN: usize = 7;

/// Legacy word-oriented reassembly of ffmpeg stats
///
/// Words are whitespace separated. A word containing `=` opens a new group,
/// a word without one is glued onto the open group, so `frame=` `12` becomes
/// `frame=12`. Every seven closed groups form one token.
#[derive(Debug, Default)]
pub struct StatsWordCodec {
    current: Option<String>,
    groups: Vec<String>,
}

impl StatsWordCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next whitespace-delimited word, if one is complete
    fn next_word(buf: &mut BytesMut, eof: bool) -> Option<String> {
        let start = buf.iter().position(|b| !b.is_ascii_whitespace());
        let Some(start) = start else {
            buf.clear();
            return None;
        };
        buf.advance(start);

        match buf.iter().position(|b| b.is_ascii_whitespace()) {
            Some(end) => {
                let word = buf.split_to(end);
                Some(to_text(&word))
            }
            None if eof => Some(to_text(&buf.split())),
            None => None,
        }
    }

    fn close_group(&mut self) {
        if let Some(group) = self.current.take() {
            self.groups.push(group);
        }
    }

    fn take_token(&mut self) -> String {
        let token = self.groups.join(" ");
        self.groups.clear();
        token
    }

    fn push_word(&mut self, word: String) -> Option<String> {
        if word.contains('=') {
            self.close_group();
            self.current = Some(word);
        } else {
            match self.current {
                Some(ref mut group) => group.push_str(&word),
                None => self.current = Some(word),
            }
        }

        if self.groups.len() == STATS_GROUPS_PER_TOKEN {
            Some(self.take_token())
        } else {
            None
        }
    }

    fn decode_words(&mut self, buf: &mut BytesMut, eof: bool) -> Option<String> {
        while let Some(word) = Self::next_word(buf, eof) {
            if let Some(token) = self.push_word(word) {
                return Some(token);
            }
        }
        None
    }
}

impl Decoder for StatsWordCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        Ok(self.decode_words(buf, false))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(token) = self.decode_words(buf, true) {
            return Ok(Some(token));
        }
        // Whatever is left when ffmpeg exits goes out as a short token
        self.close_group();
        if self.groups.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.take_token()))
        }
    }
}

/// Runtime-selected tokenizer
#[derive(Debug)]
pub enum Tokenizer {
    Lines(LineCodec),
    StatsWords(StatsWordCodec),
}

impl From<TokenizerKind> for Tokenizer {
    fn from(kind: TokenizerKind) -> Self {
        match kind {
            TokenizerKind::Lines => Self::Lines(LineCodec::new()),
            TokenizerKind::StatsWords => Self::StatsWords(StatsWordCodec::new()),
        }
    }
}

impl Decoder for Tokenizer {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        match self {
            Self::Lines(codec) => codec.decode(buf),
            Self::StatsWords(codec) => codec.decode(buf),
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        match self {
            Self::Lines(codec) => codec.decode_eof(buf),
            Self::StatsWords(codec) => codec.decode_eof(buf),
        }
    }
}
