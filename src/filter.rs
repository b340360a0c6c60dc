//! Bracket-escaping repair filter for HTML-wrapped result files.
//!
//! The transform that renders result files as HTML writes raw `<`/`>`
//! characters into attribute values of the embedded `<xmldata>` island,
//! which a strict XML parser then chokes on. This filter rewrites exactly
//! those characters to `&lt;`/`&gt;` while the stream is being read.
//! Everything outside the island, or inside it but outside an attribute
//! value, passes through byte for byte.

use std::io::{self, Read};

/// Opening sentinel tag name of the island.
const OPEN_TAG: &[u8] = b"xmldata";

/// Closing sentinel tag name, with the leading slash.
const CLOSE_TAG: &[u8] = b"/xmldata";

/// Pull-based filter wrapping a raw byte stream.
///
/// A small state machine tracks whether the current position is inside the
/// `<xmldata>` region, inside a double-quoted attribute value, and how far
/// a candidate sentinel tag name has matched so far. Once the close tag has
/// been seen the filter latches into passthrough mode and never re-enters
/// the region. Multi-byte entity replacements are drained one byte per read
/// call before the underlying stream is consumed again.
pub struct BracketFilter<R: Read> {
    inner: R,
    inside_region: bool,
    past_region: bool,
    inside_attribute: bool,
    /// Position within the sentinel tag name currently being matched;
    /// `None` while not inside a tag.
    scan_pos: Option<usize>,
    /// Remainder of a multi-byte replacement still to be emitted.
    pending: &'static [u8],
}

impl<R: Read> BracketFilter<R> {
    pub fn new(inner: R) -> Self {
        BracketFilter {
            inner,
            inside_region: false,
            past_region: false,
            inside_attribute: false,
            scan_pos: None,
            pending: &[],
        }
    }

    /// Run one input byte through the state machine and return the byte to
    /// emit in its place (possibly the start of a queued replacement).
    fn transduce(&mut self, byte: u8) -> u8 {
        if self.past_region {
            return byte;
        }

        if self.inside_attribute {
            // Attribute mode is only ever entered inside the region.
            match byte {
                b'"' => self.inside_attribute = false,
                b'<' => {
                    self.pending = &b"&lt;"[1..];
                    return b'&';
                }
                b'>' => {
                    self.pending = &b"&gt;"[1..];
                    return b'&';
                }
                _ => {}
            }
            return byte;
        }

        match byte {
            b'<' => self.scan_pos = Some(0),
            b'>' => self.scan_pos = None,
            _ => {
                if let Some(pos) = self.scan_pos {
                    if self.inside_region && byte == b'"' {
                        self.inside_attribute = true;
                    } else {
                        let name = if self.inside_region { CLOSE_TAG } else { OPEN_TAG };
                        if byte == name[pos] {
                            if pos + 1 == name.len() {
                                if self.inside_region {
                                    self.inside_region = false;
                                    self.past_region = true;
                                } else {
                                    self.inside_region = true;
                                }
                                // Still inside the tag; attributes of the
                                // sentinel tag itself must be seen.
                                self.scan_pos = Some(0);
                            } else {
                                self.scan_pos = Some(pos + 1);
                            }
                        } else {
                            // Abandon this candidate only; scanning stays
                            // active until the tag closes.
                            self.scan_pos = Some(0);
                        }
                    }
                }
            }
        }
        byte
    }

    /// Next filtered byte, or `None` at end of stream.
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some((&first, rest)) = self.pending.split_first() {
            self.pending = rest;
            return Ok(Some(first));
        }
        let mut one = [0u8; 1];
        loop {
            match self.inner.read(&mut one) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(self.transduce(one[0]))),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Read for BracketFilter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            match self.next_byte() {
                Ok(Some(b)) => {
                    buf[written] = b;
                    written += 1;
                }
                Ok(None) => break,
                Err(e) if written == 0 => return Err(e),
                // Bytes already produced win; the error resurfaces on the
                // next call.
                Err(_) => break,
            }
        }
        Ok(written)
    }
}
