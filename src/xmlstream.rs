//! Minimal streaming XML pull parser.
//!
//! Emits structural events (element start/end) from a byte stream without
//! building a document tree. Character data, comments, CDATA sections,
//! processing instructions, and DOCTYPE declarations are scanned past
//! without being materialized. The reader only advances when the caller
//! pulls the next event, so a consumer that has seen enough can simply stop
//! pulling; that is the whole early-termination story.
//!
//! DTDs are never loaded and nothing is validated; behavior is fixed at
//! construction.

use std::io::{self, Read};
use thiserror::Error;

/// Structural parse event.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent {
    /// An opening (or self-closing) element with its attributes.
    Start { name: String, attributes: Attributes },
    /// A closing element.
    End { name: String },
}

/// Attribute list captured from a start tag, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive lookup (ASCII).
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, name: String, value: String) {
        self.0.push((name, value));
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Attributes {
        Attributes(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// Streaming parse failure.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
    #[error("malformed markup at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("unexpected end of input at byte {offset}")]
    UnexpectedEof { offset: usize },
}

/// Pull parser over an arbitrary byte stream.
pub struct XmlReader<R: Read> {
    src: R,
    offset: usize,
    /// End event synthesized for a self-closing tag, delivered on the next
    /// pull.
    queued_end: Option<String>,
}

impl<R: Read> XmlReader<R> {
    pub fn new(src: R) -> Self {
        XmlReader {
            src,
            offset: 0,
            queued_end: None,
        }
    }

    /// Pull the next structural event, or `None` at end of input.
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>, XmlError> {
        if let Some(name) = self.queued_end.take() {
            return Ok(Some(XmlEvent::End { name }));
        }
        loop {
            // Character data is skipped, entities and all.
            if !self.skip_until(b'<')? {
                return Ok(None);
            }
            let byte = self.require()?;
            match byte {
                b'?' => self.skip_processing_instruction()?,
                b'!' => self.skip_declaration()?,
                b'/' => return Ok(Some(self.read_end_tag()?)),
                first => return Ok(Some(self.read_start_tag(first)?)),
            }
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>, XmlError> {
        let mut one = [0u8; 1];
        loop {
            match self.src.read(&mut one) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(one[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(XmlError::Io(e)),
            }
        }
    }

    fn require(&mut self) -> Result<u8, XmlError> {
        self.next_byte()?.ok_or(XmlError::UnexpectedEof {
            offset: self.offset,
        })
    }

    fn syntax(&self, message: impl Into<String>) -> XmlError {
        XmlError::Syntax {
            offset: self.offset,
            message: message.into(),
        }
    }

    /// Advance past the next occurrence of `target`. Returns false when the
    /// stream ends first.
    fn skip_until(&mut self, target: u8) -> Result<bool, XmlError> {
        while let Some(b) = self.next_byte()? {
            if b == target {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `<?...?>`: the XML declaration and any other processing
    /// instruction.
    fn skip_processing_instruction(&mut self) -> Result<(), XmlError> {
        let mut prev = 0u8;
        loop {
            let b = self.require()?;
            if prev == b'?' && b == b'>' {
                return Ok(());
            }
            prev = b;
        }
    }

    /// `<!...`: comment, CDATA section, or DOCTYPE-style declaration.
    fn skip_declaration(&mut self) -> Result<(), XmlError> {
        let b = self.require()?;
        if b == b'-' {
            if self.require()? != b'-' {
                return Err(self.syntax("expected comment after <!-"));
            }
            return self.skip_comment();
        }
        if b == b'[' {
            return self.skip_cdata();
        }
        // DOCTYPE or similar; honor a bracketed internal subset.
        let mut bracket_depth = 0usize;
        let mut cur = b;
        loop {
            match cur {
                b'[' => bracket_depth += 1,
                b']' => bracket_depth = bracket_depth.saturating_sub(1),
                b'>' if bracket_depth == 0 => return Ok(()),
                _ => {}
            }
            cur = self.require()?;
        }
    }

    /// Past `<!--`, scan to `-->`.
    fn skip_comment(&mut self) -> Result<(), XmlError> {
        let mut dashes = 0usize;
        loop {
            let b = self.require()?;
            match b {
                b'-' => dashes += 1,
                b'>' if dashes >= 2 => return Ok(()),
                _ => dashes = 0,
            }
        }
    }

    /// Past `<![`, expect `CDATA[` and scan to `]]>`.
    fn skip_cdata(&mut self) -> Result<(), XmlError> {
        for expected in *b"CDATA[" {
            if self.require()? != expected {
                return Err(self.syntax("malformed CDATA section"));
            }
        }
        let mut closers = 0usize;
        loop {
            let b = self.require()?;
            match b {
                b']' => closers += 1,
                b'>' if closers >= 2 => return Ok(()),
                _ => closers = 0,
            }
        }
    }

    fn read_end_tag(&mut self) -> Result<XmlEvent, XmlError> {
        let mut name = Vec::new();
        loop {
            let b = self.require()?;
            match b {
                b'>' => break,
                b if b.is_ascii_whitespace() => {
                    // Trailing whitespace before '>' is tolerated.
                    if !self.skip_until(b'>')? {
                        return Err(XmlError::UnexpectedEof {
                            offset: self.offset,
                        });
                    }
                    break;
                }
                b => name.push(b),
            }
        }
        if name.is_empty() {
            return Err(self.syntax("empty end-tag name"));
        }
        Ok(XmlEvent::End {
            name: String::from_utf8_lossy(&name).into_owned(),
        })
    }

    fn read_start_tag(&mut self, first: u8) -> Result<XmlEvent, XmlError> {
        if !is_name_byte(first) {
            return Err(self.syntax("invalid element name"));
        }
        let mut name = vec![first];
        let mut byte;
        loop {
            byte = self.require()?;
            if is_name_byte(byte) {
                name.push(byte);
            } else {
                break;
            }
        }
        let name = String::from_utf8_lossy(&name).into_owned();
        let mut attributes = Attributes::default();

        loop {
            while byte.is_ascii_whitespace() {
                byte = self.require()?;
            }
            match byte {
                b'>' => {
                    return Ok(XmlEvent::Start { name, attributes });
                }
                b'/' => {
                    if self.require()? != b'>' {
                        return Err(self.syntax("expected '>' after '/'"));
                    }
                    self.queued_end = Some(name.clone());
                    return Ok(XmlEvent::Start { name, attributes });
                }
                b => {
                    let (attr_name, next) = self.read_attribute_name(b)?;
                    let value = self.read_attribute_value(next)?;
                    attributes.push(attr_name, value);
                    byte = self.require()?;
                }
            }
        }
    }

    /// Read an attribute name starting at `first`, consuming up to and
    /// including the `=`. Returns the name and the byte after `=`.
    fn read_attribute_name(&mut self, first: u8) -> Result<(String, u8), XmlError> {
        if !is_name_byte(first) {
            return Err(self.syntax("invalid attribute name"));
        }
        let mut name = vec![first];
        let mut byte = self.require()?;
        while is_name_byte(byte) {
            name.push(byte);
            byte = self.require()?;
        }
        while byte.is_ascii_whitespace() {
            byte = self.require()?;
        }
        if byte != b'=' {
            return Err(self.syntax("expected '=' after attribute name"));
        }
        let mut after = self.require()?;
        while after.is_ascii_whitespace() {
            after = self.require()?;
        }
        Ok((String::from_utf8_lossy(&name).into_owned(), after))
    }

    /// Read a quoted attribute value whose opening quote is `quote`,
    /// decoding entity and character references.
    fn read_attribute_value(&mut self, quote: u8) -> Result<String, XmlError> {
        if quote != b'"' && quote != b'\'' {
            return Err(self.syntax("expected quoted attribute value"));
        }
        let mut value = Vec::new();
        loop {
            let b = self.require()?;
            if b == quote {
                break;
            }
            if b == b'&' {
                self.read_reference(&mut value)?;
            } else {
                value.push(b);
            }
        }
        Ok(String::from_utf8_lossy(&value).into_owned())
    }

    /// Decode a `&...;` reference into `out`. Unknown entity names are kept
    /// literally rather than failing the parse.
    fn read_reference(&mut self, out: &mut Vec<u8>) -> Result<(), XmlError> {
        let mut body = Vec::new();
        loop {
            let b = self.require()?;
            if b == b';' {
                break;
            }
            body.push(b);
            // References are short; anything longer is not one.
            if body.len() > 10 {
                out.push(b'&');
                out.extend_from_slice(&body);
                return Ok(());
            }
        }
        match body.as_slice() {
            b"lt" => out.push(b'<'),
            b"gt" => out.push(b'>'),
            b"amp" => out.push(b'&'),
            b"quot" => out.push(b'"'),
            b"apos" => out.push(b'\''),
            _ => {
                if let Some(ch) = decode_char_reference(&body) {
                    let mut buf = [0u8; 4];
                    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                } else {
                    out.push(b'&');
                    out.extend_from_slice(&body);
                    out.push(b';');
                }
            }
        }
        Ok(())
    }
}

fn is_name_byte(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'/' | b'>' | b'=' | b'<' | b'"' | b'\'')
}

/// `#NN` / `#xHH` character reference body, if valid.
fn decode_char_reference(body: &[u8]) -> Option<char> {
    let body = body.strip_prefix(b"#")?;
    let code = if let Some(hex) = body.strip_prefix(b"x").or_else(|| body.strip_prefix(b"X")) {
        u32::from_str_radix(std::str::from_utf8(hex).ok()?, 16).ok()?
    } else {
        std::str::from_utf8(body).ok()?.parse::<u32>().ok()?
    };
    char::from_u32(code)
}
