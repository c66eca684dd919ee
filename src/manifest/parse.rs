use std::io::{BufRead, BufReader, Error, ErrorKind, Read, Result};

use super::{Attributes, Manifest};

const NAME_PREFIX: &[u8] = b"Name: ";

/// One physical manifest line, classified.
///
/// Lines are kept as bytes: the writer wraps at a fixed byte width, so a multibyte character can
/// be split across a line and its continuation.
#[derive(Debug, PartialEq)]
enum Line<'a> {
    /// An empty line, or the end of the input
    EndOfSection,
    Name(&'a [u8]),
    /// The leading space has already been stripped
    Continuation(&'a [u8]),
    Attribute(&'a [u8]),
}

impl<'a> Line<'a> {
    fn classify(line: &'a [u8]) -> Self {
        if line.is_empty() {
            Line::EndOfSection
        } else if let Some(name) = line.strip_prefix(NAME_PREFIX) {
            Line::Name(name)
        } else if let Some(rest) = line.strip_prefix(b" ") {
            Line::Continuation(rest)
        } else {
            // Anything else is kept verbatim, even if it doesn't look like "Key: Value"
            Line::Attribute(line)
        }
    }
}

fn decode(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|err| Error::new(ErrorKind::InvalidData, err))
}

#[derive(Debug, Default)]
struct ManifestParser {
    manifest: Manifest,
    name: Vec<u8>,
    attributes: Attributes,
    /// The last attribute of the section, still open for continuations
    value: Option<Vec<u8>>,
}

impl ManifestParser {
    fn close_value(&mut self) -> Result<()> {
        if let Some(value) = self.value.take() {
            self.attributes.push(decode(value)?);
        }
        Ok(())
    }

    fn feed(&mut self, line: Line<'_>) -> Result<()> {
        match line {
            Line::EndOfSection => {
                self.close_value()?;
                // A section without attributes is never committed, and its name carries over
                if !self.attributes.is_empty() {
                    let name = decode(std::mem::take(&mut self.name))?;
                    let attributes = std::mem::take(&mut self.attributes);
                    self.manifest.insert(name, attributes);
                }
            }
            Line::Name(name) => self.name = name.to_vec(),
            Line::Continuation(rest) => match &mut self.value {
                Some(value) => value.extend_from_slice(rest),
                None => self.name.extend_from_slice(rest),
            },
            Line::Attribute(line) => {
                self.close_value()?;
                self.value = Some(line.to_vec());
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Manifest> {
        self.feed(Line::EndOfSection)?;
        Ok(self.manifest)
    }
}

impl Manifest {
    /// Parses a manifest (or signature file) from its text form.
    ///
    /// Lines may end with either "\r\n" or "\n".  Continuation lines (starting with a single
    /// space) are folded into the preceding value, which can also be the section name.  The input
    /// doesn't need to end with a blank line.
    ///
    /// Parsing is lenient: any line that isn't blank, a `Name:` header, or a continuation is kept
    /// as a raw attribute line.  The only failures are read errors and values or names that are
    /// not UTF-8 once their continuations are joined.
    pub fn parse(reader: impl Read) -> Result<Self> {
        let mut parser = ManifestParser::default();

        for line in BufReader::new(reader).split(b'\n') {
            let bytes = line?;
            let line = bytes.strip_suffix(b"\r").unwrap_or(&bytes);
            parser.feed(Line::classify(line))?;
        }

        parser.finish()
    }
}
