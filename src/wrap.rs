//! Line wrapping for manifest-style text.
//!
//! The JAR manifest format caps every physical line at 72 bytes including the terminating CRLF.
//! Longer logical lines are split, and each continuation line starts with a single space which
//! the parser in [`crate::manifest`] strips again when folding the value back together.

use std::io::{Result, Write};

/// Maximum number of content bytes on one physical line (72 minus the CRLF).
pub const MAX_LINE_CONTENT: usize = 70;

const CONTINUATION: &[u8] = b"\r\n ";

fn is_newline(c: &u8) -> bool {
    *c == b'\r' || *c == b'\n'
}

/// A writer that splits any line exceeding 72 bytes (including the terminating "\r\n").
///
/// The first physical line of a logical line carries up to 70 content bytes; each continuation
/// carries the leading space plus up to 69 more.  The wrapping state survives across calls to
/// `write()`, so the output doesn't depend on how the input was chunked.
#[derive(Debug)]
pub struct LineWrapWriter<W: Write> {
    inner: W,
    column: usize,
}

impl<W: Write> LineWrapWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, column: 0 }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for LineWrapWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut todo = buf;

        while !todo.is_empty() {
            let end = todo.iter().position(is_newline).unwrap_or(todo.len());

            if end == 0 {
                // CR/LF runs are real line boundaries and always safe to write
                let run = todo.iter().take_while(|c| is_newline(c)).count();
                self.inner.write_all(&todo[..run])?;
                self.column = 0;
                todo = &todo[run..];
                continue;
            }

            if self.column == MAX_LINE_CONTENT {
                self.inner.write_all(CONTINUATION)?;
                self.column = 1;
            }

            let take = end.min(MAX_LINE_CONTENT - self.column);
            self.inner.write_all(&todo[..take])?;
            self.column += take;
            todo = &todo[take..];
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod test {
    use std::io::ErrorKind;

    use similar_asserts::assert_eq;

    use super::*;

    const LONG: &str = concat!(
        ".bcdefgh.1.bcdefgh.2.bcdefgh.3.bcdefgh.4.bcdefgh.5.bcdefgh.6.bcdefgh.7",
        ".bcdefgh.A.bcdefgh.B.bcdefgh.C.bcdefgh.D.bcdefgh.E.bcdefgh.F.bcdefgh.G",
        ".bcdefgh.H.bcdefgh.I.bcdefgh.J.bcdefgh.K.bcdefgh.L.bcdefgh.M.bcdefgh",
    );

    const LONG_WRAPPED: &str = concat!(
        ".bcdefgh.1.bcdefgh.2.bcdefgh.3.bcdefgh.4.bcdefgh.5.bcdefgh.6.bcdefgh.7\r\n",
        " .bcdefgh.A.bcdefgh.B.bcdefgh.C.bcdefgh.D.bcdefgh.E.bcdefgh.F.bcdefgh.\r\n",
        " G.bcdefgh.H.bcdefgh.I.bcdefgh.J.bcdefgh.K.bcdefgh.L.bcdefgh.M.bcdefgh",
    );

    fn wrap_chunks<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> String {
        let mut writer = LineWrapWriter::new(vec![]);
        for chunk in chunks {
            assert_eq!(writer.write(chunk).unwrap(), chunk.len());
        }
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_wrap72() {
        let input = format!("{LONG}\r\nhello");
        let want = format!("{LONG_WRAPPED}\r\nhello");
        assert_eq!(wrap_chunks([input.as_bytes()]), want);
    }

    #[test]
    fn test_exact_width_is_not_wrapped() {
        let line = "x".repeat(70);
        assert_eq!(
            wrap_chunks([format!("{line}\r\n").as_bytes()]),
            format!("{line}\r\n")
        );

        // ...but one more byte starts a continuation
        assert_eq!(
            wrap_chunks([format!("{line}y\r\n").as_bytes()]),
            format!("{line}\r\n y\r\n")
        );
    }

    #[test]
    fn test_chunking_does_not_matter() {
        let input = format!("{LONG}\r\n{LONG}\r\n");
        let whole = wrap_chunks([input.as_bytes()]);

        for size in [1, 2, 3, 7, 69, 70, 71, 140] {
            assert_eq!(wrap_chunks(input.as_bytes().chunks(size)), whole, "chunk size {size}");
        }
    }

    #[test]
    fn test_physical_lines_fit() {
        let input = format!("Name: {}\r\nSHA1-Digest: {}\r\n\r\n", "n".repeat(500), "d".repeat(30));
        let output = wrap_chunks([input.as_bytes()]);

        for (idx, line) in output.split("\r\n").enumerate() {
            assert!(line.len() + 2 <= 72, "line {idx} too long: {line:?}");
            if idx > 0 && line.starts_with(' ') {
                assert!(!line[1..].starts_with(' '), "double space on line {idx}");
            }
        }
    }

    #[test]
    fn test_wrapping_is_bytewise() {
        // a two-byte character straddling column 70 is split between the lines
        let mut writer = LineWrapWriter::new(vec![]);
        writer
            .write_all(format!("{}é\r\n", "x".repeat(69)).as_bytes())
            .unwrap();

        let mut want = "x".repeat(69).into_bytes();
        want.extend_from_slice(b"\xc3\r\n \xa9\r\n");
        assert_eq!(writer.into_inner(), want);
    }

    #[test]
    fn test_newline_runs_pass_through() {
        assert_eq!(wrap_chunks([b"\r\n\r\n\n\r".as_slice()]), "\r\n\r\n\n\r");
        assert_eq!(wrap_chunks([b"".as_slice()]), "");
    }

    #[test]
    fn test_write_error_is_propagated() {
        struct BrokenWriter;
        impl Write for BrokenWriter {
            fn write(&mut self, _buf: &[u8]) -> Result<usize> {
                Err(ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> Result<()> {
                Ok(())
            }
        }

        let mut writer = LineWrapWriter::new(BrokenWriter);
        assert_eq!(
            writer.write(b"hello").unwrap_err().kind(),
            ErrorKind::BrokenPipe
        );
    }
}
