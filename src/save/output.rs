use std::io::Write;

use crate::{encoding::OutputEncoding, error::SaveError};

/// Buffered text is converted and passed to the writer once it grows beyond this size.
pub(crate) const MINLEN: usize = 4000;

/// Output sink of the serializer.
///
/// Text is accumulated as UTF-8 and converted to the output encoding chunk by chunk.
pub struct OutputBuffer<'a> {
    context: Box<dyn Write + 'a>,
    encoding: OutputEncoding,
    buffer: String,
    conv: Vec<u8>,
    written: usize,
}

impl<'a> OutputBuffer<'a> {
    pub fn new(writer: impl Write + 'a, encoding: OutputEncoding) -> Self {
        Self {
            context: Box::new(writer),
            encoding,
            buffer: String::with_capacity(MINLEN),
            conv: vec![],
            written: 0,
        }
    }

    /// Write the byte order mark of the output encoding, if it has one.
    ///
    /// Must be called before any text is written.
    pub fn write_bom(&mut self) -> Result<(), SaveError> {
        debug_assert!(self.buffer.is_empty() && self.written == 0);
        let bom = self.encoding.bom();
        if !bom.is_empty() {
            self.context.write_all(bom)?;
            self.written += bom.len();
        }
        Ok(())
    }

    pub fn write_str(&mut self, s: &str) -> Result<(), SaveError> {
        self.buffer.push_str(s);
        if self.buffer.len() > MINLEN {
            self.flush_buffer()?;
        }
        Ok(())
    }

    pub fn write_char(&mut self, c: char) -> Result<(), SaveError> {
        self.write_str(c.encode_utf8(&mut [0; 4]))
    }

    fn flush_buffer(&mut self) -> Result<(), SaveError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.conv.clear();
        self.encoding.encode_str(&self.buffer, &mut self.conv);
        self.context.write_all(&self.conv)?;
        self.written += self.conv.len();
        self.buffer.clear();
        Ok(())
    }

    /// Write out everything buffered and flush the underlying writer.
    ///
    /// Return the total number of written bytes.
    pub fn flush(&mut self) -> Result<usize, SaveError> {
        self.flush_buffer()?;
        self.context.flush()?;
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_output_is_flushed_in_chunks() {
        let mut out = vec![];
        {
            let mut buf = OutputBuffer::new(&mut out, OutputEncoding::UTF8);
            let line = "0123456789".repeat(100);
            for _ in 0..10 {
                buf.write_str(&line).unwrap();
            }
            assert_eq!(buf.flush().unwrap(), 10000);
        }
        assert_eq!(out.len(), 10000);
    }

    #[test]
    fn bom_comes_first() {
        let mut out = vec![];
        {
            let mut buf = OutputBuffer::new(&mut out, OutputEncoding::UTF16LE);
            buf.write_bom().unwrap();
            buf.write_str("a").unwrap();
            buf.write_char('\u{E9}').unwrap();
            buf.flush().unwrap();
        }
        assert_eq!(out, [0xFF, 0xFE, b'a', 0, 0xE9, 0]);
    }
}
