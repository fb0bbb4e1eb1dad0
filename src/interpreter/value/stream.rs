use std::cell::RefCell;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::rc::Rc;

use crate::{error::RuntimeError, interpreter::value::core::Value};

/// An in-memory replayable byte stream.
///
/// Codec output, response bodies, and form-data payloads are buffered into
/// one of these. The bytes are shared, so selecting a body twice yields two
/// independent cursors over the same buffer.
#[derive(Debug)]
pub struct BufStream {
    data: Rc<[u8]>,
    pos:  usize,
}

impl BufStream {
    pub fn new(data: impl Into<Rc<[u8]>>) -> Self {
        Self { data: data.into(), pos: 0 }
    }

    /// Wraps the stream into a value.
    pub fn into_value(self) -> Value {
        Value::Stream(Rc::new(RefCell::new(self)))
    }

    /// The underlying buffer, independent of the cursor.
    pub fn bytes(&self) -> Rc<[u8]> {
        Rc::clone(&self.data)
    }

    /// Reads everything from the cursor to the end, leaving the cursor at
    /// the end.
    pub fn read_to_end(&mut self) -> Vec<u8> {
        let rest = self.data[self.pos.min(self.data.len())..].to_vec();
        self.pos = self.data.len();
        rest
    }

    /// Reads up to `n` bytes from the cursor.
    pub fn read_at_most(&mut self, n: usize) -> Vec<u8> {
        let start = self.pos.min(self.data.len());
        let end = (start + n).min(self.data.len());

        self.pos = end;
        self.data[start..end].to_vec()
    }

    /// Reads the next line, including its newline, leaving the cursor just
    /// after it.
    pub fn read_line(&mut self) -> Vec<u8> {
        let start = self.pos.min(self.data.len());
        let rest = &self.data[start..];

        let end = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => start + i + 1,
            None => self.data.len(),
        };

        self.pos = end;
        self.data[start..end].to_vec()
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// The entire remaining contents as a string, with the cursor rewound
    /// afterwards.
    pub fn sprint(&mut self) -> String {
        let s = String::from_utf8_lossy(&self.read_to_end()).into_owned();
        self.rewind();
        s
    }
}

/// A handle over an open file. A file is also a stream: it can be read,
/// sought, and closed, and `write` accepts it as a destination.
#[derive(Debug)]
pub struct FileStream {
    file: Option<fs::File>,
    name: String,
}

impl FileStream {
    pub fn new(file: fs::File, name: impl Into<String>) -> Self {
        Self { file: Some(file), name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flushes and releases the underlying handle. Reads and writes on a
    /// closed file are quiet no-ops, matching a closed stream's empty reads.
    pub fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
    }

    pub fn write_all(&mut self, buf: &[u8]) -> Result<(), RuntimeError> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(())
    }

    /// Reads everything from the cursor to the end of the file.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>, RuntimeError> {
        let mut buf = Vec::new();

        if let Some(file) = self.file.as_mut() {
            file.read_to_end(&mut buf)?;
        }
        Ok(buf)
    }

    pub fn read_at_most(&mut self, n: usize) -> Result<Vec<u8>, RuntimeError> {
        let mut buf = vec![0; n];

        let Some(file) = self.file.as_mut() else {
            return Ok(Vec::new());
        };

        let mut read = 0;
        while read < n {
            let count = file.read(&mut buf[read..])?;

            if count == 0 {
                break;
            }
            read += count;
        }

        buf.truncate(read);
        Ok(buf)
    }

    /// Reads the next line, including its newline, leaving the file cursor
    /// just after it.
    pub fn read_line(&mut self) -> Result<Vec<u8>, RuntimeError> {
        let mut line = Vec::new();

        let Some(file) = self.file.as_mut() else {
            return Ok(line);
        };

        let mut byte = [0u8; 1];
        loop {
            if file.read(&mut byte)? == 0 {
                break;
            }

            line.push(byte[0]);

            if byte[0] == b'\n' {
                break;
            }
        }
        Ok(line)
    }

    pub fn rewind(&mut self) -> Result<(), RuntimeError> {
        if let Some(file) = self.file.as_mut() {
            file.seek(SeekFrom::Start(0))?;
        }
        Ok(())
    }

    /// The entire contents of the file as a string. The cursor is returned
    /// to the beginning once read. Errors render as the empty string, a file
    /// that cannot be read prints like an empty one.
    pub fn sprint(&mut self) -> String {
        if self.rewind().is_err() {
            return String::new();
        }

        let Ok(buf) = self.read_to_end() else {
            return String::new();
        };

        let _ = self.rewind();
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// A borrowed view over any value that can act as a byte stream, a file or
/// an in-memory stream.
pub enum StreamRef {
    File(Rc<RefCell<FileStream>>),
    Buf(Rc<RefCell<BufStream>>),
}

/// Asserts the given value to a stream.
pub fn to_stream(v: &Value) -> Result<StreamRef, RuntimeError> {
    match v {
        Value::File(f) => Ok(StreamRef::File(Rc::clone(f))),
        Value::Stream(s) => Ok(StreamRef::Buf(Rc::clone(s))),
        _ => Err(RuntimeError::Type { from: v.type_name(), to: "stream" }),
    }
}

impl StreamRef {
    /// Reads everything from the cursor to the end.
    pub fn read_to_end(&self) -> Result<Vec<u8>, RuntimeError> {
        match self {
            Self::File(f) => f.borrow_mut().read_to_end(),
            Self::Buf(s) => Ok(s.borrow_mut().read_to_end()),
        }
    }

    pub fn read_at_most(&self, n: usize) -> Result<Vec<u8>, RuntimeError> {
        match self {
            Self::File(f) => f.borrow_mut().read_at_most(n),
            Self::Buf(s) => Ok(s.borrow_mut().read_at_most(n)),
        }
    }

    pub fn read_line(&self) -> Result<Vec<u8>, RuntimeError> {
        match self {
            Self::File(f) => f.borrow_mut().read_line(),
            Self::Buf(s) => Ok(s.borrow_mut().read_line()),
        }
    }

    pub fn rewind(&self) -> Result<(), RuntimeError> {
        match self {
            Self::File(f) => f.borrow_mut().rewind(),
            Self::Buf(s) => {
                s.borrow_mut().rewind();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buf_stream_reads_and_rewinds() {
        let mut s = BufStream::new(&b"hello world"[..]);

        assert_eq!(s.read_at_most(5), b"hello");
        assert_eq!(s.read_to_end(), b" world");
        assert_eq!(s.read_to_end(), b"");

        s.rewind();
        assert_eq!(s.sprint(), "hello world");
        assert_eq!(s.sprint(), "hello world");
    }

    #[test]
    fn buf_stream_reads_lines_including_newline() {
        let mut s = BufStream::new(&b"one\ntwo\nthree"[..]);

        assert_eq!(s.read_line(), b"one\n");
        assert_eq!(s.read_line(), b"two\n");
        assert_eq!(s.read_line(), b"three");
        assert_eq!(s.read_line(), b"");
    }

    #[test]
    fn shared_bytes_have_independent_cursors() {
        let mut a = BufStream::new(&b"abc"[..]);
        let mut b = BufStream::new(a.bytes());

        assert_eq!(a.read_at_most(2), b"ab");
        assert_eq!(b.read_to_end(), b"abc");
    }
}
