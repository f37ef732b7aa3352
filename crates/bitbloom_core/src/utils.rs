use byteorder::{BigEndian as BE, ReadBytesExt, WriteBytesExt};
use sha2::{Digest, Sha384};
use std::io::{self, Read, Write};

pub fn write_u64<W: Write>(w: &mut W, v: u64) -> io::Result<()> { w.write_u64::<BE>(v) }
pub fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> { r.read_u64::<BE>() }

pub fn sha384(data: &[u8]) -> [u8; 48] { to_array(Sha384::digest(data).as_slice()) }

fn to_array(dig: &[u8]) -> [u8; 48] {
    let mut out = [0u8; 48];
    out.copy_from_slice(dig);
    out
}

/// Passes writes through to `inner` while digesting and counting them.
pub struct DigestWriter<W> {
    inner: W,
    hasher: Sha384,
    written: u64,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, hasher: Sha384::new(), written: 0 }
    }

    /// Digest of everything written so far, plus the byte count and the sink.
    pub fn finish(self) -> ([u8; 48], u64, W) {
        (to_array(self.hasher.finalize().as_slice()), self.written, self.inner)
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> { self.inner.flush() }
}

/// Read-side twin of [`DigestWriter`].
pub struct DigestReader<R> {
    inner: R,
    hasher: Sha384,
    read: u64,
}

impl<R: Read> DigestReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, hasher: Sha384::new(), read: 0 }
    }

    pub fn finish(self) -> ([u8; 48], u64, R) {
        (to_array(self.hasher.finalize().as_slice()), self.read, self.inner)
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.read += n as u64;
        Ok(n)
    }
}
