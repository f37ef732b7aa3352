//! Serialized filter format (big-endian):
//!
//!   m[8]      = number of bits
//!   k[8]      = number of hash probes
//!   words[8w] = ceil(m/64) bit words, bit i in word i/64 at position i%64
//!   digest[48]= SHA-384(m ‖ k ‖ words)
//!
//! Text form: lowercase hex of exactly those bytes.

use crate::consts::{DIGEST_SIZE, HDR_SIZE, MIN_FRAME_SIZE, WORD_BYTES};
use crate::errors::{BloomError, Result};
use crate::filter::{check_shape, words_for, BloomFilter};
use crate::utils::{read_u64, sha384, write_u64, DigestReader, DigestWriter};
use std::io::{self, Read, Write};
use tracing::{debug, warn};

/// Upper bound on words reserved up front by the streaming reader.
const READ_RESERVE_WORDS: usize = 1 << 16;

fn frame_len(num_bits: u64) -> Option<usize> {
    words_for(num_bits)
        .checked_mul(WORD_BYTES)?
        .checked_add(MIN_FRAME_SIZE)
}

fn eof_as_truncated(what: &'static str) -> impl Fn(io::Error) -> BloomError {
    move |e| match e.kind() {
        io::ErrorKind::UnexpectedEof => BloomError::Truncated(what),
        _ => BloomError::Io(e),
    }
}

fn malformed(msg: String) -> BloomError {
    warn!(%msg, "rejecting malformed bloom payload");
    BloomError::Malformed(msg)
}

impl BloomFilter {
    /// Size in bytes of the serialized form.
    pub fn encoded_len(&self) -> usize {
        MIN_FRAME_SIZE + self.words().len() * WORD_BYTES
    }

    /// One-shot binary encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&self.num_bits().to_be_bytes());
        buf.extend_from_slice(&self.num_hashes().to_be_bytes());
        for w in self.words() {
            buf.extend_from_slice(&w.to_be_bytes());
        }
        let dig = sha384(&buf);
        buf.extend_from_slice(&dig);
        buf
    }

    /// Writes the same bytes as [`to_bytes`](Self::to_bytes) to `sink`,
    /// digesting as it goes. Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, sink: W) -> Result<u64> {
        let mut w = DigestWriter::new(sink);
        write_u64(&mut w, self.num_bits()).map_err(BloomError::Sink)?;
        write_u64(&mut w, self.num_hashes()).map_err(BloomError::Sink)?;
        for &word in self.words() {
            write_u64(&mut w, word).map_err(BloomError::Sink)?;
        }
        let (dig, written, mut sink) = w.finish();
        sink.write_all(&dig).map_err(BloomError::Sink)?;
        sink.flush().map_err(BloomError::Sink)?;
        Ok(written + DIGEST_SIZE as u64)
    }

    /// Decodes a complete serialized filter. The input must hold exactly one frame.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_FRAME_SIZE {
            return Err(BloomError::Truncated("header"));
        }
        let mut hdr = [0u8; 8];
        hdr.copy_from_slice(&bytes[0..8]);
        let m = u64::from_be_bytes(hdr);
        hdr.copy_from_slice(&bytes[8..16]);
        let k = u64::from_be_bytes(hdr);

        // A whole frame is digest-checked before its header is trusted, so a
        // corrupted m/k surfaces as an integrity failure, not a length one.
        let whole_frame = (bytes.len() - MIN_FRAME_SIZE) % WORD_BYTES == 0;
        if whole_frame {
            verify_digest(bytes)?;
            if frame_len(m) != Some(bytes.len()) {
                return Err(malformed(format!("m={m} does not match {} byte payload", bytes.len())));
            }
        } else {
            match frame_len(m) {
                Some(need) if bytes.len() < need => return Err(BloomError::Truncated("bit words")),
                Some(need) if bytes.len() > need => {
                    return Err(malformed(format!("{} trailing bytes", bytes.len() - need)))
                }
                Some(_) => verify_digest(bytes)?,
                None => return Err(malformed(format!("m={m} out of range"))),
            }
        }

        let words = bytes[HDR_SIZE..bytes.len() - DIGEST_SIZE]
            .chunks_exact(WORD_BYTES)
            .map(|c| {
                let mut w = [0u8; 8];
                w.copy_from_slice(c);
                u64::from_be_bytes(w)
            })
            .collect();
        let filter = BloomFilter::from_words(m, k, words).map_err(malformed)?;
        debug!(m, k, bits_set = filter.bits_set(), "bloom filter decoded");
        Ok(filter)
    }

    /// Reads exactly one frame from `reader`. Returns the filter and the
    /// number of bytes consumed.
    pub fn read_from<R: Read>(reader: R) -> Result<(Self, u64)> {
        let mut r = DigestReader::new(reader);
        let m = read_u64(&mut r).map_err(eof_as_truncated("header"))?;
        let k = read_u64(&mut r).map_err(eof_as_truncated("header"))?;
        check_shape(m, k).map_err(malformed)?;
        let n_words = words_for(m);
        let mut words = Vec::with_capacity(n_words.min(READ_RESERVE_WORDS));
        for _ in 0..n_words {
            words.push(read_u64(&mut r).map_err(eof_as_truncated("bit words"))?);
        }
        let (want, consumed, mut reader) = r.finish();
        let mut have = [0u8; DIGEST_SIZE];
        reader.read_exact(&mut have).map_err(eof_as_truncated("digest"))?;
        if have != want {
            warn!(m, k, "bloom payload digest mismatch");
            return Err(BloomError::Integrity);
        }
        let filter = BloomFilter::from_words(m, k, words).map_err(malformed)?;
        debug!(m, k, bits_set = filter.bits_set(), "bloom filter read");
        Ok((filter, consumed + DIGEST_SIZE as u64))
    }

    pub fn to_text(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let bytes = hex::decode(text.trim())
            .map_err(|e| malformed(format!("text: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Replaces this filter's shape and bits with the decoded ones. On error
    /// `self` is left untouched.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        *self = Self::from_bytes(bytes)?;
        Ok(())
    }

    pub fn load_text(&mut self, text: &str) -> Result<()> {
        *self = Self::from_text(text)?;
        Ok(())
    }

    pub fn load_from<R: Read>(&mut self, reader: R) -> Result<u64> {
        let (filter, n) = Self::read_from(reader)?;
        *self = filter;
        Ok(n)
    }
}

fn verify_digest(frame: &[u8]) -> Result<()> {
    let (payload, digest) = frame.split_at(frame.len() - DIGEST_SIZE);
    if sha384(payload)[..] != *digest {
        warn!(len = frame.len(), "bloom payload digest mismatch");
        return Err(BloomError::Integrity);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BloomFilter {
        let mut f = BloomFilter::with_size(200, 3).unwrap();
        for seed in [0u64, 7, 99, 1 << 40, u64::MAX] {
            f.add_hash(seed);
        }
        f
    }

    #[test]
    fn layout_is_pinned() {
        let mut f = BloomFilter::with_size(16, 1).unwrap();
        f.add_hash(0);
        let bytes = f.to_bytes();
        assert_eq!(bytes.len(), 16 + 8 + 48);
        assert_eq!(&bytes[0..8], &16u64.to_be_bytes());
        assert_eq!(&bytes[8..16], &1u64.to_be_bytes());
        assert_eq!(&bytes[16..24], &1u64.to_be_bytes());
        assert_eq!(&bytes[24..], &sha384(&bytes[..24])[..]);
        assert_eq!(f.encoded_len(), bytes.len());
    }

    #[test]
    fn binary_round_trip() {
        let f = sample();
        let g = BloomFilter::from_bytes(&f.to_bytes()).unwrap();
        assert_eq!(f, g);
        assert_eq!(g.bits_set(), f.bits_set());
    }

    #[test]
    fn text_round_trip_and_whitespace() {
        let f = sample();
        let text = f.to_text();
        assert!(text.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(BloomFilter::from_text(&text).unwrap(), f);
        assert_eq!(BloomFilter::from_text(&format!("  {text}\n")).unwrap(), f);
    }

    #[test]
    fn bad_hex_is_malformed() {
        assert!(matches!(BloomFilter::from_text("zz"), Err(BloomError::Malformed(_))));
        assert!(matches!(BloomFilter::from_text("abc"), Err(BloomError::Malformed(_))));
    }

    #[test]
    fn short_input_is_truncated() {
        let bytes = sample().to_bytes();
        assert!(matches!(BloomFilter::from_bytes(&bytes[..10]), Err(BloomError::Truncated(_))));
        assert!(matches!(BloomFilter::from_bytes(&bytes[..70]), Err(BloomError::Truncated(_))));
        assert!(matches!(BloomFilter::from_bytes(&bytes[..bytes.len() - 3]), Err(BloomError::Truncated(_))));
    }

    #[test]
    fn trailing_bytes_are_malformed() {
        let mut bytes = sample().to_bytes();
        bytes.push(0);
        assert!(matches!(BloomFilter::from_bytes(&bytes), Err(BloomError::Malformed(_))));
    }

    #[test]
    fn every_single_byte_flip_is_detected() {
        let bytes = sample().to_bytes();
        for i in 0..bytes.len() {
            let mut bad = bytes.clone();
            bad[i] ^= 0x01;
            assert!(
                matches!(BloomFilter::from_bytes(&bad), Err(BloomError::Integrity)),
                "flip at {i} not detected"
            );
        }
    }

    #[test]
    fn consistent_but_invalid_shape_is_malformed() {
        // m = 0 with a valid digest
        let mut payload = Vec::new();
        payload.extend_from_slice(&0u64.to_be_bytes());
        payload.extend_from_slice(&1u64.to_be_bytes());
        let dig = sha384(&payload);
        payload.extend_from_slice(&dig);
        assert!(matches!(BloomFilter::from_bytes(&payload), Err(BloomError::Malformed(_))));

        // stray bit past m = 8
        let mut payload = Vec::new();
        payload.extend_from_slice(&8u64.to_be_bytes());
        payload.extend_from_slice(&1u64.to_be_bytes());
        payload.extend_from_slice(&(1u64 << 9).to_be_bytes());
        let dig = sha384(&payload);
        payload.extend_from_slice(&dig);
        assert!(matches!(BloomFilter::from_bytes(&payload), Err(BloomError::Malformed(_))));
    }

    #[test]
    fn stream_matches_one_shot() {
        let f = sample();
        let mut out = Vec::new();
        let n = f.write_to(&mut out).unwrap();
        assert_eq!(out, f.to_bytes());
        assert_eq!(n, out.len() as u64);
    }

    #[test]
    fn read_from_round_trip_and_leaves_rest() {
        let f = sample();
        let mut data = f.to_bytes();
        data.extend_from_slice(b"next");
        let mut cur = std::io::Cursor::new(data);
        let (g, n) = BloomFilter::read_from(&mut cur).unwrap();
        assert_eq!(g, f);
        assert_eq!(n, f.encoded_len() as u64);
        assert_eq!(cur.position(), n);
    }

    #[test]
    fn read_from_detects_truncation_and_corruption() {
        let bytes = sample().to_bytes();
        for cut in [0, 8, 20, bytes.len() - 1] {
            assert!(matches!(BloomFilter::read_from(&bytes[..cut]), Err(BloomError::Truncated(_))));
        }
        let mut bad = bytes.clone();
        bad[20] ^= 0x80;
        assert!(matches!(BloomFilter::read_from(&bad[..]), Err(BloomError::Integrity)));
    }

    #[test]
    fn load_overwrites_and_failure_keeps_state() {
        let src = sample();
        let mut dst = BloomFilter::with_size(8, 8).unwrap();
        dst.load_text(&src.to_text()).unwrap();
        assert_eq!(dst, src);

        let mut dst2 = BloomFilter::with_size(64, 2).unwrap();
        dst2.add_hash(5);
        let before = dst2.clone();
        assert!(dst2.load_bytes(&[1, 2, 3]).is_err());
        assert_eq!(dst2, before);

        let n = dst2.load_from(&src.to_bytes()[..]).unwrap();
        assert_eq!(n, src.encoded_len() as u64);
        assert_eq!(dst2, src);
    }
}
