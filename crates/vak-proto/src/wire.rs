// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime tagged-message codec over word-aligned buffers.
//!
//! Roughtime messages are encoded as tag-value maps: a header with tag count,
//! cumulative offsets, sorted tags, followed by concatenated values. Every
//! field is a multiple of 4 bytes.
//!
//! Layout:
//! ```text
//! num_tags: u32 LE
//! offsets:  [u32 LE; N-1]   (cumulative byte offsets into value region)
//! tags:     [[u8; 4]; N]    (sorted ascending by LE u32 value)
//! values:   [u8]            (concatenated, 4-byte aligned)
//! ```
//!
//! IETF packets wrap the message in an envelope: the 8-byte magic `ROUGHTIM`
//! and a 4-byte LE length.
//!
//! All offset arithmetic is done in `u64` and checked against the buffer, so
//! hostile headers produce [`RoughtimeError::Malformed`] instead of wrapping.

use alloc::vec::Vec;

use crate::error::RoughtimeError;

/// Envelope magic for IETF packets.
pub const ENVELOPE_MAGIC: [u8; 8] = *b"ROUGHTIM";

/// Envelope header size: 8 (magic) + 4 (length).
pub const ENVELOPE_HEADER_LEN: usize = 12;

/// A non-copying view over a word-aligned byte region.
///
/// The length is always a multiple of 4 and fits in a `u32`. Slicing narrows
/// the view and never reads outside the parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WordSlice<'a> {
    bytes: &'a [u8],
}

impl<'a> WordSlice<'a> {
    /// Wrap `bytes`, which must be a whole number of words.
    pub fn new(bytes: &'a [u8]) -> Result<Self, RoughtimeError> {
        if bytes.len() % 4 != 0 {
            return Err(RoughtimeError::malformed("length not a multiple of 4"));
        }
        if u32::try_from(bytes.len()).is_err() {
            return Err(RoughtimeError::malformed("buffer larger than 4 GiB"));
        }
        Ok(WordSlice { bytes })
    }

    /// Size in bytes.
    pub fn size(&self) -> u32 {
        // Checked in `new` and preserved by `slice`.
        self.bytes.len() as u32
    }

    /// The underlying bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Read the little-endian word at `word_index`.
    pub fn read_u32(&self, word_index: u32) -> Result<u32, RoughtimeError> {
        let start = u64::from(word_index) * 4;
        if start >= u64::from(self.size()) {
            return Err(RoughtimeError::malformed("word index out of bounds"));
        }
        let start = start as usize;
        let word = &self.bytes[start..start + 4];
        Ok(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
    }

    /// Read a little-endian `u64` stored as (low word, high word).
    pub fn read_u64(&self, word_index: u32) -> Result<u64, RoughtimeError> {
        let lo = self.read_u32(word_index)?;
        let hi_index = word_index
            .checked_add(1)
            .ok_or(RoughtimeError::malformed("word index out of bounds"))?;
        let hi = self.read_u32(hi_index)?;
        Ok(u64::from(lo) | (u64::from(hi) << 32))
    }

    /// Narrow to `byte_size` bytes starting at word `word_offset`.
    pub fn slice(&self, word_offset: u32, byte_size: u32) -> Result<WordSlice<'a>, RoughtimeError> {
        if byte_size % 4 != 0 {
            return Err(RoughtimeError::malformed("slice size not a multiple of 4"));
        }
        let start = 4 * u64::from(word_offset);
        let end = start + u64::from(byte_size);
        if end > u64::from(u32::MAX) {
            return Err(RoughtimeError::malformed("slice end overflows 32 bits"));
        }
        if end > u64::from(self.size()) {
            return Err(RoughtimeError::malformed("slice beyond parent"));
        }
        Ok(WordSlice {
            bytes: &self.bytes[start as usize..end as usize],
        })
    }

    /// Number of tags declared in the header.
    pub fn num_tags(&self) -> Result<u32, RoughtimeError> {
        self.read_u32(0)
    }

    /// Look up the value for `tag` by linear scan of the tag table.
    ///
    /// Tag ordering is not checked here (see [`WordSlice::check_tag_order`]);
    /// every offset is bounds-checked.
    pub fn get_tag(&self, tag: [u8; 4]) -> Result<WordSlice<'a>, RoughtimeError> {
        let wanted = u32::from_le_bytes(tag);
        let num_tags = self.num_tags()?;
        for i in 0..num_tags {
            let tag_word = num_tags
                .checked_add(i)
                .ok_or(RoughtimeError::malformed("tag count overflows"))?;
            if self.read_u32(tag_word)? == wanted {
                return self.value_at(i, num_tags);
            }
        }
        Err(RoughtimeError::TagNotFound { tag })
    }

    /// Require the tag table to be strictly ascending as LE `u32`.
    ///
    /// [`verify_response`](crate::verify_response) runs this on every
    /// message it decodes, before any signature check.
    pub fn check_tag_order(&self) -> Result<(), RoughtimeError> {
        let num_tags = self.num_tags()?;
        let mut prev: Option<u32> = None;
        for i in 0..num_tags {
            let tag_word = num_tags
                .checked_add(i)
                .ok_or(RoughtimeError::malformed("tag count overflows"))?;
            let current = self.read_u32(tag_word)?;
            if prev.is_some_and(|p| p >= current) {
                return Err(RoughtimeError::malformed("tags not in ascending order"));
            }
            prev = Some(current);
        }
        Ok(())
    }

    /// Look up `tag` and require its value to be exactly `len` bytes.
    pub fn get_sized(&self, tag: [u8; 4], len: usize) -> Result<WordSlice<'a>, RoughtimeError> {
        let value = self.get_tag(tag)?;
        if value.bytes.len() != len {
            return Err(RoughtimeError::WrongSize {
                tag,
                expected: len,
                actual: value.bytes.len(),
            });
        }
        Ok(value)
    }

    /// Iterate over `(tag, value)` pairs in wire order.
    pub fn tags(&self) -> Result<Tags<'a>, RoughtimeError> {
        let num_tags = self.num_tags()?;
        Ok(Tags {
            message: *self,
            num_tags,
            next: 0,
        })
    }

    fn value_at(&self, i: u32, num_tags: u32) -> Result<WordSlice<'a>, RoughtimeError> {
        let start = if i == 0 { 0 } else { self.read_u32(i)? };
        let end = if i + 1 == num_tags {
            let header = 8 * u64::from(num_tags);
            u64::from(self.size())
                .checked_sub(header)
                .ok_or(RoughtimeError::malformed("header larger than message"))?
        } else {
            u64::from(self.read_u32(i + 1)?)
        };
        let start = u64::from(start);
        if start % 4 != 0 || end < start {
            return Err(RoughtimeError::malformed("inconsistent tag offsets"));
        }
        let word_offset = 2 * u64::from(num_tags) + start / 4;
        let word_offset =
            u32::try_from(word_offset).map_err(|_| RoughtimeError::malformed("offset overflows"))?;
        // end - start <= size, so it fits in u32.
        self.slice(word_offset, (end - start) as u32)
    }
}

/// Iterator returned by [`WordSlice::tags`].
#[derive(Debug)]
pub struct Tags<'a> {
    message: WordSlice<'a>,
    num_tags: u32,
    next: u32,
}

impl<'a> Tags<'a> {
    fn entry(&self, i: u32) -> Result<([u8; 4], WordSlice<'a>), RoughtimeError> {
        let tag_word = self
            .num_tags
            .checked_add(i)
            .ok_or(RoughtimeError::malformed("tag count overflows"))?;
        let tag = self.message.read_u32(tag_word)?.to_le_bytes();
        let value = self.message.value_at(i, self.num_tags)?;
        Ok((tag, value))
    }
}

impl<'a> Iterator for Tags<'a> {
    type Item = Result<([u8; 4], WordSlice<'a>), RoughtimeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.num_tags {
            return None;
        }
        let i = self.next;
        self.next += 1;
        let item = self.entry(i);
        if item.is_err() {
            self.next = self.num_tags;
        }
        Some(item)
    }
}

/// Encode `(tag, value)` pairs as a tagged message.
///
/// Tags must be strictly ascending as LE `u32` and every value must be a
/// whole number of words.
pub fn encode_message(entries: &[([u8; 4], &[u8])]) -> Result<Vec<u8>, RoughtimeError> {
    for pair in entries.windows(2) {
        if u32::from_le_bytes(pair[0].0) >= u32::from_le_bytes(pair[1].0) {
            return Err(RoughtimeError::malformed("tags not in ascending order"));
        }
    }
    if entries.iter().any(|(_, value)| value.len() % 4 != 0) {
        return Err(RoughtimeError::malformed("value length not a multiple of 4"));
    }

    let num_tags = entries.len();
    let values_len: usize = entries.iter().map(|(_, value)| value.len()).sum();
    let header_len = if num_tags == 0 { 4 } else { 8 * num_tags };
    let total = header_len + values_len;
    if u32::try_from(total).is_err() {
        return Err(RoughtimeError::malformed("message larger than 4 GiB"));
    }

    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(&(num_tags as u32).to_le_bytes());

    // Cumulative end offsets of every entry but the last.
    let mut offset = 0u32;
    for (_, value) in entries.iter().take(num_tags.saturating_sub(1)) {
        offset += value.len() as u32;
        buf.extend_from_slice(&offset.to_le_bytes());
    }
    for (tag, _) in entries {
        buf.extend_from_slice(tag);
    }
    for (_, value) in entries {
        buf.extend_from_slice(value);
    }
    Ok(buf)
}

/// Wrap a message in the `ROUGHTIM` envelope.
pub fn frame(message: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ENVELOPE_HEADER_LEN + message.len());
    buf.extend_from_slice(&ENVELOPE_MAGIC);
    buf.extend_from_slice(&(message.len() as u32).to_le_bytes());
    buf.extend_from_slice(message);
    buf
}

/// Strip the `ROUGHTIM` envelope and return the inner message.
///
/// The declared length must equal the number of bytes after the header.
pub fn unframe(packet: &[u8]) -> Result<&[u8], RoughtimeError> {
    if packet.len() < ENVELOPE_HEADER_LEN {
        return Err(RoughtimeError::malformed("packet shorter than envelope header"));
    }
    if packet[..8] != ENVELOPE_MAGIC {
        return Err(RoughtimeError::malformed("bad ROUGHTIM magic"));
    }
    let declared = u32::from_le_bytes([packet[8], packet[9], packet[10], packet[11]]);
    let body = &packet[ENVELOPE_HEADER_LEN..];
    if u64::from(declared) != body.len() as u64 {
        return Err(RoughtimeError::malformed("envelope length mismatch"));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tag;
    use alloc::vec;

    fn words(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_new_rejects_misaligned() {
        assert!(WordSlice::new(&[0; 7]).is_err());
        assert!(WordSlice::new(&[0; 8]).is_ok());
        assert!(WordSlice::new(&[]).is_ok());
    }

    #[test]
    fn test_read_u32_bounds() {
        let data = words(&[7, 9]);
        let s = WordSlice::new(&data).unwrap();
        assert_eq!(s.read_u32(1).unwrap(), 9);
        assert!(s.read_u32(2).is_err());
        // 4 * 0x4000_0000 wraps to 0 in 32 bits.
        assert!(s.read_u32(0x4000_0000).is_err());
        assert!(s.read_u32(u32::MAX).is_err());
    }

    #[test]
    fn test_read_u64_little_endian_words() {
        let data = words(&[0x0000_0002, 0x0000_0001]);
        let s = WordSlice::new(&data).unwrap();
        assert_eq!(s.read_u64(0).unwrap(), 0x1_0000_0002);
        assert!(s.read_u64(1).is_err());
    }

    #[test]
    fn test_slice_overflow_is_malformed() {
        let data = [0u8; 16];
        let s = WordSlice::new(&data).unwrap();
        assert_eq!(s.slice(1, 8).unwrap().size(), 8);
        assert!(s.slice(2, 12).is_err());
        // 4 * 0x4000_0000 + 0 == 2^32: wraps to 0 in u32 arithmetic.
        assert!(matches!(
            s.slice(0x4000_0000, 0),
            Err(RoughtimeError::Malformed { .. })
        ));
        assert!(s.slice(1, u32::MAX - 3).is_err());
        assert!(s.slice(0, 2).is_err());
    }

    #[test]
    fn test_get_tag_single_and_multiple() {
        let sig = [1u8; 64];
        let nonc = [2u8; 32];
        let cert = [3u8; 16];
        let msg = encode_message(&[(tag::SIG, &sig[..]), (tag::NONC, &nonc[..]), (tag::CERT, &cert[..])])
            .unwrap();
        let s = WordSlice::new(&msg).unwrap();
        assert_eq!(s.get_tag(tag::SIG).unwrap().as_bytes(), &sig);
        assert_eq!(s.get_tag(tag::NONC).unwrap().as_bytes(), &nonc);
        assert_eq!(s.get_tag(tag::CERT).unwrap().as_bytes(), &cert);
        assert_eq!(
            s.get_tag(tag::PATH),
            Err(RoughtimeError::TagNotFound { tag: tag::PATH })
        );
    }

    #[test]
    fn test_get_tag_empty_message() {
        let msg = encode_message(&[]).unwrap();
        assert_eq!(msg, vec![0, 0, 0, 0]);
        let s = WordSlice::new(&msg).unwrap();
        assert!(matches!(
            s.get_tag(tag::NONC),
            Err(RoughtimeError::TagNotFound { .. })
        ));
    }

    #[test]
    fn test_get_tag_count_exceeds_buffer() {
        // Claims 1000 tags but only has room for one word.
        let data = words(&[1000]);
        let s = WordSlice::new(&data).unwrap();
        assert!(matches!(
            s.get_tag(tag::NONC),
            Err(RoughtimeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_get_tag_offsets_backwards() {
        // Two tags, offset of the second entry (8) beyond the end of values (4).
        let mut data = words(&[2, 8]);
        data.extend_from_slice(&tag::SIG);
        data.extend_from_slice(&tag::NONC);
        data.extend_from_slice(&[0; 4]);
        let s = WordSlice::new(&data).unwrap();
        // NONC: start 8, end = size - 16 = 4 < start.
        assert!(matches!(
            s.get_tag(tag::NONC),
            Err(RoughtimeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_get_tag_misaligned_offset() {
        let mut data = words(&[2, 2]);
        data.extend_from_slice(&tag::SIG);
        data.extend_from_slice(&tag::NONC);
        data.extend_from_slice(&[0; 8]);
        let s = WordSlice::new(&data).unwrap();
        assert!(matches!(
            s.get_tag(tag::NONC),
            Err(RoughtimeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_check_tag_order() {
        let mut data = words(&[2, 4]);
        data.extend_from_slice(&tag::NONC);
        data.extend_from_slice(&tag::SIG);
        data.extend_from_slice(&[0; 8]);
        let s = WordSlice::new(&data).unwrap();
        // Lookup still works; only the order check objects.
        assert!(s.get_tag(tag::SIG).is_ok());
        assert!(matches!(
            s.check_tag_order(),
            Err(RoughtimeError::Malformed { .. })
        ));

        let mut dup = words(&[2, 4]);
        dup.extend_from_slice(&tag::NONC);
        dup.extend_from_slice(&tag::NONC);
        dup.extend_from_slice(&[0; 8]);
        assert!(WordSlice::new(&dup).unwrap().check_tag_order().is_err());

        let sorted =
            encode_message(&[(tag::SIG, &[0u8; 4][..]), (tag::NONC, &[0u8; 4][..])]).unwrap();
        assert_eq!(WordSlice::new(&sorted).unwrap().check_tag_order(), Ok(()));
        assert_eq!(WordSlice::new(&words(&[0])).unwrap().check_tag_order(), Ok(()));
    }

    #[test]
    fn test_get_sized() {
        let msg = encode_message(&[(tag::RADI, &[0u8; 4][..])]).unwrap();
        let s = WordSlice::new(&msg).unwrap();
        assert!(s.get_sized(tag::RADI, 4).is_ok());
        assert_eq!(
            s.get_sized(tag::RADI, 8),
            Err(RoughtimeError::WrongSize {
                tag: tag::RADI,
                expected: 8,
                actual: 4
            })
        );
    }

    #[test]
    fn test_encode_rejects_unsorted_and_unaligned() {
        assert!(encode_message(&[(tag::NONC, &[0u8; 4][..]), (tag::SIG, &[0u8; 4][..])]).is_err());
        assert!(encode_message(&[(tag::NONC, &[0u8; 4][..]), (tag::NONC, &[0u8; 4][..])]).is_err());
        assert!(encode_message(&[(tag::NONC, &[0u8; 3][..])]).is_err());
    }

    #[test]
    fn test_tags_roundtrip_is_byte_identical() {
        let inner = encode_message(&[(tag::PUBK, &[9u8; 32][..]), (tag::MINT, &[1u8; 8][..])]).unwrap();
        let msg = encode_message(&[(tag::SIG, &[4u8; 64][..]), (tag::DELE, &inner[..])]).unwrap();
        let s = WordSlice::new(&msg).unwrap();
        let pairs: Vec<_> = s.tags().unwrap().map(|r| r.unwrap()).collect();
        let entries: Vec<([u8; 4], &[u8])> =
            pairs.iter().map(|(t, v)| (*t, v.as_bytes())).collect();
        assert_eq!(encode_message(&entries).unwrap(), msg);
    }

    #[test]
    fn test_nested_lookup() {
        let inner = encode_message(&[(tag::NONC, &[42u8; 32][..])]).unwrap();
        let msg = encode_message(&[(tag::CERT, &inner[..])]).unwrap();
        let outer = WordSlice::new(&msg).unwrap();
        let nested = outer.get_tag(tag::CERT).unwrap();
        assert_eq!(nested.get_tag(tag::NONC).unwrap().as_bytes(), &[42u8; 32]);
    }

    #[test]
    fn test_envelope_roundtrip() {
        let msg = [1u8, 2, 3, 4];
        let packet = frame(&msg);
        assert_eq!(&packet[..8], b"ROUGHTIM");
        assert_eq!(unframe(&packet).unwrap(), &msg);
    }

    #[test]
    fn test_unframe_errors() {
        assert!(unframe(&[0; 4]).is_err());
        let mut packet = frame(&[0; 8]);
        packet[0] = b'X';
        assert_eq!(
            unframe(&packet),
            Err(RoughtimeError::malformed("bad ROUGHTIM magic"))
        );
        let mut packet = frame(&[0; 8]);
        packet.extend_from_slice(&[0; 4]);
        assert_eq!(
            unframe(&packet),
            Err(RoughtimeError::malformed("envelope length mismatch"))
        );
    }
}
