// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CRC32 over sequence bytes.
//!
//! The checksum is the standard CRC-32 (reflected IEEE polynomial
//! 0xEDB88320, XOR-out 0xFFFFFFFF) as used by zlib and PNG. `crc32fast`
//! selects a hardware-accelerated path at runtime when the CPU advertises
//! one and falls back to a portable table implementation; both produce
//! bit-identical output, which is exactly the contract callers rely on.
//!
//! Checksums are computed over the validated sequence bytes (after
//! whitespace stripping, before 2-bit packing).

use crc32fast::Hasher;

/// One-shot CRC32 of a byte span.
#[inline]
#[must_use]
pub fn crc32(data: &[u8]) -> u32 { crc32fast::hash(data) }

/// Streaming CRC32 for callers that hash while writing.
#[derive(Debug, Default, Clone)]
pub struct Crc32 {
    hasher: Hasher,
}

impl Crc32 {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    pub fn update(&mut self, data: &[u8]) { self.hasher.update(data); }

    #[must_use]
    pub fn finalize(self) -> u32 { self.hasher.finalize() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_check_vector() {
        // CRC-32/ISO-HDLC check value.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn empty_input() {
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn streaming_matches_one_shot() {
        let data = b"ACGTACGTACGTACGTNNNNACGT";
        let mut streaming = Crc32::new();
        streaming.update(&data[..7]);
        streaming.update(&data[7..]);
        assert_eq!(streaming.finalize(), crc32(data));
    }

    #[test]
    fn checksum_is_over_bases_not_payload() {
        // Different byte spans, different CRCs; the pipeline hashes the
        // textual bases, never the packed payload.
        let bases = b"ACGT";
        let payload = crate::nucleotide::encode(bases);
        assert_ne!(crc32(bases), crc32(&payload));
    }
}
