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

//! Alphabet validation.
//!
//! A sequence is valid when every byte is one of `{A, C, G, T, N}`
//! (upper-case ASCII). The hot path scans 16-byte blocks with a branch-free
//! table fold the compiler can vectorise; the byte-by-byte scan is the
//! reference semantics and locates the offending byte once a block fails.
//! The workspace forbids `unsafe`, so no explicit intrinsics here.

const BLOCK: usize = 16;

const VALID: [bool; 256] = {
    let mut table = [false; 256];
    table[b'A' as usize] = true;
    table[b'C' as usize] = true;
    table[b'G' as usize] = true;
    table[b'T' as usize] = true;
    table[b'N' as usize] = true;
    table
};

/// First byte of a sequence that is not a valid nucleotide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid nucleotide byte 0x{byte:02X} at position {position}")]
pub struct InvalidByte {
    pub byte:     u8,
    pub position: usize,
}

/// Checks that every byte of `seq` is in the nucleotide alphabet.
///
/// Returns the first offending byte and its position otherwise.
#[inline]
pub fn validate(seq: &[u8]) -> Result<(), InvalidByte> {
    let mut chunks = seq.chunks_exact(BLOCK);
    let mut offset = 0;
    for chunk in &mut chunks {
        let mut ok = true;
        for &byte in chunk {
            ok &= VALID[byte as usize];
        }
        if !ok {
            return scan(chunk, offset);
        }
        offset += BLOCK;
    }
    scan(chunks.remainder(), offset)
}

/// Reference byte-by-byte scan; the chunked fast path must agree with it.
fn scan(bytes: &[u8], offset: usize) -> Result<(), InvalidByte> {
    match bytes.iter().position(|&b| !VALID[b as usize]) {
        None => Ok(()),
        Some(i) => Err(InvalidByte {
            byte:     bytes[i],
            position: offset + i,
        }),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn accepts_full_alphabet() {
        assert_eq!(validate(b"ACGTN"), Ok(()));
        assert_eq!(validate(b""), Ok(()));
        assert_eq!(validate(&b"ACGTN".repeat(100)), Ok(()));
    }

    #[test_case(b"ATCGX", b'X', 4; "trailing invalid")]
    #[test_case(b"xACGT", b'x', 0; "lower case rejected")]
    #[test_case(b"ACG TACG", b' ', 3; "whitespace rejected")]
    #[test_case(b"ACGU", b'U', 3; "rna base rejected")]
    fn reports_first_offender(seq: &[u8], byte: u8, position: usize) {
        assert_eq!(validate(seq), Err(InvalidByte { byte, position }));
    }

    #[test]
    fn first_of_several_offenders_wins() {
        let seq = b"ACGTACGTACGTACGTAC?TAC!T";
        assert_eq!(
            validate(seq),
            Err(InvalidByte {
                byte:     b'?',
                position: 18,
            })
        );
    }

    #[test]
    fn chunked_path_agrees_with_reference_at_every_block_position() {
        // Place a single invalid byte at each offset of a 3-block buffer so
        // both the fast path and the remainder path are exercised.
        for position in 0..(3 * BLOCK + 5) {
            let mut seq = b"ACGTN".repeat(16);
            seq.truncate(3 * BLOCK + 5);
            seq[position] = b'Z';
            let chunked = validate(&seq);
            let reference = scan(&seq, 0);
            assert_eq!(chunked, reference, "divergence at position {position}");
            assert_eq!(
                chunked,
                Err(InvalidByte {
                    byte:     b'Z',
                    position,
                })
            );
        }
    }
}
