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

//! Nucleotide codec and integrity primitives.
//!
//! - [`nucleotide`]: pack sequences four bases per byte, MSB-first
//! - [`checksum`]: CRC-32 (IEEE, reflected) over validated sequence bytes
//! - [`validate`]: alphabet check over `{A, C, G, T, N}`
//!
//! Everything in this crate is pure computation: no I/O, no shared state,
//! safe to call from any number of threads on disjoint inputs.

pub mod checksum;
pub mod nucleotide;
pub mod validate;

pub use checksum::{Crc32, crc32};
pub use nucleotide::{decode, encode, packed_len};
pub use validate::{InvalidByte, validate};
