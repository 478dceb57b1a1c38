//! Reversible text <-> integer encodings built on a `FrequencyModel`.
//!
//! - `sequence`: text to rank sequence and back
//! - `bits`: bit-addressable FIFO buffer
//! - `huffman`: static canonical Huffman code over ranks
//! - `packed`: self-describing byte container for rank sequences

pub mod bits;
pub mod huffman;
pub mod packed;
pub mod sequence;

pub use bits::BitBuffer;
pub use huffman::HuffmanCode;
pub use packed::{compress, decompress, pack, unpack};
pub use sequence::{decode, encode, rank_histogram};
