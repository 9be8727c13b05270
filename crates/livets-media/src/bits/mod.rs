//! Byte-level reading and bit-level writing primitives.
//!
//! Every decoder in this crate reads through [`ByteReader`] and every
//! bit-packed header (ADTS, PES timestamps, PCR, PSI sections) is produced
//! through [`BitWriter`].

mod reader;
mod writer;

pub use reader::ByteReader;
pub use writer::BitWriter;
