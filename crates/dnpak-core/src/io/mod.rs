//! Small I/O adapters shared by the reader and writer.

mod counting;

pub use counting::CountingWriter;
