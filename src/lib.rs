//! WARC (ISO 28500) web archive file reading, writing, and capture indexing.

#![warn(missing_docs)]
pub mod compress;
pub mod error;
pub mod header;
pub mod http;
pub mod io;
mod nomutil;
pub mod string;
pub mod stringutil;
pub mod uuid;
pub mod warc;
