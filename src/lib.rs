//! # GCSA construction
//!
//! This is a Rust implementation of the construction primitives of the
//! [GCSA2](https://github.com/jltsiren/gcsa2) index: a generalized
//! compressed suffix array for labeled graphs, such as genome variation
//! graphs. It is based on the [Simple-SDS](https://github.com/jltsiren/simple-sds)
//! library.
//!
//! The crate covers the path-doubling pipeline: input kmers annotated with
//! predecessor and successor characters are deduplicated, ranked, and
//! repeatedly fused into longer paths until every path label is unique.
//! The result is the set of path nodes, their degrees in the path graph,
//! and the LCP support the final succinct index is built from. The index
//! itself and queries over it are outside the scope of this crate.
//!
//! # References
//!
//! Jouni Sirén: **Indexing Variation Graphs**.\
//! Proceedings of ALENEX 2017, SIAM, pages 13-27, 2017.
//! DOI: [10.1137/1.9781611974768.2](https://doi.org/10.1137/1.9781611974768.2)
//!
//! # Notes
//!
//! * Kmers are limited to length 16 over an alphabet of at most 8 comp
//!   values, so that a kmer with its context sets packs into 64 bits.
//! * Construction is a batch job: it either completes or fails with a
//!   descriptive error, and partial outputs are never valid.

pub mod builder;
pub mod internal;
pub mod lcp;
pub mod path_node;
pub mod support;

//-----------------------------------------------------------------------------

pub use crate::builder::PathGraph;
pub use crate::lcp::LCP;
pub use crate::path_node::PathNode;
pub use crate::support::{Alphabet, KMer, Key, Node};

//-----------------------------------------------------------------------------

/// Comp value `0` is reserved for the string terminator.
pub const ENDMARKER: u8 = 0;

//-----------------------------------------------------------------------------
