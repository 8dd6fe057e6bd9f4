//! LCP support over the sorted unique keys.
//!
//! The structure stores the longest common prefixes of lexicographically
//! adjacent kmers and answers constant-time range minimum queries over them.
//! The doubling driver uses it for comparing the label ranges of path nodes
//! one character at a time.

use crate::path_node::PathNode;
use crate::support::Key;

use simple_sds::int_vector::IntVector;
use simple_sds::ops::{Vector, Access, Push};
use simple_sds::serialize::Serialize;
use simple_sds::bits;

use std::io::{Error, ErrorKind};
use std::{cmp, io};


//-----------------------------------------------------------------------------

/// A constant-time range minimum structure over a packed integer vector.
///
/// The structure stores minima over windows of every power-of-two length.
/// A query takes the minimum over two overlapping windows covering the
/// range. Row 0 is a copy of the source vector, so queries do not need it.
///
/// # Examples
///
/// ```
/// use gcsa::lcp::RangeMinimum;
/// use simple_sds::int_vector::IntVector;
/// use simple_sds::ops::Push;
///
/// let mut values = IntVector::new(4).unwrap();
/// for value in [3u64, 1, 4, 1, 5, 9, 2, 6] {
///     values.push(value);
/// }
/// let rmq = RangeMinimum::new(&values);
/// assert_eq!(rmq.query(0, 3), 1);
/// assert_eq!(rmq.query(4, 6), 2);
/// assert_eq!(rmq.query(5, 5), 9);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeMinimum {
    // rows[k][i] is the minimum over the window of length 1 << k at i.
    rows: Vec<IntVector>,
}

impl RangeMinimum {
    /// Builds the structure for the given values.
    pub fn new(values: &IntVector) -> RangeMinimum {
        let mut rows: Vec<IntVector> = vec![values.clone()];
        let mut span = 1;
        while 2 * span <= values.len() {
            let prev = &rows[rows.len() - 1];
            let mut row = IntVector::with_capacity(values.len() - 2 * span + 1, values.width()).unwrap();
            for i in 0..values.len() - 2 * span + 1 {
                row.push(cmp::min(prev.get(i), prev.get(i + span)));
            }
            rows.push(row);
            span *= 2;
        }
        RangeMinimum {
            rows,
        }
    }

    /// Returns the length of the source vector.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows[0].len()
    }

    /// Returns `true` if the source vector was empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the minimum value in the closed range `start..=limit`.
    ///
    /// # Panics
    ///
    /// May panic if `start > limit` or `limit >= self.len()`.
    pub fn query(&self, start: usize, limit: usize) -> u64 {
        debug_assert!(start <= limit && limit < self.len(), "RangeMinimum: Invalid range {}..={}", start, limit);
        let level = (bits::bit_len((limit - start + 1) as u64) - 1) as usize;
        if level == 0 {
            return self.rows[0].get(start);
        }
        let span = 1 << level;
        cmp::min(self.rows[level].get(start), self.rows[level].get(limit + 1 - span))
    }
}

impl Serialize for RangeMinimum {
    fn serialize_header<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.rows.len().serialize(writer)?;
        Ok(())
    }

    fn serialize_body<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        for row in self.rows.iter() {
            row.serialize(writer)?;
        }
        Ok(())
    }

    fn load<T: io::Read>(reader: &mut T) -> io::Result<Self> {
        let row_count = usize::load(reader)?;
        if row_count == 0 {
            return Err(Error::new(ErrorKind::InvalidData, "RangeMinimum: No rows"));
        }
        let mut rows: Vec<IntVector> = Vec::with_capacity(row_count);
        for _ in 0..row_count {
            rows.push(IntVector::load(reader)?);
        }
        Ok(RangeMinimum {
            rows,
        })
    }

    fn size_in_elements(&self) -> usize {
        let mut result = self.rows.len().size_in_elements();
        for row in self.rows.iter() {
            result += row.size_in_elements();
        }
        result
    }
}

//-----------------------------------------------------------------------------

/// LCP support over the unique keys of a fixed kmer length.
///
/// For unique keys in sorted order, `kmer_lcp[0] == 0` and `kmer_lcp[i]` for
/// `i > 0` is the longest common prefix of the labels of keys `i - 1` and
/// `i`, in characters. The structure compares the label ranges of path
/// nodes: an lcp value is a pair `(a, b)`, where `a` is the lcp of the rank
/// sequences and `b` is the character lcp of the first diverging kmers.
///
/// # Examples
///
/// ```
/// use gcsa::lcp::LCP;
/// use gcsa::support::{Alphabet, Key};
///
/// let alpha = Alphabet::new();
/// let keys: Vec<u64> = ["AAA", "AAT", "ACG"].iter()
///     .map(|kmer| Key::encode(&alpha, kmer, 0, 0))
///     .collect();
/// let lcp = LCP::new(&keys, 3);
///
/// assert_eq!(lcp.total_keys(), 3);
/// assert_eq!(lcp.kmer_lcp(1), 2);
/// assert_eq!(lcp.kmer_lcp(2), 1);
/// assert_eq!(lcp.extend_range((1, 1), 2), (0, 1));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LCP {
    kmer_length: usize,
    total_keys: usize,
    kmer_lcp: IntVector,
    rmq: RangeMinimum,
}

impl LCP {
    /// Builds the LCP support from unique keys in sorted order.
    pub fn new(keys: &[u64], kmer_length: usize) -> LCP {
        let mut kmer_lcp = IntVector::with_capacity(keys.len(), bits::bit_len(kmer_length as u64)).unwrap();
        if !keys.is_empty() {
            kmer_lcp.push(0);
            for i in 1..keys.len() {
                kmer_lcp.push(Key::lcp(keys[i - 1], keys[i], kmer_length) as u64);
            }
        }
        let rmq = RangeMinimum::new(&kmer_lcp);
        LCP {
            kmer_length,
            total_keys: keys.len(),
            kmer_lcp,
            rmq,
        }
    }

    /// Returns the kmer length.
    #[inline]
    pub fn kmer_length(&self) -> usize {
        self.kmer_length
    }

    /// Returns the number of unique keys.
    #[inline]
    pub fn total_keys(&self) -> usize {
        self.total_keys
    }

    /// Returns the lcp of the labels of keys `i - 1` and `i` in characters.
    ///
    /// # Panics
    ///
    /// May panic if `i >= self.total_keys()`.
    #[inline]
    pub fn kmer_lcp(&self, i: usize) -> usize {
        self.kmer_lcp.get(i) as usize
    }

    /// Returns the minimal lcp of the path labels covered by nodes `a`
    /// and `b`.
    ///
    /// `a` must come before `b` in lexicographic order, and the label
    /// ranges must not overlap.
    pub fn min_lcp(&self, a: &PathNode, b: &PathNode) -> (usize, usize) {
        debug_assert!(!a.intersect(b), "LCP: The label ranges of {} and {} overlap", a, b);
        let order_lcp = a.min_lcp(b);
        let mut char_lcp = 0;
        if order_lcp < cmp::min(a.order(), b.order()) {
            let left = a.last_label()[order_lcp] as usize;
            let right = b.first_label()[order_lcp] as usize;
            char_lcp = self.rmq.query(cmp::min(left, right) + 1, cmp::max(left, right)) as usize;
        }
        (order_lcp, char_lcp)
    }

    /// Returns the maximal lcp of the path labels covered by nodes `a`
    /// and `b`.
    ///
    /// `a` must come before `b` in lexicographic order, and the label
    /// ranges must not overlap.
    pub fn max_lcp(&self, a: &PathNode, b: &PathNode) -> (usize, usize) {
        debug_assert!(!a.intersect(b), "LCP: The label ranges of {} and {} overlap", a, b);
        let order_lcp = a.max_lcp(b);
        let mut char_lcp = 0;
        if order_lcp < cmp::min(a.order(), b.order()) {
            let left = a.first_label()[order_lcp] as usize;
            let right = b.last_label()[order_lcp] as usize;
            char_lcp = self.rmq.query(cmp::min(left, right) + 1, cmp::max(left, right)) as usize;
        }
        (order_lcp, char_lcp)
    }

    /// Advances the lcp by one character, carrying into the rank lcp at
    /// kmer boundaries.
    #[inline]
    pub fn increment(&self, lcp: (usize, usize)) -> (usize, usize) {
        if lcp.1 + 1 < self.kmer_length {
            (lcp.0, lcp.1 + 1)
        } else {
            (lcp.0 + 1, 0)
        }
    }

    /// Extends the closed rank range into a maximal range where adjacent
    /// keys share an lcp of at least `lcp` characters.
    pub fn extend_range(&self, range: (usize, usize), lcp: usize) -> (usize, usize) {
        let (mut start, mut limit) = range;
        while start > 0 && self.kmer_lcp.get(start) as usize >= lcp {
            start -= 1;
        }
        while limit + 1 < self.total_keys && self.kmer_lcp.get(limit + 1) as usize >= lcp {
            limit += 1;
        }
        (start, limit)
    }
}

impl Serialize for LCP {
    fn serialize_header<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.kmer_length.serialize(writer)?;
        self.total_keys.serialize(writer)?;
        Ok(())
    }

    fn serialize_body<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.kmer_lcp.serialize(writer)?;
        self.rmq.serialize(writer)?;
        Ok(())
    }

    fn load<T: io::Read>(reader: &mut T) -> io::Result<Self> {
        let kmer_length = usize::load(reader)?;
        let total_keys = usize::load(reader)?;
        let kmer_lcp = IntVector::load(reader)?;
        let rmq = RangeMinimum::load(reader)?;
        if kmer_lcp.len() != total_keys {
            return Err(Error::new(ErrorKind::InvalidData, "LCP: Packed vector length does not match the number of keys"));
        }
        if rmq.len() != total_keys {
            return Err(Error::new(ErrorKind::InvalidData, "LCP: Range minimum length does not match the number of keys"));
        }
        Ok(LCP {
            kmer_length,
            total_keys,
            kmer_lcp,
            rmq,
        })
    }

    fn size_in_elements(&self) -> usize {
        self.kmer_length.size_in_elements() + self.total_keys.size_in_elements()
            + self.kmer_lcp.size_in_elements() + self.rmq.size_in_elements()
    }
}

//-----------------------------------------------------------------------------
