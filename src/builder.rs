//! The prefix doubling driver.
//!
//! The driver turns a set of kmers into path nodes whose labels are unique.
//! Each round fuses every unsorted path node with the path nodes starting
//! where it ends, doubling the effective label length, until the label
//! ranges no longer overlap or the rank sequences are full. Afterwards the
//! nodes are annotated with their degrees in the path graph.

use crate::internal::{PriorityQueue, ReadBuffer, SLArray, ValueIndex};
use crate::lcp::LCP;
use crate::path_node::PathNode;
use crate::support::{Alphabet, KMer, Key, unique_keys};

use simple_sds::int_vector::IntVector;
use simple_sds::ops::{Vector, Access, Push};
use simple_sds::bits;

use rayon::prelude::*;

use std::cmp::Ordering;
use std::path::Path;
use std::io;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Number of doubling rounds. Path node labels can reach
/// `1 << DOUBLING_STEPS` ranks.
pub const DOUBLING_STEPS: usize = 3;

//-----------------------------------------------------------------------------

/// The result of the construction: path nodes with unique labels and the
/// structures the index builder consumes.
///
/// # Examples
///
/// ```
/// use gcsa::support::{Alphabet, KMer};
/// use gcsa::builder;
///
/// let alpha = Alphabet::new();
/// // The circular sequence "CA$" as 2-mers.
/// let lines = ["CA 0:0 $ $ 1:0", "A$ 1:0 C C 2:0", "$C 2:0 A A 0:0"];
/// let mut kmers = Vec::new();
/// for line in lines.iter() {
///     let tokens: Vec<&str> = line.split_whitespace().collect();
///     kmers.push(KMer::new(&tokens, &alpha, 4).unwrap());
/// }
///
/// let graph = builder::build(&mut kmers, 2, &alpha);
/// assert_eq!(graph.paths.len(), kmers.len());
/// assert!(graph.fully_sorted());
/// assert_eq!(graph.order, 1);
/// ```
#[derive(Clone, Debug)]
pub struct PathGraph {
    /// Path nodes with their `to` fields repurposed as degree counters.
    pub paths: Vec<PathNode>,
    /// LCP support over the unique keys.
    pub lcp: LCP,
    /// Last character of each unique key.
    pub last_char: IntVector,
    /// Alphabet of the path graph, with counts from the edges.
    pub alphabet: Alphabet,
    /// Label lcps between adjacent path nodes, or empty if some label
    /// ranges still overlap.
    pub path_lcps: IntVector,
    /// Largest order among the path nodes.
    pub order: usize,
}

impl PathGraph {
    /// Returns the number of path nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if there are no path nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the label of every path node is unique.
    pub fn fully_sorted(&self) -> bool {
        self.paths.iter().all(|path| path.sorted())
    }
}

//-----------------------------------------------------------------------------

/// Builds the path graph for the given kmers.
///
/// The kmers are sorted and their labels are replaced with ranks; the path
/// nodes are then doubled until their labels are unique or the rank
/// sequences are full, and annotated with their degrees. See [`PathGraph`]
/// for the result.
pub fn build(kmers: &mut Vec<KMer>, kmer_length: usize, alpha: &Alphabet) -> PathGraph {
    let (keys, last_char) = unique_keys(kmers);
    let lcp = LCP::new(&keys, kmer_length);

    let mut paths: Vec<PathNode> = kmers.iter().map(PathNode::from_kmer).collect();
    let order = prefix_doubling(&mut paths);
    let alphabet = generate_edges(&mut paths, kmers, &keys, &last_char, kmer_length, alpha);

    // Nodes at the order cap may still overlap; the label lcps are only
    // meaningful when they do not.
    let distinct = paths.windows(2).all(|pair| !pair[0].intersect(&pair[1]));
    let path_lcps = if distinct {
        path_label_lcps(&paths, &lcp)
    } else {
        IntVector::new(1).unwrap()
    };

    PathGraph {
        paths,
        lcp,
        last_char,
        alphabet,
        path_lcps,
        order,
    }
}

//-----------------------------------------------------------------------------

/// Doubles the path nodes until their labels are unique or the rank
/// sequences are full.
///
/// Returns the largest order among the nodes.
pub fn prefix_doubling(paths: &mut Vec<PathNode>) -> usize {
    // Nodes that are unique from the start need no doubling.
    paths.par_sort_unstable_by(|a, b| a.compare(b));
    mark_sorted(paths);

    for _ in 0..DOUBLING_STEPS {
        if paths.iter().all(|path| path.sorted()) {
            break;
        }
        double(paths);
    }

    paths.iter().map(|path| path.order()).max().unwrap_or(0)
}

// One doubling round: fuse every unsorted node with its successor nodes,
// then re-sort and mark the nodes whose label ranges became unique.
fn double(paths: &mut Vec<PathNode>) {
    paths.par_sort_unstable_by_key(|path| path.from);
    let index = ValueIndex::new(&paths[..], |path: &PathNode| path.from as usize);

    let mut next: Vec<PathNode> = Vec::with_capacity(paths.len());
    for i in 0..paths.len() {
        let path = paths[i];
        if path.sorted() {
            next.push(path);
            continue;
        }
        // All successors of the path, as long as the fused node fits.
        let mut j = index.find(path.to as usize);
        let mut extended = false;
        while j < paths.len() && paths[j].from == path.to {
            if path.order() + paths[j].order() <= PathNode::LABEL_LENGTH {
                next.push(PathNode::fuse(&path, &paths[j]));
                extended = true;
            }
            j += 1;
        }
        // Left for the next phase on capacity overflow or a missing
        // successor.
        if !extended {
            next.push(path);
        }
    }

    next.par_sort_unstable_by(|a, b| a.compare(b));
    mark_sorted(&mut next);
    *paths = next;
}

// Marks the nodes whose label range does not overlap any other range.
// The nodes must be sorted by their first labels: ranges are intervals, so
// any overlap shows up between neighbors.
fn mark_sorted(paths: &mut [PathNode]) {
    let mut overlapping: Vec<bool> = vec![false; paths.len()];
    for i in 1..paths.len() {
        if paths[i - 1].intersect(&paths[i]) {
            overlapping[i - 1] = true;
            overlapping[i] = true;
        }
    }
    for (path, overlaps) in paths.iter_mut().zip(overlapping) {
        if !overlaps {
            path.make_sorted();
        }
    }
}

//-----------------------------------------------------------------------------

/// Counts the degrees of the path nodes and derives the alphabet of the
/// path graph.
///
/// The kmers are the edges of the graph. An edge starts at the path nodes
/// whose leading rank is the kmer's rank at the kmer's source position,
/// and ends at the path nodes at the destination whose labels continue
/// the kmer. Matching the origins by the leading rank matters: near a
/// branch, several path nodes with distinct labels share a source
/// position, and each kmer belongs to only one of them. A terminal record
/// has no destination and contributes no edges.
///
/// The edges are also tallied by kmer rank and folded through the last
/// characters into comp value counts, giving the alphabet of the final
/// index.
///
/// After this, the `to` fields of the path nodes hold degrees instead of
/// positions.
pub fn generate_edges(paths: &mut [PathNode], kmers: &[KMer], keys: &[u64], last_char: &IntVector, kmer_length: usize, alpha: &Alphabet) -> Alphabet {
    paths.par_sort_unstable_by_key(|path| path.from);
    let index = ValueIndex::new(paths, |path: &PathNode| path.from as usize);
    for path in paths.iter_mut() {
        path.init_degree();
    }

    let mut rank_edges = SLArray::new(last_char.len());
    for kmer in kmers.iter() {
        let rank = Key::label(kmer.key) as usize;

        // The path nodes this kmer starts.
        let origin_start = index.find(kmer.from as usize);
        let mut origins = 0;
        let mut j = origin_start;
        while j < paths.len() && paths[j].from == kmer.from {
            if paths[j].first_label()[0] as usize == rank {
                origins += 1;
            }
            j += 1;
        }

        // The path nodes at the destination that accept the edge.
        let mut targets = 0;
        let mut j = index.find(kmer.to as usize);
        while j < paths.len() && paths[j].from == kmer.to {
            if continues(keys, rank, paths[j].first_label()[0] as usize, kmer_length) {
                for _ in 0..origins {
                    paths[j].increment_indegree();
                }
                targets += 1;
            }
            j += 1;
        }

        let mut j = origin_start;
        while j < paths.len() && paths[j].from == kmer.from {
            if paths[j].first_label()[0] as usize == rank {
                for _ in 0..targets {
                    paths[j].increment_outdegree();
                    rank_edges.increment(rank);
                }
            }
            j += 1;
        }
    }

    let mut counts: Vec<u64> = vec![0; alpha.sigma()];
    for rank in 0..rank_edges.len() {
        counts[last_char.get(rank) as usize] += rank_edges.get(rank) as u64;
    }

    // Back to label order for the downstream consumers.
    paths.par_sort_unstable_by(|a, b| a.compare(b));
    Alphabet::from_counts(&counts, alpha.char2comp().to_vec(), alpha.comp2char().to_vec())
}

// A path node accepts an edge from a kmer if the label of the node's first
// kmer continues the label of the edge's kmer: the last k - 1 characters
// of one are the first k - 1 characters of the other.
fn continues(keys: &[u64], from_rank: usize, to_rank: usize, kmer_length: usize) -> bool {
    let mask = (1u64 << (Key::CHAR_WIDTH * (kmer_length - 1))) - 1;
    (Key::label(keys[from_rank]) & mask) == (Key::label(keys[to_rank]) >> Key::CHAR_WIDTH)
}

//-----------------------------------------------------------------------------

/// Returns the label lcps between adjacent path nodes, in characters.
///
/// The nodes must be sorted by their first labels with no overlapping
/// ranges. Position `0` is `0`; position `i > 0` is the lcp of the labels
/// at the boundary between nodes `i - 1` and `i`. This is the input for
/// suffix tree support in the final index.
pub fn path_label_lcps(paths: &[PathNode], lcp: &LCP) -> IntVector {
    let width = bits::bit_len((PathNode::LABEL_LENGTH * lcp.kmer_length()) as u64);
    let mut result = IntVector::with_capacity(paths.len(), width).unwrap();
    if paths.is_empty() {
        return result;
    }
    result.push(0);
    for i in 1..paths.len() {
        let (order_lcp, char_lcp) = lcp.min_lcp(&paths[i - 1], &paths[i]);
        result.push((order_lcp * lcp.kmer_length() + char_lcp) as u64);
    }
    result
}

//-----------------------------------------------------------------------------

// The head of a path node file in the merge: ordered by first labels, with
// the file number breaking ties.
#[derive(Copy, Clone, Debug)]
struct MergeHead {
    node: PathNode,
    source: usize,
}

impl PartialEq for MergeHead {
    fn eq(&self, another: &Self) -> bool {
        self.cmp(another) == Ordering::Equal
    }
}

impl Eq for MergeHead {}

impl PartialOrd for MergeHead {
    fn partial_cmp(&self, another: &Self) -> Option<Ordering> {
        Some(self.cmp(another))
    }
}

impl Ord for MergeHead {
    fn cmp(&self, another: &Self) -> Ordering {
        self.node.compare(&another.node).then(self.source.cmp(&another.source))
    }
}

/// Merges files of path nodes sorted by their first labels.
///
/// Construction jobs that spill doubling rounds to disk produce one sorted
/// file per job; this reads them back through bounded windows and merges
/// them into a single sorted vector.
///
/// # Errors
///
/// Propagates the usual [`ReadBuffer`] failures: unopenable files, files
/// that do not consist of path node records, and reads past a premature
/// end of file.
pub fn merge_path_files<P: AsRef<Path>>(filenames: &[P]) -> io::Result<Vec<PathNode>> {
    let mut inputs: Vec<ReadBuffer<PathNode>> = Vec::with_capacity(filenames.len());
    let mut positions: Vec<usize> = vec![0; filenames.len()];
    let mut heads: Vec<MergeHead> = Vec::new();
    for (source, filename) in filenames.iter().enumerate() {
        let mut buffer: ReadBuffer<PathNode> = ReadBuffer::new();
        buffer.init(filename)?;
        if !buffer.is_empty() {
            let node = buffer.get(0)?;
            positions[source] = 1;
            heads.push(MergeHead {
                node,
                source,
            });
        }
        inputs.push(buffer);
    }

    let total: usize = inputs.iter().map(|input| input.len()).sum();
    let mut result: Vec<PathNode> = Vec::with_capacity(total);
    let mut queue = PriorityQueue::from(heads);
    queue.heapify();
    while !queue.is_empty() {
        let source = queue[0].source;
        result.push(queue[0].node);
        if positions[source] < inputs[source].len() {
            let node = inputs[source].get(positions[source])?;
            positions[source] += 1;
            queue[0] = MergeHead {
                node,
                source,
            };
            queue.down(0);
        } else {
            let _ = queue.pop();
        }
    }
    Ok(result)
}

//-----------------------------------------------------------------------------
