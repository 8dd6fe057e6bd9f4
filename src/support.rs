//! Support structures for GCSA construction: the alphabet, key and node
//! encodings, input kmers, and the unique keys pass.

use simple_sds::int_vector::IntVector;
use simple_sds::ops::Push;
use simple_sds::serialize::{Serialize, Serializable};

use rayon::prelude::*;

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::io::{Error, ErrorKind};
use std::io;


//-----------------------------------------------------------------------------

/// Mapping between raw byte symbols and a compact alphabet of comp values.
///
/// Comp value `0` is reserved for the string terminator.
/// The alphabet also stores a cumulative count vector: `cumulative(i)` is the
/// number of symbol occurrences with comp values below `i`.
/// Key encoding ([`Key`]) supports at most [`Key::MAX_SIGMA`] comp values,
/// but the alphabet itself does not enforce this.
///
/// # Examples
///
/// ```
/// use gcsa::support::Alphabet;
///
/// let alpha = Alphabet::from_sequence(b"GATTACA$",
///     Alphabet::default_char2comp(), Alphabet::DEFAULT_COMP2CHAR.to_vec());
/// assert_eq!(alpha.sigma(), 6);
/// assert_eq!(alpha.char_to_comp(b'C'), 2);
/// assert_eq!(alpha.comp_to_char(4), b'T');
///
/// // One '$', three 'A's, and one 'C' precede comp value 3.
/// assert_eq!(alpha.cumulative(3), 5);
/// assert_eq!(alpha.total(), 8);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alphabet {
    char2comp: Vec<u8>,
    comp2char: Vec<u8>,
    cumulative: Vec<u64>,
}

impl Alphabet {
    /// Number of possible byte values.
    pub const MAX_CHARS: usize = 256;

    /// The default alphabet: terminator, the DNA bases, and `N`.
    pub const DEFAULT_COMP2CHAR: [u8; 6] = *b"$ACGTN";

    /// Returns the `char2comp` table corresponding to [`Self::DEFAULT_COMP2CHAR`].
    ///
    /// Upper and lower case bases map to the same comp values.
    /// Bytes outside the alphabet map to the terminator.
    pub fn default_char2comp() -> Vec<u8> {
        let mut result: Vec<u8> = vec![0; Self::MAX_CHARS];
        for (comp, c) in Self::DEFAULT_COMP2CHAR.iter().enumerate() {
            result[*c as usize] = comp as u8;
            result[c.to_ascii_lowercase() as usize] = comp as u8;
        }
        result
    }

    /// Creates the default alphabet with all counts set to zero.
    pub fn new() -> Alphabet {
        let comp2char = Self::DEFAULT_COMP2CHAR.to_vec();
        let cumulative: Vec<u64> = vec![0; comp2char.len() + 1];
        Alphabet {
            char2comp: Self::default_char2comp(),
            comp2char,
            cumulative,
        }
    }

    /// Creates an alphabet from symbol counts.
    ///
    /// # Arguments
    ///
    /// * `counts`: Number of occurrences of each comp value; one entry per
    ///   comp value in `comp2char`.
    /// * `char2comp`: Byte-to-comp mapping of length [`Self::MAX_CHARS`].
    /// * `comp2char`: Comp-to-byte mapping; its length is the alphabet size.
    ///
    /// # Panics
    ///
    /// Panics if the table lengths are inconsistent.
    pub fn from_counts(counts: &[u64], char2comp: Vec<u8>, comp2char: Vec<u8>) -> Alphabet {
        assert_eq!(char2comp.len(), Self::MAX_CHARS, "Alphabet: char2comp must cover all byte values");
        assert_eq!(counts.len(), comp2char.len(), "Alphabet: one count per comp value is required");
        let mut cumulative: Vec<u64> = Vec::with_capacity(counts.len() + 1);
        let mut sum = 0;
        for count in counts.iter() {
            cumulative.push(sum);
            sum += count;
        }
        cumulative.push(sum);
        Alphabet {
            char2comp,
            comp2char,
            cumulative,
        }
    }

    /// Creates an alphabet by counting the symbols in a byte sequence.
    ///
    /// # Panics
    ///
    /// Panics if `char2comp` does not cover all byte values.
    pub fn from_sequence(sequence: &[u8], char2comp: Vec<u8>, comp2char: Vec<u8>) -> Alphabet {
        assert_eq!(char2comp.len(), Self::MAX_CHARS, "Alphabet: char2comp must cover all byte values");
        let mut counts: Vec<u64> = vec![0; comp2char.len()];
        for c in sequence.iter() {
            counts[char2comp[*c as usize] as usize] += 1;
        }
        Self::from_counts(&counts, char2comp, comp2char)
    }

    /// Returns the size of the alphabet.
    #[inline]
    pub fn sigma(&self) -> usize {
        self.comp2char.len()
    }

    /// Returns the comp value of byte `c`.
    ///
    /// Bytes outside the alphabet map to the value the table specifies,
    /// usually the terminator.
    #[inline]
    pub fn char_to_comp(&self, c: u8) -> u8 {
        self.char2comp[c as usize]
    }

    /// Returns the byte corresponding to comp value `comp`.
    ///
    /// # Panics
    ///
    /// May panic if `comp >= self.sigma()`.
    #[inline]
    pub fn comp_to_char(&self, comp: u8) -> u8 {
        self.comp2char[comp as usize]
    }

    /// Returns `true` if byte `c` is a symbol of this alphabet.
    pub fn contains(&self, c: u8) -> bool {
        self.char2comp[c as usize] != 0 || c == self.comp2char[0]
    }

    /// Returns the byte-to-comp mapping.
    #[inline]
    pub fn char2comp(&self) -> &[u8] {
        &self.char2comp
    }

    /// Returns the comp-to-byte mapping.
    #[inline]
    pub fn comp2char(&self) -> &[u8] {
        &self.comp2char
    }

    /// Returns the number of symbol occurrences with comp values below `i`.
    ///
    /// # Panics
    ///
    /// May panic if `i > self.sigma()`.
    #[inline]
    pub fn cumulative(&self, i: usize) -> u64 {
        self.cumulative[i]
    }

    /// Returns the total number of symbol occurrences.
    #[inline]
    pub fn total(&self) -> u64 {
        self.cumulative[self.sigma()]
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for Alphabet {
    fn serialize_header<T: io::Write>(&self, _: &mut T) -> io::Result<()> {
        Ok(())
    }

    fn serialize_body<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.char2comp.serialize(writer)?;
        self.comp2char.serialize(writer)?;
        self.cumulative.serialize(writer)?;
        Ok(())
    }

    fn load<T: io::Read>(reader: &mut T) -> io::Result<Self> {
        let char2comp = Vec::<u8>::load(reader)?;
        let comp2char = Vec::<u8>::load(reader)?;
        let cumulative = Vec::<u64>::load(reader)?;
        if char2comp.len() != Self::MAX_CHARS {
            return Err(Error::new(ErrorKind::InvalidData, "Alphabet: Invalid char2comp length"));
        }
        if cumulative.len() != comp2char.len() + 1 {
            return Err(Error::new(ErrorKind::InvalidData, "Alphabet: Cumulative counts do not match the alphabet size"));
        }
        for i in 1..cumulative.len() {
            if cumulative[i] < cumulative[i - 1] {
                return Err(Error::new(ErrorKind::InvalidData, "Alphabet: Cumulative counts are not monotone"));
            }
        }
        Ok(Alphabet {
            char2comp,
            comp2char,
            cumulative,
        })
    }

    fn size_in_elements(&self) -> usize {
        self.char2comp.size_in_elements() + self.comp2char.size_in_elements() + self.cumulative.size_in_elements()
    }
}

//-----------------------------------------------------------------------------

/// Encoding of a kmer and its one-character context as a 64-bit integer.
///
/// This encoding is intended for kmers of length 16 or less over an alphabet
/// of size 8 or less. From the most significant bit:
///
/// * 16 × 3 bits for the label, with high-order characters zeroed when the
///   kmer is shorter than 16;
/// * 8 bits marking which predecessor comp values are present;
/// * 8 bits marking which successor comp values are present.
///
/// # Examples
///
/// ```
/// use gcsa::support::{Alphabet, Key};
///
/// let alpha = Alphabet::new();
/// let key = Key::encode(&alpha, "ACG", 0x10, 0x02);
/// assert_eq!(Key::label(key), (1 << 6) | (2 << 3) | 3);
/// assert_eq!(Key::predecessors(key), 0x10);
/// assert_eq!(Key::successors(key), 0x02);
/// assert_eq!(Key::last(key), 3);
/// assert_eq!(Key::decode(key, 3, &alpha), "ACG");
/// ```
pub struct Key {}

impl Key {
    /// Number of bits in an encoded character.
    pub const CHAR_WIDTH: usize = 3;

    /// Low [`Self::CHAR_WIDTH`] bits set.
    pub const CHAR_MASK: u64 = 0x7;

    /// Maximum length of an encoded kmer.
    pub const MAX_LENGTH: usize = 16;

    /// Maximum alphabet size the encoding supports.
    pub const MAX_SIGMA: usize = 8;

    /// Low 16 bits set: the predecessor and successor fields.
    pub const PRED_SUCC_MASK: u64 = 0xFFFF;

    /// Encodes a kmer with the given predecessor and successor sets.
    ///
    /// The leftmost character of the kmer ends up in the most significant
    /// label position.
    ///
    /// # Panics
    ///
    /// May panic if the kmer is longer than [`Self::MAX_LENGTH`].
    pub fn encode(alpha: &Alphabet, kmer: &str, predecessors: u8, successors: u8) -> u64 {
        debug_assert!(kmer.len() <= Self::MAX_LENGTH, "Key: Kmer {} is too long", kmer);
        let mut value = 0;
        for c in kmer.bytes() {
            value = (value << Self::CHAR_WIDTH) | (alpha.char_to_comp(c) as u64);
        }
        value = (value << 8) | (predecessors as u64);
        value = (value << 8) | (successors as u64);
        value
    }

    /// Decodes the label of a key of known length back into a string.
    pub fn decode(key: u64, kmer_length: usize, alpha: &Alphabet) -> String {
        let label = Self::label(key);
        let mut result = String::with_capacity(kmer_length);
        for i in (0..kmer_length).rev() {
            let comp = ((label >> (i * Self::CHAR_WIDTH)) & Self::CHAR_MASK) as u8;
            result.push(alpha.comp_to_char(comp) as char);
        }
        result
    }

    /// Returns the label of the key.
    ///
    /// After the unique keys pass has replaced labels with ranks, this
    /// returns the rank instead.
    #[inline]
    pub fn label(key: u64) -> u64 {
        key >> 16
    }

    /// Returns the predecessor set of the key.
    ///
    /// Bit `c` is set if comp value `c` may precede the kmer.
    #[inline]
    pub fn predecessors(key: u64) -> u8 {
        ((key >> 8) & 0xFF) as u8
    }

    /// Returns the successor set of the key.
    ///
    /// Bit `c` is set if comp value `c` may follow the kmer.
    #[inline]
    pub fn successors(key: u64) -> u8 {
        (key & 0xFF) as u8
    }

    /// Returns the last character of the label as a comp value.
    #[inline]
    pub fn last(key: u64) -> u8 {
        ((key >> 16) & Self::CHAR_MASK) as u8
    }

    /// Merges the predecessor and successor sets of `key2` into `key1`.
    ///
    /// The label of `key1` is preserved.
    #[inline]
    pub fn merge(key1: u64, key2: u64) -> u64 {
        key1 | (key2 & Self::PRED_SUCC_MASK)
    }

    /// Replaces the label of the key with the given value.
    ///
    /// This is used for replacing kmer labels with their ranks in the
    /// unique keys pass.
    #[inline]
    pub fn replace(key: u64, value: u64) -> u64 {
        (value << 16) | (key & Self::PRED_SUCC_MASK)
    }

    /// Returns the length of the longest common prefix of the labels of
    /// keys `a` and `b` of length `kmer_length`, in characters.
    pub fn lcp(a: u64, b: u64, kmer_length: usize) -> usize {
        let mut result = 0;
        let a = Self::label(a);
        let b = Self::label(b);

        for i in (0..kmer_length).rev() {
            let shift = i * Self::CHAR_WIDTH;
            if ((a >> shift) & Self::CHAR_MASK) != ((b >> shift) & Self::CHAR_MASK) {
                break;
            }
            result += 1;
        }

        result
    }
}

//-----------------------------------------------------------------------------

/// Encoding of a position in the input graph as a 64-bit integer.
///
/// The upper 54 bits store the node identifier and the low 10 bits store an
/// offset within the node. The value with all bits set is reserved: a record
/// with such a destination is sorted and will not be extended.
///
/// # Examples
///
/// ```
/// use gcsa::support::Node;
///
/// let node = Node::encode(5, 3);
/// assert_eq!(node, 5123);
/// assert_eq!(Node::id(node), 5);
/// assert_eq!(Node::offset(node), 3);
/// assert_eq!(Node::from_text("5:3").unwrap(), node);
/// assert_eq!(Node::to_text(node), "5:3");
/// ```
pub struct Node {}

impl Node {
    /// Number of bits in the offset field.
    pub const OFFSET_BITS: usize = 10;

    /// Low [`Self::OFFSET_BITS`] bits set.
    pub const OFFSET_MASK: u64 = 0x3FF;

    /// Encodes a node identifier and an offset within the node.
    #[inline]
    pub fn encode(node_id: u64, node_offset: u64) -> u64 {
        (node_id << Self::OFFSET_BITS) | (node_offset & Self::OFFSET_MASK)
    }

    /// Parses a position from the textual form `"id:offset"`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidData`] if the token is malformed, if a
    /// field is not a nonnegative decimal number, if the offset does not
    /// fit in the offset field, or if the identifier does not fit in the
    /// remaining bits.
    pub fn from_text(token: &str) -> io::Result<u64> {
        let mut parts = token.split(':');
        let id_part = parts.next();
        let offset_part = parts.next();
        if id_part.is_none() || offset_part.is_none() || parts.next().is_some() {
            return Err(Error::new(ErrorKind::InvalidData, format!("Node: Invalid position token {}", token)));
        }
        let id = id_part.unwrap().parse::<u64>().map_err(|_| {
            Error::new(ErrorKind::InvalidData, format!("Node: Invalid node id in token {}", token))
        })?;
        let offset = offset_part.unwrap().parse::<u64>().map_err(|_| {
            Error::new(ErrorKind::InvalidData, format!("Node: Invalid offset in token {}", token))
        })?;
        if offset > Self::OFFSET_MASK {
            return Err(Error::new(ErrorKind::InvalidData, format!("Node: Offset {} is too large in token {}", offset, token)));
        }
        if id >= 1 << (64 - Self::OFFSET_BITS) {
            return Err(Error::new(ErrorKind::InvalidData, format!("Node: Node id {} is too large in token {}", id, token)));
        }
        Ok(Self::encode(id, offset))
    }

    /// Returns the textual form `"id:offset"` of the position.
    pub fn to_text(node: u64) -> String {
        format!("{}:{}", Self::id(node), Self::offset(node))
    }

    /// Returns the node identifier of the position.
    #[inline]
    pub fn id(node: u64) -> u64 {
        node >> Self::OFFSET_BITS
    }

    /// Returns the offset of the position within the node.
    #[inline]
    pub fn offset(node: u64) -> u64 {
        node & Self::OFFSET_MASK
    }
}

//-----------------------------------------------------------------------------

/// An input kmer: an encoded key and the positions delimiting the kmer's
/// path in the input graph as a semiopen range `[from, to)`.
///
/// A kmer is constructed from a whitespace-tokenized input line
///
/// > `label from predecessors successors to...`
///
/// where `label` is the kmer string, `from` and the `to` tokens are
/// positions in the form `"id:offset"`, and `predecessors` / `successors`
/// are comma-separated lists of characters that may precede or follow the
/// kmer. A line with multiple destinations yields one kmer per destination.
///
/// A destination with all bits set marks a terminal record: the kmer ends a
/// path in the graph and will not be extended. In the text form this is the
/// largest encodable position, `18014398509481983:1023`. The flag carries
/// over to the initial path node built from the record, which is then
/// sorted from the start.
///
/// # Examples
///
/// ```
/// use gcsa::support::{Alphabet, KMer, Key, Node};
///
/// let alpha = Alphabet::new();
/// let tokens = vec!["ACG", "5:3", "T", "A,C", "6:0", "7:1"];
/// let kmer = KMer::new(&tokens, &alpha, 5).unwrap();
/// assert_eq!(Key::label(kmer.key), (1 << 6) | (2 << 3) | 3);
/// assert_eq!(Key::predecessors(kmer.key), 1 << 4);
/// assert_eq!(Key::successors(kmer.key), (1 << 1) | (1 << 2));
/// assert_eq!(kmer.from, Node::encode(5, 3));
/// assert_eq!(kmer.to, Node::encode(7, 1));
/// assert!(!kmer.sorted());
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct KMer {
    /// Encoded key; the label field holds a kmer rank after the unique
    /// keys pass.
    pub key: u64,
    /// Position of the first character of the kmer.
    pub from: u64,
    /// Position one past the kmer, or `!0` when the record is sorted.
    pub to: u64,
}

impl KMer {
    // Token layout of an input line.
    const FROM_TOKEN: usize = 1;
    const PRED_TOKEN: usize = 2;
    const SUCC_TOKEN: usize = 3;
    const FIRST_TO_TOKEN: usize = 4;

    /// Creates a kmer from a tokenized input line.
    ///
    /// # Arguments
    ///
    /// * `tokens`: The tokens of the line.
    /// * `alpha`: The alphabet for encoding the label and the context sets.
    /// * `successor`: Index of the destination token to use.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidData`] if the line has too few tokens,
    /// if `successor` is not a destination token, if the label is longer
    /// than [`Key::MAX_LENGTH`] or contains characters outside the
    /// alphabet, or if a position token is malformed.
    pub fn new(tokens: &[&str], alpha: &Alphabet, successor: usize) -> io::Result<KMer> {
        if tokens.len() <= Self::FIRST_TO_TOKEN {
            return Err(Error::new(ErrorKind::InvalidData, format!("KMer: Input line has too few tokens: {}", tokens.join(" "))));
        }
        if !(Self::FIRST_TO_TOKEN..tokens.len()).contains(&successor) {
            return Err(Error::new(ErrorKind::InvalidData, format!("KMer: Invalid successor index {}", successor)));
        }

        let label = tokens[0];
        if label.len() > Key::MAX_LENGTH {
            return Err(Error::new(ErrorKind::InvalidData, format!("KMer: Kmer {} is longer than {} characters", label, Key::MAX_LENGTH)));
        }
        for c in label.bytes() {
            if !alpha.contains(c) {
                return Err(Error::new(ErrorKind::InvalidData, format!("KMer: Kmer {} contains characters outside the alphabet", label)));
            }
        }

        let predecessors = Self::chars(tokens[Self::PRED_TOKEN], alpha)?;
        let successors = Self::chars(tokens[Self::SUCC_TOKEN], alpha)?;
        Ok(KMer {
            key: Key::encode(alpha, label, predecessors, successors),
            from: Node::from_text(tokens[Self::FROM_TOKEN])?,
            to: Node::from_text(tokens[successor])?,
        })
    }

    /// Returns the label field of the key.
    #[inline]
    pub fn label(&self) -> u64 {
        Key::label(self.key)
    }

    /// Returns `true` if the record is terminal and will not be extended.
    #[inline]
    pub fn sorted(&self) -> bool {
        self.to == !0u64
    }

    // Builds a comp value set from a comma-separated list of characters.
    fn chars(token: &str, alpha: &Alphabet) -> io::Result<u8> {
        let mut result = 0;
        for symbol in token.split(',') {
            let bytes = symbol.as_bytes();
            if bytes.len() != 1 || !alpha.contains(bytes[0]) {
                return Err(Error::new(ErrorKind::InvalidData, format!("KMer: Invalid character list {}", token)));
            }
            result |= 1 << alpha.char_to_comp(bytes[0]);
        }
        Ok(result)
    }
}

impl Display for KMer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(key {:X}, {} -> {})", self.key, Node::to_text(self.from), Node::to_text(self.to))
    }
}

impl Serializable for KMer {}

/// A raw key is equal to a kmer if their labels are equal; the context
/// fields are ignored.
impl PartialEq<KMer> for u64 {
    #[inline]
    fn eq(&self, kmer: &KMer) -> bool {
        Key::label(*self) == Key::label(kmer.key)
    }
}

/// Compares a raw key with a kmer by the labels, so that a kmer array
/// sorted by labels can be binary searched with a key.
///
/// # Examples
///
/// ```
/// use gcsa::support::{Alphabet, Key, KMer};
///
/// let alpha = Alphabet::new();
/// let labels = ["AC", "GA", "GT"];
/// let kmers: Vec<KMer> = labels.iter().enumerate()
///     .map(|(i, label)| KMer {
///         key: Key::encode(&alpha, label, 0, 0),
///         from: i as u64,
///         to: i as u64 + 1,
///     })
///     .collect();
///
/// let key = Key::encode(&alpha, "GA", 0x04, 0x08);
/// let position = kmers.partition_point(|kmer| key > *kmer);
/// assert_eq!(position, 1);
/// assert!(key == kmers[position]);
/// ```
impl PartialOrd<KMer> for u64 {
    #[inline]
    fn partial_cmp(&self, kmer: &KMer) -> Option<Ordering> {
        Some(Key::label(*self).cmp(&Key::label(kmer.key)))
    }
}

//-----------------------------------------------------------------------------

/// Deduplicates the labels of a kmer array.
///
/// This function does several things:
///
/// 1. Sorts the kmer array by the labels encoded in the keys.
/// 2. Builds an array of keys with unique labels, with the predecessor and
///    successor fields merged over all kmers sharing the label.
/// 3. Stores the last character of each unique label in a packed vector.
/// 4. Replaces the label of each kmer with its rank in the key array, while
///    keeping the kmer's own predecessor and successor fields.
///
/// Returns the unique keys and the last characters.
///
/// # Examples
///
/// ```
/// use gcsa::support::{Key, KMer, unique_keys};
///
/// let mut kmers = vec![
///     KMer { key: Key::replace(0x0102, 9), from: 0, to: 1 },
///     KMer { key: Key::replace(0x0408, 9), from: 1, to: 2 },
///     KMer { key: Key::replace(0x1020, 11), from: 2, to: 3 },
/// ];
/// let (keys, _) = unique_keys(&mut kmers);
/// assert_eq!(keys, vec![Key::replace(0x050A, 9), Key::replace(0x1020, 11)]);
/// assert_eq!(Key::label(kmers[0].key), 0);
/// assert_eq!(Key::predecessors(kmers[0].key), 0x01);
/// assert_eq!(Key::label(kmers[2].key), 1);
/// ```
pub fn unique_keys(kmers: &mut [KMer]) -> (Vec<u64>, IntVector) {
    let mut keys: Vec<u64> = Vec::new();
    let mut last_char = IntVector::new(Key::CHAR_WIDTH).unwrap();
    if kmers.is_empty() {
        return (keys, last_char);
    }
    kmers.par_sort_unstable_by_key(|kmer| kmer.label());

    keys.push(kmers[0].key);
    last_char.push(Key::last(kmers[0].key) as u64);
    kmers[0].key = Key::replace(kmers[0].key, 0);
    for i in 1..kmers.len() {
        let key = kmers[i].key;
        let curr = keys.len() - 1;
        if Key::label(key) == Key::label(keys[curr]) {
            keys[curr] = Key::merge(keys[curr], key);
        } else {
            keys.push(key);
            last_char.push(Key::last(key) as u64);
        }
        kmers[i].key = Key::replace(key, (keys.len() - 1) as u64);
    }

    (keys, last_char)
}

//-----------------------------------------------------------------------------
