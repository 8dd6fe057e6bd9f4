//! Internal support structures for the construction pipeline.

use simple_sds::ops::{BitVec, Select, PredSucc};
use simple_sds::serialize::Serializable;
use simple_sds::sparse_vector::SparseVector;

use std::collections::{BTreeMap, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{Error, ErrorKind, Read, Seek, SeekFrom, Write, BufWriter};
use std::path::Path;
use std::{cmp, io, mem, slice};


//-----------------------------------------------------------------------------

const MEGABYTE: usize = 1024 * 1024;

//-----------------------------------------------------------------------------

/// A counter array that stores small values in a byte vector and spills
/// large values into a map.
///
/// All counters start at zero. Most counters in the construction stay below
/// a byte, so the common case costs a single byte access; a counter that
/// reaches [`Self::LARGE_VALUE`] is promoted into the map.
///
/// # Examples
///
/// ```
/// use gcsa::internal::SLArray;
///
/// let mut array = SLArray::new(4);
/// for _ in 0..300 {
///     array.increment(2);
/// }
/// array.increment(3);
/// assert_eq!(array.get(2), 300);
/// assert_eq!(array.get(3), 1);
/// assert_eq!(array.get(0), 0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SLArray {
    data: Vec<u8>,
    large_values: BTreeMap<usize, usize>,
}

impl SLArray {
    /// Byte value marking a promoted counter.
    pub const LARGE_VALUE: u8 = 255;

    /// Creates an array of `n` zero counters.
    pub fn new(n: usize) -> SLArray {
        SLArray {
            data: vec![0; n],
            large_values: BTreeMap::new(),
        }
    }

    /// Returns the number of counters.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the array is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value of counter `i`.
    ///
    /// # Panics
    ///
    /// May panic if `i >= self.len()`.
    #[inline]
    pub fn get(&self, i: usize) -> usize {
        if self.data[i] == Self::LARGE_VALUE {
            self.large_values[&i]
        } else {
            self.data[i] as usize
        }
    }

    /// Increments counter `i`.
    ///
    /// # Panics
    ///
    /// May panic if `i >= self.len()`.
    pub fn increment(&mut self, i: usize) {
        if self.data[i] == Self::LARGE_VALUE {
            *self.large_values.get_mut(&i).unwrap() += 1;
        } else {
            self.data[i] += 1;
            if self.data[i] == Self::LARGE_VALUE {
                self.large_values.insert(i, Self::LARGE_VALUE as usize);
            }
        }
    }

    /// Releases all storage.
    pub fn clear(&mut self) {
        self.data = Vec::new();
        self.large_values.clear();
    }
}

//-----------------------------------------------------------------------------

/// A binary min-heap over a pre-filled buffer.
///
/// Unlike [`std::collections::BinaryHeap`], the queue is built over an
/// existing buffer with a linear-time [`PriorityQueue::heapify`], elements
/// can be updated in place, and ties never move: [`PriorityQueue::down`]
/// only swaps on a strictly smaller child.
///
/// # Examples
///
/// ```
/// use gcsa::internal::PriorityQueue;
///
/// let mut queue = PriorityQueue::from(vec![5, 3, 8, 1, 9, 2]);
/// queue.heapify();
/// assert_eq!(queue.pop(), Some(1));
/// assert_eq!(queue.pop(), Some(2));
/// assert_eq!(queue.pop(), Some(3));
/// ```
#[derive(Clone, Debug, Default)]
pub struct PriorityQueue<T: Ord> {
    data: Vec<T>,
}

impl<T: Ord> PriorityQueue<T> {
    /// Returns the number of elements in the queue.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn left(i: usize) -> usize {
        2 * i + 1
    }

    #[inline]
    fn right(i: usize) -> usize {
        2 * i + 2
    }

    #[inline]
    fn parent(i: usize) -> usize {
        (i - 1) / 2
    }

    // Returns the position with the smaller element, preferring `i` on ties.
    #[inline]
    fn smaller(&self, i: usize, j: usize) -> usize {
        if self.data[j] < self.data[i] { j } else { i }
    }

    /// Sifts the element at position `i` down to its place.
    pub fn down(&mut self, i: usize) {
        let mut i = i;
        while Self::left(i) < self.len() {
            let mut next = self.smaller(i, Self::left(i));
            if Self::right(i) < self.len() {
                next = self.smaller(next, Self::right(i));
            }
            if next == i {
                return;
            }
            self.data.swap(i, next);
            i = next;
        }
    }

    /// Turns the buffer into a heap in linear time.
    pub fn heapify(&mut self) {
        if self.len() <= 1 {
            return;
        }
        let mut i = Self::parent(self.len() - 1);
        loop {
            self.down(i);
            if i == 0 {
                break;
            }
            i -= 1;
        }
    }

    /// Removes and returns the smallest element, assuming the buffer is
    /// a heap.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let last = self.len() - 1;
        self.data.swap(0, last);
        let result = self.data.pop();
        self.down(0);
        result
    }
}

impl<T: Ord> From<Vec<T>> for PriorityQueue<T> {
    fn from(data: Vec<T>) -> Self {
        PriorityQueue {
            data,
        }
    }
}

impl<T: Ord> std::ops::Index<usize> for PriorityQueue<T> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T: Ord> std::ops::IndexMut<usize> for PriorityQueue<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

//-----------------------------------------------------------------------------

/// A buffer for reading a binary file of fixed-size records sequentially.
///
/// The buffer holds records `offset..offset + buffered records`. The window
/// targets [`ReadBuffer::buffer_size`] records and is refilled when an
/// explicit [`ReadBuffer::seek`] leaves fewer than half of that. Random
/// access outside the window is legal but discards the window and seeks
/// the file.
///
/// The record type must be a plain `#[repr(C)]` value: the buffer
/// reinterprets raw file bytes as records, the same way the records were
/// written by [`write_records`].
#[derive(Debug, Default)]
pub struct ReadBuffer<T: Serializable> {
    file: Option<File>,
    elements: usize,
    offset: usize,
    buffer: VecDeque<T>,
}

impl<T: Serializable> ReadBuffer<T> {
    /// Returns the target number of buffered records: one megabyte worth.
    #[inline]
    pub fn buffer_size() -> usize {
        cmp::max(MEGABYTE / mem::size_of::<T>(), 2)
    }

    /// Returns the number of buffered records below which a seek refills
    /// the window.
    #[inline]
    pub fn minimum_size() -> usize {
        Self::buffer_size() / 2
    }

    /// Creates a buffer with no open file.
    pub fn new() -> ReadBuffer<T> {
        ReadBuffer {
            file: None,
            elements: 0,
            offset: 0,
            buffer: VecDeque::new(),
        }
    }

    /// Opens the given file and prepares for reading from the start.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its size is not a
    /// multiple of the record size.
    pub fn init<P: AsRef<Path>>(&mut self, filename: P) -> io::Result<()> {
        self.clear();
        let file = File::open(filename.as_ref()).map_err(|e| {
            Error::new(e.kind(), format!("ReadBuffer: Cannot open input file {}: {}", filename.as_ref().display(), e))
        })?;
        let bytes = file.metadata()?.len() as usize;
        if bytes % mem::size_of::<T>() != 0 {
            return Err(Error::new(ErrorKind::InvalidData,
                format!("ReadBuffer: File {} does not consist of {}-byte records", filename.as_ref().display(), mem::size_of::<T>())));
        }
        self.file = Some(file);
        self.elements = bytes / mem::size_of::<T>();
        self.offset = 0;
        Ok(())
    }

    /// Closes the file and releases the window.
    pub fn clear(&mut self) {
        self.file = None;
        self.elements = 0;
        self.offset = 0;
        self.buffer = VecDeque::new();
    }

    /// Returns the number of records in the file.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements
    }

    /// Returns `true` if the file is empty or not open.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the position of the first buffered record.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns `true` if record `i` is in the window.
    #[inline]
    pub fn buffered(&self, i: usize) -> bool {
        i >= self.offset && i < self.offset + self.buffer.len()
    }

    /// Moves the start of the window to record `i`.
    ///
    /// If the record is in the window, earlier records are dropped and the
    /// window is refilled when it has become too small. Otherwise the
    /// window is discarded and refilled from the new position.
    pub fn seek(&mut self, i: usize) -> io::Result<()> {
        if i >= self.len() {
            return Ok(());
        }
        if self.buffered(i) {
            while self.offset < i {
                self.buffer.pop_front();
                self.offset += 1;
            }
            if self.buffer.len() < Self::minimum_size() {
                self.fill()?;
            }
        } else {
            self.buffer.clear();
            let file = self.file.as_mut().unwrap();
            file.seek(SeekFrom::Start((i * mem::size_of::<T>()) as u64))?;
            self.offset = i;
            self.fill()?;
        }
        Ok(())
    }

    /// Reads records until the window reaches its target size or the end
    /// of the file.
    ///
    /// # Errors
    ///
    /// An end of file before the expected records is an input-integrity
    /// failure and surfaces as an error.
    pub fn fill(&mut self) -> io::Result<()> {
        let target = cmp::min(Self::buffer_size(), self.elements - self.offset);
        if self.buffer.len() >= target {
            return Ok(());
        }
        let count = target - self.buffer.len();
        let file = self.file.as_mut().unwrap();
        let mut temp: Vec<T> = Vec::with_capacity(count);
        unsafe {
            let bytes = slice::from_raw_parts_mut(temp.as_mut_ptr() as *mut u8, count * mem::size_of::<T>());
            file.read_exact(bytes).map_err(|e| {
                Error::new(ErrorKind::InvalidData, format!("ReadBuffer: Failed to read {} records: {}", count, e))
            })?;
            temp.set_len(count);
        }
        self.buffer.extend(temp);
        Ok(())
    }

    /// Returns record `i`, seeking if it is outside the window.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidInput`] if `i` is past the end of the
    /// file, and propagates read errors.
    pub fn get(&mut self, i: usize) -> io::Result<T>
    where
        T: Copy,
    {
        if i >= self.len() {
            return Err(Error::new(ErrorKind::InvalidInput, format!("ReadBuffer: Record {} is past the end", i)));
        }
        if !self.buffered(i) {
            self.seek(i)?;
        }
        Ok(self.buffer[i - self.offset])
    }
}

//-----------------------------------------------------------------------------

/// Writes the records to a file as raw fixed-size records, in the format
/// [`ReadBuffer`] reads.
pub fn write_records<T: Serializable, P: AsRef<Path>>(filename: P, records: &[T]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    let file = options.create(true).write(true).truncate(true).open(filename.as_ref()).map_err(|e| {
        Error::new(e.kind(), format!("Cannot create output file {}: {}", filename.as_ref().display(), e))
    })?;
    let mut writer = BufWriter::new(file);
    let bytes = unsafe {
        slice::from_raw_parts(records.as_ptr() as *const u8, records.len() * mem::size_of::<T>())
    };
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

//-----------------------------------------------------------------------------

/// An index for finding the first occurrence of each value in a sequence
/// grouped by values.
///
/// The index is built over a sequence where equal values are adjacent and
/// the runs are in increasing order, as produced by sorting. A sparse bit
/// vector marks the values that are present and another marks the input
/// position starting each run; a query is a rank over the first and a
/// select over the second.
///
/// # Examples
///
/// ```
/// use gcsa::internal::ValueIndex;
///
/// let input: Vec<u64> = vec![1, 1, 1, 5, 5, 8, 100, 100];
/// let index = ValueIndex::new(&input, |value| *value as usize);
/// assert_eq!(index.find(1), 0);
/// assert_eq!(index.find(5), 3);
/// assert_eq!(index.find(100), 6);
///
/// // Absent values map to the input length.
/// assert_eq!(index.find(7), input.len());
/// assert_eq!(index.find(1000), input.len());
/// ```
#[derive(Clone, Debug)]
pub struct ValueIndex {
    // Marks the values that are present.
    values: SparseVector,
    // Marks the first occurrence of each present value.
    first_occ: SparseVector,
    len: usize,
}

impl ValueIndex {
    /// Builds the index for the given input.
    ///
    /// # Arguments
    ///
    /// * `input`: A sequence grouped by the indexed value.
    /// * `getter`: Returns the indexed value of an item.
    ///
    /// # Panics
    ///
    /// Panics if the values are not in increasing run order.
    pub fn new<T, F: Fn(&T) -> usize>(input: &[T], getter: F) -> ValueIndex {
        let mut present: Vec<usize> = Vec::new();
        let mut runs: Vec<usize> = Vec::new();
        for (i, item) in input.iter().enumerate() {
            let value = getter(item);
            if present.last() != Some(&value) {
                assert!(present.last().map_or(true, |last| *last < value), "ValueIndex: Input is not sorted by value at position {}", i);
                present.push(value);
                runs.push(i);
            }
        }
        let values = SparseVector::try_from_iter(present.into_iter()).unwrap();
        let first_occ = SparseVector::try_from_iter(runs.into_iter()).unwrap();
        ValueIndex {
            values,
            first_occ,
            len: input.len(),
        }
    }

    /// Returns the length of the input sequence.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the input sequence was empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the position of the first occurrence of `value` in the
    /// input, or the input length if the value does not occur.
    pub fn find(&self, value: usize) -> usize {
        if value >= self.values.len() {
            return self.len;
        }
        let mut iter = self.values.predecessor(value);
        match iter.next() {
            Some((rank, position)) if position == value => {
                match self.first_occ.select_iter(rank).next() {
                    Some((_, index)) => index,
                    None => self.len,
                }
            },
            _ => self.len,
        }
    }
}

//-----------------------------------------------------------------------------

#[cfg(feature = "binaries")]
pub fn readable_size(bytes: usize) -> (f64, &'static str) {
    let units: Vec<(f64, &'static str)> = vec![
        (1.0, "B"),
        (1024.0, "KiB"),
        (1024.0 * 1024.0, "MiB"),
        (1024.0 * 1024.0 * 1024.0, "GiB"),
        (1024.0 * 1024.0 * 1024.0 * 1024.0, "TiB"),
    ];

    let value = bytes as f64;
    let mut unit = 0;
    for i in 1..units.len() {
        if value >= units[i].0 {
            unit = i;
        } else {
            break;
        }
    }

    (value / units[unit].0, units[unit].1)
}

#[cfg(all(feature = "binaries", target_os = "linux"))]
pub fn peak_memory_usage() -> Result<usize, &'static str> {
    unsafe {
        let mut rusage: libc::rusage = std::mem::zeroed();
        let retval = libc::getrusage(libc::RUSAGE_SELF, &mut rusage as *mut _);
        match retval {
            0 => Ok(rusage.ru_maxrss as usize * 1024),
            _ => Err("libc::getrusage call failed"),
        }
    }
}

#[cfg(all(feature = "binaries", target_os = "macos"))]
pub fn peak_memory_usage() -> Result<usize, &'static str> {
    unsafe {
        let mut rusage: libc::rusage = std::mem::zeroed();
        let retval = libc::getrusage(libc::RUSAGE_SELF, &mut rusage as *mut _);
        match retval {
            0 => Ok(rusage.ru_maxrss as usize),
            _ => Err("libc::getrusage call failed"),
        }
    }
}

#[cfg(all(feature = "binaries", not(any(target_os = "linux", target_os = "macos"))))]
pub fn peak_memory_usage() -> Result<usize, &'static str> {
    Err("No peak_memory_usage implementation for this OS")
}

#[cfg(feature = "binaries")]
pub fn report_memory_usage() {
    match peak_memory_usage() {
        Ok(bytes) => {
            let (size, unit) = readable_size(bytes);
            eprintln!("Peak memory usage: {:.3} {}", size, unit);
        },
        Err(f) => {
            eprintln!("{}", f);
        },
    }
}

//-----------------------------------------------------------------------------
