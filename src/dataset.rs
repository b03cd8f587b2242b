//! The dataset owned by one rank: an integer sequence resident either in a
//! memory buffer or spilled to a temporary file.
//!
//! A dataset is in exactly one medium at a time and is exclusively owned by
//! its rank; communication always copies into a fresh local dataset, never
//! aliases remote memory. Spill files are deleted when the dataset is
//! destroyed (or dropped), so every exit path, including panics, releases
//! the disk space.

use byteorder::{ByteOrder, NativeEndian};
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

pub const ELEM_BYTES: u64 = 4;

/// A temporary file holding `len` native-endian 32-bit elements.
pub struct SpillFile {
    file: NamedTempFile,
    len: u64,
}

impl SpillFile {
    fn create(len: u64) -> SpillFile {
        let file = NamedTempFile::new().expect("cannot create a temporary spill file");
        file.as_file()
            .set_len(len * ELEM_BYTES)
            .expect("cannot size a temporary spill file");
        SpillFile { file, len }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path_display(&self) -> String {
        self.file.path().display().to_string()
    }

    fn set_len(&mut self, len: u64) {
        self.file
            .as_file()
            .set_len(len * ELEM_BYTES)
            .expect("cannot resize a temporary spill file");
        self.len = len;
    }

    fn seek_to(&mut self, offset: u64) -> &mut File {
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(offset * ELEM_BYTES))
            .expect("cannot seek in a spill file");
        file
    }

    /// Reads up to `out.len()` elements starting at `offset`; returns the
    /// number actually read (clamped at end of data).
    fn read_at(&mut self, offset: u64, out: &mut [i32]) -> u64 {
        let avail = self.len.saturating_sub(offset);
        let count = (out.len() as u64).min(avail) as usize;
        if count == 0 {
            return 0;
        }
        let mut bytes = vec![0u8; count * ELEM_BYTES as usize];
        self.seek_to(offset)
            .read_exact(&mut bytes)
            .expect("short read from a spill file");
        NativeEndian::read_i32_into(&bytes, &mut out[..count]);
        count as u64
    }

    /// Writes `src` at `offset`, growing the file if needed.
    fn write_at(&mut self, offset: u64, src: &[i32]) {
        if src.is_empty() {
            return;
        }
        let mut bytes = vec![0u8; src.len() * ELEM_BYTES as usize];
        NativeEndian::write_i32_into(src, &mut bytes);
        self.seek_to(offset)
            .write_all(&bytes)
            .expect("short write to a spill file");
        self.len = self.len.max(offset + src.len() as u64);
    }
}

/// Storage medium of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medium {
    Uninit,
    Mem,
    Disk,
}

impl Medium {
    pub fn name(self) -> &'static str {
        match self {
            Medium::Uninit => "no medium",
            Medium::Mem => "array [primary memory]",
            Medium::Disk => "file [disk]",
        }
    }
}

/// The tagged dataset representation. All mutation goes through the methods
/// here and through the collective operations; the variants are never
/// manipulated from outside this module.
pub enum Dataset {
    Uninit,
    Mem(Vec<i32>),
    Disk(SpillFile),
}

impl Default for Dataset {
    fn default() -> Self {
        Dataset::Uninit
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Uninit => write!(f, "{}", Medium::Uninit.name()),
            Dataset::Mem(v) => write!(f, "{} of {} elements", Medium::Mem.name(), v.len()),
            Dataset::Disk(s) => write!(
                f,
                "\"{}\" {} of {} elements",
                s.path_display(),
                Medium::Disk.name(),
                s.len()
            ),
        }
    }
}

impl Dataset {
    pub fn new() -> Self {
        Dataset::Uninit
    }

    pub fn from_vec(v: Vec<i32>) -> Self {
        Dataset::Mem(v)
    }

    pub fn medium(&self) -> Medium {
        match self {
            Dataset::Uninit => Medium::Uninit,
            Dataset::Mem(_) => Medium::Mem,
            Dataset::Disk(_) => Medium::Disk,
        }
    }

    pub fn is_uninit(&self) -> bool {
        matches!(self, Dataset::Uninit)
    }

    pub fn len(&self) -> u64 {
        match self {
            Dataset::Uninit => 0,
            Dataset::Mem(v) => v.len() as u64,
            Dataset::Disk(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocates storage for `size` elements: in memory when `size` fits
    /// under `mem_budget`, on disk otherwise.
    pub fn alloc(&mut self, size: u64, mem_budget: u64) {
        assert!(self.is_uninit(), "allocating over a live dataset ({})", self);
        *self = if size <= mem_budget {
            Dataset::Mem(vec![0; size as usize])
        } else {
            Dataset::Disk(SpillFile::create(size))
        };
    }

    /// Resizes in place, preserving the medium. Existing elements up to the
    /// smaller of the two sizes are kept.
    pub fn realloc(&mut self, size: u64) {
        match self {
            Dataset::Mem(v) => v.resize(size as usize, 0),
            Dataset::Disk(s) => s.set_len(size),
            Dataset::Uninit => panic!("reallocating an uninitialized dataset"),
        }
    }

    /// Releases owned resources and returns to the uninitialized state.
    /// A no-op on an already-uninitialized dataset.
    pub fn destroy(&mut self) {
        *self = Dataset::Uninit;
    }

    pub fn as_slice(&self) -> &[i32] {
        match self {
            Dataset::Mem(v) => v,
            other => panic!("cannot handle data ({}): memory medium required", other),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [i32] {
        match self {
            Dataset::Mem(v) => v,
            other => panic!("cannot handle data ({}): memory medium required", other),
        }
    }

    /// Reads up to `out.len()` elements starting at `offset`, from either
    /// medium; returns the number actually read.
    pub fn read_at(&mut self, offset: u64, out: &mut [i32]) -> u64 {
        match self {
            Dataset::Mem(v) => {
                let avail = (v.len() as u64).saturating_sub(offset);
                let count = (out.len() as u64).min(avail) as usize;
                out[..count].copy_from_slice(&v[offset as usize..offset as usize + count]);
                count as u64
            }
            Dataset::Disk(s) => s.read_at(offset, out),
            Dataset::Uninit => panic!("reading from an uninitialized dataset"),
        }
    }

    /// Writes `src` at `offset`, growing the dataset if needed.
    pub fn write_at(&mut self, offset: u64, src: &[i32]) {
        match self {
            Dataset::Mem(v) => {
                let end = offset as usize + src.len();
                if v.len() < end {
                    v.resize(end, 0);
                }
                v[offset as usize..end].copy_from_slice(src);
            }
            Dataset::Disk(s) => s.write_at(offset, src),
            Dataset::Uninit => panic!("writing to an uninitialized dataset"),
        }
    }

    /// Drains the dataset into a memory vector, whatever the medium.
    pub fn take_vec(&mut self) -> Vec<i32> {
        match std::mem::take(self) {
            Dataset::Uninit => Vec::new(),
            Dataset::Mem(v) => v,
            Dataset::Disk(mut s) => {
                let mut v = vec![0i32; s.len() as usize];
                let read = s.read_at(0, &mut v);
                assert_eq!(read, v.len() as u64);
                v
            }
        }
    }
}

/// Copies up to `count` elements from `src[src_off..]` into `dst` starting
/// at `dst_off`, for any combination of media, staging at most `chunk`
/// elements in memory at a time. Returns the number of elements copied,
/// which may be less than `count` when `src` runs out.
pub fn copy_range(
    src: &mut Dataset,
    src_off: u64,
    dst: &mut Dataset,
    dst_off: u64,
    count: u64,
    chunk: usize,
) -> u64 {
    assert!(chunk > 0);
    let count = count.min(src.len().saturating_sub(src_off));

    // Memory to memory needs no staging.
    if let (Dataset::Mem(s), Dataset::Mem(d)) = (&*src, &mut *dst) {
        let s = &s[src_off as usize..(src_off + count) as usize];
        let end = dst_off as usize + s.len();
        if d.len() < end {
            d.resize(end, 0);
        }
        d[dst_off as usize..end].copy_from_slice(s);
        return count;
    }

    let mut staging = vec![0i32; chunk.min(count as usize).max(1)];
    let mut copied = 0u64;
    while copied < count {
        let want = ((count - copied) as usize).min(staging.len());
        let got = src.read_at(src_off + copied, &mut staging[..want]);
        debug_assert_eq!(got as usize, want);
        dst.write_at(dst_off + copied, &staging[..want]);
        copied += got;
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_of(v: &[i32]) -> Dataset {
        let mut d = Dataset::new();
        d.alloc(v.len() as u64, 0);
        assert_eq!(d.medium(), Medium::Disk);
        d.write_at(0, v);
        d
    }

    #[test]
    fn alloc_respects_budget() {
        let mut small = Dataset::new();
        small.alloc(8, 8);
        assert_eq!(small.medium(), Medium::Mem);

        let mut big = Dataset::new();
        big.alloc(9, 8);
        assert_eq!(big.medium(), Medium::Disk);
        assert_eq!(big.len(), 9);
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut d = Dataset::new();
        d.destroy();
        d.alloc(4, 16);
        d.destroy();
        d.destroy();
        assert!(d.is_uninit());
        assert_eq!(d.len(), 0);
    }

    #[test]
    fn disk_round_trip() {
        let v: Vec<i32> = (0..100).rev().collect();
        let mut d = disk_of(&v);
        assert_eq!(d.len(), 100);
        assert_eq!(d.take_vec(), v);
    }

    #[test]
    fn realloc_preserves_medium_and_prefix() {
        let mut m = Dataset::from_vec(vec![1, 2, 3]);
        m.realloc(5);
        assert_eq!(m.as_slice(), &[1, 2, 3, 0, 0]);
        m.realloc(2);
        assert_eq!(m.as_slice(), &[1, 2]);

        let mut d = disk_of(&[7, 8, 9]);
        d.realloc(2);
        assert_eq!(d.medium(), Medium::Disk);
        assert_eq!(d.take_vec(), vec![7, 8]);
    }

    #[test]
    fn copy_between_all_media() {
        let v: Vec<i32> = (0..257).collect();
        // Chunk of 16 forces many staging rounds, including a short tail.
        for src_disk in [false, true] {
            for dst_disk in [false, true] {
                let mut src = if src_disk {
                    disk_of(&v)
                } else {
                    Dataset::from_vec(v.clone())
                };
                let mut dst = Dataset::new();
                dst.alloc(v.len() as u64, if dst_disk { 0 } else { u64::MAX });

                let copied = copy_range(&mut src, 0, &mut dst, 0, v.len() as u64, 16);
                assert_eq!(copied, v.len() as u64);
                assert_eq!(dst.take_vec(), v, "src_disk={} dst_disk={}", src_disk, dst_disk);
            }
        }
    }

    #[test]
    fn copy_clamps_at_source_end() {
        let mut src = Dataset::from_vec(vec![1, 2, 3]);
        let mut dst = Dataset::new();
        dst.alloc(8, u64::MAX);
        let copied = copy_range(&mut src, 1, &mut dst, 0, 100, 4);
        assert_eq!(copied, 2);
        assert_eq!(&dst.as_slice()[..2], &[2, 3]);
    }

    #[test]
    fn copy_with_offsets() {
        let mut src = disk_of(&(0..50).collect::<Vec<i32>>());
        let mut dst = Dataset::from_vec(vec![0; 10]);
        let copied = copy_range(&mut src, 40, &mut dst, 5, 5, 3);
        assert_eq!(copied, 5);
        assert_eq!(&dst.as_slice()[5..], &[40, 41, 42, 43, 44]);
    }
}
