/// Tracks free and used byte ranges within a fixed-size linear address space.
///
/// Used by render buffers to hand out `(offset, size)` leases into their
/// backing GPU buffer. The freelist never touches GPU memory itself.
///
/// Allocation is first-fit in offset order with page-granular rounding.
/// Freed ranges are coalesced with adjacent free neighbors so no two free
/// ranges are ever adjacent. The node pool (free ranges + used records) is
/// bounded by `max_node_count`; exhausting it is a recoverable
/// [`Error::OutOfNodes`](crate::error::Error::OutOfNodes).
///
/// # Example
///
/// ```ignore
/// let mut list = Freelist::new(1024, 16, 256)?;
/// let (offset, size) = list.allocate(100)?; // rounds to 112
/// list.free(offset)?;                        // back to one spanning range
/// ```

use crate::error::{Error, Result};
use crate::{engine_bail, engine_warn};

/// A contiguous byte range within the tracked address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Range {
    offset: u64,
    size: u64,
}

/// Freelist allocator over a fixed-capacity linear byte range
pub struct Freelist {
    /// Tracked range size, rounded up to page granularity
    total_size: u64,
    /// Allocation granularity in bytes
    page_size: u64,
    /// Combined budget for free ranges and used records
    max_node_count: usize,
    /// Free ranges, sorted by offset, never adjacent
    free_nodes: Vec<Range>,
    /// Outstanding allocations, sorted by offset
    used_nodes: Vec<Range>,
}

fn align_up(value: u64, granularity: u64) -> u64 {
    (value + granularity - 1) / granularity * granularity
}

impl Freelist {
    /// Create a freelist spanning `[0, total_size)`.
    ///
    /// # Arguments
    ///
    /// * `total_size` - Size of the tracked range in bytes (rounded up to
    ///   `page_size` granularity)
    /// * `page_size` - Allocation granularity; all allocations round up to
    ///   a multiple of this
    /// * `max_node_count` - Bound on free ranges plus used records
    pub fn new(total_size: u64, page_size: u64, max_node_count: usize) -> Result<Self> {
        if total_size == 0 {
            engine_bail!("nebula3d::Freelist", "total_size must be non-zero");
        }
        if page_size == 0 {
            engine_bail!("nebula3d::Freelist", "page_size must be non-zero");
        }
        if max_node_count < 2 {
            engine_bail!(
                "nebula3d::Freelist",
                "max_node_count {} is too small (need at least 2)",
                max_node_count
            );
        }

        let total_size = align_up(total_size, page_size);
        Ok(Self {
            total_size,
            page_size,
            max_node_count,
            free_nodes: vec![Range {
                offset: 0,
                size: total_size,
            }],
            used_nodes: Vec::new(),
        })
    }

    /// Allocate a range of at least `requested_size` bytes.
    ///
    /// The request is rounded up to page granularity; the returned size is
    /// the rounded size actually reserved. First-fit: the first free range
    /// large enough (in offset order) is used.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfSpace`] if no free range is large enough
    /// - [`Error::OutOfNodes`] if the node pool is exhausted
    pub fn allocate(&mut self, requested_size: u64) -> Result<(u64, u64)> {
        if requested_size == 0 {
            engine_bail!("nebula3d::Freelist", "Cannot allocate zero bytes");
        }

        let size = align_up(requested_size, self.page_size);

        let index = match self.free_nodes.iter().position(|n| n.size >= size) {
            Some(i) => i,
            None => {
                engine_warn!(
                    "nebula3d::Freelist",
                    "Allocation of {} bytes failed: {} bytes free (largest hole too small)",
                    size,
                    self.free_space()
                );
                return Err(Error::OutOfSpace);
            }
        };

        let node = self.free_nodes[index];
        let exact = node.size == size;

        // Partial fit leaves the remainder as a free node, so the pool
        // grows by one record overall.
        if !exact && self.node_count() + 1 > self.max_node_count {
            engine_warn!(
                "nebula3d::Freelist",
                "Allocation of {} bytes failed: node pool exhausted ({} nodes)",
                size,
                self.max_node_count
            );
            return Err(Error::OutOfNodes);
        }

        if exact {
            self.free_nodes.remove(index);
        } else {
            let n = &mut self.free_nodes[index];
            n.offset += size;
            n.size -= size;
        }

        let offset = node.offset;
        let pos = self
            .used_nodes
            .partition_point(|n| n.offset < offset);
        self.used_nodes.insert(pos, Range { offset, size });

        Ok((offset, size))
    }

    /// Free the allocation starting at `offset`, returning its size.
    ///
    /// The range is reinserted as a free node and merged with adjacent free
    /// neighbors on either side.
    pub fn free(&mut self, offset: u64) -> Result<u64> {
        let index = match self.used_nodes.binary_search_by_key(&offset, |n| n.offset) {
            Ok(i) => i,
            Err(_) => {
                engine_bail!(
                    "nebula3d::Freelist",
                    "free({}) does not match any outstanding allocation",
                    offset
                );
            }
        };

        let freed = self.used_nodes.remove(index);

        let pos = self
            .free_nodes
            .partition_point(|n| n.offset < freed.offset);
        self.free_nodes.insert(pos, freed);

        // Coalesce with the following node first so `pos` stays valid.
        if pos + 1 < self.free_nodes.len() {
            let next = self.free_nodes[pos + 1];
            let current = self.free_nodes[pos];
            if current.offset + current.size == next.offset {
                self.free_nodes[pos].size += next.size;
                self.free_nodes.remove(pos + 1);
            }
        }
        if pos > 0 {
            let current = self.free_nodes[pos];
            let prev = self.free_nodes[pos - 1];
            if prev.offset + prev.size == current.offset {
                self.free_nodes[pos - 1].size += current.size;
                self.free_nodes.remove(pos);
            }
        }

        Ok(freed.size)
    }

    /// Look up the size of the outstanding allocation at `offset`
    pub fn allocation_size(&self, offset: u64) -> Option<u64> {
        self.used_nodes
            .binary_search_by_key(&offset, |n| n.offset)
            .ok()
            .map(|i| self.used_nodes[i].size)
    }

    /// Extend the tracked range to `new_total_size` bytes.
    ///
    /// The newly available tail becomes an additional free range, merged
    /// with an existing trailing free range where possible. The node budget
    /// may be raised at the same time (it is never lowered).
    pub fn resize(&mut self, new_total_size: u64, new_max_node_count: usize) -> Result<()> {
        let new_total = align_up(new_total_size, self.page_size);
        if new_total <= self.total_size {
            engine_bail!(
                "nebula3d::Freelist",
                "resize to {} rejected: not larger than current size {}",
                new_total,
                self.total_size
            );
        }

        let tail = Range {
            offset: self.total_size,
            size: new_total - self.total_size,
        };
        let max_nodes = self.max_node_count.max(new_max_node_count);

        match self.free_nodes.last_mut() {
            Some(last) if last.offset + last.size == tail.offset => {
                last.size += tail.size;
            }
            _ => {
                if self.node_count() + 1 > max_nodes {
                    engine_warn!(
                        "nebula3d::Freelist",
                        "resize failed: node pool exhausted ({} nodes)",
                        max_nodes
                    );
                    return Err(Error::OutOfNodes);
                }
                self.free_nodes.push(tail);
            }
        }

        self.total_size = new_total;
        self.max_node_count = max_nodes;
        Ok(())
    }

    /// Reset to a single free range spanning the whole tracked space.
    ///
    /// All outstanding allocations are forgotten; any leases held by
    /// callers become invalid.
    pub fn clear(&mut self) {
        self.free_nodes.clear();
        self.free_nodes.push(Range {
            offset: 0,
            size: self.total_size,
        });
        self.used_nodes.clear();
    }

    /// Total free bytes across all free ranges
    pub fn free_space(&self) -> u64 {
        self.free_nodes.iter().map(|n| n.size).sum()
    }

    /// Total bytes held by outstanding allocations
    pub fn used_space(&self) -> u64 {
        self.used_nodes.iter().map(|n| n.size).sum()
    }

    /// Tracked range size in bytes (page-granular)
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Allocation granularity in bytes
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Current number of nodes in use (free ranges + used records)
    pub fn node_count(&self) -> usize {
        self.free_nodes.len() + self.used_nodes.len()
    }

    /// Number of free (non-adjacent) ranges
    pub fn free_range_count(&self) -> usize {
        self.free_nodes.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "freelist_tests.rs"]
mod tests;
