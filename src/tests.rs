#![cfg(test)]
extern crate std;

use alloc::{boxed::Box, vec::Vec};

use quickcheck::{Arbitrary, Gen, QuickCheck};

use crate::{
    Address, AllocError, Block, BlockError, Page, PagedAllocator, UNIT_SCALE, UNIT_SPAN,
};

// Miri is substantially slower to run property tests, so the number of test
// cases is reduced to keep the runtime in check.

#[cfg(not(miri))]
const MAX_TESTS: u64 = 200;

#[cfg(miri)]
const MAX_TESTS: u64 = 20;

/// Largest page size exponent generated for allocator parameters.
const PAGE_SIZE_BITS: u32 = 9;

// Block ======================================================================

#[derive(Clone, Debug)]
struct Extent {
    start: u64,
    span: u64,
}

impl Arbitrary for Extent {
    fn arbitrary(g: &mut Gen) -> Self {
        Extent {
            start: u32::arbitrary(g).into(),
            span: u64::from(u16::arbitrary(g)) + UNIT_SCALE,
        }
    }
}

fn block_size_is_scaled_span(extent: Extent) -> bool {
    let start = Address::new(extent.start);
    let end = Address::new(extent.start + extent.span);

    match Block::new(start, end, 0) {
        Ok(block) => block.size() as u64 == (extent.span + 1) / UNIT_SPAN && block.size() > 0,
        Err(_) => false,
    }
}

fn encoded_size_matches_scale(start: u32, size: u8) -> bool {
    let size = usize::from(size).max(1);
    let block = match Block::with_size(Address::new(start.into()), size, 0) {
        Ok(b) => b,
        Err(_) => return false,
    };

    let span = block.end().value() - block.start().value();
    block.size() == size && span / UNIT_SCALE == size as u64
}

fn overfilled_block_is_rejected(size: u8, excess: u8) -> bool {
    let size = usize::from(size) + 1;
    let occupied_volume = size + usize::from(excess) + 1;

    Block::with_size(Address::ZERO, size, occupied_volume)
        == Err(BlockError::CapacityExceeded {
            occupied_volume,
            size,
        })
}

#[test]
fn block_size_matches_range() {
    let mut qc = QuickCheck::new().max_tests(MAX_TESTS);
    qc.quickcheck(block_size_is_scaled_span as fn(_) -> bool);
}

#[test]
fn block_size_matches_scale_factor() {
    let mut qc = QuickCheck::new().max_tests(MAX_TESTS);
    qc.quickcheck(encoded_size_matches_scale as fn(_, _) -> bool);
}

#[test]
fn block_rejects_excess_volume() {
    let mut qc = QuickCheck::new().max_tests(MAX_TESTS);
    qc.quickcheck(overfilled_block_is_rejected as fn(_, _) -> bool);
}

// Allocator ==================================================================

#[derive(Clone, Debug)]
struct AllocatorParams {
    page_count: usize,
    page_size: usize,
}

impl AllocatorParams {
    fn build(&self) -> PagedAllocator {
        let total = self.page_size.next_power_of_two() * self.page_count;
        PagedAllocator::try_new(total, self.page_count, self.page_size).unwrap()
    }
}

impl Arbitrary for AllocatorParams {
    fn arbitrary(g: &mut Gen) -> Self {
        AllocatorParams {
            page_count: usize::arbitrary(g) % 8 + 1,
            page_size: usize::arbitrary(g) % (1 << PAGE_SIZE_BITS) + 1,
        }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let page_size = self.page_size;
        Box::new(
            (1..self.page_count)
                .rev()
                .map(move |page_count| AllocatorParams {
                    page_count,
                    page_size,
                }),
        )
    }
}

enum AllocatorOpTag {
    Allocate,
    Resize,
    Release,
}

#[derive(Clone, Debug)]
enum AllocatorOp {
    /// Allocate `size` units with `occupied_volume` of them in use.
    Allocate { size: usize, occupied_volume: usize },
    /// Resize a live block.
    ///
    /// Given `n` live blocks, the block to resize is at index `index % n`.
    /// With no live blocks, this resizes `None`.
    Resize { index: usize, new_size: usize },
    /// Release a live block, chosen as for `Resize`.
    Release { index: usize },
}

/// Sizes slightly past the largest page, to exercise oversized requests.
fn limited_size(g: &mut Gen) -> usize {
    usize::arbitrary(g) % ((1 << PAGE_SIZE_BITS) + 4)
}

impl Arbitrary for AllocatorOp {
    fn arbitrary(g: &mut Gen) -> Self {
        match g
            .choose(&[
                AllocatorOpTag::Allocate,
                AllocatorOpTag::Resize,
                AllocatorOpTag::Release,
            ])
            .unwrap()
        {
            AllocatorOpTag::Allocate => {
                let size = limited_size(g);
                AllocatorOp::Allocate {
                    size,
                    occupied_volume: usize::arbitrary(g) % (size + 2),
                }
            }
            AllocatorOpTag::Resize => AllocatorOp::Resize {
                index: usize::arbitrary(g),
                new_size: limited_size(g),
            },
            AllocatorOpTag::Release => AllocatorOp::Release {
                index: usize::arbitrary(g),
            },
        }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match *self {
            AllocatorOp::Allocate {
                size,
                occupied_volume,
            } if occupied_volume > 0 => Box::new(core::iter::once(AllocatorOp::Allocate {
                size,
                occupied_volume: 0,
            })),
            _ => quickcheck::empty_shrinker(),
        }
    }
}

/// Drives an allocator with a sequence of operations, tracking the start
/// address of every live block.
struct AllocatorChecker {
    allocator: PagedAllocator,
    live: Vec<Address>,
}

impl AllocatorChecker {
    fn new(params: &AllocatorParams) -> Self {
        AllocatorChecker {
            allocator: params.build(),
            live: Vec::new(),
        }
    }

    fn pick(&self, index: usize) -> Option<(usize, Address)> {
        let len = self.live.len();
        (len != 0).then(|| (index % len, self.live[index % len]))
    }

    fn snapshot(&self) -> (Vec<Page>, usize) {
        (
            self.allocator.inspect().cloned().collect(),
            self.allocator.free_blocks().count(),
        )
    }

    fn do_op(&mut self, op: AllocatorOp) -> bool {
        let before = self.snapshot();

        let res: Result<Address, AllocError> = match op {
            AllocatorOp::Allocate {
                size,
                occupied_volume,
            } => self
                .allocator
                .allocate(size, occupied_volume)
                .map(|page| page.last().unwrap().start()),

            AllocatorOp::Resize { index, new_size } => {
                let picked = self.pick(index);
                let res = self
                    .allocator
                    .resize(picked.map(|(_, addr)| addr), new_size)
                    .map(|page| page.last().unwrap().start());
                if res.is_ok() {
                    if let Some((i, _)) = picked {
                        self.live.swap_remove(i);
                    }
                }
                res
            }

            AllocatorOp::Release { index } => match self.pick(index) {
                Some((i, addr)) => {
                    let res = self.allocator.release(addr).map(|()| addr);
                    if res.is_ok() {
                        self.live.swap_remove(i);
                        return self.check_invariants();
                    }
                    res
                }
                None => return true,
            },
        };

        match res {
            Ok(addr) => self.live.push(addr),
            // Failed operations leave no trace.
            Err(_) => {
                if self.snapshot() != before {
                    return false;
                }
            }
        }

        self.check_invariants()
    }

    fn check_invariants(&self) -> bool {
        let mut blocks = 0;
        for page in self.allocator.inspect() {
            let sum: usize = page.iter().map(Block::size).sum();
            if sum != page.occupied_volume() {
                return false;
            }

            if page.iter().any(|b| b.occupied_volume() > b.size()) {
                return false;
            }

            blocks += page.blocks().len();
        }

        blocks == self.live.len()
    }

    fn run(&mut self, ops: Vec<AllocatorOp>) -> bool {
        ops.into_iter().all(|op| self.do_op(op))
    }
}

fn accounting_holds(params: AllocatorParams, ops: Vec<AllocatorOp>) -> bool {
    AllocatorChecker::new(&params).run(ops)
}

fn release_then_allocate_reuses(params: AllocatorParams, sizes: Vec<u8>, pick: usize) -> bool {
    let mut allocator = params.build();
    let cap = allocator.page_capacity();

    let placed: Vec<Block> = sizes
        .into_iter()
        .filter_map(|s| {
            let size = usize::from(s) % cap + 1;
            allocator
                .allocate(size, 0)
                .ok()
                .map(|page| *page.last().unwrap())
        })
        .collect();

    if placed.is_empty() {
        return true;
    }

    let victim = placed[pick % placed.len()];
    if allocator.release(victim.start()).is_err() {
        return false;
    }

    match allocator.allocate(victim.size(), 0) {
        Ok(page) => page.last().map_or(false, |b| b.same_extent(&victim)),
        Err(_) => false,
    }
}

fn inspect_is_idempotent(params: AllocatorParams, ops: Vec<AllocatorOp>) -> bool {
    let mut checker = AllocatorChecker::new(&params);
    checker.run(ops);

    let alloc = &checker.allocator;
    alloc.inspect().eq(alloc.inspect()) && alloc.inspect().len() == params.page_count
}

#[test]
fn allocator_accounting_holds() {
    let mut qc = QuickCheck::new().max_tests(MAX_TESTS);
    qc.quickcheck(accounting_holds as fn(_, _) -> bool);
}

#[test]
fn released_blocks_are_reused() {
    let mut qc = QuickCheck::new().max_tests(MAX_TESTS);
    qc.quickcheck(release_then_allocate_reuses as fn(_, _, _) -> bool);
}

#[test]
fn inspect_has_no_side_effects() {
    let mut qc = QuickCheck::new().max_tests(MAX_TESTS);
    qc.quickcheck(inspect_is_idempotent as fn(_, _) -> bool);
}

#[test]
fn oversized_requests_always_fail() {
    fn prop(params: AllocatorParams, ops: Vec<AllocatorOp>, excess: u8) -> bool {
        let mut checker = AllocatorChecker::new(&params);
        checker.run(ops);

        let cap = checker.allocator.page_capacity();
        let size = cap + usize::from(excess) + 1;
        matches!(
            checker.allocator.allocate(size, 0),
            Err(AllocError::Oversized { .. })
        )
    }

    let mut qc = QuickCheck::new().max_tests(MAX_TESTS);
    qc.quickcheck(prop as fn(_, _, _) -> bool);
}

// Version sync ================================================================
#[test]
fn html_root_url() {
    version_sync::assert_html_root_url_updated!("src/lib.rs");
}
