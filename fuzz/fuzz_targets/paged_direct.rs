#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use paged_alloc::{Address, PagedAllocator};

#[derive(Clone, Debug, Arbitrary)]
enum PagedOp {
    Allocate { size: u8, occupied_volume: u8 },
    Resize { addr: Option<u16>, new_size: u8 },
    Release(u16),
}

#[derive(Clone, Debug, Arbitrary)]
struct Args {
    total_capacity: u16,
    page_count: u8,
    page_size: u8,
    ops: Vec<PagedOp>,
}

// Drives the allocator with raw addresses, most of which name no block.
fuzz_target!(|args: Args| {
    let mut alloc = match PagedAllocator::try_new(
        args.total_capacity.into(),
        args.page_count.into(),
        args.page_size.into(),
    ) {
        Ok(a) => a,
        Err(_) => return,
    };

    for op in args.ops {
        let before = alloc.clone();
        let failed = match op {
            PagedOp::Allocate {
                size,
                occupied_volume,
            } => alloc.allocate(size.into(), occupied_volume.into()).is_err(),
            PagedOp::Resize { addr, new_size } => alloc
                .resize(addr.map(|a| Address::new(a.into())), new_size.into())
                .is_err(),
            PagedOp::Release(addr) => alloc.release(Address::new(addr.into())).is_err(),
        };

        if failed {
            assert!(alloc.inspect().eq(before.inspect()));
            assert_eq!(alloc.free_blocks().count(), before.free_blocks().count());
        }
    }
});
