#![no_main]
use alloc_hater::AllocatorOp;
use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use paged_alloc_hater::PagedSubject;

const MAX_PAGES: usize = 64;
const MAX_PAGE_SIZE: usize = 128;

#[derive(Clone, Debug)]
struct Args {
    page_count: usize,
    page_size: usize,
    ops: Vec<AllocatorOp>,
}

impl Arbitrary<'_> for Args {
    fn arbitrary(un: &mut Unstructured) -> arbitrary::Result<Args> {
        let page_count = usize::arbitrary(un)? % MAX_PAGES;
        let page_size = usize::arbitrary(un)? % MAX_PAGE_SIZE;
        let ops = Vec::arbitrary(un)?;

        Ok(Args {
            page_count,
            page_size,
            ops,
        })
    }
}

fuzz_target!(|args: Args| {
    let Args {
        page_count,
        page_size,
        ops,
    } = args;

    // Zero and oversized configurations are rejected up front.
    let subject = match PagedSubject::with_pages(page_count, page_size) {
        Ok(s) => s,
        Err(_) => return,
    };

    let mut eval = alloc_hater::Evaluator::new(subject);
    eval.evaluate(ops).unwrap();
});
