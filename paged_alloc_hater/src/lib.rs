use alloc_hater::{Census, Subject};
use paged_alloc::{Address, AllocError, AllocInitError, Block, Page, PagedAllocator};

#[derive(Debug)]
pub enum SubjectError {
    Alloc(AllocError),
    /// The allocator reported success but the returned page has no blocks.
    NothingPlaced,
}

impl From<AllocError> for SubjectError {
    fn from(e: AllocError) -> Self {
        SubjectError::Alloc(e)
    }
}

pub struct PagedSubject(PagedAllocator);

impl PagedSubject {
    pub fn new(
        total_capacity: usize,
        page_count: usize,
        page_size: usize,
    ) -> Result<Self, AllocInitError> {
        let a = PagedAllocator::try_new(total_capacity, page_count, page_size)?;
        Ok(PagedSubject(a))
    }

    /// Builds a subject with `page_count` pages of `page_size` units, deriving
    /// the total capacity.
    pub fn with_pages(page_count: usize, page_size: usize) -> Result<Self, AllocInitError> {
        let page_capacity = page_size
            .checked_next_power_of_two()
            .ok_or(AllocInitError::InvalidConfig)?;
        let total = page_capacity
            .checked_mul(page_count)
            .ok_or(AllocInitError::InvalidConfig)?;

        PagedSubject::new(total, page_count, page_size)
    }

    pub fn allocator(&self) -> &PagedAllocator {
        &self.0
    }
}

impl Subject for PagedSubject {
    type Handle = Address;
    type AllocError = SubjectError;

    fn allocate(
        &mut self,
        size: usize,
        occupied_volume: usize,
    ) -> Result<Address, SubjectError> {
        let page = self.0.allocate(size, occupied_volume)?;
        placed(page).ok_or(SubjectError::NothingPlaced)
    }

    fn resize(
        &mut self,
        handle: Option<Address>,
        new_size: usize,
    ) -> Result<Address, SubjectError> {
        let page = self.0.resize(handle, new_size)?;
        placed(page).ok_or(SubjectError::NothingPlaced)
    }

    fn release(&mut self, handle: Address) -> Result<(), SubjectError> {
        Ok(self.0.release(handle)?)
    }

    fn census(&self) -> Census {
        let mut census = Census {
            blocks: 0,
            consistent: true,
        };

        for page in self.0.inspect() {
            let sum: usize = page.iter().map(|b| b.size()).sum();
            census.consistent &= sum == page.occupied_volume();
            census.consistent &= page.iter().all(|b| b.occupied_volume() <= b.size());
            census.blocks += page.blocks().len();
        }

        census
    }
}

// The block placed by a successful allocate or resize is always the last one
// in the returned page.
fn placed(page: &Page) -> Option<Address> {
    page.last().map(Block::start)
}
