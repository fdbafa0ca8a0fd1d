//! A small library for ~~hating on~~ evaluating the correctness of simulated
//! allocators.
//!
//! An [`Evaluator`] drives a [`Subject`] with a sequence of [`AllocatorOp`]s,
//! keeping its own list of live blocks, and after every operation asks the
//! subject for a [`Census`] of what it actually holds. Any disagreement
//! between the two, or a failure to release a block the evaluator knows to be
//! live, stops the evaluation.

use std::fmt::Debug;

use arbitrary::{Arbitrary, Unstructured};

/// Largest block size generated by [`AllocatorOp`]'s `Arbitrary` impl.
///
/// Slightly larger than the largest page a subject is expected to have, so
/// that oversized requests are exercised too.
pub const MAX_OP_SIZE: usize = 160;

#[derive(Arbitrary)]
enum AllocatorOpTag {
    Alloc,
    Resize,
    Release,
}

#[derive(Clone, Debug)]
pub enum AllocatorOp {
    /// Allocates a block of `size` units, `occupied_volume` of them in use.
    Alloc { size: usize, occupied_volume: usize },
    /// Resizes a live block to `new_size` units.
    ///
    /// Given `n` live blocks, the block to resize is at index `idx % n`. With
    /// no live blocks, the subject is asked to resize nothing.
    Resize { idx: usize, new_size: usize },
    /// Releases a live block, chosen as for `Resize`.
    Release(usize),
}

impl Arbitrary<'_> for AllocatorOp {
    fn arbitrary(u: &mut Unstructured<'_>) -> arbitrary::Result<Self> {
        let tag = AllocatorOpTag::arbitrary(u)?;

        let op = match tag {
            AllocatorOpTag::Alloc => {
                let size = usize::arbitrary(u)? % MAX_OP_SIZE;
                let occupied_volume = usize::arbitrary(u)? % (size + 2);
                AllocatorOp::Alloc {
                    size,
                    occupied_volume,
                }
            }
            AllocatorOpTag::Resize => AllocatorOp::Resize {
                idx: usize::arbitrary(u)?,
                new_size: usize::arbitrary(u)? % MAX_OP_SIZE,
            },
            AllocatorOpTag::Release => AllocatorOp::Release(usize::arbitrary(u)?),
        };

        Ok(op)
    }
}

/// What a subject reports about its own state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Census {
    /// The number of blocks currently placed.
    pub blocks: usize,
    /// Whether every container's bookkeeping agrees with its contents.
    pub consistent: bool,
}

pub trait Subject {
    /// Identifies a placed block.
    type Handle: Copy + Debug;
    type AllocError: Debug;

    /// Places a block of `size` units with `occupied_volume` of them in use.
    fn allocate(
        &mut self,
        size: usize,
        occupied_volume: usize,
    ) -> Result<Self::Handle, Self::AllocError>;

    /// Resizes the block identified by `handle`, or places a new one if
    /// `handle` is `None`.
    ///
    /// On success, the returned handle replaces `handle`.
    fn resize(
        &mut self,
        handle: Option<Self::Handle>,
        new_size: usize,
    ) -> Result<Self::Handle, Self::AllocError>;

    /// Releases the block identified by `handle`.
    fn release(&mut self, handle: Self::Handle) -> Result<(), Self::AllocError>;

    /// Takes stock of the subject's state.
    fn census(&self) -> Census;
}

/// A list of live blocks.
#[derive(Debug)]
pub struct Blocks<H> {
    blocks: Vec<H>,
}

impl<H: Copy> Blocks<H> {
    pub fn new() -> Blocks<H> {
        Blocks { blocks: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn push(&mut self, handle: H) {
        self.blocks.push(handle);
    }

    /// Returns the index and handle selected by `idx`, if any block is live.
    pub fn get_modulo(&self, idx: usize) -> Option<(usize, H)> {
        let len = self.blocks.len();
        (len != 0).then(|| (idx % len, self.blocks[idx % len]))
    }

    pub fn remove(&mut self, idx: usize) -> H {
        self.blocks.swap_remove(idx)
    }
}

impl<H: Copy> Default for Blocks<H> {
    fn default() -> Self {
        Blocks::new()
    }
}

#[derive(Debug)]
pub struct Evaluator<S: Subject> {
    subject: S,
}

#[derive(Clone, Debug)]
pub struct Failed {
    pub completed: Vec<AllocatorOp>,
    pub failed_op: AllocatorOp,
    pub reason: FailReason,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailReason {
    /// A live block could not be released.
    ReleaseRejected,
    /// The subject holds a different number of blocks than were handed out.
    BlockCountMismatch { expected: usize, found: usize },
    /// The subject's bookkeeping disagrees with its contents.
    Inconsistent,
}

impl<S: Subject> Evaluator<S> {
    pub fn new(subject: S) -> Evaluator<S> {
        Evaluator { subject }
    }

    pub fn subject(&self) -> &S {
        &self.subject
    }

    pub fn into_subject(self) -> S {
        self.subject
    }

    pub fn evaluate<I>(&mut self, ops: I) -> Result<(), Failed>
    where
        I: IntoIterator<Item = AllocatorOp>,
    {
        let mut completed = Vec::new();
        let mut blocks = Blocks::new();

        for op in ops {
            let outcome = match op {
                AllocatorOp::Alloc {
                    size,
                    occupied_volume,
                } => {
                    if let Ok(h) = self.subject.allocate(size, occupied_volume) {
                        blocks.push(h);
                    }
                    Ok(())
                }

                AllocatorOp::Resize { idx, new_size } => {
                    let picked = blocks.get_modulo(idx);
                    if let Ok(h) = self.subject.resize(picked.map(|(_, h)| h), new_size) {
                        if let Some((i, _)) = picked {
                            blocks.remove(i);
                        }
                        blocks.push(h);
                    }
                    Ok(())
                }

                AllocatorOp::Release(raw_idx) => match blocks.get_modulo(raw_idx) {
                    Some((i, h)) => match self.subject.release(h) {
                        Ok(()) => {
                            blocks.remove(i);
                            Ok(())
                        }
                        Err(_) => Err(FailReason::ReleaseRejected),
                    },
                    None => Ok(()),
                },
            };

            let outcome = outcome.and_then(|()| self.check(&blocks));
            if let Err(reason) = outcome {
                return Err(Failed {
                    completed,
                    failed_op: op,
                    reason,
                });
            }

            completed.push(op);
        }

        Ok(())
    }

    fn check(&self, blocks: &Blocks<S::Handle>) -> Result<(), FailReason> {
        let census = self.subject.census();

        if census.blocks != blocks.len() {
            return Err(FailReason::BlockCountMismatch {
                expected: blocks.len(),
                found: census.blocks,
            });
        }

        if !census.consistent {
            return Err(FailReason::Inconsistent);
        }

        Ok(())
    }
}
