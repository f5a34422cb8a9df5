//! Duplicate-free merge of two ascending streams

use std::cmp::Ordering;

/// Merges two ascending iterators into one ascending iterator.
///
/// On each step the lesser head is emitted. Equal heads are emitted once and
/// both sources advance, so the output is the sorted union provided each
/// input is itself free of duplicates. Only the two current heads are held.
pub struct MergedOrderedIterator<A, B, T> {
    left: A,
    right: B,
    left_head: Option<T>,
    right_head: Option<T>,
}

impl<A, B, T> MergedOrderedIterator<A, B, T>
where
    A: Iterator<Item = T>,
    B: Iterator<Item = T>,
    T: Ord,
{
    pub fn new(left: A, right: B) -> Self {
        Self {
            left,
            right,
            left_head: None,
            right_head: None,
        }
    }

    pub fn left_mut(&mut self) -> &mut A {
        &mut self.left
    }

    pub fn right_mut(&mut self) -> &mut B {
        &mut self.right
    }
}

impl<A, B, T> Iterator for MergedOrderedIterator<A, B, T>
where
    A: Iterator<Item = T>,
    B: Iterator<Item = T>,
    T: Ord,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.left_head.is_none() {
            self.left_head = self.left.next();
        }
        if self.right_head.is_none() {
            self.right_head = self.right.next();
        }
        let step = match (&self.left_head, &self.right_head) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(l), Some(r)) => l.cmp(r),
        };
        match step {
            Ordering::Less => self.left_head.take(),
            Ordering::Greater => self.right_head.take(),
            Ordering::Equal => {
                self.right_head = None;
                self.left_head.take()
            }
        }
    }
}
