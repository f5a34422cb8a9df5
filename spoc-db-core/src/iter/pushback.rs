//! One-element replay over a plain iterator

use crate::error::{Error, Result};

/// Wraps an iterator so the element just returned can be handed back once.
///
/// After `next()` returns `x`, `pushback()` makes the following `next()` return
/// `x` again. A second `pushback()` before that replay is consumed is an
/// `IllegalState` error, as is a pushback before anything was delivered.
pub struct PushbackIterator<I: Iterator> {
    src: I,
    /// Last element handed out
    current: Option<I::Item>,
    /// Element waiting to be replayed
    buffer: Option<I::Item>,
}

impl<I> PushbackIterator<I>
where
    I: Iterator,
    I::Item: Clone,
{
    pub fn new(src: I) -> Self {
        Self {
            src,
            current: None,
            buffer: None,
        }
    }

    /// Replay the element most recently returned by `next()`.
    pub fn pushback(&mut self) -> Result<()> {
        if self.buffer.is_some() {
            return Err(Error::illegal_state("pushback: element already pushed back"));
        }
        match self.current.take() {
            Some(item) => {
                self.buffer = Some(item);
                Ok(())
            }
            None => Err(Error::illegal_state("pushback: nothing to push back")),
        }
    }

    /// True if a pushed-back element is waiting
    pub fn has_pushback(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn get_ref(&self) -> &I {
        &self.src
    }

    pub fn get_mut(&mut self) -> &mut I {
        &mut self.src
    }

    pub fn into_inner(self) -> I {
        self.src
    }
}

impl<I> Iterator for PushbackIterator<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        let item = match self.buffer.take() {
            Some(item) => Some(item),
            None => self.src.next(),
        };
        self.current = item.clone();
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushback_replays_same_element() {
        let mut it = PushbackIterator::new(vec![1, 2, 3].into_iter());
        assert_eq!(it.next(), Some(1));
        it.pushback().unwrap();
        assert_eq!(it.next(), Some(1));
        assert_eq!(it.next(), Some(2));
        it.pushback().unwrap();
        assert_eq!(it.next(), Some(2));
        assert_eq!(it.next(), Some(3));
        assert_eq!(it.next(), None);
    }

    #[test]
    fn double_pushback_is_illegal() {
        let mut it = PushbackIterator::new(vec![1, 2].into_iter());
        it.next();
        it.pushback().unwrap();
        assert!(it.has_pushback());
        assert!(matches!(it.pushback(), Err(Error::IllegalState(_))));
        // the replay is still intact
        assert_eq!(it.next(), Some(1));
    }

    #[test]
    fn pushback_before_next_is_illegal() {
        let mut it = PushbackIterator::new(vec![1].into_iter());
        assert!(it.pushback().is_err());
    }

    #[test]
    fn pushback_after_consuming_replay_is_allowed_again() {
        let mut it = PushbackIterator::new(vec![7, 8].into_iter());
        it.next();
        it.pushback().unwrap();
        it.next();
        it.pushback().unwrap();
        assert_eq!(it.next(), Some(7));
    }
}
