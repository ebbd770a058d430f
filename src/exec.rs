//! Driving an executor across successive matches.

use crate::api::Match;
use crate::error::MatchError;

/// A match, and the position from which the following search resumes.
/// `resume` is None once the input is exhausted.
#[derive(Debug)]
pub struct Found {
    pub mat: Match,
    pub resume: Option<usize>,
}

/// Something which can search an input from a given position.
/// Executors own their input, so lifetimes stay out of the iterator.
pub trait MatchProducer: core::fmt::Debug {
    /// Find the leftmost match beginning at or after \p pos.
    fn next_match(&mut self, pos: usize) -> Result<Option<Found>, MatchError>;
}

/// Non-overlapping matches of a producer. An error is yielded once, and
/// ends the iteration.
#[derive(Debug)]
pub struct Matches<Producer: MatchProducer> {
    producer: Producer,
    resume: Option<usize>,
}

impl<Producer: MatchProducer> Matches<Producer> {
    pub fn new(producer: Producer, start: usize) -> Self {
        Matches {
            producer,
            resume: Some(start),
        }
    }
}

impl<Producer: MatchProducer> Iterator for Matches<Producer> {
    type Item = Result<Match, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.resume.take()?;
        match self.producer.next_match(pos) {
            Ok(found) => found.map(|Found { mat, resume }| {
                self.resume = resume;
                Ok(mat)
            }),
            Err(err) => Some(Err(err)),
        }
    }
}
