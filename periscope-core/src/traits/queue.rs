//! Deferred-job queue
//!
//! Interrupt handlers hand work to the single job consumer through a bounded
//! queue. Enqueueing never blocks: a full queue is reported to the caller,
//! which treats it as a hard fault.

use heapless::Deque;

/// The queue had no free slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueFull;

/// Non-blocking producer side of a FIFO job queue
pub trait JobQueue<J> {
    /// Push a job, failing immediately when the queue is full
    fn try_enqueue(&mut self, job: J) -> Result<(), QueueFull>;
}

impl<J, const N: usize> JobQueue<J> for Deque<J, N> {
    fn try_enqueue(&mut self, job: J) -> Result<(), QueueFull> {
        self.push_back(job).map_err(|_| QueueFull)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deque_reports_full() {
        let mut queue: Deque<u8, 2> = Deque::new();
        assert_eq!(queue.try_enqueue(1), Ok(()));
        assert_eq!(queue.try_enqueue(2), Ok(()));
        assert_eq!(queue.try_enqueue(3), Err(QueueFull));
        assert_eq!(queue.pop_front(), Some(1));
    }
}
