//! Deferred-apply primitive
//!
//! All coordination in this crate is cooperative and single-threaded: the
//! host supplies a [`Scheduler`] that runs a closure "after the current
//! tick", the way a digest/microtask queue would. [`TickScheduler`] is the
//! in-crate implementation for tests and hosts that pump manually.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Host-provided "run after the current tick" capability
pub trait Scheduler {
    fn defer(&self, task: Box<dyn FnOnce()>);
}

/// Manually pumped FIFO scheduler.
///
/// Tasks deferred while a tick is running land in the next tick, so a task
/// that re-defers itself cannot starve the pump.
#[derive(Default)]
pub struct TickScheduler {
    queue: RefCell<VecDeque<Box<dyn FnOnce()>>>,
}

impl TickScheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run every task queued at the start of this call; returns how many ran.
    pub fn run_tick(&self) -> usize {
        let batch: Vec<_> = self.queue.borrow_mut().drain(..).collect();
        let count = batch.len();
        for task in batch {
            task();
        }
        count
    }

    /// Pump ticks until the queue stays empty; returns total tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.run_tick();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }
}

impl Scheduler for TickScheduler {
    fn defer(&self, task: Box<dyn FnOnce()>) {
        self.queue.borrow_mut().push_back(task);
    }
}
