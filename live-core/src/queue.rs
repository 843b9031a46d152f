use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex},
};

/// Result of a non-blocking or blocking `get`.
#[derive(Debug, PartialEq, Eq)]
pub enum GetResult<T> {
    /// Queue was aborted; no packet returned.
    Aborted,
    /// Queue was empty and the call was non-blocking.
    Empty,
    /// A packet was dequeued.
    Packet(T),
}

struct State<T> {
    items: VecDeque<T>,
    aborted: bool,
}

/// Thread-safe FIFO with blocking `get` and broadcast-on-abort semantics.
///
/// Every packet handed to `put` is owned by the queue until `get` hands it back to a
/// caller, or `flush`/`abort`/drop destroys it — there is never a point where two
/// owners can observe the same packet.
pub struct PacketQueue<T> {
    name: &'static str,
    state: Mutex<State<T>>,
    not_empty: Condvar,
}

impl<T> PacketQueue<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(State {
                items: VecDeque::new(),
                aborted: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Appends `pkt` and wakes one waiter. Drops `pkt` instead if the queue is aborted.
    /// Never blocks.
    pub fn put(&self, pkt: T) {
        let mut state = self.state.lock().unwrap();
        if state.aborted {
            return;
        }
        state.items.push_back(pkt);
        self.not_empty.notify_one();
    }

    /// `block=false`: returns `Empty` immediately if nothing is queued.
    /// `block=true`: waits on the condvar until a packet arrives or the queue is aborted.
    pub fn get(&self, block: bool) -> GetResult<T> {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.aborted {
                return GetResult::Aborted;
            }
            if let Some(pkt) = state.items.pop_front() {
                return GetResult::Packet(pkt);
            }
            if !block {
                return GetResult::Empty;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    pub fn size(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /// Drains and drops every queued packet.
    pub fn flush(&self) {
        let mut state = self.state.lock().unwrap();
        state.items.clear();
    }

    /// Sets the abort flag and wakes every blocked waiter. Idempotent.
    pub fn abort(&self) {
        let mut state = self.state.lock().unwrap();
        state.aborted = true;
        self.not_empty.notify_all();
    }

    pub fn is_aborted(&self) -> bool {
        self.state.lock().unwrap().aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread, time::Duration};

    #[test]
    fn empty_blocking_get_unblocks_on_put() {
        let queue = Arc::new(PacketQueue::<i32>::new("test"));
        let q = Arc::clone(&queue);
        let handle = thread::spawn(move || q.get(true));
        thread::sleep(Duration::from_millis(20));
        queue.put(42);
        match handle.join().unwrap() {
            GetResult::Packet(v) => assert_eq!(v, 42),
            other => panic!("expected Packet(42), got {other:?}"),
        }
    }

    #[test]
    fn abort_wakes_all_blocked_getters() {
        let queue = Arc::new(PacketQueue::<i32>::new("test"));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let q = Arc::clone(&queue);
                thread::spawn(move || q.get(true))
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        queue.abort();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), GetResult::Aborted);
        }
        // after abort, put silently drops and get still reports Aborted
        queue.put(7);
        assert_eq!(queue.get(false), GetResult::Aborted);
    }

    #[test]
    fn fifo_order_is_preserved() {
        let queue = PacketQueue::<i32>::new("test");
        for i in 0..5 {
            queue.put(i);
        }
        for i in 0..5 {
            assert_eq!(queue.get(false), GetResult::Packet(i));
        }
        assert_eq!(queue.get(false), GetResult::Empty);
    }

    #[test]
    fn flush_destroys_all_queued_packets() {
        let queue = PacketQueue::<i32>::new("test");
        queue.put(1);
        queue.put(2);
        assert_eq!(queue.size(), 2);
        queue.flush();
        assert_eq!(queue.size(), 0);
    }
}
