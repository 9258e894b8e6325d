//! Priority queue of pending prefetch commands.
//!
//! Commands are kept sorted by priority rank, then by creation time, so the
//! head is always the most urgent and oldest command. At most one command per
//! page is queued at a time.

use std::collections::VecDeque;

use super::command::{CommandId, PrefetchCommand};

/// Ordered collection of pending commands with page-level dedup.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    commands: VecDeque<PrefetchCommand>,
}

impl PriorityQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a command at its sorted position.
    ///
    /// Returns `false` and leaves the queue untouched if a command for the
    /// same page is already queued.
    pub fn enqueue(&mut self, command: PrefetchCommand) -> bool {
        if self.contains_page(command.page()) {
            return false;
        }

        // Insert after every command with an equal or smaller key so that
        // equal keys stay FIFO.
        let key = sort_key(&command);
        let position = self
            .commands
            .iter()
            .position(|queued| sort_key(queued) > key)
            .unwrap_or(self.commands.len());
        self.commands.insert(position, command);
        true
    }

    /// Removes and returns the head of the queue.
    pub fn dequeue(&mut self) -> Option<PrefetchCommand> {
        self.commands.pop_front()
    }

    /// Returns the head without removing it.
    pub fn peek(&self) -> Option<&PrefetchCommand> {
        self.commands.front()
    }

    /// Aborts and removes every command for `page`.
    ///
    /// Returns the ids of the removed commands.
    pub fn remove_by_page(&mut self, page: u32) -> Vec<CommandId> {
        let mut removed = Vec::new();
        self.commands.retain(|command| {
            if command.page() != page {
                return true;
            }
            command.abort_handle().abort();
            removed.push(command.id().clone());
            false
        });
        removed
    }

    /// Aborts and removes every queued command.
    pub fn clear(&mut self) -> Vec<CommandId> {
        self.commands
            .drain(..)
            .map(|command| {
                command.abort_handle().abort();
                command.id().clone()
            })
            .collect()
    }

    /// Removes commands whose handles were aborted while queued.
    ///
    /// They would be skipped by the processor anyway; purging them lets the
    /// same pages be queued again right away.
    pub fn remove_aborted(&mut self) -> Vec<CommandId> {
        let mut removed = Vec::new();
        self.commands.retain(|command| {
            if command.can_execute() {
                return true;
            }
            removed.push(command.id().clone());
            false
        });
        removed
    }

    /// Returns true if a command for `page` is queued.
    pub fn contains_page(&self, page: u32) -> bool {
        self.commands.iter().any(|command| command.page() == page)
    }

    /// Queued pages in execution order.
    pub fn pages(&self) -> Vec<u32> {
        self.commands.iter().map(PrefetchCommand::page).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn sort_key(command: &PrefetchCommand) -> (u8, std::time::Instant) {
    (command.priority().rank(), command.created_at())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefetch::abort::AbortHandle;
    use crate::prefetch::command::{prefetch_fn, PrefetchPriority, PrefetchStrategy};
    use proptest::prelude::*;
    use std::time::{Duration, Instant};

    fn command_at(page: u32, priority: PrefetchPriority, created_at: Instant) -> PrefetchCommand {
        PrefetchCommand::new(
            CommandId::for_page(page, 0),
            page,
            priority,
            PrefetchStrategy::Immediate,
            AbortHandle::new(),
            prefetch_fn(|_abort| async { Ok(()) }),
        )
        .with_created_at(created_at)
    }

    fn drain_pages(queue: &mut PriorityQueue) -> Vec<u32> {
        std::iter::from_fn(|| queue.dequeue())
            .map(|command| command.page())
            .collect()
    }

    #[test]
    fn test_dequeue_empty_returns_none() {
        let mut queue = PriorityQueue::new();
        assert!(queue.dequeue().is_none());
        assert!(queue.peek().is_none());
    }

    #[test]
    fn test_priority_ordering() {
        let base = Instant::now();
        let mut queue = PriorityQueue::new();
        assert!(queue.enqueue(command_at(1, PrefetchPriority::Low, base)));
        assert!(queue.enqueue(command_at(
            2,
            PrefetchPriority::High,
            base + Duration::from_millis(1)
        )));
        assert!(queue.enqueue(command_at(
            3,
            PrefetchPriority::Normal,
            base + Duration::from_millis(2)
        )));

        assert_eq!(drain_pages(&mut queue), vec![2, 3, 1]);
    }

    #[test]
    fn test_fifo_within_same_priority() {
        let base = Instant::now();
        let mut queue = PriorityQueue::new();
        for (offset, page) in [10u32, 11, 12].iter().enumerate() {
            queue.enqueue(command_at(
                *page,
                PrefetchPriority::Normal,
                base + Duration::from_millis(offset as u64),
            ));
        }

        assert_eq!(drain_pages(&mut queue), vec![10, 11, 12]);
    }

    #[test]
    fn test_equal_timestamps_keep_insertion_order() {
        let base = Instant::now();
        let mut queue = PriorityQueue::new();
        queue.enqueue(command_at(9, PrefetchPriority::Normal, base));
        queue.enqueue(command_at(4, PrefetchPriority::Normal, base));

        // No page-number tiebreak.
        assert_eq!(drain_pages(&mut queue), vec![9, 4]);
    }

    #[test]
    fn test_duplicate_page_rejected() {
        let base = Instant::now();
        let mut queue = PriorityQueue::new();
        assert!(queue.enqueue(command_at(3, PrefetchPriority::Normal, base)));
        assert!(!queue.enqueue(command_at(
            3,
            PrefetchPriority::High,
            base + Duration::from_millis(1)
        )));

        assert_eq!(queue.len(), 1);
        let head = queue.dequeue().unwrap();
        assert_eq!(head.page(), 3);
        assert_eq!(head.priority(), PrefetchPriority::Normal);
    }

    #[test]
    fn test_remove_by_page_aborts_removed_command() {
        let base = Instant::now();
        let mut queue = PriorityQueue::new();
        let target = command_at(5, PrefetchPriority::Normal, base);
        let handle = target.abort_handle().clone();
        queue.enqueue(target);
        queue.enqueue(command_at(6, PrefetchPriority::Normal, base));

        let removed = queue.remove_by_page(5);

        assert_eq!(removed.len(), 1);
        assert!(!queue.contains_page(5));
        assert!(queue.contains_page(6));
        assert!(handle.is_aborted());
        assert!(handle.is_aborted(), "abort state must not revert");
    }

    #[test]
    fn test_remove_by_page_missing_returns_nothing() {
        let mut queue = PriorityQueue::new();
        queue.enqueue(command_at(1, PrefetchPriority::Low, Instant::now()));
        assert!(queue.remove_by_page(2).is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_aborted_frees_page_for_requeue() {
        let base = Instant::now();
        let mut queue = PriorityQueue::new();
        let stale = command_at(8, PrefetchPriority::Normal, base);
        stale.abort_handle().abort();
        queue.enqueue(stale);
        queue.enqueue(command_at(9, PrefetchPriority::Normal, base));

        assert_eq!(queue.remove_aborted().len(), 1);
        assert_eq!(queue.pages(), vec![9]);
        assert!(queue.enqueue(command_at(8, PrefetchPriority::High, base)));
    }

    #[test]
    fn test_clear_aborts_everything() {
        let base = Instant::now();
        let mut queue = PriorityQueue::new();
        let first = command_at(1, PrefetchPriority::High, base);
        let second = command_at(2, PrefetchPriority::Low, base);
        let handles = [first.abort_handle().clone(), second.abort_handle().clone()];
        queue.enqueue(first);
        queue.enqueue(second);

        assert_eq!(queue.clear().len(), 2);
        assert!(queue.is_empty());
        assert!(handles.iter().all(AbortHandle::is_aborted));
    }

    fn priority_strategy() -> impl Strategy<Value = PrefetchPriority> {
        prop_oneof![
            Just(PrefetchPriority::High),
            Just(PrefetchPriority::Normal),
            Just(PrefetchPriority::Low),
        ]
    }

    proptest! {
        /// Property: dequeue order is non-decreasing in (rank, created_at).
        #[test]
        fn prop_dequeue_respects_rank_then_age(
            entries in prop::collection::vec((priority_strategy(), 0u64..50), 1..40),
        ) {
            let base = Instant::now();
            let mut queue = PriorityQueue::new();
            for (page, (priority, offset)) in entries.iter().enumerate() {
                let created = base + Duration::from_millis(*offset);
                prop_assert!(queue.enqueue(command_at(page as u32 + 1, *priority, created)));
            }

            let mut previous: Option<(u8, Instant)> = None;
            while let Some(command) = queue.dequeue() {
                let key = (command.priority().rank(), command.created_at());
                if let Some(prev) = previous {
                    prop_assert!(prev <= key);
                }
                previous = Some(key);
            }
        }

        /// Property: a rejected duplicate never changes the queue size.
        #[test]
        fn prop_duplicate_page_keeps_size(
            pages in prop::collection::vec(1u32..20, 1..40),
        ) {
            let mut queue = PriorityQueue::new();
            let mut distinct = std::collections::HashSet::new();
            for page in pages {
                let before = queue.len();
                let accepted = queue.enqueue(command_at(page, PrefetchPriority::Normal, Instant::now()));
                prop_assert_eq!(accepted, distinct.insert(page));
                if !accepted {
                    prop_assert_eq!(queue.len(), before);
                }
            }
            prop_assert_eq!(queue.len(), distinct.len());
        }
    }
}
