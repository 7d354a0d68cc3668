//! Min-priority queue with first-in-first-out tie-breaking.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Entry<T> {
    priority: u64,
    order: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.order == other.order
    }
}

impl<T> Eq for Entry<T> {}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want lowest priority and
        // then oldest insertion on top.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Frontier of not-yet-expanded items.
///
/// Pops the lowest priority first; equal priorities come out in insertion
/// order, so a search over the same inputs always pops the same sequence.
pub struct Frontier<T> {
    heap: BinaryHeap<Entry<T>>,
    next_order: u64,
    high_water: usize,
}

impl<T> Frontier<T> {
    pub fn new() -> Self {
        Frontier {
            heap: BinaryHeap::new(),
            next_order: 0,
            high_water: 0,
        }
    }

    pub fn push(&mut self, priority: u64, item: T) {
        self.heap.push(Entry {
            priority,
            order: self.next_order,
            item,
        });
        self.next_order += 1;
        self.high_water = self.high_water.max(self.heap.len());
    }

    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|entry| entry.item)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Largest size the frontier has reached.
    pub fn high_water(&self) -> usize {
        self.high_water
    }
}

impl<T> Default for Frontier<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_priority_pops_first() {
        let mut frontier = Frontier::new();
        frontier.push(10, "ten");
        frontier.push(5, "five");
        frontier.push(15, "fifteen");
        assert_eq!(frontier.pop(), Some("five"));
        assert_eq!(frontier.pop(), Some("ten"));
        assert_eq!(frontier.pop(), Some("fifteen"));
        assert_eq!(frontier.pop(), None);
    }

    #[test]
    fn ties_pop_in_insertion_order() {
        let mut frontier = Frontier::new();
        for (i, name) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
            frontier.push(if i % 2 == 0 { 1 } else { 2 }, name);
        }
        let order: Vec<&str> = std::iter::from_fn(|| frontier.pop()).collect();
        assert_eq!(order, vec!["a", "c", "e", "b", "d"]);
    }

    #[test]
    fn high_water_survives_pops() {
        let mut frontier = Frontier::new();
        frontier.push(1, ());
        frontier.push(2, ());
        frontier.push(3, ());
        let _ = frontier.pop();
        let _ = frontier.pop();
        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.high_water(), 3);
        assert!(!frontier.is_empty());
    }
}
