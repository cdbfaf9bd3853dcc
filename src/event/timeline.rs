//! Merged, time-ordered event storage.
//!
//! Per-pattern event lists are concatenated in declaration order and then
//! stably sorted by offset, so simultaneous hits keep pattern order.

use std::cmp::Ordering;

use super::time_base::Offset;
use super::types::CompiledEvent;

/// The ordered sequence of compiled events for one composition.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline<O: Offset> {
    events: Vec<CompiledEvent<O>>,
    /// End of the longest pattern grid; one loop pass lasts this long.
    span: O,
}

impl<O: Offset> Timeline<O> {
    /// An empty timeline spanning nothing.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            span: O::ZERO,
        }
    }

    /// Merge per-pattern event lists (in declaration order) into one timeline.
    pub fn merge(parts: impl IntoIterator<Item = Vec<CompiledEvent<O>>>, span: O) -> Self {
        let mut events: Vec<CompiledEvent<O>> = parts.into_iter().flatten().collect();
        events.sort_by(|a, b| a.offset.partial_cmp(&b.offset).unwrap_or(Ordering::Equal));
        Self { events, span }
    }

    pub fn events(&self) -> &[CompiledEvent<O>] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompiledEvent<O>> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn span(&self) -> O {
        self.span
    }

    pub fn last_offset(&self) -> Option<O> {
        self.events.last().map(|e| e.offset)
    }

    /// Runs of events that share one instant, in time order.
    pub fn groups(&self) -> Groups<'_, O> {
        Groups {
            rest: &self.events,
        }
    }
}

impl<O: Offset> Default for Timeline<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, O: Offset> IntoIterator for &'a Timeline<O> {
    type Item = &'a CompiledEvent<O>;
    type IntoIter = std::slice::Iter<'a, CompiledEvent<O>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Iterator over slices of simultaneous events.
pub struct Groups<'a, O: Offset> {
    rest: &'a [CompiledEvent<O>],
}

impl<'a, O: Offset> Iterator for Groups<'a, O> {
    type Item = &'a [CompiledEvent<O>];

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.first()?.offset;
        let len = self
            .rest
            .iter()
            .position(|e| !e.offset.coincides(first))
            .unwrap_or(self.rest.len());
        let (group, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(offset: u64, note: u8, pattern: usize) -> CompiledEvent<u64> {
        CompiledEvent {
            offset,
            note,
            velocity: 100,
            pan: 64,
            channel: pattern as u8 + 1,
            pattern,
            step: 120,
        }
    }

    #[test]
    fn empty_timeline() {
        let tl: Timeline<u64> = Timeline::new();
        assert!(tl.is_empty());
        assert_eq!(tl.len(), 0);
        assert_eq!(tl.groups().count(), 0);
        assert_eq!(tl.last_offset(), None);
    }

    #[test]
    fn merge_sorts_by_offset() {
        let tl = Timeline::merge(
            vec![
                vec![hit(0, 36, 0), hit(480, 36, 0)],
                vec![hit(240, 42, 1), hit(720, 42, 1)],
            ],
            960,
        );
        let offsets: Vec<u64> = tl.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 240, 480, 720]);
        assert_eq!(tl.span(), 960);
        assert_eq!(tl.last_offset(), Some(720));
    }

    #[test]
    fn ties_keep_declaration_order() {
        let tl = Timeline::merge(
            vec![
                vec![hit(0, 36, 0), hit(480, 36, 0)],
                vec![hit(0, 38, 1), hit(480, 38, 1)],
                vec![hit(0, 42, 2)],
            ],
            960,
        );
        let notes: Vec<u8> = tl.iter().map(|e| e.note).collect();
        assert_eq!(notes, vec![36, 38, 42, 36, 38]);
    }

    #[test]
    fn groups_split_on_offset() {
        let tl = Timeline::merge(
            vec![
                vec![hit(0, 36, 0), hit(480, 36, 0)],
                vec![hit(0, 42, 1), hit(240, 42, 1)],
            ],
            960,
        );
        let groups: Vec<Vec<u8>> = tl
            .groups()
            .map(|g| g.iter().map(|e| e.note).collect())
            .collect();
        assert_eq!(groups, vec![vec![36, 42], vec![42], vec![36]]);
    }

    #[test]
    fn millisecond_groups_tolerate_rounding() {
        let a = CompiledEvent {
            offset: 461.538_461_538_461_6_f64,
            note: 36,
            velocity: 100,
            pan: 64,
            channel: 1,
            pattern: 0,
            step: 115.38,
        };
        let b = CompiledEvent {
            offset: 461.538_461_538_461_5_f64,
            note: 38,
            ..a
        };
        let tl = Timeline::merge(vec![vec![a], vec![b]], 1846.15);
        assert_eq!(tl.groups().count(), 1);
    }
}
