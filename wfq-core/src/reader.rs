//! Batch reader: pulls arrivals up to a time bound, driving the channel table and
//! ready heap as it goes (§4.E).

use std::io::{self, BufRead};

use crate::arrival::{parse_line, Arrival};
use crate::channel::ChannelTable;
use crate::error::ScheduleError;
use crate::heap::ReadyHeap;

/// Reads arrivals off a line-oriented source, holding at most one arrival in a
/// look-ahead slot (§9: "optional look-ahead buffer of one arrival").
pub struct TraceReader<R> {
    lines: io::Lines<R>,
    line_number: u64,
    lookahead: Option<Arrival>,
    exhausted: bool,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            lines: source.lines(),
            line_number: 0,
            lookahead: None,
            exhausted: false,
        }
    }

    /// Ensure the look-ahead slot is filled, unless the underlying source is
    /// exhausted. Every line must parse as an arrival; there is no tolerated shape
    /// besides one.
    fn fill_lookahead(&mut self) -> Result<(), ScheduleError> {
        if self.lookahead.is_none() && !self.exhausted {
            match self.lines.next() {
                None => self.exhausted = true,
                Some(line) => {
                    let line = line?;
                    self.line_number += 1;
                    self.lookahead = Some(parse_line(self.line_number, &line)?);
                }
            }
        }
        Ok(())
    }

    /// Consume arrivals in input order while the look-ahead's time satisfies
    /// `T <= t_max`, tagging and enqueueing each one under virtual time `v`. Returns
    /// the number of arrivals consumed.
    #[tracing::instrument(level = "trace", skip(self, table, heap))]
    pub fn read_until(
        &mut self,
        t_max: u64,
        table: &mut ChannelTable,
        heap: &mut ReadyHeap,
        v: f64,
    ) -> Result<usize, ScheduleError> {
        let mut consumed = 0usize;
        loop {
            self.fill_lookahead()?;
            let ready = matches!(&self.lookahead, Some(a) if a.time <= t_max);
            if !ready {
                break;
            }
            let arrival = self.lookahead.take().expect("checked Some above");

            let index = table.lookup_or_create(&arrival.key);
            let channel = table.get_mut(index);
            if let Some(weight) = arrival.weight {
                channel.set_weight(weight);
            }
            let (finish_tag, was_empty) =
                channel.enqueue(v, arrival.time, arrival.length, arrival.weight);
            if was_empty {
                heap.push(finish_tag, index);
            }
            consumed += 1;
        }
        Ok(consumed)
    }

    /// Pull exactly the set of simultaneously-arriving packets at the earliest
    /// unconsumed time. `Ok(0)` means the source has no more arrivals.
    pub fn read_batch(
        &mut self,
        table: &mut ChannelTable,
        heap: &mut ReadyHeap,
        v: f64,
    ) -> Result<usize, ScheduleError> {
        self.fill_lookahead()?;
        let t_max = match &self.lookahead {
            Some(arrival) => arrival.time,
            None => return Ok(0),
        };
        self.read_until(t_max, table, heap, v)
    }

    /// Drain across multiple batch boundaries up to `t_max`.
    pub fn read_all_up_to(
        &mut self,
        t_max: u64,
        table: &mut ChannelTable,
        heap: &mut ReadyHeap,
        v: f64,
    ) -> Result<usize, ScheduleError> {
        let mut total = 0usize;
        loop {
            let consumed = self.read_until(t_max, table, heap, v)?;
            if consumed == 0 {
                break;
            }
            total += consumed;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_batch_pulls_only_the_earliest_simultaneous_arrivals() {
        let input = "0 A a B b 100\n0 C c D d 100\n50 A a B b 100\n";
        let mut reader = TraceReader::new(input.as_bytes());
        let mut table = ChannelTable::new();
        let mut heap = ReadyHeap::new();

        let consumed = reader.read_batch(&mut table, &mut heap, 0.0).unwrap();
        assert_eq!(consumed, 2);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn read_until_retains_arrivals_past_the_bound() {
        let input = "0 A a B b 100\n200 C c D d 100\n";
        let mut reader = TraceReader::new(input.as_bytes());
        let mut table = ChannelTable::new();
        let mut heap = ReadyHeap::new();

        let consumed = reader.read_until(100, &mut table, &mut heap, 0.0).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(heap.len(), 1);

        let consumed = reader.read_until(100, &mut table, &mut heap, 0.0).unwrap();
        assert_eq!(consumed, 0);
    }

    #[test]
    fn blank_line_between_arrivals_is_fatal() {
        let input = "0 A a B b 100\n\n100 C c D d 100\n";
        let mut reader = TraceReader::new(input.as_bytes());
        let mut table = ChannelTable::new();
        let mut heap = ReadyHeap::new();

        let consumed = reader.read_until(0, &mut table, &mut heap, 0.0).unwrap();
        assert_eq!(consumed, 1);
        let err = reader.read_until(1000, &mut table, &mut heap, 0.0).unwrap_err();
        assert!(matches!(err, ScheduleError::Parse(_)));
    }

    #[test]
    fn comment_line_is_fatal() {
        let input = "# a note\n0 A a B b 100\n";
        let mut reader = TraceReader::new(input.as_bytes());
        let mut table = ChannelTable::new();
        let mut heap = ReadyHeap::new();

        let err = reader.read_until(1000, &mut table, &mut heap, 0.0).unwrap_err();
        assert!(matches!(err, ScheduleError::Parse(_)));
    }

    #[test]
    fn propagates_malformed_line_errors() {
        let input = "0 A a B b\n";
        let mut reader = TraceReader::new(input.as_bytes());
        let mut table = ChannelTable::new();
        let mut heap = ReadyHeap::new();

        let err = reader.read_until(1000, &mut table, &mut heap, 0.0).unwrap_err();
        assert!(matches!(err, ScheduleError::Parse(_)));
    }
}
