//! The event-driven scheduler loop that interleaves arrivals and departures and
//! emits the transmission schedule (§4.F).

use std::io::{BufRead, Write};

use crate::channel::ChannelTable;
use crate::error::ScheduleError;
use crate::heap::ReadyHeap;
use crate::reader::TraceReader;

/// Runs one trace through to completion, owning the channel table, ready heap and
/// look-ahead reader for the duration of the run (§9: no module-level globals).
///
/// Generic over `BufRead`/`Write` so the exact same code path drives both the
/// stdin/stdout process entry point and in-process tests against byte buffers.
pub struct Scheduler<R> {
    reader: TraceReader<R>,
    table: ChannelTable,
    heap: ReadyHeap,
    /// Simulated-now: the wall-clock analog used only for the output timestamp.
    now: u64,
    /// System virtual time, non-decreasing across the run.
    vtime: f64,
}

impl<R: BufRead> Scheduler<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: TraceReader::new(source),
            table: ChannelTable::new(),
            heap: ReadyHeap::new(),
            now: 0,
            vtime: 0.0,
        }
    }

    /// Run the scheduling loop to completion, writing one line per transmitted
    /// packet to `output`. Returns the number of packets emitted.
    #[tracing::instrument(level = "debug", skip(self, output))]
    pub fn run_to_completion<W: Write>(mut self, output: &mut W) -> Result<u64, ScheduleError> {
        let mut emitted = 0u64;

        loop {
            if self.heap.is_empty() {
                let consumed = self
                    .reader
                    .read_batch(&mut self.table, &mut self.heap, self.vtime)?;
                if consumed == 0 {
                    break;
                }
                // Idle fast-forward: jump straight to the earliest arrival just read,
                // without charging the gap against any channel (§4.F step 1).
                let earliest = self
                    .heap_front_arrival_time()
                    .expect("read_batch pushed at least one channel onto the heap");
                if earliest > self.now {
                    tracing::trace!(from = self.now, to = earliest, "idle fast-forward");
                }
                self.now = self.now.max(earliest);
            }

            let (finish_tag, index) = self.heap.pop().expect("heap checked non-empty above");
            self.vtime = self.vtime.max(finish_tag);

            let channel = self.table.get_mut(index);
            let packet = channel
                .pop_front()
                .expect("heap entries always reference a non-empty channel");

            write_line(output, self.now, &channel.key, &packet)?;
            emitted += 1;

            self.now += packet.length;

            if !channel.is_empty() {
                let head_finish_tag = channel
                    .front()
                    .expect("just checked non-empty")
                    .finish_tag;
                self.heap.push(head_finish_tag, index);
            }

            self.reader
                .read_all_up_to(self.now, &mut self.table, &mut self.heap, self.vtime)?;
        }

        Ok(emitted)
    }

    /// The arrival time of the packet now sitting at the head of the channel on top
    /// of the heap, without popping it — used only to compute the idle fast-forward
    /// target in step 1 of the loop.
    fn heap_front_arrival_time(&mut self) -> Option<u64> {
        let (_, index) = self.heap.pop()?;
        let channel = self.table.get(index);
        let time = channel.front().map(|p| p.arrival_time);
        let finish_tag = channel.front().map(|p| p.finish_tag).unwrap_or_default();
        self.heap.push(finish_tag, index);
        time
    }
}

fn write_line<W: Write>(
    output: &mut W,
    now: u64,
    key: &crate::arrival::ConnectionKey,
    packet: &crate::channel::QueuedPacket,
) -> Result<(), ScheduleError> {
    match packet.weight_literal {
        Some(weight) => writeln!(
            output,
            "{now}: {} {key} {} {weight:.2}",
            packet.arrival_time, packet.length
        )?,
        None => writeln!(
            output,
            "{now}: {} {key} {}",
            packet.arrival_time, packet.length
        )?,
    }
    Ok(())
}

/// Convenience entry point: run a trace read from `input` through to completion,
/// writing the schedule to `output`.
pub fn run_to_completion<R: BufRead, W: Write>(
    input: R,
    output: &mut W,
) -> Result<u64, ScheduleError> {
    Scheduler::new(input).run_to_completion(output)
}
