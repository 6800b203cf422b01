//! Distribution from the root and gathering back to it.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use ringshift::{
    distribute, gather_blocks, render_section, run_rank, BlockSource, Error, LocalBlock,
    RingTopology, SequenceSource, ShiftConfig, SliceSource, Universe,
};

/// Source that fails when asked for the block of one particular rank.
struct FailingSource {
    fail_at: i32,
}

impl BlockSource<i32> for FailingSource {
    fn next_block(&mut self, rank: i32, block_len: usize) -> ringshift::Result<LocalBlock<i32>> {
        if rank == self.fail_at {
            return Err(Error::InvalidInput(format!("no value for p{rank}")));
        }
        Ok(vec![rank; block_len])
    }
}

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLog {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

/// Source that hands out blocks one element short.
struct ShortSource;

impl BlockSource<u32> for ShortSource {
    fn next_block(&mut self, _rank: i32, block_len: usize) -> ringshift::Result<LocalBlock<u32>> {
        Ok(vec![0; block_len - 1])
    }
}

#[test]
fn every_rank_gets_its_block() {
    let global: Vec<i32> = (0..12).collect();
    let results = Universe::new(4).unwrap().run(|world| {
        let topo = RingTopology::of(world)?;
        distribute(world, &topo, 0, 3, &mut SliceSource::new(&global))
    });
    let blocks: Vec<Vec<i32>> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(
        blocks,
        vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8], vec![9, 10, 11]]
    );
}

#[test]
fn root_need_not_be_rank_zero() {
    let global: Vec<f64> = (0..6).map(f64::from).collect();
    let results = Universe::new(3).unwrap().run(|world| {
        let topo = RingTopology::of(world)?;
        let block = distribute(world, &topo, 2, 2, &mut SliceSource::new(&global))?;
        gather_blocks(world, &topo, 2, &block)
    });
    let gathered = results[2].as_ref().unwrap().as_ref().unwrap();
    assert_eq!(
        gathered,
        &vec![vec![0.0, 1.0], vec![2.0, 3.0], vec![4.0, 5.0]]
    );
    assert!(results[0].as_ref().unwrap().is_none());
}

#[test]
fn failing_source_aborts_everyone() {
    let results = Universe::new(4).unwrap().run(|world| {
        let topo = RingTopology::of(world)?;
        distribute(world, &topo, 0, 2, &mut FailingSource { fail_at: 2 })
    });
    assert_eq!(
        results[0].as_ref().unwrap_err(),
        &Error::InvalidInput("no value for p2".into())
    );
    for result in &results[1..] {
        assert_eq!(result.as_ref().unwrap_err(), &Error::Aborted(2));
    }
}

#[test]
fn short_block_is_refused_at_the_root() {
    let results = Universe::new(2).unwrap().run(|world| {
        let topo = RingTopology::of(world)?;
        distribute(world, &topo, 0, 3, &mut ShortSource)
    });
    assert!(matches!(
        results[0].as_ref().unwrap_err(),
        Error::InvalidInput(_)
    ));
    assert!(results[1].as_ref().unwrap_err().is_abort());
}

#[test]
fn single_rank_keeps_its_own_block() {
    let results = Universe::new(1)
        .unwrap()
        .run(|world| run_rank(world, &ShiftConfig::new(4, 1), 0, &mut SequenceSource::new()));
    let outcome = results[0].as_ref().unwrap().as_ref().unwrap();
    assert_eq!(outcome.input, vec![vec![1, 2, 3, 4]]);
    assert_eq!(outcome.shifted, vec![vec![4, 1, 2, 3]]);
    assert_eq!(outcome.report.messages_sent, 0);
}

#[test]
fn rendered_output_lists_ranks_in_order() {
    let results = Universe::new(4)
        .unwrap()
        .run(|world| run_rank(world, &ShiftConfig::new(2, 1), 0, &mut SequenceSource::new()));
    let outcome = results[0].as_ref().unwrap().as_ref().unwrap();
    assert_eq!(
        render_section("Input array:", &outcome.input),
        "Input array:\n|  1|  2\n|  3|  4\n|  5|  6\n|  7|  8\n"
    );
    assert_eq!(
        render_section("after:", &outcome.shifted),
        "after:\n|  8|  1\n|  2|  3\n|  4|  5\n|  6|  7\n"
    );
}

#[test]
fn bad_input_is_silent_at_warn_level() {
    let log = CapturedLog::default();
    let sink = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish();

    let results = tracing::subscriber::with_default(subscriber, || {
        let results = Universe::new(3).unwrap().run(|world| {
            let topo = RingTopology::of(world)?;
            distribute(world, &topo, 0, 1, &mut FailingSource { fail_at: 1 })
        });
        // Rank threads do log to this subscriber.
        Universe::new(2).unwrap().run(|world| {
            tracing::warn!(rank = world.rank(), "rank thread marker");
            Ok(())
        });
        results
    });

    assert!(results[0].is_err());
    assert!(results[1..].iter().all(|r| r.as_ref().unwrap_err().is_abort()));
    let text = log.text();
    assert_eq!(text.matches("rank thread marker").count(), 2, "{text}");
    assert_eq!(text.lines().count(), 2, "{text}");
}
