use std::sync::mpsc::Sender;
use std::thread;
use std::time::Instant;
use log::{info, warn};
use crate::config::{resolve_channel_names, GraphConfig};
use crate::drivers::aggregator::SampleAggregator;
use crate::drivers::buffer::RingBuffer;
use crate::drivers::discovery::{Discovery, StreamInfo};
use crate::drivers::pipeline::{SnapshotConsumer, TickReport, UpdateCycle};
use crate::drivers::prefill::PrefillSequencer;
use crate::drivers::source::ChunkSource;
use crate::drivers::StreamError;
use crate::types::{ConnectionState, SessionEvent, StopSignal};
/// One stream connection: `Connecting -> Prefilling -> Streaming -> Closed`.
pub struct Session<S: ChunkSource, C: SnapshotConsumer> {
    info: StreamInfo,
    state: ConnectionState,
    buffer: RingBuffer,
    cycle: UpdateCycle<S, C>,
    channel_names: Vec<String>,
    config: GraphConfig,
    stop: StopSignal,
    events: Option<Sender<SessionEvent>>,
}
impl<C: SnapshotConsumer> Session<Box<dyn ChunkSource + Send>, C> {
    /// Resolves `config.stream_name` and opens the first match.
    pub fn connect(
        discovery: &dyn Discovery,
        config: &GraphConfig,
        consumer: C,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        let name = config
            .stream_name
            .clone()
            .ok_or_else(|| StreamError::Config("no stream name given".into()))?;
        let mut found = discovery.resolve(&name, config.discovery_timeout())?;
        if found.is_empty() {
            return Err(StreamError::StreamNotFound { name });
        }
        let info = found.remove(0);
        info!("connecting to stream: {}", info.compact_id());
        let source = discovery.open(&info)?;
        Self::new(info, source, config, consumer)
    }
}
impl<S: ChunkSource, C: SnapshotConsumer> Session<S, C> {
    pub fn new(
        info: StreamInfo,
        source: S,
        config: &GraphConfig,
        consumer: C,
    ) -> Result<Self, StreamError> {
        config.validate()?;
        let channel_count = source.channel_count();
        let buffer = RingBuffer::with_clock(config.buffer_len, channel_count)?;
        let channel_names = resolve_channel_names(config.channel_names.as_deref(), channel_count);
        let aggregator =
            SampleAggregator::new(source).with_max_samples(config.max_samples_per_drain);
        Ok(Self {
            info,
            state: ConnectionState::Connecting,
            buffer,
            cycle: UpdateCycle::new(aggregator, consumer),
            channel_names,
            config: config.clone(),
            stop: StopSignal::new(),
            events: None,
        })
    }
    pub fn with_events(mut self, events: Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }
    /// Replace the stop flag, e.g. with one shared by a signal handler.
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }
    pub fn state(&self) -> ConnectionState {
        self.state
    }
    pub fn info(&self) -> &StreamInfo {
        &self.info
    }
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }
    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }
    pub fn consumer(&self) -> &C {
        self.cycle.consumer()
    }
    pub fn consumer_mut(&mut self) -> &mut C {
        self.cycle.consumer_mut()
    }
    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }
    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            info!("{}: {:?} -> {:?}", self.info.name, self.state, state);
            self.state = state;
            self.emit(SessionEvent::State(state));
        }
    }
    /// Fills the buffer to capacity. Runs once; later calls are no-ops.
    pub fn prefill(&mut self) -> Result<usize, StreamError> {
        if self.state != ConnectionState::Connecting {
            return Ok(0);
        }
        self.set_state(ConnectionState::Prefilling);
        let sequencer = PrefillSequencer::new(self.stop.clone())
            .with_timeout(self.config.prefill_timeout())
            .with_poll_interval(self.config.prefill_poll_interval());
        let target = self.buffer.capacity();
        let received = sequencer.fill(self.cycle.aggregator_mut(), &mut self.buffer, target)?;
        self.emit(SessionEvent::Prefilled { samples: received });
        self.set_state(ConnectionState::Streaming);
        Ok(received)
    }
    /// A single update tick. Only valid once streaming.
    pub fn tick(&mut self) -> Result<TickReport, StreamError> {
        if self.state != ConnectionState::Streaming {
            return Err(StreamError::InvalidState(self.state));
        }
        self.cycle.tick(&mut self.buffer)
    }
    /// Prefills, then ticks at the configured interval until stopped or the
    /// source fails. Always leaves the session `Closed`. A stop request is not
    /// an error.
    pub fn run(&mut self) -> Result<(), StreamError> {
        let result = self.run_until_stopped();
        let reason = result.as_ref().err().map(ToString::to_string);
        if let Some(reason) = &reason {
            warn!("{} closed: {reason}", self.info.name);
        }
        self.set_state(ConnectionState::Closed);
        self.emit(SessionEvent::Closed { reason });
        match result {
            Err(StreamError::Cancelled) => Ok(()),
            other => other,
        }
    }
    fn run_until_stopped(&mut self) -> Result<(), StreamError> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.prefill()?;
        let interval = self.config.tick_interval();
        let mut rejected_seen = 0;
        while !self.stop.is_stopped() {
            let started = Instant::now();
            match self.tick() {
                Ok(report) => {
                    if report.rejected_chunks > rejected_seen {
                        rejected_seen = report.rejected_chunks;
                        self.emit(SessionEvent::ChunksRejected(rejected_seen));
                    }
                }
                Err(err) if err.is_fatal() => return Err(err),
                // logged by the cycle; the consumer already saw this tick
                Err(_) => {}
            }
            thread::sleep(interval.saturating_sub(started.elapsed()));
        }
        Ok(())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::buffer::Snapshot;
    use crate::drivers::discovery::LocalRegistry;
    use crate::drivers::source::{Chunk, ManualSource};
    use std::sync::{mpsc, Arc};
    struct StopAfter {
        remaining: usize,
        stop: StopSignal,
        last: Option<Arc<Snapshot>>,
        closed: bool,
    }
    impl SnapshotConsumer for StopAfter {
        fn on_update(&mut self, snapshot: &Arc<Snapshot>) {
            self.last = Some(Arc::clone(snapshot));
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.stop.stop();
            }
        }
        fn on_closed(&mut self, _reason: &StreamError) {
            self.closed = true;
        }
    }
    fn info() -> StreamInfo {
        StreamInfo {
            name: "Test".into(),
            stream_type: "EEG".into(),
            hostname: "localhost".into(),
            channel_count: 1,
            nominal_srate: 100.0,
            source_id: "test".into(),
            uid: "1".into(),
        }
    }
    fn fast_config(buffer_len: usize) -> GraphConfig {
        GraphConfig {
            buffer_len,
            tick_interval_ms: 1,
            prefill_poll_interval_ms: 0,
            prefill_timeout_ms: Some(200),
            ..GraphConfig::default()
        }
    }
    fn scalar(values: &[f64]) -> Chunk {
        Chunk::new(
            values.iter().map(|v| vec![*v]).collect(),
            values.iter().map(|v| v / 10.0).collect(),
        )
    }
    #[test]
    fn runs_through_every_state_and_stops() {
        let stop = StopSignal::new();
        let consumer = StopAfter {
            remaining: 2,
            stop: stop.clone(),
            last: None,
            closed: false,
        };
        let source = ManualSource::new(
            1,
            vec![
                scalar(&[1.0, 2.0]),
                Chunk::empty(),
                scalar(&[3.0]),
                Chunk::empty(),
                scalar(&[4.0]),
            ],
        );
        let (tx, rx) = mpsc::channel();
        let mut session = Session::new(info(), source, &fast_config(3), consumer)
            .unwrap()
            .with_events(tx)
            .with_stop_signal(stop);
        session.run().unwrap();
        assert_eq!(session.state(), ConnectionState::Closed);
        let last = session.consumer().last.clone().unwrap();
        assert_eq!(last.flat_values(), vec![2.0, 3.0, 4.0]);
        let states: Vec<ConnectionState> = rx
            .try_iter()
            .filter_map(|e| match e {
                SessionEvent::State(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![
                ConnectionState::Prefilling,
                ConnectionState::Streaming,
                ConnectionState::Closed
            ]
        );
    }
    #[test]
    fn connection_loss_closes_session() {
        let stop = StopSignal::new();
        let consumer = StopAfter {
            remaining: usize::MAX,
            stop: stop.clone(),
            last: None,
            closed: false,
        };
        let source = ManualSource::new(1, vec![scalar(&[1.0, 2.0])]).fail_when_drained();
        let mut session = Session::new(info(), source, &fast_config(2), consumer).unwrap();
        assert!(matches!(
            session.run(),
            Err(StreamError::ConnectionLost(_))
        ));
        assert_eq!(session.state(), ConnectionState::Closed);
        assert!(session.consumer().closed);
        assert_eq!(
            session.consumer().last.as_ref().unwrap().flat_values(),
            vec![1.0, 2.0]
        );
    }
    #[test]
    fn tick_before_streaming_is_invalid() {
        let consumer = StopAfter {
            remaining: 1,
            stop: StopSignal::new(),
            last: None,
            closed: false,
        };
        let source = ManualSource::new(1, vec![scalar(&[1.0])]);
        let mut session = Session::new(info(), source, &fast_config(1), consumer).unwrap();
        assert!(matches!(
            session.tick(),
            Err(StreamError::InvalidState(ConnectionState::Connecting))
        ));
        assert!(session.consumer().last.is_none());
        assert_eq!(session.buffer().total_appended(), 0);
    }
    #[test]
    fn loss_while_streaming_reaches_consumer() {
        let stop = StopSignal::new();
        let consumer = StopAfter {
            remaining: usize::MAX,
            stop: stop.clone(),
            last: None,
            closed: false,
        };
        let source = ManualSource::new(
            1,
            vec![scalar(&[1.0, 2.0]), Chunk::empty(), scalar(&[3.0]), Chunk::empty()],
        )
        .fail_when_drained();
        let mut session = Session::new(info(), source, &fast_config(2), consumer).unwrap();
        assert!(session.run().is_err());
        assert!(session.consumer().closed);
        assert_eq!(
            session.consumer().last.as_ref().unwrap().flat_values(),
            vec![2.0, 3.0]
        );
    }
    #[test]
    fn stalled_prefill_is_reported() {
        let consumer = StopAfter {
            remaining: 1,
            stop: StopSignal::new(),
            last: None,
            closed: false,
        };
        let config = GraphConfig {
            prefill_timeout_ms: Some(10),
            ..fast_config(8)
        };
        let source = ManualSource::new(1, vec![scalar(&[1.0])]);
        let mut session = Session::new(info(), source, &config, consumer).unwrap();
        assert!(matches!(
            session.run(),
            Err(StreamError::PrefillStalled { received: 1, target: 8, .. })
        ));
        assert_eq!(session.state(), ConnectionState::Closed);
    }
    #[test]
    fn stop_during_prefill_is_not_an_error() {
        let stop = StopSignal::new();
        stop.stop();
        let consumer = StopAfter {
            remaining: 1,
            stop: stop.clone(),
            last: None,
            closed: false,
        };
        let config = GraphConfig {
            prefill_timeout_ms: None,
            ..fast_config(4)
        };
        let source = ManualSource::new(1, vec![]);
        let mut session = Session::new(info(), source, &config, consumer)
            .unwrap()
            .with_stop_signal(stop);
        assert!(session.run().is_ok());
        assert!(session.consumer().last.is_none());
    }
    #[test]
    fn unknown_stream_is_not_found() {
        let registry = LocalRegistry::with_demo_streams();
        let config = GraphConfig {
            stream_name: Some("Nope".into()),
            ..GraphConfig::default()
        };
        let consumer = StopAfter {
            remaining: 1,
            stop: StopSignal::new(),
            last: None,
            closed: false,
        };
        match Session::connect(&registry, &config, consumer) {
            Err(StreamError::StreamNotFound { name }) => assert_eq!(name, "Nope"),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("expected StreamNotFound"),
        }
    }
    #[test]
    fn connect_sizes_buffer_from_stream() {
        let registry = LocalRegistry::with_demo_streams();
        let config = GraphConfig {
            stream_name: Some("SimXY".into()),
            buffer_len: 16,
            channel_names: Some(vec!["x".into(), "y".into()]),
            ..GraphConfig::default()
        };
        let consumer = StopAfter {
            remaining: 1,
            stop: StopSignal::new(),
            last: None,
            closed: false,
        };
        let session = Session::connect(&registry, &config, consumer).unwrap();
        assert_eq!(session.buffer().capacity(), 16);
        assert_eq!(session.buffer().channel_count(), 2);
        assert_eq!(session.channel_names(), &["x", "y"]);
        assert_eq!(session.state(), ConnectionState::Connecting);
    }
}
