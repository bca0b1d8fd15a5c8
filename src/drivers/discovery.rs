use std::time::Duration;
use crate::drivers::source::{ChunkSource, SimulatedSource};
use crate::drivers::StreamError;
/// Metadata describing a visible stream.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    pub name: String,
    pub stream_type: String,
    pub hostname: String,
    pub channel_count: usize,
    pub nominal_srate: f64,
    pub source_id: String,
    pub uid: String,
}
impl StreamInfo {
    /// `name@host[source_id][uid]`
    pub fn compact_id(&self) -> String {
        format!(
            "{}@{}[{}][{}]",
            self.name, self.hostname, self.source_id, self.uid
        )
    }
    /// Display title, `name(type)`.
    pub fn title(&self) -> String {
        format!("{}({})", self.name, self.stream_type)
    }
}
/// Resolves stream names to connectable sources.
pub trait Discovery {
    /// All visible streams whose name equals `name`, waiting at most `timeout`.
    fn resolve(&self, name: &str, timeout: Duration) -> Result<Vec<StreamInfo>, StreamError>;
    fn list(&self) -> Result<Vec<StreamInfo>, StreamError>;
    fn open(&self, info: &StreamInfo) -> Result<Box<dyn ChunkSource + Send>, StreamError>;
}
/// In-process registry of simulated streams.
#[derive(Default)]
pub struct LocalRegistry {
    streams: Vec<StreamInfo>,
}
impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    /// Two sine streams: an 8-channel EEG-like one and a 2-channel XY one.
    pub fn with_demo_streams() -> Self {
        let mut registry = Self::new();
        registry.register("SimEEG", "EEG", 8, 250.0);
        registry.register("SimXY", "Position", 2, 60.0);
        registry
    }
    pub fn register(&mut self, name: &str, stream_type: &str, channel_count: usize, srate: f64) {
        let uid = format!("{:08x}", self.streams.len() + 1);
        self.streams.push(StreamInfo {
            name: name.to_owned(),
            stream_type: stream_type.to_owned(),
            hostname: "localhost".to_owned(),
            channel_count,
            nominal_srate: srate,
            source_id: format!("sim-{}", name.to_lowercase()),
            uid,
        });
    }
}
impl Discovery for LocalRegistry {
    fn resolve(&self, name: &str, _timeout: Duration) -> Result<Vec<StreamInfo>, StreamError> {
        Ok(self
            .streams
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect())
    }
    fn list(&self) -> Result<Vec<StreamInfo>, StreamError> {
        Ok(self.streams.clone())
    }
    fn open(&self, info: &StreamInfo) -> Result<Box<dyn ChunkSource + Send>, StreamError> {
        if !self.streams.iter().any(|s| s.uid == info.uid) {
            return Err(StreamError::StreamNotFound {
                name: info.name.clone(),
            });
        }
        if info.channel_count == 0 {
            return Err(StreamError::InvalidChannelCount);
        }
        Ok(Box::new(SimulatedSource::new(
            info.channel_count,
            info.nominal_srate,
        )))
    }
}
const COLUMN_WIDTH: usize = 10;
/// Fixed-width listing of visible streams, one per line under a header.
pub fn format_stream_table(streams: &[StreamInfo]) -> String {
    let header = ["Name", "Type", "Hostname", "Channels", "Fs", "Source", "UID"];
    let mut out = row(header.iter().map(|s| s.to_string()));
    for s in streams {
        out.push_str(&row([
            s.name.clone(),
            s.stream_type.clone(),
            s.hostname.clone(),
            s.channel_count.to_string(),
            format!("{}Hz", s.nominal_srate),
            s.source_id.clone(),
            s.uid.clone(),
        ]));
    }
    out
}
fn row(cells: impl IntoIterator<Item = String>) -> String {
    let mut line: String = cells
        .into_iter()
        .map(|c| format!("{c:<width$}", width = COLUMN_WIDTH))
        .collect();
    line.truncate(line.trim_end().len());
    line.push('\n');
    line
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn resolve_matches_exact_name() {
        let registry = LocalRegistry::with_demo_streams();
        let found = registry.resolve("SimXY", Duration::from_secs(1)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].channel_count, 2);
        assert!(registry
            .resolve("simxy", Duration::from_secs(1))
            .unwrap()
            .is_empty());
    }
    #[test]
    fn open_yields_source_with_stream_channels() {
        let registry = LocalRegistry::with_demo_streams();
        let info = registry.resolve("SimEEG", Duration::ZERO).unwrap().remove(0);
        let source = registry.open(&info).unwrap();
        assert_eq!(source.channel_count(), 8);
    }
    #[test]
    fn compact_id_and_title() {
        let registry = LocalRegistry::with_demo_streams();
        let info = &registry.list().unwrap()[0];
        assert_eq!(info.compact_id(), "SimEEG@localhost[sim-simeeg][00000001]");
        assert_eq!(info.title(), "SimEEG(EEG)");
    }
    #[test]
    fn table_pads_columns() {
        let registry = LocalRegistry::with_demo_streams();
        let table = format_stream_table(&registry.list().unwrap());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Name      Type      Hostname  Channels"));
        assert!(lines[1].starts_with("SimEEG    EEG       localhost 8         250Hz"));
    }
}
