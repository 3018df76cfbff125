// sensor_feed.rs — 桌面端没有方向传感器：从 JSON 行读取外部读数

use crate::config::FeedSource;
use crate::orientation::SensorReading;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, TryIter};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const REPLAY_INTERVAL: Duration = Duration::from_millis(16);

/// One line of the feed: `{"alpha": 10, "beta": 80, "gamma": -2, "screen": 0}`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SensorSample {
    #[serde(flatten)]
    pub reading: SensorReading,
    /// Current screen rotation angle, degrees.
    #[serde(default)]
    pub screen: Option<f32>,
}

pub fn parse_line(line: &str) -> Option<SensorSample> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(sample) => Some(sample),
        Err(e) => {
            log::debug!("skipping sensor line {line:?}: {e}");
            None
        }
    }
}

/// Background reader forwarding samples to the event-loop thread.
pub struct SensorFeed {
    rx: Receiver<SensorSample>,
    stop: Arc<AtomicBool>,
}

impl SensorFeed {
    pub fn spawn(source: FeedSource) -> io::Result<Self> {
        let (tx, rx) = channel();
        let stop = Arc::new(AtomicBool::new(false));

        let (reader, pace): (Box<dyn BufRead + Send>, Option<Duration>) = match &source {
            FeedSource::Replay(path) => (Box::new(BufReader::new(File::open(path)?)), Some(REPLAY_INTERVAL)),
            FeedSource::Stdin => (Box::new(BufReader::new(io::stdin())), None),
        };
        log::info!("sensor feed from {source:?}");

        let flag = stop.clone();
        thread::spawn(move || {
            for line in reader.lines() {
                if flag.load(Ordering::Relaxed) {
                    break;
                }
                let Ok(line) = line else { break };
                if let Some(sample) = parse_line(&line) {
                    if tx.send(sample).is_err() {
                        break;
                    }
                    if let Some(d) = pace {
                        thread::sleep(d);
                    }
                }
            }
            log::debug!("sensor feed finished");
        });

        Ok(Self { rx, stop })
    }

    pub fn poll(&self) -> TryIter<'_, SensorSample> {
        self.rx.try_iter()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for SensorFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Instant;

    #[test]
    fn parses_full_and_partial_lines() {
        let s = parse_line(r#"{"alpha": 10, "beta": 80.5, "gamma": -2, "screen": 90}"#).unwrap();
        assert_eq!(s.reading, SensorReading::new(10.0, 80.5, -2.0));
        assert_eq!(s.screen, Some(90.0));

        let s = parse_line(r#"{"alpha": null, "beta": 1, "gamma": 2}"#).unwrap();
        assert_eq!(s.reading.alpha, None);
        assert_eq!(s.screen, None);
    }

    #[test]
    fn skips_blank_comment_and_garbage_lines() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   # recorded on a phone").is_none());
        assert!(parse_line("not json").is_none());
    }

    #[test]
    fn replays_a_file() {
        let path = std::env::temp_dir().join("lens_panorama_feed_test.jsonl");
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, r#"{{"alpha": 1, "beta": 2, "gamma": 3}}"#).unwrap();
            writeln!(f, "garbage").unwrap();
            writeln!(f, r#"{{"alpha": 4, "beta": 5, "gamma": 6}}"#).unwrap();
        }
        let feed = SensorFeed::spawn(FeedSource::Replay(path)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut got = Vec::new();
        while got.len() < 2 && Instant::now() < deadline {
            got.extend(feed.poll());
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(got.len(), 2);
        assert_eq!(got[1].reading.alpha, Some(4.0));
    }

    #[test]
    fn missing_replay_file_is_an_error() {
        assert!(SensorFeed::spawn(FeedSource::Replay("/nope/feed.jsonl".into())).is_err());
    }
}
