use crate::audio::service::ServiceTag;
use serde::{Deserialize, Serialize};

/// A track on one service. The id is opaque and forwarded as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub service: ServiceTag,
    #[serde(rename = "id")]
    pub track_id: String,
}

impl PlaylistEntry {
    pub fn new(service: ServiceTag, track_id: impl Into<String>) -> Self {
        Self {
            service,
            track_id: track_id.into(),
        }
    }
}

/// Fixed, non-empty playlist with a cyclic cursor.
#[derive(Debug, Clone)]
pub struct QueueManager {
    queue: Vec<PlaylistEntry>,
    current_track_index: usize,
}

impl QueueManager {
    pub fn new(queue: Vec<PlaylistEntry>) -> Option<Self> {
        if queue.is_empty() {
            return None;
        }

        Some(Self {
            queue,
            current_track_index: 0,
        })
    }

    pub fn with_start_index(queue: Vec<PlaylistEntry>, start_index: usize) -> Option<Self> {
        let mut manager = Self::new(queue)?;
        if start_index >= manager.queue.len() {
            return None;
        }
        manager.current_track_index = start_index;
        Some(manager)
    }

    pub fn current(&self) -> &PlaylistEntry {
        &self.queue[self.current_track_index]
    }

    pub fn current_track_index(&self) -> usize {
        self.current_track_index
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.queue
    }

    /// Moves to the next entry, wrapping from last to first.
    pub fn advance(&mut self) -> &PlaylistEntry {
        self.current_track_index = (self.current_track_index + 1) % self.queue.len();
        self.current()
    }

    /// Moves to the previous entry, wrapping from first to last.
    pub fn retreat(&mut self) -> &PlaylistEntry {
        self.current_track_index = match self.current_track_index {
            0 => self.queue.len() - 1,
            index => index - 1,
        };
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(len: usize) -> Vec<PlaylistEntry> {
        (0..len)
            .map(|i| {
                let service = ServiceTag::ALL[i % ServiceTag::ALL.len()];
                PlaylistEntry::new(service, format!("track-{i}"))
            })
            .collect()
    }

    #[test]
    fn test_empty_playlist_is_rejected() {
        assert!(QueueManager::new(vec![]).is_none());
        assert!(QueueManager::with_start_index(playlist(2), 2).is_none());
    }

    #[test]
    fn test_advance_cycles_back_to_start() {
        for len in 1..=7 {
            for start in 0..len {
                let mut queue = QueueManager::with_start_index(playlist(len), start).unwrap();
                for _ in 0..len {
                    queue.advance();
                }
                assert_eq!(queue.current_track_index(), start);
            }
        }
    }

    #[test]
    fn test_retreat_cycles_back_to_start() {
        for len in 1..=7 {
            for start in 0..len {
                let mut queue = QueueManager::with_start_index(playlist(len), start).unwrap();
                for _ in 0..len {
                    queue.retreat();
                }
                assert_eq!(queue.current_track_index(), start);
            }
        }
    }

    #[test]
    fn test_wraps_at_both_ends() {
        let mut queue = QueueManager::new(playlist(3)).unwrap();
        assert_eq!(queue.retreat().track_id, "track-2");
        assert_eq!(queue.advance().track_id, "track-0");
        assert_eq!(queue.advance().track_id, "track-1");
    }

    #[test]
    fn test_entry_json_shape() {
        let entries: Vec<PlaylistEntry> = serde_json::from_str(
            r#"[{"service": "soundcloud", "id": "billwurtz/outside"},
                {"service": "youtube", "id": "zNTaVTMoNTk"}]"#,
        )
        .unwrap();
        assert_eq!(
            entries[0],
            PlaylistEntry::new(ServiceTag::CrowdAudio, "billwurtz/outside")
        );
        assert_eq!(entries[1].service, ServiceTag::StreamingVideo);
    }
}
