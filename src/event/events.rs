use crate::audio::{commands::AudioCommand, service::ServiceTag};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Events
    Initialize,
    /// Natural end of a track, tagged with the load generation it belongs to.
    TrackEnded(ServiceTag, u64),

    // Commands
    Audio(AudioCommand),
    Quit,
}
