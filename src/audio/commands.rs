#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    LoadCurrent,
    Next,
    Previous,
    Play,
    Pause,
    TogglePlay,
    SetVolume(i32),
    VolumeUp,
    VolumeDown,
    Seek(f64),
    SeekForward,
    SeekBackward,
}
