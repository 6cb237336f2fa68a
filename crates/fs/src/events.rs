use std::path::PathBuf;

/// What happened to a watched path.
///
/// Mirrors the event classes a recursive watch delivers. The delivery
/// mechanism itself (inotify, FSEvents, ...) lives outside this crate; the
/// update batcher only requires a lossless stream of these records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Create,
    Modify,
    MoveIn,
    MoveOut,
    Delete,
    DeleteSelf,
}

impl FsEventKind {
    /// Events that introduce or refresh a path.
    pub fn is_additive(self) -> bool {
        matches!(self, Self::Create | Self::Modify | Self::MoveIn)
    }
}

#[derive(Debug, Clone)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
}

impl FsEvent {
    pub fn new(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}
