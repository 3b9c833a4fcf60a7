use std::path::PathBuf;

/// Something a player or waveform renderer can open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// A file the user owns; never deleted by the client.
    LocalFile(PathBuf),
    /// An output held by the enhancement server, addressed by its filename.
    ServerResult { file_name: String },
    /// A file the client created itself and must release when superseded.
    Owned(PathBuf),
}

impl MediaSource {
    pub fn is_owned(&self) -> bool {
        matches!(self, MediaSource::Owned(_))
    }
}

/// Original and enhanced media handed to the external renderer.
///
/// Each assignment opens a new rendering session; re-assigning the same
/// source keeps the current session so renderers are not torn down.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackSurface {
    original: Option<MediaSource>,
    enhanced: Option<MediaSource>,
    session: u64,
}

impl PlaybackSurface {
    pub fn original(&self) -> Option<&MediaSource> {
        self.original.as_ref()
    }

    pub fn enhanced(&self) -> Option<&MediaSource> {
        self.enhanced.as_ref()
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// Returns the sources that must now be released.
    pub fn set_original(&mut self, source: MediaSource) -> Vec<MediaSource> {
        Self::replace(&mut self.original, Some(source), &mut self.session)
    }

    /// Returns the sources that must now be released.
    pub fn set_enhanced(&mut self, source: MediaSource) -> Vec<MediaSource> {
        Self::replace(&mut self.enhanced, Some(source), &mut self.session)
    }

    /// Returns the sources that must now be released.
    pub fn clear_enhanced(&mut self) -> Vec<MediaSource> {
        Self::replace(&mut self.enhanced, None, &mut self.session)
    }

    fn replace(
        slot: &mut Option<MediaSource>,
        next: Option<MediaSource>,
        session: &mut u64,
    ) -> Vec<MediaSource> {
        if *slot == next {
            return Vec::new();
        }
        *session += 1;
        match std::mem::replace(slot, next) {
            Some(previous) if previous.is_owned() => vec![previous],
            _ => Vec::new(),
        }
    }
}
