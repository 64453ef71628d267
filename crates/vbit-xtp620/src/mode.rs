//! Per-connection protocol mode.

/// How the next bytes on a connection are to be interpreted.
///
/// Exactly one mode is active per connection. `Normal` collects XTP620 lines;
/// every other mode collects a fixed number of Newfor or row-data bytes, given
/// by [`payload_len`](ProtocolMode::payload_len), before the dispatcher runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolMode {
    /// Waiting for an XTP620 line or a Newfor control byte.
    #[default]
    Normal,
    /// Newfor page init: magazine, page tens and page units follow.
    SoftelPageInit,
    /// Newfor subtitle data: the row count follows.
    GetRowCount,
    /// Newfor subtitle data: a two-nybble row address follows.
    GetRow,
    /// Put the current page on air.
    SubtitleOnAir,
    /// Take the current page off air.
    SubtitleOffAir,
    /// Row data: the high nybble of the next byte follows.
    SubtitleDataHighNybble,
    /// Row data: the low nybble of the next byte follows.
    SubtitleDataLowNybble,
}

impl ProtocolMode {
    /// Bytes to collect before dispatching in this mode.
    ///
    /// `None` for [`Normal`](ProtocolMode::Normal), where a line terminator
    /// ends the command instead.
    pub fn payload_len(self) -> Option<usize> {
        match self {
            ProtocolMode::Normal => None,
            ProtocolMode::SoftelPageInit => Some(3),
            ProtocolMode::GetRowCount => Some(1),
            ProtocolMode::GetRow => Some(2),
            ProtocolMode::SubtitleOnAir | ProtocolMode::SubtitleOffAir => Some(0),
            ProtocolMode::SubtitleDataHighNybble | ProtocolMode::SubtitleDataLowNybble => Some(1),
        }
    }

    /// Whether this mode carries row data nybbles.
    pub fn is_nybble(self) -> bool {
        matches!(
            self,
            ProtocolMode::SubtitleDataHighNybble | ProtocolMode::SubtitleDataLowNybble
        )
    }
}
