use crate::data::feed::FeedKind;
use crate::model::feed::FeedEvent;

/// All events the app loop handles.
#[derive(Debug)]
pub enum AppEvent {
    /// The watched feed file was created or modified.
    FeedFileChanged,
    /// Background load of a feed completed.
    FeedLoaded(FeedKind, Result<Vec<FeedEvent>, String>),
}
