mod event;
mod profile;
mod track;

pub use event::{EventKind, ListeningEvent};
pub use profile::TasteProfile;
pub use track::{NewTrack, Track};
