pub mod element;
pub mod player;
pub mod wav;

pub use element::{AudioElement, ElementId, MediaElement, MediaTap};
pub use player::{Playback, Player, Song};
pub use wav::AudioData;
