use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A mounted video player that can seek and play.
pub trait Player {
    /// Seek to an absolute position. `allow_seek_ahead` requests a fast seek
    /// that may fetch data beyond what is buffered.
    fn seek_to(&mut self, seconds: u64, allow_seek_ahead: bool);

    /// Start or resume playback.
    fn play(&mut self);
}

/// Dimensions and player variables handed to the embedding widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerOptions {
    pub width: String,
    pub height: String,
    pub autoplay: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        PlayerOptions {
            width: "100%".to_string(),
            height: "100%".to_string(),
            autoplay: false,
        }
    }
}

/// Holds the single live player handle and turns seek requests into player calls.
///
/// The slot is filled by a player-ready event and emptied on unmount or when a
/// new note is loaded.
#[derive(Default)]
pub struct PlaybackController {
    handle: Option<Box<dyn Player>>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handle of a newly ready player, replacing any previous one.
    pub fn install(&mut self, handle: Box<dyn Player>) {
        if self.handle.replace(handle).is_some() {
            debug!("replaced bound player handle");
        } else {
            debug!("bound player handle");
        }
    }

    pub fn clear(&mut self) {
        if self.handle.take().is_some() {
            debug!("cleared player handle");
        }
    }

    pub fn is_bound(&self) -> bool {
        self.handle.is_some()
    }

    /// Seek the bound player to `seconds` and start playback.
    ///
    /// Without a bound player this does nothing.
    pub fn seek_and_play(&mut self, seconds: u64) {
        let Some(player) = self.handle.as_mut() else {
            debug!(seconds, "no player bound, ignoring seek");
            return;
        };
        debug!(seconds, "seeking player");
        player.seek_to(seconds, true);
        player.play();
    }
}

impl fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackController")
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        SeekTo(u64, bool),
        Play,
    }

    /// Player that records every call into a shared log.
    pub(crate) struct RecordingPlayer(pub Rc<RefCell<Vec<Call>>>);

    impl Player for RecordingPlayer {
        fn seek_to(&mut self, seconds: u64, allow_seek_ahead: bool) {
            self.0.borrow_mut().push(Call::SeekTo(seconds, allow_seek_ahead));
        }

        fn play(&mut self) {
            self.0.borrow_mut().push(Call::Play);
        }
    }

    pub(crate) fn recording() -> (Box<dyn Player>, Rc<RefCell<Vec<Call>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (Box::new(RecordingPlayer(Rc::clone(&log))), log)
    }

    #[test]
    fn seek_without_player_is_a_no_op() {
        let mut controller = PlaybackController::new();
        controller.seek_and_play(42);
        assert!(!controller.is_bound());
    }

    #[test]
    fn seek_then_play_on_bound_player() {
        let (player, log) = recording();
        let mut controller = PlaybackController::new();
        controller.install(player);
        controller.seek_and_play(754);
        assert_eq!(*log.borrow(), vec![Call::SeekTo(754, true), Call::Play]);
    }

    #[test]
    fn install_replaces_previous_handle() {
        let (first, first_log) = recording();
        let (second, second_log) = recording();
        let mut controller = PlaybackController::new();
        controller.install(first);
        controller.install(second);
        controller.seek_and_play(5);
        assert!(first_log.borrow().is_empty());
        assert_eq!(second_log.borrow().len(), 2);
    }

    #[test]
    fn clear_unbinds() {
        let (player, log) = recording();
        let mut controller = PlaybackController::new();
        controller.install(player);
        controller.clear();
        controller.seek_and_play(5);
        assert!(!controller.is_bound());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn options_default_to_full_size_without_autoplay() {
        let options = PlayerOptions::default();
        assert_eq!(options.width, "100%");
        assert_eq!(options.height, "100%");
        assert!(!options.autoplay);
    }
}
