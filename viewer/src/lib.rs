pub mod error;
pub mod playback;
pub mod properties;
pub mod rules;
pub mod tree;
pub mod view;

pub use error::{ViewerError, ViewerResult};
pub use playback::{PlaybackController, Player, PlayerOptions};
pub use rules::Renderer;
pub use tree::{Activation, RenderNode, RenderTree};
pub use view::{NoteView, RenderedNote, render_note};
