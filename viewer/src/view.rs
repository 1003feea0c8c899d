use tracing::debug;
use watchless::Note;
use watchless::fetch::FetchedNote;

use crate::error::{ViewerError, ViewerResult};
use crate::playback::{PlaybackController, Player};
use crate::properties::{PropertyPanel, render_properties};
use crate::rules::Renderer;
use crate::tree::{Activation, RenderTree};

/// A note rendered once: its properties panel (if any) and its body tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNote {
    pub properties: Option<PropertyPanel>,
    pub tree: RenderTree,
}

/// Split, decode and render a raw note.
pub fn render_note(source: &str, renderer: &Renderer) -> RenderedNote {
    let note = Note::parse(source);
    RenderedNote {
        properties: render_properties(&note.properties),
        tree: renderer.render(&note.body),
    }
}

/// The displayed note together with the live player slot.
///
/// Loading a new note drops any bound player, since the widget it belonged to
/// is unmounted with the old tree.
#[derive(Debug, Default)]
pub struct NoteView {
    renderer: Renderer,
    title: Option<String>,
    rendered: Option<RenderedNote>,
    controller: PlaybackController,
}

impl NoteView {
    pub fn new(renderer: Renderer) -> Self {
        NoteView {
            renderer,
            ..Self::default()
        }
    }

    /// Show a raw note.
    pub fn load(&mut self, source: &str) -> &RenderedNote {
        self.controller.clear();
        self.title = None;
        self.install_rendered(render_note(source, &self.renderer))
    }

    /// Show a note produced by the summarization service.
    pub fn load_fetched(&mut self, note: FetchedNote) -> &RenderedNote {
        self.controller.clear();
        debug!(title = note.title.as_str(), "loading fetched note");
        let rendered = render_note(&note.summary, &self.renderer);
        self.title = Some(note.title);
        self.install_rendered(rendered)
    }

    fn install_rendered(&mut self, rendered: RenderedNote) -> &RenderedNote {
        debug!(
            controls = rendered.tree.controls.len(),
            players = rendered.tree.video_ids().len(),
            "rendered note"
        );
        self.rendered.insert(rendered)
    }

    /// The player widget reported ready; bind its handle.
    pub fn mount_player(&mut self, handle: Box<dyn Player>) {
        self.controller.install(handle);
    }

    pub fn unmount_player(&mut self) {
        self.controller.clear();
    }

    /// Activate control `id` of the current tree.
    pub fn activate(&mut self, id: usize) -> ViewerResult<Activation> {
        let control = self
            .rendered
            .as_ref()
            .and_then(|r| r.tree.control(id))
            .ok_or(ViewerError::UnknownControl(id))?;
        control.activate(&mut self.controller)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn rendered(&self) -> Option<&RenderedNote> {
        self.rendered.as_ref()
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::tests::{Call, recording};

    const NOTE: &str = "---\ntags: [talk]\n---\n# Title\n\n<iframe src=\"https://www.youtube.com/embed/abc\"></iframe>\n\n[0:30](https://youtu.be/abc?t=30) [site](https://example.com)\n";

    #[test]
    fn render_note_builds_panel_and_tree() {
        let rendered = render_note(NOTE, &Renderer::default());
        assert_eq!(rendered.properties.unwrap().rows.len(), 1);
        assert_eq!(rendered.tree.video_ids(), vec!["abc"]);
        assert_eq!(rendered.tree.controls.len(), 2);
    }

    #[test]
    fn note_without_front_matter_has_no_panel() {
        let rendered = render_note("just text", &Renderer::default());
        assert!(rendered.properties.is_none());
    }

    #[test]
    fn seek_goes_to_mounted_player() {
        let (player, log) = recording();
        let mut view = NoteView::default();
        view.load(NOTE);
        view.mount_player(player);
        assert_eq!(view.activate(0), Ok(Activation::Seek { seconds: 30 }));
        assert_eq!(*log.borrow(), vec![Call::SeekTo(30, true), Call::Play]);
    }

    #[test]
    fn loading_clears_the_player() {
        let (player, log) = recording();
        let mut view = NoteView::default();
        view.load(NOTE);
        view.mount_player(player);
        view.load(NOTE);
        assert!(!view.controller().is_bound());
        assert_eq!(view.activate(0), Ok(Activation::Seek { seconds: 30 }));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn unknown_control_is_an_error() {
        let mut view = NoteView::default();
        assert_eq!(view.activate(0), Err(ViewerError::UnknownControl(0)));
        view.load(NOTE);
        assert_eq!(view.activate(9), Err(ViewerError::UnknownControl(9)));
    }

    #[test]
    fn fetched_note_keeps_title() {
        let mut view = NoteView::default();
        view.load_fetched(FetchedNote {
            title: "Talk".into(),
            summary: NOTE.into(),
        });
        assert_eq!(view.title(), Some("Talk"));
        view.load("plain");
        assert_eq!(view.title(), None);
    }
}
