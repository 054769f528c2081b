// Show/hide controller.
// Owns the display mode and drives fetching, heat painting, and hover text for the active editor.

use crate::blame::{
    BlameFetcher, CancellationToken, Editor, HeatRenderer, HoverFormatter, range_at_line,
};
use crate::workspace::FileIdentity;

/// Whether blame is currently overlaid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Hidden,
    Showing,
}

/// Single owner of the display mode; heat and hover both consult it.
pub struct BlameController {
    fetcher: BlameFetcher,
    renderer: HeatRenderer,
    formatter: HoverFormatter,
    mode: Mode,
}

impl BlameController {
    pub fn new(fetcher: BlameFetcher, renderer: HeatRenderer, formatter: HoverFormatter) -> Self {
        Self {
            fetcher,
            renderer,
            formatter,
            mode: Mode::Hidden,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn renderer(&self) -> &HeatRenderer {
        &self.renderer
    }

    pub fn fetcher(&self) -> &BlameFetcher {
        &self.fetcher
    }

    /// "Show" action: overlay blame on the active editor.
    pub async fn show(&mut self, editor: &mut dyn Editor, file: &FileIdentity) {
        self.mode = Mode::Showing;
        tracing::info!(%file, "Showing blame");
        self.refresh(editor, file).await;
    }

    /// "Hide" action: drop every decoration from the active editor.
    pub fn hide(&mut self, editor: &mut dyn Editor) {
        self.mode = Mode::Hidden;
        tracing::info!("Hiding blame");
        self.renderer.clear(editor);
    }

    /// The active editor changed to another file.
    pub async fn editor_changed(&self, editor: &mut dyn Editor, file: &FileIdentity) {
        match self.mode {
            Mode::Hidden => self.renderer.clear(editor),
            Mode::Showing => self.refresh(editor, file).await,
        }
    }

    /// Hover text for a 0-indexed line, while showing.
    pub async fn hover(
        &self,
        file: &FileIdentity,
        line: u32,
        cancel: Option<&CancellationToken>,
    ) -> Option<String> {
        if self.mode != Mode::Showing {
            return None;
        }
        let blame = match self.fetcher.resolve(file, cancel).await {
            Ok(blame) => blame?,
            Err(e) => {
                tracing::warn!(%file, error = %e, "No hover: blame unavailable");
                return None;
            }
        };
        let range = range_at_line(&blame.ranges, line)?;
        Some(self.formatter.render(
            &range.commit,
            &blame.location.owner,
            &blame.location.repo,
        ))
    }

    /// Teardown: forget every cached result.
    pub fn shutdown(&self) {
        let cache = self.fetcher.cache();
        if !cache.is_empty() {
            tracing::debug!(entries = cache.len(), "Clearing blame cache");
        }
        self.fetcher.clear();
    }

    async fn refresh(&self, editor: &mut dyn Editor, file: &FileIdentity) {
        match self.fetcher.resolve(file, None).await {
            Ok(Some(blame)) => {
                let buckets = self.renderer.compute(&blame.ranges);
                self.renderer.apply(editor, &buckets);
            }
            Ok(None) => self.renderer.clear(editor),
            Err(e) => {
                tracing::warn!(%file, error = %e, "No heat-map: blame unavailable");
                self.renderer.clear(editor);
            }
        }
    }
}
