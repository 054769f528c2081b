// App state and main event loop.
// Loads the remote file, routes keys to the show/hide actions, and keeps hover text current.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;

use crate::controller::{BlameController, Mode};
use crate::github::{GitHubClient, RateLimit};
use crate::state::{LoadingState, ViewerState};
use crate::ui;
use crate::workspace::{FileIdentity, GitHubWorkspace};

/// Main application state.
pub struct App {
    pub viewer: ViewerState,
    pub controller: BlameController,
    /// Visible line count of the file area, set on every draw.
    pub viewport_height: usize,
    pub show_help: bool,
    /// Transient message shown in the status bar.
    pub status: Option<String>,
    /// Whether the app should exit.
    pub should_quit: bool,
    workspace: Arc<GitHubWorkspace>,
    client: Arc<GitHubClient>,
}

impl App {
    pub fn new(
        file: FileIdentity,
        controller: BlameController,
        workspace: Arc<GitHubWorkspace>,
        client: Arc<GitHubClient>,
    ) -> Self {
        Self {
            viewer: ViewerState::new(file),
            controller,
            viewport_height: 0,
            show_help: false,
            status: None,
            should_quit: false,
            workspace,
            client,
        }
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn rate_limit(&self) -> RateLimit {
        self.client.rate_limit()
    }

    /// Main event loop.
    pub async fn run(&mut self, terminal: &mut Terminal<impl Backend>) -> io::Result<()> {
        self.open_file(terminal).await?;
        while !self.should_quit {
            terminal.draw(|frame| ui::draw(frame, self))?;
            self.handle_events(terminal).await?;
        }
        self.controller.shutdown();
        Ok(())
    }

    /// Fetch the file contents and bring decorations in line with the current mode.
    async fn open_file(&mut self, terminal: &mut Terminal<impl Backend>) -> io::Result<()> {
        self.viewer.content = LoadingState::Loading;
        terminal.draw(|frame| ui::draw(frame, self))?;

        let file = self.viewer.file.clone();
        self.viewer.content = match self.workspace.contents(&file).await {
            Ok(text) => LoadingState::Loaded(text.lines().map(str::to_string).collect()),
            Err(e) => {
                tracing::error!(%file, error = %e, "Failed to load file");
                LoadingState::Error(e.to_string())
            }
        };
        self.controller.editor_changed(&mut self.viewer, &file).await;
        self.refresh_hover().await;
        Ok(())
    }

    /// Handle keyboard and other events.
    #[allow(clippy::collapsible_if)]
    async fn handle_events(&mut self, terminal: &mut Terminal<impl Backend>) -> io::Result<()> {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key, terminal).await?;
                }
            }
        }
        Ok(())
    }

    async fn handle_key(
        &mut self,
        key: KeyEvent,
        terminal: &mut Terminal<impl Backend>,
    ) -> io::Result<()> {
        let page = self.viewport_height.max(1) as isize;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        let moved = match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                false
            }
            KeyCode::Char('?') => {
                self.show_help = !self.show_help;
                false
            }
            KeyCode::Esc if self.show_help => {
                self.show_help = false;
                false
            }
            KeyCode::Char('b') => {
                self.show(terminal).await?;
                false
            }
            KeyCode::Char('B') | KeyCode::Esc => {
                self.controller.hide(&mut self.viewer);
                self.viewer.hover = None;
                self.status = None;
                false
            }
            KeyCode::Char('j') | KeyCode::Down => self.viewer.move_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.viewer.move_by(-1),
            KeyCode::PageDown => self.viewer.move_by(page),
            KeyCode::PageUp => self.viewer.move_by(-page),
            KeyCode::Char('d') if ctrl => self.viewer.move_by(page / 2),
            KeyCode::Char('u') if ctrl => self.viewer.move_by(-page / 2),
            KeyCode::Char('g') | KeyCode::Home => self.viewer.move_to_top(),
            KeyCode::Char('G') | KeyCode::End => self.viewer.move_to_bottom(),
            _ => false,
        };

        if moved {
            self.viewer.ensure_visible(self.viewport_height);
            self.refresh_hover().await;
        }
        Ok(())
    }

    async fn show(&mut self, terminal: &mut Terminal<impl Backend>) -> io::Result<()> {
        if self.mode() == Mode::Showing && self.viewer.has_decorations() {
            return Ok(());
        }
        let file = self.viewer.file.clone();
        if self.controller.fetcher().cached(&file).is_none() {
            self.status = Some("Fetching blame...".to_string());
            terminal.draw(|frame| ui::draw(frame, self))?;
        }
        self.controller.show(&mut self.viewer, &file).await;
        self.status = (!self.viewer.has_decorations())
            .then(|| "No blame available for this file".to_string());
        self.refresh_hover().await;
        Ok(())
    }

    async fn refresh_hover(&mut self) {
        let line = u32::try_from(self.viewer.cursor).unwrap_or(u32::MAX);
        self.viewer.hover = self.controller.hover(&self.viewer.file, line, None).await;
    }
}
