//! TUI application main loop.
//!
//! Terminal lifecycle: raw mode plus the alternate screen, with a panic
//! hook that restores the terminal so a crash never leaves the shell
//! unusable. The loop draws, then `tokio::select!`s over the crossterm
//! event stream and a tick interval.
//!
//! Screen flow: Password (unless --insecure) -> Login -> Calibration ->
//! Annotate -> Finished. Ctrl+C quits anywhere; Ctrl+D logs out.

use super::state::{
    AnnotateForm, CalibrationState, FormField, LoginState, PasswordState, Screen,
};
use super::widgets;
use crate::auth::PasswordGate;
use crate::dataset::shuffle_records;
use crate::guidelines;
use crate::models::QaRecord;
use crate::profile::{self, DataLayout, ProfileStore};
use crate::session::AnnotationSession;
use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::time::Duration;
use tracing::{info, warn};

/// Everything the application needs from startup.
pub struct AppOptions {
    /// Password gate; `None` means --insecure.
    pub gate: Option<PasswordGate>,
    /// Resolved directory layout for this run mode.
    pub layout: DataLayout,
    /// The loaded dataset, in presentation order before any shuffle.
    pub records: Vec<QaRecord>,
    /// Apply the per-annotator shuffle at login.
    pub shuffle: bool,
    /// Completion code for this run mode (may be empty).
    pub completion_code: String,
    /// Annotation platform name, used in UI copy.
    pub platform: String,
}

/// The running application.
pub struct App {
    pub(crate) screen: Screen,
    pub(crate) gate: Option<PasswordGate>,
    pub(crate) layout: DataLayout,
    pub(crate) records: Vec<QaRecord>,
    pub(crate) shuffle: bool,
    pub(crate) completion_code: String,
    pub(crate) platform: String,

    pub(crate) username: Option<String>,
    pub(crate) session: Option<AnnotationSession>,

    pub(crate) password: PasswordState,
    pub(crate) login: LoginState,
    pub(crate) calibration: CalibrationState,
    pub(crate) form: Option<AnnotateForm>,
    pub(crate) context_scroll: u16,

    should_quit: bool,
}

impl App {
    pub fn new(options: AppOptions) -> Self {
        let screen = if options.gate.is_some() {
            Screen::Password
        } else {
            Screen::Login
        };

        let mut app = Self {
            screen,
            gate: options.gate,
            layout: options.layout,
            records: options.records,
            shuffle: options.shuffle,
            completion_code: options.completion_code,
            platform: options.platform,
            username: None,
            session: None,
            password: PasswordState::default(),
            login: LoginState::default(),
            calibration: CalibrationState::default(),
            form: None,
            context_scroll: 0,
            should_quit: false,
        };
        app.refresh_users();
        app
    }

    /// Run the TUI until the user quits or finishes.
    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Restore the terminal even on panic
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(info);
        }));

        let result = self.event_loop(&mut terminal).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        let mut event_stream = EventStream::new();
        let mut tick = tokio::time::interval(Duration::from_millis(250));

        loop {
            terminal.draw(|frame| widgets::render(frame, self))?;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(Ok(event)) = event_stream.next() => {
                    if let Event::Key(key) = event {
                        if key.kind == KeyEventKind::Press {
                            self.handle_key(key)?;
                        }
                    }
                }

                // Keeps elapsed-time displays fresh and drains resize events
                _ = tick.tick() => {}
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('d') => {
                    if self.screen != Screen::Password {
                        self.logout();
                    }
                }
                // Unbound control chords must not leak into text fields
                _ => {}
            }
            return Ok(());
        }

        match self.screen {
            Screen::Password => self.handle_password_key(key),
            Screen::Login => self.handle_login_key(key),
            Screen::Calibration => self.handle_calibration_key(key),
            Screen::Annotate => self.handle_annotate_key(key),
            Screen::Finished => {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Enter | KeyCode::Esc) {
                    self.should_quit = true;
                }
                Ok(())
            }
        }
    }

    fn handle_password_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char(c) => self.password.input.insert(c),
            KeyCode::Backspace => self.password.input.backspace(),
            KeyCode::Enter => {
                let granted = self
                    .gate
                    .as_ref()
                    .is_some_and(|gate| gate.verify(self.password.input.value()));

                if granted {
                    info!("Password accepted");
                    self.screen = Screen::Login;
                } else {
                    warn!("Password rejected");
                    self.password.rejected = true;
                    self.password.input.clear();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_login_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char(c) => self.login.input.insert(c),
            KeyCode::Backspace => self.login.input.backspace(),
            KeyCode::Left => self.login.input.move_left(),
            KeyCode::Right => self.login.input.move_right(),
            KeyCode::Enter => self.try_login()?,
            _ => {}
        }
        Ok(())
    }

    fn try_login(&mut self) -> Result<()> {
        let username = self.login.input.value().trim().to_string();

        if username.is_empty() {
            self.login.error = Some("Empty IDs are not valid.".to_string());
            return Ok(());
        }

        if self.login.completed_users.contains(&username) {
            // Otherwise a finished user could log back in and re-read the code
            self.login.error = Some(format!(
                "You have already completed the study and cannot login again. \
                 Please contact us on {} if you're experiencing issues.",
                self.platform
            ));
            return Ok(());
        }

        let store = ProfileStore::new(&self.layout, &username);
        store.init_user()?;

        let mut records = self.records.clone();
        if self.shuffle {
            records = shuffle_records(&username, records);
        }

        let session = AnnotationSession::resume(store, records)?;
        info!("User {:?} logged in", username);

        self.username = Some(username);
        self.session = Some(session);
        self.calibration = CalibrationState::default();
        self.login.error = None;
        self.screen = Screen::Calibration;
        Ok(())
    }

    fn handle_calibration_key(&mut self, key: KeyEvent) -> Result<()> {
        let page_count = guidelines::calibration_pages().len();

        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                self.calibration.scroll = self.calibration.scroll.saturating_add(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.calibration.scroll = self.calibration.scroll.saturating_sub(1);
            }
            KeyCode::Left | KeyCode::Char('p') => {
                if self.calibration.page > 0 {
                    self.leave_calibration_page()?;
                    self.calibration.page -= 1;
                    self.calibration.scroll = 0;
                }
            }
            KeyCode::Right | KeyCode::Char('n') | KeyCode::Enter => {
                self.leave_calibration_page()?;
                if self.calibration.page + 1 < page_count {
                    self.calibration.page += 1;
                    self.calibration.scroll = 0;
                } else {
                    self.finish_calibration()?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn leave_calibration_page(&mut self) -> Result<()> {
        let elapsed = self.calibration.page_started.elapsed().as_secs_f64();
        let page = self.calibration.page;
        if let Some(session) = self.session.as_mut() {
            session.record_example_time(page, elapsed)?;
        }
        self.calibration.page_started = std::time::Instant::now();
        Ok(())
    }

    fn finish_calibration(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        if session.is_finished() {
            session.mark_complete()?;
            self.screen = Screen::Finished;
        } else {
            let record = session.current().cloned();
            self.form = record.as_ref().map(AnnotateForm::for_record);
            self.context_scroll = 0;
            self.screen = Screen::Annotate;
        }
        Ok(())
    }

    fn handle_annotate_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(form) = self.form.as_mut() else {
            return Ok(());
        };

        match key.code {
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
            KeyCode::PageDown => self.context_scroll = self.context_scroll.saturating_add(3),
            KeyCode::PageUp => self.context_scroll = self.context_scroll.saturating_sub(3),
            KeyCode::Enter => {
                if form.focus == FormField::Submit {
                    self.submit_form()?;
                } else {
                    form.focus_next();
                }
            }
            KeyCode::Char(' ') => match form.focused_text() {
                Some(field) => field.insert(' '),
                None => form.toggle(),
            },
            KeyCode::Char(c) => {
                if let Some(field) = form.focused_text() {
                    field.insert(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = form.focused_text() {
                    field.backspace();
                }
            }
            KeyCode::Delete => {
                if let Some(field) = form.focused_text() {
                    field.delete();
                }
            }
            KeyCode::Left => match form.focused_text() {
                Some(field) => field.move_left(),
                None => {
                    if form.focus == FormField::Verdict {
                        form.toggle();
                    }
                }
            },
            KeyCode::Right => match form.focused_text() {
                Some(field) => field.move_right(),
                None => {
                    if form.focus == FormField::Verdict {
                        form.toggle();
                    }
                }
            },
            KeyCode::Home => {
                if let Some(field) = form.focused_text() {
                    field.move_home();
                }
            }
            KeyCode::End => {
                if let Some(field) = form.focused_text() {
                    field.move_end();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn submit_form(&mut self) -> Result<()> {
        let Some(form) = self.form.as_ref() else {
            return Ok(());
        };
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let submission = form.submission();
        let errors = session.submit(&submission)?;

        if !errors.is_empty() {
            if let Some(form) = self.form.as_mut() {
                form.errors = errors;
            }
            return Ok(());
        }

        self.context_scroll = 0;
        if session.is_finished() {
            session.mark_complete()?;
            info!("All records judged; study complete");
            self.form = None;
            self.screen = Screen::Finished;
        } else {
            let record = session.current().cloned();
            self.form = record.as_ref().map(AnnotateForm::for_record);
        }
        Ok(())
    }

    fn logout(&mut self) {
        info!("User logged out");
        self.username = None;
        self.session = None;
        self.form = None;
        self.calibration = CalibrationState::default();
        self.login = LoginState::default();
        self.refresh_users();
        self.screen = Screen::Login;
    }

    fn refresh_users(&mut self) {
        let users = profile::list_users(&self.layout);
        let (completed, known): (Vec<String>, Vec<String>) = users
            .into_iter()
            .partition(|user| ProfileStore::new(&self.layout, user).is_complete());

        self.login.known_users = known;
        self.login.completed_users = completed;
    }
}
