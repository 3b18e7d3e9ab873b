use std::io::stdout;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::UnboundedReceiver;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use tui_widgets::popup::PopupState;

use crate::config::{Config, UiColors};
use crate::contact::Contact;
use crate::controller::effects::Executor;
use crate::controller::{Action, Effect, Phonebook};
use crate::remote::ContactService;

use super::draw;
use super::focus::Focus;
use super::form::ContactForm;
use super::keys::key_matches_any;

/// How long the loop waits for a completion before polling input again
const INPUT_POLL: Duration = Duration::from_millis(50);

pub struct App<'a, S> {
    config: &'a Config,
    pub book: Phonebook,
    executor: Executor<S>,
    inbox: UnboundedReceiver<Action>,
    pub focus: Focus,
    pub filter_input: Input,
    pub form: ContactForm,
    pub selected: usize,
    /// Blocking message; swallows all input until dismissed
    pub alert: Option<String>,
    /// Contact awaiting delete confirmation
    pub pending_delete: Option<Contact>,
    pub modal_popup: PopupState,
}

impl<'a, S: ContactService + 'static> App<'a, S> {
    pub fn new(config: &'a Config, service: Rc<S>) -> Self {
        let (executor, inbox) = Executor::new(service);
        Self {
            config,
            book: Phonebook::new(config.notice_timeout),
            executor,
            inbox,
            focus: Focus::Name,
            filter_input: Input::default(),
            form: ContactForm::default(),
            selected: 0,
            alert: None,
            pending_delete: None,
            modal_popup: PopupState::default(),
        }
    }

    /// Must be awaited inside a `LocalSet`.
    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal).await;

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        self.dispatch(Action::Mount);

        loop {
            draw::render(terminal, self)?;

            if event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key) {
                            break;
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
                continue;
            }

            self.pump(INPUT_POLL).await;
        }

        tracing::info!("leaving phonebook");
        Ok(())
    }

    /// Wait up to `timeout` for one task completion and apply it.
    async fn pump(&mut self, timeout: Duration) {
        let next = tokio::select! {
            action = self.inbox.recv() => action,
            _ = tokio::time::sleep(timeout) => None,
        };
        if let Some(action) = next {
            self.dispatch(action);
        }
    }

    fn dispatch(&mut self, action: Action) {
        for effect in self.book.update(action) {
            match effect {
                Effect::Task(task) => self.executor.spawn(task),
                Effect::Alert(message) => {
                    self.modal_popup = PopupState::default();
                    self.alert = Some(message);
                }
                Effect::ResetForm => self.form.reset(),
            }
        }
        self.clamp_selection();
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Ctrl+C always quits (hardcoded for safety)
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return true;
        }

        if self.alert.is_some() {
            self.handle_alert_key(key);
            return false;
        }

        if self.pending_delete.is_some() {
            self.handle_confirm_key(key);
            return false;
        }

        let config = self.config;
        let keys = &config.keys.global;
        if key_matches_any(&key, &keys.next_focus) {
            self.focus = self.focus.next();
            return false;
        }
        if key_matches_any(&key, &keys.prev_focus) {
            self.focus = self.focus.prev();
            return false;
        }
        if key_matches_any(&key, &keys.refresh) {
            self.dispatch(Action::Refresh);
            return false;
        }

        match self.focus {
            Focus::Filter => {
                self.handle_filter_key(key);
                false
            }
            Focus::Name | Focus::Number => {
                self.handle_form_key(key);
                false
            }
            Focus::List => self.handle_list_key(key),
        }
    }

    fn handle_alert_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.modal;
        if key_matches_any(&key, &keys.confirm) || key_matches_any(&key, &keys.cancel) {
            self.alert = None;
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.modal;
        if key_matches_any(&key, &keys.confirm) {
            if let Some(contact) = self.pending_delete.take() {
                self.dispatch(Action::Delete(contact));
            }
        } else if key_matches_any(&key, &keys.cancel) {
            self.pending_delete = None;
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.filter;
        if key_matches_any(&key, &keys.confirm) {
            self.focus = Focus::List;
            return;
        }
        if key_matches_any(&key, &keys.clear) {
            self.filter_input.reset();
            self.dispatch(Action::SetFilter(String::new()));
            return;
        }

        if let Some(change) = self.filter_input.handle_event(&Event::Key(key)) {
            if change.value {
                let text = self.filter_input.value().to_string();
                self.dispatch(Action::SetFilter(text));
            }
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let config = self.config;
        let keys = &config.keys.form;
        if key_matches_any(&key, &keys.submit) {
            let (name, number) = self.form.submission();
            self.dispatch(Action::Submit { name, number });
            return;
        }
        if key_matches_any(&key, &keys.cancel) {
            self.focus = Focus::List;
            return;
        }

        if let Some(field) = self.focus.form_field() {
            self.form.handle_key_event(field, key);
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> bool {
        let config = self.config;
        let keys = &config.keys.list;
        if key_matches_any(&key, &keys.quit) {
            return true;
        }

        if key_matches_any(&key, &keys.next) {
            let len = self.book.visible().len();
            if self.selected + 1 < len {
                self.selected += 1;
            }
        } else if key_matches_any(&key, &keys.prev) {
            self.selected = self.selected.saturating_sub(1);
        } else if key_matches_any(&key, &keys.delete) {
            self.request_delete();
        } else if key_matches_any(&key, &keys.filter) {
            self.focus = Focus::Filter;
        } else if key_matches_any(&key, &keys.add) {
            self.focus = Focus::Name;
        }
        false
    }

    fn request_delete(&mut self) {
        let Some(contact) = self.selected_contact().cloned() else {
            return;
        };

        if self.config.ui.confirm_delete {
            self.modal_popup = PopupState::default();
            self.pending_delete = Some(contact);
        } else {
            self.dispatch(Action::Delete(contact));
        }
    }

    pub fn selected_contact(&self) -> Option<&Contact> {
        self.book.visible().get(self.selected).copied()
    }

    fn clamp_selection(&mut self) {
        let len = self.book.visible().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}

impl<'a, S> App<'a, S> {
    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn server_url(&self) -> &str {
        &self.config.server_url
    }
}
