use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Number,
}

/// The add-contact inputs. Holds raw text only; validation is the
/// phonebook's job.
#[derive(Default)]
pub struct ContactForm {
    name: Input,
    number: Input,
}

impl ContactForm {
    pub fn value(&self, field: FormField) -> &str {
        self.input(field).value()
    }

    pub fn visual_cursor(&self, field: FormField) -> usize {
        self.input(field).visual_cursor()
    }

    pub fn handle_key_event(&mut self, field: FormField, key: KeyEvent) -> bool {
        self.input_mut(field).handle_event(&Event::Key(key)).is_some()
    }

    /// Current `(name, number)` exactly as typed
    pub fn submission(&self) -> (String, String) {
        (self.name.value().to_string(), self.number.value().to_string())
    }

    pub fn reset(&mut self) {
        self.name.reset();
        self.number.reset();
    }

    fn input(&self, field: FormField) -> &Input {
        match field {
            FormField::Name => &self.name,
            FormField::Number => &self.number,
        }
    }

    fn input_mut(&mut self, field: FormField) -> &mut Input {
        match field {
            FormField::Name => &mut self.name,
            FormField::Number => &mut self.number,
        }
    }
}
