use super::form::FormField;

/// Input areas of the screen, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Focus {
    Filter,
    Name,
    Number,
    List,
}

impl Focus {
    pub fn title(self) -> &'static str {
        match self {
            Focus::Filter => "FILTER",
            Focus::Name => "NAME",
            Focus::Number => "NUMBER",
            Focus::List => "NUMBERS",
        }
    }

    /// Next area, wrapping around
    pub fn next(self) -> Self {
        match self {
            Focus::Filter => Focus::Name,
            Focus::Name => Focus::Number,
            Focus::Number => Focus::List,
            Focus::List => Focus::Filter,
        }
    }

    /// Previous area, wrapping around
    pub fn prev(self) -> Self {
        match self {
            Focus::Filter => Focus::List,
            Focus::Name => Focus::Filter,
            Focus::Number => Focus::Name,
            Focus::List => Focus::Number,
        }
    }

    pub fn form_field(self) -> Option<FormField> {
        match self {
            Focus::Name => Some(FormField::Name),
            Focus::Number => Some(FormField::Number),
            Focus::Filter | Focus::List => None,
        }
    }
}
