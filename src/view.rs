//! The widget's view model.
//!
//! The controller mutates this; the hosts only read it. `markup` turns it into
//! an HTML element tree and `ui` draws it in the terminal.

use crate::markdown;

pub const STATUS_ONLINE: &str = "En línea | Respuesta inmediata";
pub const STATUS_STARTING: &str = "Activando el chat...";
pub const INPUT_PLACEHOLDER: &str = "Escribe tu mensaje...";
pub const THINKING_TEXT: &str = "Pensando... 🌻";
pub const GREETING: &str = "👋 ¡Hola! Soy el asistente virtual.\nPuedo ayudarte con la **cartelera** o hacer una **reserva**.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BubbleId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    Bot,
    User,
}

impl Author {
    /// CSS class of the message row.
    pub fn class(&self) -> &'static str {
        match self {
            Author::Bot => "bot",
            Author::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub id: BubbleId,
    pub author: Author,
    pub text: String,
    /// Transient "thinking" placeholder; never part of the transcript.
    pub placeholder: bool,
}

impl Bubble {
    /// HTML body of the bubble. Only bot text is interpreted as markdown-lite;
    /// user text is always literal.
    pub fn html(&self) -> String {
        match (self.author, self.placeholder) {
            (Author::Bot, false) => markdown::to_html(&self.text),
            _ => markdown::escape_html(&self.text),
        }
    }
}

/// The message input. Its value can never hold more than `max_chars`
/// characters once `set_value` has run.
#[derive(Debug, Clone)]
pub struct InputField {
    value: String,
    max_chars: usize,
    pub enabled: bool,
}

impl InputField {
    pub fn new(max_chars: usize) -> Self {
        Self {
            value: String::new(),
            max_chars,
            enabled: false,
        }
    }

    /// Replace the value, truncating to the cap.
    pub fn set_value(&mut self, value: &str) {
        self.value = match value.char_indices().nth(self.max_chars) {
            Some((byte_idx, _)) => value[..byte_idx].to_string(),
            None => value.to_string(),
        };
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn char_count(&self) -> usize {
        self.value.chars().count()
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Counter text shown next to the input, e.g. `12/120`.
    pub fn counter(&self) -> String {
        format!("{}/{}", self.char_count(), self.max_chars)
    }
}

#[derive(Debug, Clone)]
pub struct WidgetView {
    pub title: String,
    pub status: String,
    /// Whether the chat panel is shown (toggled from the launcher button).
    pub open: bool,
    pub bubbles: Vec<Bubble>,
    pub input: InputField,
    pub send_enabled: bool,
    next_bubble: u64,
}

impl WidgetView {
    /// The freshly mounted widget: closed, starting up, greeting shown.
    pub fn mount(title: &str, max_chars: usize) -> Self {
        let mut view = Self {
            title: title.to_string(),
            status: STATUS_STARTING.to_string(),
            open: false,
            bubbles: Vec::new(),
            input: InputField::new(max_chars),
            send_enabled: false,
            next_bubble: 0,
        };
        view.push_bubble(Author::Bot, GREETING, false);
        view
    }

    pub fn push_bubble(&mut self, author: Author, text: &str, placeholder: bool) -> BubbleId {
        let id = BubbleId(self.next_bubble);
        self.next_bubble += 1;
        self.bubbles.push(Bubble {
            id,
            author,
            text: text.to_string(),
            placeholder,
        });
        id
    }

    pub fn remove_bubble(&mut self, id: BubbleId) -> bool {
        let before = self.bubbles.len();
        self.bubbles.retain(|b| b.id != id);
        self.bubbles.len() != before
    }

    pub fn has_placeholder(&self) -> bool {
        self.bubbles.iter().any(|b| b.placeholder)
    }

    pub fn last_bubble(&self) -> Option<&Bubble> {
        self.bubbles.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_truncates_on_every_set() {
        let mut input = InputField::new(5);
        input.set_value("hola mundo");
        assert_eq!(input.value(), "hola ");
        assert_eq!(input.counter(), "5/5");

        input.set_value("abc");
        assert_eq!(input.value(), "abc");
        assert_eq!(input.counter(), "3/5");
    }

    #[test]
    fn test_input_counts_characters_not_bytes() {
        let mut input = InputField::new(3);
        input.set_value("ñandú");
        assert_eq!(input.value(), "ñan");
        assert_eq!(input.char_count(), 3);
    }

    #[test]
    fn test_mount_shows_greeting_and_starting_status() {
        let view = WidgetView::mount("Sala Girasol 🌻", 120);
        assert!(!view.open);
        assert_eq!(view.status, STATUS_STARTING);
        assert_eq!(view.bubbles.len(), 1);
        assert!(view.bubbles[0].html().contains("<b>cartelera</b>"));
        assert_eq!(view.input.counter(), "0/120");
    }

    #[test]
    fn test_user_bubble_is_never_markup() {
        let mut view = WidgetView::mount("t", 120);
        let id = view.push_bubble(Author::User, "**<img src=x>**", false);
        let bubble = view.bubbles.iter().find(|b| b.id == id).unwrap();
        assert_eq!(bubble.html(), "**&lt;img src=x&gt;**");
    }

    #[test]
    fn test_remove_bubble_by_id() {
        let mut view = WidgetView::mount("t", 120);
        let id = view.push_bubble(Author::Bot, THINKING_TEXT, true);
        assert!(view.has_placeholder());
        assert!(view.remove_bubble(id));
        assert!(!view.has_placeholder());
        assert!(!view.remove_bubble(id));
    }
}
