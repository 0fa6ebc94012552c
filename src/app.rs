use girasol_widget::{ChatBackend, ChatWidget};

/// Terminal host state wrapped around the widget controller.
///
/// The widget owns everything the chat needs; the host only adds what a
/// terminal needs on top: cursor position, scroll offset and the animation
/// frame of the "thinking" bubble.
pub struct App<B: ChatBackend> {
    pub should_quit: bool,
    pub widget: ChatWidget<B>,

    // Input editing state
    pub cursor: usize, // cursor position in the input, in characters

    // Chat scroll state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub follow_tail: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl<B: ChatBackend> App<B> {
    pub fn new(widget: ChatWidget<B>) -> Self {
        Self {
            should_quit: false,
            widget,
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: true,
            animation_frame: 0,
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.widget.is_waiting_for_reply() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Push an edited value through the widget's input handler, which may
    /// truncate it, then keep the cursor inside the result.
    pub fn edit_input(&mut self, value: String, cursor: usize) {
        self.widget.input_changed(&value);
        self.cursor = cursor.min(self.widget.view().input.char_count());
    }

    pub fn send(&mut self) {
        self.widget.send_message();
        self.cursor = self.cursor.min(self.widget.view().input.char_count());
        self.follow_tail = true;
    }

    pub fn scroll_up(&mut self) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    /// Number of wrapped lines the chat body needs at the current width.
    pub fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for bubble in &self.widget.view().bubbles {
            total_lines = total_lines.saturating_add(1); // Author line
            for line in bubble.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                let wrapped = u16::try_from(char_count / wrap_width + 1).unwrap_or(u16::MAX);
                total_lines = total_lines.saturating_add(wrapped);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }
        total_lines
    }

    /// Keep the newest bubble in view unless the user scrolled away.
    pub fn clamp_scroll(&mut self) {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        let max_scroll = self.chat_line_count().saturating_sub(visible_height);

        if self.follow_tail || self.chat_scroll >= max_scroll {
            self.chat_scroll = max_scroll;
            self.follow_tail = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use girasol_widget::{ChatMessage, ChatRole, WidgetConfig, WidgetError};

    struct OfflineBackend;

    impl ChatBackend for OfflineBackend {
        async fn probe(&self) -> Result<(), WidgetError> {
            Err(WidgetError::MissingOrigin)
        }

        async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, WidgetError> {
            Err(WidgetError::MissingOrigin)
        }
    }

    fn app() -> App<OfflineBackend> {
        let config = WidgetConfig {
            api_origin: Some("http://girasol.test".into()),
            ..WidgetConfig::default()
        };
        let (widget, _events) = ChatWidget::initialize(config, OfflineBackend);
        App::new(widget)
    }

    #[tokio::test]
    async fn test_line_count_wraps_at_chat_width() {
        let mut app = app();
        app.chat_width = 10;
        let before = app.chat_line_count();
        app.widget.render_message(ChatRole::Assistant, &"a".repeat(25));
        // Author line, three wrapped rows, blank separator
        assert_eq!(app.chat_line_count(), before + 5);
    }

    #[tokio::test]
    async fn test_line_count_saturates_in_narrow_terminal() {
        let mut app = app();
        app.chat_width = 1;
        app.widget.render_message(ChatRole::Assistant, &"x".repeat(70_000));
        assert_eq!(app.chat_line_count(), u16::MAX);

        app.chat_height = 10;
        app.clamp_scroll();
        assert_eq!(app.chat_scroll, u16::MAX - 10);
    }
}
