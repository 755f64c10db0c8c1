//! Text-entry primitives for prompt modes.
//!
//! [`InputBuffer`] is the single-line editing state behind the exec
//! prompt, group/sheet assignment and the lock screen's password line.
//! [`Completion`] cycles a candidate list filtered by the buffer content.

/// A single-line editing buffer with a cursor.
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    content: String,
    /// Byte offset of the cursor within `content`. Always on a char boundary.
    cursor: usize,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: impl Into<String>) -> Self {
        let content = content.into();
        let cursor = content.len();
        Self { content, cursor }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn insert(&mut self, ch: char) {
        self.content.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn insert_str(&mut self, s: &str) {
        self.content.insert_str(self.cursor, s);
        self.cursor += s.len();
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.content.remove(prev);
            self.cursor = prev;
        }
    }

    /// Delete the character under the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.content.len() {
            self.content.remove(self.cursor);
        }
    }

    /// Delete from the cursor back to the previous word boundary.
    pub fn delete_word(&mut self) {
        let head = &self.content[..self.cursor];
        let trimmed = head.trim_end();
        let start = trimmed
            .rfind(char::is_whitespace)
            .map_or(0, |idx| idx + 1);
        self.content.replace_range(start..self.cursor, "");
        self.cursor = start;
    }

    /// Delete everything after the cursor.
    pub fn kill_to_end(&mut self) {
        self.content.truncate(self.cursor);
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.cursor = prev;
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.content.len() {
            let mut next = self.cursor + 1;
            while !self.content.is_char_boundary(next) {
                next += 1;
            }
            self.cursor = next;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.content.len();
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    /// Replace the whole content, placing the cursor at the end.
    pub fn replace(&mut self, content: &str) {
        self.content.clear();
        self.content.push_str(content);
        self.cursor = self.content.len();
    }

    /// Take the content out, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.content)
    }

    fn prev_boundary(&self) -> Option<usize> {
        if self.cursor == 0 {
            return None;
        }
        let mut prev = self.cursor - 1;
        while !self.content.is_char_boundary(prev) {
            prev -= 1;
        }
        Some(prev)
    }
}

/// Cycles through candidates matching a typed prefix.
///
/// The candidate list is captured when completion starts and released by
/// the owning mode's cancel path.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    candidates: Vec<String>,
    matches: Vec<usize>,
    position: Option<usize>,
    prefix: String,
}

impl Completion {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            matches: Vec::new(),
            position: None,
            prefix: String::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.position.is_some()
    }

    /// Begin (or restart) completion for `prefix`.
    pub fn start(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
        self.matches = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.starts_with(prefix))
            .map(|(i, _)| i)
            .collect();
        self.position = None;
    }

    /// Advance to the next match, wrapping. Returns the candidate, or the
    /// original prefix once the cycle completes.
    pub fn next(&mut self) -> &str {
        if self.matches.is_empty() {
            return &self.prefix;
        }
        let next = match self.position {
            None => 0,
            Some(pos) if pos + 1 < self.matches.len() => pos + 1,
            // Wrapped past the last match: show the typed prefix again.
            Some(_) => {
                self.position = None;
                return &self.prefix;
            }
        };
        self.position = Some(next);
        &self.candidates[self.matches[next]]
    }

    /// Step back to the previous match, wrapping.
    pub fn prev(&mut self) -> &str {
        if self.matches.is_empty() {
            return &self.prefix;
        }
        let prev = match self.position {
            None => self.matches.len() - 1,
            Some(0) => {
                self.position = None;
                return &self.prefix;
            }
            Some(pos) => pos - 1,
        };
        self.position = Some(prev);
        &self.candidates[self.matches[prev]]
    }

    /// Drop all completion state. Called from the owning mode's cancel.
    pub fn reset(&mut self) {
        self.matches.clear();
        self.position = None;
        self.prefix.clear();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn insert_and_cursor_movement() {
        let mut buf = InputBuffer::new();
        for ch in "term".chars() {
            buf.insert(ch);
        }
        assert_eq!(buf.content(), "term");
        assert_eq!(buf.cursor(), 4);

        buf.move_left();
        buf.move_left();
        buf.insert('a');
        assert_eq!(buf.content(), "tearm");
    }

    #[test]
    fn backspace_and_delete() {
        let mut buf = InputBuffer::with_content("abc");
        buf.backspace();
        assert_eq!(buf.content(), "ab");

        buf.move_home();
        buf.delete();
        assert_eq!(buf.content(), "b");

        buf.backspace(); // cursor at 0, no-op
        assert_eq!(buf.content(), "b");
    }

    #[test]
    fn multibyte_editing() {
        let mut buf = InputBuffer::new();
        buf.insert('é');
        buf.insert('x');
        buf.move_left();
        buf.move_left();
        buf.move_right();
        buf.backspace();
        assert_eq!(buf.content(), "x");
    }

    #[test]
    fn delete_word() {
        let mut buf = InputBuffer::with_content("foo bar baz");
        buf.delete_word();
        assert_eq!(buf.content(), "foo bar ");
        buf.delete_word();
        assert_eq!(buf.content(), "foo ");
    }

    #[test]
    fn take_resets() {
        let mut buf = InputBuffer::with_content("secret");
        assert_eq!(buf.take(), "secret");
        assert!(buf.is_empty());
        assert_eq!(buf.cursor(), 0);
    }

    #[test]
    fn completion_cycles_and_wraps() {
        let mut comp = Completion::new(vec![
            "terminal".into(),
            "text-editor".into(),
            "browser".into(),
        ]);
        comp.start("te");
        assert_eq!(comp.next(), "terminal");
        assert_eq!(comp.next(), "text-editor");
        // Wrap: back to the typed prefix
        assert_eq!(comp.next(), "te");
        assert_eq!(comp.next(), "terminal");
    }

    #[test]
    fn completion_prev_from_start() {
        let mut comp = Completion::new(vec!["alpha".into(), "alto".into()]);
        comp.start("al");
        assert_eq!(comp.prev(), "alto");
        assert_eq!(comp.prev(), "alpha");
        assert_eq!(comp.prev(), "al");
    }

    #[test]
    fn completion_no_matches() {
        let mut comp = Completion::new(vec!["alpha".into()]);
        comp.start("zz");
        assert_eq!(comp.next(), "zz");
        assert!(!comp.is_active());
    }
}
