//! Line-counting pager for server DISPLAY output.
//!
//! Deliberately minimal: external pagers buffer output, read ahead on
//! stdin, and some allow shelling out, none of which is acceptable
//! while a remote server owns the conversation. This one counts lines
//! and columns, synthesizes a newline when a line overflows the
//! window, and pauses with a `--More--` prompt at each page boundary.

use std::io::{self, Write};

/// Prompt shown at a page boundary.
pub(crate) const MORE_PROMPT: &[u8] = b"--More--";

const DEFAULT_ROWS: u16 = 24;
const DEFAULT_COLS: u16 = 80;

/// Key source used while the more-prompt is showing.
///
/// `begin`/`end` bracket the prompt's raw-mode window; the production
/// implementation saves the transmit-side terminal snapshot, disables
/// echo and canonical input, and restores afterwards.
pub(crate) trait PagerKeys {
    /// Prepares the terminal for single-key reads.
    fn begin(&mut self) {}
    /// Blocks for one key. `None` on end of file.
    fn key(&mut self) -> Option<u8>;
    /// Undoes [`PagerKeys::begin`].
    fn end(&mut self) {}
    /// Current window size, if known; consulted on a new page.
    fn size(&mut self) -> Option<(u16, u16)> {
        None
    }
}

/// How a [`Pager::write`] call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PagerWrite {
    /// Bytes rendered (zero when no session is active and input was
    /// discarded).
    Wrote(usize),
    /// The user pressed `q`: the session is over, the rest of this
    /// message was discarded, and an INTERRUPT should go to the
    /// server.
    Quit,
}

enum PromptAction {
    Line,
    Page,
    Quit,
}

/// Pager state across the DISPLAY frames of one session.
#[derive(Debug)]
pub(crate) struct Pager {
    session: bool,
    rows: u16,
    cols: u16,
    lines_out: u32,
    chars_out: u32,
}

impl Pager {
    pub fn new() -> Self {
        Self {
            session: false,
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            lines_out: 0,
            chars_out: 0,
        }
    }

    /// Starts a fresh session sized to `size` (falling back to 24×80
    /// when the terminal reports nothing useful), with a two-cell
    /// margin on each axis.
    pub fn reset(&mut self, size: Option<(u16, u16)>) {
        let (mut rows, mut cols) = size.unwrap_or((0, 0));
        if rows == 0 {
            rows = DEFAULT_ROWS;
        }
        if cols == 0 {
            cols = DEFAULT_COLS;
        }
        if rows >= 2 {
            rows -= 2;
        }
        if cols >= 2 {
            cols -= 2;
        }

        self.rows = rows;
        self.cols = cols;
        self.lines_out = 0;
        self.chars_out = 0;
        self.session = true;

        logging::log_debug!("pager session: {rows} rows, {cols} cols");
    }

    /// Renders `buf` through the pager.
    ///
    /// With no active session the bytes are discarded and
    /// `Wrote(0)` is returned: this is the documented behavior between
    /// a `q` and the next non-DISPLAY message, when the server is
    /// still streaming output the user refused.
    pub fn write<W: Write, K: PagerKeys>(
        &mut self,
        out: &mut W,
        keys: &mut K,
        buf: &[u8],
    ) -> io::Result<PagerWrite> {
        if !self.session {
            return Ok(PagerWrite::Wrote(0));
        }

        for &ch in buf {
            out.write_all(&[ch])?;
            self.chars_out += 1;

            if ch == b'\n' {
                self.chars_out = 0;
                self.lines_out += 1;
            } else if self.chars_out > u32::from(self.cols) {
                out.write_all(b"\n")?;
                self.chars_out = 0;
                self.lines_out += 1;
            }

            if self.lines_out > u32::from(self.rows) {
                match self.more_prompt(out, keys)? {
                    PromptAction::Line => self.lines_out -= 1,
                    PromptAction::Page => self.reset(keys.size()),
                    PromptAction::Quit => {
                        self.session = false;
                        return Ok(PagerWrite::Quit);
                    }
                }
            }
        }

        Ok(PagerWrite::Wrote(buf.len()))
    }

    fn more_prompt<W: Write, K: PagerKeys>(
        &mut self,
        out: &mut W,
        keys: &mut K,
    ) -> io::Result<PromptAction> {
        out.write_all(MORE_PROMPT)?;
        out.flush()?;
        keys.begin();

        let action = loop {
            match keys.key() {
                // NUL arrives from some terminals on a bare Enter; the
                // digit form is accepted for the same purpose.
                None | Some(b'\n' | b'\r' | b'j' | 0x00 | b'0') => break PromptAction::Line,
                Some(b'q') => break PromptAction::Quit,
                Some(b' ') => break PromptAction::Page,
                Some(_) => {}
            }
        };

        // Erase the prompt in place, even when the cursor is already
        // at the line start.
        for _ in 0..MORE_PROMPT.len() {
            out.write_all(b"\x08 \x08")?;
        }
        out.flush()?;
        keys.end();

        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedKeys {
        script: Vec<u8>,
        at: usize,
        begins: u32,
        ends: u32,
        size: Option<(u16, u16)>,
    }

    impl ScriptedKeys {
        fn new(script: &[u8]) -> Self {
            Self {
                script: script.to_vec(),
                at: 0,
                begins: 0,
                ends: 0,
                size: None,
            }
        }
    }

    impl PagerKeys for ScriptedKeys {
        fn begin(&mut self) {
            self.begins += 1;
        }

        fn key(&mut self) -> Option<u8> {
            let key = self.script.get(self.at).copied();
            self.at += 1;
            key
        }

        fn end(&mut self) {
            self.ends += 1;
        }

        fn size(&mut self) -> Option<(u16, u16)> {
            self.size
        }
    }

    fn small_pager() -> Pager {
        let mut pager = Pager::new();
        // 5 rows, 10 cols before margins -> 3 usable rows, 8 cols.
        pager.reset(Some((5, 10)));
        pager
    }

    #[test]
    fn reset_substitutes_defaults_for_zero_dimensions() {
        let mut pager = Pager::new();
        pager.reset(Some((0, 0)));
        assert_eq!((pager.rows, pager.cols), (22, 78));
        assert!(pager.session);
    }

    #[test]
    fn reset_applies_margins() {
        let pager = small_pager();
        assert_eq!((pager.rows, pager.cols), (3, 8));
    }

    #[test]
    fn writes_without_a_session_are_discarded() {
        let mut pager = Pager::new();
        let mut out = Vec::new();
        let mut keys = ScriptedKeys::new(b"");
        let result = pager.write(&mut out, &mut keys, b"dropped").expect("discard");
        assert_eq!(result, PagerWrite::Wrote(0));
        assert!(out.is_empty());
    }

    #[test]
    fn short_output_passes_through_untouched() {
        let mut pager = small_pager();
        let mut out = Vec::new();
        let mut keys = ScriptedKeys::new(b"");
        let result = pager.write(&mut out, &mut keys, b"a\nb\n").expect("write");
        assert_eq!(result, PagerWrite::Wrote(4));
        assert_eq!(out, b"a\nb\n");
        assert_eq!(keys.begins, 0, "no page boundary, no prompt");
    }

    #[test]
    fn long_lines_get_a_synthesized_newline() {
        let mut pager = small_pager();
        let mut out = Vec::new();
        let mut keys = ScriptedKeys::new(b"\n\n\n\n\n\n");
        pager
            .write(&mut out, &mut keys, b"abcdefghijklm\n")
            .expect("write");
        let text = String::from_utf8_lossy(&out);
        // Nine characters fit (cols 8 means the tenth overflows);
        // the pager breaks the line itself.
        assert!(text.starts_with("abcdefghi\n"), "got {text:?}");
    }

    #[test]
    fn page_boundary_shows_and_erases_the_more_prompt() {
        let mut pager = small_pager();
        let mut out = Vec::new();
        let mut keys = ScriptedKeys::new(b"\n");
        pager
            .write(&mut out, &mut keys, b"1\n2\n3\n4\n")
            .expect("write");

        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("--More--"), "got {text:?}");
        assert!(text.contains("\x08 \x08"), "prompt must be erased");
        assert_eq!(keys.begins, 1);
        assert_eq!(keys.ends, 1);
    }

    #[test]
    fn enter_advances_one_line_at_a_time() {
        let mut pager = small_pager();
        let mut out = Vec::new();
        let mut keys = ScriptedKeys::new(b"\n\n\n\n\n\n\n\n");
        pager
            .write(&mut out, &mut keys, b"1\n2\n3\n4\n5\n6\n7\n8\n")
            .expect("write");
        // One prompt per line beyond the first page.
        assert_eq!(keys.begins, 5);
        assert!(String::from_utf8_lossy(&out).contains('8'));
    }

    #[test]
    fn space_starts_a_new_page() {
        let mut pager = small_pager();
        let mut out = Vec::new();
        let mut keys = ScriptedKeys::new(b" ");
        keys.size = Some((5, 10));
        pager
            .write(&mut out, &mut keys, b"1\n2\n3\n4\n5\n6\n")
            .expect("write");
        // A full page passed after the prompt without further pauses.
        assert_eq!(keys.begins, 1);
        assert!(pager.session);
    }

    #[test]
    fn unrecognized_keys_are_ignored_until_a_real_one() {
        let mut pager = small_pager();
        let mut out = Vec::new();
        let mut keys = ScriptedKeys::new(b"xzy\n");
        pager
            .write(&mut out, &mut keys, b"1\n2\n3\n4\n")
            .expect("write");
        assert_eq!(keys.at, 4, "three ignored keys plus the newline");
    }

    #[test]
    fn quit_ends_the_session_and_discards_the_rest() {
        let mut pager = small_pager();
        let mut out = Vec::new();
        let mut keys = ScriptedKeys::new(b"q");
        let result = pager
            .write(&mut out, &mut keys, b"1\n2\n3\n4\n5\n6\n")
            .expect("write");

        assert_eq!(result, PagerWrite::Quit);
        assert!(!pager.session);
        let text = String::from_utf8_lossy(&out);
        assert!(!text.contains('5'), "output after the quit must not render");

        // Later frames of the same burst are dropped silently.
        let result = pager.write(&mut out, &mut keys, b"more\n").expect("write");
        assert_eq!(result, PagerWrite::Wrote(0));
    }

    #[test]
    fn rendered_lines_never_exceed_the_window_width() {
        let mut pager = small_pager();
        let mut out = Vec::new();
        let mut keys = ScriptedKeys::new(b"\n\n\n\n\n\n\n\n\n\n\n\n");
        pager
            .write(&mut out, &mut keys, b"word word word word word word word")
            .expect("write");

        // Strip the prompt and its erase sequence, then check that
        // every rendered line stays within cols + 1 cells (the
        // overflowing character is written before the break).
        let text = String::from_utf8_lossy(&out)
            .replace("--More--", "")
            .replace("\x08 \x08", "");
        for line in text.split('\n') {
            assert!(
                line.len() <= usize::from(pager.cols) + 1,
                "line {line:?} exceeds the window"
            );
        }
        assert!(pager.chars_out <= u32::from(pager.cols) + 1);
    }
}
