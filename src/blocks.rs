//! Splits the text of a movement report into one block per fiscal note.
//!
//! A block starts at a note identifier (digits and dashes, optionally suffixed with
//! `NFSE`) directly followed by the word `Nota`, and runs until the next such token,
//! a daily/establishment/grand total marker, or the end of the text.

use regex::Regex;
use std::sync::OnceLock;

fn note_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:[\d-]+-?NFSE|[\d-]+)\s*Nota").expect("note start regex"))
}

fn terminal_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Total do Dia|Total do Estabelecimento|T o t a l  G e r a l")
            .expect("terminal marker regex")
    })
}

/// Lazy iterator over the note blocks of one report, in source order.
pub struct NoteBlocks<'a> {
    text: &'a str,
    cursor: usize,
}

impl<'a> NoteBlocks<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, cursor: 0 }
    }
}

impl<'a> Iterator for NoteBlocks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.text.len() {
            return None;
        }

        let start = note_start_re().find_at(self.text, self.cursor)?;

        let next_note = note_start_re()
            .find_at(self.text, start.end())
            .map(|m| m.start());
        let next_marker = terminal_marker_re()
            .find_at(self.text, start.end())
            .map(|m| m.start());

        let end = [next_note, next_marker]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(self.text.len());

        self.cursor = end;
        Some(&self.text[start.start()..end])
    }
}

pub fn note_blocks(text: &str) -> NoteBlocks<'_> {
    NoteBlocks::new(text)
}
