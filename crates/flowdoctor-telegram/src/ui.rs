//! Keyboards and message shaping.

use std::fmt::Write as _;

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::conversation::{
    ConfirmPurpose, MenuItem, CONFIRM_NO_DATA, CONFIRM_NO_LABEL, CONFIRM_YES_DATA,
    CONFIRM_YES_LABEL,
};

/// Telegram's per-message character limit.
pub const MESSAGE_LIMIT: usize = 4096;

/// Room kept free in each HTML chunk for closing and reopening tags.
const TAG_RESERVE: usize = 64;

/// Persistent two-by-two reply keyboard with the menu items.
pub fn menu_keyboard() -> KeyboardMarkup {
    let rows = [
        [MenuItem::Debug, MenuItem::Ask],
        [MenuItem::Reset, MenuItem::Help],
    ]
    .into_iter()
    .map(|row| {
        row.into_iter()
            .map(|item| KeyboardButton::new(item.label()))
            .collect::<Vec<_>>()
    })
    .collect::<Vec<_>>();

    KeyboardMarkup::new(rows).resize_keyboard()
}

/// Yes/No inline buttons for a pending confirmation.
pub fn confirm_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(CONFIRM_YES_LABEL, CONFIRM_YES_DATA),
        InlineKeyboardButton::callback(CONFIRM_NO_LABEL, CONFIRM_NO_DATA),
    ]])
}

/// Question shown with the confirmation buttons.
pub fn confirm_prompt(purpose: &ConfirmPurpose) -> String {
    match purpose {
        ConfirmPurpose::SwitchAutomation { automation_id } => format!(
            "Switch to automation <code>{automation_id}</code>?\n\
            The current conversation will be cleared."
        ),
        ConfirmPurpose::ResetConversation => {
            "Reset the conversation?\nThe current automation and chat history will be cleared."
                .to_string()
        }
    }
}

/// Split `text` into chunks of at most `limit` characters.
///
/// Splits on line boundaries; a single line longer than `limit` is cut
/// between characters, never inside an HTML tag or entity.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let sep = usize::from(!current.is_empty());

        if current_len + sep + line_len <= limit {
            if sep == 1 {
                current.push('\n');
            }
            current.push_str(line);
            current_len += sep + line_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
            continue;
        }

        for atom in cut_units(line, limit) {
            let n = atom.chars().count();
            if current_len + n > limit {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push_str(atom);
            current_len += n;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Split Telegram HTML so that every chunk parses on its own.
///
/// Tags still open at a chunk edge are closed there and reopened at the
/// start of the next chunk.
pub fn split_html(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let budget = limit.saturating_sub(TAG_RESERVE).max(1);
    let mut open: Vec<(String, String)> = Vec::new();
    split_message(text, budget)
        .into_iter()
        .map(|chunk| {
            let mut out: String = open.iter().map(|(_, tag)| tag.as_str()).collect();
            out.push_str(&chunk);
            track_tags(&chunk, &mut open);
            for (name, _) in open.iter().rev() {
                let _ = write!(out, "</{name}>");
            }
            out
        })
        .collect()
}

/// Update the stack of open `(name, opening tag)` pairs with the tags in `chunk`.
fn track_tags(chunk: &str, open: &mut Vec<(String, String)>) {
    for atom in atoms(chunk) {
        let Some(inner) = atom.strip_prefix('<').and_then(|a| a.strip_suffix('>')) else {
            continue;
        };
        if let Some(name) = inner.strip_prefix('/') {
            if let Some(pos) = open.iter().rposition(|(n, _)| n == name.trim()) {
                open.remove(pos);
            }
        } else if let Some(name) = inner.split_whitespace().next() {
            open.push((name.to_string(), atom.to_string()));
        }
    }
}

/// Atoms of `line`, with any atom longer than `limit` broken into characters.
fn cut_units(line: &str, limit: usize) -> Vec<&str> {
    atoms(line)
        .into_iter()
        .flat_map(|atom| {
            if atom.chars().count() <= limit {
                vec![atom]
            } else {
                atom.char_indices()
                    .map(|(i, c)| &atom[i..i + c.len_utf8()])
                    .collect()
            }
        })
        .collect()
}

/// Tags and entities as single units, everything else one character each.
fn atoms(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        let len = match c {
            '<' => rest[1..]
                .find(|ch: char| matches!(ch, '>' | '<' | '\n'))
                .filter(|&i| rest.as_bytes()[i + 1] == b'>')
                .map(|i| i + 2),
            '&' => rest[1..]
                .find(|ch: char| !ch.is_ascii_alphanumeric() && ch != '#')
                .filter(|&i| (1..=10).contains(&i) && rest.as_bytes()[i + 1] == b';')
                .map(|i| i + 2),
            _ => None,
        }
        .unwrap_or(c.len_utf8());
        let (atom, tail) = rest.split_at(len);
        out.push(atom);
        rest = tail;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_is_single_chunk() {
        assert_eq!(split_message("hello\nworld", 100), vec!["hello\nworld"]);
        assert_eq!(split_message("", 100), vec![""]);
    }

    #[test]
    fn test_split_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = split_message(text, 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn test_long_line_is_hard_split() {
        let text = format!("intro\n{}\nend", "x".repeat(25));
        let chunks = split_message(&text, 10);

        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks[0], "intro");
        assert_eq!(chunks[1], "x".repeat(10));
        assert_eq!(chunks[2], "x".repeat(10));
        assert_eq!(chunks[3], "xxxxx\nend");
        assert_eq!(chunks.concat().replace('\n', ""), text.replace('\n', ""));
    }

    #[test]
    fn test_split_counts_chars_not_bytes() {
        let text = "🔍🔍🔍\n🔍🔍🔍";
        assert_eq!(split_message(text, 7), vec![text.to_string()]);
        assert_eq!(split_message(text, 4), vec!["🔍🔍🔍", "🔍🔍🔍"]);
    }

    #[test]
    fn test_report_sized_message_respects_limit() {
        let line = "❌ 2026-01-05 10:00 - failed";
        let text = vec![line; 400].join("\n");
        let chunks = split_message(&text, MESSAGE_LIMIT);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MESSAGE_LIMIT));
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_html_chunks_stay_balanced() {
        let text = format!("<b>Report</b>\n<pre>{}</pre>", "y".repeat(100));
        let chunks = split_html(&text, 80);

        assert!(chunks.len() > 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 80);
            assert_eq!(chunk.matches("<pre>").count(), chunk.matches("</pre>").count());
            assert_eq!(chunk.matches("<b>").count(), chunk.matches("</b>").count());
        }
        assert!(chunks[1].starts_with("<pre>"));
        assert!(chunks.last().unwrap().starts_with("<pre>y"));

        let plain: String = chunks
            .iter()
            .map(|c| {
                ["<pre>", "</pre>", "<b>", "</b>"]
                    .iter()
                    .fold(c.clone(), |acc, tag| acc.replace(tag, ""))
            })
            .collect();
        assert_eq!(plain, format!("Report{}", "y".repeat(100)));
    }

    #[test]
    fn test_entities_are_not_cut() {
        let text = "&amp;".repeat(30);
        let chunks = split_message(&text, 7);
        assert_eq!(chunks.len(), 30);
        assert!(chunks.iter().all(|c| c == "&amp;"));
    }

    #[test]
    fn test_short_html_is_untouched() {
        assert_eq!(split_html("<b>ok</b>", MESSAGE_LIMIT), vec!["<b>ok</b>"]);
    }

    #[test]
    fn test_confirm_prompt_names_target() {
        let prompt = confirm_prompt(&ConfirmPurpose::SwitchAutomation {
            automation_id: "abc".to_string(),
        });
        assert!(prompt.contains("<code>abc</code>"));
        assert!(confirm_prompt(&ConfirmPurpose::ResetConversation).starts_with("Reset"));
    }
}
