//! Subtask suggestions: the prompt we send and how the reply is split.
//!
//! The model's answer is not validated beyond this: one subtask per non-blank
//! line, list markers stripped.

use anyhow::Result;
use regex::Regex;

pub const DEFAULT_SUBTASK_COUNT: usize = 3;

pub fn subtask_prompt(title: &str, count: usize) -> String {
    format!(
        "Act as a productivity assistant.\n\
Task: \"{}\".\n\
Break this down into {} simple, actionable sub-tasks.\n\
Return ONLY the sub-tasks as a list, one per line. No intro.",
        title.trim(),
        count
    )
}

/// Split a model reply into subtask texts.
///
/// Leading `*`, `-`, `•`, `1.` and `1)` markers are removed; blank lines and
/// lines that were only a marker are dropped.
pub fn parse_subtask_lines(reply: &str) -> Result<Vec<String>> {
    let marker = Regex::new(r"^\s*(?:[*\-•]+|\d+[.)])\s*")?;

    Ok(reply
        .lines()
        .map(|line| marker.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bullets_and_numbers() {
        let reply = "* Pick a date\n- Book the venue\n\n3. Send invites\n4) Order cake\n• Confirm RSVPs\n";
        let out = parse_subtask_lines(reply).unwrap();
        assert_eq!(
            out,
            vec!["Pick a date", "Book the venue", "Send invites", "Order cake", "Confirm RSVPs"]
        );
    }

    #[test]
    fn keeps_inner_hyphens_and_drops_empty_markers() {
        let out = parse_subtask_lines("- follow-up with Sam\n-\n   \nplain line").unwrap();
        assert_eq!(out, vec!["follow-up with Sam", "plain line"]);
    }

    #[test]
    fn empty_reply_gives_no_subtasks() {
        assert!(parse_subtask_lines("").unwrap().is_empty());
    }

    #[test]
    fn prompt_mentions_title_and_count() {
        let p = subtask_prompt("  Plan a party ", 4);
        assert!(p.contains("\"Plan a party\""));
        assert!(p.contains("4 simple"));
    }
}
