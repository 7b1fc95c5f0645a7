//! Text rendering of the session snapshot and parsing of operator input.

use std::fmt::Write as _;

use checkin_core::{SessionPhase, SessionSnapshot};
use checkin_shared::domain::SessionMode;

pub const HELP: &str = "\
Commands:
  <employee id>   identify (start quiz or fetch summary)
  <n> | <option>  answer the current question
  :next           next question (or press Enter after feedback)
  :retry          retry the last failed fetch
  :quiz :summary  switch entry view before identifying
  :logout         end the session
  :quit           exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Identify(String),
    SwitchMode(SessionMode),
    Answer(String),
    Next,
    Retry,
    Logout,
    Quit,
    Help,
    Nothing,
    Unknown(String),
}

pub fn parse_command(line: &str, snapshot: &SessionSnapshot) -> Command {
    let input = line.trim();
    if let Some(keyword) = input.strip_prefix(':') {
        return match keyword.trim().to_ascii_lowercase().as_str() {
            "quiz" => Command::SwitchMode(SessionMode::Quiz),
            "summary" => Command::SwitchMode(SessionMode::Summary),
            "next" | "n" => Command::Next,
            "retry" | "r" => Command::Retry,
            "logout" => Command::Logout,
            "quit" | "q" | "exit" => Command::Quit,
            "help" | "h" | "?" => Command::Help,
            _ => Command::Unknown(input.to_string()),
        };
    }

    match snapshot.phase() {
        SessionPhase::FeedbackShown if input.is_empty() => Command::Next,
        _ if input.is_empty() => Command::Nothing,
        SessionPhase::Unidentified => Command::Identify(input.to_string()),
        SessionPhase::QuizActive => answer_for(input, snapshot),
        _ => Command::Unknown(input.to_string()),
    }
}

fn answer_for(input: &str, snapshot: &SessionSnapshot) -> Command {
    let Some(question) = &snapshot.question else {
        return Command::Unknown(input.to_string());
    };
    if question.options.is_empty() {
        return Command::Answer(input.to_string());
    }
    if let Ok(index) = input.parse::<usize>() {
        if let Some(option) = index.checked_sub(1).and_then(|i| question.options.get(i)) {
            return Command::Answer(option.clone());
        }
    }
    if question.has_option(input) {
        return Command::Answer(input.to_string());
    }
    Command::Unknown(input.to_string())
}

pub fn render(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    let employee_id = snapshot
        .employee
        .as_ref()
        .map(|employee| employee.id.to_string())
        .unwrap_or_default();

    match snapshot.phase() {
        SessionPhase::Unidentified => {
            let (title, action) = match snapshot.mode {
                SessionMode::Quiz => ("Employee Check In", "start the quiz"),
                SessionMode::Summary => ("Performance Summary", "check performance"),
            };
            let _ = writeln!(out, "== {title} ==");
            if snapshot.is_identifying() {
                let _ = writeln!(out, "Checking {}…", snapshot.employee_input.trim());
            } else {
                let _ = writeln!(out, "Enter Employee ID to {action} (e.g., EMP-20001)");
                let other = match snapshot.mode {
                    SessionMode::Quiz => ":summary to view a performance summary",
                    SessionMode::Summary => ":quiz to go back",
                };
                let _ = writeln!(out, "  {other}");
            }
        }
        SessionPhase::AwaitingQuestion => {
            let _ = writeln!(out, "Loading question…");
        }
        SessionPhase::AwaitingSummary => {
            let _ = writeln!(out, "Loading summary…");
        }
        SessionPhase::SubmittingAnswer => {
            let _ = writeln!(out, "Submitting answer…");
        }
        SessionPhase::QuizActive => {
            let _ = writeln!(out, "== Check in Quiz for {employee_id} ==");
            if let Some(question) = &snapshot.question {
                let _ = writeln!(out, "{}", question.question);
                for (index, option) in question.options.iter().enumerate() {
                    let _ = writeln!(out, "  {}) {option}", index + 1);
                }
                if question.options.is_empty() {
                    let _ = writeln!(out, "  (type your answer)");
                }
            }
            let _ = writeln!(out, "  :logout to leave");
        }
        SessionPhase::FeedbackShown => {
            let _ = writeln!(out, "== Check in Quiz for {employee_id} ==");
            if let Some(question) = &snapshot.question {
                let _ = writeln!(out, "{}", question.question);
            }
            if let Some(feedback) = &snapshot.feedback {
                let _ = writeln!(out, "Feedback: {feedback}");
            }
            if snapshot.is_recording_result() {
                let _ = writeln!(out, "  (recording result…)");
            } else {
                let _ = writeln!(out, "  [Enter] next question · :logout to leave");
            }
        }
        SessionPhase::SummaryShown => {
            let _ = writeln!(out, "== Performance summary for {employee_id} ==");
            if let Some(summary) = &snapshot.summary {
                let _ = writeln!(out, "{summary}");
            }
            let _ = writeln!(out, "  :logout to leave");
        }
        SessionPhase::Errored => {
            let _ = writeln!(out, "== {employee_id} ==");
            let _ = writeln!(out, "  :retry to try again · :logout to leave");
        }
    }

    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "! {error}");
    }
    out
}

/// One-line status for snapshots published while an operation is in flight.
pub fn progress_line(snapshot: &SessionSnapshot) -> Option<&'static str> {
    match snapshot.phase() {
        SessionPhase::Unidentified if snapshot.is_identifying() => Some("Checking…"),
        SessionPhase::AwaitingQuestion => Some("Loading question…"),
        SessionPhase::AwaitingSummary => Some("Loading summary…"),
        SessionPhase::SubmittingAnswer => Some("Submitting answer…"),
        SessionPhase::FeedbackShown if snapshot.is_recording_result() => {
            Some("Recording result…")
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
