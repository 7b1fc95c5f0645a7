use super::*;
use checkin_core::Activity;
use checkin_shared::{
    domain::{Employee, Question},
    error::SessionError,
};

fn quiz_active() -> SessionSnapshot {
    SessionSnapshot {
        employee: Some(Employee::new("EMP-20001", "Alice")),
        question: Some(Question::new("2+2?", ["3", "4", "5"])),
        ..SessionSnapshot::initial(SessionMode::Quiz)
    }
}

#[test]
fn unidentified_input_is_an_identifier() {
    let snapshot = SessionSnapshot::initial(SessionMode::Quiz);

    assert_eq!(
        parse_command("  EMP-20001 ", &snapshot),
        Command::Identify("EMP-20001".into())
    );
    assert_eq!(parse_command("", &snapshot), Command::Nothing);
    assert_eq!(
        parse_command(":summary", &snapshot),
        Command::SwitchMode(SessionMode::Summary)
    );
    assert_eq!(parse_command(":Quit", &snapshot), Command::Quit);
}

#[test]
fn answers_resolve_by_number_or_text() {
    let snapshot = quiz_active();

    assert_eq!(parse_command("2", &snapshot), Command::Answer("4".into()));
    assert_eq!(parse_command("5", &snapshot), Command::Answer("5".into()));
    assert_eq!(parse_command("0", &snapshot), Command::Unknown("0".into()));
    assert_eq!(parse_command("7", &snapshot), Command::Unknown("7".into()));
    assert_eq!(
        parse_command("four", &snapshot),
        Command::Unknown("four".into())
    );
}

#[test]
fn free_text_question_accepts_any_answer() {
    let snapshot = SessionSnapshot {
        question: Some(Question::new(
            "Describe the last near miss you reported.",
            Vec::<String>::new(),
        )),
        ..quiz_active()
    };

    assert_eq!(
        parse_command("Forklift reversing alarm fault", &snapshot),
        Command::Answer("Forklift reversing alarm fault".into())
    );
}

#[test]
fn enter_after_feedback_means_next_question() {
    let snapshot = SessionSnapshot {
        feedback: Some("Correct!".into()),
        ..quiz_active()
    };

    assert_eq!(parse_command("", &snapshot), Command::Next);
    assert_eq!(parse_command("2", &snapshot), Command::Unknown("2".into()));
}

#[test]
fn renders_numbered_options_and_error_line() {
    let snapshot = SessionSnapshot {
        error: Some(SessionError::PersistenceFailed),
        ..quiz_active()
    };

    let text = render(&snapshot);

    assert!(text.contains("Check in Quiz for EMP-20001"));
    assert!(text.contains("  1) 3\n  2) 4\n  3) 5\n"));
    assert!(text.contains("! Failed to record answer"));
}

#[test]
fn renders_entry_view_per_mode() {
    let quiz = render(&SessionSnapshot::initial(SessionMode::Quiz));
    let summary = render(&SessionSnapshot::initial(SessionMode::Summary));

    assert!(quiz.contains("Employee Check In"));
    assert!(summary.contains("Performance Summary"));
    assert!(summary.contains(":quiz"));
}

#[test]
fn progress_lines_follow_activity() {
    let loading = SessionSnapshot {
        question: None,
        activity: Activity::LoadingQuestion,
        ..quiz_active()
    };
    let recording = SessionSnapshot {
        feedback: Some("Correct!".into()),
        activity: Activity::RecordingResult,
        ..quiz_active()
    };

    assert_eq!(progress_line(&loading), Some("Loading question…"));
    assert_eq!(progress_line(&recording), Some("Recording result…"));
    assert_eq!(progress_line(&quiz_active()), None);
    assert!(render(&recording).contains("(recording result…)"));
}

#[test]
fn answered_question_without_feedback_takes_no_answer() {
    let snapshot = SessionSnapshot {
        answered: true,
        error: Some(SessionError::question_fetch_failed(None)),
        ..quiz_active()
    };

    assert_eq!(parse_command("2", &snapshot), Command::Unknown("2".into()));
    assert_eq!(parse_command(":retry", &snapshot), Command::Retry);
    let text = render(&snapshot);
    assert!(text.contains(":retry to try again"));
    assert!(text.contains("! Failed to fetch question"));
}
