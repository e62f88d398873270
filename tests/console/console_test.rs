//! Console transport loop.

use std::sync::Arc;

use fasilbot::bot::replies;
use fasilbot::console::{run_console, ConsoleSender};
use fasilbot::recap::RecapOutcome;

use crate::support::{harness_with, report_sheet, user_sheet, ScriptedProvider};

fn sender() -> ConsoleSender {
    ConsoleSender {
        sender_id: "console".to_owned(),
        display_name: "Ayu".to_owned(),
    }
}

#[tokio::test]
async fn each_non_blank_line_gets_one_reply() {
    let users = Arc::new(user_sheet());
    let h = harness_with(
        users.clone(),
        Arc::new(report_sheet()),
        ScriptedProvider::replying("Siap membantu."),
        RecapOutcome::Success,
    );
    let input: &[u8] = b"/start\n\n   \n/laporan\nhalo\n";
    let mut output: Vec<u8> = Vec::new();

    let handled = run_console(&h.dispatcher, &sender(), input, &mut output).await;

    assert!(matches!(handled, Ok(3)));
    let expected = format!(
        "{}\n\n{}\n\n{}\n\n",
        replies::greeting("Ayu", true),
        replies::no_reports("Ayu"),
        "Siap membantu."
    );
    assert_eq!(String::from_utf8_lossy(&output), expected);
    assert_eq!(users.len().await, 1);
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn empty_input_handles_nothing() {
    let h = harness_with(
        Arc::new(user_sheet()),
        Arc::new(report_sheet()),
        ScriptedProvider::replying("unused"),
        RecapOutcome::Success,
    );
    let input: &[u8] = b"";
    let mut output: Vec<u8> = Vec::new();

    let handled = run_console(&h.dispatcher, &sender(), input, &mut output).await;

    assert!(matches!(handled, Ok(0)));
    assert!(output.is_empty());
}
