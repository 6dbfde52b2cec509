//! Integration tests for the prompt loop.

#[path = "setup.rs"]
mod setup;

use crate::setup::setup;
use explorer::{
    intent::Intent,
    prompt::{Exit, Prompt},
    render::OutputFormat,
};
use session::SessionError;
use tokio::io::BufReader;

#[tokio::test]
async fn test_quit_disposes_controller() {
    let h = setup();
    let input = format!("address {}\nbalance {}\nquit\n", h.token, h.account);
    let mut out = Vec::new();

    let exit = Prompt::new(&h.controller, &h.metrics, OutputFormat::Table)
        .run(None, input.as_bytes(), &mut out, std::future::pending())
        .await
        .unwrap();

    assert_eq!(exit, Exit::Quit);
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Inspecting Tok (TOK)"));
    assert!(out.contains("Balance of"));
    assert_eq!(h.chain.live_subscriptions(h.token), 0);
}

#[tokio::test]
async fn test_startup_intent_and_end_of_input() {
    let h = setup();
    let mut out = Vec::new();

    let exit = Prompt::new(&h.controller, &h.metrics, OutputFormat::Table)
        .run(
            Some(Intent::SetAddress(h.token)),
            &b""[..],
            &mut out,
            std::future::pending(),
        )
        .await
        .unwrap();

    assert_eq!(exit, Exit::EndOfInput);
    assert!(String::from_utf8(out).unwrap().contains("Inspecting Tok (TOK)"));
    assert_eq!(h.chain.subscriptions_opened(), 1);
    assert_eq!(h.chain.live_subscriptions(h.token), 0);
}

#[tokio::test]
async fn test_bad_line_keeps_prompt_running() {
    let h = setup();
    let mut out = Vec::new();

    let exit = Prompt::new(&h.controller, &h.metrics, OutputFormat::Table)
        .run(None, &b"mint 5\nquit\n"[..], &mut out, std::future::pending())
        .await
        .unwrap();

    assert_eq!(exit, Exit::Quit);
    assert!(String::from_utf8(out).unwrap().contains("unknown command `mint`"));
}

#[tokio::test]
async fn test_interrupt_while_waiting_for_input() {
    let h = setup();
    // Writer kept alive so reading never finishes.
    let (_writer, reader) = tokio::io::duplex(64);

    let exit = Prompt::new(&h.controller, &h.metrics, OutputFormat::Table)
        .run(None, BufReader::new(reader), Vec::new(), std::future::ready(()))
        .await
        .unwrap();

    assert_eq!(exit, Exit::Interrupted);
}

#[tokio::test]
async fn test_interrupt_while_intent_in_flight() {
    let h = setup();
    h.chain.hold(h.token);
    let input = format!("address {}\n", h.token);

    // Fires once the metadata read is parked.
    let chain = h.chain.clone();
    let shutdown = async move {
        while chain.metadata_reads() == 0 {
            tokio::task::yield_now().await;
        }
    };

    let exit = Prompt::new(&h.controller, &h.metrics, OutputFormat::Table)
        .run(None, input.as_bytes(), Vec::new(), shutdown)
        .await
        .unwrap();

    assert_eq!(exit, Exit::Interrupted);
    assert_eq!(h.chain.subscriptions_opened(), 0);
    assert!(matches!(
        h.controller.set_address(h.token).await,
        Err(SessionError::Disposed)
    ));
}
