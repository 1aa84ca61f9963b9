// Integration tests for the cancellation token

use std::time::{Duration, Instant};

use scopegen::CancellationToken;

#[test]
fn test_token_starts_unsignaled() {
    let token = CancellationToken::new();
    assert!(!token.is_signaled());
}

#[test]
fn test_signal_is_sticky_and_idempotent() {
    let token = CancellationToken::new();

    token.signal();
    assert!(token.is_signaled());

    token.signal();
    token.signal();
    assert!(token.is_signaled(), "Token must stay signaled after repeated signals");
}

#[test]
fn test_clones_share_one_flag() {
    let token = CancellationToken::new();
    let observer = token.clone();

    token.signal();
    assert!(observer.is_signaled());
}

#[test]
fn test_separate_tokens_are_independent() {
    let first = CancellationToken::new();
    let second = CancellationToken::new();

    first.signal();
    assert!(!second.is_signaled(), "A new session token must not inherit a stop");
}

#[test]
fn test_signal_is_observed_across_threads() {
    let token = CancellationToken::new();
    let observer = token.clone();

    let poller = std::thread::spawn(move || {
        let mut polls = 0u64;
        while !observer.is_signaled() {
            polls += 1;
            std::thread::sleep(Duration::from_millis(1));
        }
        polls
    });

    std::thread::sleep(Duration::from_millis(20));
    let signaled_at = Instant::now();
    token.signal();

    let polls = poller.join().unwrap();
    assert!(polls > 0, "Poller should have spun before the signal");
    assert!(
        signaled_at.elapsed() < Duration::from_secs(1),
        "Poller should notice the signal promptly"
    );
}
