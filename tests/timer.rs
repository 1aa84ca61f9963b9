// Integration tests for the session timer task

use std::time::{Duration, Instant};

use scopegen::console::Console;
use scopegen::session::{TimerExit, TimerTask};
use scopegen::CancellationToken;

fn countdown_lines(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| line.starts_with("[timer]"))
        .cloned()
        .collect()
}

#[test]
fn test_countdown_reports_once_per_second_then_expires() {
    let (console, sink) = Console::memory();
    let token = CancellationToken::new();

    let begin = Instant::now();
    let exit = TimerTask::new(Duration::from_millis(2500), token.clone(), console).run();
    let elapsed = begin.elapsed();

    assert_eq!(exit, TimerExit::Expired);
    assert!(token.is_signaled(), "expiry must signal the token");
    assert!(elapsed >= Duration::from_millis(2500));
    assert!(elapsed < Duration::from_millis(2900), "expired after {:?}", elapsed);

    assert_eq!(
        countdown_lines(&sink.lines()),
        vec![
            "[timer] 3 s left",
            "[timer] 2 s left",
            "[timer] 1 s left",
            "[timer] done",
        ]
    );
}

#[test]
fn test_signal_from_another_thread_stops_the_timer() {
    let (console, sink) = Console::memory();
    let token = CancellationToken::new();

    let timer = TimerTask::new(Duration::from_secs(30), token.clone(), console)
        .spawn()
        .unwrap();

    std::thread::sleep(Duration::from_millis(150));
    let signaled_at = Instant::now();
    token.signal();

    let exit = timer.join().unwrap();
    assert_eq!(exit, TimerExit::Stopped);
    assert!(
        signaled_at.elapsed() < Duration::from_millis(500),
        "timer should notice the token within a poll slice"
    );
    assert!(token.is_signaled());

    let lines = countdown_lines(&sink.lines());
    assert_eq!(lines.first().map(String::as_str), Some("[timer] 30 s left"));
    assert_eq!(lines.last().map(String::as_str), Some("[timer] done"));
}

#[test]
fn test_pre_signaled_token_stops_immediately() {
    let (console, sink) = Console::memory();
    let token = CancellationToken::new();
    token.signal();

    let begin = Instant::now();
    let exit = TimerTask::new(Duration::from_secs(30), token.clone(), console).run();

    assert_eq!(exit, TimerExit::Stopped);
    assert!(begin.elapsed() < Duration::from_millis(100));
    assert!(token.is_signaled(), "token stays signaled on the stop path");
    assert_eq!(countdown_lines(&sink.lines()), vec!["[timer] done"]);
}

#[test]
fn test_duration_beyond_the_clock_does_not_panic() {
    let (console, _sink) = Console::memory();
    let token = CancellationToken::new();

    let timer = TimerTask::new(Duration::MAX, token.clone(), console)
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(100));
    token.signal();

    assert_eq!(timer.join().unwrap(), TimerExit::Stopped);
}
