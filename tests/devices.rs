// Device adapters and their behaviour inside a session

use std::fs;

use scopegen::console::Console;
use scopegen::device::{Device, FileDevice, MockDevice};
use scopegen::session::{ExitReason, JobConfig, Session};

#[test]
fn test_file_device_write_then_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.bin");
    let locator = path.to_str().unwrap();

    let mut writer = FileDevice::writer();
    writer.open(locator).unwrap();
    assert!(writer.is_open());
    assert_eq!(writer.write(&[1, 2, 3, 4, 5]).bytes, 5);
    assert!(!writer.read(&mut [0u8; 4]).is_ok(), "writers cannot read");
    writer.close();
    writer.close();
    assert!(!writer.is_open());

    let mut reader = FileDevice::reader();
    reader.open(locator).unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(reader.read(&mut buf).bytes, 4);
    assert_eq!(buf, [1, 2, 3, 4]);
    assert_eq!(reader.read(&mut buf).bytes, 1);
    assert_eq!(buf[0], 5);

    let eof = reader.read(&mut buf);
    assert!(eof.is_ok());
    assert_eq!(eof.bytes, 0);
    reader.close();
}

#[test]
fn test_file_device_requires_open() {
    let mut device = FileDevice::reader();
    let result = device.read(&mut [0u8; 8]);
    assert_eq!(result.bytes, -1);
    assert_eq!(result.error.as_deref(), Some("not-open"));

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.bin");
    assert!(device.open(missing.to_str().unwrap()).is_err());
    assert!(!device.is_open());
}

#[test]
fn test_mock_device_reports_clock_words() {
    let mut device = MockDevice::new();
    assert!(!device.read(&mut [0u8; 4]).is_ok());

    device.open("mock://clock").unwrap();
    let mut buf = [0u8; 7];
    let result = device.read(&mut buf);
    assert!(result.is_ok());
    assert_eq!(result.bytes, 7);
    assert_eq!(buf[0], buf[2]);
    assert_eq!(buf[1], buf[3]);
    assert_eq!(buf[6], buf[0], "odd tail repeats the low byte");

    assert_eq!(device.write(&[9; 32]).bytes, 32);
    device.close();
    assert!(!device.is_open());
}

#[test]
fn test_mock_device_close_is_idempotent() {
    let mut never_opened = MockDevice::new();
    never_opened.close();
    never_opened.close();
    assert!(!never_opened.is_open());

    let mut device = MockDevice::new();
    device.open("mock://clock").unwrap();
    device.close();
    device.close();
    assert!(!device.is_open());
    assert_eq!(device.write(&[1, 2, 3]).error.as_deref(), Some("not-open"));

    // Reopening after close works
    device.open("mock://clock").unwrap();
    assert!(device.read(&mut [0u8; 2]).is_ok());
}

#[cfg(not(feature = "microphone"))]
#[test]
fn test_microphone_locator_without_support() {
    assert!(matches!(
        scopegen::device::for_locator("mic", scopegen::Direction::Input),
        Err(scopegen::DeviceError::Unavailable(_))
    ));

    let (console, _sink) = Console::memory();
    let mut session = Session::new(console);
    assert!(matches!(
        session.start(&JobConfig::acquire("MIC:default")),
        Err(scopegen::SessionError::Device(scopegen::DeviceError::Unavailable(_)))
    ));
    assert!(!session.has_job());
}

#[test]
fn test_acquire_from_file_ends_at_end_of_stream() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("eof-source.bin");
    let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    fs::write(&source, &data).unwrap();

    let capture = dir.path().join("eof-capture.bin");
    let (console, _sink) = Console::memory();
    let mut session = Session::new(console);

    let report = session
        .read(
            &JobConfig::acquire(source.to_str().unwrap())
                .with_capture(capture.to_str().unwrap())
                .with_chunk(256)
                .with_loops(100),
        )
        .unwrap();

    assert_eq!(report.exit, ExitReason::EndOfStream);
    assert_eq!(report.cycles, 5, "four reads of data then one empty read");
    assert_eq!(report.bytes(), 1000);
    assert_eq!(report.io_errors, 0);
    assert_eq!(fs::read(&capture).unwrap(), data);
}

#[test]
fn test_generate_into_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("generated.bin");
    let (console, _sink) = Console::memory();
    let mut session = Session::new(console);

    let report = session
        .write(
            &JobConfig::generate(out.to_str().unwrap())
                .with_rate(2000.0)
                .with_chunk(64)
                .with_sample_count(256),
        )
        .unwrap();

    assert_eq!(report.exit, ExitReason::BudgetExhausted);
    let written = fs::read(&out).unwrap();
    assert_eq!(written.len(), 256);
    // Sine at full scale starts at mid-scale
    assert_eq!(written[0], 128);
}

#[test]
fn test_scope_echo_prints_hex_lines() {
    let (console, sink) = Console::memory();
    let mut session = Session::new(console);

    session
        .read(
            &JobConfig::acquire("mock://scope")
                .with_chunk(4)
                .with_loops(3)
                .with_echo(true),
        )
        .unwrap();

    let scope_lines: Vec<String> = sink
        .lines()
        .into_iter()
        .filter(|line| line.starts_with("[scope] +"))
        .collect();
    assert_eq!(scope_lines.len(), 3);
    // Four bytes print as four two-digit hex groups
    let hex = scope_lines[0].rsplit("  ").next().unwrap();
    assert_eq!(hex.split(' ').count(), 4);
}

#[cfg(feature = "wav")]
#[test]
fn test_wav_capture_keeps_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("wav-source.bin");
    let data: Vec<u8> = (0..200u32).map(|i| (i * 7 % 256) as u8).collect();
    fs::write(&source, &data).unwrap();

    let capture = dir.path().join("capture.wav");
    let (console, _sink) = Console::memory();
    let mut session = Session::new(console);
    session
        .read(
            &JobConfig::acquire(source.to_str().unwrap())
                .with_capture(capture.to_str().unwrap())
                .with_rate(8000.0)
                .with_loops(10),
        )
        .unwrap();

    let wav = fs::read(&capture).unwrap();
    assert_eq!(&wav[..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    assert_eq!(&wav[wav.len() - data.len()..], &data[..]);

    let reader = hound::WavReader::open(&capture).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 8);
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(reader.len() as usize, data.len());
}
