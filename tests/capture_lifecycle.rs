use std::io::{self, Write};
use std::sync::{Arc, Once};
use std::thread;

use log::LevelFilter;
use serial_test::serial;

use testdata::data_capture::SessionState;
use testdata::logging::{self, Handler};
use testdata::stdio::{self, same_sink, FailingSink, MemorySink, PrefixSink, SinkRef};
use testdata::{capture, CaptureError, CaptureOptions, CaptureSession, Channel};

static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| {
        logging::try_init(LevelFilter::Info).expect("install log dispatcher");
    });
    logging::clear();
    testdata::configuration::set_global(Default::default());
}

#[test]
#[serial]
fn logger_output_interleaves_with_direct_writes() {
    setup();
    logging::register(Arc::new(Handler::for_channel(
        "stderr",
        LevelFilter::Info,
        Channel::Error,
    )));

    let (_, output) = capture(CaptureOptions::default(), || {
        testdata::stdoutln!("first").unwrap();
        log::info!("from the logger");
        testdata::stderrln!("direct").unwrap();
        log::debug!("filtered out");
    })
    .unwrap();

    let lines = output.lines();
    assert_eq!(lines.len(), 3, "{:?}", lines);
    assert_eq!(lines[0], "first");
    assert!(lines[1].starts_with("INFO "));
    assert!(lines[1].ends_with(": from the logger"));
    assert_eq!(lines[2], "direct");
    assert_eq!(output.channel(Channel::Error).lines().len(), 2);
    logging::clear();
}

#[test]
#[serial]
fn wrapped_handler_writer_is_captured_and_restored() {
    setup();
    let real = stdio::current_sink(Channel::Output);
    let wrapper = Arc::new(PrefixSink::new("[svc] ", Arc::clone(&real)));
    let handler = Arc::new(Handler::new("svc", LevelFilter::Info, wrapper.clone()));
    logging::register(handler.clone());

    let (_, output) = capture(CaptureOptions::output_only(), || {
        log::warn!("disk almost full");
    })
    .unwrap();

    assert!(output.contains("[svc] WARN "));
    assert!(output.contains("disk almost full"));
    assert!(wrapper.inner().holds(&real));
    let wrapper_ref: SinkRef = wrapper;
    assert!(handler.writer().holds(&wrapper_ref));
    logging::clear();
}

#[test]
#[serial]
fn handles_are_reference_equal_after_stop() {
    setup();
    let before_out = stdio::current_sink(Channel::Output);
    let before_err = stdio::current_sink(Channel::Error);

    let mut session = CaptureSession::new(CaptureOptions::default());
    session.start(false).unwrap();
    assert!(!same_sink(&stdio::current_sink(Channel::Output), &before_out));
    session.stop();
    session.stop();

    assert_eq!(session.state(), SessionState::Stopped);
    assert!(same_sink(&stdio::current_sink(Channel::Output), &before_out));
    assert!(same_sink(&stdio::current_sink(Channel::Error), &before_err));
    assert!(matches!(session.start(false), Err(CaptureError::AlreadyStopped)));
}

#[test]
#[serial]
fn panicking_scope_does_not_leak_redirection() {
    setup();
    let before = stdio::current_sink(Channel::Error);

    let result = std::panic::catch_unwind(|| {
        let _scope = CaptureSession::new(CaptureOptions::default())
            .enter(Some(false))
            .unwrap();
        testdata::stderrln!("about to fail").unwrap();
        panic!("test body failed");
    });

    assert!(result.is_err());
    assert!(same_sink(&stdio::current_sink(Channel::Error), &before));
    // a fresh session can take the channel again
    let (_, output) = capture(CaptureOptions::error_only(), || {
        testdata::stderr!("again").unwrap();
    })
    .unwrap();
    assert_eq!(output, "again");
}

#[test]
#[serial]
fn threads_writing_concurrently_keep_their_own_order() {
    setup();
    let (_, output) = capture(CaptureOptions::default(), || {
        let workers: Vec<_> = (0..4)
            .map(|w| {
                thread::spawn(move || {
                    for i in 0..200 {
                        if i % 2 == 0 {
                            testdata::stdoutln!("w{} {}", w, i).unwrap();
                        } else {
                            testdata::stderrln!("w{} {}", w, i).unwrap();
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
    })
    .unwrap();

    let lines = output.lines();
    assert_eq!(lines.len(), 800);
    for w in 0..4 {
        let prefix = format!("w{} ", w);
        let seen: Vec<usize> = lines
            .iter()
            .filter_map(|l| l.strip_prefix(&prefix))
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }
}

#[test]
#[serial]
fn back_to_back_writes_are_all_kept() {
    setup();
    let (_, output) = capture(CaptureOptions::output_only(), || {
        for _ in 0..5_000 {
            testdata::stdout!("x").unwrap();
        }
    })
    .unwrap();

    assert_eq!(output.len(), 5_000);
    let entries = output.entries();
    assert!(entries.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
#[serial]
fn passthrough_matches_uncaptured_writes() {
    setup();
    let fake = Arc::new(MemorySink::new("fake"));
    let original = stdio::set_sink(Channel::Output, fake.clone());

    let write_all = || {
        testdata::stdout!("alpha").unwrap();
        testdata::stdoutln!(" {}", 2).unwrap();
        testdata::stdout!("").unwrap();
    };

    write_all();
    let uncaptured = fake.writes();
    fake.clear();

    let scope = CaptureSession::new(CaptureOptions::output_only())
        .enter(Some(true))
        .unwrap();
    write_all();
    let output = scope.finish();

    stdio::set_sink(Channel::Output, original);
    assert_eq!(fake.writes(), uncaptured);
    assert_eq!(output, "alpha 2\n");
}

#[test]
#[serial]
fn transcript_round_trips_through_json() {
    setup();
    let (_, output) = capture(CaptureOptions::default(), || {
        testdata::stdout!("out").unwrap();
        testdata::stderr!("err").unwrap();
    })
    .unwrap();

    let transcript: testdata::data_capture::Transcript =
        serde_json::from_str(&output.to_json().unwrap()).unwrap();
    assert_eq!(transcript.session_id, output.session_id());
    let channels: Vec<Channel> = transcript.entries.iter().map(|e| e.channel).collect();
    assert_eq!(channels, vec![Channel::Output, Channel::Error]);
}

#[test]
#[serial]
fn failing_passthrough_reaches_the_caller() {
    setup();
    let original = stdio::set_sink(
        Channel::Output,
        Arc::new(FailingSink::new(io::ErrorKind::BrokenPipe)),
    );

    let scope = CaptureSession::new(CaptureOptions::output_only())
        .enter(Some(true))
        .unwrap();
    let err = testdata::stdoutln!("lost downstream").unwrap_err();
    let output = scope.finish();

    stdio::set_sink(Channel::Output, original);
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    // the write is still recorded
    assert_eq!(output, "lost downstream\n");
}

#[test]
#[serial]
fn byte_writes_split_mid_character_are_recorded_intact() {
    setup();
    let fake = Arc::new(MemorySink::new("fake"));
    let original = stdio::set_sink(Channel::Output, fake.clone());

    let scope = CaptureSession::new(CaptureOptions::output_only())
        .enter(Some(true))
        .unwrap();
    let bytes = "é".as_bytes();
    let mut out = stdio::stdout();
    out.write_all(&bytes[..1]).unwrap();
    out.write_all(&bytes[1..]).unwrap();
    let output = scope.finish();

    stdio::set_sink(Channel::Output, original);
    assert_eq!(output.to_string(), "é");
    assert_eq!(fake.contents(), "é");
}
