use std::sync::Arc;

use log::{info, warn, LevelFilter};
use testdata::configuration::CaptureConfig;
use testdata::logging::{self, Handler};
use testdata::{CaptureOptions, CaptureSession, Channel};

fn main() {
    // TESTDATA_PASSTHROUGH / TESTDATA_CAPTURE_LOGGING can override the defaults
    let config = CaptureConfig::from_env().unwrap_or_default();
    testdata::configuration::set_global(config.clone());

    logging::try_init(LevelFilter::Info).expect("install log dispatcher");
    logging::register(Arc::new(Handler::for_channel(
        "console",
        LevelFilter::Info,
        Channel::Error,
    )));

    let scope = CaptureSession::new(CaptureOptions::from_config(&config))
        .enter(None)
        .expect("start capture");

    testdata::stdoutln!("connecting to service").expect("write stdout");
    info!("handshake complete");
    testdata::stderrln!("retrying slow request").expect("write stderr");
    warn!("request took {}ms", 870);
    testdata::stdoutln!("done").expect("write stdout");

    let summary = scope.summary();
    let output = scope.finish();

    println!("--- captured {} line(s) ---", output.lines().len());
    for (n, line) in output.lines().iter().enumerate() {
        println!("{:>2}: {}", n + 1, line);
    }
    println!("--- error channel only ---");
    print!("{}", output.channel(Channel::Error));
    println!("--- transcript ---");
    println!("{}", output.to_json().expect("serialize transcript"));
    println!(
        "--- {} redirection(s), {} byte(s) ---",
        summary.redirections, summary.total_bytes
    );
}
