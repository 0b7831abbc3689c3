#![no_main]
use http_framer::config::Config;
use http_framer::state::StateMachine;
use libfuzzer_sys::fuzz_target;

// Feeds the corpus in two arbitrary-sized pieces, split at the midpoint, to
// exercise the resumable-across-chunk-boundaries contract alongside
// whatever malformed framing the fuzzer finds. A parser bug should show up
// as a panic, never as a hang or an `Err` the driver fails to recover from.
fuzz_target!(|data: &[u8]| {
    let mut config = Config::default();
    config.raise_errors = false;

    let mut sm = StateMachine::new(config);
    let mid = data.len() / 2;
    let _ = sm.feed(&data[..mid]);
    let _ = sm.feed(&data[mid..]);
});
