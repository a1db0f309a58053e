use std::io::{self, Write};
use std::panic;

/// Install panic hooks for the command-line host.
///
/// Debug builds get `better_panic` backtraces; release builds print the
/// `human_panic` crash report instead.
pub fn initialize_panic_handler() {
    if cfg!(debug_assertions) {
        better_panic::install();
    } else {
        human_panic::setup_panic!();
    }

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        flush_output();
        log::error!("Panic: {panic_info}");

        default_hook(panic_info);

        std::process::exit(1);
    }));
}

/// Flush pending output so the report is not interleaved with it
pub fn flush_output() {
    let _ = io::stdout().flush();
    let _ = writeln!(io::stderr());
}
