// Copyright 2017 CoreOS, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod cli;
mod client;
mod generator;
mod network;
mod providers;
mod units;

use slog::{Drain, Level};

fn main() {
    let ok = run();
    if !ok {
        std::process::exit(1);
    }
}

/// Parse arguments, run once and report whether everything succeeded.
fn run() -> bool {
    let argv: Vec<String> = std::env::args().collect();
    let parsed = cli::parse_args(argv);

    // setup logging; the guard must outlive every log call below
    let verbosity = parsed.as_ref().map_or(0, |cfg| cfg.verbose);
    let _guard = setup_logging(verbosity);
    slog_scope::debug!("Logging initialized");

    let cfg = match parsed {
        Ok(cfg) => cfg,
        Err(e) => {
            slog_scope::error!("parsing arguments: {:#}", e);
            return false;
        }
    };
    slog_scope::trace!("cli configuration - {:?}", cfg);

    match cfg.run() {
        Ok(()) => {
            slog_scope::debug!("Done!");
            true
        }
        Err(e) => {
            slog_scope::error!("{:#}", e);
            false
        }
    }
}

fn setup_logging(verbosity: u8) -> slog_scope::GlobalLoggerGuard {
    let level = match verbosity {
        0 => Level::Info,
        1 => Level::Debug,
        _ => Level::Trace,
    };

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    let log = slog::Logger::root(drain, slog::o!());
    slog_scope::set_global_logger(log)
}
