// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

mod args;
mod dedup;
mod state;

use std::fs::File;
use std::io;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use bloomdedup::bloom::BloomFilter;
use bloomdedup::bloom::SharedBloomFilter;
use clap::Parser;

use crate::args::Args;
use crate::dedup::DedupStats;

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            for cause in err.chain().skip(1) {
                eprintln!("  caused by: {cause}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let filter = state::load(&args.state, args.format, args.entries, args.rate)?;

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let (filter, stats) = match &args.input {
        Some(path) => {
            let input =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            let workers = args.workers();
            log::debug!("processing {} with {workers} workers", path.display());
            let shared = SharedBloomFilter::new(filter);
            let stats =
                dedup::dedup_parallel(&shared, BufReader::new(input), output, args.seen, workers)?;
            (shared.into_inner(), stats)
        }
        None => {
            let mut filter = filter;
            let stats = dedup::dedup_stream(&mut filter, io::stdin().lock(), output, args.seen)
                .context("failed to filter stdin")?;
            (filter, stats)
        }
    };

    report(&filter, stats);
    state::save(&args.state, args.format, &filter)
}

fn report(filter: &BloomFilter, stats: DedupStats) {
    log::info!(
        "read {} lines, emitted {}",
        stats.lines_read,
        stats.lines_emitted
    );
    log::info!(
        "{} of {} bits set (load {:.4}), estimated false positive rate {:.6}",
        filter.bits_used(),
        filter.capacity(),
        filter.load_factor(),
        filter.estimated_fpp()
    );
}
