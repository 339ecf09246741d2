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

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::ArgAction;
use clap::Parser;
use clap::ValueEnum;
use log::LevelFilter;

/// Drop (or keep) lines that were already seen, remembering them across runs.
///
/// Lines are read from --input, or stdin when absent. Every line is tested against a Bloom
/// filter loaded from --state and then added to it; the filter is written back when the input
/// is exhausted. A new filter sized for -n entries at false positive rate -p is created when the
/// state file does not exist yet.
#[derive(Parser, Debug, Clone)]
#[command(name = "bloom-dedup", version)]
pub struct Args {
    /// Input file. Files are processed by --concurrency workers and output order is not kept.
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Gzip-compressed filter state, created when missing
    #[arg(short, long, value_name = "PATH", default_value = "bloom.gz")]
    pub state: PathBuf,

    /// Expected number of distinct lines for a new filter (bit count when -p >= 1)
    #[arg(short = 'n', long, default_value_t = 1_000_000)]
    pub entries: u64,

    /// Target false positive rate for a new filter (probe count when >= 1)
    #[arg(short = 'p', long, default_value_t = 0.01)]
    pub rate: f64,

    /// Emit lines already present in the filter instead of new ones
    #[arg(long, default_value_t = false)]
    pub seen: bool,

    /// Worker threads for file input (default: available parallelism)
    #[arg(short, long, value_name = "N")]
    pub concurrency: Option<NonZeroUsize>,

    /// Encoding of the state file
    #[arg(short, long, value_enum, default_value_t = StateFormat::Json)]
    pub format: StateFormat,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn workers(&self) -> usize {
        self.concurrency
            .or_else(|| std::thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get)
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFormat {
    /// `{"FilterSet": <base64>, "SetLocs": <probes>}`; the insertion counter is not kept
    Json,
    /// Fixed little-endian header followed by the bit set words
    Binary,
}
