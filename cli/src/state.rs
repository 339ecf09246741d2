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

//! Loading and saving the gzip-compressed filter state.

use std::fs::File;
use std::io;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use bloomdedup::bloom::BloomFilter;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::args::StateFormat;

/// Loads the filter stored at `path`, or builds a new one from `entries` and `rate` when there
/// is no such file.
pub fn load(path: &Path, format: StateFormat, entries: u64, rate: f64) -> anyhow::Result<BloomFilter> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let filter = BloomFilter::new(entries as f64, rate)
                .with_context(|| format!("cannot size a filter for -n {entries} -p {rate}"))?;
            log::info!(
                "no state at {}, starting with {} bits and {} probes",
                path.display(),
                filter.capacity(),
                filter.num_probes()
            );
            return Ok(filter);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to open {}", path.display()));
        }
    };

    let filter = decode(GzDecoder::new(BufReader::new(file)), format)
        .with_context(|| format!("failed to load state from {}", path.display()))?;
    log::info!(
        "loaded {} bits and {} probes from {}",
        filter.capacity(),
        filter.num_probes(),
        path.display()
    );
    Ok(filter)
}

/// Writes `filter` to `path`, replacing any previous content.
pub fn save(path: &Path, format: StateFormat, filter: &BloomFilter) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_compressed(file, format, filter)
        .with_context(|| format!("failed to save state to {}", path.display()))?;
    log::debug!("saved state to {}", path.display());
    Ok(())
}

fn write_compressed(file: File, format: StateFormat, filter: &BloomFilter) -> anyhow::Result<()> {
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    encode(&mut encoder, format, filter)?;
    encoder.finish()?.flush()?;
    Ok(())
}

fn decode<R: Read>(mut r: R, format: StateFormat) -> anyhow::Result<BloomFilter> {
    let filter = match format {
        StateFormat::Json => {
            let mut bytes = Vec::new();
            r.read_to_end(&mut bytes)?;
            BloomFilter::from_json(&bytes)?
        }
        StateFormat::Binary => BloomFilter::read_from(r)?,
    };
    Ok(filter)
}

fn encode<W: Write>(w: &mut W, format: StateFormat, filter: &BloomFilter) -> anyhow::Result<()> {
    match format {
        StateFormat::Json => w.write_all(&filter.to_json()?)?,
        StateFormat::Binary => filter.write_to(w)?,
    }
    Ok(())
}
