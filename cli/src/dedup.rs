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

//! Line filtering against a Bloom filter.
//!
//! A line is emitted when its membership before insertion equals `seen`: with `seen == false`
//! only first occurrences pass, with `seen == true` only repeats do.

use std::io;
use std::io::BufRead;
use std::io::Write;
use std::thread;

use anyhow::Context;
use anyhow::anyhow;
use bloomdedup::bloom::BloomFilter;
use bloomdedup::bloom::SharedBloomFilter;
use crossbeam_channel::Receiver;
use crossbeam_channel::bounded;

/// Lines buffered per worker in each channel.
const QUEUE_DEPTH: usize = 1024;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DedupStats {
    pub lines_read: u64,
    pub lines_emitted: u64,
}

/// Filters `input` into `output` on the calling thread, keeping input order.
pub fn dedup_stream<R: BufRead, W: Write>(
    filter: &mut BloomFilter,
    mut input: R,
    mut output: W,
    seen: bool,
) -> io::Result<DedupStats> {
    let mut stats = DedupStats::default();
    let mut line = Vec::new();
    while next_line(&mut input, &mut line)? {
        stats.lines_read += 1;
        if filter.contains_and_insert(&line) == seen {
            write_line(&mut output, &line)?;
            stats.lines_emitted += 1;
        }
    }
    output.flush()?;
    Ok(stats)
}

/// Filters `input` into `output` with `workers` threads sharing `filter`.
///
/// One thread reads lines, the workers test and insert them, and the calling thread writes the
/// survivors. Output order is unspecified.
pub fn dedup_parallel<R, W>(
    filter: &SharedBloomFilter,
    input: R,
    mut output: W,
    seen: bool,
    workers: usize,
) -> anyhow::Result<DedupStats>
where
    R: BufRead + Send,
    W: Write,
{
    let workers = workers.max(1);
    let (line_tx, line_rx) = bounded::<Vec<u8>>(workers * QUEUE_DEPTH);
    let (out_tx, out_rx) = bounded::<Vec<u8>>(workers * QUEUE_DEPTH);

    thread::scope(|s| {
        let reader = s.spawn(move || -> io::Result<u64> {
            let mut input = input;
            let mut lines_read = 0;
            loop {
                let mut line = Vec::new();
                if !next_line(&mut input, &mut line)? {
                    break;
                }
                lines_read += 1;
                if line_tx.send(line).is_err() {
                    // the workers are gone because the writer failed
                    break;
                }
            }
            Ok(lines_read)
        });

        for _ in 0..workers {
            let line_rx = line_rx.clone();
            let out_tx = out_tx.clone();
            s.spawn(move || {
                for line in line_rx {
                    if filter.contains_and_insert(&line) == seen && out_tx.send(line).is_err() {
                        break;
                    }
                }
            });
        }
        drop(line_rx);
        drop(out_tx);

        let written = write_lines(out_rx, &mut output);
        let lines_read = reader
            .join()
            .map_err(|_| anyhow!("input reader panicked"))?
            .context("failed to read input")?;
        let lines_emitted = written.context("failed to write output")?;
        Ok(DedupStats {
            lines_read,
            lines_emitted,
        })
    })
}

fn write_lines<W: Write>(lines: Receiver<Vec<u8>>, output: &mut W) -> io::Result<u64> {
    let mut written = 0;
    for line in lines {
        write_line(output, &line)?;
        written += 1;
    }
    output.flush()?;
    Ok(written)
}

fn write_line<W: Write>(output: &mut W, line: &[u8]) -> io::Result<()> {
    output.write_all(line)?;
    output.write_all(b"\n")
}

/// Reads the next line into `buf` without its terminator. A trailing `\r` is dropped as well.
/// Returns false at end of input.
fn next_line<R: BufRead>(input: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    if input.read_until(b'\n', buf)? == 0 {
        return Ok(false);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(true)
}
