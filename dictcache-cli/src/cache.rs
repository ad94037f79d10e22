// Copyright 2026 foyer Project Authors
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

use std::{io::Write, path::PathBuf, sync::Arc, time::SystemTime};

use anyhow::Context;
use bytesize::ByteSize;
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;
use dictcache::{DictionaryManager, DictionaryManagerBuilder, FsBlobStoreBuilder, DEFAULT_CACHE_MAX_COUNT};

#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Directory of the dictionary cache.
    dir: PathBuf,

    /// Count cap applied while opening the cache.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_COUNT)]
    max_count: usize,
}

#[derive(Debug, Args)]
pub struct ResizeArgs {
    #[command(flatten)]
    cache: CacheArgs,

    /// New byte cap of the cache. `0` means unbounded.
    #[arg(short, long)]
    size: ByteSize,
}

async fn open(args: &CacheArgs) -> anyhow::Result<DictionaryManager> {
    let store = FsBlobStoreBuilder::new(&args.dir)
        .with_create(false)
        .build()
        .with_context(|| format!("open cache directory {}", args.dir.display()))?;
    let manager = DictionaryManagerBuilder::new()
        .with_name("dictcache-cli")
        .with_cache_max_count(args.max_count)
        .with_blob_store(Arc::new(store))
        .build()
        .await?;
    Ok(manager)
}

fn format_time(time: SystemTime) -> String {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}

pub async fn inspect(args: CacheArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let manager = open(&args).await?;

    let usage = manager.usage();
    writeln!(
        out,
        "{} dictionaries, {} ({} bytes)",
        usage.count,
        ByteSize::b(usage.size),
        usage.size
    )?;

    for info in manager.usage_info() {
        writeln!(
            out,
            "{}: {} dictionaries, {} bytes",
            info.isolation_key, info.count, info.size
        )?;
        for record in manager.dictionary_info(&info.isolation_key) {
            writeln!(
                out,
                "  {} {} size={} received={} expires={} last_used={} hash={}",
                record.registered_origin(),
                record.match_pattern(),
                record.size(),
                format_time(record.response_time()),
                record.expires_at().map(format_time).unwrap_or_else(|| "never".to_string()),
                format_time(record.last_used_time()),
                hex::encode(record.hash()),
            )?;
        }
    }
    Ok(())
}

pub async fn clear_expired(args: CacheArgs) -> anyhow::Result<()> {
    let manager = open(&args).await?;
    let before = manager.usage();
    manager.clear_expired().await;
    manager.flush().await?;
    let after = manager.usage();
    println!("removed {} expired dictionaries", before.count - after.count);
    Ok(())
}

pub async fn resize(args: ResizeArgs) -> anyhow::Result<()> {
    let manager = open(&args.cache).await?;
    let before = manager.usage();
    manager.set_cache_max_size(args.size.as_u64()).await;
    manager.flush().await?;
    let after = manager.usage();
    println!(
        "evicted {} dictionaries, {} -> {}",
        before.count - after.count,
        ByteSize::b(before.size),
        ByteSize::b(after.size)
    );
    Ok(())
}
