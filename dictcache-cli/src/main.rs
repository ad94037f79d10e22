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

//! `dictcache-cli` provides maintenance tools for on-disk dictcache directories.

mod cache;

use cache::{CacheArgs, ResizeArgs};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print partitions and dictionaries of a cache directory.
    Inspect(CacheArgs),
    /// Remove expired dictionaries from a cache directory.
    ClearExpired(CacheArgs),
    /// Apply a new byte cap to a cache directory and evict down to it.
    Resize(ResizeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Inspect(args) => cache::inspect(args, &mut std::io::stdout()).await,
        Command::ClearExpired(args) => cache::clear_expired(args).await,
        Command::Resize(args) => cache::resize(args).await,
    }
}
