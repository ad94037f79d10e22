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

use std::{
    ffi::OsString,
    fs::{create_dir_all, read_dir, remove_file, rename, File},
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::Bytes;
use dictcache_common::{
    asyncify::{asyncify_with_runtime, detach_with_runtime},
    error::{Error, ErrorKind, Result},
};
use futures_util::future::BoxFuture;
use tokio::runtime::Handle;

use crate::blob::{BlobStore, BlobToken, BlobWriter};

const PREFIX: &str = "dictcache-blob-";
const TMP_SUFFIX: &str = ".tmp";

/// Builder for a blob store upon a directory in a filesystem, one file per blob.
#[derive(Debug)]
pub struct FsBlobStoreBuilder {
    dir: PathBuf,
    create: bool,
    runtime: Option<Handle>,
}

impl FsBlobStoreBuilder {
    /// Use the given directory as the blob store directory.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().into(),
            create: true,
            runtime: None,
        }
    }

    /// Set whether to create the directory if it does not exist.
    ///
    /// Default: `true`.
    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Set the runtime whose blocking pool performs the file I/O.
    ///
    /// Default: the runtime the builder is built within.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the blob store.
    pub fn build(self) -> Result<FsBlobStore> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| {
                Error::new(ErrorKind::Config, "fs blob store must be built within a tokio runtime").with_source(e)
            })?,
        };

        if !self.dir.exists() {
            if !self.create {
                return Err(Error::new(ErrorKind::Config, "blob store directory does not exist")
                    .with_context("dir", self.dir.display()));
            }
            create_dir_all(&self.dir)?;
        }

        // Leftovers of interrupted writes.
        for entry in read_dir(&self.dir)? {
            let path = entry?.path();
            let stale = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(PREFIX) && name.ends_with(TMP_SUFFIX));
            if stale {
                tracing::debug!(path = %path.display(), "[fs blob store]: remove stale temporary file");
                match remove_file(&path) {
                    Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                    _ => {}
                }
            }
        }

        tracing::info!(dir = %self.dir.display(), "[fs blob store]: open");

        let inner = Inner { dir: self.dir, runtime };
        Ok(FsBlobStore { inner: Arc::new(inner) })
    }
}

#[derive(Debug)]
struct Inner {
    dir: PathBuf,
    runtime: Handle,
}

impl Inner {
    fn path(&self, token: BlobToken) -> PathBuf {
        self.dir.join(format!("{PREFIX}{token}"))
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path);
    tmp.push(TMP_SUFFIX);
    tmp.into()
}

/// A blob store upon a directory in a filesystem.
///
/// Blobs are written to a temporary file first and renamed into place, so a crash never leaves a partially
/// written blob under its final name.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    inner: Arc<Inner>,
}

impl FsBlobStore {
    /// Directory of the blob store.
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }
}

impl BlobStore for FsBlobStore {
    fn write(&self, token: BlobToken, data: Bytes) -> BoxFuture<'static, Result<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let path = inner.path(token);
            asyncify_with_runtime(&inner.runtime, move || {
                let tmp = tmp_path(&path);
                std::fs::write(&tmp, &data)?;
                rename(&tmp, &path)?;
                Ok(())
            })
            .await
            .map_err(|e| e.with_context("token", token))
        })
    }

    fn read(&self, token: BlobToken) -> BoxFuture<'static, Result<Bytes>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let path = inner.path(token);
            asyncify_with_runtime(&inner.runtime, move || Ok(Bytes::from(std::fs::read(path)?)))
                .await
                .map_err(|e| e.with_context("token", token))
        })
    }

    fn writer(&self, token: BlobToken) -> Box<dyn BlobWriter> {
        let path = self.inner.path(token);
        Box::new(FsBlobWriter {
            inner: self.inner.clone(),
            token,
            tmp: tmp_path(&path),
            path,
            file: None,
            done: false,
        })
    }

    fn delete(&self, token: BlobToken) {
        let path = self.inner.path(token);
        tracing::trace!(%token, "[fs blob store]: delete");
        detach_with_runtime(&self.inner.runtime, "fs blob store delete", move || {
            match remove_file(&path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            }
        });
    }

    fn tokens(&self) -> BoxFuture<'static, Result<Vec<BlobToken>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let dir = inner.dir.clone();
            asyncify_with_runtime(&inner.runtime, move || {
                let mut tokens = vec![];
                for entry in read_dir(dir)? {
                    let entry = entry?;
                    let name = entry.file_name();
                    let Some(name) = name.to_str() else { continue };
                    let Some(token) = name.strip_prefix(PREFIX) else { continue };
                    if token.ends_with(TMP_SUFFIX) {
                        continue;
                    }
                    match token.parse() {
                        Ok(token) => tokens.push(token),
                        Err(e) => tracing::warn!(name, "[fs blob store]: skip unrecognized file: {e}"),
                    }
                }
                Ok(tokens)
            })
            .await
        })
    }
}

/// Streams a blob into its temporary file and renames it into place on finish.
#[derive(Debug)]
struct FsBlobWriter {
    inner: Arc<Inner>,
    token: BlobToken,
    path: PathBuf,
    tmp: PathBuf,
    /// Opened on the first write.
    file: Option<File>,
    done: bool,
}

impl BlobWriter for FsBlobWriter {
    fn write(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let file = self.file.take();
            let tmp = self.tmp.clone();
            let file = asyncify_with_runtime(&self.inner.runtime, move || {
                let mut file = match file {
                    Some(file) => file,
                    None => File::create(&tmp)?,
                };
                file.write_all(&data)?;
                Ok(file)
            })
            .await
            .map_err(|e| e.with_context("token", self.token))?;
            self.file = Some(file);
            Ok(())
        })
    }

    fn finish(mut self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        self.done = true;
        let file = self.file.take();
        let inner = self.inner.clone();
        let token = self.token;
        let tmp = self.tmp.clone();
        let path = self.path.clone();
        Box::pin(async move {
            asyncify_with_runtime(&inner.runtime, move || {
                let file = match file {
                    Some(file) => file,
                    None => File::create(&tmp)?,
                };
                file.sync_data()?;
                drop(file);
                rename(&tmp, &path)?;
                Ok(())
            })
            .await
            .map_err(|e| e.with_context("token", token))
        })
    }
}

impl Drop for FsBlobWriter {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let file = self.file.take();
        let tmp = self.tmp.clone();
        detach_with_runtime(&self.inner.runtime, "fs blob writer discard", move || {
            drop(file);
            match remove_file(&tmp) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            }
        });
    }
}
