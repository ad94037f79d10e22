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

use tokio::runtime::Handle;

use crate::error::{Error, ErrorKind, Result};

/// Convert the blocking call to an async call on the blocking pool of the given runtime handle.
///
/// A panicking or cancelled blocking task is reported as [`ErrorKind::Join`].
pub async fn asyncify_with_runtime<F, T>(runtime: &Handle, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match runtime.spawn_blocking(f).await {
        Ok(res) => res,
        Err(e) => Err(Error::new(ErrorKind::Join, "blocking task failed").with_source(e)),
    }
}

/// Run the blocking call on the blocking pool of the given runtime handle without waiting for it.
///
/// Errors are only logged.
pub fn detach_with_runtime<F>(runtime: &Handle, name: &'static str, f: F)
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    runtime.spawn_blocking(move || {
        if let Err(e) = f() {
            tracing::warn!(task = name, "[asyncify]: detached blocking task failed: {e}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn test_asyncify_propagates_result() {
        let handle = Handle::current();

        let v = asyncify_with_runtime(&handle, || Ok(42)).await.unwrap();
        assert_eq!(v, 42);

        let e = asyncify_with_runtime::<_, ()>(&handle, || Err(Error::new(ErrorKind::Io, "boom")))
            .await
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Io);
    }
}
