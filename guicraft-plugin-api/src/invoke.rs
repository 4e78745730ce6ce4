//! Error-safe invocation helpers.
//!
//! Foreign callbacks (plugin code, optional hooks) may be missing, may fail
//! and may even panic. These helpers collapse all three outcomes into `None`
//! so call sites can fall back to a default without extra plumbing.

use futures::FutureExt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

/// Call `f` if present and return its value, or `None` if it is absent,
/// returns an error or panics.
///
/// # Example
///
/// ```rust
/// use guicraft_plugin_api::try_call;
///
/// assert_eq!(try_call(Some(|| Ok::<_, anyhow::Error>(3))), Some(3));
/// assert_eq!(try_call(Some(|| Err::<i32, _>(anyhow::anyhow!("boom")))), None);
/// assert_eq!(try_call::<i32, fn() -> anyhow::Result<i32>>(None), None);
/// ```
pub fn try_call<T, F>(f: Option<F>) -> Option<T>
where
    F: FnOnce() -> crate::Result<T>,
{
    let f = f?;
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            debug!("try_call swallowed error: {err:#}");
            None
        }
        Err(_) => {
            debug!("try_call swallowed panic");
            None
        }
    }
}

/// Async counterpart of [`try_call`].
///
/// # Example
///
/// ```rust
/// use guicraft_plugin_api::try_call_async;
///
/// let value = tokio_test::block_on(try_call_async(Some(async { Ok::<_, anyhow::Error>("ok") })));
/// assert_eq!(value, Some("ok"));
/// ```
pub async fn try_call_async<T, Fut>(future: Option<Fut>) -> Option<T>
where
    Fut: Future<Output = crate::Result<T>>,
{
    let future = future?;
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            debug!("try_call_async swallowed error: {err:#}");
            None
        }
        Err(_) => {
            debug!("try_call_async swallowed panic");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_call_absorbs_panic() {
        let result = try_call(Some(|| -> crate::Result<u8> { panic!("plugin bug") }));
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_try_call_async_error() {
        let result = try_call_async(Some(async { Err::<u8, _>(anyhow::anyhow!("nope")) })).await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_try_call_async_absent() {
        let result = try_call_async::<u8, std::future::Ready<crate::Result<u8>>>(None).await;
        assert_eq!(result, None);
    }
}
