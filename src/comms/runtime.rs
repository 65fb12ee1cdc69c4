//! Channel runtime — shared scaffolding for running comms channels.
//!
//! A [`Component`] is any independently-runnable channel task.  Channels
//! capture their shared state (`Arc<CommsState>`, …) at construction; the
//! runtime only passes the shutdown token.  [`spawn_components`] runs every
//! component on the Tokio pool and returns a handle that resolves when all
//! of them have exited.  Any component error cancels the shared token so
//! sibling channels stop cooperatively.

use std::future::Future;
use std::pin::Pin;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::AppError;

/// A boxed, owned future returned by [`Component::run`].
pub type ComponentFuture =
    Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A self-contained, concurrently-runnable channel task.
pub trait Component: Send + 'static {
    /// Stable identifier used in log messages.
    fn id(&self) -> &str;

    /// Consume the component and return its async run-loop as a boxed
    /// future.  Capture the `CancellationToken` inside it to respect
    /// cooperative shutdown.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

/// An opaque handle to the running channel task set.
pub struct SubsystemHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl SubsystemHandle {
    /// Wrap an existing `JoinHandle` — used when the comms layer builds its
    /// own task instead of going through [`spawn_components`].
    pub fn from_handle(handle: JoinHandle<Result<(), AppError>>) -> Self {
        Self { inner: handle }
    }

    /// Await all components and return the first error, if any.
    pub async fn join(self) -> Result<(), AppError> {
        match self.inner.await {
            Ok(r) => r,
            Err(e) => Err(AppError::Comms(format!("channel task set panicked: {e}"))),
        }
    }
}

/// Spawn each [`Component`] as an independent Tokio task.
///
/// If any component returns `Err` (or panics), `shutdown` is cancelled so
/// all siblings stop cooperatively; the first error is reported through the
/// returned handle after the remaining components drain.
pub fn spawn_components(
    components: Vec<Box<dyn Component>>,
    shutdown: CancellationToken,
) -> SubsystemHandle {
    let handle = tokio::spawn(async move {
        let mut set: JoinSet<Result<(), AppError>> = JoinSet::new();

        for component in components {
            let id = component.id().to_string();
            debug!(component = %id, "spawning channel");
            set.spawn(component.run(shutdown.clone()));
        }

        let mut first_err: Option<AppError> = None;

        while let Some(res) = set.join_next().await {
            match res {
                Err(e) => {
                    error!("channel panicked: {e}");
                    shutdown.cancel();
                    first_err
                        .get_or_insert_with(|| AppError::Comms(format!("channel panicked: {e}")));
                }
                Ok(Err(e)) => {
                    error!("channel error: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert(e);
                }
                Ok(Ok(())) => {}
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    });

    SubsystemHandle { inner: handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct QuickComponent {
        id: String,
        fail: bool,
    }

    impl Component for QuickComponent {
        fn id(&self) -> &str {
            &self.id
        }

        fn run(self: Box<Self>, _shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async move {
                if self.fail {
                    Err(AppError::Comms("boom".into()))
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test]
    async fn all_clean_exits_resolve_ok() {
        let components: Vec<Box<dyn Component>> = vec![
            Box::new(QuickComponent { id: "a".into(), fail: false }),
            Box::new(QuickComponent { id: "b".into(), fail: false }),
        ];
        let handle = spawn_components(components, CancellationToken::new());
        assert!(handle.join().await.is_ok());
    }

    #[tokio::test]
    async fn component_error_cancels_token_and_propagates() {
        let shutdown = CancellationToken::new();
        let components: Vec<Box<dyn Component>> = vec![
            Box::new(QuickComponent { id: "ok".into(), fail: false }),
            Box::new(QuickComponent { id: "bad".into(), fail: true }),
        ];
        let handle = spawn_components(components, shutdown.clone());
        assert!(handle.join().await.is_err());
        assert!(shutdown.is_cancelled());
    }
}
