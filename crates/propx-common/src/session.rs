//! Bearer credential shared by every outbound request.

use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;

type UnauthorizedHook = Box<dyn Fn() + Send + Sync + 'static>;

struct Inner {
    token: RwLock<Option<String>>,
    on_unauthorized: Option<UnauthorizedHook>,
}

/// Session context.
///
/// Cheap to clone; clones share the same credential. When the server rejects
/// the credential the session is cleared and `on_unauthorized` fires, which is
/// where a host routes back to its login view.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: RwLock::new(token.filter(|t| !t.is_empty())),
                on_unauthorized: None,
            }),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    /// Attach the hook fired after the credential is rejected.
    ///
    /// Must be called before the session is cloned.
    pub fn with_unauthorized_hook(token: Option<String>, hook: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: RwLock::new(token.filter(|t| !t.is_empty())),
                on_unauthorized: Some(Box::new(hook)),
            }),
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.token.read().await.clone()
    }

    pub async fn is_signed_in(&self) -> bool {
        self.inner.token.read().await.is_some()
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        *self.inner.token.write().await = (!token.is_empty()).then_some(token);
    }

    pub async fn clear(&self) {
        self.inner.token.write().await.take();
    }

    /// Clear the credential and fire the hook.
    pub async fn reject(&self) {
        self.clear().await;
        tracing::warn!("credential rejected, session cleared");
        if let Some(hook) = &self.inner.on_unauthorized {
            hook();
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("has_hook", &self.inner.on_unauthorized.is_some())
            .finish_non_exhaustive()
    }
}
