//! Scoped session and subscription handles
//!
//! Both guards release what they hold exactly once: explicitly through
//! [`Session::close`] / [`Subscription::remove`], or when dropped.

use std::sync::Arc;

use crate::store::{ChangeListener, ResourceStore, SessionFactory, SubscriptionId};
use crate::{ResourcePath, Result};

/// An open administrative session on a store.
pub struct Session {
    store: Arc<dyn ResourceStore>,
    open: bool,
}

impl Session {
    /// Open a session through the given factory.
    pub fn open(factory: &dyn SessionFactory) -> Result<Self> {
        let store = factory.open_session()?;
        tracing::debug!("Opened store session");
        Ok(Self { store, open: true })
    }

    /// The store handle backing this session.
    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Close the session now.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.store.close();
            tracing::debug!("Closed store session");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("open", &self.open).finish()
    }
}

/// An installed change listener.
pub struct Subscription {
    store: Arc<dyn ResourceStore>,
    id: Option<SubscriptionId>,
}

impl Subscription {
    /// Install `listener` for events at or below `root`.
    pub fn install(
        store: Arc<dyn ResourceStore>,
        root: &ResourcePath,
        deep: bool,
        listener: ChangeListener,
    ) -> Result<Self> {
        let id = store.subscribe(root, deep, listener)?;
        tracing::debug!(subscription = %id, root = %root, deep, "Installed change subscription");
        Ok(Self {
            store,
            id: Some(id),
        })
    }

    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }

    /// Remove the listener now, reporting any store failure.
    pub fn remove(mut self) -> Result<()> {
        match self.id.take() {
            Some(id) => self.store.unsubscribe(id),
            None => Ok(()),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(id) = self.id.take()
            && let Err(e) = self.store.unsubscribe(id)
        {
            tracing::warn!(subscription = %id, "Failed to remove change subscription: {}", e);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
