//! Failure injection for store collaborators

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mirror_store::{
    ChangeListener, Error, Resource, ResourcePath, ResourceStore, Result, SessionFactory,
    SubscriptionId,
};

/// An operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Exists,
    Reads,
    Children,
    Queries,
    Sessions,
    Subscribe,
    Unsubscribe,
}

/// Shared switchboard of injected faults.
#[derive(Debug, Default)]
pub struct Faults {
    active: Mutex<HashSet<Fault>>,
    query_delay: Mutex<Option<Duration>>,
    sessions_opened: AtomicUsize,
}

impl Faults {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inject(&self, fault: Fault) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(fault);
    }

    pub fn clear(&self, fault: Fault) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&fault);
    }

    /// Make every query sleep before it runs.
    pub fn delay_queries(&self, delay: Duration) {
        *self.query_delay.lock().unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// Sessions successfully opened through a [`FaultySessions`].
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    fn check(&self, fault: Fault) -> Result<()> {
        let active = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&fault);
        if active {
            Err(Error::unavailable(format!("injected {:?} fault", fault)))
        } else {
            Ok(())
        }
    }

    fn query_delay(&self) -> Option<Duration> {
        *self.query_delay.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A store that fails the operations switched on in its [`Faults`].
pub struct FaultyStore {
    inner: Arc<dyn ResourceStore>,
    faults: Arc<Faults>,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn ResourceStore>, faults: Arc<Faults>) -> Self {
        Self { inner, faults }
    }
}

impl ResourceStore for FaultyStore {
    fn get_resource(&self, path: &ResourcePath) -> Result<Option<Resource>> {
        self.faults.check(Fault::Reads)?;
        self.inner.get_resource(path)
    }

    fn list_children(&self, path: &ResourcePath) -> Result<Vec<Resource>> {
        self.faults.check(Fault::Children)?;
        self.inner.list_children(path)
    }

    fn exists(&self, path: &ResourcePath) -> Result<bool> {
        self.faults.check(Fault::Exists)?;
        self.inner.exists(path)
    }

    fn find_resources(&self, language: &str, query: &str) -> Result<Vec<Resource>> {
        if let Some(delay) = self.faults.query_delay() {
            std::thread::sleep(delay);
        }
        self.faults.check(Fault::Queries)?;
        self.inner.find_resources(language, query)
    }

    fn subscribe(
        &self,
        root: &ResourcePath,
        deep: bool,
        listener: ChangeListener,
    ) -> Result<SubscriptionId> {
        self.faults.check(Fault::Subscribe)?;
        self.inner.subscribe(root, deep, listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        self.faults.check(Fault::Unsubscribe)?;
        self.inner.unsubscribe(id)
    }

    fn close(&self) {
        self.inner.close();
    }
}

/// A session factory whose sessions are [`FaultyStore`]s.
pub struct FaultySessions {
    inner: Arc<dyn SessionFactory>,
    faults: Arc<Faults>,
}

impl FaultySessions {
    pub fn new(inner: Arc<dyn SessionFactory>, faults: Arc<Faults>) -> Self {
        Self { inner, faults }
    }
}

impl SessionFactory for FaultySessions {
    fn open_session(&self) -> Result<Arc<dyn ResourceStore>> {
        self.faults.check(Fault::Sessions)?;
        let session = self.inner.open_session()?;
        self.faults.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FaultyStore::new(session, Arc::clone(&self.faults))))
    }
}
