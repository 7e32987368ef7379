//! Serialized access to one [`Proxy`] from several callers.
//!
//! The wire protocol has no request ids, so two calls interleaved on one
//! transport would read each other's replies.  [`SharedProxy`] holds the
//! proxy behind an `embassy-sync` blocking mutex; a call owns the
//! transport from send to receive.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::error::{ProxyError, TransportError};
use crate::schema::Value;

use super::proxy::Proxy;
use super::transport::Transport;

pub struct SharedProxy<'p, T> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Proxy<'p, T>>>,
}

impl<'p, T: Transport> SharedProxy<'p, T> {
    pub fn new(proxy: Proxy<'p, T>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(proxy)),
        }
    }

    /// Run `f` with exclusive use of the proxy.
    pub fn with<R>(&self, f: impl FnOnce(&mut Proxy<'p, T>) -> R) -> Result<R, ProxyError> {
        self.inner.lock(|cell| -> Result<R, ProxyError> {
            // Only a nested call from inside `f` can find it borrowed.
            let mut proxy = cell
                .try_borrow_mut()
                .map_err(|_| TransportError::Channel("proxy re-entered".into()))?;
            Ok(f(&mut proxy))
        })
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Option<Value>, ProxyError> {
        self.with(|proxy| proxy.call(name, args))?
    }

    pub fn into_inner(self) -> Proxy<'p, T> {
        self.inner.into_inner().into_inner()
    }
}
