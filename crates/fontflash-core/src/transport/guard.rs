//! Scoped ownership of a channel for one transfer session.

use std::ops::{Deref, DerefMut};

use super::traits::SerialChannel;

/// Owns a channel and closes it when dropped, on success, error or unwind.
pub struct ChannelGuard<C: SerialChannel> {
    inner: C,
}

impl<C: SerialChannel> ChannelGuard<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: SerialChannel> Deref for ChannelGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.inner
    }
}

impl<C: SerialChannel> DerefMut for ChannelGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}

impl<C: SerialChannel> Drop for ChannelGuard<C> {
    fn drop(&mut self) {
        tracing::debug!(channel = %self.inner.name(), "Releasing channel");
        self.inner.close();
    }
}
