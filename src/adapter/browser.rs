//! Browser-backed adapter family.
//!
//! The browser driver is not bundled with this build, so the factory cannot
//! provide an adaptee. Sessions created through it exist but every command
//! on them is a silent no-op.

use super::{Adapter, AdapterFactory, AdapterKind, AdapterOptions, AdapterResult};

#[derive(Debug, Clone, Default)]
pub struct BrowserAdapterFactory {
    _private: (),
}

impl BrowserAdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdapterFactory for BrowserAdapterFactory {
    fn create(
        &self,
        token: &str,
        options: &AdapterOptions,
    ) -> AdapterResult<Option<Box<dyn Adapter>>> {
        tracing::warn!(
            token,
            headless = options.headless,
            "browser driver unavailable; session commands will be no-ops"
        );
        Ok(None)
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Browser
    }
}
