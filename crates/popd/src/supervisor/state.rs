use std::sync::Arc;

use popd_config::ForwardedArgs;

use crate::diagnostics::Diagnostics;
use crate::trace::TraceSink;

use super::ControlFlags;

/// Process-wide state owned by the accept loop.
///
/// Signal handlers hold their own clone of the control flags; everything
/// else is read-only after startup.
#[derive(Debug, Clone)]
pub struct SupervisorState {
    flags: Arc<ControlFlags>,
    args: Arc<ForwardedArgs>,
    diagnostics: Diagnostics,
}

impl SupervisorState {
    /// Bundles the loop's shared state.
    #[must_use]
    pub const fn new(
        flags: Arc<ControlFlags>,
        args: Arc<ForwardedArgs>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            flags,
            args,
            diagnostics,
        }
    }

    /// Control flags consulted once per iteration.
    #[must_use]
    pub const fn flags(&self) -> &Arc<ControlFlags> {
        &self.flags
    }

    /// Arguments forwarded to the protocol engine.
    #[must_use]
    pub const fn args(&self) -> &Arc<ForwardedArgs> {
        &self.args
    }

    /// Diagnostics facility.
    #[must_use]
    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Trace sink rotated and closed by the loop.
    #[must_use]
    pub const fn trace(&self) -> &TraceSink {
        self.diagnostics.trace()
    }
}
