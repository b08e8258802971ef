// SPDX-License-Identifier: GPL-3.0-only

//! Binding between a host view and a camera session
//!
//! The host calls the hook matching its view lifecycle. Leaving the view
//! always tears the session down, and so does dropping the guard (including
//! while unwinding), so the camera is never left running behind a hidden
//! view.

use crate::errors::SessionError;
use crate::session::{Session, SessionEvent, SessionState};
use tracing::{debug, info, warn};

/// View lifecycle hooks for a [`Session`]
pub struct LifecycleGuard {
    session: Session,
    visible: bool,
    paused: bool,
}

impl LifecycleGuard {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            visible: false,
            paused: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// View is about to become visible
    ///
    /// Starts the preview unless media is waiting for the user or the user
    /// paused the camera.
    pub fn will_enter(&mut self) -> Result<(), SessionError> {
        self.visible = true;
        self.start_if_wanted()
    }

    /// View is about to be hidden
    pub fn will_leave(&mut self) -> Result<(), SessionError> {
        self.visible = false;
        info!("View leaving, tearing down camera session");
        self.session.dispatch(SessionEvent::Teardown)
    }

    /// View has been hidden
    ///
    /// Repeats the teardown in case something restarted the camera in
    /// between.
    pub fn did_leave(&mut self) -> Result<(), SessionError> {
        self.visible = false;
        self.session.dispatch(SessionEvent::Teardown)
    }

    /// User paused the camera (e.g. an overlay covers the preview)
    pub fn pause(&mut self) -> Result<(), SessionError> {
        if self.paused {
            return Ok(());
        }
        self.paused = true;
        debug!("Camera paused by user");
        if self.session.snapshot().state == SessionState::Captured {
            return Ok(());
        }
        self.session.dispatch(SessionEvent::Teardown)
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        if !self.paused {
            return Ok(());
        }
        self.paused = false;
        debug!("Camera resumed by user");
        if self.visible {
            self.start_if_wanted()
        } else {
            Ok(())
        }
    }

    fn start_if_wanted(&self) -> Result<(), SessionError> {
        let snapshot = self.session.snapshot();
        if snapshot.captured_media.is_some() {
            debug!("Captured media pending, not starting preview");
            return Ok(());
        }
        if self.paused {
            debug!("Camera paused, not starting preview");
            return Ok(());
        }
        self.session.dispatch(SessionEvent::StartPreview)
    }
}

impl Drop for LifecycleGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            warn!("Lifecycle guard dropped during panic, tearing down camera session");
        }
        // A closed session has already released the camera
        let _ = self.session.dispatch(SessionEvent::Teardown);
    }
}

impl std::fmt::Debug for LifecycleGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleGuard")
            .field("visible", &self.visible)
            .field("paused", &self.paused)
            .finish()
    }
}
