// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Taking photos
//! - Recording clips
//! - Signing in and out
//! - Showing the configuration
//!
//! Camera commands drive a real session against the synthetic camera.

use snapshoot_camera::auth::{AuthContext, FileStore, HttpApi, LocalApi, RemoteApi};
use snapshoot_camera::backends::camera::{DeviceMediaSource, Facing, SyntheticBackend};
use snapshoot_camera::pipelines::CaptureEncoder;
use snapshoot_camera::{
    AppError, CapturedMedia, Config, LifecycleGuard, PhotoQuality, Session, SessionEvent,
    SessionSnapshot, SessionState, storage,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Take a photo
pub fn take_photo(
    facing: Option<Facing>,
    image: Option<PathBuf>,
    quality: Option<PhotoQuality>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load();
    if let Some(facing) = facing {
        config.session.initial_facing = facing;
    }
    if let Some(quality) = quality {
        config.session.jpeg_quality = quality.jpeg_quality();
    }

    let mut backend = SyntheticBackend::new();
    if let Some(path) = image {
        backend = backend.with_image(image::open(&path)?.to_rgba8());
        println!("Streaming image: {}", path.display());
    }

    let rt = tokio::runtime::Runtime::new()?;
    let media = rt.block_on(async {
        let (session, mut guard) = start_session(&config, backend);
        println!("Using {} camera", config.session.initial_facing);

        guard.will_enter()?;
        wait_for_state(&session, SessionState::Live).await?;

        println!("Capturing...");
        session.dispatch(SessionEvent::CapturePhoto)?;
        wait_for_state(&session, SessionState::Captured).await?;

        let media = session.deliver().await;
        guard.will_leave()?;
        session.shutdown().await?;
        media.ok_or_else(|| AppError::from("Session delivered no photo"))
    })?;

    let path = rt.block_on(save(&media, &config, output))?;
    println!("Photo saved: {}", path.display());
    Ok(())
}

/// Record a clip
pub fn record_video(
    facing: Option<Facing>,
    duration: Option<u32>,
    enable_audio: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load();
    if let Some(facing) = facing {
        config.session.initial_facing = facing;
    }
    config.session.capture_audio = enable_audio;

    let max = config.session.max_recording_seconds;
    let target = duration.unwrap_or(max).min(max);

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let rt = tokio::runtime::Runtime::new()?;
    let media = rt.block_on(async {
        let (session, mut guard) = start_session(&config, SyntheticBackend::new());
        println!("Using {} camera", config.session.initial_facing);
        if enable_audio {
            println!("Audio: enabled");
        }

        guard.will_enter()?;
        wait_for_state(&session, SessionState::Live).await?;

        println!("Duration: {} seconds", target);
        println!();
        println!("Recording... (press Ctrl+C to stop early)");
        session.dispatch(SessionEvent::StartRecording)?;

        let mut poll = tokio::time::interval(Duration::from_millis(100));
        let mut stop_sent = false;
        loop {
            poll.tick().await;
            let snapshot = session.snapshot();
            match snapshot.state {
                SessionState::Recording => {
                    let elapsed = snapshot.recording_elapsed_seconds.unwrap_or(0);
                    print!("\rRecording: {:02}:{:02}", elapsed / 60, elapsed % 60);
                    std::io::Write::flush(&mut std::io::stdout())?;

                    if stop_sent {
                        continue;
                    }
                    if stop_flag.load(Ordering::SeqCst) {
                        println!();
                        println!("Stopping early...");
                        session.dispatch(SessionEvent::StopRecording)?;
                        stop_sent = true;
                    } else if elapsed >= target && target < max {
                        session.dispatch(SessionEvent::StopRecording)?;
                        stop_sent = true;
                    }
                }
                SessionState::Captured => break,
                SessionState::Error => return Err(failure(&snapshot)),
                _ => {}
            }
        }
        println!();

        let media = session.deliver().await;
        guard.will_leave()?;
        session.shutdown().await?;
        media.ok_or_else(|| AppError::from("Session delivered no clip"))
    })?;

    let path = rt.block_on(save(&media, &config, output))?;
    println!("Clip saved: {}", path.display());
    Ok(())
}

/// Sign in against the configured API
pub fn login(email: &str, password: &str, offline: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let rt = tokio::runtime::Runtime::new()?;
    let user = rt.block_on(async { auth_context(&config, offline)?.login(email, password).await })?;
    println!("Signed in as {} <{}>", user.username, user.email);
    Ok(())
}

/// Create an account against the configured API
pub fn register(
    username: &str,
    email: &str,
    password: &str,
    offline: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let rt = tokio::runtime::Runtime::new()?;
    let user = rt.block_on(async {
        auth_context(&config, offline)?
            .register(username, email, password)
            .await
    })?;
    println!("Account created for {} <{}>", user.username, user.email);
    Ok(())
}

/// Forget the stored user and token
pub fn logout() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let auth = auth_context(&config, true)?;
        auth.restore().await;
        auth.logout().await
    })?;
    println!("Signed out");
    Ok(())
}

/// Print the stored user
pub fn whoami() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let rt = tokio::runtime::Runtime::new()?;
    let user = rt.block_on(async { Ok::<_, AppError>(auth_context(&config, true)?.restore().await) })?;
    match user {
        Some(user) => println!("{} <{}>", user.username, user.email),
        None => println!("Not signed in"),
    }
    Ok(())
}

/// Print the effective configuration
pub fn show_config(reset: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = if reset {
        let config = Config::default();
        let path = config.save()?;
        println!("Defaults written to {}", path.display());
        config
    } else {
        Config::load()
    };

    if let Some(path) = Config::default_path() {
        println!("# {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn auth_context(config: &Config, offline: bool) -> Result<AuthContext, AppError> {
    let api: Arc<dyn RemoteApi> = if offline {
        Arc::new(LocalApi)
    } else {
        Arc::new(HttpApi::new(&config.api_base_url))
    };
    Ok(AuthContext::new(api, Arc::new(FileStore::default_location()?)))
}

fn start_session(config: &Config, backend: SyntheticBackend) -> (Session, LifecycleGuard) {
    let source = DeviceMediaSource::new(Arc::new(backend));
    let encoder = CaptureEncoder::new(
        config.session.jpeg_quality,
        config.session.still_frame_timeout(),
    );
    let session = Session::spawn(config.session.clone(), source, encoder);
    let guard = LifecycleGuard::new(session.clone());
    (session, guard)
}

/// Wait for a state, failing if the session lands in Error instead
async fn wait_for_state(session: &Session, state: SessionState) -> Result<(), AppError> {
    let snapshot = session
        .wait_until(|s| s.state == state || s.state == SessionState::Error)
        .await?;
    if snapshot.state == SessionState::Error {
        return Err(failure(&snapshot));
    }
    Ok(())
}

fn failure(snapshot: &SessionSnapshot) -> AppError {
    match snapshot.error_kind {
        Some(kind) => AppError::Failed(kind),
        None => AppError::from("Session failed"),
    }
}

async fn save(
    media: &CapturedMedia,
    config: &Config,
    output: Option<PathBuf>,
) -> Result<PathBuf, AppError> {
    match output {
        Some(path) if path.is_dir() => storage::save_to_dir(media, &path).await,
        Some(path) => {
            storage::save_to_path(media, &path).await?;
            Ok(path)
        }
        None => {
            let dir = storage::default_directory(media, &config.save_folder);
            storage::save_to_dir(media, &dir).await
        }
    }
}
