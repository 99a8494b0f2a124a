//! OS signal delivery for the control plane.
//!
//! SIGINT and SIGTERM stop the server, SIGHUP asks for a reload. The
//! listeners run on a small current-thread tokio runtime in their own
//! thread, so the server loop itself never sees a signal handler.

use std::io;
use std::thread::{self, JoinHandle};

use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info};

use super::control::ControlHandle;

/// Installs the signal listeners and starts the thread that forwards them.
///
/// The thread exits after the first stop signal.
pub fn spawn(control: ControlHandle) -> io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;

    // Registered here so installation errors reach the caller.
    let (mut interrupt, mut terminate, mut hangup) = {
        let _guard = runtime.enter();
        (
            signal(SignalKind::interrupt())?,
            signal(SignalKind::terminate())?,
            signal(SignalKind::hangup())?,
        )
    };

    thread::Builder::new()
        .name("kiss-httpd-signals".into())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    tokio::select! {
                        _ = interrupt.recv() => {
                            info!("SIGINT received, stopping");
                            control.stop();
                            break;
                        }
                        _ = terminate.recv() => {
                            info!("SIGTERM received, stopping");
                            control.stop();
                            break;
                        }
                        _ = hangup.recv() => {
                            debug!("SIGHUP received, reloading");
                            control.request_reload();
                        }
                    }
                }
            });
        })
}
