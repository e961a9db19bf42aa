/// Deadline-blind sleep
///
/// The timeout fixture must sleep through the host's budget, so nothing here
/// looks at a context or a cancellation flag. A signal delivered to the
/// sleeping thread ends the sleep early; the caller decides what to log.
use std::time::Duration;

/// How a sleep ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// Slept the full duration
    Completed,
    /// A signal cut the sleep short
    Interrupted { remaining: Duration },
}

/// Seconds past what time_t holds are clamped rather than wrapped
#[cfg(unix)]
fn timespec_for(duration: Duration) -> libc::timespec {
    libc::timespec {
        tv_sec: duration.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    }
}

/// Sleep for `duration`, returning early only when interrupted by a signal
#[cfg(unix)]
pub fn sleep_unconditionally(duration: Duration) -> SleepOutcome {
    let request = timespec_for(duration);
    let mut remaining = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };

    // SAFETY: both pointers refer to live stack timespecs for the whole call.
    let rc = unsafe { libc::nanosleep(&request, &mut remaining) };
    if rc == 0 {
        return SleepOutcome::Completed;
    }

    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EINTR) {
        return SleepOutcome::Interrupted {
            remaining: Duration::new(remaining.tv_sec as u64, remaining.tv_nsec as u32),
        };
    }

    log::warn!("nanosleep failed ({}), falling back to thread::sleep", err);
    std::thread::sleep(duration);
    SleepOutcome::Completed
}

#[cfg(not(unix))]
pub fn sleep_unconditionally(duration: Duration) -> SleepOutcome {
    std::thread::sleep(duration);
    SleepOutcome::Completed
}

/// Run `work` on its own thread and keep sending it SIGUSR1 until it returns
///
/// A signal that lands before the worker reaches nanosleep is simply lost, so
/// one signal is not enough.
#[cfg(all(test, unix))]
pub(crate) fn interrupt_until_done<T, F>(work: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    use crossbeam_channel::RecvTimeoutError;
    use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

    extern "C" fn noop(_: libc::c_int) {}

    // No SA_RESTART so nanosleep reports EINTR
    let action = SigAction::new(SigHandler::Handler(noop), SaFlags::empty(), SigSet::empty());
    unsafe {
        signal::sigaction(Signal::SIGUSR1, &action).unwrap();
    }

    let (tid_tx, tid_rx) = crossbeam_channel::bounded(1);
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let worker = std::thread::spawn(move || {
        tid_tx.send(unsafe { libc::pthread_self() }).unwrap();
        let result = work();
        let _ = done_tx.send(());
        result
    });

    // The worker is joined below, so its pthread_t stays valid while we signal.
    let thread_id = tid_rx.recv().unwrap();
    while let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(Duration::from_millis(25)) {
        unsafe {
            libc::pthread_kill(thread_id, libc::SIGUSR1);
        }
    }

    worker.join().unwrap()
}
