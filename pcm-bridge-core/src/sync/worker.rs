use std::io;
use std::thread::{self, JoinHandle};

use super::cancellation::CancellationToken;

/// A named background thread bound to a cancellation token.
///
/// [`join`](WorkerHandle::join) is the only way the owner observes the
/// worker's end; dropping the handle cancels and joins.
pub struct WorkerHandle {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn<F>(name: &str, token: CancellationToken, body: F) -> io::Result<Self>
    where
        F: FnOnce(CancellationToken) + Send + 'static,
    {
        let worker_token = token.clone();
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || body(worker_token))?;

        Ok(Self {
            token,
            handle: Some(handle),
        })
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Block until the worker exits. Returns `false` if it panicked.
    pub fn join(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => handle.join().is_ok(),
            None => true,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.token.cancel();
        if !self.join() {
            log::error!("background worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn join_waits_for_exit() {
        let iterations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&iterations);

        let mut worker = WorkerHandle::spawn("test-worker", CancellationToken::new(), move |token| {
            while !token.wait_timeout(Duration::from_millis(1)) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(10));
        worker.cancel();
        assert!(worker.join());
        assert!(worker.is_finished());

        let after_join = iterations.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(iterations.load(Ordering::SeqCst), after_join);
    }

    #[test]
    fn join_reports_panic() {
        let mut worker = WorkerHandle::spawn("panicking-worker", CancellationToken::new(), |_| {
            panic!("boom");
        })
        .unwrap();
        assert!(!worker.join());
    }

    #[test]
    fn drop_cancels_worker() {
        let token = CancellationToken::new();
        let observed = token.clone();
        let worker = WorkerHandle::spawn("drop-worker", token, |token| {
            while !token.wait_timeout(Duration::from_millis(5)) {}
        })
        .unwrap();

        drop(worker);
        assert!(observed.is_cancelled());
    }
}
