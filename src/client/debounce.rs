use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Default coalescing window for keystrokes.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(200);

/// Leading + trailing edge debouncer.
///
/// The first value after a quiet period is forwarded immediately. Values that
/// follow within `window` of each other collapse into the last one, which is
/// forwarded once `window` passes without new input. Dropping the debouncer
/// flushes a pending value and closes the output.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn spawn(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, input) = mpsc::unbounded_channel();
        let (output, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(window, input, output));
        (Self { tx }, rx)
    }

    /// Returns `false` once the output side has gone away.
    pub fn push(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

async fn run<T>(
    window: Duration,
    mut input: mpsc::UnboundedReceiver<T>,
    output: mpsc::UnboundedSender<T>,
) {
    while let Some(first) = input.recv().await {
        if output.send(first).is_err() {
            return;
        }

        let mut pending = None;
        let mut deadline = Instant::now() + window;
        loop {
            tokio::select! {
                next = input.recv() => match next {
                    Some(value) => {
                        pending = Some(value);
                        deadline = Instant::now() + window;
                    }
                    None => {
                        if let Some(value) = pending.take() {
                            let _ = output.send(value);
                        }
                        return;
                    }
                },
                _ = tokio::time::sleep_until(deadline) => {
                    if let Some(value) = pending.take() {
                        if output.send(value).is_err() {
                            return;
                        }
                    }
                    break;
                }
            }
        }
    }
}
