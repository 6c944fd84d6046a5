use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::pin::Pin;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_INTERVAL: Duration = Duration::from_millis(25);

/// A wait that ran out of time. Carries the `expect` message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("timeout after {elapsed:?}: {msg}")]
pub struct Timeout {
    pub msg: String,
    pub elapsed: Duration,
}

pub fn poll<'a, F: Fn() -> bool + 'a>(condition: F) -> WaitFor<'a, F> {
    WaitFor {
        condition,
        timeout: DEFAULT_TIMEOUT,
        interval: DEFAULT_INTERVAL,
        msg: "condition not met",
    }
}

pub struct WaitFor<'a, F> {
    condition: F,
    timeout: Duration,
    interval: Duration,
    msg: &'a str,
}

impl<'a, F: Fn() -> bool + 'a> WaitFor<'a, F> {
    pub fn secs(mut self, n: u64) -> Self {
        self.timeout = Duration::from_secs(n);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sleep between checks. Defaults to 25ms.
    pub fn every(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn expect(mut self, msg: &'a str) -> Self {
        self.msg = msg;
        self
    }

    /// Wait without panicking; returns `Timeout` once the deadline passes.
    pub async fn check(self) -> Result<(), Timeout> {
        let start = tokio::time::Instant::now();
        let deadline = start + self.timeout;
        while !(self.condition)() {
            if tokio::time::Instant::now() >= deadline {
                return Err(Timeout { msg: self.msg.to_owned(), elapsed: start.elapsed() });
            }
            tokio::time::sleep(self.interval).await;
        }
        Ok(())
    }
}

impl<'a, F: Fn() -> bool + 'a> IntoFuture for WaitFor<'a, F> {
    type Output = ();
    type IntoFuture = Pin<Box<dyn Future<Output = ()> + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            if let Err(e) = self.check().await {
                panic!("timeout: {}", e.msg);
            }
        })
    }
}

pub fn poll_async<'a, F, Fut>(condition: F) -> WaitForAsync<'a, F, Fut>
where
    F: FnMut() -> Fut + 'a,
    Fut: Future<Output = bool> + 'a,
{
    WaitForAsync {
        condition,
        timeout: DEFAULT_TIMEOUT,
        interval: DEFAULT_INTERVAL,
        msg: "condition not met",
        _fut: PhantomData,
    }
}

pub struct WaitForAsync<'a, F, Fut> {
    condition: F,
    timeout: Duration,
    interval: Duration,
    msg: &'a str,
    _fut: PhantomData<fn() -> Fut>,
}

impl<'a, F, Fut> WaitForAsync<'a, F, Fut>
where
    F: FnMut() -> Fut + 'a,
    Fut: Future<Output = bool> + 'a,
{
    pub fn secs(mut self, n: u64) -> Self {
        self.timeout = Duration::from_secs(n);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sleep between checks. Defaults to 25ms.
    pub fn every(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn expect(mut self, msg: &'a str) -> Self {
        self.msg = msg;
        self
    }

    /// Wait without panicking; returns `Timeout` once the deadline passes.
    pub async fn check(mut self) -> Result<(), Timeout> {
        let start = tokio::time::Instant::now();
        let deadline = start + self.timeout;
        while !(self.condition)().await {
            if tokio::time::Instant::now() >= deadline {
                return Err(Timeout { msg: self.msg.to_owned(), elapsed: start.elapsed() });
            }
            tokio::time::sleep(self.interval).await;
        }
        Ok(())
    }
}

impl<'a, F, Fut> IntoFuture for WaitForAsync<'a, F, Fut>
where
    F: FnMut() -> Fut + 'a,
    Fut: Future<Output = bool> + 'a,
{
    type Output = ();
    type IntoFuture = Pin<Box<dyn Future<Output = ()> + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            if let Err(e) = self.check().await {
                panic!("timeout: {}", e.msg);
            }
        })
    }
}
