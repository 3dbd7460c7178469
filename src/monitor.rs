use core::{cell::Cell, fmt};

use crate::{
    classify::classify_signal,
    config::MonitorConfig,
    record::ExtractionResult,
    retry::{Attempt, RetryOutcome, Sleeper, retry, retry_while_maintenance},
    source::{PageSignalSource, Signal, SignalError},
    util::jst_now,
};

/// Why one attempt did not produce a usable result.
#[derive(Debug)]
pub enum Failure {
    Fetch(SignalError),
    Unclassified(Signal),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{e}"),
            Self::Unclassified(signal) => {
                write!(f, "could not classify {:?}", crate::classify::char_prefix(signal.as_str(), 60))
            }
        }
    }
}

pub struct Monitor<S, Z> {
    cfg: MonitorConfig,
    source: S,
    sleeper: Z,
}

impl<S: PageSignalSource, Z: Sleeper> Monitor<S, Z> {
    pub const fn new(cfg: MonitorConfig, source: S, sleeper: Z) -> Self {
        Self { cfg, source, sleeper }
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    /// One full run: never fails, every failure mode ends up in the record.
    pub async fn run_once(&self) -> ExtractionResult {
        let result = retry_while_maintenance(
            self.cfg.maintenance_retry,
            &self.sleeper,
            ExtractionResult::is_maintenance,
            || self.attempt_sequence(),
        )
        .await;

        tracing::info!(target: "monitor", "\x1b[36m{}\x1b[0m", result.summary());
        result
    }

    async fn attempt(&self, attempt: u32, unclassified: &Cell<Option<Signal>>) -> Attempt<ExtractionResult, Failure> {
        tracing::debug!(target: "monitor", "attempt {attempt}");

        let signal = match self.source.fetch_signal(&self.cfg.url).await {
            Ok(signal) => signal,
            Err(e) if e.is_fatal() => return Attempt::Fatal(Failure::Fetch(e)),
            Err(e) => return Attempt::Retry(Failure::Fetch(e)),
        };

        let c = classify_signal(&signal, &self.cfg.classifier);
        if c.level.is_none() {
            unclassified.set(Some(signal.clone()));
            return Attempt::Retry(Failure::Unclassified(signal));
        }
        Attempt::Done(ExtractionResult::classified(&signal, c, jst_now()))
    }

    async fn attempt_sequence(&self) -> ExtractionResult {
        // last page that loaded but could not be classified
        let unclassified = Cell::new(None);

        match retry(self.cfg.retry, &self.sleeper, |n| self.attempt(n, &unclassified)).await {
            RetryOutcome::Success(result) => result,
            RetryOutcome::RetriesExhausted { attempts, last_error } => {
                if let Some(signal) = unclassified.take() {
                    tracing::warn!(target: "monitor", "all {attempts} attempts failed, reporting last unclassified page");
                    return ExtractionResult::unclassified(&signal, jst_now());
                }
                tracing::error!(target: "monitor", "\x1b[31mall {attempts} attempts failed\x1b[0m");
                ExtractionResult::all_retries_failed(last_error.map(|e| e.to_string()), jst_now())
            }
            RetryOutcome::Fatal(e) => ExtractionResult::failed(e.to_string(), jst_now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::{level::OccupancyLevel, retry::CountingSleeper};

    struct Scripted(RefCell<VecDeque<Result<Signal, SignalError>>>);

    impl Scripted {
        fn new(script: impl IntoIterator<Item = Result<Signal, SignalError>>) -> Self {
            Self(RefCell::new(script.into_iter().collect()))
        }
    }

    impl PageSignalSource for Scripted {
        async fn fetch_signal(&self, _: &str) -> Result<Signal, SignalError> {
            self.0
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(SignalError::Browser("script ran out".to_owned())))
        }
    }

    fn text(s: &str) -> Result<Signal, SignalError> {
        Ok(Signal::Text(s.to_owned()))
    }

    fn monitor(source: Scripted) -> Monitor<Scripted, CountingSleeper> {
        Monitor::new(MonitorConfig::default(), source, CountingSleeper::default())
    }

    #[tokio::test]
    async fn unclassified_then_classified() {
        let m = monitor(Scripted::new([text("loading"), text("空いてます")]));
        let r = m.run_once().await;
        assert!(r.is_valid);
        assert_eq!(r.matched_level, OccupancyLevel::Lv1);
        assert_eq!(m.sleeper.calls(), 1);
    }

    #[tokio::test]
    async fn keeps_last_unclassified_text() {
        let m = monitor(Scripted::new([text("a"), text("b"), text("c")]));
        let r = m.run_once().await;
        assert!(!r.is_valid);
        assert_eq!(r.matched_level, OccupancyLevel::Unknown);
        assert_eq!(r.text_preview, "c");
    }

    #[tokio::test]
    async fn unclassified_survives_later_fetch_error() {
        let m = monitor(Scripted::new([
            text("loading page text"),
            text("still loading"),
            Err(SignalError::Timeout(core::time::Duration::from_secs(30))),
        ]));
        let r = m.run_once().await;
        assert!(!r.is_valid);
        assert_eq!(r.matched_level, OccupancyLevel::Unknown);
        assert_eq!(r.text_preview, "still loading");
        assert_eq!(m.sleeper.calls(), 2);
    }

    #[tokio::test]
    async fn fatal_error_skips_retries() {
        let m = monitor(Scripted::new([Err(SignalError::OcrUnavailable("tesseract".to_owned()))]));
        let r = m.run_once().await;
        assert_eq!(r.matched_level, OccupancyLevel::Error);
        assert_eq!(m.sleeper.calls(), 0);
    }
}
