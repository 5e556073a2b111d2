use crate::prelude::*;
use async_trait::async_trait;
use easy_ext::ext;
use futures::prelude::*;
use std::time::{Duration, Instant};

#[ext(FutureExt)]
#[async_trait]
pub(crate) impl<T, E, F> F
where
    F: Future<Output = Result<T, E>> + Send,
{
    async fn with_duration_log<'m>(self, msg: &'m str) -> F::Output {
        let (result, duration) = self.with_duration().await;
        let duration = tracing_duration(duration);
        match &result {
            Ok(_) => info!(result = "ok", duration, "{msg}"),
            Err(_) => warn!(result = "err", duration, "{msg}"),
        }
        result
    }

    async fn with_duration(self) -> (F::Output, Duration) {
        let start = Instant::now();
        let result = self.await;
        (result, start.elapsed())
    }
}
