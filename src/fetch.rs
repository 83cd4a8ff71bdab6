//! Resilient request execution.
//!
//! One logical call may span several physical attempts. Each attempt
//! runs under its own timeout token, merged with the caller's
//! cancellation token when one is configured, and ends in an explicit
//! [`Outcome`] that drives the retry loop.

use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    cancel,
    policy::backoff_delay,
    request::Payload,
    ErrorBody, FetchError, RequestSpec, RetryPolicy,
};

/// Classified result of a single attempt.
enum Outcome {
    Success(reqwest::Response),
    /// Worth another attempt; carries the failure for the last-error slot.
    Retry(FetchError),
    Terminal(FetchError),
}

/// Executes `spec` until it succeeds, the caller cancels, or the retry
/// budget is exhausted.
///
/// A policy with `max_retries = N` issues at most `N + 1` attempts.
/// Responses with a 2xx status always succeed; failed statuses retry
/// only while budget remains and the policy's predicate accepts them.
/// Timeouts and transport failures retry on budget alone. A fired
/// caller token terminates the call immediately with
/// [`FetchError::Cancelled`], including during the backoff sleep.
pub async fn fetch_with_retry(
    http: &reqwest::Client,
    spec: &RequestSpec,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, FetchError> {
    if policy.timeout.is_zero() {
        return Err(FetchError::InvalidPolicy(
            "timeout must be greater than zero".to_owned(),
        ));
    }

    let total_attempts = policy.max_retries.saturating_add(1);
    let mut last_failure: Option<FetchError> = None;

    for attempt in 1..=total_attempts {
        let retry_allowed = attempt < total_attempts;
        match run_attempt(http, spec, policy, attempt, retry_allowed).await {
            Outcome::Success(response) => return Ok(response),
            Outcome::Terminal(error) => return Err(error),
            Outcome::Retry(failure) => {
                let delay = backoff_delay(policy.base_backoff, attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %failure,
                    "retrying request after backoff"
                );
                last_failure = Some(failure);
                wait_before_retry(delay, policy.cancellation.as_ref()).await?;
            }
        }
    }

    Err(last_failure.unwrap_or(FetchError::RetriesExhausted {
        attempts: total_attempts,
    }))
}

async fn run_attempt(
    http: &reqwest::Client,
    spec: &RequestSpec,
    policy: &RetryPolicy,
    attempt: u32,
    retry_allowed: bool,
) -> Outcome {
    let timer = CancellationToken::new();
    arm_timer(&timer, policy.timeout);

    let effective = match &policy.cancellation {
        Some(external) => cancel::merge(external, &timer),
        None => timer.clone(),
    };

    let request = match build_request(http, spec, policy) {
        Ok(request) => request,
        Err(error) => {
            timer.cancel();
            return classify_transport(error, attempt, retry_allowed);
        }
    };

    // Biased so a cancellation that races a completed response still
    // classifies as the abort.
    let settled = tokio::select! {
        biased;
        _ = effective.cancelled() => None,
        result = http.execute(request) => Some(result),
    };

    // The timer must not outlive its attempt, whichever way it ended.
    // Cancelling it also reaps the timer task and the merge forwarder.
    timer.cancel();

    match settled {
        None => classify_cancellation(policy, attempt, retry_allowed),
        Some(Ok(response)) => classify_response(response, policy, attempt, retry_allowed).await,
        Some(Err(error)) => classify_transport(error, attempt, retry_allowed),
    }
}

/// Cancels `timer` once `timeout` elapses. The task exits early if the
/// token is cancelled first, which is how each attempt disarms it.
fn arm_timer(timer: &CancellationToken, timeout: Duration) {
    let token = timer.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sleep(timeout) => token.cancel(),
            _ = token.cancelled() => {}
        }
    });
}

fn build_request(
    http: &reqwest::Client,
    spec: &RequestSpec,
    policy: &RetryPolicy,
) -> Result<reqwest::Request, reqwest::Error> {
    let mut headers = spec.headers.clone();
    for (name, value) in policy.extra_headers.iter() {
        headers.insert(name.clone(), value.clone());
    }

    let builder = http.request(spec.method.clone(), &spec.url).headers(headers);
    let builder = match &spec.payload {
        Payload::Empty => builder,
        Payload::Form(fields) => builder.form(fields),
        Payload::Json(value) => builder.json(value),
        Payload::Bytes(bytes) => builder.body(bytes.clone()),
    };
    builder.build()
}

/// The effective token fired. The caller's own signal takes precedence
/// over retry logic; otherwise it was this attempt's timer.
fn classify_cancellation(policy: &RetryPolicy, attempt: u32, retry_allowed: bool) -> Outcome {
    let caller_cancelled = policy
        .cancellation
        .as_ref()
        .is_some_and(|token| token.is_cancelled());
    if caller_cancelled {
        return Outcome::Terminal(FetchError::Cancelled);
    }

    let timeout = FetchError::Timeout { attempts: attempt };
    if retry_allowed {
        Outcome::Retry(timeout)
    } else {
        Outcome::Terminal(timeout)
    }
}

async fn classify_response(
    response: reqwest::Response,
    policy: &RetryPolicy,
    attempt: u32,
    retry_allowed: bool,
) -> Outcome {
    let status = response.status();
    // Success range wins before the predicate is consulted.
    if status.is_success() {
        return Outcome::Success(response);
    }

    if retry_allowed && (policy.retryable)(status.as_u16()) {
        return Outcome::Retry(FetchError::Http {
            status: status.as_u16(),
            status_text: status_text(status),
            body: ErrorBody::Empty,
            attempts: attempt,
        });
    }

    let body = read_error_body(response).await;
    Outcome::Terminal(FetchError::Http {
        status: status.as_u16(),
        status_text: status_text(status),
        body,
        attempts: attempt,
    })
}

fn classify_transport(error: reqwest::Error, attempt: u32, retry_allowed: bool) -> Outcome {
    let failure = FetchError::Transport {
        attempts: attempt,
        source: error,
    };
    if retry_allowed {
        Outcome::Retry(failure)
    } else {
        Outcome::Terminal(failure)
    }
}

fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_owned()
}

/// Drains a terminal error response: JSON first, raw text second, empty
/// on any read failure. Never propagates past classification.
async fn read_error_body(response: reqwest::Response) -> ErrorBody {
    match response.text().await {
        Ok(text) if text.is_empty() => ErrorBody::Empty,
        Ok(text) => match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => ErrorBody::Json(value),
            Err(_) => ErrorBody::Text(text),
        },
        Err(_) => ErrorBody::Empty,
    }
}

/// Sleeps out the backoff, aborting early if the caller cancels.
async fn wait_before_retry(
    delay: Duration,
    cancellation: Option<&CancellationToken>,
) -> Result<(), FetchError> {
    match cancellation {
        Some(external) => tokio::select! {
            biased;
            _ = external.cancelled() => Err(FetchError::Cancelled),
            _ = sleep(delay) => Ok(()),
        },
        None => {
            sleep(delay).await;
            Ok(())
        }
    }
}
