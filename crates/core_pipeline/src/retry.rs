//! Constraint retry loop
//!
//! Model output is free-form, so the only cheap check available is whether
//! the requested dish is actually named. The loop keeps sampling until a
//! candidate mentions it or the attempt budget runs out.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! Attempting(1) --reject--> Attempting(2) --> ... --reject--> Exhausted
//!       |                        |
//!       +--accept--> Accepted    +--accept--> Accepted
//! ```
//!
//! Inference errors are not retried; they abort the loop.

use crate::error::Result;
use crate::generation::GenerationClient;
use crate::types::{Candidate, Prompt};

/// Where the loop is after each generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    /// About to make attempt `n` (1-based)
    Attempting(usize),
    /// Attempt `attempt` produced an acceptable candidate
    Accepted { candidate: Candidate, attempt: usize },
    /// All `attempts` were rejected
    Exhausted { attempts: usize },
}

impl RetryState {
    /// Initial state for a budget of `max_attempts`
    pub fn start(max_attempts: usize) -> Self {
        if max_attempts == 0 {
            RetryState::Exhausted { attempts: 0 }
        } else {
            RetryState::Attempting(1)
        }
    }

    /// Feed the candidate produced by the current attempt
    ///
    /// Terminal states ignore further candidates.
    pub fn advance(self, candidate: Candidate, food_name: &str, max_attempts: usize) -> Self {
        match self {
            RetryState::Attempting(n) if candidate.mentions(food_name) => RetryState::Accepted {
                candidate,
                attempt: n,
            },
            RetryState::Attempting(n) if n >= max_attempts => {
                RetryState::Exhausted { attempts: n }
            }
            RetryState::Attempting(n) => RetryState::Attempting(n + 1),
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RetryState::Attempting(_))
    }
}

/// Final result of a retry run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    Accepted { candidate: Candidate, attempts: usize },
    Exhausted { attempts: usize },
}

impl RetryOutcome {
    /// Generation calls made
    pub fn attempts(&self) -> usize {
        match self {
            RetryOutcome::Accepted { attempts, .. } | RetryOutcome::Exhausted { attempts } => {
                *attempts
            }
        }
    }
}

/// Generate until a candidate contains `food_name` or `max_attempts` are spent
///
/// Acceptance is a literal substring test, so an empty `food_name` accepts
/// the first candidate.
pub async fn run_until_accepted(
    client: &dyn GenerationClient,
    prompt: &Prompt,
    food_name: &str,
    max_attempts: usize,
) -> Result<RetryOutcome> {
    let mut state = RetryState::start(max_attempts);

    loop {
        state = match state {
            RetryState::Attempting(n) => {
                let candidate = client.generate(prompt).await?;
                let next = RetryState::Attempting(n).advance(candidate, food_name, max_attempts);
                if !next.is_terminal() {
                    tracing::info!(attempt = n, max_attempts, food_name, "Candidate rejected");
                }
                next
            }
            RetryState::Accepted { candidate, attempt } => {
                tracing::info!(attempt, "Candidate accepted");
                return Ok(RetryOutcome::Accepted {
                    candidate,
                    attempts: attempt,
                });
            }
            RetryState::Exhausted { attempts } => {
                tracing::warn!(attempts, food_name, "No candidate mentioned the food");
                return Ok(RetryOutcome::Exhausted { attempts });
            }
        };
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::types::ImageDataUri;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted outputs and counts calls
    pub(crate) struct ScriptedClient {
        outputs: Mutex<Vec<std::result::Result<String, String>>>,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedClient {
        pub(crate) fn new(outputs: Vec<std::result::Result<&str, &str>>) -> Self {
            let mut outputs: Vec<_> = outputs
                .into_iter()
                .map(|o| o.map(str::to_string).map_err(str::to_string))
                .collect();
            outputs.reverse();
            Self {
                outputs: Mutex::new(outputs),
                calls: AtomicUsize::new(0),
            }
        }

        /// Always answer with `text`
        pub(crate) fn repeating(text: &str, times: usize) -> Self {
            Self::new(vec![Ok(text); times])
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _prompt: &Prompt) -> Result<Candidate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .outputs
                .lock()
                .unwrap()
                .pop()
                .expect("scripted client ran out of outputs");
            next.map(Candidate).map_err(PipelineError::Inference)
        }
    }

    pub(crate) fn prompt() -> Prompt {
        crate::prompt::build("피자", ImageDataUri::new("image/jpeg", "QUJD"))
    }

    #[test]
    fn test_state_accepts_on_mention() {
        let next = RetryState::Attempting(2).advance(Candidate("피자 최고".into()), "피자", 5);
        assert_eq!(
            next,
            RetryState::Accepted {
                candidate: Candidate("피자 최고".into()),
                attempt: 2
            }
        );
    }

    #[test]
    fn test_state_moves_to_next_attempt() {
        let next = RetryState::Attempting(1).advance(Candidate("맛있어요".into()), "피자", 5);
        assert_eq!(next, RetryState::Attempting(2));
    }

    #[test]
    fn test_state_exhausts_on_last_attempt() {
        let next = RetryState::Attempting(5).advance(Candidate("맛있어요".into()), "피자", 5);
        assert_eq!(next, RetryState::Exhausted { attempts: 5 });
    }

    #[test]
    fn test_state_terminal_ignores_candidates() {
        let done = RetryState::Exhausted { attempts: 5 };
        assert_eq!(done.clone().advance(Candidate("피자".into()), "피자", 5), done);
    }

    #[test]
    fn test_start_with_zero_budget_is_exhausted() {
        assert_eq!(RetryState::start(0), RetryState::Exhausted { attempts: 0 });
        assert_eq!(RetryState::start(3), RetryState::Attempting(1));
    }

    #[tokio::test]
    async fn test_terminates_after_max_attempts() {
        let client = ScriptedClient::repeating("정말 맛있어요", 5);

        let outcome = run_until_accepted(&client, &prompt(), "피자", 5)
            .await
            .unwrap();

        assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 5 });
        assert_eq!(client.calls(), 5);
    }

    #[tokio::test]
    async fn test_short_circuits_on_acceptance() {
        for k in 1..=5 {
            let mut outputs = vec![Ok("맛있어요"); k - 1];
            outputs.push(Ok("피자 맛있어요"));
            let client = ScriptedClient::new(outputs);

            let outcome = run_until_accepted(&client, &prompt(), "피자", 5)
                .await
                .unwrap();

            assert_eq!(outcome.attempts(), k);
            assert_eq!(client.calls(), k);
            assert!(matches!(outcome, RetryOutcome::Accepted { .. }));
        }
    }

    #[tokio::test]
    async fn test_empty_food_name_accepts_first() {
        let client = ScriptedClient::repeating("아무 말", 5);

        let outcome = run_until_accepted(&client, &prompt(), "", 5).await.unwrap();

        assert_eq!(client.calls(), 1);
        assert_eq!(
            outcome,
            RetryOutcome::Accepted {
                candidate: Candidate("아무 말".into()),
                attempts: 1
            }
        );
    }

    #[tokio::test]
    async fn test_substring_match_accepts() {
        let client = ScriptedClient::repeating("후라이드치킨 최고", 1);

        let outcome = run_until_accepted(&client, &prompt(), "치킨", 5)
            .await
            .unwrap();

        assert!(matches!(outcome, RetryOutcome::Accepted { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_inference_error_is_not_retried() {
        let client = ScriptedClient::new(vec![Err("out of memory"), Ok("피자")]);

        let result = run_until_accepted(&client, &prompt(), "피자", 5).await;

        assert!(matches!(result, Err(PipelineError::Inference(_))));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_error_after_rejections_aborts() {
        let client = ScriptedClient::new(vec![Ok("맛있어요"), Err("device lost")]);

        let result = run_until_accepted(&client, &prompt(), "피자", 5).await;

        assert!(result.is_err());
        assert_eq!(client.calls(), 2);
    }
}
