//! Scripted backend and helpers for engine unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use shopfront_api::{ApiError, ApiFut, ApiOutcome, Endpoint, VerificationApi};
use shopfront_types::{AuthTokens, MobileNumber, OtpCode};

use crate::{MemorySessionStore, Services};

pub(crate) enum Reply {
    Accept {
        message: &'static str,
        tokens: Option<AuthTokens>,
    },
    Reject(Option<&'static str>),
    Fail,
    /// Wait for the gate to be notified, then answer with the inner reply.
    Held(Arc<Notify>, Box<Reply>),
}

impl Reply {
    pub(crate) fn accept(message: &'static str) -> Self {
        Self::Accept {
            message,
            tokens: None,
        }
    }

    pub(crate) fn login(access: &str, refresh: &str) -> Self {
        Self::Accept {
            message: "Login successful",
            tokens: Some(AuthTokens::new(access, refresh)),
        }
    }

    pub(crate) fn held(gate: &Arc<Notify>, reply: Reply) -> Self {
        Self::Held(Arc::clone(gate), Box::new(reply))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub(crate) endpoint: Endpoint,
    pub(crate) payload: String,
}

#[derive(Default)]
pub(crate) struct FakeApi {
    replies: Mutex<HashMap<&'static str, VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn script(&self, endpoint: Endpoint, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(endpoint.path())
            .or_default()
            .push_back(reply);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, endpoint: Endpoint) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }

    fn next(&self, endpoint: Endpoint, payload: String) -> Reply {
        self.calls.lock().unwrap().push(Call { endpoint, payload });
        self.replies
            .lock()
            .unwrap()
            .get_mut(endpoint.path())
            .and_then(VecDeque::pop_front)
            .unwrap_or(Reply::accept("ok"))
    }
}

async fn resolve(mut reply: Reply) -> Result<ApiOutcome<AuthTokens>, ApiError> {
    loop {
        match reply {
            Reply::Held(gate, next) => {
                gate.notified().await;
                reply = *next;
            }
            Reply::Accept { message, tokens } => {
                return Ok(ApiOutcome::Accepted {
                    message: message.to_string(),
                    data: tokens,
                });
            }
            Reply::Reject(message) => {
                return Ok(ApiOutcome::Rejected {
                    message: message.map(str::to_string),
                });
            }
            Reply::Fail => {
                return Err(ApiError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
        }
    }
}

impl VerificationApi for FakeApi {
    fn verify_mobile_otp<'a>(
        &'a self,
        mobile: &'a MobileNumber,
        otp: &'a OtpCode,
    ) -> ApiFut<'a, ()> {
        let reply = self.next(
            Endpoint::VerifyMobileOtp,
            format!("{}:{}", mobile.as_str(), otp.as_str()),
        );
        Box::pin(async move { resolve(reply).await.map(ApiOutcome::without_data) })
    }

    fn verify_mobile_login_otp<'a>(
        &'a self,
        mobile: &'a MobileNumber,
        otp: &'a OtpCode,
    ) -> ApiFut<'a, AuthTokens> {
        let reply = self.next(
            Endpoint::VerifyMobileLoginOtp,
            format!("{}:{}", mobile.as_str(), otp.as_str()),
        );
        Box::pin(resolve(reply))
    }

    fn resend_mobile_otp<'a>(&'a self, mobile: &'a MobileNumber) -> ApiFut<'a, ()> {
        let reply = self.next(Endpoint::ResendMobileOtp, mobile.as_str().to_string());
        Box::pin(async move { resolve(reply).await.map(ApiOutcome::without_data) })
    }

    fn mobile_otp_login<'a>(&'a self, mobile: &'a MobileNumber) -> ApiFut<'a, ()> {
        let reply = self.next(Endpoint::MobileOtpLogin, mobile.as_str().to_string());
        Box::pin(async move { resolve(reply).await.map(ApiOutcome::without_data) })
    }

    fn verify_email<'a>(&'a self, code: &'a str) -> ApiFut<'a, ()> {
        let reply = self.next(Endpoint::VerifyEmail, code.to_string());
        Box::pin(async move { resolve(reply).await.map(ApiOutcome::without_data) })
    }
}

pub(crate) fn services(api: &Arc<FakeApi>) -> (Services, Arc<MemorySessionStore>) {
    let sessions = Arc::new(MemorySessionStore::new());
    let services = Services::new(
        Arc::clone(api) as Arc<dyn VerificationApi>,
        Arc::clone(&sessions) as Arc<dyn crate::SessionStore>,
    );
    (services, sessions)
}

/// Yield to spawned requests until `done` reports true.
pub(crate) async fn run_until(mut done: impl FnMut() -> bool) {
    for _ in 0..100 {
        tokio::task::yield_now().await;
        if done() {
            return;
        }
    }
    panic!("condition not reached after yielding");
}

/// Give spawned requests a chance to run without expecting progress.
pub(crate) async fn yield_a_while() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
