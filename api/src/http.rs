//! reqwest-backed [`VerificationApi`].
//!
//! Calls are never retried automatically: a repeated verify or resend is not
//! idempotent on the backend, so retrying is left to the user.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use shopfront_config::ApiSettings;
use shopfront_types::{AuthTokens, MobileNumber, OtpCode};

use crate::{ApiError, ApiFut, ApiOutcome, ApiResponse, VerificationApi};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Backend endpoints, relative to the configured base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    VerifyMobileOtp,
    VerifyMobileLoginOtp,
    ResendMobileOtp,
    MobileOtpLogin,
    VerifyEmail,
}

impl Endpoint {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Endpoint::VerifyMobileOtp => "api/user/verify-mobile-otp",
            Endpoint::VerifyMobileLoginOtp => "api/user/verify-mobile-login-otp",
            Endpoint::ResendMobileOtp => "api/user/resend-mobile-otp",
            Endpoint::MobileOtpLogin => "api/user/mobile-otp-login",
            Endpoint::VerifyEmail => "api/user/verify-email",
        }
    }
}

#[derive(Serialize)]
struct MobileOtpBody<'a> {
    mobile: &'a str,
    otp: &'a str,
}

#[derive(Serialize)]
struct MobileBody<'a> {
    mobile: &'a str,
}

#[derive(Serialize)]
struct EmailCodeBody<'a> {
    code: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpVerificationApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpVerificationApi {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .https_only(settings.https_only)
            .user_agent(concat!("shopfront/", env!("CARGO_PKG_VERSION")))
            .default_headers(default_headers)
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&settings.base_url)?,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, ApiError> {
        Ok(self.base_url.join(endpoint.path())?)
    }

    async fn post<B, T>(&self, endpoint: Endpoint, body: &B) -> Result<ApiOutcome<T>, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let url = self.endpoint_url(endpoint)?;
        let request_id = Uuid::new_v4().to_string();
        tracing::debug!(endpoint = endpoint.path(), %request_id, "Sending verification request");

        let response = self
            .client
            .post(url)
            .header(REQUEST_ID_HEADER, &request_id)
            .json(body)
            .send()
            .await
            .inspect_err(|e| {
                tracing::warn!(endpoint = endpoint.path(), %request_id, "Request failed: {e}");
            })?;

        let status = response.status();
        let bytes = response.bytes().await?;
        tracing::debug!(
            endpoint = endpoint.path(),
            %request_id,
            status = status.as_u16(),
            "Verification response received"
        );

        if !status.is_success() {
            // Rejections often come back as 4xx with a normal envelope.
            if let Ok(envelope) = serde_json::from_slice::<ApiResponse<IgnoredAny>>(&bytes)
                && !envelope.success
            {
                return Ok(ApiOutcome::Rejected {
                    message: Some(envelope.message.trim().to_string())
                        .filter(|message| !message.is_empty()),
                });
            }
            let body = String::from_utf8_lossy(&bytes[..bytes.len().min(MAX_ERROR_BODY_BYTES)])
                .into_owned();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiResponse<Value> = serde_json::from_slice(&bytes)?;
        match envelope.into_outcome() {
            ApiOutcome::Accepted { message, data } => {
                let data = match data {
                    None | Some(Value::Null) => None,
                    Some(value) => Some(serde_json::from_value::<T>(value)?),
                };
                Ok(ApiOutcome::Accepted { message, data })
            }
            ApiOutcome::Rejected { message } => Ok(ApiOutcome::Rejected { message }),
        }
    }

    async fn post_without_data<B>(
        &self,
        endpoint: Endpoint,
        body: &B,
    ) -> Result<ApiOutcome<()>, ApiError>
    where
        B: Serialize + Sync,
    {
        self.post::<B, IgnoredAny>(endpoint, body)
            .await
            .map(ApiOutcome::without_data)
    }
}

/// Parse the base URL and make sure `Url::join` appends endpoint paths
/// instead of replacing the last segment.
fn normalize_base_url(raw: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

impl VerificationApi for HttpVerificationApi {
    fn verify_mobile_otp<'a>(
        &'a self,
        mobile: &'a MobileNumber,
        otp: &'a OtpCode,
    ) -> ApiFut<'a, ()> {
        Box::pin(async move {
            let body = MobileOtpBody {
                mobile: mobile.as_str(),
                otp: otp.as_str(),
            };
            self.post_without_data(Endpoint::VerifyMobileOtp, &body)
                .await
        })
    }

    fn verify_mobile_login_otp<'a>(
        &'a self,
        mobile: &'a MobileNumber,
        otp: &'a OtpCode,
    ) -> ApiFut<'a, AuthTokens> {
        Box::pin(async move {
            let body = MobileOtpBody {
                mobile: mobile.as_str(),
                otp: otp.as_str(),
            };
            self.post(Endpoint::VerifyMobileLoginOtp, &body).await
        })
    }

    fn resend_mobile_otp<'a>(&'a self, mobile: &'a MobileNumber) -> ApiFut<'a, ()> {
        Box::pin(async move {
            let body = MobileBody {
                mobile: mobile.as_str(),
            };
            self.post_without_data(Endpoint::ResendMobileOtp, &body)
                .await
        })
    }

    fn mobile_otp_login<'a>(&'a self, mobile: &'a MobileNumber) -> ApiFut<'a, ()> {
        Box::pin(async move {
            let body = MobileBody {
                mobile: mobile.as_str(),
            };
            self.post_without_data(Endpoint::MobileOtpLogin, &body)
                .await
        })
    }

    fn verify_email<'a>(&'a self, code: &'a str) -> ApiFut<'a, ()> {
        Box::pin(async move {
            let body = EmailCodeBody { code };
            self.post_without_data(Endpoint::VerifyEmail, &body).await
        })
    }
}
