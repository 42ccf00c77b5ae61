use oauth2::basic::BasicClient;
use oauth2::url::Url;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use once_cell::sync::Lazy;
use rocket::http::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;

const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_API: &str = "https://api.github.com/user";

const OAUTH_CSRF_COOKIE: &str = "oauth_csrf_token";

type GitHubClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

// Redirects stay disabled so the token endpoint cannot bounce us anywhere.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to construct HTTP client")
});

/// The provider-supplied identity used to link or create a local user.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubProfile {
    pub id: u64,
    pub login: String,
}

/// GitHub OAuth app credentials, explicitly constructed from the environment
/// and managed as Rocket state.
#[derive(Debug, Clone)]
pub struct GitHubOauth {
    client_id: String,
    client_secret: String,
    callback_url: String,
}

impl GitHubOauth {
    pub fn from_env() -> Self {
        Self {
            client_id: dotenvy::var("GITHUB_CLIENT_ID").unwrap_or_default(),
            client_secret: dotenvy::var("GITHUB_CLIENT_SECRET").unwrap_or_default(),
            callback_url: dotenvy::var("GITHUB_CALLBACK_URL").unwrap_or_else(|_| {
                "http://localhost:8000/api/auth/github/callback".to_string()
            }),
        }
    }

    fn client(&self) -> Result<GitHubClient, AppError> {
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(GITHUB_AUTH_URL.to_string()).map_err(url_error)?)
            .set_token_uri(TokenUrl::new(GITHUB_TOKEN_URL.to_string()).map_err(url_error)?)
            .set_redirect_uri(RedirectUrl::new(self.callback_url.clone()).map_err(url_error)?);

        Ok(client)
    }

    /// Builds the consent-page URL and the CSRF state that must round-trip
    /// through the provider.
    pub fn authorize_url(&self) -> Result<(Url, CsrfToken), AppError> {
        let (url, csrf_token) = self
            .client()?
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("user:email".to_string()))
            .url();

        Ok((url, csrf_token))
    }

    /// Exchanges the callback code for an access token.
    pub async fn exchange_code(&self, code: String) -> Result<String, AppError> {
        let token = self
            .client()?
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&*HTTP_CLIENT)
            .await
            .map_err(|err| {
                AppError::ExternalService(format!("GitHub token exchange failed: {}", err))
            })?;

        info!("Exchanged GitHub authorization code");
        Ok(token.access_token().secret().clone())
    }

    /// Fetches the authenticated GitHub profile for the access token.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<GitHubProfile, AppError> {
        let profile = HTTP_CLIENT
            .get(GITHUB_USER_API)
            .bearer_auth(access_token)
            // GitHub rejects requests without a User-Agent
            .header("User-Agent", "practice-tracker")
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(profile_error)?
            .error_for_status()
            .map_err(profile_error)?
            .json::<GitHubProfile>()
            .await
            .map_err(profile_error)?;

        info!(login = %profile.login, "Fetched GitHub profile");
        Ok(profile)
    }
}

fn url_error(err: oauth2::url::ParseError) -> AppError {
    AppError::Internal(format!("Invalid OAuth endpoint URL: {}", err))
}

fn profile_error(err: reqwest::Error) -> AppError {
    AppError::ExternalService(format!("GitHub profile fetch failed: {}", err))
}

/// Holds the CSRF state across the provider redirect. Short-lived on purpose.
pub fn store_csrf_cookie(cookies: &CookieJar<'_>, csrf_token: &CsrfToken) {
    let cookie = Cookie::build((OAUTH_CSRF_COOKIE, csrf_token.secret().clone()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(rocket::time::Duration::minutes(15));

    cookies.add_private(cookie);
}

/// Removes and returns the stored CSRF state, if any. One shot per flow.
pub fn take_csrf_cookie(cookies: &CookieJar<'_>) -> Option<String> {
    let value = cookies
        .get_private(OAUTH_CSRF_COOKIE)
        .map(|c| c.value().to_string());

    cookies.remove_private(Cookie::build(OAUTH_CSRF_COOKIE));

    value
}
