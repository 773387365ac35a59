use axum::{
    extract::{FromRef, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    Json,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, PublicUser, SendOtpRequest,
            SignupRequest, UserEnvelope,
        },
        password::{hash_password, verify_password},
        policy::{is_valid_email, password_meets_policy, PASSWORD_POLICY_MESSAGE},
        session::{AuthSession, SessionKeys},
    },
    error::ApiError,
    state::AppState,
};

/// Issues a signup OTP for an unregistered email and delivers it
/// out-of-band. The code never appears in the response.
#[instrument(skip(state, payload))]
pub async fn send_signup_otp(
    State(state): State<AppState>,
    Json(mut payload): Json<SendOtpRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    if payload.email.is_empty() {
        return Err(ApiError::Validation("Email is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }

    // Two distinct checks: the address may already be registered, or the
    // same string may be taken as a username.
    if state.users.find_by_email(&payload.email).await?.is_some()
        || state
            .users
            .find_by_username(&payload.email)
            .await?
            .is_some()
    {
        warn!(email = %payload.email, "signup otp requested for registered identity");
        return Err(ApiError::AlreadyRegistered);
    }

    let code = state
        .otps
        .issue(&payload.email, state.config.otp_ttl_seconds)
        .await?;
    let text = format!(
        "Your RoomCraft verification code is {code}. It expires in {} minutes.",
        state.config.otp_ttl_seconds / 60
    );
    state
        .mailer
        .send(&payload.email, "Your RoomCraft verification code", &text)
        .await
        .map_err(|e| ApiError::Delivery(e.to_string()))?;

    info!(email = %payload.email, "signup otp issued");
    Ok(Json(MessageResponse {
        message: "Verification code sent".into(),
    }))
}

/// Completes signup: field checks, password policy, OTP verification,
/// user creation, OTP consumption, session establishment.
#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.username.is_empty()
        || payload.email.is_empty()
        || payload.password.is_empty()
        || payload.confirm_password.is_empty()
        || payload.otp.is_empty()
    {
        return Err(ApiError::Validation(
            "Username, email, password, confirm_password and otp are required".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password != payload.confirm_password {
        return Err(ApiError::Validation("Passwords do not match".into()));
    }
    if !password_meets_policy(&payload.password) {
        return Err(ApiError::Validation(PASSWORD_POLICY_MESSAGE.into()));
    }

    let now = OffsetDateTime::now_utc();
    let accepted = state
        .otps
        .lookup(&payload.email)
        .await?
        .map(|record| record.accepts(&payload.otp, now))
        .unwrap_or(false);
    if !accepted {
        warn!(email = %payload.email, "otp verification failed");
        return Err(ApiError::OtpInvalid);
    }

    // Duplicate check repeated at commit time; the unique indexes settle
    // the race between issue and complete.
    if state.users.find_by_email(&payload.email).await?.is_some()
        || state
            .users
            .find_by_username(&payload.username)
            .await?
            .is_some()
    {
        warn!(email = %payload.email, username = %payload.username, "duplicate signup");
        return Err(ApiError::AlreadyRegistered);
    }

    let hash = hash_password(&payload.password)?;
    let Some(user) = state
        .users
        .create(&payload.username, &payload.email, &hash)
        .await?
    else {
        warn!(email = %payload.email, username = %payload.username, "duplicate signup lost race");
        return Err(ApiError::AlreadyRegistered);
    };

    state.otps.delete(&payload.email).await?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.username)?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, keys.cookie(&token)?);

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            message: "User created successfully".into(),
            user: PublicUser::from(user),
        }),
    ))
}

/// One generic 401 for unknown username and wrong password alike.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".into(),
        ));
    }

    let user = match state.users.find_by_username(&payload.username).await? {
        Some(user) => user,
        None => {
            warn!(username = %payload.username, "login unknown username");
            return Err(ApiError::InvalidCredentials);
        }
    };
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = SessionKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.username)?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, keys.cookie(&token)?);

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok((
        headers,
        Json(AuthResponse {
            message: "Login successful".into(),
            user: PublicUser::from(user),
        }),
    ))
}

/// Unconditionally clears the session cookie.
#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<MessageResponse>), ApiError> {
    let keys = SessionKeys::from_ref(&state);
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, keys.clear_cookie()?);
    Ok((
        headers,
        Json(MessageResponse {
            message: "Logout successful".into(),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<UserEnvelope>, ApiError> {
    let user = state
        .users
        .find_by_id(session.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(UserEnvelope {
        user: PublicUser::from(user),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup_request(code: &str) -> SignupRequest {
        SignupRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "Abcdef1!".into(),
            confirm_password: "Abcdef1!".into(),
            otp: code.into(),
        }
    }

    #[tokio::test]
    async fn signup_consumes_the_verification_code() {
        let state = AppState::fake();
        let code = state.otps.issue("alice@example.com", 300).await.unwrap();

        let (status, headers, Json(body)) =
            signup(State(state.clone()), Json(signup_request(&code)))
                .await
                .expect("first signup");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.user.username, "alice");
        assert!(headers.contains_key(SET_COOKIE));

        // The code was deleted on success, so an identical replay dies on
        // the code check before it can reach the duplicate check.
        let err = signup(State(state.clone()), Json(signup_request(&code)))
            .await
            .err()
            .expect("replay must fail");
        assert!(matches!(err, ApiError::OtpInvalid));
        assert!(state
            .otps
            .lookup("alice@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_signup_reports_already_registered() {
        let state = AppState::fake();
        state
            .users
            .create("alice", "alice@example.com", "$argon2id$seed")
            .await
            .unwrap()
            .expect("seed user");

        // Even with a valid code, a taken identity is rejected.
        let code = state.otps.issue("alice@example.com", 300).await.unwrap();
        let err = signup(State(state), Json(signup_request(&code)))
            .await
            .err()
            .expect("duplicate must fail");
        assert!(matches!(err, ApiError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn otp_request_rejected_for_registered_identity() {
        let state = AppState::fake();
        state
            .users
            .create("alice", "alice@example.com", "$argon2id$seed")
            .await
            .unwrap()
            .expect("seed user");

        let err = send_signup_otp(
            State(state),
            Json(SendOtpRequest {
                email: "alice@example.com".into(),
            }),
        )
        .await
        .err()
        .expect("registered email must be rejected");
        assert!(matches!(err, ApiError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn signup_then_login_round_trip() {
        let state = AppState::fake();
        let code = state.otps.issue("alice@example.com", 300).await.unwrap();
        signup(State(state.clone()), Json(signup_request(&code)))
            .await
            .expect("signup");

        let (headers, Json(body)) = login(
            State(state.clone()),
            Json(LoginRequest {
                username: "alice".into(),
                password: "Abcdef1!".into(),
            }),
        )
        .await
        .expect("login");
        assert_eq!(body.user.email, "alice@example.com");
        assert!(headers.contains_key(SET_COOKIE));

        let err = login(
            State(state),
            Json(LoginRequest {
                username: "alice".into(),
                password: "Wrong-pass1!".into(),
            }),
        )
        .await
        .err()
        .expect("wrong password must fail");
        assert!(matches!(err, ApiError::InvalidCredentials));
    }
}
