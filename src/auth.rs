use tracing::{info, warn};
use url::Url;

use crate::{
    config::Config,
    error::AppError,
    facebook::FacebookApi,
    pending::PendingAuthorizations,
    types::AuthCallbackParams,
};

/// Registers a pending authorization and builds the Facebook dialog URL for it.
pub async fn begin_authorization(
    config: &Config,
    facebook: &FacebookApi,
    pending: &PendingAuthorizations,
) -> Result<Url, AppError> {
    let state = pending.issue(config.next_step_url()).await;
    facebook.authorization_url(&state)
}

/// Handles the dialog callback and returns the generated feed URL.
///
/// All parameter checks happen before the outbound token request.
pub async fn complete_authorization(
    config: &Config,
    facebook: &FacebookApi,
    pending: &PendingAuthorizations,
    params: AuthCallbackParams,
) -> Result<String, AppError> {
    if let Some(error) = params.error {
        let reason = params
            .error_description
            .or(params.error_reason)
            .unwrap_or(error);
        warn!("Facebook authorization declined: {}", reason);
        return Err(AppError::AuthorizationDeclined(reason));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(AppError::MissingParameter("code"))?;
    info!("Got auth code: {}", code);

    let state = params
        .state
        .filter(|s| !s.is_empty())
        .ok_or(AppError::MissingParameter("state"))?;
    let authorization = pending
        .consume(&state)
        .await
        .ok_or_else(|| AppError::InvalidState("unknown, expired or already used".to_string()))?;
    validate_callback(&authorization.next)?;

    let access_token = facebook.exchange_code(&code).await?;
    let atom_url = config.atom_url(&access_token);
    info!("Generated feed URL: {}", atom_url);
    Ok(atom_url)
}

fn validate_callback(next: &str) -> Result<(), AppError> {
    if next.contains('?') {
        return Err(AppError::InvalidState(format!(
            "callback URL must not have a query: {}",
            next
        )));
    }
    Ok(())
}
