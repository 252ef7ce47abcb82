//! Application service: post-run actions over a module's results.
//!
//! An action failure is scoped to the action; the run it acts on is never
//! modified.

use chrono::Utc;

use crate::application::ports::{ApiRequest, ApiTransport, SettingsLookup, TokenProvider};
use crate::application::services::modules::ModuleRun;
use crate::domain::action::{
    ActionKind, ActionOutcome, ApiBody, HttpMethod, expand_payload, resolve_endpoint, run_builtin,
};
use crate::domain::error::ActionError;
use crate::domain::manifest::ModuleManifest;

/// Collaborators for API actions.
pub struct ActionContext<'a, T, K, S> {
    pub transport: &'a T,
    pub tokens: &'a K,
    pub settings: &'a S,
    /// Base for relative endpoints.
    pub api_base_url: Option<&'a str>,
}

/// Execute the action `action_id` against `run`.
///
/// # Errors
///
/// `UnknownAction` for an undeclared id, `NothingSelected` when a selectable
/// result has no selected rows, and the builtin or API errors otherwise.
pub async fn run_action<T, K, S>(
    manifest: &ModuleManifest,
    action_id: &str,
    run: &ModuleRun,
    ctx: &ActionContext<'_, T, K, S>,
) -> Result<ActionOutcome, ActionError>
where
    T: ApiTransport,
    K: TokenProvider,
    S: SettingsLookup,
{
    let action = manifest
        .action(action_id)
        .ok_or_else(|| ActionError::UnknownAction(action_id.to_string()))?;
    let selected = run.selected_rows();
    if run.selection.is_selectable() && selected.is_empty() {
        return Err(ActionError::NothingSelected);
    }

    match &action.kind {
        ActionKind::Builtin { action, column } => run_builtin(
            *action,
            column.as_deref(),
            &manifest.id,
            &manifest.output.columns,
            &selected,
            Utc::now(),
        ),
        ActionKind::Api {
            endpoint,
            method,
            payload,
            requires_auth,
        } => {
            let bearer_token = if *requires_auth {
                Some(
                    ctx.tokens
                        .bearer_token()
                        .filter(|t| !t.is_empty())
                        .ok_or(ActionError::NotAuthenticated)?,
                )
            } else {
                None
            };
            let body = expand_payload(payload, &selected, &|key: &str| ctx.settings.setting(key))?;
            let request = ApiRequest {
                method: *method,
                url: resolve_endpoint(endpoint, ctx.api_base_url)?,
                bearer_token,
                body: (*method != HttpMethod::Get && !body.is_null()).then_some(body),
            };

            tracing::info!(action = %action_id, method = %request.method, url = %request.url, rows = selected.len(), "sending api action");
            let response = ctx.transport.send(&request).await?;
            if !(200..300).contains(&response.status) {
                tracing::warn!(action = %action_id, status = response.status, "api action rejected");
                return Err(ActionError::Rejected {
                    status: response.status,
                    body: response.body,
                });
            }
            Ok(ActionOutcome::Api {
                status: response.status,
                body: ApiBody::from_text(response.body),
            })
        }
    }
}
