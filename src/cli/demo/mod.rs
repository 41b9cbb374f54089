//! Demo command - issues a key against in-memory stores, signs a request
//! with it and runs the verifier, including a replay of the same request

use std::collections::BTreeMap;

use clap::Args;
use serde_json::{json, Value};
use tracing::info;

use crate::config::{AppConfig, AuthConfig, SecretBackend, SecretsConfig};
use crate::domain::{IssueKeyRequest, MerchantId, VerificationRequest};
use crate::AuthState;

/// Arguments for the demo command
#[derive(Args, Clone)]
pub struct DemoArgs {
    #[arg(long, default_value = "merchant-demo")]
    pub merchant_id: String,

    /// JSON body to sign
    #[arg(long, default_value = r#"{"amount":10,"currency":"EUR"}"#)]
    pub body: String,

    #[arg(long, default_value = "/v1/surcharges")]
    pub endpoint: String,

    #[arg(long, default_value_t = 10)]
    pub rotation_overlap_minutes: u32,
}

/// Run the demo command
pub async fn run(args: DemoArgs) -> anyhow::Result<()> {
    let config = AppConfig {
        logging: Default::default(),
        auth: AuthConfig::new(args.rotation_overlap_minutes),
        secrets: SecretsConfig {
            backend: SecretBackend::InMemory,
            ..SecretsConfig::default()
        },
    };

    let state = crate::create_auth_state_with_config(&config).await?;
    for step in walkthrough(&state, &args).await? {
        println!("{}", serde_json::to_string(&step)?);
    }

    Ok(())
}

async fn walkthrough(state: &AuthState, args: &DemoArgs) -> anyhow::Result<Vec<Value>> {
    let merchant = MerchantId::new(args.merchant_id.as_str())?;
    let body: Value = serde_json::from_str(&args.body)?;

    let issued = state
        .api_keys
        .issue(&merchant, IssueKeyRequest::new().with_description("demo"))
        .await?;
    info!(api_key_id = %issued.api_key.id(), "Issued demo key");

    let signer = state.request_signer(
        merchant.as_str(),
        issued.api_key.id().as_str(),
        issued.secret.clone(),
    );
    let request = VerificationRequest::new(signer.sign_json(&body), args.endpoint.as_str());

    let headers: BTreeMap<&str, String> = request.envelope.headers().into_iter().collect();

    let first = state.verifier.verify(&request).await;
    let replay = state.verifier.verify(&request).await;

    Ok(vec![
        json!({ "step": "issue", "api_key": issued.api_key }),
        json!({ "step": "sign", "headers": headers }),
        json!({ "step": "verify", "result": first }),
        json!({ "step": "replay", "result": replay }),
    ])
}
