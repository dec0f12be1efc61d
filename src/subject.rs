//! Data subject operations — export, purge and profile lookup by DSID
//!
//! These reuse the executor plumbing of the codec but never build transforms;
//! each operates on a single identifier.

use crate::client::PrivateClient;
use crate::context::CallContext;
use crate::error::{PrivateError, Result};
use crate::executor::config::{self, Config};
use crate::executor::{ENDPOINT_EXPORT, ENDPOINT_PROFILE_TO_DSID, ENDPOINT_PURGE};
use crate::transform::Dsid;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

impl PrivateClient {
    /// Export all private data held for `dsid`
    pub async fn export(
        &self,
        ctx: &CallContext,
        dsid: &Dsid,
        mut configs: Vec<Config>,
    ) -> Result<HashMap<String, Value>> {
        if dsid.is_empty() {
            return Err(PrivateError::InvalidArgument("invalid empty DSID".into()));
        }
        configs.push(config::with_param(dsid)?);
        let resp = self
            .guarded(
                ctx,
                ENDPOINT_EXPORT,
                &configs,
                self.executor.private_export(ctx, &configs),
            )
            .await?;
        if let Some(msg) = resp.error_message() {
            return Err(PrivateError::ExportError(msg.to_string()));
        }
        Ok(resp.unmarshal()?)
    }

    /// Permanently erase all private data held for `dsid`. The executor must
    /// echo back the purged identifier.
    pub async fn purge(&self, ctx: &CallContext, dsid: &Dsid, mut configs: Vec<Config>) -> Result<()> {
        if dsid.is_empty() {
            return Err(PrivateError::InvalidArgument("invalid empty DSID".into()));
        }
        configs.push(config::with_param(dsid)?);
        configs.push(self.seed_config()?);
        let resp = self
            .guarded(
                ctx,
                ENDPOINT_PURGE,
                &configs,
                self.executor.private_purge(ctx, &configs),
            )
            .await?;
        if let Some(msg) = resp.error_message() {
            return Err(PrivateError::PurgeError(msg.to_string()));
        }
        let got: Dsid = resp.unmarshal()?;
        if &got != dsid {
            warn!(
                "Purge echoed subject {} but {} was requested",
                got.short(),
                dsid.short()
            );
            return Err(PrivateError::ResponseMismatch {
                expected: dsid.to_string(),
                got: got.to_string(),
            });
        }
        info!("Purged data subject {}", dsid.short());
        Ok(())
    }

    /// Look up the DSID for a data subject profile
    pub async fn profile_to_dsid<P: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        profile: &P,
        mut configs: Vec<Config>,
    ) -> Result<Dsid> {
        configs.push(config::with_param(profile)?);
        let resp = self
            .guarded(
                ctx,
                ENDPOINT_PROFILE_TO_DSID,
                &configs,
                self.executor.private_get_dsid(ctx, &configs),
            )
            .await?;
        if let Some(msg) = resp.error_message() {
            return Err(PrivateError::LookupError(msg.to_string()));
        }
        let dsid: Dsid = resp.unmarshal()?;
        if dsid.is_empty() {
            return Err(PrivateError::LookupError("executor returned an empty DSID".into()));
        }
        Ok(dsid)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::PrivateClient;
    use crate::context::CallContext;
    use crate::error::PrivateError;
    use crate::executor::config::{self, SEED_KEY};
    use crate::executor::{
        MemoryExecutor, Response, ScriptedExecutor, ENDPOINT_EXPORT, ENDPOINT_PROFILE_TO_DSID,
        ENDPOINT_PURGE,
    };
    use crate::transform::{Dsid, Transform};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_dsid_rejected_without_contact() {
        let executor = Arc::new(ScriptedExecutor::new());
        let client = PrivateClient::new(executor.clone());
        let ctx = CallContext::background();
        let empty = Dsid::new("");

        assert!(matches!(
            client.export(&ctx, &empty, vec![]).await,
            Err(PrivateError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.purge(&ctx, &empty, vec![]).await,
            Err(PrivateError::InvalidArgument(_))
        ));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_purge_echo_matches() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.respond(ENDPOINT_PURGE, Response::from_value("subj-1").unwrap());
        let client = PrivateClient::new(executor.clone());

        client
            .purge(&CallContext::background(), &Dsid::new("subj-1"), vec![])
            .await
            .unwrap();

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(config::params(&calls[0].configs), vec![&json!("subj-1")]);
        assert_eq!(config::transient(&calls[0].configs, SEED_KEY).unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_purge_echo_mismatch() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.respond(ENDPOINT_PURGE, Response::from_value("subj-2").unwrap());
        let client = PrivateClient::new(executor);

        let err = client
            .purge(&CallContext::background(), &Dsid::new("subj-1"), vec![])
            .await
            .unwrap_err();
        match err {
            PrivateError::ResponseMismatch { expected, got } => {
                assert_eq!(expected, "subj-1");
                assert_eq!(got, "subj-2");
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_purge_remote_error() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.respond(ENDPOINT_PURGE, Response::error("no such subject"));
        let client = PrivateClient::new(executor);
        let err = client
            .purge(&CallContext::background(), &Dsid::new("subj-1"), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, PrivateError::PurgeError(m) if m == "no such subject"));
    }

    #[tokio::test]
    async fn test_export_single_param() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.respond(
            ENDPOINT_EXPORT,
            Response::from_value(&json!({"customer.ssn": "123"})).unwrap(),
        );
        let client = PrivateClient::new(executor.clone());

        let exported = client
            .export(&CallContext::background(), &Dsid::new("subj-1"), vec![])
            .await
            .unwrap();
        assert_eq!(exported.get("customer.ssn"), Some(&json!("123")));
        assert_eq!(config::params(&executor.calls()[0].configs), vec![&json!("subj-1")]);
    }

    #[tokio::test]
    async fn test_export_remote_error() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.respond(ENDPOINT_EXPORT, Response::error("denied"));
        let client = PrivateClient::new(executor);
        let err = client
            .export(&CallContext::background(), &Dsid::new("subj-1"), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, PrivateError::ExportError(m) if m == "denied"));
    }

    #[tokio::test]
    async fn test_profile_lookup_errors() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.respond(ENDPOINT_PROFILE_TO_DSID, Response::error("bad profile"));
        executor.respond(ENDPOINT_PROFILE_TO_DSID, Response::from_value("").unwrap());
        let client = PrivateClient::new(executor);
        let ctx = CallContext::background();
        let profile = json!({"email": "x@example.com"});

        assert!(matches!(
            client.profile_to_dsid(&ctx, &profile, vec![]).await,
            Err(PrivateError::LookupError(m)) if m == "bad profile"
        ));
        assert!(matches!(
            client.profile_to_dsid(&ctx, &profile, vec![]).await,
            Err(PrivateError::LookupError(_))
        ));
    }

    #[tokio::test]
    async fn test_subject_lifecycle() {
        let client = PrivateClient::new(Arc::new(MemoryExecutor::new()));
        let ctx = CallContext::background();
        let message = json!({"user": {"email": "bob@example.com", "phone": "555-0100"}});
        let transforms = [Transform::new("user").profile_path("email").private_path("phone")];

        let encoded = client.encode(&ctx, &message, &transforms, vec![]).await.unwrap();
        let dsid = client
            .profile_to_dsid(&ctx, &json!({"email": "bob@example.com"}), vec![])
            .await
            .unwrap();

        let exported = client.export(&ctx, &dsid, vec![]).await.unwrap();
        assert_eq!(exported.get("user.phone"), Some(&json!("555-0100")));

        client.purge(&ctx, &dsid, vec![]).await.unwrap();
        assert!(client.export(&ctx, &dsid, vec![]).await.unwrap().is_empty());

        let decoded: serde_json::Value = client.decode(&ctx, Some(&encoded), vec![]).await.unwrap();
        assert_eq!(decoded, json!({"user": {"email": "bob@example.com"}}));
    }
}
