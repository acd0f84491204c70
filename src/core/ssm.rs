//! AWS SSM Parameter Store backend.
//!
//! The SDK is async; the storage engine is not. `SsmStore` owns a small
//! tokio runtime and drives each request to completion on it, so the
//! rest of the crate stays free of async plumbing. Transient throttling
//! is handled below this layer by the SDK's adaptive retry mode.

use crate::core::store::{ParameterStore, StoreError};
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_ssm::error::{DisplayErrorContext, SdkError};
use aws_sdk_ssm::types::ParameterType;
use std::collections::HashMap;
use tracing::debug;

const MAX_RETRY_ATTEMPTS: u32 = 20;

pub struct SsmStore {
    client: aws_sdk_ssm::Client,
    runtime: tokio::runtime::Runtime,
}

impl SsmStore {
    /// Load AWS configuration (optionally from a named shared-config
    /// profile) and build a client with adaptive retries.
    pub fn connect(profile: Option<&str>) -> Result<Self, StoreError> {
        // multi-thread runtime: vault workers issue blocking requests
        // from several OS threads at once
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|err| StoreError::Backend(format!("start client runtime: {err}")))?;

        let client = runtime.block_on(async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest())
                .retry_config(RetryConfig::adaptive().with_max_attempts(MAX_RETRY_ATTEMPTS));
            if let Some(profile) = profile {
                loader = loader.profile_name(profile);
            }
            let config = loader.load().await;
            aws_sdk_ssm::Client::new(&config)
        });

        Ok(Self { client, runtime })
    }
}

impl ParameterStore for SsmStore {
    fn get(&self, key: &str) -> Result<String, StoreError> {
        debug!(%key, "ssm get parameter");
        self.runtime.block_on(async {
            let output = self
                .client
                .get_parameter()
                .name(key)
                .with_decryption(true)
                .send()
                .await
                .map_err(|err| not_found_or_backend(key, err, "get parameter"))?;
            output
                .parameter
                .and_then(|p| p.value)
                .ok_or_else(|| StoreError::Backend(format!("parameter {key} has no value")))
        })
    }

    fn put(&self, key: &str, value: &str, encryption_key: Option<&str>) -> Result<(), StoreError> {
        debug!(%key, "ssm put parameter");
        self.runtime.block_on(async {
            let mut request = self
                .client
                .put_parameter()
                .name(key)
                .value(value)
                .r#type(ParameterType::SecureString)
                .overwrite(true);
            if let Some(key_id) = encryption_key {
                request = request.key_id(key_id);
            }
            request.send().await.map(|_| ()).map_err(|err| {
                StoreError::Backend(format!(
                    "put parameter {key}: {}",
                    DisplayErrorContext(err)
                ))
            })
        })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        debug!(%key, "ssm delete parameter");
        self.runtime.block_on(async {
            self.client
                .delete_parameter()
                .name(key)
                .send()
                .await
                .map(|_| ())
                .map_err(|err| not_found_or_backend(key, err, "delete parameter"))
        })
    }

    fn list_by_prefix(&self, prefix: &str) -> Result<HashMap<String, String>, StoreError> {
        debug!(%prefix, "ssm list parameters by path");
        self.runtime.block_on(async {
            let mut parameters = HashMap::new();
            let mut pages = self
                .client
                .get_parameters_by_path()
                .path(prefix)
                .recursive(true)
                .into_paginator()
                .send();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|err| {
                    StoreError::Backend(format!(
                        "list parameters under {prefix}: {}",
                        DisplayErrorContext(err)
                    ))
                })?;
                for parameter in page.parameters() {
                    if let (Some(name), Some(value)) = (parameter.name(), parameter.value()) {
                        parameters.insert(name.to_string(), value.to_string());
                    }
                }
            }
            Ok(parameters)
        })
    }
}

/// Map an SDK error, folding the service-level "parameter not found"
/// case into [`StoreError::NotFound`].
fn not_found_or_backend<E>(key: &str, err: SdkError<E>, action: &str) -> StoreError
where
    E: ProvideNotFound + std::error::Error + Send + Sync + 'static,
{
    match err.as_service_error() {
        Some(service_err) if service_err.is_not_found() => StoreError::NotFound(key.to_string()),
        _ => StoreError::Backend(format!("{action} {key}: {}", DisplayErrorContext(err))),
    }
}

/// The SDK generates a distinct error type per operation; this unifies
/// the ones that can signal an absent parameter.
trait ProvideNotFound {
    fn is_not_found(&self) -> bool;
}

impl ProvideNotFound for aws_sdk_ssm::operation::get_parameter::GetParameterError {
    fn is_not_found(&self) -> bool {
        self.is_parameter_not_found()
    }
}

impl ProvideNotFound for aws_sdk_ssm::operation::delete_parameter::DeleteParameterError {
    fn is_not_found(&self) -> bool {
        self.is_parameter_not_found()
    }
}
