//! 错误类型测试

use flare_registry_sync::error::{
    AggregateError, ApplyError, ProviderError, SyncError, ValidationError,
};

#[test]
fn test_empty_aggregate() {
    let errors = AggregateError::new();
    assert!(!errors.has_errors());
    assert!(errors.is_empty());
    assert_eq!(errors.to_string(), "");
    assert!(errors.into_result().is_ok());
}

#[test]
fn test_aggregate_renders_in_insertion_order() {
    let mut errors = AggregateError::new();
    errors.add("first");
    errors.add(ProviderError::backend("second"));
    errors.add(ValidationError::MissingName);

    assert!(errors.has_errors());
    assert_eq!(errors.len(), 3);
    assert_eq!(
        errors.to_string(),
        "first; second; field \"name\" is required"
    );

    let messages: Vec<String> = errors.errors().map(|e| e.to_string()).collect();
    assert_eq!(messages, vec!["first", "second", "field \"name\" is required"]);
    assert!(errors.into_result().is_err());
}

#[test]
fn test_aggregate_from_iterator() {
    let errors: AggregateError = vec!["a", "b"].into_iter().collect();
    assert_eq!(errors.to_string(), "a; b");

    let mut errors = errors;
    errors.extend(["c"]);
    assert_eq!(errors.len(), 3);
}

#[test]
fn test_apply_error_messages() {
    let deregister = ApplyError::Deregister {
        identity: "svc-a".to_string(),
        source: ProviderError::backend("timeout"),
    };
    assert_eq!(
        deregister.to_string(),
        "failed to deregister service \"svc-a\" from registry: timeout"
    );

    let register = ApplyError::Register {
        identity: "svc-b".to_string(),
        source: ProviderError::Validation(ValidationError::MissingAddress),
    };
    assert_eq!(register.identity(), "svc-b");
    assert_eq!(
        register.to_string(),
        "failed to register service \"svc-b\" in registry: \
         service has validation error before registration: field \"address\" is required"
    );
}

#[test]
fn test_sync_error_cancellation() {
    assert!(SyncError::Cancelled.is_cancelled());
    assert!(SyncError::SourceFetch(ProviderError::Cancelled).is_cancelled());
    assert!(!SyncError::RegistryFetch(ProviderError::backend("boom")).is_cancelled());
    assert!(!SyncError::Register(AggregateError::new()).is_cancelled());
}

#[test]
fn test_provider_error_not_found() {
    let err = ProviderError::Status {
        url: "http://127.0.0.1:8500/v1/agent/service/deregister/svc-a".to_string(),
        status: 404,
        body: String::new(),
    };
    assert!(err.is_not_found());
    assert!(!ProviderError::backend("boom").is_not_found());
}
