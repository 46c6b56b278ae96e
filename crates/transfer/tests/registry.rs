//! Transfer registry tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use transfer::{
    DataTransferClient, ElementRequest, ElementResult, ProtocolName, TaskId, TransferConfig,
    TransferError, TransferProtocol, TransferRegistry, WorkerAddress,
};

struct EndOfSequenceClient;

#[async_trait]
impl DataTransferClient for EndOfSequenceClient {
    async fn get_element(&self, _request: &ElementRequest) -> Result<ElementResult, TransferError> {
        Ok(ElementResult::end_of_sequence())
    }

    fn try_cancel(&self) {}
}

fn config() -> TransferConfig {
    TransferConfig {
        protocol: ProtocolName::new("grpc").unwrap(),
        address: WorkerAddress::new("localhost:5051").unwrap(),
        max_bandwidth: None,
    }
}

fn protocol(name: &str) -> TransferProtocol {
    TransferProtocol::new(name).unwrap()
}

#[tokio::test]
async fn build_invokes_registered_factory() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = TransferRegistry::new();
    let counter = calls.clone();
    registry
        .register(protocol("fake"), move |_config| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(EndOfSequenceClient) as Arc<dyn DataTransferClient>)
        })
        .unwrap();

    let client = registry.build(&protocol("fake"), &config()).unwrap();
    let result = client.get_element(&ElementRequest::new(TaskId::new(1))).await.unwrap();

    assert!(result.end_of_sequence);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn build_unknown_protocol_lists_available() {
    let mut registry = TransferRegistry::new();
    registry
        .register(protocol("fake"), |_config| {
            Ok(Arc::new(EndOfSequenceClient) as Arc<dyn DataTransferClient>)
        })
        .unwrap();

    match registry.build(&protocol("carrier-pigeon"), &config()) {
        Err(TransferError::ProtocolNotFound { protocol, available }) => {
            assert_eq!(protocol.as_str(), "carrier-pigeon");
            assert_eq!(available, vec!["fake".to_string()]);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unknown protocol must not build"),
    }
}

#[test]
fn duplicate_registration_keeps_first_factory() {
    let mut registry = TransferRegistry::new();
    registry
        .register(protocol("fake"), |_config| {
            Ok(Arc::new(EndOfSequenceClient) as Arc<dyn DataTransferClient>)
        })
        .unwrap();

    let second = registry.register(protocol("fake"), |_config| {
        Err(TransferError::internal("second factory must never run"))
    });

    assert!(matches!(second, Err(TransferError::DuplicateProtocol { .. })));
    assert!(registry.build(&protocol("fake"), &config()).is_ok());
}

#[test]
fn factory_errors_propagate_unchanged() {
    let mut registry = TransferRegistry::new();
    registry
        .register(protocol("broken"), |config| {
            Err(TransferError::Credentials {
                protocol: config.protocol.to_string(),
                message: "no credentials".into(),
            })
        })
        .unwrap();

    let err = registry.build(&protocol("broken"), &config()).err().unwrap();
    assert!(matches!(err, TransferError::Credentials { ref protocol, .. } if protocol == "grpc"));
}

#[test]
fn protocols_are_sorted() {
    let mut registry = TransferRegistry::new();
    for name in ["local", "grpc", "fake"] {
        registry
            .register(protocol(name), |_config| {
                Ok(Arc::new(EndOfSequenceClient) as Arc<dyn DataTransferClient>)
            })
            .unwrap();
    }

    let names: Vec<_> = registry.protocols().iter().map(|p| p.to_string()).collect();
    assert_eq!(names, ["fake", "grpc", "local"]);
    assert!(registry.contains(&TransferProtocol::grpc()));
}
