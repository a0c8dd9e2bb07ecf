//! Building gNMI requests and interpreting their replies.

use tonic::metadata::AsciiMetadataValue;
use tonic::{Code, Request, Status};

use telecfg_apply::{ApplyError, ConnectionCause, ConnectionError, DeviceTarget, Payload};

use crate::config::ApplyMode;
use crate::gnmi::{
    CapabilityResponse, Encoding, Operation, Path, SetRequest, SetResponse, TypedValue, Update,
    typed_value,
};

/// Username and password sent as gRPC metadata on every request.
#[derive(Clone)]
pub struct Credentials {
    username: AsciiMetadataValue,
    password: AsciiMetadataValue,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    /// Credentials from the endpoint userinfo, if any.
    pub fn from_target(target: &DeviceTarget) -> Result<Option<Self>, ConnectionError> {
        let Some(username) = target.username() else {
            return Ok(None);
        };
        let password = target.password().unwrap_or_default();

        let invalid = |_| {
            ConnectionError::authentication(
                "credentials contain characters not allowed in gRPC metadata",
            )
        };
        Ok(Some(Self {
            username: username.parse().map_err(invalid)?,
            password: password.parse().map_err(invalid)?,
        }))
    }
}

/// Wrap a message in a request carrying the credentials.
pub fn authorize<T>(message: T, credentials: Option<&Credentials>) -> Request<T> {
    let mut request = Request::new(message);
    if let Some(creds) = credentials {
        request
            .metadata_mut()
            .insert("username", creds.username.clone());
        request
            .metadata_mut()
            .insert("password", creds.password.clone());
    }
    request
}

impl ApplyMode {
    pub fn operation(&self) -> Operation {
        match self {
            ApplyMode::Update => Operation::Update,
            ApplyMode::Replace => Operation::Replace,
        }
    }
}

/// A Set request writing the payload at the root path.
///
/// The payload is a complete module-qualified document, so the target path
/// is the data tree root.
pub fn set_request(payload: &Payload, mode: ApplyMode, origin: &str) -> SetRequest {
    let update = Update {
        path: Some(Path {
            origin: origin.to_string(),
            elem: Vec::new(),
            target: String::new(),
        }),
        val: Some(TypedValue {
            value: Some(typed_value::Value::JsonIetfVal(payload.as_bytes().to_vec())),
        }),
        duplicates: 0,
    };

    match mode {
        ApplyMode::Update => SetRequest {
            update: vec![update],
            ..Default::default()
        },
        ApplyMode::Replace => SetRequest {
            replace: vec![update],
            ..Default::default()
        },
    }
}

/// Check that the device can take a JSON_IETF Set.
pub fn negotiate(capabilities: &CapabilityResponse) -> Result<(), ConnectionError> {
    if capabilities
        .supported_encodings()
        .any(|encoding| encoding == Encoding::JsonIetf)
    {
        Ok(())
    } else {
        let offered: Vec<String> = capabilities
            .supported_encodings()
            .map(|encoding| format!("{:?}", encoding))
            .collect();
        Err(ConnectionError::negotiation(format!(
            "device does not support JSON_IETF encoding (offers: {})",
            if offered.is_empty() {
                "none".to_string()
            } else {
                offered.join(", ")
            }
        )))
    }
}

/// Map a failed Capabilities call to a session failure.
pub fn capabilities_failure(status: &Status) -> ConnectionError {
    let message = status.message();
    match status.code() {
        Code::Unauthenticated | Code::PermissionDenied => {
            ConnectionError::authentication(message)
        }
        Code::Unavailable => ConnectionError::unreachable(message),
        Code::DeadlineExceeded => ConnectionError::new(ConnectionCause::Timeout, message),
        code => ConnectionError::negotiation(format!("Capabilities failed ({:?}): {}", code, message)),
    }
}

/// Map a failed Set call to an apply failure.
pub fn set_failure(status: &Status) -> ApplyError {
    match status.code() {
        Code::Unavailable | Code::Cancelled | Code::DeadlineExceeded => ApplyError::Transport(
            format!("{:?}: {}", status.code(), status.message()),
        ),
        code => ApplyError::rejected(format!("{:?}", code), status.message()),
    }
}

/// Check that a Set reply acknowledges the operation we sent.
pub fn check_set_response(response: &SetResponse, mode: ApplyMode) -> Result<(), ApplyError> {
    if let Some(error) = response.message.as_ref().filter(|e| e.code != 0) {
        return Err(ApplyError::rejected(
            format!("code {}", error.code),
            error.message.clone(),
        ));
    }

    if response.response.is_empty() {
        return Err(ApplyError::Malformed(
            "SetResponse carries no update result".to_string(),
        ));
    }

    let expected = mode.operation();
    for result in &response.response {
        if let Some(error) = result.message.as_ref().filter(|e| e.code != 0) {
            return Err(ApplyError::rejected(
                format!("code {}", error.code),
                error.message.clone(),
            ));
        }
        if result.op() != expected {
            return Err(ApplyError::Malformed(format!(
                "expected {:?} result, got {:?}",
                expected,
                result.op()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnmi::{Error, UpdateResult};
    use telecfg_model::{TreeBuilder, encode};

    fn payload() -> Payload {
        let tree = TreeBuilder::new()
            .sensor_group("SGROUP1", ["openconfig-interfaces:interfaces"])
            .subscription(100, "SGROUP1", 10_000)
            .build()
            .unwrap();
        encode(&tree).unwrap()
    }

    fn ack(op: Operation) -> SetResponse {
        SetResponse {
            response: vec![UpdateResult {
                path: Some(Path::default()),
                message: None,
                op: op as i32,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_update_request_carries_payload_at_root() {
        let payload = payload();
        let request = set_request(&payload, ApplyMode::Update, "");

        assert!(request.replace.is_empty());
        assert!(request.delete.is_empty());
        let update = &request.update[0];
        assert!(update.path.as_ref().unwrap().elem.is_empty());
        match update.val.as_ref().and_then(|v| v.value.as_ref()) {
            Some(typed_value::Value::JsonIetfVal(bytes)) => {
                assert_eq!(bytes.as_slice(), payload.as_bytes())
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_replace_request_with_origin() {
        let request = set_request(&payload(), ApplyMode::Replace, "openconfig");
        assert!(request.update.is_empty());
        assert_eq!(request.replace[0].path.as_ref().unwrap().origin, "openconfig");
    }

    #[test]
    fn test_credentials_from_target() {
        let target = DeviceTarget::parse("grpc://admin:s3cret@r1:57400").unwrap();
        let creds = Credentials::from_target(&target).unwrap().unwrap();
        let request = authorize((), Some(&creds));
        assert_eq!(request.metadata().get("username").unwrap(), "admin");
        assert_eq!(request.metadata().get("password").unwrap(), "s3cret");
        assert!(!format!("{:?}", creds).contains("s3cret"));

        let anonymous = DeviceTarget::parse("grpc://r1").unwrap();
        assert!(Credentials::from_target(&anonymous).unwrap().is_none());
        assert!(authorize((), None).metadata().is_empty());
    }

    #[test]
    fn test_non_ascii_credentials_rejected() {
        let target = DeviceTarget::parse("grpc://admin:pässword@r1").unwrap();
        let err = Credentials::from_target(&target).unwrap_err();
        assert_eq!(err.cause, ConnectionCause::Authentication);
    }

    #[test]
    fn test_negotiation_requires_json_ietf() {
        let mut caps = CapabilityResponse {
            supported_encodings: vec![Encoding::Json as i32, Encoding::Proto as i32],
            ..Default::default()
        };
        let err = negotiate(&caps).unwrap_err();
        assert_eq!(err.cause, ConnectionCause::Negotiation);
        assert!(err.message.contains("Json, Proto"));

        caps.supported_encodings.push(Encoding::JsonIetf as i32);
        assert!(negotiate(&caps).is_ok());
    }

    #[test]
    fn test_capabilities_failures() {
        let err = capabilities_failure(&Status::unauthenticated("bad password"));
        assert_eq!(err.cause, ConnectionCause::Authentication);
        let err = capabilities_failure(&Status::unavailable("connection reset"));
        assert_eq!(err.cause, ConnectionCause::Unreachable);
        let err = capabilities_failure(&Status::unimplemented("no gNMI here"));
        assert_eq!(err.cause, ConnectionCause::Negotiation);
    }

    #[test]
    fn test_set_failures() {
        let err = set_failure(&Status::invalid_argument("unknown element sensor-groupz"));
        assert_eq!(
            err,
            ApplyError::rejected("InvalidArgument", "unknown element sensor-groupz")
        );
        assert!(matches!(
            set_failure(&Status::unavailable("stream reset")),
            ApplyError::Transport(_)
        ));
    }

    #[test]
    fn test_check_set_response() {
        assert!(check_set_response(&ack(Operation::Update), ApplyMode::Update).is_ok());
        assert!(check_set_response(&ack(Operation::Replace), ApplyMode::Replace).is_ok());

        assert!(matches!(
            check_set_response(&ack(Operation::Delete), ApplyMode::Update),
            Err(ApplyError::Malformed(_))
        ));
        assert!(matches!(
            check_set_response(&SetResponse::default(), ApplyMode::Update),
            Err(ApplyError::Malformed(_))
        ));

        let mut legacy = ack(Operation::Update);
        legacy.message = Some(Error {
            code: 3,
            message: "commit failed".to_string(),
        });
        assert_eq!(
            check_set_response(&legacy, ApplyMode::Update),
            Err(ApplyError::rejected("code 3", "commit failed"))
        );
    }
}
