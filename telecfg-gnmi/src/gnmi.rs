//! gNMI messages and client for the `Capabilities` and `Set` RPCs.
//!
//! Only the fields this tool reads or writes are declared. Field numbers
//! follow `gnmi.proto` (gNMI 0.10), so unknown fields sent by newer devices
//! are skipped by the decoder.

use std::collections::HashMap;

use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

/// Data path, `origin:/elem[key=value]/...`. An empty `elem` list is the root.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Path {
    #[prost(string, tag = "2")]
    pub origin: String,
    #[prost(message, repeated, tag = "3")]
    pub elem: Vec<PathElem>,
    #[prost(string, tag = "4")]
    pub target: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PathElem {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(map = "string, string", tag = "2")]
    pub key: HashMap<String, String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TypedValue {
    #[prost(oneof = "typed_value::Value", tags = "1, 4, 10, 11")]
    pub value: Option<typed_value::Value>,
}

pub mod typed_value {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Value {
        #[prost(string, tag = "1")]
        StringVal(String),
        #[prost(bool, tag = "4")]
        BoolVal(bool),
        #[prost(bytes, tag = "10")]
        JsonVal(Vec<u8>),
        #[prost(bytes, tag = "11")]
        JsonIetfVal(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Update {
    #[prost(message, optional, tag = "1")]
    pub path: Option<Path>,
    #[prost(message, optional, tag = "3")]
    pub val: Option<TypedValue>,
    #[prost(uint32, tag = "4")]
    pub duplicates: u32,
}

/// Deprecated in-band error, still sent by some devices.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Error {
    #[prost(uint32, tag = "1")]
    pub code: u32,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SetRequest {
    #[prost(message, optional, tag = "1")]
    pub prefix: Option<Path>,
    #[prost(message, repeated, tag = "2")]
    pub delete: Vec<Path>,
    #[prost(message, repeated, tag = "3")]
    pub replace: Vec<Update>,
    #[prost(message, repeated, tag = "4")]
    pub update: Vec<Update>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SetResponse {
    #[prost(message, optional, tag = "1")]
    pub prefix: Option<Path>,
    #[prost(message, repeated, tag = "2")]
    pub response: Vec<UpdateResult>,
    #[prost(message, optional, tag = "3")]
    pub message: Option<Error>,
    #[prost(int64, tag = "4")]
    pub timestamp: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateResult {
    #[prost(message, optional, tag = "2")]
    pub path: Option<Path>,
    #[prost(message, optional, tag = "3")]
    pub message: Option<Error>,
    #[prost(enumeration = "Operation", tag = "4")]
    pub op: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Operation {
    Invalid = 0,
    Delete = 1,
    Replace = 2,
    Update = 3,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CapabilityRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CapabilityResponse {
    #[prost(message, repeated, tag = "1")]
    pub supported_models: Vec<ModelData>,
    #[prost(enumeration = "Encoding", repeated, tag = "2")]
    pub supported_encodings: Vec<i32>,
    #[prost(string, tag = "3")]
    pub g_nmi_version: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ModelData {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub organization: String,
    #[prost(string, tag = "3")]
    pub version: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Encoding {
    Json = 0,
    Bytes = 1,
    Proto = 2,
    Ascii = 3,
    JsonIetf = 4,
}

/// Unary client for the `gnmi.gNMI` service.
#[derive(Debug, Clone)]
pub struct GnmiClient {
    inner: tonic::client::Grpc<Channel>,
}

impl GnmiClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn capabilities(
        &mut self,
        request: Request<CapabilityRequest>,
    ) -> Result<Response<CapabilityResponse>, Status> {
        self.unary(request, "/gnmi.gNMI/Capabilities").await
    }

    pub async fn set(&mut self, request: Request<SetRequest>) -> Result<Response<SetResponse>, Status> {
        self.unary(request, "/gnmi.gNMI/Set").await
    }

    async fn unary<M1, M2>(
        &mut self,
        request: Request<M1>,
        path: &'static str,
    ) -> Result<Response<M2>, Status>
    where
        M1: prost::Message + Send + Sync + 'static,
        M2: prost::Message + Default + Send + Sync + 'static,
    {
        self.inner
            .ready()
            .await
            .map_err(|e| Status::unavailable(format!("service was not ready: {}", e)))?;
        let codec = tonic::codec::ProstCodec::<M1, M2>::default();
        self.inner
            .unary(request, PathAndQuery::from_static(path), codec)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_json_ietf_value_uses_field_11() {
        let value = TypedValue {
            value: Some(typed_value::Value::JsonIetfVal(b"{}".to_vec())),
        };
        // tag 11, wire type 2 => (11 << 3) | 2 = 0x5a
        assert_eq!(value.encode_to_vec(), [0x5a, 0x02, b'{', b'}']);
    }

    #[test]
    fn test_set_response_decodes_update_result() {
        let response = SetResponse {
            prefix: None,
            response: vec![UpdateResult {
                path: Some(Path::default()),
                message: None,
                op: Operation::Update as i32,
            }],
            message: None,
            timestamp: 1_700_000_000_000_000_000,
        };
        let bytes = response.encode_to_vec();
        let decoded = SetResponse::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.response[0].op(), Operation::Update);
        assert_eq!(decoded.timestamp, 1_700_000_000_000_000_000);
    }

    #[test]
    fn test_capabilities_encoding_list() {
        let response = CapabilityResponse {
            supported_models: vec![ModelData {
                name: "openconfig-telemetry".to_string(),
                organization: "OpenConfig working group".to_string(),
                version: "0.5.1".to_string(),
            }],
            supported_encodings: vec![Encoding::Json as i32, Encoding::JsonIetf as i32],
            g_nmi_version: "0.8.0".to_string(),
        };
        let decoded = CapabilityResponse::decode(response.encode_to_vec().as_slice()).unwrap();
        let encodings: Vec<_> = decoded.supported_encodings().collect();
        assert_eq!(encodings, [Encoding::Json, Encoding::JsonIetf]);
    }
}
