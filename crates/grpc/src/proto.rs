//! Wire messages for the worker's `GetElement` call.
//!
//! Hand-written prost messages mirroring the worker service definition; only
//! the fields this client reads or writes are declared. Unknown fields sent by
//! newer workers are skipped by the decoder.
//!
//! A compressed element is declared as raw bytes rather than as a message:
//! the worker's encoding is kept whole, metadata and version included, so a
//! decompressor downstream sees exactly what the worker sent.

use bytes::Bytes;
use transfer::{
    Component, CompressedElement, DataType, ElementRequest, ElementResult, Tensor, TransferError,
};

/// Fully-qualified method path of the element-serving call.
pub const GET_ELEMENT_PATH: &str = "/tensorflow.data.WorkerService/GetElement";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetElementRequest {
    #[prost(int64, tag = "1")]
    pub task_id: i64,
    #[prost(int64, optional, tag = "2")]
    pub consumer_index: Option<i64>,
    #[prost(int64, optional, tag = "3")]
    pub round_index: Option<i64>,
    #[prost(bool, tag = "4")]
    pub allow_skip: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetElementResponse {
    #[prost(bool, tag = "2")]
    pub end_of_sequence: bool,
    #[prost(bool, tag = "4")]
    pub skip_task: bool,
    #[prost(oneof = "get_element_response::Element", tags = "3, 5")]
    pub element: Option<get_element_response::Element>,
}

pub mod get_element_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Element {
        /// Encoded `CompressedElement` message, kept verbatim.
        #[prost(bytes = "bytes", tag = "3")]
        Compressed(::bytes::Bytes),
        #[prost(message, tag = "5")]
        Uncompressed(super::UncompressedElement),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UncompressedElement {
    #[prost(message, repeated, tag = "1")]
    pub components: Vec<TensorProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TensorProto {
    #[prost(int32, tag = "1")]
    pub dtype: i32,
    #[prost(message, optional, tag = "2")]
    pub tensor_shape: Option<TensorShapeProto>,
    #[prost(bytes = "bytes", tag = "4")]
    pub tensor_content: Bytes,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TensorShapeProto {
    #[prost(message, repeated, tag = "2")]
    pub dim: Vec<tensor_shape_proto::Dim>,
    #[prost(bool, tag = "3")]
    pub unknown_rank: bool,
}

pub mod tensor_shape_proto {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Dim {
        #[prost(int64, tag = "1")]
        pub size: i64,
        #[prost(string, tag = "2")]
        pub name: String,
    }
}

// ---------------------------------------------------------------------------
// Dtype wire codes
// ---------------------------------------------------------------------------

fn dtype_from_wire(code: i32) -> Option<DataType> {
    Some(match code {
        1 => DataType::Float32,
        2 => DataType::Float64,
        3 => DataType::Int32,
        4 => DataType::UInt8,
        5 => DataType::Int16,
        6 => DataType::Int8,
        7 => DataType::String,
        9 => DataType::Int64,
        10 => DataType::Bool,
        14 => DataType::BFloat16,
        17 => DataType::UInt16,
        19 => DataType::Float16,
        22 => DataType::UInt32,
        23 => DataType::UInt64,
        _ => return None,
    })
}

fn dtype_to_wire(dtype: DataType) -> i32 {
    match dtype {
        DataType::Float32 => 1,
        DataType::Float64 => 2,
        DataType::Int32 => 3,
        DataType::UInt8 => 4,
        DataType::Int16 => 5,
        DataType::Int8 => 6,
        DataType::String => 7,
        DataType::Int64 => 9,
        DataType::Bool => 10,
        DataType::BFloat16 => 14,
        DataType::UInt16 => 17,
        DataType::Float16 => 19,
        DataType::UInt32 => 22,
        DataType::UInt64 => 23,
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<&ElementRequest> for GetElementRequest {
    fn from(request: &ElementRequest) -> Self {
        Self {
            task_id: request.task_id().as_i64(),
            consumer_index: request.consumer_index(),
            round_index: request.round_index(),
            allow_skip: request.allow_skip(),
        }
    }
}

impl TensorProto {
    /// Decodes into a [`Tensor`]; `None` for unknown dtypes, unknown rank,
    /// negative dimensions, or content that does not match the shape.
    ///
    /// An absent shape is a scalar.
    pub fn to_tensor(&self) -> Option<Tensor> {
        let dtype = dtype_from_wire(self.dtype)?;
        let shape = match &self.tensor_shape {
            Some(shape) if shape.unknown_rank => return None,
            Some(shape) => shape
                .dim
                .iter()
                .map(|dim| u64::try_from(dim.size).ok())
                .collect::<Option<Vec<_>>>()?,
            None => Vec::new(),
        };
        Tensor::new(dtype, shape, self.tensor_content.clone())
    }
}

impl TryFrom<&Tensor> for TensorProto {
    type Error = TransferError;

    fn try_from(tensor: &Tensor) -> Result<Self, Self::Error> {
        let dim = tensor
            .shape()
            .iter()
            .map(|size| {
                let size = i64::try_from(*size).map_err(|_| {
                    TransferError::internal(format!("tensor dimension {size} does not fit the wire format"))
                })?;
                Ok(tensor_shape_proto::Dim {
                    size,
                    name: String::new(),
                })
            })
            .collect::<Result<Vec<_>, TransferError>>()?;
        Ok(Self {
            dtype: dtype_to_wire(tensor.dtype()),
            tensor_shape: Some(TensorShapeProto {
                dim,
                unknown_rank: false,
            }),
            tensor_content: tensor.data().clone(),
        })
    }
}

impl TryFrom<GetElementResponse> for ElementResult {
    type Error = TransferError;

    fn try_from(response: GetElementResponse) -> Result<Self, Self::Error> {
        use get_element_response::Element;

        let components = match response.element {
            Some(Element::Compressed(encoded)) => {
                vec![Component::Compressed(CompressedElement::new(encoded))]
            }
            Some(Element::Uncompressed(uncompressed)) => uncompressed
                .components
                .iter()
                .enumerate()
                .map(|(index, proto)| {
                    proto.to_tensor().map(Component::Tensor).ok_or_else(|| {
                        TransferError::internal(format!(
                            "failed to parse tensor for component {index}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(ElementResult {
            end_of_sequence: response.end_of_sequence,
            skip: response.skip_task,
            components,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn every_dtype_has_a_wire_code() {
        for dtype in [
            DataType::Bool,
            DataType::Int8,
            DataType::Int16,
            DataType::Int32,
            DataType::Int64,
            DataType::UInt8,
            DataType::UInt16,
            DataType::UInt32,
            DataType::UInt64,
            DataType::Float16,
            DataType::BFloat16,
            DataType::Float32,
            DataType::Float64,
            DataType::String,
        ] {
            assert_eq!(dtype_from_wire(dtype_to_wire(dtype)), Some(dtype));
        }
    }

    fn shape(sizes: &[i64]) -> Option<TensorShapeProto> {
        Some(TensorShapeProto {
            dim: sizes
                .iter()
                .map(|&size| tensor_shape_proto::Dim {
                    size,
                    name: String::new(),
                })
                .collect(),
            unknown_rank: false,
        })
    }

    #[test]
    fn negative_dimension_does_not_decode() {
        let proto = TensorProto {
            dtype: 3,
            tensor_shape: shape(&[-1]),
            tensor_content: Bytes::new(),
        };
        assert!(proto.to_tensor().is_none());
    }

    #[test]
    fn unknown_dtype_does_not_decode() {
        let proto = TensorProto {
            dtype: 999,
            tensor_shape: shape(&[]),
            tensor_content: Bytes::from_static(&[0; 4]),
        };
        assert!(proto.to_tensor().is_none());
    }

    #[test]
    fn unknown_rank_does_not_decode() {
        let proto = TensorProto {
            dtype: 3,
            tensor_shape: Some(TensorShapeProto {
                dim: Vec::new(),
                unknown_rank: true,
            }),
            tensor_content: Bytes::from_static(&[0; 4]),
        };
        assert!(proto.to_tensor().is_none());
    }

    #[test]
    fn missing_shape_is_a_scalar() {
        let proto = TensorProto {
            dtype: 3,
            tensor_shape: None,
            tensor_content: Bytes::from_static(&[7, 0, 0, 0]),
        };
        let tensor = proto.to_tensor().unwrap();
        assert!(tensor.shape().is_empty());
    }

    #[test]
    fn worker_encoded_uncompressed_element_decodes() {
        // uncompressed { components { dtype: DT_INT32, tensor_shape { dim { size: 2 } }, tensor_content: 8 bytes } }
        #[rustfmt::skip]
        let wire: &[u8] = &[
            0x2a, 0x14,                         // GetElementResponse.uncompressed
            0x0a, 0x12,                         // UncompressedElement.components
            0x08, 0x03,                         // TensorProto.dtype
            0x12, 0x04,                         // TensorProto.tensor_shape
            0x12, 0x02,                         // TensorShapeProto.dim
            0x08, 0x02,                         // Dim.size
            0x22, 0x08,                         // TensorProto.tensor_content
            1, 0, 0, 0, 2, 0, 0, 0,
        ];
        let response = GetElementResponse::decode(wire).unwrap();
        let result = ElementResult::try_from(response).unwrap();

        let expected = Tensor::new(DataType::Int32, vec![2], vec![1, 0, 0, 0, 2, 0, 0, 0]).unwrap();
        assert_eq!(result.components, vec![Component::Tensor(expected)]);
    }

    #[test]
    fn worker_encoded_compressed_element_is_kept_whole() {
        // data: "packed", component_metadata { dtype: DT_INT32 }, version: 1
        #[rustfmt::skip]
        let compressed: &[u8] = &[
            0x0a, 0x06, b'p', b'a', b'c', b'k', b'e', b'd',
            0x12, 0x02, 0x08, 0x03,
            0x18, 0x01,
        ];
        let mut wire = vec![0x1a, compressed.len() as u8];
        wire.extend_from_slice(compressed);

        let response = GetElementResponse::decode(wire.as_slice()).unwrap();
        let result = ElementResult::try_from(response).unwrap();

        match result.components.as_slice() {
            [Component::Compressed(element)] => assert_eq!(element.data().as_ref(), compressed),
            other => panic!("unexpected components: {other:?}"),
        }
    }

    #[test]
    fn tensor_encodes_shape_as_dims() {
        let tensor = Tensor::new(DataType::Int32, vec![1, 2], vec![0u8; 8]).unwrap();
        let proto = TensorProto::try_from(&tensor).unwrap();

        let sizes: Vec<i64> = proto.tensor_shape.as_ref().unwrap().dim.iter().map(|d| d.size).collect();
        assert_eq!(sizes, vec![1, 2]);
        assert_eq!(proto.to_tensor(), Some(tensor));
    }

    #[test]
    fn request_fields_are_carried_over() {
        let request = ElementRequest::new(transfer::TaskId::new(42))
            .with_round_index(7)
            .with_allow_skip(true);
        let wire = GetElementRequest::from(&request);
        assert_eq!(wire.task_id, 42);
        assert_eq!(wire.consumer_index, None);
        assert_eq!(wire.round_index, Some(7));
        assert!(wire.allow_skip);
    }
}
