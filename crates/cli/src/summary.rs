//! One JSON line per element read.

use serde::Serialize;
use transfer::{Component, DataType, ElementResult};

#[derive(Debug, Serialize)]
pub struct ElementSummary {
    index: u64,
    components: Vec<ComponentSummary>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ComponentSummary {
    Compressed {
        bytes: usize,
    },
    Tensor {
        dtype: DataType,
        shape: Vec<u64>,
        bytes: usize,
    },
}

impl ElementSummary {
    pub fn new(index: u64, result: &ElementResult) -> Self {
        let components = result
            .components
            .iter()
            .map(|component| match component {
                Component::Compressed(element) => ComponentSummary::Compressed {
                    bytes: element.len(),
                },
                Component::Tensor(tensor) => ComponentSummary::Tensor {
                    dtype: tensor.dtype(),
                    shape: tensor.shape().to_vec(),
                    bytes: tensor.data().len(),
                },
            })
            .collect();
        Self { index, components }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transfer::{CompressedElement, Tensor};

    #[test]
    fn summarises_each_component() {
        let result = ElementResult {
            components: vec![
                Component::Compressed(CompressedElement::new(vec![0u8; 12])),
                Component::Tensor(Tensor::new(DataType::Float32, vec![2], vec![0u8; 8]).unwrap()),
            ],
            ..ElementResult::default()
        };

        let json = serde_json::to_value(ElementSummary::new(3, &result)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "index": 3,
                "components": [
                    {"kind": "compressed", "bytes": 12},
                    {"kind": "tensor", "dtype": "float32", "shape": [2], "bytes": 8},
                ]
            })
        );
    }
}
