//! Opaque model parameter blobs and their safetensors checkpoint format

use std::collections::BTreeMap;
use std::path::Path;

use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};
use tracing::debug;

use crate::error::{Error, Result};
use crate::utils::io::write_file_atomic;

/// One named parameter array
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTensor {
    /// Dimensions, row-major
    pub shape: Vec<usize>,
    /// Flattened values
    pub data: Vec<f32>,
}

impl ParamTensor {
    /// Wrap flattened data, checking it fills `shape`
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::invalid_input(format!(
                "parameter of shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }
}

/// Full parameter set of a model, keyed by parameter name.
///
/// The trainer treats this as opaque; only the owning model interprets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelParams {
    tensors: BTreeMap<String, ParamTensor>,
}

impl ModelParams {
    /// Empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a named parameter
    pub fn insert(&mut self, name: impl Into<String>, tensor: ParamTensor) {
        self.tensors.insert(name.into(), tensor);
    }

    /// Look up a named parameter
    pub fn get(&self, name: &str) -> Option<&ParamTensor> {
        self.tensors.get(name)
    }

    /// Iterate parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamTensor)> {
        self.tensors.iter()
    }

    /// Number of named parameters
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// True when no parameters are held
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Total scalar count
    pub fn num_values(&self) -> usize {
        self.tensors.values().map(|t| t.data.len()).sum()
    }

    /// Encode as safetensors bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let raw: Vec<(&String, &ParamTensor, Vec<u8>)> = self
            .tensors
            .iter()
            .map(|(name, tensor)| {
                let bytes = tensor.data.iter().flat_map(|v| v.to_le_bytes()).collect();
                (name, tensor, bytes)
            })
            .collect();

        let mut views = Vec::with_capacity(raw.len());
        for (name, tensor, bytes) in &raw {
            let view = TensorView::new(Dtype::F32, tensor.shape.clone(), bytes)?;
            views.push((name.as_str(), view));
        }

        Ok(safetensors::serialize(views, &None)?)
    }

    /// Decode safetensors bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let st = SafeTensors::deserialize(bytes)?;
        let mut params = Self::new();
        for (name, view) in st.tensors() {
            if view.dtype() != Dtype::F32 {
                return Err(Error::invalid_input(format!(
                    "parameter '{}' has dtype {:?}, expected F32",
                    name,
                    view.dtype()
                )));
            }
            let data = view
                .data()
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            params.insert(name, ParamTensor::new(view.shape().to_vec(), data)?);
        }
        Ok(params)
    }

    /// Write a checkpoint, replacing any existing file atomically
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        write_file_atomic(path, &self.to_bytes()?)?;
        debug!("Saved {} parameter arrays to {:?}", self.len(), path);
        Ok(())
    }

    /// Read a checkpoint
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let params = Self::from_bytes(&bytes)?;
        debug!("Loaded {} parameter arrays from {:?}", params.len(), path);
        Ok(params)
    }
}
