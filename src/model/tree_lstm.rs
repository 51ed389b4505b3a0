//! N-ary Tree-LSTM sentiment classifier on candle
//!
//! Each node combines its optional word embedding with the hidden states of
//! up to `max_degree` ordered children. Only the root carries the training
//! signal; predictions are produced for every node.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor, Var};
use candle_nn::ops::{sigmoid, softmax_last_dim};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, SGD};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, info, instrument, warn};

use super::adadelta::{AdaDelta, ParamsAdaDelta};
use super::{ModelParams, ParamTensor, StepOutput, Tree, TreeModel, Vocabulary};
use crate::config::{ModelConfig, OptimizerType};
use crate::error::{Error, Result};
use crate::utils::math::glorot_std;

const EMBEDDING_STD: f32 = 0.1;

/// Trainable weights, named as they appear in checkpoints
struct Weights {
    embedding: Var,
    iou_x: Var,
    iou_h: Var,
    iou_bias: Var,
    forget_h: Var,
    forget_bias: Var,
    out: Var,
    out_bias: Var,
}

impl Weights {
    fn named(&self) -> [(&'static str, &Var); 8] {
        [
            ("embedding", &self.embedding),
            ("iou_x.weight", &self.iou_x),
            ("iou_h.weight", &self.iou_h),
            ("iou.bias", &self.iou_bias),
            ("forget_h.weight", &self.forget_h),
            ("forget.bias", &self.forget_bias),
            ("out.weight", &self.out),
            ("out.bias", &self.out_bias),
        ]
    }
}

enum UpdateRule {
    Sgd(SGD),
    AdamW(AdamW),
    AdaDelta(AdaDelta),
}

impl UpdateRule {
    fn backward_step(&mut self, loss: &Tensor) -> candle_core::Result<()> {
        match self {
            Self::Sgd(opt) => opt.backward_step(loss),
            Self::AdamW(opt) => opt.backward_step(loss),
            Self::AdaDelta(opt) => opt.backward_step(loss),
        }
    }
}

struct NodeState {
    h: Tensor,
    c: Tensor,
}

/// Tree-LSTM over binarized (or N-ary) parse trees
pub struct TreeLstm {
    config: ModelConfig,
    num_emb: usize,
    device: Device,
    weights: Weights,
    update: UpdateRule,
}

impl TreeLstm {
    /// Build a freshly initialized model for `num_emb` embedding rows.
    ///
    /// Initialization is fully determined by `config.seed`.
    pub fn new(num_emb: usize, config: &ModelConfig) -> Result<Self> {
        config.validate()?;
        if num_emb == 0 {
            return Err(Error::config("Model needs at least one embedding row"));
        }

        let device = Device::Cpu;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let (e, h, n, c) = (
            config.embedding_dim,
            config.hidden_dim,
            config.max_degree,
            config.output_dim,
        );

        let weights = Weights {
            embedding: normal_var(&mut rng, (num_emb, e), EMBEDDING_STD, &device)?,
            iou_x: normal_var(&mut rng, (e, 3 * h), glorot_std(e, 3 * h), &device)?,
            iou_h: normal_var(&mut rng, (n * h, 3 * h), glorot_std(n * h, 3 * h), &device)?,
            iou_bias: Var::zeros((1, 3 * h), DType::F32, &device)?,
            forget_h: normal_var(&mut rng, (n * h, n * h), glorot_std(n * h, n * h), &device)?,
            forget_bias: Var::zeros((1, n * h), DType::F32, &device)?,
            out: normal_var(&mut rng, (h, c), glorot_std(h, c), &device)?,
            out_bias: Var::zeros((1, c), DType::F32, &device)?,
        };

        let update = build_update_rule(config, &weights)?;

        debug!(
            "Initialized Tree-LSTM: {} embeddings, emb_dim={}, hidden_dim={}, degree={}",
            num_emb, e, h, n
        );

        Ok(Self {
            config: config.clone(),
            num_emb,
            device,
            weights,
            update,
        })
    }

    /// Build a model sized for `vocab` and load parameters from a checkpoint
    pub fn from_checkpoint(
        vocab: &Vocabulary,
        params_path: impl AsRef<Path>,
        config: &ModelConfig,
    ) -> Result<Self> {
        let mut model = Self::new(vocab.size(), config)?;
        model.load_params(params_path.as_ref())?;
        info!("Loaded model parameters from {:?}", params_path.as_ref());
        Ok(model)
    }

    /// Hyperparameters this model was built with
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Number of embedding rows
    pub fn num_embeddings(&self) -> usize {
        self.num_emb
    }

    fn check_tree(&self, tree: &Tree) -> Result<()> {
        for (index, node) in tree.nodes().iter().enumerate() {
            if node.children.len() > self.config.max_degree {
                return Err(Error::model(format!(
                    "node {} has {} children, model supports at most {}",
                    index,
                    node.children.len(),
                    self.config.max_degree
                )));
            }
            if let Some(word) = node.word {
                if word as usize >= self.num_emb {
                    return Err(Error::model(format!(
                        "node {} has word id {} outside the {} embeddings",
                        index, word, self.num_emb
                    )));
                }
            }
        }
        Ok(())
    }

    fn forward(&self, tree: &Tree) -> Result<Vec<NodeState>> {
        self.check_tree(tree)?;

        let h = self.config.hidden_dim;
        let w = &self.weights;
        let zero_h = Tensor::zeros((1, h), DType::F32, &self.device)?;
        let zero_iou = Tensor::zeros((1, 3 * h), DType::F32, &self.device)?;

        let mut states: Vec<NodeState> = Vec::with_capacity(tree.len());
        for node in tree.nodes() {
            let x_part = match node.word {
                Some(word) => {
                    let ids = Tensor::new(&[word], &self.device)?;
                    w.embedding
                        .as_tensor()
                        .index_select(&ids, 0)?
                        .matmul(w.iou_x.as_tensor())?
                }
                None => zero_iou.clone(),
            };

            let mut child_h: Vec<Tensor> = node.children.iter().map(|&c| states[c].h.clone()).collect();
            child_h.resize(self.config.max_degree, zero_h.clone());
            let h_cat = Tensor::cat(&child_h, 1)?;

            let iou = (x_part + h_cat.matmul(w.iou_h.as_tensor())?)?.broadcast_add(w.iou_bias.as_tensor())?;
            let i = sigmoid(&iou.narrow(1, 0, h)?)?;
            let o = sigmoid(&iou.narrow(1, h, h)?)?;
            let u = iou.narrow(1, 2 * h, h)?.tanh()?;

            let mut c = (i * u)?;
            if !node.children.is_empty() {
                let f = sigmoid(&h_cat.matmul(w.forget_h.as_tensor())?.broadcast_add(w.forget_bias.as_tensor())?)?;
                for (k, &child) in node.children.iter().enumerate() {
                    let f_k = f.narrow(1, k * h, h)?;
                    c = (c + (f_k * &states[child].c)?)?;
                }
            }

            let h_node = (o * c.tanh()?)?;
            states.push(NodeState { h: h_node, c });
        }

        Ok(states)
    }

    fn logits(&self, h: &Tensor) -> Result<Tensor> {
        Ok(h
            .matmul(self.weights.out.as_tensor())?
            .broadcast_add(self.weights.out_bias.as_tensor())?)
    }
}

impl TreeModel for TreeLstm {
    fn output_dim(&self) -> usize {
        self.config.output_dim
    }

    #[instrument(skip(self, vocab))]
    fn initialize_embeddings(&mut self, vocab: &Vocabulary, source: &Path) -> Result<()> {
        if vocab.size() != self.num_emb {
            return Err(Error::config(format!(
                "Vocabulary has {} tokens but the model was built for {}",
                vocab.size(),
                self.num_emb
            )));
        }

        let dim = self.config.embedding_dim;
        let file = resolve_embedding_file(source, dim)?;
        info!("Initializing embeddings from {:?}", file);

        let mut table = self.weights.embedding.as_tensor().to_vec2::<f32>()?;
        let reader = BufReader::new(File::open(&file)?);
        let mut found = 0usize;
        let mut skipped = 0usize;

        for line in reader.lines() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let Some(id) = parts.next().and_then(|word| vocab.index(word)) else {
                continue;
            };

            let values: Option<Vec<f32>> = parts.map(|v| v.parse::<f32>().ok()).collect();
            match values {
                Some(values) if values.len() == dim => {
                    table[id as usize] = values;
                    found += 1;
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("Skipped {} malformed vector lines in {:?}", skipped, file);
        }

        let flat: Vec<f32> = table.into_iter().flatten().collect();
        self.weights
            .embedding
            .set(&Tensor::from_vec(flat, (self.num_emb, dim), &self.device)?)?;

        info!(
            "Initialized {} of {} embeddings from pretrained vectors",
            found, self.num_emb
        );
        Ok(())
    }

    fn params(&self) -> Result<ModelParams> {
        let mut params = ModelParams::new();
        for (name, var) in self.weights.named() {
            let data = var.as_tensor().flatten_all()?.to_vec1::<f32>()?;
            params.insert(name, ParamTensor::new(var.dims().to_vec(), data)?);
        }
        Ok(params)
    }

    fn set_params(&mut self, params: &ModelParams) -> Result<()> {
        let named = self.weights.named();
        if params.len() != named.len() {
            return Err(Error::invalid_input(format!(
                "expected {} parameter arrays, got {}",
                named.len(),
                params.len()
            )));
        }

        // check everything before touching any weight
        for (name, var) in named {
            let tensor = params
                .get(name)
                .ok_or_else(|| Error::invalid_input(format!("missing parameter '{name}'")))?;
            if tensor.shape.as_slice() != var.dims() {
                return Err(Error::invalid_input(format!(
                    "parameter '{}' has shape {:?}, model expects {:?}",
                    name,
                    tensor.shape,
                    var.dims()
                )));
            }
        }

        for (name, var) in named {
            if let Some(tensor) = params.get(name) {
                var.set(&Tensor::from_vec(tensor.data.clone(), tensor.shape.clone(), &self.device)?)?;
            }
        }
        Ok(())
    }

    fn train_step(&mut self, tree: &Tree, label: Option<usize>) -> Result<StepOutput> {
        let target = label
            .or_else(|| tree.root_label())
            .ok_or_else(|| Error::model("tree has no root label and none was supplied"))?;
        if target >= self.config.output_dim {
            return Err(Error::model(format!(
                "target label {} outside {} classes",
                target, self.config.output_dim
            )));
        }

        let states = self.forward(tree)?;
        let root = states
            .last()
            .ok_or_else(|| Error::model("tree produced no node states"))?;
        let logits = self.logits(&root.h)?;

        let targets = Tensor::new(&[target as u32], &self.device)?;
        let loss = candle_nn::loss::cross_entropy(&logits, &targets)?;
        let prediction = softmax_last_dim(&logits)?.squeeze(0)?.to_vec1::<f32>()?;
        let loss_value = loss.to_scalar::<f32>()? as f64;

        self.update.backward_step(&loss)?;

        Ok(StepOutput {
            loss: loss_value,
            prediction,
        })
    }

    fn predict(&self, tree: &Tree) -> Result<Vec<Vec<f32>>> {
        let states = self.forward(tree)?;
        let hs: Vec<Tensor> = states.into_iter().map(|s| s.h).collect();
        let logits = self.logits(&Tensor::cat(&hs, 0)?)?;
        Ok(softmax_last_dim(&logits)?.to_vec2::<f32>()?)
    }
}

fn normal_var(
    rng: &mut StdRng,
    shape: (usize, usize),
    std: f32,
    device: &Device,
) -> Result<Var> {
    let normal = Normal::new(0.0f32, std).map_err(|e| Error::model(e.to_string()))?;
    let data: Vec<f32> = (0..shape.0 * shape.1).map(|_| normal.sample(&mut *rng)).collect();
    Ok(Var::from_tensor(&Tensor::from_vec(data, shape, device)?)?)
}

fn build_update_rule(config: &ModelConfig, weights: &Weights) -> Result<UpdateRule> {
    let vars: Vec<Var> = weights
        .named()
        .into_iter()
        .filter(|(name, _)| config.trainable_embeddings || *name != "embedding")
        .map(|(_, var)| var.clone())
        .collect();

    let rule = match config.optimizer {
        OptimizerType::Sgd => UpdateRule::Sgd(SGD::new(vars, config.learning_rate)?),
        OptimizerType::AdamW => UpdateRule::AdamW(AdamW::new(
            vars,
            ParamsAdamW {
                lr: config.learning_rate,
                ..Default::default()
            },
        )?),
        OptimizerType::AdaDelta => UpdateRule::AdaDelta(AdaDelta::new(
            vars,
            ParamsAdaDelta {
                lr: config.learning_rate,
                ..Default::default()
            },
        )?),
    };
    Ok(rule)
}

/// A pretrained vector source may be a file or a directory holding
/// `*{dim}d.txt` files (GloVe naming).
fn resolve_embedding_file(source: &Path, dim: usize) -> Result<PathBuf> {
    if !source.is_dir() {
        return Ok(source.to_path_buf());
    }

    let suffix = format!("{dim}d.txt");
    let mut candidates: Vec<PathBuf> = fs::read_dir(source)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(&suffix))
        })
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or_else(|| {
        Error::config(format!(
            "No {}-dimensional vector file found in {:?}",
            dim, source
        ))
    })
}
